//! Transaction store.
//!
//! Transactions are never removed; they end in a terminal status instead.

use super::Collection;
use crate::engine::{
    DateRange, Deadline, MilestoneProgress, MilestoneSpec, TransactionAnalytics, analyze,
    milestones, transition,
};
use crate::models::{
    Entity, FinancialsPatch, Note, NoteType, Transaction, TransactionDraft, TransactionStatus,
};
use crate::Result;

pub type TransactionStore = Collection<Transaction>;

impl Collection<Transaction> {
    /// Open a new deal in `pending`, deriving the commission from
    /// `default_rate` when the draft carries no rate.
    pub fn create(&mut self, draft: TransactionDraft, default_rate: f64) -> Result<Transaction> {
        let id = self.next_id(&format!("{}{}", draft.property_id, draft.client_id));
        let transaction = draft.into_transaction(id, self.now(), default_rate);
        self.insert(transaction)
    }

    /// Move a transaction along its pipeline.
    pub fn update_status(&mut self, id: &str, status: TransactionStatus) -> Result<Transaction> {
        self.modify(id, |current, now| transition(current, status, now))
    }

    pub fn add_milestone(&mut self, id: &str, spec: MilestoneSpec) -> Result<Transaction> {
        self.modify(id, |current, now| milestones::add_milestone(current, spec, now))
    }

    pub fn complete_milestone(&mut self, id: &str, milestone_id: &str) -> Result<Transaction> {
        self.modify(id, |current, now| {
            milestones::complete_milestone(current, milestone_id, now)
        })
    }

    pub fn progress(&self, id: &str) -> Result<MilestoneProgress> {
        Ok(milestones::progress(self.get(id)?))
    }

    pub fn add_note(
        &mut self,
        id: &str,
        content: &str,
        note_type: NoteType,
        author: &str,
    ) -> Result<Transaction> {
        self.modify(id, |current, now| {
            let note = Note::new(content, note_type, author, now);
            note.validate()?;
            let mut next = current.clone();
            next.notes.push(note);
            next.touch(now);
            Ok(next)
        })
    }

    /// Change price, rate or commission. The commission is re-derived from
    /// price and rate unless the patch overrides the amount.
    pub fn update_financials(&mut self, id: &str, patch: &FinancialsPatch) -> Result<Transaction> {
        self.modify(id, |current, now| {
            let mut next = current.clone();
            patch.apply(&mut next.financials);
            next.touch(now);
            Ok(next)
        })
    }

    pub fn mark_commission_paid(&mut self, id: &str) -> Result<Transaction> {
        self.modify(id, |current, now| {
            let mut next = current.clone();
            next.financials.commission.paid = true;
            next.touch(now);
            Ok(next)
        })
    }

    /// Transactions handled by `agent_id`, optionally bounded by creation date.
    pub fn for_agent(&self, agent_id: &str, range: DateRange) -> Vec<&Transaction> {
        self.all()
            .into_iter()
            .filter(|tx| tx.agent_id == agent_id)
            .filter(|tx| range.from.is_none_or(|from| tx.created_at >= from))
            .filter(|tx| range.to.is_none_or(|to| tx.created_at <= to))
            .collect()
    }

    pub fn analytics(&self, agent_id: &str, range: DateRange) -> TransactionAnalytics {
        analyze(self.for_agent(agent_id, range))
    }

    pub fn upcoming_deadlines(&self, agent_id: &str, days: i64) -> Vec<Deadline> {
        milestones::upcoming_deadlines(self.for_agent(agent_id, DateRange::default()), self.now(), days)
    }
}
