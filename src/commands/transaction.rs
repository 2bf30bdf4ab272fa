use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    Output, StatsResult, money, parse_datetime, parse_labels, parse_optional,
    parse_optional_datetime, to_json,
};
use crate::cli::TransactionFilterArgs;
use crate::engine::{
    DateRange, Deadline, DeadlineKind, FilterSpec, MilestoneProgress, MilestoneSpec,
    TransactionAnalytics, TransactionFilter, display_status,
};
use crate::models::{
    EntityKind, FinancialsPatch, MilestoneStatus, NoteType, Transaction, TransactionDates,
    TransactionDraft, TransactionStatus,
};
use crate::remote::RemoteBackend;
use crate::service::Brokerage;
use crate::Result;

/// Milestone as shown to callers, with overdue derived from the clock.
#[derive(Debug, Serialize)]
pub struct MilestoneView {
    pub id: String,
    pub name: String,
    pub status: MilestoneStatus,
    pub due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub responsible: String,
}

/// A transaction plus its milestone progress.
#[derive(Debug, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub progress: MilestoneProgress,
    pub milestone_status: Vec<MilestoneView>,
}

impl Output for TransactionDetail {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        let tx = &self.transaction;
        let mut lines = vec![format!(
            "{}: {} {} [{}]",
            tx.id, tx.transaction_type, tx.property_id, tx.status
        )];
        lines.push(format!("  Client: {}  Agent: {}", tx.client_id, tx.agent_id));
        let commission = &tx.financials.commission;
        lines.push(format!(
            "  Sale price: {}  Commission: {} at {}%{}",
            money(tx.financials.sale_price),
            money(commission.amount),
            commission.rate,
            if commission.paid { " (paid)" } else { "" }
        ));
        if let Some(closing) = tx.dates.closing {
            lines.push(format!("  Closing: {}", closing.format("%Y-%m-%d")));
        }
        if self.progress.total > 0 {
            lines.push(format!(
                "  Milestones: {}/{} ({:.0}%)",
                self.progress.completed,
                self.progress.total,
                self.progress.percent()
            ));
            for milestone in &self.milestone_status {
                lines.push(format!(
                    "    [{}] {} due {} ({})",
                    milestone.status,
                    milestone.name,
                    milestone.due_date.format("%Y-%m-%d"),
                    milestone.id
                ));
            }
        }
        if !tx.notes.is_empty() {
            lines.push(format!("  Notes ({}):", tx.notes.len()));
            for note in &tx.notes {
                lines.push(format!("    [{}] {} ({})", note.note_type, note.content, note.author));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
    pub count: usize,
}

impl Output for TransactionList {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        if self.transactions.is_empty() {
            return "No transactions found.".to_string();
        }
        let mut lines = vec![format!("{} transaction(s):", self.count)];
        for tx in &self.transactions {
            lines.push(format!(
                "  {}  [{}] {} {}  {}",
                tx.id,
                tx.status,
                tx.transaction_type,
                tx.property_id,
                money(tx.financials.sale_price)
            ));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResult {
    pub agent_id: String,
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(flatten)]
    pub analytics: TransactionAnalytics,
}

impl Output for AnalyticsResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        let a = &self.analytics;
        let mut lines = vec![format!("Analytics for {}: {} transaction(s)", self.agent_id, a.total)];
        lines.push(format!(
            "  Closed: {}  Cancelled: {}  Open: {}  Close rate: {:.1}%",
            a.closed,
            a.cancelled,
            a.open,
            a.close_rate * 100.0
        ));
        lines.push(format!(
            "  Closed volume: {}  Average sale: {}",
            money(a.closed_volume),
            money(a.average_sale_price)
        ));
        lines.push(format!(
            "  Commission: {} total, {} paid",
            money(a.total_commission),
            money(a.paid_commission)
        ));
        if let Some(days) = a.average_days_to_close {
            lines.push(format!("  Average days to close: {:.1}", days));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct DeadlinesResult {
    pub agent_id: String,
    pub days: i64,
    pub count: usize,
    pub deadlines: Vec<Deadline>,
}

impl Output for DeadlinesResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        if self.deadlines.is_empty() {
            return format!(
                "No deadlines for {} in the next {} day(s).",
                self.agent_id, self.days
            );
        }
        let mut lines = vec![format!(
            "{} deadline(s) for {} in the next {} day(s):",
            self.count, self.agent_id, self.days
        )];
        for deadline in &self.deadlines {
            let what = match deadline.kind {
                DeadlineKind::Milestone { ref name, .. } => name.as_str(),
                DeadlineKind::Closing => "closing",
            };
            lines.push(format!(
                "  {}  {}  {}{}",
                deadline.due.format("%Y-%m-%d"),
                deadline.transaction_id,
                what,
                if deadline.overdue { " (OVERDUE)" } else { "" }
            ));
        }
        lines.join("\n")
    }
}

/// Translate transaction filter flags into a filter spec.
pub fn transaction_filter(args: &TransactionFilterArgs) -> Result<FilterSpec> {
    let filter = TransactionFilter {
        statuses: parse_labels(&args.status)?,
        types: parse_labels(&args.transaction_type)?,
        agent_id: args.agent.clone(),
        client_id: args.client.clone(),
        property_id: args.property.clone(),
        min_price: args.min_price,
        max_price: args.max_price,
        contract_from: None,
        contract_to: None,
        search: args.search.clone(),
    };
    Ok(filter.to_spec())
}

fn detail<B: RemoteBackend>(brokerage: &Brokerage<B>, transaction: Transaction) -> TransactionDetail {
    let now = brokerage.transactions().now();
    let milestone_status = transaction
        .milestones
        .iter()
        .map(|m| MilestoneView {
            id: m.id.clone(),
            name: m.name.clone(),
            status: display_status(m, now),
            due_date: m.due_date,
            completed_at: m.completed_at,
            responsible: m.responsible.clone(),
        })
        .collect();
    TransactionDetail {
        progress: crate::engine::progress(&transaction),
        milestone_status,
        transaction,
    }
}

/// Draft fields for `transaction create`.
pub struct NewTransaction<'a> {
    pub property: &'a str,
    pub client: &'a str,
    pub agent: &'a str,
    pub sale_price: f64,
    pub transaction_type: Option<&'a str>,
    pub list_price: Option<f64>,
    pub commission_rate: Option<f64>,
    pub commission_amount: Option<f64>,
    pub contract_date: Option<&'a str>,
    pub closing_date: Option<&'a str>,
}

pub fn transaction_create<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    input: NewTransaction<'_>,
) -> Result<TransactionDetail> {
    let draft = TransactionDraft {
        transaction_type: parse_optional(input.transaction_type)?.unwrap_or_default(),
        property_id: input.property.to_string(),
        client_id: input.client.to_string(),
        agent_id: input.agent.to_string(),
        sale_price: input.sale_price,
        list_price: input.list_price,
        commission_rate: input.commission_rate,
        commission_amount: input.commission_amount,
        dates: TransactionDates {
            contract: parse_optional_datetime(input.contract_date)?,
            closing: parse_optional_datetime(input.closing_date)?,
            ..Default::default()
        },
    };
    let transaction = brokerage.create_transaction(draft)?;
    Ok(detail(brokerage, transaction))
}

pub fn transaction_list<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    filter: &TransactionFilterArgs,
) -> Result<TransactionList> {
    let transactions = brokerage.list_transactions(&transaction_filter(filter)?)?;
    Ok(TransactionList {
        count: transactions.len(),
        transactions,
    })
}

pub fn transaction_show<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    id: &str,
) -> Result<TransactionDetail> {
    let transaction = brokerage.get_transaction(id)?;
    Ok(detail(brokerage, transaction))
}

pub fn transaction_status<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    status: &str,
) -> Result<TransactionDetail> {
    let status: TransactionStatus = status.parse()?;
    let transaction = brokerage.update_transaction_status(id, status)?;
    Ok(detail(brokerage, transaction))
}

pub fn transaction_milestone_add<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    name: &str,
    due: &str,
    responsible: &str,
    description: Option<&str>,
) -> Result<TransactionDetail> {
    let spec = MilestoneSpec {
        name: name.to_string(),
        due_date: parse_datetime(due)?,
        responsible: responsible.to_string(),
        description: description.map(str::to_string),
    };
    let transaction = brokerage.add_milestone(id, spec)?;
    Ok(detail(brokerage, transaction))
}

pub fn transaction_milestone_complete<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    milestone_id: &str,
) -> Result<TransactionDetail> {
    let transaction = brokerage.complete_milestone(id, milestone_id)?;
    Ok(detail(brokerage, transaction))
}

pub fn transaction_note<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    content: &str,
    note_type: &str,
    author: &str,
) -> Result<TransactionDetail> {
    let note_type: NoteType = note_type.parse()?;
    let transaction = brokerage.add_transaction_note(id, content, note_type, author)?;
    Ok(detail(brokerage, transaction))
}

pub fn transaction_financials<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    patch: &FinancialsPatch,
) -> Result<TransactionDetail> {
    let transaction = brokerage.update_financials(id, patch)?;
    Ok(detail(brokerage, transaction))
}

pub fn transaction_commission_paid<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
) -> Result<TransactionDetail> {
    let transaction = brokerage.mark_commission_paid(id)?;
    Ok(detail(brokerage, transaction))
}

pub fn transaction_analytics<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    agent: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<AnalyticsResult> {
    let range = DateRange {
        from: parse_optional_datetime(from)?,
        to: parse_optional_datetime(to)?,
    };
    Ok(AnalyticsResult {
        agent_id: agent.to_string(),
        range,
        analytics: brokerage.get_analytics(agent, range),
    })
}

pub fn transaction_deadlines<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    agent: &str,
    days: Option<i64>,
) -> Result<DeadlinesResult> {
    let days = days.unwrap_or(brokerage.settings().deadline_days);
    if days < 0 {
        return Err(crate::Error::Validation(format!(
            "days must not be negative, got {}",
            days
        )));
    }
    let deadlines = brokerage.get_upcoming_deadlines(agent, Some(days));
    Ok(DeadlinesResult {
        agent_id: agent.to_string(),
        days,
        count: deadlines.len(),
        deadlines,
    })
}

pub fn transaction_stats<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    filter: &TransactionFilterArgs,
) -> Result<StatsResult> {
    Ok(StatsResult {
        entity: EntityKind::Transaction,
        stats: brokerage.transaction_stats(&transaction_filter(filter)?)?,
    })
}
