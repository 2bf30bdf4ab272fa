//! Milestone tracking for transactions.
//!
//! Milestones are embedded in their transaction. Completion is recorded once;
//! overdue is never stored by these operations and is derived from
//! `(due_date, now)` at read time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::percentage;
use super::lifecycle::Lifecycle;
use crate::models::{Entity, Milestone, MilestoneStatus, Transaction};
use crate::{Error, Result};

/// Input for adding a milestone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestoneSpec {
    pub name: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub responsible: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Completion statistics for a transaction's milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneProgress {
    pub total: usize,
    pub completed: usize,
    /// `completed / total`, 0 when there are no milestones
    pub ratio: f64,
}

impl MilestoneProgress {
    pub fn new(total: usize, completed: usize) -> Self {
        Self {
            total,
            completed,
            ratio: percentage(completed, total),
        }
    }

    /// Completion on a 0-100 scale.
    pub fn percent(&self) -> f64 {
        self.ratio * 100.0
    }
}

/// Append a pending milestone.
pub fn add_milestone(
    transaction: &Transaction,
    spec: MilestoneSpec,
    now: DateTime<Utc>,
) -> Result<Transaction> {
    if spec.name.trim().is_empty() {
        return Err(Error::Validation("milestone name must not be empty".to_string()));
    }

    let mut next = transaction.clone();
    next.milestones.push(Milestone {
        id: uuid::Uuid::new_v4().to_string(),
        name: spec.name,
        status: MilestoneStatus::Pending,
        due_date: spec.due_date,
        completed_at: None,
        responsible: spec.responsible,
        description: spec.description,
    });
    next.touch(now);
    Ok(next)
}

/// Mark a milestone completed at `now`.
///
/// Fails with [`Error::NotFound`] for an unknown milestone and with
/// [`Error::AlreadyCompleted`] when it was completed before, leaving the
/// original completion date in place.
pub fn complete_milestone(
    transaction: &Transaction,
    milestone_id: &str,
    now: DateTime<Utc>,
) -> Result<Transaction> {
    let mut next = transaction.clone();
    let milestone = next
        .milestones
        .iter_mut()
        .find(|m| m.id == milestone_id)
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Milestone not found: {} on {}",
                milestone_id, transaction.id
            ))
        })?;

    if milestone.is_completed() {
        return Err(Error::AlreadyCompleted {
            milestone: milestone_id.to_string(),
        });
    }

    milestone.status = MilestoneStatus::Completed;
    milestone.completed_at = Some(now);
    next.touch(now);
    Ok(next)
}

pub fn progress(transaction: &Transaction) -> MilestoneProgress {
    let completed = transaction
        .milestones
        .iter()
        .filter(|m| m.is_completed())
        .count();
    MilestoneProgress::new(transaction.milestones.len(), completed)
}

/// Display state of a milestone at `now`.
pub fn display_status(milestone: &Milestone, now: DateTime<Utc>) -> MilestoneStatus {
    if milestone.is_completed() {
        MilestoneStatus::Completed
    } else if milestone.due_date < now {
        MilestoneStatus::Overdue
    } else {
        MilestoneStatus::Pending
    }
}

pub fn is_overdue(milestone: &Milestone, now: DateTime<Utc>) -> bool {
    display_status(milestone, now) == MilestoneStatus::Overdue
}

/// What a deadline refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeadlineKind {
    Milestone { milestone_id: String, name: String },
    Closing,
}

/// A dated obligation on an open transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    pub transaction_id: String,
    #[serde(flatten)]
    pub kind: DeadlineKind,
    pub due: DateTime<Utc>,
    pub overdue: bool,
}

/// Deadlines of open transactions due within `days` of `now`, plus pending
/// milestones already past due, sorted by due date.
pub fn upcoming_deadlines<'a, I>(transactions: I, now: DateTime<Utc>, days: i64) -> Vec<Deadline>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let horizon = now + Duration::days(days.max(0));
    let mut deadlines = Vec::new();

    for tx in transactions {
        if tx.status.is_terminal() {
            continue;
        }
        for milestone in tx.milestones.iter().filter(|m| !m.is_completed()) {
            if milestone.due_date <= horizon {
                deadlines.push(Deadline {
                    transaction_id: tx.id.clone(),
                    kind: DeadlineKind::Milestone {
                        milestone_id: milestone.id.clone(),
                        name: milestone.name.clone(),
                    },
                    due: milestone.due_date,
                    overdue: is_overdue(milestone, now),
                });
            }
        }
        if let Some(closing) = tx.dates.closing {
            if closing >= now && closing <= horizon {
                deadlines.push(Deadline {
                    transaction_id: tx.id.clone(),
                    kind: DeadlineKind::Closing,
                    due: closing,
                    overdue: false,
                });
            }
        }
    }

    deadlines.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.transaction_id.cmp(&b.transaction_id)));
    deadlines
}
