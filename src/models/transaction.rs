//! Sale and rental transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind, Note, require_positive, require_text};
use crate::{Error, Result};

labeled_enum! {
    #[derive(Default)]
    pub enum TransactionType {
        #[default]
        Purchase => "purchase",
        Sale => "sale",
        Lease => "lease",
        Rental => "rental",
    }
}

labeled_enum! {
    /// Stage of a deal. `closed`, `cancelled` and `expired` are terminal.
    #[derive(Default)]
    pub enum TransactionStatus {
        #[default]
        Pending => "pending",
        UnderContract => "under-contract",
        Inspection => "inspection",
        Appraisal => "appraisal",
        Financing => "financing",
        FinalWalkthrough => "final-walkthrough",
        Closing => "closing",
        Closed => "closed",
        Cancelled => "cancelled",
        Expired => "expired",
    }
}

labeled_enum! {
    /// Stored milestone state. `overdue` is normally derived at read time.
    #[derive(Default)]
    pub enum MilestoneStatus {
        #[default]
        Pending => "pending",
        Completed => "completed",
        Overdue => "overdue",
    }
}

/// Commission owed to the brokerage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    /// Percentage of the sale price (0-100)
    pub rate: f64,
    pub amount: f64,
    #[serde(default)]
    pub paid: bool,
}

/// Money side of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub sale_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_price: Option<f64>,
    pub commission: Commission,
}

/// Compute the commission amount for a sale price and percentage rate,
/// rounded to the nearest whole unit.
pub fn derive_commission(sale_price: f64, rate: f64) -> f64 {
    (sale_price * rate / 100.0).round()
}

impl Financials {
    /// Build financials with a derived commission, or with `override_amount` when given.
    pub fn new(
        sale_price: f64,
        list_price: Option<f64>,
        rate: f64,
        override_amount: Option<f64>,
    ) -> Self {
        Self {
            sale_price,
            list_price,
            commission: Commission {
                rate,
                amount: override_amount.unwrap_or_else(|| derive_commission(sale_price, rate)),
                paid: false,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("sale price", self.sale_price)?;
        if let Some(list_price) = self.list_price {
            require_positive("list price", list_price)?;
        }
        let rate = self.commission.rate;
        if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
            return Err(Error::Validation(format!(
                "commission rate must be between 0 and 100, got {}",
                rate
            )));
        }
        let amount = self.commission.amount;
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::Validation(format!(
                "commission amount must not be negative, got {}",
                amount
            )));
        }
        Ok(())
    }
}

/// Changes to the money side. A new price or rate re-derives the commission
/// unless `commission_amount` overrides it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialsPatch {
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub list_price: Option<f64>,
    #[serde(default)]
    pub commission_rate: Option<f64>,
    #[serde(default)]
    pub commission_amount: Option<f64>,
}

impl FinancialsPatch {
    pub fn apply(&self, financials: &mut Financials) {
        if let Some(list_price) = self.list_price {
            financials.list_price = Some(list_price);
        }
        let repriced = self.sale_price.is_some() || self.commission_rate.is_some();
        if let Some(sale_price) = self.sale_price {
            financials.sale_price = sale_price;
        }
        if let Some(rate) = self.commission_rate {
            financials.commission.rate = rate;
        }
        if let Some(amount) = self.commission_amount {
            financials.commission.amount = amount;
        } else if repriced {
            financials.commission.amount =
                derive_commission(financials.sale_price, financials.commission.rate);
        }
    }
}

/// Key dates of a deal, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionDates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appraisal: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financing: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possession: Option<DateTime<Utc>>,
}

/// A named, dated sub-task of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier (UUID v4)
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub status: MilestoneStatus,

    pub due_date: DateTime<Utc>,

    /// Set exactly once, when the milestone is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Free-text responsible party
    #[serde(default)]
    pub responsible: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Milestone {
    pub fn is_completed(&self) -> bool {
        self.status == MilestoneStatus::Completed
    }

    pub fn validate(&self) -> Result<()> {
        require_text("milestone name", &self.name)?;
        if self.is_completed() != self.completed_at.is_some() {
            return Err(Error::Validation(format!(
                "milestone {} must have a completion date exactly when completed",
                self.id
            )));
        }
        Ok(())
    }
}

/// A sale or rental deal between a client and a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier (e.g., "txn-1a2b3c4d")
    pub id: String,

    #[serde(rename = "type", default)]
    pub transaction_type: TransactionType,

    #[serde(default)]
    pub status: TransactionStatus,

    pub property_id: String,

    pub client_id: String,

    pub agent_id: String,

    pub financials: Financials,

    #[serde(default)]
    pub dates: TransactionDates,

    /// Ordered as added
    #[serde(default)]
    pub milestones: Vec<Milestone>,

    /// Append-only, oldest first
    #[serde(default)]
    pub notes: Vec<Note>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn milestone(&self, milestone_id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == milestone_id)
    }
}

impl Entity for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn validate(&self) -> Result<()> {
        require_text("property reference", &self.property_id)?;
        require_text("client reference", &self.client_id)?;
        require_text("agent reference", &self.agent_id)?;
        self.financials.validate()?;
        for milestone in &self.milestones {
            milestone.validate()?;
        }
        for note in &self.notes {
            note.validate()?;
        }
        Ok(())
    }
}

/// Input for creating a transaction. New transactions always start `pending`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionDraft {
    #[serde(rename = "type", default)]
    pub transaction_type: TransactionType,
    pub property_id: String,
    pub client_id: String,
    pub agent_id: String,
    pub sale_price: f64,
    #[serde(default)]
    pub list_price: Option<f64>,
    /// Falls back to the configured default rate
    #[serde(default)]
    pub commission_rate: Option<f64>,
    /// Explicit override; otherwise derived from price and rate
    #[serde(default)]
    pub commission_amount: Option<f64>,
    #[serde(default)]
    pub dates: TransactionDates,
}

impl TransactionDraft {
    pub fn into_transaction(self, id: String, now: DateTime<Utc>, default_rate: f64) -> Transaction {
        let rate = self.commission_rate.unwrap_or(default_rate);
        Transaction {
            id,
            transaction_type: self.transaction_type,
            status: TransactionStatus::Pending,
            property_id: self.property_id,
            client_id: self.client_id,
            agent_id: self.agent_id,
            financials: Financials::new(
                self.sale_price,
                self.list_price,
                rate,
                self.commission_amount,
            ),
            dates: self.dates,
            milestones: Vec::new(),
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
