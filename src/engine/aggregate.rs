//! Statistics over entity collections.
//!
//! Every call recomputes from scratch; nothing is cached between calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::lifecycle::Lifecycle;
use crate::models::{Client, MilestoneStatus, Property, Transaction, TransactionStatus};

/// `count / total`, or 0 when `total` is 0.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// An entity the aggregation engine can summarize.
pub trait Aggregatable {
    /// The designated numeric field, if present on this entity.
    fn measure(&self) -> Option<f64>;

    fn status_label(&self) -> &'static str;

    fn type_label(&self) -> &'static str;

    /// Whether a follow-up or due date has arrived.
    fn needs_attention(&self, now: DateTime<Utc>) -> bool;
}

/// Derived figures for a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,

    /// Entities that carry the measured field
    pub measured: usize,

    pub sum: f64,

    /// `sum / measured`, 0 when nothing was measured
    pub mean: f64,

    pub by_status: BTreeMap<String, usize>,

    pub by_type: BTreeMap<String, usize>,

    pub needs_attention: usize,
}

impl Statistics {
    pub fn status_count(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or(0)
    }

    pub fn type_count(&self, kind: &str) -> usize {
        self.by_type.get(kind).copied().unwrap_or(0)
    }

    /// Share of the total in `status`, 0 for an empty collection.
    pub fn status_share(&self, status: &str) -> f64 {
        percentage(self.status_count(status), self.total)
    }

    pub fn type_share(&self, kind: &str) -> f64 {
        percentage(self.type_count(kind), self.total)
    }

    /// Share of the total per status.
    pub fn status_distribution(&self) -> BTreeMap<String, f64> {
        self.by_status
            .iter()
            .map(|(status, count)| (status.clone(), percentage(*count, self.total)))
            .collect()
    }
}

/// Summarize `items` as of `now`.
pub fn aggregate<'a, E, I>(items: I, now: DateTime<Utc>) -> Statistics
where
    E: Aggregatable + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let mut stats = Statistics::default();
    for item in items {
        stats.total += 1;
        if let Some(value) = item.measure() {
            stats.measured += 1;
            stats.sum += value;
        }
        *stats.by_status.entry(item.status_label().to_string()).or_insert(0) += 1;
        *stats.by_type.entry(item.type_label().to_string()).or_insert(0) += 1;
        if item.needs_attention(now) {
            stats.needs_attention += 1;
        }
    }
    if stats.measured > 0 {
        stats.mean = stats.sum / stats.measured as f64;
    }
    stats
}

impl Aggregatable for Property {
    fn measure(&self) -> Option<f64> {
        Some(self.price)
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn type_label(&self) -> &'static str {
        self.property_type.as_str()
    }

    // Listings carry no follow-up or due date.
    fn needs_attention(&self, _now: DateTime<Utc>) -> bool {
        false
    }
}

impl Aggregatable for Client {
    fn measure(&self) -> Option<f64> {
        self.budget_ceiling()
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn type_label(&self) -> &'static str {
        self.client_type.as_str()
    }

    fn needs_attention(&self, now: DateTime<Utc>) -> bool {
        self.next_follow_up.is_some_and(|due| due <= now)
    }
}

impl Aggregatable for Transaction {
    fn measure(&self) -> Option<f64> {
        Some(self.financials.sale_price)
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn type_label(&self) -> &'static str {
        self.transaction_type.as_str()
    }

    /// Open deals with a pending milestone or closing date that has arrived.
    fn needs_attention(&self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let milestone_due = self
            .milestones
            .iter()
            .any(|m| m.status != MilestoneStatus::Completed && m.due_date <= now);
        milestone_due || self.dates.closing.is_some_and(|closing| closing <= now)
    }
}

/// Inclusive window on transaction creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

/// Performance summary for an agent's transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionAnalytics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub closed: usize,
    pub cancelled: usize,
    /// Transactions in a non-terminal status
    pub open: usize,
    /// Sum of sale prices of closed transactions
    pub closed_volume: f64,
    pub total_commission: f64,
    pub paid_commission: f64,
    pub average_sale_price: f64,
    /// `closed / total`, 0 when empty
    pub close_rate: f64,
    /// Mean contract-to-closing span of closed deals with both dates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_days_to_close: Option<f64>,
}

/// Summarize a set of transactions.
pub fn analyze<'a, I>(transactions: I) -> TransactionAnalytics
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut analytics = TransactionAnalytics::default();
    let mut price_sum = 0.0;
    let mut close_spans = Vec::new();

    for tx in transactions {
        analytics.total += 1;
        price_sum += tx.financials.sale_price;
        *analytics.by_status.entry(tx.status.to_string()).or_insert(0) += 1;
        analytics.total_commission += tx.financials.commission.amount;
        if tx.financials.commission.paid {
            analytics.paid_commission += tx.financials.commission.amount;
        }

        match tx.status {
            TransactionStatus::Closed => {
                analytics.closed += 1;
                analytics.closed_volume += tx.financials.sale_price;
                if let (Some(contract), Some(closing)) = (tx.dates.contract, tx.dates.closing) {
                    close_spans.push((closing - contract).num_hours() as f64 / 24.0);
                }
            }
            TransactionStatus::Cancelled => analytics.cancelled += 1,
            status if !status.is_terminal() => analytics.open += 1,
            _ => {}
        }
    }

    if analytics.total > 0 {
        analytics.average_sale_price = price_sum / analytics.total as f64;
    }
    analytics.close_rate = percentage(analytics.closed, analytics.total);
    if !close_spans.is_empty() {
        analytics.average_days_to_close =
            Some(close_spans.iter().sum::<f64>() / close_spans.len() as f64);
    }
    analytics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Budget, ClientDraft, Milestone, PropertyDraft, PropertyStatus, PropertyType,
        TransactionDraft,
    };
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn property(price: f64, status: PropertyStatus, kind: PropertyType) -> Property {
        let mut p = PropertyDraft {
            title: "Listing".to_string(),
            price,
            property_type: kind,
            agent_id: "agent-1".to_string(),
            ..Default::default()
        }
        .into_property(format!("prop-{}", price), now());
        p.status = status;
        p
    }

    fn transaction(status: TransactionStatus, price: f64) -> Transaction {
        let mut tx = TransactionDraft {
            property_id: "prop-1".to_string(),
            client_id: "cli-1".to_string(),
            agent_id: "agent-1".to_string(),
            sale_price: price,
            commission_rate: Some(3.0),
            ..Default::default()
        }
        .into_transaction("txn-1".to_string(), now(), 3.0);
        tx.status = status;
        tx
    }

    #[test]
    fn test_percentage_of_empty_total_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 0.25);
    }

    #[test]
    fn test_grouped_counts_sum_to_total() {
        let items = vec![
            property(100.0, PropertyStatus::Active, PropertyType::House),
            property(200.0, PropertyStatus::Active, PropertyType::Condo),
            property(600.0, PropertyStatus::Sold, PropertyType::House),
        ];
        let stats = aggregate(&items, now());
        assert_eq!(stats.total, items.len());
        assert_eq!(stats.by_status.values().sum::<usize>(), stats.total);
        assert_eq!(stats.by_type.values().sum::<usize>(), stats.total);
        assert_eq!(stats.sum, 900.0);
        assert_eq!(stats.mean, 300.0);
        assert_eq!(stats.status_count("active"), 2);
        assert!((stats.status_share("sold") - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.type_share("land"), 0.0);
    }

    #[test]
    fn test_empty_collection_statistics() {
        let items: Vec<Property> = Vec::new();
        let stats = aggregate(&items, now());
        assert_eq!(stats, Statistics::default());
        assert_eq!(stats.status_share("active"), 0.0);
        assert!(stats.status_distribution().is_empty());
    }

    #[test]
    fn test_client_mean_uses_budget_ceiling_of_budgeted_clients() {
        let make = |max: Option<f64>, follow_up: Option<DateTime<Utc>>| {
            ClientDraft {
                first_name: "C".to_string(),
                email: "c@example.com".to_string(),
                budget: max.map(|m| Budget {
                    min: None,
                    max: Some(m),
                    pre_approved: false,
                }),
                next_follow_up: follow_up,
                ..Default::default()
            }
            .into_client("cli-x".to_string(), now())
        };
        let clients = vec![
            make(Some(1_000_000.0), Some(now())),
            make(Some(3_000_000.0), Some(now() + Duration::days(1))),
            make(None, Some(now() - Duration::days(3))),
        ];
        let stats = aggregate(&clients, now());
        assert_eq!(stats.measured, 2);
        assert_eq!(stats.mean, 2_000_000.0);
        assert_eq!(stats.needs_attention, 2);
    }

    #[test]
    fn test_transaction_attention_ignores_terminal_deals() {
        let overdue = Milestone {
            id: "m1".to_string(),
            name: "Inspection".to_string(),
            status: MilestoneStatus::Pending,
            due_date: now() - Duration::days(1),
            completed_at: None,
            responsible: String::new(),
            description: None,
        };
        let mut open = transaction(TransactionStatus::Inspection, 100.0);
        open.milestones.push(overdue.clone());
        let mut closed = transaction(TransactionStatus::Closed, 100.0);
        closed.milestones.push(overdue);

        assert!(open.needs_attention(now()));
        assert!(!closed.needs_attention(now()));
    }

    #[test]
    fn test_analyze_transactions() {
        let mut won = transaction(TransactionStatus::Closed, 1_000_000.0);
        won.dates.contract = Some(now() - Duration::days(30));
        won.dates.closing = Some(now());
        won.financials.commission.paid = true;
        let lost = transaction(TransactionStatus::Cancelled, 500_000.0);
        let live = transaction(TransactionStatus::Financing, 600_000.0);

        let analytics = analyze([&won, &lost, &live]);
        assert_eq!(analytics.total, 3);
        assert_eq!(analytics.closed, 1);
        assert_eq!(analytics.cancelled, 1);
        assert_eq!(analytics.open, 1);
        assert_eq!(analytics.closed_volume, 1_000_000.0);
        assert_eq!(analytics.total_commission, 63_000.0);
        assert_eq!(analytics.paid_commission, 30_000.0);
        assert_eq!(analytics.average_sale_price, 700_000.0);
        assert!((analytics.close_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(analytics.average_days_to_close, Some(30.0));
    }

    #[test]
    fn test_analyze_empty() {
        let analytics = analyze(std::iter::empty());
        assert_eq!(analytics.close_rate, 0.0);
        assert_eq!(analytics.average_days_to_close, None);
    }
}
