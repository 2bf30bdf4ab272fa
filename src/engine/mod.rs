//! Pure domain logic: status transitions, predicate filtering, statistics
//! and milestone tracking. Nothing in here performs I/O.

pub mod aggregate;
pub mod filters;
pub mod lifecycle;
pub mod milestones;
pub mod predicate;

pub use aggregate::{
    Aggregatable, DateRange, Statistics, TransactionAnalytics, aggregate, analyze, percentage,
};
pub use filters::{ClientFilter, PropertyFilter, TransactionFilter};
pub use lifecycle::{Lifecycle, StatusBearing, transition};
pub use milestones::{
    Deadline, DeadlineKind, MilestoneProgress, MilestoneSpec, add_milestone, complete_milestone,
    display_status, progress, upcoming_deadlines,
};
pub use predicate::{
    Constraint, FieldValue, FilterSpec, Filterable, SEARCH_FIELD, filter, matches, validate_spec,
};
