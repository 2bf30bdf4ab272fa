//! Status transition tables.
//!
//! Each status enum declares the statuses directly reachable from each value.
//! Transaction statuses follow a strict forward pipeline where every
//! non-terminal stage may also be cancelled. Property and client statuses are
//! deliberately unguarded: their tables allow every value.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::models::{
    Client, ClientStatus, Entity, Property, PropertyStatus, Transaction, TransactionStatus,
};
use crate::{Error, Result};

/// A status enum with a fixed adjacency table.
pub trait Lifecycle: Copy + Eq + fmt::Display + 'static {
    /// Statuses directly reachable from `self`.
    fn successors(self) -> &'static [Self];

    /// A terminal status has no successors.
    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }
}

impl Lifecycle for TransactionStatus {
    fn successors(self) -> &'static [Self] {
        use TransactionStatus::*;
        match self {
            Pending => &[UnderContract, Cancelled],
            UnderContract => &[Inspection, Cancelled],
            Inspection => &[Appraisal, Cancelled],
            Appraisal => &[Financing, Cancelled],
            Financing => &[FinalWalkthrough, Cancelled],
            FinalWalkthrough => &[Closing, Cancelled],
            Closing => &[Closed, Cancelled],
            Closed | Cancelled | Expired => &[],
        }
    }
}

impl Lifecycle for PropertyStatus {
    fn successors(self) -> &'static [Self] {
        PropertyStatus::ALL
    }
}

impl Lifecycle for ClientStatus {
    fn successors(self) -> &'static [Self] {
        ClientStatus::ALL
    }
}

/// An entity whose status is governed by a [`Lifecycle`] table.
pub trait StatusBearing: Entity {
    type Status: Lifecycle;

    fn status(&self) -> Self::Status;

    fn set_status(&mut self, status: Self::Status);
}

impl StatusBearing for Transaction {
    type Status = TransactionStatus;

    fn status(&self) -> TransactionStatus {
        self.status
    }

    fn set_status(&mut self, status: TransactionStatus) {
        self.status = status;
    }
}

impl StatusBearing for Property {
    type Status = PropertyStatus;

    fn status(&self) -> PropertyStatus {
        self.status
    }

    fn set_status(&mut self, status: PropertyStatus) {
        self.status = status;
    }
}

impl StatusBearing for Client {
    type Status = ClientStatus;

    fn status(&self) -> ClientStatus {
        self.status
    }

    fn set_status(&mut self, status: ClientStatus) {
        self.status = status;
    }
}

/// Move `entity` to `target`, returning the updated copy.
///
/// Fails with [`Error::IllegalTransition`] when `target` is not adjacent to the
/// current status; `entity` itself is never modified. Reaching a terminal
/// transaction status has no effect on linked records.
pub fn transition<E: StatusBearing>(entity: &E, target: E::Status, now: DateTime<Utc>) -> Result<E> {
    let from = entity.status();
    if !from.can_transition_to(target) {
        tracing::warn!(
            entity = %E::KIND,
            id = entity.id(),
            from = %from,
            to = %target,
            "rejected status transition"
        );
        return Err(Error::IllegalTransition {
            entity: E::KIND,
            id: entity.id().to_string(),
            from: from.to_string(),
            to: target.to_string(),
        });
    }

    let mut next = entity.clone();
    next.set_status(target);
    next.touch(now);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionDraft;
    use proptest::prelude::*;

    fn transaction_in(status: TransactionStatus) -> Transaction {
        let mut tx = TransactionDraft {
            property_id: "prop-1".to_string(),
            client_id: "cli-1".to_string(),
            agent_id: "agent-1".to_string(),
            sale_price: 500_000.0,
            ..Default::default()
        }
        .into_transaction("txn-1".to_string(), Utc::now(), 3.0);
        tx.status = status;
        tx
    }

    #[test]
    fn test_terminal_statuses_have_no_successors() {
        for status in [
            TransactionStatus::Closed,
            TransactionStatus::Cancelled,
            TransactionStatus::Expired,
        ] {
            assert!(status.is_terminal());
        }
        assert!(!TransactionStatus::Closing.is_terminal());
    }

    #[test]
    fn test_happy_path_reaches_closed() {
        let now = Utc::now();
        let path = [
            TransactionStatus::UnderContract,
            TransactionStatus::Inspection,
            TransactionStatus::Appraisal,
            TransactionStatus::Financing,
            TransactionStatus::FinalWalkthrough,
            TransactionStatus::Closing,
            TransactionStatus::Closed,
        ];
        let mut tx = transaction_in(TransactionStatus::Pending);
        for step in path {
            tx = transition(&tx, step, now).unwrap();
        }
        assert_eq!(tx.status, TransactionStatus::Closed);
        assert_eq!(tx.updated_at, now);
    }

    #[test]
    fn test_closed_to_under_contract_is_illegal() {
        let tx = transaction_in(TransactionStatus::Closed);
        let err = transition(&tx, TransactionStatus::UnderContract, Utc::now()).unwrap_err();
        match err {
            Error::IllegalTransition { from, to, .. } => {
                assert_eq!(from, "closed");
                assert_eq!(to, "under-contract");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(tx.status, TransactionStatus::Closed);
    }

    #[test]
    fn test_skipping_a_stage_is_illegal() {
        let tx = transaction_in(TransactionStatus::Pending);
        assert!(transition(&tx, TransactionStatus::Inspection, Utc::now()).is_err());
        assert!(transition(&tx, TransactionStatus::Pending, Utc::now()).is_err());
    }

    #[test]
    fn test_property_status_is_unguarded() {
        for from in PropertyStatus::ALL {
            for to in PropertyStatus::ALL {
                assert!(from.can_transition_to(*to));
            }
        }
        for from in ClientStatus::ALL {
            assert!(!from.is_terminal());
        }
    }

    fn any_status() -> impl Strategy<Value = TransactionStatus> {
        proptest::sample::select(TransactionStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_transition_succeeds_iff_adjacent(from in any_status(), to in any_status()) {
            let tx = transaction_in(from);
            let result = transition(&tx, to, Utc::now());
            prop_assert_eq!(result.is_ok(), from.successors().contains(&to));
            if from.is_terminal() {
                prop_assert!(result.is_err());
            }
        }
    }
}
