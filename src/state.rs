use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::approval::pending::{PendingKey, PendingPayment};
use crate::config::LoanParameters;
use crate::payments::PaymentLedger;
use crate::types::{Identity, IdentitySet, PaymentId};

/// settled payments kept for late-decision lookups
pub const RESOLVED_HISTORY_LIMIT: usize = 256;

/// the named aggregates a store persists
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoanState {
    pub parameters: LoanParameters,
    #[serde(default)]
    pub ledger: PaymentLedger,
    #[serde(default)]
    pub pending_payments: BTreeMap<PaymentId, PendingPayment>,
    /// settled payments, so a late decision can be told apart from an unknown id
    #[serde(default)]
    pub resolved_payments: BTreeMap<PaymentId, PendingPayment>,
    #[serde(default)]
    pub approvers: IdentitySet,
    #[serde(default)]
    pub notify_recipients: IdentitySet,
}

impl LoanState {
    pub fn new(parameters: LoanParameters) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }

    pub fn pending_for(&self, key: &PendingKey) -> Option<&PendingPayment> {
        self.pending_payments
            .values()
            .find(|payment| payment.requester == key.requester && payment.month == key.month)
    }

    /// store a pending payment, removing and returning any entry with the same key
    pub fn insert_pending(&mut self, payment: PendingPayment) -> Option<PendingPayment> {
        let key = payment.key();
        let superseded = self
            .pending_for(&key)
            .map(|existing| existing.id)
            .and_then(|id| self.pending_payments.remove(&id));
        self.pending_payments.insert(payment.id, payment);
        superseded
    }

    /// atomic test-and-delete of a pending entry
    pub fn take_pending(&mut self, id: PaymentId) -> Option<PendingPayment> {
        self.pending_payments.remove(&id)
    }

    /// keep a settled payment, dropping the oldest once the history is full
    pub fn archive(&mut self, payment: PendingPayment) {
        self.resolved_payments.insert(payment.id, payment);
        while self.resolved_payments.len() > RESOLVED_HISTORY_LIMIT {
            let Some(oldest) = self
                .resolved_payments
                .values()
                .min_by_key(|settled| settled.resolved_at)
                .map(|settled| settled.id)
            else {
                break;
            };
            self.resolved_payments.remove(&oldest);
        }
    }

    pub fn is_approver(&self, identity: &Identity) -> bool {
        self.approvers.contains(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use chrono::Utc;

    #[test]
    fn test_insert_pending_replaces_same_key() {
        let mut state = LoanState::default();
        let now = Utc::now();
        let first = PendingPayment::new("1".into(), 1, Money::from_major(100), now);
        let second = PendingPayment::new("1".into(), 1, Money::from_major(200), now);
        let other_month = PendingPayment::new("1".into(), 2, Money::from_major(300), now);

        assert!(state.insert_pending(first.clone()).is_none());
        assert!(state.insert_pending(other_month.clone()).is_none());
        let superseded = state.insert_pending(second.clone()).unwrap();

        assert_eq!(superseded.id, first.id);
        assert_eq!(state.pending_payments.len(), 2);
        assert!(state.pending_payments.contains_key(&second.id));
        assert!(state.pending_payments.contains_key(&other_month.id));
    }

    #[test]
    fn test_take_pending_only_once() {
        let mut state = LoanState::default();
        let payment = PendingPayment::new("1".into(), 1, Money::from_major(100), Utc::now());
        let id = payment.id;
        state.insert_pending(payment);

        assert!(state.take_pending(id).is_some());
        assert!(state.take_pending(id).is_none());
    }

    #[test]
    fn test_archive_keeps_recent_history() {
        let mut state = LoanState::default();
        let start = Utc::now();
        let mut first = None;
        for i in 0..=RESOLVED_HISTORY_LIMIT {
            let at = start + chrono::Duration::seconds(i as i64);
            let settled = PendingPayment::new("1".into(), 1, Money::from_major(100), at)
                .settle(crate::types::Decision::Reject, "9".into(), at);
            first.get_or_insert(settled.id);
            state.archive(settled);
        }

        assert_eq!(state.resolved_payments.len(), RESOLVED_HISTORY_LIMIT);
        assert!(!state.resolved_payments.contains_key(&first.unwrap()));
    }

    #[test]
    fn test_state_json_round_trip() {
        let mut state = LoanState::default();
        state.ledger.record_payment(1, Money::from_major(131_000)).unwrap();
        state.approvers.insert("7".into());
        state.insert_pending(PendingPayment::new("1".into(), 2, Money::from_major(50_000), Utc::now()));

        let json = serde_json::to_string(&state).unwrap();
        let back: LoanState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_missing_aggregates_default() {
        let json = r#"{"parameters":{"principal":"1000","annual_rate":"0.1","term_months":6,"payment_day":1}}"#;
        let state: LoanState = serde_json::from_str(json).unwrap();
        assert!(state.ledger.is_empty());
        assert!(state.approvers.is_empty());
    }
}
