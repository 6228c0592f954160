use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{Decision, Identity, PaymentId, PaymentStatus};

/// composite key; at most one pending payment per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingKey {
    pub requester: Identity,
    pub month: u32,
}

/// payment proposed by a requester, awaiting an approver decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub id: PaymentId,
    pub requester: Identity,
    pub month: u32,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub status: PaymentStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Identity>,
}

impl PendingPayment {
    pub fn new(requester: Identity, month: u32, amount: Money, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester,
            month,
            amount,
            created_at,
            status: PaymentStatus::Pending,
            resolved_at: None,
            decided_by: None,
        }
    }

    pub fn key(&self) -> PendingKey {
        PendingKey {
            requester: self.requester.clone(),
            month: self.month,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// settled copy of this payment
    pub fn settle(mut self, decision: Decision, decider: Identity, at: DateTime<Utc>) -> Self {
        self.status = decision.resulting_status();
        self.decided_by = Some(decider);
        self.resolved_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_payments_get_distinct_ids() {
        let now = Utc::now();
        let a = PendingPayment::new("1".into(), 1, Money::from_major(100), now);
        let b = PendingPayment::new("1".into(), 1, Money::from_major(100), now);
        assert_ne!(a.id, b.id);
        assert_eq!(a.key(), b.key());
        assert!(a.is_pending());
    }

    #[test]
    fn test_settle() {
        let now = Utc::now();
        let payment = PendingPayment::new("1".into(), 2, Money::from_major(100), now);
        let settled = payment.clone().settle(Decision::Reject, "9".into(), now);
        assert_eq!(settled.id, payment.id);
        assert_eq!(settled.status, PaymentStatus::Rejected);
        assert_eq!(settled.decided_by, Some(Identity::from("9")));
        assert_eq!(settled.resolved_at, Some(now));
    }
}
