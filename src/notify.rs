use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{Identity, IdentitySet, PaymentId};

/// structured content delivered to a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    /// sent to approvers when a request is created
    PaymentRequested {
        payment_id: PaymentId,
        requester: Identity,
        month: u32,
        amount: Money,
        interest: Money,
        balance_after: Money,
    },
    /// sent to approvers and the requester when a newer request replaces a pending one
    RequestSuperseded {
        payment_id: PaymentId,
        replaced_by: PaymentId,
        requester: Identity,
        month: u32,
    },
    PaymentApproved {
        payment_id: PaymentId,
        month: u32,
        amount: Money,
        balance_after: Money,
    },
    PaymentRejected {
        payment_id: PaymentId,
        month: u32,
        amount: Money,
    },
    /// sent to notify recipients once a payment lands in the ledger
    PaymentRecorded {
        month: u32,
        amount: Money,
        balance_after: Money,
    },
}

/// delivery failures are logged per recipient and never abort a transition
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &Identity, notice: &Notice) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub recipient: Identity,
    pub reason: String,
}

/// outcome of a fan-out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub delivered: Vec<Identity>,
    pub failed: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: DeliveryReport) {
        self.delivered.extend(other.delivered);
        self.failed.extend(other.failed);
    }
}

/// send `notice` to every recipient; one failure does not stop the rest
pub fn deliver_all<'a, I>(notifier: &dyn Notifier, recipients: I, notice: &Notice) -> DeliveryReport
where
    I: IntoIterator<Item = &'a Identity>,
{
    let mut report = DeliveryReport::default();
    for recipient in recipients {
        match notifier.notify(recipient, notice) {
            Ok(()) => {
                debug!("notified {}", recipient);
                report.delivered.push(recipient.clone());
            }
            Err(err) => {
                warn!("failed to notify {}: {}", recipient, err);
                report.failed.push(DeliveryFailure {
                    recipient: recipient.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

/// in-memory notifier: records what was sent, fails for chosen recipients
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<(Identity, Notice)>>,
    unreachable: Mutex<IdentitySet>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// make deliveries to `identity` fail
    pub fn mark_unreachable(&self, identity: Identity) {
        self.unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity);
    }

    pub fn sent(&self) -> Vec<(Identity, Notice)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn sent_to(&self, identity: &Identity) -> Vec<Notice> {
        self.sent()
            .into_iter()
            .filter(|(recipient, _)| recipient == identity)
            .map(|(_, notice)| notice)
            .collect()
    }

    /// drain recorded notices
    pub fn take(&self) -> Vec<(Identity, Notice)> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for Outbox {
    fn notify(&self, recipient: &Identity, notice: &Notice) -> Result<()> {
        let unreachable = self
            .unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(recipient);
        if unreachable {
            return Err(LedgerError::NotificationDeliveryFailed {
                recipient: recipient.clone(),
                reason: "recipient unreachable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((recipient.clone(), notice.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded() -> Notice {
        Notice::PaymentRecorded {
            month: 1,
            amount: Money::from_major(100),
            balance_after: Money::from_major(900),
        }
    }

    #[test]
    fn test_failure_does_not_block_others() {
        let outbox = Outbox::new();
        outbox.mark_unreachable("2".into());
        let recipients: IdentitySet = ["1", "2", "3"].into_iter().map(Identity::from).collect();

        let report = deliver_all(&outbox, recipients.iter(), &recorded());

        assert_eq!(report.delivered, vec![Identity::from("1"), Identity::from("3")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].recipient, Identity::from("2"));
        assert!(!report.all_delivered());
        assert_eq!(outbox.sent().len(), 2);
    }

    #[test]
    fn test_take_drains() {
        let outbox = Outbox::new();
        outbox.notify(&"1".into(), &recorded()).unwrap();
        assert_eq!(outbox.sent_to(&"1".into()).len(), 1);
        assert_eq!(outbox.take().len(), 1);
        assert!(outbox.sent().is_empty());
    }
}
