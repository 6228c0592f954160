use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::approval::pending::PendingPayment;
use crate::config::ServiceConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::notify::{deliver_all, DeliveryReport, Notice, Notifier};
use crate::payments::{balance_before, AmortizationCalculator, PaymentBounds};
use crate::store::LoanStore;
use crate::types::{Decision, DuplicatePolicy, Identity, PaymentId};

/// workflow rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    pub minimum_payment: Money,
    pub duplicate_policy: DuplicatePolicy,
}

impl From<&ServiceConfig> for WorkflowPolicy {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            minimum_payment: config.minimum_payment,
            duplicate_policy: config.duplicate_policy,
        }
    }
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

/// result of a successful request
#[derive(Debug, Clone)]
pub struct PendingTicket {
    pub payment_id: PaymentId,
    /// bounds the amount was validated against
    pub bounds: PaymentBounds,
    /// pending request this one replaced
    pub superseded: Option<PaymentId>,
    pub deliveries: DeliveryReport,
}

/// result of a successful decision
#[derive(Debug, Clone)]
pub struct Resolution {
    pub payment: PendingPayment,
    /// principal left after the approved month; none for rejections
    pub balance_after: Option<Money>,
    pub deliveries: DeliveryReport,
}

/// pending-payment state machine: Pending -> Approved | Rejected, exactly once
pub struct ApprovalWorkflow<S: LoanStore> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    calculator: Arc<AmortizationCalculator>,
    policy: WorkflowPolicy,
    // also serializes every mutation
    events: Mutex<EventStore>,
}

impl<S: LoanStore> ApprovalWorkflow<S> {
    pub fn new(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        calculator: Arc<AmortizationCalculator>,
        policy: WorkflowPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            calculator,
            policy,
            events: Mutex::new(EventStore::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn calculator(&self) -> &AmortizationCalculator {
        &self.calculator
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    /// live bounds for a month
    pub fn bounds(&self, month: u32) -> Result<PaymentBounds> {
        let state = self.store.read()?;
        PaymentBounds::for_month(
            &state.parameters,
            &state.ledger,
            &self.calculator,
            month,
            self.policy.minimum_payment,
        )
    }

    /// create a pending payment and ask every approver to decide
    pub fn create_request(
        &self,
        requester: Identity,
        month: u32,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PendingTicket> {
        self.create_request_at(requester, month, amount, time_provider.now())
    }

    pub fn create_request_at(
        &self,
        requester: Identity,
        month: u32,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<PendingTicket> {
        let mut events = self.lock_events();

        let payment = PendingPayment::new(requester.clone(), month, amount, now);
        let payment_id = payment.id;

        let (bounds, superseded, approvers) = self.store.update(|state| {
            let bounds = PaymentBounds::for_month(
                &state.parameters,
                &state.ledger,
                &self.calculator,
                month,
                self.policy.minimum_payment,
            )?;
            bounds.validate(amount)?;

            if self.policy.duplicate_policy == DuplicatePolicy::Reject {
                if let Some(existing) = state.pending_for(&payment.key()) {
                    return Err(LedgerError::DuplicateRequest {
                        existing: existing.id,
                    });
                }
            }

            let superseded = state.insert_pending(payment);
            Ok((bounds, superseded, state.approvers.clone()))
        })?;

        info!(
            "payment {} requested by {} for month {}: {}",
            payment_id, requester, month, amount
        );
        events.emit(Event::PaymentRequested {
            payment_id,
            requester: requester.clone(),
            month,
            amount,
            timestamp: now,
        });

        let mut deliveries = DeliveryReport::default();

        if let Some(previous) = &superseded {
            info!("payment {} superseded by {}", previous.id, payment_id);
            events.emit(Event::RequestSuperseded {
                payment_id: previous.id,
                replaced_by: payment_id,
                month,
                timestamp: now,
            });
            let notice = Notice::RequestSuperseded {
                payment_id: previous.id,
                replaced_by: payment_id,
                requester: requester.clone(),
                month,
            };
            let recipients = approvers.iter().chain(std::iter::once(&requester));
            deliveries.merge(deliver_all(self.notifier.as_ref(), recipients, &notice));
        }

        let notice = Notice::PaymentRequested {
            payment_id,
            requester,
            month,
            amount,
            interest: bounds.interest,
            balance_after: bounds.balance_after(amount),
        };
        deliveries.merge(deliver_all(self.notifier.as_ref(), approvers.iter(), &notice));

        record_failures(&mut events, &deliveries, now);

        Ok(PendingTicket {
            payment_id,
            bounds,
            superseded: superseded.map(|previous| previous.id),
            deliveries,
        })
    }

    /// settle a pending payment; the entry leaves the pending set before any side effect
    pub fn resolve(
        &self,
        decider: &Identity,
        payment_id: PaymentId,
        decision: Decision,
        time_provider: &SafeTimeProvider,
    ) -> Result<Resolution> {
        self.resolve_at(decider, payment_id, decision, time_provider.now())
    }

    pub fn resolve_at(
        &self,
        decider: &Identity,
        payment_id: PaymentId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<Resolution> {
        let mut events = self.lock_events();

        let (payment, balance_after, recipients) = self.store.update(|state| {
            if !state.is_approver(decider) {
                return Err(LedgerError::Unauthorized {
                    identity: decider.clone(),
                });
            }

            let payment = match state.take_pending(payment_id) {
                Some(payment) => payment,
                None => {
                    return Err(match state.resolved_payments.get(&payment_id) {
                        Some(settled) => LedgerError::AlreadyResolved {
                            id: payment_id,
                            status: settled.status,
                        },
                        None => LedgerError::NotFound { id: payment_id },
                    })
                }
            };

            let settled = payment.settle(decision, decider.clone(), now);
            let balance_after = match decision {
                Decision::Approve => {
                    // the term may have shrunk since the request; the entry stays pending
                    state.parameters.check_month(settled.month)?;
                    state.ledger.record_payment(settled.month, settled.amount)?;
                    Some(balance_before(
                        &state.parameters,
                        &state.ledger,
                        &self.calculator,
                        settled.month + 1,
                    ))
                }
                Decision::Reject => None,
            };
            state.archive(settled.clone());

            Ok((settled, balance_after, state.notify_recipients.clone()))
        })?;

        let mut deliveries = DeliveryReport::default();

        match balance_after {
            Some(balance_after) => {
                info!(
                    "payment {} approved by {}: month {} {}, balance {}",
                    payment.id, decider, payment.month, payment.amount, balance_after
                );
                events.emit(Event::PaymentApproved {
                    payment_id: payment.id,
                    decided_by: decider.clone(),
                    month: payment.month,
                    amount: payment.amount,
                    balance_after,
                    timestamp: now,
                });

                let notice = Notice::PaymentApproved {
                    payment_id: payment.id,
                    month: payment.month,
                    amount: payment.amount,
                    balance_after,
                };
                deliveries.merge(deliver_all(
                    self.notifier.as_ref(),
                    std::iter::once(&payment.requester),
                    &notice,
                ));

                let notice = Notice::PaymentRecorded {
                    month: payment.month,
                    amount: payment.amount,
                    balance_after,
                };
                let others = recipients.iter().filter(|r| **r != payment.requester);
                deliveries.merge(deliver_all(self.notifier.as_ref(), others, &notice));
            }
            None => {
                info!(
                    "payment {} rejected by {}: month {} {}",
                    payment.id, decider, payment.month, payment.amount
                );
                events.emit(Event::PaymentRejected {
                    payment_id: payment.id,
                    decided_by: decider.clone(),
                    month: payment.month,
                    amount: payment.amount,
                    timestamp: now,
                });

                let notice = Notice::PaymentRejected {
                    payment_id: payment.id,
                    month: payment.month,
                    amount: payment.amount,
                };
                deliveries.merge(deliver_all(
                    self.notifier.as_ref(),
                    std::iter::once(&payment.requester),
                    &notice,
                ));
            }
        }

        record_failures(&mut events, &deliveries, now);

        Ok(Resolution {
            payment,
            balance_after,
            deliveries,
        })
    }

    pub fn pending_payments(&self) -> Result<Vec<PendingPayment>> {
        self.store.pending_payments()
    }

    pub fn pending_payment(&self, payment_id: PaymentId) -> Result<Option<PendingPayment>> {
        Ok(self.store.read()?.pending_payments.remove(&payment_id))
    }

    pub fn take_events(&self) -> Vec<Event> {
        self.lock_events().take_events()
    }

    fn lock_events(&self) -> MutexGuard<'_, EventStore> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn record_failures(events: &mut EventStore, deliveries: &DeliveryReport, now: DateTime<Utc>) {
    for failure in &deliveries.failed {
        events.emit(Event::NotificationFailed {
            recipient: failure.recipient.clone(),
            reason: failure.reason.clone(),
            timestamp: now,
        });
    }
}
