use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{Identity, PaymentId};

/// all events that can be emitted by the approval workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // request events
    PaymentRequested {
        payment_id: PaymentId,
        requester: Identity,
        month: u32,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    RequestSuperseded {
        payment_id: PaymentId,
        replaced_by: PaymentId,
        month: u32,
        timestamp: DateTime<Utc>,
    },

    // decision events
    PaymentApproved {
        payment_id: PaymentId,
        decided_by: Identity,
        month: u32,
        amount: Money,
        balance_after: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        payment_id: PaymentId,
        decided_by: Identity,
        month: u32,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // delivery events
    NotificationFailed {
        recipient: Identity,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
