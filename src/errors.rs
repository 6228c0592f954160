use thiserror::Error;

use crate::decimal::Money;
use crate::types::{Identity, PaymentId, PaymentStatus};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid payment amount {amount}: must be between {minimum} and {maximum}")]
    InvalidAmount {
        amount: Money,
        minimum: Money,
        maximum: Money,
    },

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        name: String,
        message: String,
    },

    #[error("pending payment not found: {id}")]
    NotFound {
        id: PaymentId,
    },

    #[error("payment {id} already resolved as {status:?}")]
    AlreadyResolved {
        id: PaymentId,
        status: PaymentStatus,
    },

    #[error("a pending request already exists for this month: {existing}")]
    DuplicateRequest {
        existing: PaymentId,
    },

    #[error("identity {identity} is not allowed to perform this operation")]
    Unauthorized {
        identity: Identity,
    },

    #[error("no amount detected in receipt")]
    NoAmountDetected,

    #[error("all months of the loan are already paid")]
    LoanFullyPaid,

    #[error("notification to {recipient} failed: {reason}")]
    NotificationDeliveryFailed {
        recipient: Identity,
        reason: String,
    },

    #[error("work queue full: capacity {capacity}")]
    QueueFull {
        capacity: usize,
    },

    #[error("work queue worker stopped")]
    WorkerStopped,

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

impl LedgerError {
    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        LedgerError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Storage {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
