pub mod admin;
pub mod approval;
pub mod calendar;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod notify;
pub mod payments;
pub mod receipt;
pub mod service;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod views;

// re-export key types
pub use admin::Administration;
pub use approval::{
    ApprovalWorkflow, PendingPayment, PendingTicket, Reply, Resolution, WorkQueue, WorkflowPolicy,
};
pub use calendar::HolidayCalendar;
pub use config::{LoanParameters, LoggingConfig, ParameterField, QueueConfig, ServiceConfig};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use notify::{deliver_all, DeliveryReport, Notice, Notifier, Outbox};
pub use payments::{
    AmortizationCalculator, PaymentBounds, PaymentLedger, Schedule, ScheduleLine,
    ScheduleProjector,
};
pub use receipt::{ReceiptExtractor, ReceiptInfo, ReceiptIntake, TextReceiptParser};
pub use service::LoanService;
pub use state::LoanState;
pub use store::{JsonFileStore, LoanStore, MemoryStore};
pub use types::{
    Decision, DuplicatePolicy, Identity, IdentitySet, OverflowPolicy, PaymentId, PaymentStatus,
};
pub use views::{LoanSummary, ScheduleView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
