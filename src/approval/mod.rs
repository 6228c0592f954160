pub mod pending;
pub mod queue;
pub mod workflow;

pub use pending::{PendingKey, PendingPayment};
pub use queue::{Reply, WorkQueue};
pub use workflow::{ApprovalWorkflow, PendingTicket, Resolution, WorkflowPolicy};
