pub mod json_file;
pub mod memory;

use crate::approval::pending::PendingPayment;
use crate::config::LoanParameters;
use crate::errors::Result;
use crate::payments::PaymentLedger;
use crate::state::LoanState;
use crate::types::{IdentitySet, PaymentId};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// persistence for the loan's aggregates; `update` commits in full or not at all
pub trait LoanStore: Send + Sync {
    /// snapshot of every aggregate
    fn read(&self) -> Result<LoanState>;

    /// apply `f` atomically; an error from `f` discards its changes
    fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut LoanState) -> Result<R>;

    fn parameters(&self) -> Result<LoanParameters> {
        Ok(self.read()?.parameters)
    }

    fn set_parameters(&self, parameters: LoanParameters) -> Result<()> {
        self.update(|state| {
            state.parameters = parameters;
            Ok(())
        })
    }

    fn ledger(&self) -> Result<PaymentLedger> {
        Ok(self.read()?.ledger)
    }

    fn approvers(&self) -> Result<IdentitySet> {
        Ok(self.read()?.approvers)
    }

    fn notify_recipients(&self) -> Result<IdentitySet> {
        Ok(self.read()?.notify_recipients)
    }

    fn pending_payments(&self) -> Result<Vec<PendingPayment>> {
        Ok(self.read()?.pending_payments.into_values().collect())
    }

    /// remove and return a pending entry; `None` if it is not pending
    fn take_pending(&self, id: PaymentId) -> Result<Option<PendingPayment>> {
        self.update(|state| Ok(state.take_pending(id)))
    }
}
