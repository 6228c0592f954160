use std::sync::{Mutex, PoisonError};

use crate::config::LoanParameters;
use crate::errors::Result;
use crate::state::LoanState;
use crate::store::LoanStore;

/// in-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<LoanState>,
}

impl MemoryStore {
    pub fn new(parameters: LoanParameters) -> Self {
        Self::from_state(LoanState::new(parameters))
    }

    pub fn from_state(state: LoanState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl LoanStore for MemoryStore {
    fn read(&self) -> Result<LoanState> {
        Ok(self.state.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut LoanState) -> Result<R>,
    {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut working = guard.clone();
        let result = f(&mut working)?;
        *guard = working;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::pending::PendingPayment;
    use crate::decimal::Money;
    use crate::errors::LedgerError;
    use chrono::Utc;

    #[test]
    fn test_failed_update_leaves_state_untouched() {
        let store = MemoryStore::new(LoanParameters::default());

        let result: Result<()> = store.update(|state| {
            state.ledger.record_payment(1, Money::from_major(100))?;
            Err(LedgerError::invalid_parameter("test", "abort"))
        });

        assert!(result.is_err());
        assert!(store.ledger().unwrap().is_empty());
    }

    #[test]
    fn test_take_pending_is_test_and_delete() {
        let store = MemoryStore::new(LoanParameters::default());
        let payment = PendingPayment::new("1".into(), 1, Money::from_major(100), Utc::now());
        let id = payment.id;
        store
            .update(|state| {
                state.insert_pending(payment);
                Ok(())
            })
            .unwrap();

        assert_eq!(store.pending_payments().unwrap().len(), 1);
        assert!(store.take_pending(id).unwrap().is_some());
        assert!(store.take_pending(id).unwrap().is_none());
        assert!(store.pending_payments().unwrap().is_empty());
    }

    #[test]
    fn test_set_parameters() {
        let store = MemoryStore::new(LoanParameters::default());
        let mut parameters = LoanParameters::default();
        parameters.term_months = 24;
        store.set_parameters(parameters.clone()).unwrap();
        assert_eq!(store.parameters().unwrap(), parameters);
    }
}
