use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::config::LoanParameters;
use crate::errors::Result;
use crate::state::LoanState;
use crate::store::LoanStore;

/// store backed by a single json document, rewritten after every update
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<LoanState>,
}

impl JsonFileStore {
    /// open the document at `path`, creating it with `default_parameters` if absent
    pub fn open(path: impl Into<PathBuf>, default_parameters: LoanParameters) -> Result<Self> {
        let path = path.into();

        let state = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let state: LoanState = serde_json::from_str(&contents)?;
            info!(
                "loaded loan state from {} ({} ledger entries, {} pending)",
                path.display(),
                state.ledger.len(),
                state.pending_payments.len()
            );
            state
        } else {
            let state = LoanState::new(default_parameters);
            write_document(&path, &state)?;
            info!("created loan state at {}", path.display());
            state
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LoanStore for JsonFileStore {
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
        write_document(&self.path, &working)?;
        *guard = working;
        Ok(result)
    }
}

/// write via a sibling temp file so readers never see a torn document
fn write_document(path: &Path, state: &LoanState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    debug!("persisted loan state to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::errors::LedgerError;

    #[test]
    fn test_creates_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loan.json");

        {
            let store = JsonFileStore::open(&path, LoanParameters::default()).unwrap();
            assert!(path.exists());
            store
                .update(|state| {
                    state.ledger.record_payment(1, Money::from_major(131_000))?;
                    state.approvers.insert("7".into());
                    Ok(())
                })
                .unwrap();
        }

        let reopened = JsonFileStore::open(&path, LoanParameters::default()).unwrap();
        let state = reopened.read().unwrap();
        assert_eq!(state.ledger.get(1), Some(Money::from_major(131_000)));
        assert!(state.approvers.contains(&"7".into()));
    }

    #[test]
    fn test_failed_update_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loan.json");
        let store = JsonFileStore::open(&path, LoanParameters::default()).unwrap();

        let result: Result<()> = store.update(|state| {
            state.ledger.record_payment(1, Money::from_major(100))?;
            Err(LedgerError::invalid_parameter("test", "abort"))
        });
        assert!(result.is_err());

        let reopened = JsonFileStore::open(&path, LoanParameters::default()).unwrap();
        assert!(reopened.ledger().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loan.json");
        fs::write(&path, "{not json").unwrap();

        let result = JsonFileStore::open(&path, LoanParameters::default());
        assert!(matches!(result, Err(LedgerError::Storage { .. })));
    }
}
