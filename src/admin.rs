use std::sync::Arc;

use tracing::info;

use crate::config::{LoanParameters, ParameterField, ServiceConfig};
use crate::errors::{LedgerError, Result};
use crate::store::LoanStore;
use crate::types::{Identity, IdentitySet};

/// operations reserved for the configured admin identity
pub struct Administration<S: LoanStore> {
    store: Arc<S>,
    admin: Identity,
    max_term_months: u32,
}

impl<S: LoanStore> Administration<S> {
    pub fn new(store: Arc<S>, config: &ServiceConfig) -> Self {
        Self {
            store,
            admin: config.admin.clone(),
            max_term_months: config.max_term_months,
        }
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        *identity == self.admin
    }

    /// replace all loan parameters at once
    pub fn reconfigure(&self, actor: &Identity, parameters: LoanParameters) -> Result<()> {
        self.authorize(actor)?;
        parameters.validate(self.max_term_months)?;
        info!(
            "{} reconfigured loan: principal {}, rate {}, term {}, day {}",
            actor,
            parameters.principal,
            parameters.annual_rate,
            parameters.term_months,
            parameters.payment_day
        );
        self.store.set_parameters(parameters)
    }

    /// change one parameter from user-entered text
    pub fn update_parameter(
        &self,
        actor: &Identity,
        field: ParameterField,
        input: &str,
    ) -> Result<LoanParameters> {
        self.authorize(actor)?;
        let max_term_months = self.max_term_months;
        let updated = self.store.update(|state| {
            let updated = field.apply(&state.parameters, input)?;
            updated.validate(max_term_months)?;
            state.parameters = updated.clone();
            Ok(updated)
        })?;
        info!("{} set {} to {}", actor, field.name(), input.trim());
        Ok(updated)
    }

    /// remove every ledger entry and the settled history; returns how many entries were removed
    pub fn clear_ledger(&self, actor: &Identity) -> Result<usize> {
        self.authorize(actor)?;
        let removed = self.store.update(|state| {
            state.resolved_payments.clear();
            Ok(state.ledger.clear())
        })?;
        info!("{} cleared the ledger ({} entries)", actor, removed);
        Ok(removed)
    }

    pub fn add_approver(&self, actor: &Identity, approver: Identity) -> Result<bool> {
        self.authorize(actor)?;
        info!("{} added approver {}", actor, approver);
        self.store.update(|state| Ok(state.approvers.insert(approver)))
    }

    pub fn remove_approver(&self, actor: &Identity, approver: &Identity) -> Result<bool> {
        self.authorize(actor)?;
        info!("{} removed approver {}", actor, approver);
        self.store.update(|state| Ok(state.approvers.remove(approver)))
    }

    pub fn approvers(&self, actor: &Identity) -> Result<IdentitySet> {
        self.authorize(actor)?;
        self.store.approvers()
    }

    pub fn add_recipient(&self, actor: &Identity, recipient: Identity) -> Result<bool> {
        self.authorize(actor)?;
        info!("{} added notify recipient {}", actor, recipient);
        self.store.update(|state| Ok(state.notify_recipients.insert(recipient)))
    }

    pub fn remove_recipient(&self, actor: &Identity, recipient: &Identity) -> Result<bool> {
        self.authorize(actor)?;
        info!("{} removed notify recipient {}", actor, recipient);
        self.store.update(|state| Ok(state.notify_recipients.remove(recipient)))
    }

    pub fn recipients(&self, actor: &Identity) -> Result<IdentitySet> {
        self.authorize(actor)?;
        self.store.notify_recipients()
    }

    fn authorize(&self, actor: &Identity) -> Result<()> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                identity: actor.clone(),
            })
        }
    }
}
