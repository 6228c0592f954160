use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LoanParameters;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::payments::amortization::AmortizationCalculator;
use crate::payments::walk;

/// confirmed payments keyed by month index; absent months are unpaid
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentLedger {
    entries: BTreeMap<u32, Money>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// insert or overwrite the payment for `month`, returning the previous amount
    pub fn record_payment(&mut self, month: u32, amount: Money) -> Result<Option<Money>> {
        if month == 0 {
            return Err(LedgerError::invalid_parameter("month", "months are numbered from 1"));
        }
        if !amount.is_positive() {
            return Err(LedgerError::invalid_parameter(
                "amount",
                format!("must be positive, got {}", amount),
            ));
        }
        Ok(self.entries.insert(month, amount))
    }

    /// drop every entry, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn get(&self, month: u32) -> Option<Money> {
        self.entries.get(&month).copied()
    }

    pub fn contains(&self, month: u32) -> bool {
        self.entries.contains_key(&month)
    }

    /// entries in month order
    pub fn iter(&self) -> impl Iterator<Item = (u32, Money)> + '_ {
        self.entries.iter().map(|(month, amount)| (*month, *amount))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// sum of recorded amounts
    pub fn total_paid(&self) -> Money {
        self.entries.values().sum()
    }

    /// first month in `1..=term_months` without a recorded payment
    pub fn next_unpaid_month(&self, term_months: u32) -> Option<u32> {
        (1..=term_months).find(|month| !self.entries.contains_key(month))
    }

    /// outstanding principal immediately before `month`'s payment
    pub fn balance_as_of(&self, parameters: &LoanParameters, month: u32) -> Money {
        walk::balance_before(parameters, self, &AmortizationCalculator::uncached(), month)
    }

    /// interest accrued during `month` on the balance outstanding at its start
    pub fn interest_for_month(&self, parameters: &LoanParameters, month: u32) -> Money {
        self.balance_as_of(parameters, month)
            .monthly_interest(parameters.annual_rate)
    }
}
