pub mod amortization;
pub mod ledger;
pub mod schedule;
pub mod walk;

use serde::{Deserialize, Serialize};

use crate::config::LoanParameters;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

pub use amortization::{level_payment, AmortizationCalculator};
pub use ledger::PaymentLedger;
pub use schedule::{DatedLine, Schedule, ScheduleProjector};
pub use walk::{balance_before, settle_month, BalanceWalk, ScheduleLine};

/// admissible payment range for one month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBounds {
    pub month: u32,
    /// principal outstanding before the month's payment
    pub balance: Money,
    /// interest accrued during the month
    pub interest: Money,
    pub minimum: Money,
    /// full payoff: balance plus the month's interest, rounded up to minor units
    pub maximum: Money,
}

impl PaymentBounds {
    /// live bounds from the current ledger
    pub fn for_month(
        parameters: &LoanParameters,
        ledger: &PaymentLedger,
        calculator: &AmortizationCalculator,
        month: u32,
        minimum_payment: Money,
    ) -> Result<Self> {
        parameters.check_month(month)?;

        let balance = balance_before(parameters, ledger, calculator, month);
        let interest = balance.monthly_interest(parameters.annual_rate);
        // a projected month can leave sub-minor residue on the balance
        let maximum = (balance + interest).ceil_minor();

        Ok(Self {
            month,
            balance,
            interest,
            // a final balance below the configured minimum can still be paid off
            minimum: minimum_payment.min(maximum),
            maximum,
        })
    }

    pub fn validate(&self, amount: Money) -> Result<()> {
        if !amount.is_positive() || amount < self.minimum || amount > self.maximum {
            return Err(LedgerError::InvalidAmount {
                amount,
                minimum: self.minimum,
                maximum: self.maximum,
            });
        }
        Ok(())
    }

    /// principal left after paying `amount` this month
    pub fn balance_after(&self, amount: Money) -> Money {
        (self.balance - (amount - self.interest)).max(Money::ZERO)
    }
}
