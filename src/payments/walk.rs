use serde::{Deserialize, Serialize};

use crate::config::LoanParameters;
use crate::decimal::{Money, Rate};
use crate::payments::amortization::AmortizationCalculator;
use crate::payments::ledger::PaymentLedger;

/// one month of the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleLine {
    pub month: u32,
    pub opening_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    /// balance after this month's payment
    pub balance: Money,
    /// recorded in the ledger rather than projected
    pub is_actual: bool,
}

/// split a payment into interest and principal for one month.
///
/// a payment that covers the whole balance is clamped to `balance + interest`.
pub fn settle_month(
    month: u32,
    balance: Money,
    annual_rate: Rate,
    payment: Money,
    is_actual: bool,
) -> ScheduleLine {
    let interest = balance.monthly_interest(annual_rate);
    let principal = payment - interest;

    let (payment, principal, closing) = if balance <= principal {
        (balance + interest, balance, Money::ZERO)
    } else {
        (payment, principal, balance - principal)
    };

    ScheduleLine {
        month,
        opening_balance: balance,
        payment,
        interest,
        principal,
        balance: closing,
        is_actual,
    }
}

/// iterator over the loan's months, using ledger amounts where recorded
/// and level payments on the remaining balance elsewhere
pub struct BalanceWalk<'a> {
    parameters: &'a LoanParameters,
    ledger: &'a PaymentLedger,
    calculator: &'a AmortizationCalculator,
    month: u32,
    balance: Money,
    finished: bool,
}

impl<'a> BalanceWalk<'a> {
    pub fn new(
        parameters: &'a LoanParameters,
        ledger: &'a PaymentLedger,
        calculator: &'a AmortizationCalculator,
    ) -> Self {
        Self {
            parameters,
            ledger,
            calculator,
            month: 1,
            balance: parameters.principal,
            finished: !parameters.principal.is_positive(),
        }
    }
}

impl Iterator for BalanceWalk<'_> {
    type Item = ScheduleLine;

    fn next(&mut self) -> Option<ScheduleLine> {
        if self.finished || self.month > self.parameters.term_months {
            return None;
        }

        let month = self.month;
        let (payment, is_actual) = match self.ledger.get(month) {
            Some(amount) => (amount, true),
            // the last month settles whatever rounding left behind
            None if month == self.parameters.term_months => (
                self.balance + self.balance.monthly_interest(self.parameters.annual_rate),
                false,
            ),
            None => {
                let remaining = self.parameters.term_months - month + 1;
                let payment = self.calculator.monthly_payment(
                    self.balance,
                    self.parameters.annual_rate,
                    remaining,
                );
                (payment, false)
            }
        };

        let line = settle_month(month, self.balance, self.parameters.annual_rate, payment, is_actual);

        self.balance = line.balance;
        self.month += 1;
        if self.balance.is_zero() {
            self.finished = true;
        }

        Some(line)
    }
}

/// outstanding principal immediately before `month`'s payment
pub fn balance_before(
    parameters: &LoanParameters,
    ledger: &PaymentLedger,
    calculator: &AmortizationCalculator,
    month: u32,
) -> Money {
    let mut balance = parameters.principal;
    for line in BalanceWalk::new(parameters, ledger, calculator) {
        if line.month >= month {
            break;
        }
        balance = line.balance;
    }
    balance
}
