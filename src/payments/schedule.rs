use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{self, HolidayCalendar};
use crate::config::LoanParameters;
use crate::decimal::Money;
use crate::errors::Result;
use crate::payments::amortization::AmortizationCalculator;
use crate::payments::ledger::PaymentLedger;
use crate::payments::walk::{BalanceWalk, ScheduleLine};

/// projected schedule for the whole loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub parameters: LoanParameters,
    pub lines: Vec<ScheduleLine>,
    /// sum of recorded ledger amounts
    pub total_paid: Money,
    /// interest over the whole walk, actual and projected months
    pub total_interest: Money,
    /// payments over the whole walk, actual and projected months
    pub total_payment: Money,
}

/// schedule line with its display due date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedLine {
    pub line: ScheduleLine,
    pub due_date: NaiveDate,
    /// due date moved back to a working day
    pub settlement_date: NaiveDate,
}

impl Schedule {
    pub fn line(&self, month: u32) -> Option<&ScheduleLine> {
        self.lines.iter().find(|line| line.month == month)
    }

    /// first month without a recorded payment
    pub fn next_unpaid(&self) -> Option<&ScheduleLine> {
        self.lines.iter().find(|line| !line.is_actual)
    }

    /// balance after the last recorded month that the walk reached
    pub fn outstanding_balance(&self) -> Money {
        self.lines
            .iter()
            .filter(|line| line.is_actual)
            .last()
            .map(|line| line.balance)
            .unwrap_or(self.parameters.principal)
    }

    pub fn is_paid_off(&self) -> bool {
        self.lines
            .last()
            .map(|line| line.is_actual && line.balance.is_zero())
            .unwrap_or(false)
    }

    pub fn paid_months(&self) -> usize {
        self.lines.iter().filter(|line| line.is_actual).count()
    }

    /// attach due dates counted from `anchor`
    pub fn dated_lines(&self, anchor: NaiveDate, calendar: &HolidayCalendar) -> Result<Vec<DatedLine>> {
        self.lines
            .iter()
            .map(|line| {
                let due_date = calendar::due_date(anchor, line.month, self.parameters.payment_day)?;
                Ok(DatedLine {
                    line: *line,
                    due_date,
                    settlement_date: calendar.settlement_date(due_date),
                })
            })
            .collect()
    }
}

/// builds schedules from parameters and the ledger
pub struct ScheduleProjector<'a> {
    calculator: &'a AmortizationCalculator,
}

impl<'a> ScheduleProjector<'a> {
    pub fn new(calculator: &'a AmortizationCalculator) -> Self {
        Self { calculator }
    }

    /// project every month; pure in (parameters, ledger)
    pub fn project(&self, parameters: &LoanParameters, ledger: &PaymentLedger) -> Schedule {
        let lines: Vec<ScheduleLine> =
            BalanceWalk::new(parameters, ledger, self.calculator).collect();

        let total_interest = lines.iter().map(|line| line.interest).sum();
        let total_payment = lines.iter().map(|line| line.payment).sum();

        Schedule {
            parameters: parameters.clone(),
            lines,
            total_paid: ledger.total_paid(),
            total_interest,
            total_payment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn parameters(principal: i64, rate: Rate, term_months: u32) -> LoanParameters {
        LoanParameters {
            principal: Money::from_major(principal),
            annual_rate: rate,
            term_months,
            payment_day: 8,
        }
    }

    #[test]
    fn test_reference_projection_without_payments() {
        let calculator = AmortizationCalculator::new();
        let schedule = ScheduleProjector::new(&calculator)
            .project(&parameters(1_500_000, Rate::from_percentage(10), 12), &PaymentLedger::new());

        assert_eq!(schedule.lines.len(), 12);
        assert_eq!(schedule.lines[0].payment, Money::from_str_exact("131873.83").unwrap());
        assert_eq!(schedule.lines[0].interest, Money::from_major(12_500));
        assert!(!schedule.lines[0].is_actual);
        assert_eq!(schedule.total_paid, Money::ZERO);
        assert_eq!(schedule.lines[11].balance, Money::ZERO);
        assert_eq!(schedule.next_unpaid().map(|l| l.month), Some(1));
        assert_eq!(schedule.outstanding_balance(), Money::from_major(1_500_000));
    }

    #[test]
    fn test_principal_components_sum_to_principal() {
        let calculator = AmortizationCalculator::new();
        let projector = ScheduleProjector::new(&calculator);
        let cases = [
            (1_500_000, Rate::from_percentage(10), 12),
            (100_000, Rate::from_percentage(12), 24),
            (250_000, Rate::from_percent(dec!(7.25)), 36),
            (999_999, Rate::from_percent(dec!(0.5)), 7),
            (50_000, Rate::from_percentage(35), 60),
        ];

        for (principal, rate, term) in cases {
            let params = parameters(principal, rate, term);
            let schedule = projector.project(&params, &PaymentLedger::new());
            let repaid: Money = schedule.lines.iter().map(|line| line.principal).sum();

            assert_eq!(repaid, params.principal, "principal {} term {}", principal, term);
            assert_eq!(schedule.lines.last().unwrap().balance, Money::ZERO);
            assert_eq!(schedule.lines.len() as u32, term);

            // level payments stay within a minor unit per month of each other
            let first = schedule.lines[0].payment;
            for line in &schedule.lines[..schedule.lines.len() - 1] {
                assert!((line.payment - first).abs() <= Money::from_minor(1) * Decimal::from(line.month));
            }
        }
    }

    #[test]
    fn test_zero_rate_projection() {
        let calculator = AmortizationCalculator::new();
        let schedule = ScheduleProjector::new(&calculator)
            .project(&parameters(1_200_000, Rate::ZERO, 12), &PaymentLedger::new());

        assert_eq!(schedule.lines.len(), 12);
        assert!(schedule.lines.iter().all(|line| line.payment == Money::from_major(100_000)));
        assert_eq!(schedule.total_interest, Money::ZERO);
    }

    #[test]
    fn test_actual_payments_drive_projection() {
        let calculator = AmortizationCalculator::new();
        let params = parameters(1_500_000, Rate::from_percentage(10), 12);
        let mut ledger = PaymentLedger::new();
        ledger.record_payment(1, Money::from_str_exact("131978.88").unwrap()).unwrap();

        let schedule = ScheduleProjector::new(&calculator).project(&params, &ledger);

        assert!(schedule.lines[0].is_actual);
        assert_eq!(schedule.lines[0].balance, Money::from_str_exact("1380521.12").unwrap());
        assert_eq!(schedule.total_paid, Money::from_str_exact("131978.88").unwrap());
        assert_eq!(schedule.outstanding_balance(), Money::from_str_exact("1380521.12").unwrap());
        assert_eq!(schedule.next_unpaid().map(|l| l.month), Some(2));
        assert_eq!(
            schedule.lines[1].payment,
            calculator.monthly_payment(schedule.lines[0].balance, params.annual_rate, 11)
        );
    }

    #[test]
    fn test_early_payoff_stops_projection() {
        let calculator = AmortizationCalculator::new();
        let params = parameters(1_500_000, Rate::from_percentage(10), 12);
        let mut ledger = PaymentLedger::new();
        ledger.record_payment(1, Money::from_major(2_000_000)).unwrap();

        let schedule = ScheduleProjector::new(&calculator).project(&params, &ledger);

        assert_eq!(schedule.lines.len(), 1);
        assert_eq!(schedule.lines[0].payment, Money::from_major(1_512_500));
        assert!(schedule.is_paid_off());
        // total paid reports what was recorded, not the clamped figure
        assert_eq!(schedule.total_paid, Money::from_major(2_000_000));
        assert_eq!(schedule.total_interest, Money::from_major(12_500));
    }

    #[test]
    fn test_totals_agree_with_lines() {
        let calculator = AmortizationCalculator::new();
        let params = parameters(1_500_000, Rate::from_percentage(10), 12);
        let mut ledger = PaymentLedger::new();
        ledger.record_payment(1, Money::from_major(200_000)).unwrap();
        ledger.record_payment(2, Money::from_major(150_000)).unwrap();

        let schedule = ScheduleProjector::new(&calculator).project(&params, &ledger);
        let interest: Money = schedule.lines.iter().map(|line| line.interest).sum();
        let payments: Money = schedule.lines.iter().map(|line| line.payment).sum();

        assert_eq!(schedule.total_interest, interest);
        assert_eq!(schedule.total_payment, payments);
        assert_eq!(schedule.total_payment - schedule.total_interest, params.principal);

        for line in &schedule.lines {
            assert_eq!(
                ledger.balance_as_of(&params, line.month + 1),
                line.balance,
                "month {}",
                line.month
            );
        }
    }

    #[test]
    fn test_projection_is_deterministic() {
        let calculator = AmortizationCalculator::new();
        let params = parameters(700_000, Rate::from_percentage(9), 18);
        let mut ledger = PaymentLedger::new();
        ledger.record_payment(3, Money::from_major(60_000)).unwrap();
        let projector = ScheduleProjector::new(&calculator);

        assert_eq!(projector.project(&params, &ledger), projector.project(&params, &ledger));
    }

    #[test]
    fn test_dated_lines() {
        let calculator = AmortizationCalculator::new();
        let schedule = ScheduleProjector::new(&calculator)
            .project(&parameters(120_000, Rate::from_percentage(12), 3), &PaymentLedger::new());

        let anchor = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let dated = schedule.dated_lines(anchor, &HolidayCalendar::default()).unwrap();

        assert_eq!(dated.len(), 3);
        // 2024-06-08 is a saturday
        assert_eq!(dated[0].due_date, NaiveDate::from_ymd_opt(2024, 6, 8).unwrap());
        assert_eq!(dated[0].settlement_date, NaiveDate::from_ymd_opt(2024, 6, 7).unwrap());
        assert_eq!(dated[2].due_date, NaiveDate::from_ymd_opt(2024, 8, 8).unwrap());
        assert_eq!(dated[0].line, schedule.lines[0]);
    }
}
