/// serializable snapshots for display and export
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::HolidayCalendar;
use crate::config::LoanParameters;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::payments::{DatedLine, Schedule, ScheduleLine};

/// serializable view of a projected schedule
#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleView {
    pub terms: TermsView,
    pub lines: Vec<ScheduleLineView>,
    pub total_paid: Money,
    pub total_interest: Money,
    pub total_payment: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TermsView {
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
    pub payment_day: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleLineView {
    pub month: u32,
    pub due_date: Option<NaiveDate>,
    pub settlement_date: Option<NaiveDate>,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub balance: Money,
    pub status: LineStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStatus {
    Paid,
    Projected,
}

impl From<&LoanParameters> for TermsView {
    fn from(parameters: &LoanParameters) -> Self {
        TermsView {
            principal: parameters.principal,
            interest_rate: parameters.annual_rate,
            term_months: parameters.term_months,
            payment_day: parameters.payment_day,
        }
    }
}

impl ScheduleLineView {
    fn from_line(line: &ScheduleLine, dates: Option<(NaiveDate, NaiveDate)>) -> Self {
        ScheduleLineView {
            month: line.month,
            due_date: dates.map(|(due, _)| due),
            settlement_date: dates.map(|(_, settlement)| settlement),
            payment: line.payment.round_minor(),
            interest: line.interest.round_minor(),
            principal: line.principal.round_minor(),
            balance: line.balance.round_minor(),
            status: if line.is_actual {
                LineStatus::Paid
            } else {
                LineStatus::Projected
            },
        }
    }
}

impl ScheduleView {
    /// figures only, no dates
    pub fn from_schedule(schedule: &Schedule) -> Self {
        Self::build(
            schedule,
            schedule
                .lines
                .iter()
                .map(|line| ScheduleLineView::from_line(line, None))
                .collect(),
        )
    }

    /// figures plus due dates counted from `anchor`
    pub fn with_dates(schedule: &Schedule, anchor: NaiveDate, calendar: &HolidayCalendar) -> Result<Self> {
        let lines = schedule
            .dated_lines(anchor, calendar)?
            .iter()
            .map(|dated: &DatedLine| {
                ScheduleLineView::from_line(&dated.line, Some((dated.due_date, dated.settlement_date)))
            })
            .collect();
        Ok(Self::build(schedule, lines))
    }

    fn build(schedule: &Schedule, lines: Vec<ScheduleLineView>) -> Self {
        ScheduleView {
            terms: TermsView::from(&schedule.parameters),
            lines,
            total_paid: schedule.total_paid.round_minor(),
            total_interest: schedule.total_interest.round_minor(),
            total_payment: schedule.total_payment.round_minor(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// short account of where the loan stands
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanSummary {
    pub terms: TermsView,
    pub outstanding_balance: Money,
    pub paid_months: usize,
    pub total_paid: Money,
    pub total_interest: Money,
    pub is_paid_off: bool,
    pub next_payment: Option<NextPaymentView>,
    pub pending_requests: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NextPaymentView {
    pub month: u32,
    pub amount: Money,
    pub interest: Money,
}

impl LoanSummary {
    pub fn from_schedule(schedule: &Schedule, pending_requests: usize) -> Self {
        LoanSummary {
            terms: TermsView::from(&schedule.parameters),
            outstanding_balance: schedule.outstanding_balance().round_minor(),
            paid_months: schedule.paid_months(),
            total_paid: schedule.total_paid.round_minor(),
            total_interest: schedule.total_interest.round_minor(),
            is_paid_off: schedule.is_paid_off(),
            next_payment: schedule.next_unpaid().map(|line| NextPaymentView {
                month: line.month,
                amount: line.payment.round_minor(),
                interest: line.interest.round_minor(),
            }),
            pending_requests,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{AmortizationCalculator, PaymentLedger, ScheduleProjector};

    fn schedule(ledger: &PaymentLedger) -> Schedule {
        let calculator = AmortizationCalculator::new();
        ScheduleProjector::new(&calculator).project(&LoanParameters::default(), ledger)
    }

    #[test]
    fn test_schedule_view_without_dates() {
        let view = ScheduleView::from_schedule(&schedule(&PaymentLedger::new()));
        assert_eq!(view.lines.len(), 12);
        assert!(view.lines.iter().all(|line| line.due_date.is_none()));
        assert!(view.lines.iter().all(|line| line.status == LineStatus::Projected));
        assert_eq!(view.lines[0].payment, Money::from_minor(13_187_383));
    }

    #[test]
    fn test_schedule_view_with_dates() {
        let mut ledger = PaymentLedger::new();
        ledger.record_payment(1, Money::from_major(131_000)).unwrap();

        let anchor = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let view = ScheduleView::with_dates(&schedule(&ledger), anchor, &HolidayCalendar::default()).unwrap();

        assert_eq!(view.lines[0].status, LineStatus::Paid);
        assert_eq!(view.lines[0].due_date, NaiveDate::from_ymd_opt(2024, 1, 8));
        // 2024-03-08 is a public holiday, settled the day before
        assert_eq!(view.lines[2].due_date, NaiveDate::from_ymd_opt(2024, 3, 8));
        assert_eq!(view.lines[2].settlement_date, NaiveDate::from_ymd_opt(2024, 3, 7));
    }

    #[test]
    fn test_summary_json() {
        let mut ledger = PaymentLedger::new();
        ledger.record_payment(1, Money::from_major(131_000)).unwrap();

        let summary = LoanSummary::from_schedule(&schedule(&ledger), 2);
        assert_eq!(summary.paid_months, 1);
        assert_eq!(summary.next_payment.as_ref().map(|next| next.month), Some(2));
        assert!(!summary.is_paid_off);

        let json = summary.to_json_pretty().unwrap();
        assert!(json.contains("\"pending_requests\": 2"));
        assert!(json.contains("\"outstanding_balance\""));
    }
}
