/// quick start - project a schedule, record a payment, project again
use loan_approval_rs::payments::{AmortizationCalculator, PaymentLedger, ScheduleProjector};
use loan_approval_rs::views::ScheduleView;
use loan_approval_rs::{LoanParameters, Money, Rate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1,500,000 at 10% over a year, due on the 8th
    let parameters = LoanParameters::new(
        Money::from_major(1_500_000),
        Rate::from_percentage(10),
        12,
        8,
        360,
    )?;

    let calculator = AmortizationCalculator::new();
    let projector = ScheduleProjector::new(&calculator);

    let mut ledger = PaymentLedger::new();
    let schedule = projector.project(&parameters, &ledger);
    println!(
        "level payment: {}, total interest: {}",
        schedule.lines[0].payment,
        schedule.total_interest.round_minor()
    );

    // pay a little more than projected in month 1
    ledger.record_payment(1, Money::from_str_exact("131978.88")?)?;
    println!(
        "balance before month 2: {}",
        ledger.balance_as_of(&parameters, 2)
    );

    let schedule = projector.project(&parameters, &ledger);
    println!("{}", ScheduleView::from_schedule(&schedule).to_json_pretty()?);

    Ok(())
}
