/// approval queue - request, approve and reject payments through the service
use std::sync::Arc;

use loan_approval_rs::chrono::{TimeZone, Utc};
use loan_approval_rs::{
    Decision, LoanService, LoggingConfig, Money, Outbox, SafeTimeProvider, ServiceConfig,
    TextReceiptParser, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    loan_approval_rs::telemetry::init(&LoggingConfig::default())?;

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap(),
    ));

    let config = ServiceConfig::default();
    let owner = config.admin.clone();
    let outbox = Arc::new(Outbox::new());
    let service = LoanService::in_memory(config, outbox.clone(), Arc::new(TextReceiptParser::new()))?;

    service.admin().add_approver(&owner, "2002".into())?;
    service.admin().add_recipient(&owner, "3003".into())?;

    // month 1: approved
    let bounds = service.bounds(None)?;
    println!("month {} accepts {} .. {}", bounds.month, bounds.minimum, bounds.maximum);

    let ticket = service.request_payment(owner.clone(), None, Money::from_major(140_000), &time)?;
    let resolution = service.decide("2002".into(), ticket.payment_id, Decision::Approve, &time)?;
    println!(
        "approved month {}: balance after {:?}",
        resolution.payment.month, resolution.balance_after
    );

    // month 2: rejected, then deciding again fails
    let ticket = service.request_payment(owner.clone(), None, Money::from_major(50_000), &time)?;
    service.decide("2002".into(), ticket.payment_id, Decision::Reject, &time)?;
    if let Err(err) = service.decide("2002".into(), ticket.payment_id, Decision::Approve, &time) {
        println!("second decision refused: {}", err);
    }

    for (recipient, notice) in outbox.take() {
        println!("-> {}: {:?}", recipient, notice);
    }
    for event in service.take_events() {
        println!("event: {:?}", event);
    }

    println!("{}", service.summary()?.to_json_pretty()?);
    service.shutdown();

    Ok(())
}
