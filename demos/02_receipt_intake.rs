/// receipt intake - turn recognised receipt text into a pending payment
use std::sync::Arc;

use loan_approval_rs::{
    LedgerError, LoanService, Outbox, SafeTimeProvider, ServiceConfig, TextReceiptParser,
    TimeSource,
};

const RECEIPT: &str = "\
Перевод по СБП
08.02.2024 09:15
Статус: успешно
Сумма 131978,88 ₽
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);

    let config = ServiceConfig::default();
    let owner = config.admin.clone();
    let service = LoanService::in_memory(
        config,
        Arc::new(Outbox::new()),
        Arc::new(TextReceiptParser::new()),
    )?;

    let receipt = service.submit_receipt(owner.clone(), RECEIPT.as_bytes(), None, &time)?;
    println!(
        "receipt dated {:?}: {} for month {} (payment {})",
        receipt.candidate.receipt.date,
        receipt.candidate.amount,
        receipt.candidate.month,
        receipt.ticket.payment_id
    );

    match service.submit_receipt(owner, b"blurry photo", None, &time) {
        Err(LedgerError::NoAmountDetected) => println!("no amount on the second receipt"),
        other => println!("unexpected: {:?}", other.map(|r| r.ticket.payment_id)),
    }

    service.shutdown();
    Ok(())
}
