use std::sync::Arc;

use chrono::NaiveDate;
use hourglass_rs::{SafeTimeProvider, TimeSource};
use tracing::info;

use crate::admin::Administration;
use crate::approval::{
    ApprovalWorkflow, PendingPayment, PendingTicket, Resolution, WorkQueue, WorkflowPolicy,
};
use crate::calendar::HolidayCalendar;
use crate::config::ServiceConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::notify::Notifier;
use crate::payments::{AmortizationCalculator, PaymentBounds, Schedule, ScheduleProjector};
use crate::receipt::{ReceiptExtractor, ReceiptIntake, ReceiptTicket};
use crate::store::{JsonFileStore, LoanStore, MemoryStore};
use crate::types::{Decision, Identity, PaymentId};
use crate::views::{LoanSummary, ScheduleView};

/// entry point for a dispatcher: every user-facing operation goes through here
pub struct LoanService<S: LoanStore + 'static> {
    config: ServiceConfig,
    store: Arc<S>,
    calculator: Arc<AmortizationCalculator>,
    workflow: Arc<ApprovalWorkflow<S>>,
    queue: WorkQueue,
    intake: ReceiptIntake,
    admin: Administration<S>,
    calendar: HolidayCalendar,
}

impl<S: LoanStore + 'static> LoanService<S> {
    /// wire the components around an existing store and start the queue worker
    pub fn open(
        config: ServiceConfig,
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        extractor: Arc<dyn ReceiptExtractor>,
    ) -> Result<Self> {
        config.validate()?;

        let calculator = Arc::new(AmortizationCalculator::with_cache_size(
            config.amortization_cache_size,
        ));
        let workflow = Arc::new(ApprovalWorkflow::new(
            store.clone(),
            notifier,
            calculator.clone(),
            WorkflowPolicy::from(&config),
        ));
        let queue = WorkQueue::start(workflow.clone(), config.queue.clone())?;
        let admin = Administration::new(store.clone(), &config);

        let parameters = store.parameters()?;
        info!(
            "loan service ready: principal {}, rate {}, term {} months",
            parameters.principal, parameters.annual_rate, parameters.term_months
        );

        Ok(Self {
            config,
            store,
            calculator,
            workflow,
            queue,
            intake: ReceiptIntake::new(extractor),
            admin,
            calendar: HolidayCalendar::default(),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn admin(&self) -> &Administration<S> {
        &self.admin
    }

    pub fn workflow(&self) -> &Arc<ApprovalWorkflow<S>> {
        &self.workflow
    }

    pub fn with_calendar(mut self, calendar: HolidayCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// projected schedule from the current parameters and ledger
    pub fn schedule(&self) -> Result<Schedule> {
        let state = self.store.read()?;
        Ok(ScheduleProjector::new(&self.calculator).project(&state.parameters, &state.ledger))
    }

    /// schedule with due dates counted from `anchor`
    pub fn schedule_view(&self, anchor: NaiveDate) -> Result<ScheduleView> {
        ScheduleView::with_dates(&self.schedule()?, anchor, &self.calendar)
    }

    pub fn summary(&self) -> Result<LoanSummary> {
        let state = self.store.read()?;
        let schedule = ScheduleProjector::new(&self.calculator).project(&state.parameters, &state.ledger);
        Ok(LoanSummary::from_schedule(&schedule, state.pending_payments.len()))
    }

    /// admissible range for a month; `None` means the next unpaid month
    pub fn bounds(&self, month: Option<u32>) -> Result<PaymentBounds> {
        let month = self.resolve_month(month)?;
        self.workflow.bounds(month)
    }

    /// queue a payment request and wait for the worker to process it
    pub fn request_payment(
        &self,
        requester: Identity,
        month: Option<u32>,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PendingTicket> {
        let month = self.resolve_month(month)?;
        self.queue
            .create_request(requester, month, amount, time_provider)?
            .wait()
    }

    /// request a payment with system time
    pub fn request_payment_now(
        &self,
        requester: Identity,
        month: Option<u32>,
        amount: Money,
    ) -> Result<PendingTicket> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.request_payment(requester, month, amount, &time)
    }

    /// queue an approver decision and wait for the worker to process it
    pub fn decide(
        &self,
        decider: Identity,
        payment_id: PaymentId,
        decision: Decision,
        time_provider: &SafeTimeProvider,
    ) -> Result<Resolution> {
        self.queue
            .resolve(decider, payment_id, decision, time_provider)?
            .wait()
    }

    /// decide with system time
    pub fn decide_now(
        &self,
        decider: Identity,
        payment_id: PaymentId,
        decision: Decision,
    ) -> Result<Resolution> {
        let time = SafeTimeProvider::new(TimeSource::System);
        self.decide(decider, payment_id, decision, &time)
    }

    /// read a receipt and queue a request for its amount
    pub fn submit_receipt(
        &self,
        requester: Identity,
        image: &[u8],
        month: Option<u32>,
        time_provider: &SafeTimeProvider,
    ) -> Result<ReceiptTicket> {
        let state = self.store.read()?;
        let candidate = self.intake.prepare(&state, image, month)?;
        info!(
            "receipt from {} for month {}: {}",
            requester, candidate.month, candidate.amount
        );

        let ticket = self
            .queue
            .create_request(requester, candidate.month, candidate.amount, time_provider)?
            .wait()?;
        Ok(ReceiptTicket { candidate, ticket })
    }

    pub fn pending_payments(&self) -> Result<Vec<PendingPayment>> {
        self.workflow.pending_payments()
    }

    pub fn take_events(&self) -> Vec<Event> {
        self.workflow.take_events()
    }

    /// drain the queue and stop the worker
    pub fn shutdown(mut self) {
        self.queue.shutdown();
    }

    fn resolve_month(&self, month: Option<u32>) -> Result<u32> {
        match month {
            Some(month) => Ok(month),
            None => {
                let state = self.store.read()?;
                state
                    .ledger
                    .next_unpaid_month(state.parameters.term_months)
                    .ok_or(LedgerError::LoanFullyPaid)
            }
        }
    }
}

impl LoanService<MemoryStore> {
    /// service over a fresh in-memory store seeded with the configured defaults
    pub fn in_memory(
        config: ServiceConfig,
        notifier: Arc<dyn Notifier>,
        extractor: Arc<dyn ReceiptExtractor>,
    ) -> Result<Self> {
        let store = Arc::new(MemoryStore::new(config.default_parameters.clone()));
        Self::open(config, store, notifier, extractor)
    }
}

impl LoanService<JsonFileStore> {
    /// service over the json document at `config.store_path`
    pub fn open_file(
        config: ServiceConfig,
        notifier: Arc<dyn Notifier>,
        extractor: Arc<dyn ReceiptExtractor>,
    ) -> Result<Self> {
        let path = config
            .store_path
            .clone()
            .ok_or_else(|| LedgerError::invalid_parameter("store_path", "not configured"))?;
        let store = Arc::new(JsonFileStore::open(path, config.default_parameters.clone())?);
        Self::open(config, store, notifier, extractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Notice, Outbox};
    use crate::receipt::TextReceiptParser;
    use crate::types::PaymentStatus;
    use chrono::{TimeZone, Utc};

    const OWNER: &str = "1175871225";
    const APPROVER: &str = "555";

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap(),
        ))
    }

    fn service() -> (LoanService<MemoryStore>, Arc<Outbox>) {
        let outbox = Arc::new(Outbox::new());
        let service = LoanService::in_memory(
            ServiceConfig::default(),
            outbox.clone(),
            Arc::new(TextReceiptParser::new()),
        )
        .unwrap();
        service
            .admin()
            .add_approver(&OWNER.into(), APPROVER.into())
            .unwrap();
        service
            .admin()
            .add_recipient(&OWNER.into(), "777".into())
            .unwrap();
        (service, outbox)
    }

    #[test]
    fn test_request_and_approve_through_queue() {
        let (service, outbox) = service();
        let time = time();

        let ticket = service
            .request_payment(OWNER.into(), None, Money::from_str_exact("131978.88").unwrap(), &time)
            .unwrap();
        assert_eq!(ticket.bounds.month, 1);

        let resolution = service
            .decide(APPROVER.into(), ticket.payment_id, Decision::Approve, &time)
            .unwrap();
        assert_eq!(resolution.payment.status, PaymentStatus::Approved);
        assert_eq!(resolution.balance_after, Some(Money::from_str_exact("1380521.12").unwrap()));

        let summary = service.summary().unwrap();
        assert_eq!(summary.paid_months, 1);
        assert_eq!(summary.pending_requests, 0);
        assert_eq!(summary.next_payment.map(|next| next.month), Some(2));

        assert!(matches!(
            outbox.sent_to(&"777".into()).as_slice(),
            [Notice::PaymentRecorded { month: 1, .. }]
        ));
        assert!(service
            .take_events()
            .iter()
            .any(|event| matches!(event, Event::PaymentApproved { .. })));
    }

    #[test]
    fn test_next_month_follows_ledger() {
        let (service, _) = service();
        service
            .store()
            .update(|state| {
                state.ledger.record_payment(1, Money::from_major(131_000))?;
                state.ledger.record_payment(2, Money::from_major(131_000))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(service.bounds(None).unwrap().month, 3);
    }

    #[test]
    fn test_receipt_through_service() {
        let (service, _) = service();
        let result = service.submit_receipt(APPROVER.into(), "Итого 4 500".as_bytes(), None, &time());
        assert!(matches!(
            result,
            Err(LedgerError::InvalidAmount { amount, .. }) if amount == Money::from_major(4_500)
        ));
        assert!(service.pending_payments().unwrap().is_empty());

        let ticket = service
            .submit_receipt(APPROVER.into(), "Итого 45 000,00".as_bytes(), None, &time())
            .unwrap();
        assert_eq!(ticket.candidate.month, 1);
        assert_eq!(service.pending_payments().unwrap().len(), 1);
    }

    #[test]
    fn test_schedule_view_dates() {
        let (service, _) = service();
        let view = service
            .schedule_view(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        assert_eq!(view.lines.len(), 12);
        assert_eq!(view.lines[0].due_date, NaiveDate::from_ymd_opt(2024, 1, 8));
    }

    #[test]
    fn test_file_backed_service_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            store_path: Some(dir.path().join("loan.json")),
            ..ServiceConfig::default()
        };

        {
            let service = LoanService::open_file(
                config.clone(),
                Arc::new(Outbox::new()),
                Arc::new(TextReceiptParser::new()),
            )
            .unwrap();
            service.admin().add_approver(&OWNER.into(), APPROVER.into()).unwrap();
            let ticket = service
                .request_payment(OWNER.into(), Some(1), Money::from_major(50_000), &time())
                .unwrap();
            service
                .decide(APPROVER.into(), ticket.payment_id, Decision::Approve, &time())
                .unwrap();
            service.shutdown();
        }

        let reopened = LoanService::open_file(
            config,
            Arc::new(Outbox::new()),
            Arc::new(TextReceiptParser::new()),
        )
        .unwrap();
        assert_eq!(
            reopened.store().ledger().unwrap().get(1),
            Some(Money::from_major(50_000))
        );
    }

    #[test]
    fn test_open_file_requires_path() {
        let result = LoanService::open_file(
            ServiceConfig::default(),
            Arc::new(Outbox::new()),
            Arc::new(TextReceiptParser::new()),
        );
        assert!(matches!(result, Err(LedgerError::InvalidParameter { .. })));
    }
}
