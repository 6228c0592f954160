/// single-consumer job queue in front of the approval workflow
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, warn};

use crate::approval::workflow::{ApprovalWorkflow, PendingTicket, Resolution};
use crate::config::QueueConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::store::LoanStore;
use crate::types::{Decision, Identity, OverflowPolicy, PaymentId};

enum Job {
    Create {
        requester: Identity,
        month: u32,
        amount: Money,
        at: DateTime<Utc>,
        reply: Sender<Result<PendingTicket>>,
    },
    Resolve {
        decider: Identity,
        payment_id: PaymentId,
        decision: Decision,
        at: DateTime<Utc>,
        reply: Sender<Result<Resolution>>,
    },
}

/// handle to the outcome of a queued job
#[derive(Debug)]
pub struct Reply<T> {
    receiver: Receiver<Result<T>>,
}

impl<T> Reply<T> {
    /// block until the worker has processed the job
    pub fn wait(self) -> Result<T> {
        self.receiver
            .recv()
            .unwrap_or(Err(LedgerError::WorkerStopped))
    }
}

pub struct WorkQueue {
    sender: Option<SyncSender<Job>>,
    worker: Option<JoinHandle<()>>,
    config: QueueConfig,
}

impl WorkQueue {
    /// spawn the worker thread
    pub fn start<S>(workflow: Arc<ApprovalWorkflow<S>>, config: QueueConfig) -> Result<Self>
    where
        S: LoanStore + 'static,
    {
        if config.capacity == 0 {
            return Err(LedgerError::invalid_parameter(
                "queue_capacity",
                "must be at least 1",
            ));
        }

        let (sender, receiver) = mpsc::sync_channel(config.capacity);
        let worker = thread::Builder::new()
            .name("approval-worker".to_string())
            .spawn(move || run_worker(workflow, receiver))?;

        info!(
            "approval queue started (capacity {}, overflow {:?})",
            config.capacity, config.overflow
        );

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            config,
        })
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn create_request(
        &self,
        requester: Identity,
        month: u32,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<Reply<PendingTicket>> {
        let (reply, receiver) = mpsc::channel();
        self.submit(Job::Create {
            requester,
            month,
            amount,
            at: time_provider.now(),
            reply,
        })?;
        Ok(Reply { receiver })
    }

    pub fn resolve(
        &self,
        decider: Identity,
        payment_id: PaymentId,
        decision: Decision,
        time_provider: &SafeTimeProvider,
    ) -> Result<Reply<Resolution>> {
        let (reply, receiver) = mpsc::channel();
        self.submit(Job::Resolve {
            decider,
            payment_id,
            decision,
            at: time_provider.now(),
            reply,
        })?;
        Ok(Reply { receiver })
    }

    /// stop accepting jobs, drain what is queued, join the worker
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("approval worker panicked");
            }
            info!("approval queue stopped");
        }
    }

    fn submit(&self, job: Job) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(LedgerError::WorkerStopped)?;
        match self.config.overflow {
            OverflowPolicy::Reject => sender.try_send(job).map_err(|err| match err {
                TrySendError::Full(_) => {
                    warn!("approval queue full ({} jobs)", self.config.capacity);
                    LedgerError::QueueFull {
                        capacity: self.config.capacity,
                    }
                }
                TrySendError::Disconnected(_) => LedgerError::WorkerStopped,
            }),
            OverflowPolicy::Block => sender.send(job).map_err(|_| LedgerError::WorkerStopped),
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<S: LoanStore>(workflow: Arc<ApprovalWorkflow<S>>, receiver: Receiver<Job>) {
    for job in receiver {
        match job {
            Job::Create {
                requester,
                month,
                amount,
                at,
                reply,
            } => {
                let result = workflow.create_request_at(requester, month, amount, at);
                if reply.send(result).is_err() {
                    debug!("create reply dropped by caller");
                }
            }
            Job::Resolve {
                decider,
                payment_id,
                decision,
                at,
                reply,
            } => {
                let result = workflow.resolve_at(&decider, payment_id, decision, at);
                if reply.send(result).is_err() {
                    debug!("resolve reply dropped by caller");
                }
            }
        }
    }
}
