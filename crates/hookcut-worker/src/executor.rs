//! Workflow executor.
//!
//! [`WorkflowEngine`] decides what happens to one delivery: lease, run,
//! retry or give up. [`WorkflowExecutor`] feeds it from the Redis stream.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use hookcut_queue::{ConcurrencyLimiter, Delivery, EventEnvelope, RedisEventBus};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::scheduler;
use crate::workflow::{self, WorkflowContext, WorkflowOutcome};

/// What became of one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum RunDisposition {
    Completed(WorkflowOutcome),
    /// The concurrency key was held by another run; re-delivered later.
    Deferred,
    /// Failed with a retryable error; the next attempt is scheduled.
    Retrying { attempt: u32, delay: Duration },
    /// Failed for good. The failure path has run.
    Failed { error: String },
}

impl RunDisposition {
    fn label(&self) -> &'static str {
        match self {
            RunDisposition::Completed(_) => "completed",
            RunDisposition::Deferred => "deferred",
            RunDisposition::Retrying { .. } => "retrying",
            RunDisposition::Failed { .. } => "failed",
        }
    }
}

/// Runs workflows under the per-key lease and the retry policy.
pub struct WorkflowEngine {
    ctx: Arc<WorkflowContext>,
    limiter: Arc<dyn ConcurrencyLimiter>,
}

impl WorkflowEngine {
    pub fn new(ctx: Arc<WorkflowContext>, limiter: Arc<dyn ConcurrencyLimiter>) -> Self {
        Self { ctx, limiter }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.ctx
    }

    pub async fn handle(&self, envelope: &EventEnvelope) -> RunDisposition {
        let logger = RunLogger::new(envelope);
        let span = logger.create_span();
        let disposition = self.handle_logged(envelope, &logger).instrument(span).await;
        metrics::record_run(logger.workflow(), disposition.label());
        disposition
    }

    async fn handle_logged(&self, envelope: &EventEnvelope, logger: &RunLogger) -> RunDisposition {
        logger.log_start(envelope.event.project_id().as_str());

        let lease = envelope.event.concurrency_key();
        if let Some(key) = &lease {
            match self
                .limiter
                .try_acquire(key, &envelope.run_id, self.ctx.config.lease_ttl)
                .await
            {
                Ok(true) => {}
                Ok(false) => return self.defer(envelope, logger).await,
                Err(e) => return self.after_error(envelope, logger, e.into()).await,
            }
        }

        let result = workflow::run(&self.ctx, envelope).await;

        if let Some(key) = &lease {
            if let Err(e) = self.limiter.release(key, &envelope.run_id).await {
                logger.log_warning(&format!("Failed to release lease {}: {}", key, e));
            }
        }

        match result {
            Ok(outcome) => {
                logger.log_completion(&format!("{:?}", outcome));
                RunDisposition::Completed(outcome)
            }
            Err(e) => self.after_error(envelope, logger, e).await,
        }
    }

    async fn defer(&self, envelope: &EventEnvelope, logger: &RunLogger) -> RunDisposition {
        metrics::record_lease_contention(logger.workflow());
        let delay = self.ctx.config.contention_delay;
        match self.ctx.events.schedule(envelope.redelivery(), delay).await {
            Ok(()) => {
                logger.log_progress(&format!(
                    "Another run holds the concurrency key, retrying in {:?}",
                    delay
                ));
                RunDisposition::Deferred
            }
            Err(e) => self.after_error(envelope, logger, e.into()).await,
        }
    }

    async fn after_error(
        &self,
        envelope: &EventEnvelope,
        logger: &RunLogger,
        error: WorkerError,
    ) -> RunDisposition {
        let next = envelope.attempt + 1;
        if error.is_retryable() && next <= self.ctx.config.max_step_retries {
            let delay = self.ctx.config.retry_delay(next);
            match self.ctx.events.schedule(envelope.next_attempt(), delay).await {
                Ok(()) => {
                    metrics::record_retry(logger.workflow());
                    logger.log_warning(&format!(
                        "{} (retry {}/{} in {:?})",
                        error, next, self.ctx.config.max_step_retries, delay
                    ));
                    return RunDisposition::Retrying {
                        attempt: next,
                        delay,
                    };
                }
                Err(e) => logger.log_error(&format!("Failed to schedule retry: {}", e)),
            }
        }

        logger.log_error(&format!("Giving up: {}", error));
        if let Err(e) = workflow::on_exhausted(&self.ctx, &envelope.event, &error).await {
            logger.log_error(&format!("Failure path failed: {}", e));
        }
        RunDisposition::Failed {
            error: error.to_string(),
        }
    }
}

/// Consumes the Redis event stream.
pub struct WorkflowExecutor {
    config: WorkerConfig,
    bus: Arc<RedisEventBus>,
    engine: Arc<WorkflowEngine>,
    run_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl WorkflowExecutor {
    pub fn new(config: WorkerConfig, bus: Arc<RedisEventBus>, engine: WorkflowEngine) -> Self {
        let run_semaphore = Arc::new(Semaphore::new(config.max_concurrent_runs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            bus,
            engine: Arc::new(engine),
            run_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting workflow executor '{}' with {} max concurrent runs",
            self.consumer_name, self.config.max_concurrent_runs
        );

        self.bus.init().await?;

        let scheduler_task = tokio::spawn(scheduler::run(
            Arc::clone(&self.bus),
            self.config.scheduler_poll_interval,
            self.shutdown.subscribe(),
        ));
        let claim_task = tokio::spawn(Self::claim_loop(
            Arc::clone(&self.bus),
            Arc::clone(&self.engine),
            Arc::clone(&self.run_semaphore),
            self.consumer_name.clone(),
            self.config.claim_interval,
            self.shutdown.subscribe(),
        ));

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume() => {
                    if let Err(e) = result {
                        error!("Error consuming events: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();
        if let Err(e) = scheduler_task.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }

        info!("Waiting for in-flight runs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_runs())
            .await
            .is_err()
        {
            warn!("In-flight runs still active after {:?}", self.config.shutdown_timeout);
        }

        info!("Workflow executor stopped");
        Ok(())
    }

    async fn consume(&self) -> WorkerResult<()> {
        let available = self.run_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let deliveries = self
            .bus
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;
        if deliveries.is_empty() {
            return Ok(());
        }
        debug!("Consumed {} events", deliveries.len());

        for delivery in deliveries {
            let permit = Arc::clone(&self.run_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::config_error("run semaphore closed"))?;
            let bus = Arc::clone(&self.bus);
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                let _permit = permit;
                Self::execute(bus, engine, delivery).await;
            });
        }
        Ok(())
    }

    async fn claim_loop(
        bus: Arc<RedisEventBus>,
        engine: Arc<WorkflowEngine>,
        semaphore: Arc<Semaphore>,
        consumer_name: String,
        every: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let deliveries = match bus.claim_pending(&consumer_name, 5).await {
                        Ok(deliveries) => deliveries,
                        Err(e) => {
                            warn!("Failed to claim pending events: {}", e);
                            continue;
                        }
                    };
                    if !deliveries.is_empty() {
                        info!("Claimed {} pending events", deliveries.len());
                    }
                    for delivery in deliveries {
                        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                            return;
                        };
                        let bus = Arc::clone(&bus);
                        let engine = Arc::clone(&engine);
                        tokio::spawn(async move {
                            let _permit = permit;
                            Self::execute(bus, engine, delivery).await;
                        });
                    }
                }
            }
        }
    }

    /// Run one delivery and settle it on the stream. A failed run is parked
    /// on the dead-letter stream; everything else is acked, since retries
    /// and deferrals travel as new delayed envelopes.
    async fn execute(bus: Arc<RedisEventBus>, engine: Arc<WorkflowEngine>, delivery: Delivery) {
        let disposition = engine.handle(&delivery.envelope).await;
        let settled = match &disposition {
            RunDisposition::Failed { error } => bus.dead_letter(&delivery, error).await,
            _ => bus.ack(&delivery.message_id).await,
        };
        if let Err(e) = settled {
            error!(
                run_id = %delivery.envelope.run_id,
                "Failed to settle delivery {}: {}", delivery.message_id, e
            );
        }
    }

    async fn wait_for_runs(&self) {
        while self.run_semaphore.available_permits() < self.config.max_concurrent_runs {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
