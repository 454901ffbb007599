//! Background scheduler implementation

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use futures::FutureExt;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SchedulerConfig;
use super::queue::{Operation, OperationPriority, OperationQueue, OperationReport, OperationResult};
use crate::domain::{DailyPlan, Issue};
use crate::events::{Event, EventBus};
use crate::planner::PlanGenerator;
use crate::source::IssueSource;

/// Source name attached to events published by the scheduler
pub const EVENT_SOURCE: &str = "scheduler";

/// Operation type of blocking-task handling
pub const BLOCKING_TASK_OPERATION: &str = "blocking_task";

/// Operation type of the scheduled daily plan
pub const DAILY_PLAN_OPERATION: &str = "daily_plan";

/// Callback receiving a report after every executed operation
pub type Notifier = Arc<dyn Fn(OperationReport) + Send + Sync>;

/// Application hook run for every detected blocker
#[async_trait]
pub trait BlockingTaskHandler: Send + Sync {
    /// `replan` is the plan rebuilt around the blocker, when one existed
    async fn handle_blocking(&self, issue: &Issue, replan: Option<&DailyPlan>) -> eyre::Result<()>;
}

/// State shared by the scheduler handle and its two loops
struct Shared {
    config: SchedulerConfig,
    source: Arc<dyn IssueSource>,
    planner: Arc<PlanGenerator>,
    event_bus: Option<Arc<EventBus>>,
    blocking_handler: Option<Arc<dyn BlockingTaskHandler>>,
    notifier: Option<Notifier>,
    queue: OperationQueue,
    current_plan: Mutex<Option<DailyPlan>>,
    last_trigger_date: Mutex<Option<NaiveDate>>,
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    poller: JoinHandle<()>,
    worker: JoinHandle<()>,
}

/// Builder for [`BackgroundScheduler`]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    planner: Arc<PlanGenerator>,
    event_bus: Option<Arc<EventBus>>,
    blocking_handler: Option<Arc<dyn BlockingTaskHandler>>,
    notifier: Option<Notifier>,
}

impl SchedulerBuilder {
    /// Bus for `task_blocked` events; defaults to the planner's bus
    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn blocking_handler(mut self, handler: Arc<dyn BlockingTaskHandler>) -> Self {
        self.blocking_handler = Some(handler);
        self
    }

    pub fn notifier<F>(mut self, notifier: F) -> Self
    where
        F: Fn(OperationReport) + Send + Sync + 'static,
    {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn build(self) -> BackgroundScheduler {
        let event_bus = self.event_bus.or_else(|| self.planner.event_bus().cloned());
        BackgroundScheduler {
            shared: Arc::new(Shared {
                source: self.planner.source(),
                config: self.config,
                planner: self.planner,
                event_bus,
                blocking_handler: self.blocking_handler,
                notifier: self.notifier,
                queue: OperationQueue::new(),
                current_plan: Mutex::new(None),
                last_trigger_date: Mutex::new(None),
            }),
            running: Mutex::new(None),
        }
    }
}

/// Polls for blockers and runs queued operations in the background
///
/// Two tokio tasks: a poller that enqueues work and a worker that executes
/// it, Blocking before Normal. Both stop promptly on [`stop`](Self::stop).
pub struct BackgroundScheduler {
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl BackgroundScheduler {
    pub fn new(config: SchedulerConfig, planner: Arc<PlanGenerator>) -> Self {
        Self::builder(config, planner).build()
    }

    pub fn builder(config: SchedulerConfig, planner: Arc<PlanGenerator>) -> SchedulerBuilder {
        debug!(?config, "BackgroundScheduler::builder: called");
        SchedulerBuilder {
            config,
            planner,
            event_bus: None,
            blocking_handler: None,
            notifier: None,
        }
    }

    /// Spawn the poll and worker loops; no-op when already running
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            info!("Scheduler already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = tokio::spawn(poll_loop(Arc::clone(&self.shared), shutdown_rx.clone()));
        let worker = tokio::spawn(worker_loop(Arc::clone(&self.shared), shutdown_rx));
        *running = Some(Running {
            shutdown_tx,
            poller,
            worker,
        });
        info!(
            poll_interval_secs = self.shared.config.poll_interval_secs,
            daily_plan_time = ?self.shared.config.daily_plan_time,
            "Background scheduler started"
        );
    }

    /// Signal both loops and wait for them, aborting any that overrun
    ///
    /// Operations still queued are left in the queue.
    pub async fn stop(&self) {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(running) = running else {
            info!("Scheduler not running");
            return;
        };

        let _ = running.shutdown_tx.send(true);
        let timeout = self.shared.config.join_timeout();
        join_bounded("poller", running.poller, timeout).await;
        join_bounded("worker", running.worker, timeout).await;
        info!(queued = self.shared.queue.len(), "Background scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Enqueue arbitrary work; never blocks
    pub fn queue_operation<F, Fut>(&self, operation_type: impl Into<String>, priority: OperationPriority, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = OperationResult> + Send + 'static,
    {
        let operation = Operation::new(operation_type, priority, callback);
        debug!(operation_type = %operation.operation_type, ?priority, "BackgroundScheduler::queue_operation: called");
        self.shared.queue.push(operation);
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    /// Run one poll cycle against the local clock; returns operations queued
    pub async fn poll_once(&self) -> eyre::Result<usize> {
        self.shared.poll_at(Local::now().naive_local()).await
    }

    /// Run one poll cycle as if the local time were `now`
    pub async fn poll_at(&self, now: NaiveDateTime) -> eyre::Result<usize> {
        self.shared.poll_at(now).await
    }

    /// Execute every queued operation on the calling task, in dispatch order
    ///
    /// For one-shot use without the background loops; returns how many ran.
    pub async fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Some(operation) = self.shared.queue.try_pop() {
            self.shared.execute(operation).await;
            ran += 1;
        }
        ran
    }

    /// Last plan produced or adopted by the scheduler
    pub fn current_plan(&self) -> Option<DailyPlan> {
        self.shared.current_plan.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Adopt a plan generated elsewhere so blockers re-plan against it
    pub fn set_current_plan(&self, plan: DailyPlan) {
        *self.shared.current_plan.lock().unwrap_or_else(|e| e.into_inner()) = Some(plan);
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.lock().unwrap_or_else(|e| e.into_inner()).take() {
            running.poller.abort();
            running.worker.abort();
        }
    }
}

impl Shared {
    async fn poll_at(self: &Arc<Self>, now: NaiveDateTime) -> eyre::Result<usize> {
        debug!(%now, "Scheduler::poll_at: called");
        let blocking = self.source.fetch_blocking_issues().await?;
        let mut queued = 0;

        for issue in blocking {
            info!(key = %issue.key, "Detected blocking task");
            let shared = Arc::clone(self);
            self.queue.push(Operation::new(
                BLOCKING_TASK_OPERATION,
                OperationPriority::Blocking,
                move || async move { shared.handle_blocking(issue).await },
            ));
            queued += 1;
        }

        if let Some(trigger) = self.config.daily_plan_time()
            && now.time() >= trigger
            && self.mark_triggered(now.date())
        {
            let date = now.date();
            info!(%date, "Daily plan time reached");
            let shared = Arc::clone(self);
            self.queue.push(Operation::new(
                DAILY_PLAN_OPERATION,
                OperationPriority::Normal,
                move || async move { shared.run_daily_plan(date).await },
            ));
            queued += 1;
        }

        Ok(queued)
    }

    /// Record `date` as triggered; false if it already was
    fn mark_triggered(&self, date: NaiveDate) -> bool {
        let mut last = self.last_trigger_date.lock().unwrap_or_else(|e| e.into_inner());
        if *last == Some(date) {
            return false;
        }
        *last = Some(date);
        true
    }

    async fn handle_blocking(&self, issue: Issue) -> OperationResult {
        debug!(key = %issue.key, "Scheduler::handle_blocking: called");
        if let Some(bus) = &self.event_bus {
            bus.publish(Event::task_blocked(EVENT_SOURCE, &issue)).await;
        }

        let current = self.current_plan.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let replan = match current {
            Some(plan) => {
                let replan = self.planner.generate_replan(&issue, &plan).await?;
                *self.current_plan.lock().unwrap_or_else(|e| e.into_inner()) = Some(replan.clone());
                Some(replan)
            }
            None => None,
        };

        if let Some(handler) = &self.blocking_handler {
            handler.handle_blocking(&issue, replan.as_ref()).await?;
        }

        Ok(json!({
            "task_key": issue.key,
            "replanned": replan.is_some(),
            "priorities": replan.map(|plan| plan.priority_keys()),
        }))
    }

    async fn run_daily_plan(&self, date: NaiveDate) -> OperationResult {
        debug!(%date, "Scheduler::run_daily_plan: called");
        let plan = match self.planner.generate_daily_plan_for(date, None).await {
            Ok(plan) => plan,
            Err(e) => {
                // Allow the next poll to retry today
                let mut last = self.last_trigger_date.lock().unwrap_or_else(|e| e.into_inner());
                if *last == Some(date) {
                    *last = None;
                }
                return Err(e.into());
            }
        };

        if !self.planner.has_event_bus()
            && let Some(bus) = &self.event_bus
        {
            bus.publish(Event::plan_generated(EVENT_SOURCE, &plan)).await;
        }

        let result = json!({
            "plan_date": plan.date,
            "priorities": plan.priority_keys(),
            "admin_task_count": plan.admin_block.tasks.len(),
        });
        *self.current_plan.lock().unwrap_or_else(|e| e.into_inner()) = Some(plan);
        Ok(result)
    }

    async fn execute(&self, operation: Operation) {
        let operation_type = operation.operation_type.clone();
        debug!(%operation_type, waited_ms = operation.queued_at.elapsed().as_millis() as u64, "Scheduler::execute: called");

        let report = match tokio::spawn(operation.run()).await {
            Ok(Ok(result)) => {
                debug!(%operation_type, "Operation completed");
                OperationReport::completed(operation_type, result)
            }
            Ok(Err(e)) => {
                error!(%operation_type, error = %e, "Operation failed");
                OperationReport::failed(operation_type, format!("{:#}", e))
            }
            Err(e) => {
                error!(%operation_type, error = %e, "Operation panicked");
                OperationReport::failed(operation_type, format!("operation panicked: {}", e))
            }
        };

        if let Some(notifier) = &self.notifier {
            notifier(report);
        }
    }
}

async fn poll_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    debug!("poll_loop: started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let cycle = AssertUnwindSafe(shared.poll_at(Local::now().naive_local())).catch_unwind();
        let pause = match cycle.await {
            Ok(Ok(queued)) => {
                debug!(queued, "poll_loop: cycle complete");
                shared.config.poll_interval()
            }
            Ok(Err(e)) => {
                error!(error = %e, "Poll cycle failed, backing off");
                shared.config.error_backoff()
            }
            Err(_) => {
                error!("Poll cycle panicked, backing off");
                shared.config.error_backoff()
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("poll_loop: exited");
}

async fn worker_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    debug!("worker_loop: started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let operation = tokio::select! {
            operation = shared.queue.pop_timeout(shared.config.dequeue_timeout()) => operation,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        };

        if let Some(operation) = operation {
            shared.execute(operation).await;
        }
    }
    debug!("worker_loop: exited");
}

async fn join_bounded(name: &str, mut handle: JoinHandle<()>, timeout: std::time::Duration) {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(())) => debug!(name, "Scheduler loop joined"),
        Ok(Err(e)) => warn!(name, error = %e, "Scheduler loop ended abnormally"),
        Err(_) => {
            warn!(name, ?timeout, "Scheduler loop did not stop in time, aborting");
            handle.abort();
        }
    }
}
