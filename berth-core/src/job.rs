//! Job base
//!
//! A job is a single unit of asynchronous work with an identity, progress
//! tracking and exactly one terminal outcome. [`JobBase`] holds the state
//! shared by all jobs; the [`Job`] trait supplies the lifecycle around a
//! job specific `run()`.
//!
//! Observers receive every state change as a [`Notification`] on an
//! unbounded channel. A job emits `Finished` exactly once, even when it is
//! dropped before completing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::error::{ErrorKind, JobError};
use crate::request::Description;

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobState {
    NotStarted,
    Running,
    Suspended,
    Finished,
}

/// What a job supports besides running to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    pub killable: bool,
    pub suspendable: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        killable: false,
        suspendable: false,
    };

    pub const KILLABLE: Capabilities = Capabilities {
        killable: true,
        suspendable: false,
    };
}

/// Unit of a progress amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    Bytes,
    Files,
    Directories,
    Items,
}

impl Unit {
    fn index(self) -> usize {
        match self {
            Unit::Bytes => 0,
            Unit::Files => 1,
            Unit::Directories => 2,
            Unit::Items => 3,
        }
    }
}

/// Whether killing a job still emits its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillVerbosity {
    Quietly,
    EmitResult,
}

#[derive(Debug, Clone, Copy, Default)]
struct Amount {
    processed: u64,
    total: u64,
}

/// Event emitted by a job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JobEvent {
    /// What the job is about to do
    Description(Description),
    /// Informational progress message
    Info(String),
    /// The configuration used by the job was replaced
    ConfigurationChanged,
    ProcessedAmount { unit: Unit, amount: u64 },
    TotalAmount { unit: Unit, amount: u64 },
    Percent(u64),
    Suspended,
    Resumed,
    /// The job completed, carrying the reply document if any
    Succeeded(Option<Value>),
    /// The job failed
    Failed { code: i32, message: String },
    /// Terminal event, emitted exactly once per job
    Finished,
    /// The outcome can be read from the job
    Result,
}

/// An event stamped with the job it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: JobEvent,
}

/// State shared by every job
#[derive(Debug)]
pub struct JobBase {
    id: Uuid,
    state: JobState,
    error: Option<JobError>,
    capabilities: Capabilities,
    auto_dispose: bool,
    amounts: [Amount; 4],
    progress_unit: Unit,
    percent: u64,
    observers: Vec<mpsc::UnboundedSender<Notification>>,
}

impl JobBase {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: JobState::NotStarted,
            error: None,
            capabilities,
            auto_dispose: true,
            amounts: [Amount::default(); 4],
            progress_unit: Unit::Bytes,
            percent: 0,
            observers: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == JobState::Finished
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    /// Whether a started job is dropped by its task once finished
    pub fn is_auto_dispose(&self) -> bool {
        self.auto_dispose
    }

    pub fn set_auto_dispose(&mut self, auto_dispose: bool) {
        self.auto_dispose = auto_dispose;
    }

    /// Error kind, `NoError` unless the job failed
    pub fn error(&self) -> ErrorKind {
        self.error
            .as_ref()
            .map(JobError::kind)
            .unwrap_or(ErrorKind::NoError)
    }

    /// Raw detail text of the error
    pub fn error_text(&self) -> &str {
        self.error.as_ref().map(JobError::text).unwrap_or_default()
    }

    pub fn job_error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// Records the outcome of a failed job
    ///
    /// Ignored once the job is finished.
    pub fn set_error(&mut self, error: JobError) {
        if self.is_finished() {
            warn!("Job {} already finished, ignoring error {}", self.id, error.kind());
            return;
        }
        self.error = Some(error);
    }

    pub fn progress_unit(&self) -> Unit {
        self.progress_unit
    }

    /// Selects the unit percent is computed from
    pub fn set_progress_unit(&mut self, unit: Unit) {
        self.progress_unit = unit;
        self.update_percent();
    }

    pub fn processed_amount(&self, unit: Unit) -> u64 {
        self.amounts[unit.index()].processed
    }

    pub fn total_amount(&self, unit: Unit) -> u64 {
        self.amounts[unit.index()].total
    }

    pub fn percent(&self) -> u64 {
        self.percent
    }

    pub fn set_processed_amount(&mut self, unit: Unit, amount: u64) {
        let slot = &mut self.amounts[unit.index()];
        if slot.processed != amount {
            slot.processed = amount;
            self.emit(JobEvent::ProcessedAmount { unit, amount });
        }
        if unit == self.progress_unit {
            self.update_percent();
        }
    }

    pub fn set_total_amount(&mut self, unit: Unit, amount: u64) {
        let slot = &mut self.amounts[unit.index()];
        if slot.total != amount {
            slot.total = amount;
            self.emit(JobEvent::TotalAmount { unit, amount });
        }
        if unit == self.progress_unit {
            self.update_percent();
        }
    }

    pub fn set_percent(&mut self, percent: u64) {
        if self.percent != percent {
            self.percent = percent;
            self.emit(JobEvent::Percent(percent));
        }
    }

    fn update_percent(&mut self) {
        let amount = self.amounts[self.progress_unit.index()];
        if amount.total != 0 {
            let percent = u128::from(amount.processed) * 100 / u128::from(amount.total);
            self.set_percent(u64::try_from(percent).unwrap_or(u64::MAX));
        }
    }

    /// Creates a new observer channel
    ///
    /// Subscribe before starting the job to see every event.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Registers an existing sender, e.g. one shared by several jobs
    pub fn add_observer(&mut self, observer: mpsc::UnboundedSender<Notification>) {
        self.observers.push(observer);
    }

    /// Sends `event` to all observers, dropping the ones that went away
    pub fn emit(&mut self, event: JobEvent) {
        trace!("Job {} emits {:?}", self.id, event);
        let notification = Notification {
            job_id: self.id,
            timestamp: Utc::now(),
            event,
        };
        self.observers
            .retain(|observer| observer.send(notification.clone()).is_ok());
    }

    /// Terminal transition
    ///
    /// Emits `Finished` and, when `emit_result` is set, `Result`. Calling it
    /// on a finished job is a bug.
    pub fn finish(&mut self, emit_result: bool) {
        if self.is_finished() {
            error!("Job {} finished twice", self.id);
            debug_assert!(false, "job finished twice");
            return;
        }

        self.state = JobState::Finished;
        debug!("Job {} finished with {}", self.id, self.error());
        self.emit(JobEvent::Finished);
        if emit_result {
            self.emit(JobEvent::Result);
        }
    }

    /// Finishes the job with a result unless it is already finished
    pub fn emit_result(&mut self) {
        if !self.is_finished() {
            self.finish(true);
        }
    }

    pub(crate) fn set_state(&mut self, state: JobState) {
        if self.is_finished() {
            return;
        }
        self.state = state;
    }
}

impl Default for JobBase {
    fn default() -> Self {
        Self::new(Capabilities::NONE)
    }
}

impl Drop for JobBase {
    fn drop(&mut self) {
        if !self.is_finished() {
            debug!("Job {} dropped before finishing", self.id);
            self.state = JobState::Finished;
            self.emit(JobEvent::Finished);
        }
    }
}

/// Lifecycle of an asynchronous job
///
/// Implementors provide `run()` and access to their [`JobBase`]; everything
/// else is provided. `run()` should finish the base, if it does not the job
/// is finished with a result once `run()` returns.
#[async_trait]
pub trait Job: Send + Sized + 'static {
    fn base(&self) -> &JobBase;

    fn base_mut(&mut self) -> &mut JobBase;

    /// Does the actual work
    async fn run(&mut self);

    /// Aborts the work, returns whether that succeeded
    fn do_kill(&mut self) -> bool {
        false
    }

    fn do_suspend(&mut self) -> bool {
        false
    }

    fn do_resume(&mut self) -> bool {
        false
    }

    /// Aborts the job
    ///
    /// Returns true if the job is finished afterwards.
    fn kill(&mut self, verbosity: KillVerbosity) -> bool {
        if self.base().is_finished() {
            return true;
        }
        if !self.base().capabilities().killable || !self.do_kill() {
            return false;
        }

        debug!("Killing job {}", self.base().id());
        let base = self.base_mut();
        base.set_error(JobError::bare(ErrorKind::Killed));
        base.finish(verbosity == KillVerbosity::EmitResult);
        true
    }

    fn suspend(&mut self) -> bool {
        if self.base().state() != JobState::Running || !self.base().capabilities().suspendable {
            return false;
        }
        if !self.do_suspend() {
            return false;
        }
        let base = self.base_mut();
        base.set_state(JobState::Suspended);
        base.emit(JobEvent::Suspended);
        true
    }

    fn resume(&mut self) -> bool {
        if self.base().state() != JobState::Suspended {
            return false;
        }
        if !self.do_resume() {
            return false;
        }
        let base = self.base_mut();
        base.set_state(JobState::Running);
        base.emit(JobEvent::Resumed);
        true
    }

    /// Runs the job and returns whether it succeeded
    async fn run_until_finished(&mut self) -> bool {
        if self.base().is_finished() {
            warn!("Job {} is already finished", self.base().id());
            return false;
        }

        self.base_mut().set_state(JobState::Running);
        self.run().await;
        self.base_mut().emit_result();
        self.base().error() == ErrorKind::NoError
    }

    /// Runs the job to completion, blocking the calling thread
    ///
    /// The job is driven on its own current-thread runtime, so nothing but
    /// this job makes progress while waiting. Inside a runtime the job runs
    /// on a scoped helper thread.
    fn exec(&mut self) -> bool {
        if self.base().is_finished() {
            error!("exec() called on finished job {}", self.base().id());
            debug_assert!(false, "exec() called on a finished job");
            return false;
        }

        if tokio::runtime::Handle::try_current().is_err() {
            return block_on_job(self);
        }

        std::thread::scope(|scope| {
            let worker = scope.spawn(|| block_on_job(self));
            match worker.join() {
                Ok(succeeded) => succeeded,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    }

    /// Spawns the job on the current tokio runtime
    ///
    /// Must be called from within a runtime. The job is handed back through
    /// [`JobHandle::join`] unless auto-disposal is enabled.
    fn start(mut self) -> JobHandle<Self> {
        let id = self.base().id();
        let killable = self.base().capabilities().killable;
        let (kill_tx, mut kill_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let killed = {
                let mut run = self.run_until_finished();
                tokio::select! {
                    _ = &mut run => None,
                    Ok(verbosity) = &mut kill_rx => Some(verbosity),
                }
            };

            if let Some(verbosity) = killed {
                self.kill(verbosity);
            }

            if self.base().is_auto_dispose() {
                None
            } else {
                Some(self)
            }
        });

        JobHandle {
            id,
            killable,
            kill_tx: Some(kill_tx),
            task,
        }
    }
}

fn block_on_job<J: Job>(job: &mut J) -> bool {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(job.run_until_finished()),
        Err(e) => {
            error!("Failed to create runtime for job {}: {}", job.base().id(), e);
            let base = job.base_mut();
            base.set_error(JobError::new(ErrorKind::UnknownError, e.to_string()));
            base.finish(true);
            false
        }
    }
}

/// Handle to a started job
#[derive(Debug)]
pub struct JobHandle<J> {
    id: Uuid,
    killable: bool,
    kill_tx: Option<oneshot::Sender<KillVerbosity>>,
    task: JoinHandle<Option<J>>,
}

impl<J> JobHandle<J> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Requests the job to be killed
    ///
    /// Returns false if the job can not be killed.
    pub fn kill(&mut self, verbosity: KillVerbosity) -> bool {
        if self.task.is_finished() {
            return true;
        }
        if !self.killable {
            return false;
        }
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(verbosity);
        }
        true
    }

    /// Waits for the job task, yielding the job if it was not auto-disposed
    pub async fn join(self) -> Result<Option<J>, JoinError> {
        self.task.await
    }
}
