//! Background execution of pipeline jobs.
//!
//! [`WorkerScheduler::submit`] validates a [`JobConfig`], claims its output path, and runs
//! the pipeline on tokio's blocking pool. The caller gets a [`JobHandle`] to read events
//! from and to cancel through.
//!
//! # Channels
//!
//! - events: bounded `mpsc` (worker -> controller), periodic progress then exactly one
//!   terminal event
//! - cancellation: `watch` (controller -> worker), polled at checkpoints
//!
//! # Usage Example
//!
//! ```ignore
//! let scheduler = WorkerScheduler::new(tokio::runtime::Handle::current());
//! let mut job = scheduler.submit(&config)?;
//! while let Some(event) = job.next_event().await {
//!     if let JobEvent::Progress(p) = event {
//!         println!("{} {}/{}", p.stage, p.processed, p.total);
//!     }
//! }
//! ```

pub mod cancel;
pub mod progress;
pub mod runner;

pub use cancel::{CancelHandle, CancelToken, cancellation};
pub use progress::{EventSink, Halt, Interrupted, ProgressTracker};
pub use runner::{JobPlan, run_job};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::SchedulerError;
use crate::models::{ErrorDescriptor, JobConfig, JobEvent, JobStatus, ProgressEvent, Stage, TerminalEvent};
use crate::state::{JobId, JobRegistry};

/// Capacity of each job's event channel
const EVENT_BUFFER: usize = 100;

/// Runs jobs on tokio's blocking pool, one worker per job.
pub struct WorkerScheduler {
    runtime: Handle,
    registry: JobRegistry,
}

impl WorkerScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            registry: JobRegistry::new(),
        }
    }

    /// Registry of jobs that have not finished yet.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Validate `config` and start a job for it.
    ///
    /// Fails without starting anything when the configuration is invalid or another job
    /// is still writing to the same output path.
    pub fn submit(&self, config: &JobConfig) -> Result<JobHandle, SchedulerError> {
        let plan = JobPlan::from_config(config)?;
        let lease = self.registry.claim(config.mode_name(), &plan.output().path)?;
        let id = lease.id();

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (cancel, token) = cancellation();

        tracing::info!("Starting {} job {} -> {}", config.mode_name(), id, plan.output().path);

        let task = self.runtime.spawn_blocking(move || {
            let mut sink = RegistrySink {
                id,
                registry: lease.registry().clone(),
                tx,
            };
            let terminal = run_job(&plan, &mut sink, &token);

            let event = JobEvent::Finished(terminal);
            sink.registry.record(id, &event);
            // Free the output path before announcing the end, so a resubmission made
            // in reaction to the terminal event is accepted.
            drop(lease);
            sink.tx.emit(event);
        });

        Ok(JobHandle {
            id,
            events: rx,
            cancel,
            task: Some(task),
            status: JobStatus::Pending,
            last_progress: None,
            terminal: None,
        })
    }
}

/// Records every event in the registry, then forwards it to the controller.
struct RegistrySink {
    id: JobId,
    registry: JobRegistry,
    tx: mpsc::Sender<JobEvent>,
}

impl EventSink for RegistrySink {
    fn emit(&mut self, event: JobEvent) {
        self.registry.record(self.id, &event);
        self.tx.emit(event);
    }
}

/// Controller side of one submitted job.
///
/// Dropping the handle cancels the job.
pub struct JobHandle {
    id: JobId,
    events: mpsc::Receiver<JobEvent>,
    cancel: CancelHandle,
    task: Option<JoinHandle<()>>,
    status: JobStatus,
    last_progress: Option<ProgressEvent>,
    terminal: Option<TerminalEvent>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Status as of the last event received through this handle.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn last_progress(&self) -> Option<&ProgressEvent> {
        self.last_progress.as_ref()
    }

    pub fn terminal(&self) -> Option<&TerminalEvent> {
        self.terminal.as_ref()
    }

    /// Request cancellation. The job confirms with a `Cancelled` terminal event, or
    /// finishes normally if it was already past its last checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A cancel handle that outlives borrows of this handle (for signal handlers).
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Next event from the worker, or `None` once the terminal event has been returned
    /// or the worker is gone.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        if self.terminal.is_some() {
            return None;
        }

        let event = self.events.recv().await?;
        match &event {
            JobEvent::Progress(progress) => {
                if self.status == JobStatus::Pending {
                    self.status = JobStatus::Running;
                }
                self.last_progress = Some(progress.clone());
            }
            JobEvent::Finished(terminal) => {
                self.status = terminal.status;
                self.terminal = Some(terminal.clone());
            }
        }
        Some(event)
    }

    /// Drain events until the job ends and return its terminal event.
    pub async fn wait(mut self) -> TerminalEvent {
        while let Some(event) = self.next_event().await {
            if let JobEvent::Finished(terminal) = event {
                return terminal;
            }
        }
        if let Some(terminal) = self.terminal.take() {
            return terminal;
        }

        // The channel closed without a terminal event: the worker died
        let message = match self.task.take() {
            Some(task) => match task.await {
                Err(e) => format!("Worker terminated abnormally: {}", e),
                Ok(()) => "Worker exited without reporting a result".to_string(),
            },
            None => "Worker exited without reporting a result".to_string(),
        };
        tracing::error!("Job {}: {}", self.id, message);

        let (processed, total, stage) = self
            .last_progress
            .as_ref()
            .map(|p| (p.processed, p.total, p.stage))
            .unwrap_or((0, 0, Stage::Validating));
        self.status = JobStatus::Failed;
        TerminalEvent::failed(
            processed,
            total,
            ErrorDescriptor {
                stage,
                resource: None,
                message,
                partial_output: false,
            },
            Default::default(),
        )
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if self.terminal.is_none() {
            self.cancel.cancel();
        }
    }
}
