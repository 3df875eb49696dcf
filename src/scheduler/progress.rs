use tokio::sync::mpsc;

use crate::error::{ConfigError, JobError, SourceError};
use crate::models::{JobEvent, ProgressEvent, Stage};
use crate::scheduler::cancel::CancelToken;

/// Destination for the events of one job.
///
/// The scheduler uses the bounded `mpsc` sender; tests collect into a `Vec`.
pub trait EventSink: Send {
    fn emit(&mut self, event: JobEvent);
}

impl EventSink for Vec<JobEvent> {
    fn emit(&mut self, event: JobEvent) {
        self.push(event);
    }
}

impl EventSink for mpsc::Sender<JobEvent> {
    fn emit(&mut self, event: JobEvent) {
        // Must be called off the async runtime (the worker runs in `spawn_blocking`).
        // A closed channel means the controller dropped its handle; nobody is listening.
        if self.blocking_send(event).is_err() {
            tracing::debug!("Event receiver dropped; discarding event");
        }
    }
}

/// Cancellation was observed at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Why a pipeline stopped before producing its final candidate list.
#[derive(Debug)]
pub enum Halt {
    /// Cancelled; carries what had been produced so far
    Cancelled(Vec<String>),
    Failed(JobError),
}

/// Cancelled before any candidate was produced.
impl From<Interrupted> for Halt {
    fn from(_: Interrupted) -> Self {
        Halt::Cancelled(Vec::new())
    }
}

impl From<JobError> for Halt {
    fn from(err: JobError) -> Self {
        Halt::Failed(err)
    }
}

impl From<SourceError> for Halt {
    fn from(err: SourceError) -> Self {
        Halt::Failed(err.into())
    }
}

impl From<ConfigError> for Halt {
    fn from(err: ConfigError) -> Self {
        Halt::Failed(err.into())
    }
}

/// Upper bound on units of work between two cancellation polls, whatever the
/// reporting interval.
pub const CANCEL_POLL_INTERVAL: u64 = 64;

/// Progress counter and cancellation checkpoints for one running job.
///
/// `advance` counts a unit of work (a base candidate or an input entry) and emits a
/// [`ProgressEvent`] every `interval` units. `tick` only counts inner-loop work such as
/// leet variants. Both poll for cancellation at least every [`CANCEL_POLL_INTERVAL`]
/// units. Every stage boundary emits an event and polls.
pub struct ProgressTracker<'a> {
    sink: &'a mut dyn EventSink,
    token: &'a CancelToken,
    interval: u64,
    poll_every: u64,
    stage: Stage,
    processed: u64,
    total: u64,
    ticks: u64,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a mut dyn EventSink, token: &'a CancelToken, interval: u64) -> Self {
        let interval = interval.max(1);
        Self {
            sink,
            token,
            interval,
            poll_every: interval.min(CANCEL_POLL_INTERVAL),
            stage: Stage::Validating,
            processed: 0,
            total: 0,
            ticks: 0,
        }
    }

    /// Move to `stage`, report it and check for cancellation.
    pub fn enter(&mut self, stage: Stage) -> Result<(), Interrupted> {
        tracing::debug!("Entering stage {}", stage);
        self.stage = stage;
        self.report();
        self.checkpoint()
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    pub fn advance(&mut self) -> Result<(), Interrupted> {
        self.processed += 1;
        if self.processed % self.interval == 0 {
            self.report();
        }
        if self.processed % self.poll_every == 0 {
            self.checkpoint()?;
        }
        Ok(())
    }

    pub fn tick(&mut self) -> Result<(), Interrupted> {
        self.ticks += 1;
        if self.ticks % self.poll_every == 0 {
            self.checkpoint()?;
        }
        Ok(())
    }

    pub fn checkpoint(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    fn report(&mut self) {
        self.sink.emit(JobEvent::Progress(ProgressEvent {
            processed: self.processed,
            total: self.total,
            stage: self.stage,
        }));
    }
}
