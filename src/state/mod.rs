// Job registry
//
// Tracks every submitted job that has not finished yet, keyed by id, behind
// Arc<RwLock<T>>, and broadcasts change events. Also the authority on which output
// paths are taken: a path is leased to one job until that job's worker returns.

use crate::error::SchedulerError;
use crate::models::{JobEvent, JobStatus, Stage};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

pub type JobId = u64;

/// Change events emitted when the registry is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A job was accepted and owns its output path
    JobRegistered { id: JobId, output: Utf8PathBuf },

    /// A job moved through its lifecycle
    StatusChanged {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    /// A running job reported progress
    ProgressUpdated {
        id: JobId,
        processed: u64,
        total: u64,
        stage: Stage,
    },

    /// A job's worker returned and its output path is free again
    JobReleased { id: JobId, status: JobStatus },
}

/// What the registry knows about one job.
#[derive(Clone, Debug, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub mode: &'static str,
    pub output: Utf8PathBuf,
    pub status: JobStatus,
    pub stage: Option<Stage>,
    pub processed: u64,
    pub total: u64,
}

#[derive(Clone, Debug, Default)]
pub struct RegistryState {
    pub jobs: IndexMap<JobId, JobRecord>,
    next_id: JobId,
}

impl RegistryState {
    /// Whether a registered job writes to `output`.
    pub fn is_busy(&self, output: &Utf8Path) -> bool {
        self.jobs.values().any(|job| job.output.as_path() == output)
    }
}

/// Lifecycle transitions a job may take.
pub fn is_valid_transition(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;
    matches!(
        (from, to),
        (Pending, Running) | (Pending, Completed | Cancelled | Failed) | (Running, Completed | Cancelled | Failed)
    )
}

/// Thread-safe job registry with event emission
///
/// Shared by the scheduler (which registers jobs), the workers (which record their
/// events) and any observer that subscribes to [`StateChange`]s.
#[derive(Clone)]
pub struct JobRegistry {
    state: Arc<RwLock<RegistryState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl JobRegistry {
    /// Create an empty registry with a broadcast buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            state_tx,
        }
    }

    pub fn snapshot(&self) -> RegistryState {
        self.read(|state| state.clone())
    }

    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&RegistryState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn job(&self, id: JobId) -> Option<JobRecord> {
        self.read(|state| state.jobs.get(&id).cloned())
    }

    pub fn is_busy(&self, output: &Utf8Path) -> bool {
        self.read(|state| state.is_busy(output))
    }

    /// Subscribe to registry change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Register a job writing to `output`.
    ///
    /// The check and the insert happen under one write lock, so two submissions racing
    /// for the same path cannot both win. The returned lease frees the path on drop.
    pub fn claim(&self, mode: &'static str, output: &Utf8Path) -> Result<OutputLease, SchedulerError> {
        let id = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.is_busy(output) {
                return Err(SchedulerError::OutputBusy(output.to_path_buf()));
            }
            state.next_id += 1;
            let id = state.next_id;
            state.jobs.insert(
                id,
                JobRecord {
                    id,
                    mode,
                    output: output.to_path_buf(),
                    status: JobStatus::Pending,
                    stage: None,
                    processed: 0,
                    total: 0,
                },
            );
            id
        };

        tracing::debug!("Registered job {} writing to {}", id, output);
        self.emit(StateChange::JobRegistered {
            id,
            output: output.to_path_buf(),
        });

        Ok(OutputLease {
            id,
            registry: self.clone(),
        })
    }

    /// Apply a worker event to the job's record.
    pub fn record(&self, id: JobId, event: &JobEvent) -> Vec<StateChange> {
        let mut changes = Vec::new();
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let Some(job) = state.jobs.get_mut(&id) else {
                return changes;
            };

            let next = match event {
                JobEvent::Progress(progress) => {
                    job.processed = progress.processed;
                    job.total = progress.total;
                    job.stage = Some(progress.stage);
                    changes.push(StateChange::ProgressUpdated {
                        id,
                        processed: progress.processed,
                        total: progress.total,
                        stage: progress.stage,
                    });
                    JobStatus::Running
                }
                JobEvent::Finished(terminal) => terminal.status,
            };

            if job.status != next {
                if is_valid_transition(job.status, next) {
                    changes.insert(
                        0,
                        StateChange::StatusChanged {
                            id,
                            from: job.status,
                            to: next,
                        },
                    );
                    job.status = next;
                } else {
                    tracing::warn!("Ignoring invalid transition {} -> {} for job {}", job.status, next, id);
                }
            }
        }

        for change in &changes {
            self.emit(change.clone());
        }
        changes
    }

    fn release(&self, id: JobId) {
        let removed = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.jobs.shift_remove(&id)
        };
        if let Some(job) = removed {
            tracing::debug!("Released job {} ({}), {} is free", id, job.status, job.output);
            self.emit(StateChange::JobReleased { id, status: job.status });
        }
    }

    fn emit(&self, change: StateChange) {
        // No subscribers is fine
        let _ = self.state_tx.send(change);
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive claim on an output path, released when dropped.
pub struct OutputLease {
    id: JobId,
    registry: JobRegistry,
}

impl OutputLease {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }
}

impl Drop for OutputLease {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

impl std::fmt::Debug for OutputLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputLease").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PipelineStats;
    use crate::models::{ProgressEvent, TerminalEvent};

    fn progress(processed: u64) -> JobEvent {
        JobEvent::Progress(ProgressEvent {
            processed,
            total: 10,
            stage: Stage::Generating,
        })
    }

    #[test]
    fn test_claim_registers_pending_job() {
        let registry = JobRegistry::new();
        let lease = registry.claim("generate", Utf8Path::new("out.txt")).unwrap();

        let job = registry.job(lease.id()).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.mode, "generate");
        assert!(registry.is_busy(Utf8Path::new("out.txt")));
    }

    #[test]
    fn test_same_output_rejected_until_released() {
        let registry = JobRegistry::new();
        let lease = registry.claim("generate", Utf8Path::new("out.txt")).unwrap();

        let err = registry.claim("fix", Utf8Path::new("out.txt")).unwrap_err();
        assert!(matches!(err, SchedulerError::OutputBusy(ref p) if p.as_str() == "out.txt"));
        assert!(registry.claim("fix", Utf8Path::new("other.txt")).is_ok());

        drop(lease);
        assert!(!registry.is_busy(Utf8Path::new("out.txt")));
        assert!(registry.claim("fix", Utf8Path::new("out.txt")).is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = JobRegistry::new();
        let a = registry.claim("generate", Utf8Path::new("a.txt")).unwrap();
        let b = registry.claim("generate", Utf8Path::new("b.txt")).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_record_progress_and_terminal() {
        let registry = JobRegistry::new();
        let lease = registry.claim("generate", Utf8Path::new("out.txt")).unwrap();
        let id = lease.id();

        let changes = registry.record(id, &progress(0));
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            changes[0],
            StateChange::StatusChanged { from: JobStatus::Pending, to: JobStatus::Running, .. }
        ));
        assert!(matches!(changes[1], StateChange::ProgressUpdated { processed: 0, .. }));

        // Already running: progress only
        assert_eq!(registry.record(id, &progress(5)).len(), 1);
        assert_eq!(registry.job(id).unwrap().processed, 5);

        let finished = JobEvent::Finished(TerminalEvent::completed(10, 10, PipelineStats::default()));
        registry.record(id, &finished);
        assert_eq!(registry.job(id).unwrap().status, JobStatus::Completed);

        // Terminal states are final
        registry.record(id, &progress(6));
        let job = registry.job(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_transition_rules() {
        assert!(is_valid_transition(JobStatus::Pending, JobStatus::Running));
        assert!(is_valid_transition(JobStatus::Running, JobStatus::Cancelled));
        assert!(is_valid_transition(JobStatus::Pending, JobStatus::Failed));
        assert!(!is_valid_transition(JobStatus::Completed, JobStatus::Running));
        assert!(!is_valid_transition(JobStatus::Running, JobStatus::Pending));
    }

    #[test]
    fn test_subscribe_to_changes() {
        let registry = JobRegistry::new();
        let mut rx = registry.subscribe();

        let lease = registry.claim("fix", Utf8Path::new("fixed.txt")).unwrap();
        let id = lease.id();
        drop(lease);

        assert!(matches!(rx.try_recv().unwrap(), StateChange::JobRegistered { id: got, .. } if got == id));
        assert!(matches!(
            rx.try_recv().unwrap(),
            StateChange::JobReleased { status: JobStatus::Pending, .. }
        ));
    }

    #[test]
    fn test_clone_shares_state() {
        let registry = JobRegistry::new();
        let other = registry.clone();
        let _lease = registry.claim("generate", Utf8Path::new("shared.txt")).unwrap();
        assert!(other.is_busy(Utf8Path::new("shared.txt")));
        assert_eq!(other.snapshot().jobs.len(), 1);
    }
}
