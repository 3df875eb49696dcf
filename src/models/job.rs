use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::PipelineStats;

/// Pipeline stage, reported in progress events and failure descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validating,
    Loading,
    Filtering,
    Generating,
    Fixing,
    Writing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Loading => "loading",
            Stage::Filtering => "filtering",
            Stage::Generating => "generating",
            Stage::Fixing => "fixing",
            Stage::Writing => "writing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a job.
///
/// `Pending → Running → {Completed, Cancelled, Failed}`; see
/// [`crate::state::is_valid_transition`] for the enforced transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Periodic progress of a running job.
///
/// `processed` never decreases over the life of a job. `total` is the planned amount
/// of work for the current unit (base candidates for the generator, input entries for
/// the fixer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub processed: u64,
    pub total: u64,
    pub stage: Stage,
}

impl ProgressEvent {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed.min(self.total) * 100) / self.total) as u8
    }
}

/// Which stage and which resource a failed job tripped on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub stage: Stage,
    pub resource: Option<String>,
    pub message: String,
    /// An output file was created before the failure and may be incomplete
    pub partial_output: bool,
}

/// Last event of every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalEvent {
    pub status: JobStatus,
    /// Candidates written on completion; work units processed otherwise
    pub count: u64,
    pub total: u64,
    pub error: Option<ErrorDescriptor>,
    /// A partial output file was written on cancellation
    pub partial_output: bool,
    pub stats: PipelineStats,
}

impl TerminalEvent {
    pub fn completed(count: u64, total: u64, stats: PipelineStats) -> Self {
        Self {
            status: JobStatus::Completed,
            count,
            total,
            error: None,
            partial_output: false,
            stats,
        }
    }

    pub fn cancelled(processed: u64, total: u64, partial_output: bool, stats: PipelineStats) -> Self {
        Self {
            status: JobStatus::Cancelled,
            count: processed,
            total,
            error: None,
            partial_output,
            stats,
        }
    }

    pub fn failed(processed: u64, total: u64, error: ErrorDescriptor, stats: PipelineStats) -> Self {
        Self {
            status: JobStatus::Failed,
            count: processed,
            total,
            partial_output: error.partial_output,
            error: Some(error),
            stats,
        }
    }
}

/// Everything a worker reports to its controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobEvent {
    Progress(ProgressEvent),
    Finished(TerminalEvent),
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Finished(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        let event = ProgressEvent {
            processed: 250,
            total: 1000,
            stage: Stage::Generating,
        };
        assert_eq!(event.percent(), 25);

        let empty = ProgressEvent {
            processed: 0,
            total: 0,
            stage: Stage::Fixing,
        };
        assert_eq!(empty.percent(), 100);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn test_failed_event_carries_partial_flag() {
        let event = TerminalEvent::failed(
            10,
            20,
            ErrorDescriptor {
                stage: Stage::Writing,
                resource: Some("out.txt".to_string()),
                message: "disk full".to_string(),
                partial_output: true,
            },
            PipelineStats::default(),
        );
        assert_eq!(event.status, JobStatus::Failed);
        assert!(event.partial_output);
        assert!(event.error.is_some());
    }
}
