use std::time::Instant;

use crate::error::{ConfigError, JobError};
use crate::metrics::PipelineStats;
use crate::models::{JobConfig, Stage, TerminalEvent};
use crate::scheduler::cancel::CancelToken;
use crate::scheduler::progress::{EventSink, Halt, ProgressTracker};
use crate::services::{FixerPlan, GeneratorPlan, OutputTarget};

/// A validated job of either kind.
#[derive(Debug, Clone)]
pub enum JobPlan {
    Generate(GeneratorPlan),
    Fix(FixerPlan),
}

impl JobPlan {
    pub fn from_config(config: &JobConfig) -> Result<Self, ConfigError> {
        Ok(match config {
            JobConfig::Generate(config) => JobPlan::Generate(GeneratorPlan::from_config(config)?),
            JobConfig::Fix(config) => JobPlan::Fix(FixerPlan::from_config(config)?),
        })
    }

    pub fn output(&self) -> &OutputTarget {
        match self {
            JobPlan::Generate(plan) => plan.output(),
            JobPlan::Fix(plan) => plan.output(),
        }
    }

    pub fn progress_interval(&self) -> u64 {
        match self {
            JobPlan::Generate(plan) => plan.progress_interval(),
            JobPlan::Fix(plan) => plan.progress_interval(),
        }
    }
}

/// Run a job to its end on the current thread.
///
/// Progress events go to `sink`; the terminal event is returned, not emitted, so the
/// caller can release resources before announcing it. Blocks for as long as the job
/// runs, so the scheduler calls it from `spawn_blocking`.
pub fn run_job(plan: &JobPlan, sink: &mut dyn EventSink, token: &CancelToken) -> TerminalEvent {
    let started = Instant::now();
    let mut stats = PipelineStats::default();
    let mut progress = ProgressTracker::new(sink, token, plan.progress_interval());

    let result = match plan {
        JobPlan::Generate(plan) => plan.run(&mut progress, &mut stats),
        JobPlan::Fix(plan) => plan.run(&mut progress, &mut stats),
    };

    let target = plan.output();
    let terminal = match result {
        Ok(candidates) => match progress.enter(Stage::Writing) {
            Ok(()) => match target.write(&candidates) {
                Ok(()) => {
                    stats.emitted = candidates.len() as u64;
                    stats.elapsed = started.elapsed();
                    TerminalEvent::completed(stats.emitted, progress.total(), stats)
                }
                Err(e) => {
                    stats.elapsed = started.elapsed();
                    let error = JobError::from(e);
                    tracing::error!("Job failed: {}", error);
                    TerminalEvent::failed(progress.processed(), progress.total(), error.descriptor(), stats)
                }
            },
            Err(_) => cancelled(candidates, target, &progress, stats, started),
        },
        Err(Halt::Cancelled(partial)) => cancelled(partial, target, &progress, stats, started),
        Err(Halt::Failed(error)) => {
            stats.elapsed = started.elapsed();
            tracing::error!("Job failed in {} stage: {}", error.stage(), error);
            TerminalEvent::failed(progress.processed(), progress.total(), error.descriptor(), stats)
        }
    };

    tracing::info!("Job finished: {} ({} of {})", terminal.status, terminal.count, terminal.total);
    terminal.stats.log_summary();
    terminal
}

fn cancelled(
    partial: Vec<String>,
    target: &OutputTarget,
    progress: &ProgressTracker<'_>,
    mut stats: PipelineStats,
    started: Instant,
) -> TerminalEvent {
    let mut written = false;
    if target.write_partial_on_cancel {
        match target.write(&partial) {
            Ok(()) => {
                stats.emitted = partial.len() as u64;
                written = true;
            }
            Err(e) => tracing::warn!("Could not write partial output: {}", e),
        }
    }
    stats.elapsed = started.elapsed();
    TerminalEvent::cancelled(progress.processed(), progress.total(), written, stats)
}
