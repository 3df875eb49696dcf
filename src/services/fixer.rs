use camino::Utf8PathBuf;

use crate::error::ConfigError;
use crate::metrics::PipelineStats;
use crate::models::{FixerConfig, SourcePolicy, Stage};
use crate::scheduler::{Halt, ProgressTracker};
use crate::services::dedup::Deduplicator;
use crate::services::output::OutputTarget;
use crate::services::policy::PolicyValidator;
use crate::services::source::WordSource;

/// A validated fixer job: existing candidates through the policy checks, then dedup.
#[derive(Debug, Clone)]
pub struct FixerPlan {
    sources: Vec<Utf8PathBuf>,
    source_policy: SourcePolicy,
    validator: PolicyValidator,
    dedupe: bool,
    dedupe_ceiling: Option<usize>,
    output: OutputTarget,
    progress_interval: u64,
}

impl FixerPlan {
    pub fn from_config(config: &FixerConfig) -> Result<Self, ConfigError> {
        if config.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if config.progress_interval == 0 {
            return Err(ConfigError::ZeroValue("progress_interval"));
        }
        if config.dedupe_ceiling == Some(0) {
            return Err(ConfigError::ZeroValue("dedupe_ceiling"));
        }

        Ok(Self {
            sources: config.sources.clone(),
            source_policy: config.source_policy,
            validator: PolicyValidator::from_config(config)?,
            dedupe: config.dedupe,
            dedupe_ceiling: config.dedupe_ceiling,
            output: OutputTarget::new(&config.output, config.output_format, config.write_partial_on_cancel)?,
            progress_interval: config.progress_interval,
        })
    }

    pub fn output(&self) -> &OutputTarget {
        &self.output
    }

    pub fn progress_interval(&self) -> u64 {
        self.progress_interval
    }

    pub fn run(&self, progress: &mut ProgressTracker<'_>, stats: &mut PipelineStats) -> Result<Vec<String>, Halt> {
        progress.enter(Stage::Loading)?;
        let sources = WordSource::load(&self.sources, self.source_policy)?;
        stats.source_words = sources.len() as u64;
        stats.skipped_sources = sources.skipped.iter().map(|(path, _)| path.to_string()).collect();

        progress.set_total(sources.len() as u64);
        progress.enter(Stage::Fixing)?;

        let mut dedup = Deduplicator::new(self.dedupe_ceiling);
        let mut output = Vec::new();

        for entry in &sources.words {
            match self.validator.check(entry) {
                Ok((candidate, repaired)) => {
                    if repaired {
                        stats.repairs += 1;
                    }
                    if !self.dedupe || dedup.admit(&candidate) {
                        output.push(candidate);
                    }
                }
                Err(reason) => stats.record_rejection(reason),
            }

            if progress.advance().is_err() {
                stats.duplicates = dedup.duplicates();
                tracing::info!("Fixing cancelled after {} entries", progress.processed());
                return Err(Halt::Cancelled(output));
            }
        }

        stats.duplicates = dedup.duplicates();
        tracing::debug!(
            "{} of {} entries passed the policy ({} rejected)",
            output.len(),
            sources.len(),
            stats.total_rejected()
        );
        Ok(output)
    }
}
