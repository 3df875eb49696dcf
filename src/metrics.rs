// Pipeline metrics
//
// Counters for everything a job drops silently (filter rejections, policy rejections,
// duplicates) plus what it produced. Owned by the worker for the life of a job and handed
// to the controller in the terminal event.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why the fixer rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Empty,
    MissingUpper,
    MissingLower,
    MissingDigit,
    MissingSymbol,
    TooShort,
    Blacklisted,
    NotWhitelisted,
    LowEntropy,
}

/// Counters collected over one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Words loaded from all readable sources
    pub source_words: u64,

    /// Sources skipped under the skip policy
    pub skipped_sources: Vec<String>,

    /// Source words removed by the word filters
    pub filtered_out: u64,

    /// Candidates assembled before leet expansion
    pub base_candidates: u64,

    /// Leet variants produced (equal to base candidates with leet off)
    pub variants: u64,

    /// Candidates changed by the smart rule
    pub smart_fixes: u64,

    /// Candidates changed by policy repair
    pub repairs: u64,

    /// Candidates dropped for being too short after all transformations
    pub too_short: u64,

    /// Candidates the fixer rejected, by first failing check
    pub rejected: Vec<(Rejection, u64)>,

    /// Candidates dropped as duplicates
    pub duplicates: u64,

    /// Candidates in the final output
    pub emitted: u64,

    /// Wall time of the job
    pub elapsed: Duration,
}

impl PipelineStats {
    pub fn record_rejection(&mut self, reason: Rejection) {
        match self.rejected.iter_mut().find(|(r, _)| *r == reason) {
            Some((_, count)) => *count += 1,
            None => self.rejected.push((reason, 1)),
        }
    }

    pub fn rejections(&self, reason: Rejection) -> u64 {
        self.rejected
            .iter()
            .find(|(r, _)| *r == reason)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn total_rejected(&self) -> u64 {
        self.rejected.iter().map(|(_, count)| count).sum()
    }

    /// Output rate in candidates per second
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.emitted as f64 / secs
        } else {
            0.0
        }
    }

    /// Log a summary of the job
    pub fn log_summary(&self) {
        tracing::info!(
            "Pipeline summary - source words: {}, filtered out: {}, base candidates: {}, variants: {}",
            self.source_words,
            self.filtered_out,
            self.base_candidates,
            self.variants
        );

        tracing::info!(
            "Drops - rejected: {}, too short: {}, duplicates: {}",
            self.total_rejected(),
            self.too_short,
            self.duplicates
        );

        if !self.skipped_sources.is_empty() {
            tracing::warn!("Skipped sources: {}", self.skipped_sources.join(", "));
        }

        tracing::info!(
            "Emitted {} candidates in {:.2}s ({:.0}/s)",
            self.emitted,
            self.elapsed.as_secs_f64(),
            self.rate()
        );
    }
}
