// Error taxonomy for the pipeline and the scheduler.
//
// Predicate rejections (filters, policy checks, duplicates) are never errors; they are
// counted in `PipelineStats`. Only resource acquisition and bad configuration produce
// values of these types.

use crate::models::{ErrorDescriptor, Stage};
use camino::Utf8PathBuf;
use thiserror::Error;

/// Invalid or missing configuration, detected before a job starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field} regex: {source}")]
    InvalidRegex {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid {field}: {reason}")]
    InvalidAlphabet { field: &'static str, reason: String },

    #[error("{field} lower bound {min} exceeds upper bound {max}")]
    InvertedBounds {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{field} is {value}, more than the limit of {max}")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("No source word lists configured")]
    NoSources,

    #[error("Output path not configured")]
    NoOutput,

    #[error("Minimum entropy must be a finite, non-negative number of bits (got {0})")]
    InvalidEntropy(f64),
}

/// A source word list could not be read.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read source {path}: {source}")]
    Unreadable {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            SourceError::Unreadable { path, .. } => path,
        }
    }
}

/// Writing the output file failed.
///
/// `partial` is set when the file had already been created, so whatever is on disk
/// must not be trusted.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        partial: bool,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {message}")]
    Encode {
        path: Utf8PathBuf,
        partial: bool,
        message: String,
    },
}

impl OutputError {
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            OutputError::Write { path, .. } | OutputError::Encode { path, .. } => path,
        }
    }

    pub fn is_partial(&self) -> bool {
        match self {
            OutputError::Write { partial, .. } | OutputError::Encode { partial, .. } => *partial,
        }
    }
}

/// Any unrecoverable failure of a running job.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl JobError {
    /// Stage in which this error is raised.
    pub fn stage(&self) -> Stage {
        match self {
            JobError::Config(_) => Stage::Validating,
            JobError::Source(_) => Stage::Loading,
            JobError::Output(_) => Stage::Writing,
        }
    }

    /// Describe the failure for the terminal event.
    pub fn descriptor(&self) -> ErrorDescriptor {
        let (resource, partial_output) = match self {
            JobError::Config(_) => (None, false),
            JobError::Source(e) => (Some(e.path().to_string()), false),
            JobError::Output(e) => (Some(e.path().to_string()), e.is_partial()),
        };
        ErrorDescriptor {
            stage: self.stage(),
            resource,
            message: self.to_string(),
            partial_output,
        }
    }
}

/// Reasons a submission is refused before any worker starts.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("Output {0} is already the target of a running job")]
    OutputBusy(Utf8PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_descriptor_names_path() {
        let err = JobError::from(SourceError::Unreadable {
            path: Utf8PathBuf::from("missing.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        });

        let descriptor = err.descriptor();
        assert_eq!(descriptor.stage, Stage::Loading);
        assert_eq!(descriptor.resource.as_deref(), Some("missing.txt"));
        assert!(descriptor.message.contains("missing.txt"));
        assert!(!descriptor.partial_output);
    }

    #[test]
    fn test_output_error_flags_partial_file() {
        let err = JobError::from(OutputError::Write {
            path: Utf8PathBuf::from("out.txt"),
            partial: true,
            source: std::io::Error::other("disk full"),
        });

        let descriptor = err.descriptor();
        assert_eq!(descriptor.stage, Stage::Writing);
        assert!(descriptor.partial_output);
        assert!(descriptor.message.contains("disk full"));
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::InvertedBounds {
            field: "length",
            min: 9,
            max: 4,
        };
        assert_eq!(err.to_string(), "length lower bound 9 exceeds upper bound 4");
    }
}
