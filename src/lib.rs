// wordmake - password candidate wordlist generator and fixer
//
// This is the library crate containing the pipeline, the background scheduler and
// their data structures. The binary crate (main.rs) provides the command-line front end.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use error::{ConfigError, JobError, OutputError, SchedulerError, SourceError};
pub use metrics::{PipelineStats, Rejection};
pub use models::{FixerConfig, GeneratorConfig, JobConfig, JobEvent, JobStatus, ProgressEvent, TerminalEvent};
pub use scheduler::{JobHandle, WorkerScheduler};
pub use state::{JobRegistry, StateChange};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
