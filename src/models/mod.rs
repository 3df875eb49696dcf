//! Data models for wordmake.
//!
//! - [`JobConfig`]: a job file, either a [`GeneratorConfig`] or a [`FixerConfig`], loaded from
//!   YAML by [`ConfigManager`](crate::config::ConfigManager)
//! - [`JobEvent`]: what a worker reports to its controller, periodic [`ProgressEvent`]s
//!   followed by exactly one [`TerminalEvent`]
//! - [`JobStatus`] and [`Stage`]: lifecycle and pipeline stage names
//!
//! # Architecture Note
//!
//! Configuration structs derive `Serialize`/`Deserialize` and are only ever read by the
//! pipeline. Validation turns them into immutable plans
//! ([`GeneratorPlan`](crate::services::GeneratorPlan), [`FixerPlan`](crate::services::FixerPlan))
//! once, when the job is submitted.

pub mod config;
pub mod job;

pub use config::{
    BetweenWords, CaseMode, DEFAULT_SEED, ExpansionMode, FixerConfig, GeneratorConfig, JobConfig,
    LeetMode, ListMatch, NumberMode, NumberPlacement, OutputFormat, SourcePolicy,
};
pub use job::{ErrorDescriptor, JobEvent, JobStatus, ProgressEvent, Stage, TerminalEvent};
