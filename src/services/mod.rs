//! Services module - the candidate pipeline.
//!
//! Every component here is a synchronous, single-threaded function of its inputs. None of
//! them know about tokio; the [`scheduler`](crate::scheduler) runs them on a blocking
//! worker and feeds them a [`ProgressTracker`](crate::scheduler::ProgressTracker) for
//! progress and cancellation.
//!
//! # Components
//!
//! - [`WordSource`]: loads and merges source word lists
//! - [`FilterEngine`]: length, digit, symbol and regex predicates over source words
//! - [`PatternExpander`]: expands a [`Template`] such as `Word-Digit(2)` into candidates
//! - [`Combinator`]: joins several words with separators, case and appended characters
//! - [`LeetTransformer`]: leetspeak variants (`off`, `full`, `partial`)
//! - [`SmartRule`]: makes sure every candidate has a digit and a symbol
//! - [`Deduplicator`]: first-occurrence-wins seen-set, optionally bounded
//! - [`PolicyValidator`]: class requirements, length, lists and entropy for the fixer
//! - [`OutputWriter`]: TXT, CSV or JSON output
//!
//! # Pipelines
//!
//! [`GeneratorPlan`] and [`FixerPlan`] are validated, immutable descriptions of a job.
//! Validation happens once, when the plan is built; running it can then only fail on I/O.
//!
//! ```text
//! generate: sources -> filter -> pattern | combine -> leet -> [ambiguous] -> smart
//!           -> affixes -> [min length] -> dedup -> output
//! fix:      sources -> policy -> dedup -> output
//! ```
//!
//! # Usage Example
//!
//! ```ignore
//! use wordmake::models::GeneratorConfig;
//! use wordmake::scheduler::{CancelToken, ProgressTracker};
//! use wordmake::services::GeneratorPlan;
//!
//! let plan = GeneratorPlan::from_config(&config)?;
//! let token = CancelToken::never();
//! let mut events = Vec::new();
//! let mut progress = ProgressTracker::new(&mut events, &token, plan.progress_interval());
//! let candidates = plan.run(&mut progress, &mut stats)?;
//! ```

pub mod charset;
pub mod combinator;
pub mod dedup;
pub mod filter;
pub mod fixer;
pub mod generator;
pub mod leet;
pub mod output;
pub mod pattern;
pub mod policy;
pub mod smart;
pub mod source;

pub use charset::Alphabet;
pub use combinator::{Affixes, Combinator};
pub use dedup::Deduplicator;
pub use filter::{Bounds, FilterEngine};
pub use fixer::FixerPlan;
pub use generator::{Assembly, GeneratorPlan};
pub use leet::LeetTransformer;
pub use output::{OutputTarget, OutputWriter};
pub use pattern::{PatternExpander, Template, Token};
pub use policy::PolicyValidator;
pub use smart::SmartRule;
pub use source::{SourceList, WordSource};
