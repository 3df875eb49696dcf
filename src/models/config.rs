use camino::Utf8PathBuf;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::services::charset::{DEFAULT_DIGITS, DEFAULT_SYMBOLS};

/// Seed used when a job file does not set one, so unseeded runs are still reproducible.
pub const DEFAULT_SEED: u64 = 0x5EED;

/// A job file: either a generator run or a fixer run.
///
/// Loaded by [`crate::config::ConfigManager`] and validated into a plan when the job is
/// submitted to the [`crate::scheduler::WorkerScheduler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum JobConfig {
    Generate(GeneratorConfig),
    Fix(FixerConfig),
}

impl JobConfig {
    pub fn output(&self) -> &Utf8PathBuf {
        match self {
            JobConfig::Generate(cfg) => &cfg.output,
            JobConfig::Fix(cfg) => &cfg.output,
        }
    }

    pub fn set_output(&mut self, output: Utf8PathBuf) {
        match self {
            JobConfig::Generate(cfg) => cfg.output = output,
            JobConfig::Fix(cfg) => cfg.output = output,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            JobConfig::Generate(_) => "generate",
            JobConfig::Fix(_) => "fix",
        }
    }
}

/// What to do when a source word list cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePolicy {
    /// Fail the job on the first unreadable source
    #[default]
    Abort,
    /// Record the source as skipped and continue with the rest
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeetMode {
    #[default]
    Off,
    /// One variant with every substitutable character replaced
    Full,
    /// One variant per non-empty subset of substitutable positions
    Partial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    #[default]
    None,
    Lower,
    Upper,
    Title,
    Random,
}

/// How a pattern template is turned into candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionMode {
    /// Exactly `count` candidates, words drawn per candidate
    #[default]
    Sampled,
    /// Every word tuple in order, capped at `max_candidates`
    Exhaustive,
}

/// What goes between consecutive words in combination mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetweenWords {
    /// One character from `separators`, or nothing when that is empty
    #[default]
    Separator,
    /// One character from the symbol alphabet
    Symbol,
    /// A drawn number, formed per [`NumberMode`]
    Number,
}

/// How a drawn number is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NumberMode {
    /// Exactly `len` characters from the digit alphabet
    Fixed { len: usize },
    /// A decimal number between 0 and `max` inclusive, without leading zeros
    Range { max: u64 },
}

impl Default for NumberMode {
    fn default() -> Self {
        NumberMode::Fixed { len: 2 }
    }
}

/// Where combination mode adds a drawn number to the candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberPlacement {
    #[default]
    None,
    /// Before the first word
    Start,
    /// After everything else, appended digits and symbols included
    End,
}

/// How blacklist/whitelist entries are compared with candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMatch {
    #[default]
    Exact,
    Substring,
}

/// Options of the generator pipeline.
///
/// With both `leet_mode` and `exclude_ambiguous` on, leet only uses the substitutions
/// whose replacement is unambiguous (`@ 3 $ 7`), so the later ambiguous-character removal
/// cannot eat into leet output. Numbers drawn with [`NumberMode::Range`] are still
/// subject to that removal; use a digit alphabet without `0` and `1` with `Fixed`
/// numbers instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sources: Vec<Utf8PathBuf>,
    pub source_policy: SourcePolicy,
    pub dedupe_sources: bool,

    // Source word filters
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub min_digits: Option<usize>,
    pub max_digits: Option<usize>,
    pub min_symbols: Option<usize>,
    pub max_symbols: Option<usize>,
    pub include_regex: Option<String>,
    pub exclude_regex: Option<String>,

    // Pattern mode (absent pattern = word combination mode)
    pub pattern: Option<String>,
    pub expansion: ExpansionMode,
    pub count: usize,
    pub max_candidates: usize,
    pub digit_alphabet: String,
    pub symbol_alphabet: String,

    // Word combination mode
    pub words_per_candidate: usize,
    pub unique_words: bool,
    pub case_mode: CaseMode,
    pub shuffle: bool,
    pub separators: String,
    pub append_digits: usize,
    pub append_symbols: usize,
    pub between_words: BetweenWords,
    pub number: NumberMode,
    pub number_placement: NumberPlacement,

    // Transformations applied to every candidate
    pub leet_mode: LeetMode,
    pub max_leet_variants: usize,
    pub exclude_ambiguous: bool,
    pub smart_mode: bool,
    pub prefix: String,
    pub suffix: String,
    pub min_candidate_len: Option<usize>,

    pub dedupe: bool,
    pub dedupe_ceiling: Option<usize>,
    pub seed: u64,

    pub output: Utf8PathBuf,
    pub output_format: OutputFormat,
    pub progress_interval: u64,
    pub write_partial_on_cancel: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            source_policy: SourcePolicy::Abort,
            dedupe_sources: false,

            min_len: None,
            max_len: None,
            min_digits: None,
            max_digits: None,
            min_symbols: None,
            max_symbols: None,
            include_regex: None,
            exclude_regex: None,

            pattern: None,
            expansion: ExpansionMode::Sampled,
            count: 100,
            max_candidates: default_max_candidates(),
            digit_alphabet: DEFAULT_DIGITS.to_string(),
            symbol_alphabet: DEFAULT_SYMBOLS.to_string(),

            words_per_candidate: 2,
            unique_words: false,
            case_mode: CaseMode::None,
            shuffle: false,
            separators: String::new(),
            append_digits: 0,
            append_symbols: 0,
            between_words: BetweenWords::Separator,
            number: NumberMode::default(),
            number_placement: NumberPlacement::None,

            leet_mode: LeetMode::Off,
            max_leet_variants: default_max_leet_variants(),
            exclude_ambiguous: false,
            smart_mode: false,
            prefix: String::new(),
            suffix: String::new(),
            min_candidate_len: None,

            dedupe: true,
            dedupe_ceiling: None,
            seed: DEFAULT_SEED,

            output: Utf8PathBuf::from("passwords.txt"),
            output_format: OutputFormat::Txt,
            progress_interval: default_progress_interval(),
            write_partial_on_cancel: false,
        }
    }
}

/// Options of the fixer pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerConfig {
    pub sources: Vec<Utf8PathBuf>,
    pub source_policy: SourcePolicy,

    pub remove_ambiguous: bool,
    /// Append missing required classes instead of rejecting
    pub repair: bool,
    pub require_upper: bool,
    pub require_lower: bool,
    pub require_digit: bool,
    pub require_symbol: bool,

    pub blacklist: IndexSet<String>,
    pub whitelist: IndexSet<String>,
    pub list_match: ListMatch,

    pub min_len: usize,
    pub min_entropy_bits: f64,

    pub dedupe: bool,
    pub dedupe_ceiling: Option<usize>,
    pub seed: u64,

    pub output: Utf8PathBuf,
    pub output_format: OutputFormat,
    pub progress_interval: u64,
    pub write_partial_on_cancel: bool,
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            source_policy: SourcePolicy::Abort,

            remove_ambiguous: false,
            repair: false,
            require_upper: false,
            require_lower: false,
            require_digit: false,
            require_symbol: false,

            blacklist: IndexSet::new(),
            whitelist: IndexSet::new(),
            list_match: ListMatch::Exact,

            min_len: 0,
            min_entropy_bits: 0.0,

            dedupe: true,
            dedupe_ceiling: None,
            seed: DEFAULT_SEED,

            output: Utf8PathBuf::from("fixed.txt"),
            output_format: OutputFormat::Txt,
            progress_interval: default_progress_interval(),
            write_partial_on_cancel: false,
        }
    }
}

fn default_max_candidates() -> usize {
    1_000_000
}

fn default_max_leet_variants() -> usize {
    16
}

fn default_progress_interval() -> u64 {
    1_000
}
