use camino::Utf8PathBuf;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::ConfigError;
use crate::metrics::{PipelineStats, Rejection};
use crate::models::{GeneratorConfig, NumberMode, SourcePolicy, Stage};
use crate::scheduler::{Halt, Interrupted, ProgressTracker};
use crate::services::charset::{Alphabet, MAX_RUN, char_len, strip_ambiguous};
use crate::services::combinator::{Affixes, Combinator};
use crate::services::dedup::Deduplicator;
use crate::services::filter::FilterEngine;
use crate::services::leet::LeetTransformer;
use crate::services::output::OutputTarget;
use crate::services::pattern::{PatternExpander, Template};
use crate::services::smart::SmartRule;
use crate::services::source::WordSource;

/// How base candidates are built from the filtered words.
#[derive(Debug, Clone)]
pub enum Assembly {
    Pattern(PatternExpander),
    Combine { combinator: Combinator, count: usize },
}

/// A validated generator job.
///
/// Built once from a [`GeneratorConfig`]; every regex, template and alphabet is parsed
/// here, so running the plan can only fail on I/O.
#[derive(Debug, Clone)]
pub struct GeneratorPlan {
    sources: Vec<Utf8PathBuf>,
    source_policy: SourcePolicy,
    dedupe_sources: bool,
    filter: FilterEngine,
    assembly: Assembly,
    leet: LeetTransformer,
    exclude_ambiguous: bool,
    smart: Option<SmartRule>,
    affixes: Affixes,
    min_candidate_len: Option<usize>,
    dedupe: bool,
    dedupe_ceiling: Option<usize>,
    seed: u64,
    output: OutputTarget,
    progress_interval: u64,
}

impl GeneratorPlan {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        if config.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let output = OutputTarget::new(&config.output, config.output_format, config.write_partial_on_cancel)?;

        for (field, value) in [
            ("count", config.count),
            ("max_candidates", config.max_candidates),
            ("max_leet_variants", config.max_leet_variants),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue(field));
            }
        }
        if config.progress_interval == 0 {
            return Err(ConfigError::ZeroValue("progress_interval"));
        }
        if config.dedupe_ceiling == Some(0) {
            return Err(ConfigError::ZeroValue("dedupe_ceiling"));
        }

        let mut digits = Alphabet::parse("digit_alphabet", &config.digit_alphabet)?;
        let mut symbols = Alphabet::parse("symbol_alphabet", &config.symbol_alphabet)?;
        if config.exclude_ambiguous {
            // Generated characters would be stripped again later, shortening candidates
            digits = digits.without_ambiguous().ok_or(ConfigError::InvalidAlphabet {
                field: "digit_alphabet",
                reason: "nothing left after excluding ambiguous characters".to_string(),
            })?;
            symbols = symbols.without_ambiguous().ok_or(ConfigError::InvalidAlphabet {
                field: "symbol_alphabet",
                reason: "nothing left after excluding ambiguous characters".to_string(),
            })?;
        }

        let assembly = match config.pattern.as_deref().map(str::trim) {
            Some(pattern) if !pattern.is_empty() => Assembly::Pattern(PatternExpander::new(
                Template::parse(pattern)?,
                digits.clone(),
                symbols.clone(),
                config.expansion,
                config.count,
                config.max_candidates,
            )),
            _ => {
                if config.words_per_candidate == 0 {
                    return Err(ConfigError::ZeroValue("words_per_candidate"));
                }
                if let NumberMode::Fixed { len: 0 } = config.number {
                    return Err(ConfigError::ZeroValue("number.len"));
                }
                let number_len = match config.number {
                    NumberMode::Fixed { len } => len,
                    NumberMode::Range { .. } => 0,
                };
                for (field, value) in [
                    ("words_per_candidate", config.words_per_candidate),
                    ("append_digits", config.append_digits),
                    ("append_symbols", config.append_symbols),
                    ("number.len", number_len),
                ] {
                    if value > MAX_RUN {
                        return Err(ConfigError::TooLarge {
                            field,
                            value,
                            max: MAX_RUN,
                        });
                    }
                }
                let separators = if config.separators.is_empty() {
                    None
                } else {
                    Some(Alphabet::parse("separators", &config.separators)?)
                };
                Assembly::Combine {
                    combinator: Combinator {
                        words_per_candidate: config.words_per_candidate,
                        unique_words: config.unique_words,
                        case_mode: config.case_mode,
                        shuffle: config.shuffle,
                        separators,
                        append_digits: config.append_digits,
                        append_symbols: config.append_symbols,
                        between: config.between_words,
                        number: config.number,
                        number_placement: config.number_placement,
                        digits: digits.clone(),
                        symbols: symbols.clone(),
                    },
                    count: config.count.min(config.max_candidates),
                }
            }
        };

        let smart = if config.smart_mode {
            Some(SmartRule::new(digits, symbols).ok_or(ConfigError::InvalidAlphabet {
                field: "smart_mode",
                reason: "the digit and symbol alphabets must contain a digit and a symbol".to_string(),
            })?)
        } else {
            None
        };

        Ok(Self {
            sources: config.sources.clone(),
            source_policy: config.source_policy,
            dedupe_sources: config.dedupe_sources,
            filter: FilterEngine::from_config(config)?,
            assembly,
            leet: LeetTransformer::new(config.leet_mode, config.max_leet_variants)
                .avoiding_ambiguous(config.exclude_ambiguous),
            exclude_ambiguous: config.exclude_ambiguous,
            smart,
            affixes: Affixes {
                prefix: config.prefix.clone(),
                suffix: config.suffix.clone(),
            },
            min_candidate_len: config.min_candidate_len,
            dedupe: config.dedupe,
            dedupe_ceiling: config.dedupe_ceiling,
            seed: config.seed,
            output,
            progress_interval: config.progress_interval,
        })
    }

    pub fn output(&self) -> &OutputTarget {
        &self.output
    }

    pub fn progress_interval(&self) -> u64 {
        self.progress_interval
    }

    /// Base candidates the generation stage will assemble from `word_count` words.
    pub fn planned(&self, word_count: usize) -> u64 {
        match &self.assembly {
            Assembly::Pattern(expander) => expander.planned(word_count),
            Assembly::Combine { .. } if word_count == 0 => 0,
            Assembly::Combine { count, .. } => *count as u64,
        }
    }

    /// Load, filter and generate. Returns the final candidate list, ready to write.
    pub fn run(&self, progress: &mut ProgressTracker<'_>, stats: &mut PipelineStats) -> Result<Vec<String>, Halt> {
        progress.enter(Stage::Loading)?;
        let mut sources = WordSource::load(&self.sources, self.source_policy)?;
        stats.source_words = sources.len() as u64;
        stats.skipped_sources = sources.skipped.iter().map(|(path, _)| path.to_string()).collect();
        if self.dedupe_sources {
            let removed = sources.dedupe();
            tracing::debug!("Removed {} repeated source words", removed);
        }

        progress.enter(Stage::Filtering)?;
        let loaded = sources.words.len();
        let words = self.filter.apply(sources.words);
        stats.filtered_out = (loaded - words.len()) as u64;
        tracing::debug!("{} of {} source words passed the filters", words.len(), loaded);

        progress.set_total(self.planned(words.len()));
        progress.enter(Stage::Generating)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut leet_rng = ChaCha8Rng::seed_from_u64(self.seed);
        leet_rng.set_stream(1);

        let mut dedup = Deduplicator::new(self.dedupe_ceiling);
        let mut output = Vec::new();

        let outcome = match &self.assembly {
            Assembly::Pattern(expander) => {
                let candidates = expander.expand(&words, &mut rng);
                self.transform_all(candidates, &mut leet_rng, &mut dedup, &mut output, progress, stats)
            }
            Assembly::Combine { combinator, .. } => {
                let planned = progress.total();
                let candidates = (0..planned).map_while(|_| combinator.assemble(&words, &mut rng));
                self.transform_all(candidates, &mut leet_rng, &mut dedup, &mut output, progress, stats)
            }
        };
        stats.duplicates = dedup.duplicates();

        match outcome {
            Ok(()) => Ok(output),
            Err(Interrupted) => {
                tracing::info!("Generation cancelled after {} base candidates", stats.base_candidates);
                Err(Halt::Cancelled(output))
            }
        }
    }

    fn transform_all(
        &self,
        candidates: impl Iterator<Item = String>,
        leet_rng: &mut ChaCha8Rng,
        dedup: &mut Deduplicator,
        output: &mut Vec<String>,
        progress: &mut ProgressTracker<'_>,
        stats: &mut PipelineStats,
    ) -> Result<(), Interrupted> {
        for base in candidates {
            stats.base_candidates += 1;

            for variant in self.leet.variants(&base, leet_rng) {
                stats.variants += 1;
                if let Some(candidate) = self.finish(variant, stats) {
                    if !self.dedupe || dedup.admit(&candidate) {
                        output.push(candidate);
                    }
                }
                progress.tick()?;
            }

            progress.advance()?;
        }
        Ok(())
    }

    /// Per-variant transformations after leet: ambiguous removal, smart rule, affixes,
    /// minimum length.
    fn finish(&self, mut candidate: String, stats: &mut PipelineStats) -> Option<String> {
        if self.exclude_ambiguous {
            candidate = strip_ambiguous(&candidate);
            if candidate.is_empty() {
                stats.record_rejection(Rejection::Empty);
                return None;
            }
        }

        if let Some(smart) = &self.smart {
            let (fixed, changed) = smart.enforce(candidate);
            if changed {
                stats.smart_fixes += 1;
            }
            candidate = fixed;
        }

        candidate = self.affixes.apply(candidate);

        if self.min_candidate_len.is_some_and(|min| char_len(&candidate) < min) {
            stats.too_short += 1;
            return None;
        }
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpansionMode, LeetMode};
    use crate::scheduler::CancelToken;
    use regex::Regex;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source(words: &str) -> (NamedTempFile, Utf8PathBuf) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(words.as_bytes()).unwrap();
        file.flush().unwrap();
        let path = Utf8PathBuf::try_from(file.path().to_path_buf()).unwrap();
        (file, path)
    }

    fn run(config: &GeneratorConfig) -> (Vec<String>, PipelineStats) {
        let plan = GeneratorPlan::from_config(config).unwrap();
        let mut events: Vec<crate::models::JobEvent> = Vec::new();
        let token = CancelToken::never();
        let mut progress = ProgressTracker::new(&mut events, &token, plan.progress_interval());
        let mut stats = PipelineStats::default();
        let output = match plan.run(&mut progress, &mut stats) {
            Ok(output) => output,
            Err(halt) => panic!("generation halted: {:?}", halt),
        };
        (output, stats)
    }

    #[test]
    fn test_pattern_example() {
        let (_file, path) = source("pass\nword\n");
        let config = GeneratorConfig {
            sources: vec![path],
            pattern: Some("Word-Digit(2)".to_string()),
            count: 30,
            dedupe: false,
            ..GeneratorConfig::default()
        };

        let (output, stats) = run(&config);
        let shape = Regex::new(r"^(pass|word)-\d{2}$").unwrap();
        assert_eq!(output.len(), 30);
        assert!(output.iter().all(|c| shape.is_match(c)), "{:?}", output);
        assert_eq!(stats.base_candidates, 30);
    }

    #[test]
    fn test_pattern_example_with_smart_mode() {
        let (_file, path) = source("pass\nword\n");
        let config = GeneratorConfig {
            sources: vec![path],
            pattern: Some("Word-Digit(2)".to_string()),
            count: 30,
            smart_mode: true,
            dedupe: false,
            ..GeneratorConfig::default()
        };

        // The dash already counts as a symbol, so the rule leaves the shape untouched
        let (output, stats) = run(&config);
        let shape = Regex::new(r"^(pass|word)-\d{2}$").unwrap();
        assert_eq!(output.len(), 30);
        assert_eq!(stats.smart_fixes, 0);
        for candidate in &output {
            assert!(shape.is_match(candidate), "{}", candidate);
            assert!(SmartRule::satisfied(candidate), "{}", candidate);
        }

        // Without the dash every candidate needs a symbol appended
        let (output, stats) = run(&GeneratorConfig {
            pattern: Some("WordDigit(2)".to_string()),
            ..config
        });
        let shape = Regex::new(r"^(pass|word)\d{2}[^A-Za-z0-9]$").unwrap();
        assert_eq!(stats.smart_fixes, 30);
        for candidate in &output {
            assert!(shape.is_match(candidate), "{}", candidate);
            assert!(SmartRule::satisfied(candidate), "{}", candidate);
        }
    }

    #[test]
    fn test_unbounded_leet_variants_accepted() {
        let (_file, path) = source("aaaaaaaaaa\n");
        let config = GeneratorConfig {
            sources: vec![path],
            pattern: Some("Word".to_string()),
            expansion: ExpansionMode::Exhaustive,
            leet_mode: LeetMode::Partial,
            max_leet_variants: usize::MAX,
            ..GeneratorConfig::default()
        };

        let (output, stats) = run(&config);
        assert!(!output.is_empty());
        assert!(output.len() <= 1023);
        assert_eq!(stats.variants as usize, output.len());
    }

    #[test]
    fn test_combination_numbers_between_and_at_end() {
        let (_file, path) = source("red\nblue\n");
        let config = GeneratorConfig {
            sources: vec![path],
            words_per_candidate: 2,
            between_words: crate::models::BetweenWords::Number,
            number: NumberMode::Range { max: 9 },
            number_placement: crate::models::NumberPlacement::End,
            count: 20,
            dedupe: false,
            ..GeneratorConfig::default()
        };

        let (output, _) = run(&config);
        let shape = Regex::new(r"^(red|blue)\d(red|blue)\d$").unwrap();
        assert_eq!(output.len(), 20);
        assert!(output.iter().all(|c| shape.is_match(c)), "{:?}", output);
    }

    #[test]
    fn test_leet_keeps_clear_of_ambiguous_removal() {
        let (_file, path) = source("toast\n");
        let config = GeneratorConfig {
            sources: vec![path],
            pattern: Some("Word".to_string()),
            expansion: ExpansionMode::Exhaustive,
            leet_mode: LeetMode::Full,
            exclude_ambiguous: true,
            ..GeneratorConfig::default()
        };

        let (output, _) = run(&config);
        assert_eq!(output, vec!["7o@$7"]);
    }

    #[test]
    fn test_same_seed_same_output() {
        let (_file, path) = source("alpha\nbeta\ngamma\ndelta\n");
        let config = GeneratorConfig {
            sources: vec![path],
            words_per_candidate: 3,
            separators: "-_.".to_string(),
            append_digits: 2,
            leet_mode: LeetMode::Partial,
            max_leet_variants: 3,
            count: 40,
            seed: 1234,
            ..GeneratorConfig::default()
        };

        let (first, _) = run(&config);
        let (second, _) = run(&config);
        assert_eq!(first, second);

        let (other, _) = run(&GeneratorConfig { seed: 4321, ..config });
        assert_ne!(first, other);
    }

    #[test]
    fn test_filters_apply_before_generation() {
        let (_file, path) = source("ab\nlongword\nw0rd\n");
        let config = GeneratorConfig {
            sources: vec![path],
            min_len: Some(3),
            max_digits: Some(0),
            pattern: Some("Word".to_string()),
            expansion: ExpansionMode::Exhaustive,
            ..GeneratorConfig::default()
        };

        let (output, stats) = run(&config);
        assert_eq!(output, vec!["longword"]);
        assert_eq!(stats.filtered_out, 2);
    }

    #[test]
    fn test_leet_variants_and_dedup() {
        let (_file, path) = source("cafe\ncafe\n");
        let config = GeneratorConfig {
            sources: vec![path],
            pattern: Some("Word".to_string()),
            expansion: ExpansionMode::Exhaustive,
            leet_mode: LeetMode::Partial,
            ..GeneratorConfig::default()
        };

        let (output, stats) = run(&config);
        assert_eq!(output, vec!["c@fe", "caf3", "c@f3"]);
        assert_eq!(stats.base_candidates, 2);
        assert_eq!(stats.variants, 6);
        assert_eq!(stats.duplicates, 3);
    }

    #[test]
    fn test_smart_mode_and_affixes() {
        let (_file, path) = source("sun\nmoon\n");
        let config = GeneratorConfig {
            sources: vec![path],
            pattern: Some("Word".to_string()),
            expansion: ExpansionMode::Exhaustive,
            smart_mode: true,
            prefix: "<".to_string(),
            suffix: ">".to_string(),
            ..GeneratorConfig::default()
        };

        let (output, stats) = run(&config);
        assert_eq!(output.len(), 2);
        assert_eq!(stats.smart_fixes, 2);
        for candidate in &output {
            assert!(candidate.starts_with('<') && candidate.ends_with('>'));
            assert!(SmartRule::satisfied(candidate), "{}", candidate);
        }
    }

    #[test]
    fn test_exclude_ambiguous_strips_and_drops_empty() {
        let (_file, path) = source("lol\nhello\nOIl\n");
        let config = GeneratorConfig {
            sources: vec![path],
            pattern: Some("Word".to_string()),
            expansion: ExpansionMode::Exhaustive,
            exclude_ambiguous: true,
            ..GeneratorConfig::default()
        };

        let (output, stats) = run(&config);
        assert_eq!(output, vec!["o", "heo"]);
        assert_eq!(stats.rejections(Rejection::Empty), 1);
    }

    #[test]
    fn test_min_candidate_len_drops_short_results() {
        let (_file, path) = source("a\nabcdef\n");
        let config = GeneratorConfig {
            sources: vec![path],
            pattern: Some("Word".to_string()),
            expansion: ExpansionMode::Exhaustive,
            min_candidate_len: Some(4),
            ..GeneratorConfig::default()
        };

        let (output, stats) = run(&config);
        assert_eq!(output, vec!["abcdef"]);
        assert_eq!(stats.too_short, 1);
    }

    #[test]
    fn test_empty_filtered_list_completes_empty() {
        let (_file, path) = source("a\nb\n");
        let config = GeneratorConfig {
            sources: vec![path],
            min_len: Some(5),
            ..GeneratorConfig::default()
        };

        let (output, stats) = run(&config);
        assert!(output.is_empty());
        assert_eq!(stats.base_candidates, 0);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let base = GeneratorConfig {
            sources: vec![Utf8PathBuf::from("words.txt")],
            ..GeneratorConfig::default()
        };

        let cases = [
            GeneratorConfig { sources: Vec::new(), ..base.clone() },
            GeneratorConfig { output: Utf8PathBuf::from(""), ..base.clone() },
            GeneratorConfig { count: 0, ..base.clone() },
            GeneratorConfig { min_len: Some(9), max_len: Some(3), ..base.clone() },
            GeneratorConfig { include_regex: Some("(".to_string()), ..base.clone() },
            GeneratorConfig { pattern: Some("Digit(0)".to_string()), ..base.clone() },
            GeneratorConfig { digit_alphabet: "9-0".to_string(), ..base.clone() },
            GeneratorConfig { smart_mode: true, symbol_alphabet: "abc".to_string(), ..base.clone() },
            GeneratorConfig { exclude_ambiguous: true, digit_alphabet: "01".to_string(), ..base.clone() },
            GeneratorConfig { words_per_candidate: 0, ..base.clone() },
            GeneratorConfig { progress_interval: 0, ..base.clone() },
            GeneratorConfig { words_per_candidate: usize::MAX, ..base.clone() },
            GeneratorConfig { append_digits: MAX_RUN + 1, ..base.clone() },
            GeneratorConfig { number: NumberMode::Fixed { len: 0 }, ..base.clone() },
            GeneratorConfig { number: NumberMode::Fixed { len: MAX_RUN + 1 }, ..base.clone() },
        ];

        for config in cases {
            assert!(GeneratorPlan::from_config(&config).is_err(), "{:?}", config);
        }
        assert!(GeneratorPlan::from_config(&base).is_ok());
    }
}
