use regex::Regex;

use crate::error::ConfigError;
use crate::models::GeneratorConfig;
use crate::services::charset::{char_len, count_digits, count_symbols};

/// Inclusive `[min, max]` bound where either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Bounds {
    pub fn new(field: &'static str, min: Option<usize>, max: Option<usize>) -> Result<Self, ConfigError> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ConfigError::InvertedBounds { field, min, max });
            }
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: usize) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Composition of word predicates, each optional.
///
/// Applied in order: length bounds, digit-count bounds, symbol-count bounds,
/// include regex (must match), exclude regex (must not match). The engine holds no
/// state between calls, so filtering its own output changes nothing.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    length: Bounds,
    digits: Bounds,
    symbols: Bounds,
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl FilterEngine {
    /// An engine that keeps everything.
    pub fn pass_all() -> Self {
        Self::default()
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            length: Bounds::new("length", config.min_len, config.max_len)?,
            digits: Bounds::new("digit count", config.min_digits, config.max_digits)?,
            symbols: Bounds::new("symbol count", config.min_symbols, config.max_symbols)?,
            include: compile_optional("include", config.include_regex.as_deref())?,
            exclude: compile_optional("exclude", config.exclude_regex.as_deref())?,
        })
    }

    pub fn with_length(mut self, bounds: Bounds) -> Self {
        self.length = bounds;
        self
    }

    pub fn with_digits(mut self, bounds: Bounds) -> Self {
        self.digits = bounds;
        self
    }

    pub fn with_symbols(mut self, bounds: Bounds) -> Self {
        self.symbols = bounds;
        self
    }

    pub fn with_include(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.include = compile_optional("include", Some(pattern))?;
        Ok(self)
    }

    pub fn with_exclude(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.exclude = compile_optional("exclude", Some(pattern))?;
        Ok(self)
    }

    /// Whether a single candidate survives every predicate.
    pub fn accepts(&self, candidate: &str) -> bool {
        if !self.length.is_open() && !self.length.contains(char_len(candidate)) {
            return false;
        }
        if !self.digits.is_open() && !self.digits.contains(count_digits(candidate)) {
            return false;
        }
        if !self.symbols.is_open() && !self.symbols.contains(count_symbols(candidate)) {
            return false;
        }
        if let Some(include) = &self.include {
            if !include.is_match(candidate) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(candidate) {
                return false;
            }
        }
        true
    }

    /// Surviving candidates in their original order.
    pub fn apply(&self, candidates: Vec<String>) -> Vec<String> {
        candidates
            .into_iter()
            .filter(|candidate| self.accepts(candidate))
            .collect()
    }
}

fn compile_optional(field: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    match pattern {
        Some(p) if !p.is_empty() => Regex::new(p)
            .map(Some)
            .map_err(|source| ConfigError::InvalidRegex { field, source }),
        _ => Ok(None),
    }
}
