use indexmap::IndexSet;

use crate::error::ConfigError;
use crate::metrics::Rejection;
use crate::models::{FixerConfig, ListMatch};
use crate::services::charset::{ClassPresence, char_len, entropy_bits, stable_hash, strip_ambiguous};

const REPAIR_UPPER: &str = "ABCDEFGHJKMNPQRSTUVWXYZ";
const REPAIR_LOWER: &str = "abcdefghijkmnopqrstuvwxyz";
const REPAIR_DIGITS: &str = "23456789";
const REPAIR_SYMBOLS: &str = "!@#$%^&*()-_+=";

/// Fixer-side policy enforcement.
///
/// For each candidate, in order:
/// 1. delete ambiguous characters (`0 O 1 l I`) when enabled; a candidate left empty is
///    rejected
/// 2. with `repair`, append one character for every required class that is missing
/// 3. reject when a required class is missing
/// 4. reject when shorter than `min_len`
/// 5. reject when blacklisted, or not whitelisted while a whitelist is set
/// 6. reject when the entropy estimate is below `min_entropy_bits`
///
/// Rejections are reported as a [`Rejection`] reason, never as errors.
#[derive(Debug, Clone)]
pub struct PolicyValidator {
    remove_ambiguous: bool,
    repair: bool,
    required: ClassPresence,
    min_len: usize,
    blacklist: IndexSet<String>,
    whitelist: IndexSet<String>,
    list_match: ListMatch,
    min_entropy_bits: f64,
    seed: u64,
}

impl PolicyValidator {
    pub fn from_config(config: &FixerConfig) -> Result<Self, ConfigError> {
        if !config.min_entropy_bits.is_finite() || config.min_entropy_bits < 0.0 {
            return Err(ConfigError::InvalidEntropy(config.min_entropy_bits));
        }

        Ok(Self {
            remove_ambiguous: config.remove_ambiguous,
            repair: config.repair,
            required: ClassPresence {
                lower: config.require_lower,
                upper: config.require_upper,
                digit: config.require_digit,
                symbol: config.require_symbol,
            },
            min_len: config.min_len,
            blacklist: config.blacklist.clone(),
            whitelist: config.whitelist.clone(),
            list_match: config.list_match,
            min_entropy_bits: config.min_entropy_bits,
            seed: config.seed,
        })
    }

    /// The candidate as it should be emitted, or why it was rejected.
    ///
    /// The second element of `Ok` tells whether repair changed the candidate.
    pub fn check(&self, candidate: &str) -> Result<(String, bool), Rejection> {
        let mut candidate = if self.remove_ambiguous {
            strip_ambiguous(candidate)
        } else {
            candidate.to_string()
        };

        if candidate.is_empty() {
            return Err(Rejection::Empty);
        }

        let mut repaired = false;
        if self.repair {
            repaired = self.repair_classes(&mut candidate);
        }

        let present = ClassPresence::of(&candidate);
        if self.required.upper && !present.upper {
            return Err(Rejection::MissingUpper);
        }
        if self.required.lower && !present.lower {
            return Err(Rejection::MissingLower);
        }
        if self.required.digit && !present.digit {
            return Err(Rejection::MissingDigit);
        }
        if self.required.symbol && !present.symbol {
            return Err(Rejection::MissingSymbol);
        }

        if char_len(&candidate) < self.min_len {
            return Err(Rejection::TooShort);
        }

        if self.in_list(&self.blacklist, &candidate) {
            return Err(Rejection::Blacklisted);
        }
        if !self.whitelist.is_empty() && !self.in_list(&self.whitelist, &candidate) {
            return Err(Rejection::NotWhitelisted);
        }

        if self.min_entropy_bits > 0.0 && entropy_bits(&candidate) < self.min_entropy_bits {
            return Err(Rejection::LowEntropy);
        }

        Ok((candidate, repaired))
    }

    fn in_list(&self, list: &IndexSet<String>, candidate: &str) -> bool {
        match self.list_match {
            ListMatch::Exact => list.contains(candidate),
            ListMatch::Substring => list.iter().any(|entry| candidate.contains(entry.as_str())),
        }
    }

    /// Append a character for each missing required class, chosen from the candidate
    /// text and the job seed. The repair alphabets contain no ambiguous glyphs.
    fn repair_classes(&self, candidate: &mut String) -> bool {
        let present = ClassPresence::of(candidate);
        let hash = stable_hash(candidate) ^ self.seed;
        let mut changed = false;

        let mut push_from = |alphabet: &str, shift: u32| {
            let chars: Vec<char> = alphabet.chars().collect();
            let index = ((hash >> shift) % chars.len() as u64) as usize;
            candidate.push(chars[index]);
            changed = true;
        };

        if self.required.upper && !present.upper {
            push_from(REPAIR_UPPER, 0);
        }
        if self.required.lower && !present.lower {
            push_from(REPAIR_LOWER, 16);
        }
        if self.required.digit && !present.digit {
            push_from(REPAIR_DIGITS, 32);
        }
        if self.required.symbol && !present.symbol {
            push_from(REPAIR_SYMBOLS, 48);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> FixerConfig {
        FixerConfig {
            min_len: 8,
            require_upper: true,
            require_lower: true,
            require_digit: true,
            require_symbol: true,
            ..FixerConfig::default()
        }
    }

    fn passing(validator: &PolicyValidator, input: &[&str]) -> Vec<String> {
        input
            .iter()
            .filter_map(|c| validator.check(c).ok().map(|(c, _)| c))
            .collect()
    }

    #[test]
    fn test_reference_example() {
        let validator = PolicyValidator::from_config(&strict()).unwrap();
        let out = passing(&validator, &["Password1!", "p", "PASS1!", "password1!"]);
        assert_eq!(out, vec!["Password1!"]);
    }

    #[test]
    fn test_rejection_reasons() {
        let validator = PolicyValidator::from_config(&strict()).unwrap();
        assert_eq!(validator.check("password1!"), Err(Rejection::MissingUpper));
        assert_eq!(validator.check("PASSWORD1!"), Err(Rejection::MissingLower));
        assert_eq!(validator.check("Password!!"), Err(Rejection::MissingDigit));
        assert_eq!(validator.check("Password11"), Err(Rejection::MissingSymbol));
        assert_eq!(validator.check("Pa1!"), Err(Rejection::TooShort));
    }

    #[test]
    fn test_ambiguous_characters_deleted() {
        let config = FixerConfig {
            remove_ambiguous: true,
            ..FixerConfig::default()
        };
        let validator = PolicyValidator::from_config(&config).unwrap();
        assert_eq!(validator.check("H3ll0 W0rld").unwrap().0, "H3 Wrd");
        assert_eq!(validator.check("0O1lI"), Err(Rejection::Empty));
    }

    #[test]
    fn test_ambiguous_removal_happens_before_class_checks() {
        let config = FixerConfig {
            remove_ambiguous: true,
            ..strict()
        };
        let validator = PolicyValidator::from_config(&config).unwrap();
        // The only digit is a '1', which is removed
        assert_eq!(validator.check("Password1!"), Err(Rejection::MissingDigit));
    }

    #[test]
    fn test_repair_appends_missing_classes() {
        let config = FixerConfig {
            repair: true,
            ..strict()
        };
        let validator = PolicyValidator::from_config(&config).unwrap();

        let (fixed, repaired) = validator.check("password").unwrap();
        assert!(repaired);
        assert!(fixed.starts_with("password"));
        assert_eq!(fixed.chars().count(), 11);
        let present = ClassPresence::of(&fixed);
        assert!(present.upper && present.lower && present.digit && present.symbol);

        // Deterministic for the same input
        assert_eq!(validator.check("password").unwrap().0, fixed);

        let (same, repaired) = validator.check("Password1!").unwrap();
        assert_eq!(same, "Password1!");
        assert!(!repaired);
    }

    #[test]
    fn test_blacklist_and_whitelist_exact() {
        let config = FixerConfig {
            blacklist: ["hunter2".to_string()].into_iter().collect(),
            whitelist: ["hunter2".to_string(), "letmein".to_string()].into_iter().collect(),
            ..FixerConfig::default()
        };
        let validator = PolicyValidator::from_config(&config).unwrap();
        assert_eq!(validator.check("hunter2"), Err(Rejection::Blacklisted));
        assert_eq!(validator.check("letmein").unwrap().0, "letmein");
        assert_eq!(validator.check("letmein!"), Err(Rejection::NotWhitelisted));
    }

    #[test]
    fn test_blacklist_substring() {
        let config = FixerConfig {
            blacklist: ["pass".to_string()].into_iter().collect(),
            list_match: ListMatch::Substring,
            ..FixerConfig::default()
        };
        let validator = PolicyValidator::from_config(&config).unwrap();
        assert_eq!(validator.check("mypassword"), Err(Rejection::Blacklisted));
        assert!(validator.check("secret").is_ok());
    }

    #[test]
    fn test_entropy_threshold() {
        let config = FixerConfig {
            min_entropy_bits: 40.0,
            ..FixerConfig::default()
        };
        let validator = PolicyValidator::from_config(&config).unwrap();
        // 8 lowercase: 8 * log2(26) ~ 37.6 bits
        assert_eq!(validator.check("abcdefgh"), Err(Rejection::LowEntropy));
        // 8 chars over all four classes: 8 * log2(94) ~ 52.4 bits
        assert!(validator.check("Abcdef1!").is_ok());
    }

    #[test]
    fn test_invalid_entropy_rejected() {
        let config = FixerConfig {
            min_entropy_bits: -1.0,
            ..FixerConfig::default()
        };
        assert!(matches!(
            PolicyValidator::from_config(&config),
            Err(ConfigError::InvalidEntropy(_))
        ));
    }
}
