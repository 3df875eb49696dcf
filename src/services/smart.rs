use crate::services::charset::{Alphabet, is_symbol, stable_hash};

/// Guarantees every candidate contains at least one digit and one symbol.
///
/// A candidate missing either class gets one appended rather than being dropped. The
/// appended characters depend only on the candidate text, so the same input always gets
/// the same fix.
#[derive(Debug, Clone)]
pub struct SmartRule {
    digits: Alphabet,
    symbols: Alphabet,
}

impl SmartRule {
    /// `digits` must contain at least one ASCII digit and `symbols` at least one symbol,
    /// otherwise the appended characters could not satisfy the rule.
    pub fn new(digits: Alphabet, symbols: Alphabet) -> Option<Self> {
        let digits = digits.retain(|c| c.is_ascii_digit())?;
        let symbols = symbols.retain(is_symbol)?;
        Some(Self { digits, symbols })
    }

    pub fn satisfied(candidate: &str) -> bool {
        candidate.chars().any(|c| c.is_ascii_digit()) && candidate.chars().any(is_symbol)
    }

    /// Returns the candidate, fixed if needed, and whether it was changed.
    pub fn enforce(&self, mut candidate: String) -> (String, bool) {
        let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
        let has_symbol = candidate.chars().any(is_symbol);
        if has_digit && has_symbol {
            return (candidate, false);
        }

        let hash = stable_hash(&candidate);
        if !has_digit {
            candidate.push(self.digits.nth_wrapping(hash));
        }
        if !has_symbol {
            candidate.push(self.symbols.nth_wrapping(hash >> 32));
        }
        (candidate, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::charset::DEFAULT_SYMBOLS;

    fn rule() -> SmartRule {
        SmartRule::new(
            Alphabet::parse("digit_alphabet", "0-9").unwrap(),
            Alphabet::parse("symbol_alphabet", DEFAULT_SYMBOLS).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_satisfied_candidate_unchanged() {
        let (out, changed) = rule().enforce("pass-12".to_string());
        assert_eq!(out, "pass-12");
        assert!(!changed);
    }

    #[test]
    fn test_missing_both_appends_both() {
        let (out, changed) = rule().enforce("password".to_string());
        assert!(changed);
        assert_eq!(out.chars().count(), "password".len() + 2);
        assert!(out.starts_with("password"));
        assert!(SmartRule::satisfied(&out));
    }

    #[test]
    fn test_missing_symbol_only() {
        let (out, changed) = rule().enforce("word42".to_string());
        assert!(changed);
        assert_eq!(out.chars().count(), 7);
        assert!(SmartRule::satisfied(&out));
    }

    #[test]
    fn test_fix_is_deterministic() {
        let first = rule().enforce("candidate".to_string());
        let second = rule().enforce("candidate".to_string());
        assert_eq!(first, second);
    }

    #[test]
    fn test_alphabets_without_required_class_rejected() {
        assert!(
            SmartRule::new(
                Alphabet::parse("digit_alphabet", "abc").unwrap(),
                Alphabet::parse("symbol_alphabet", "!").unwrap(),
            )
            .is_none()
        );
    }

    #[test]
    fn test_symbol_alphabet_dash_survives_filtering() {
        let rule = SmartRule::new(
            Alphabet::parse("digit_alphabet", "0-9").unwrap(),
            Alphabet::parse("symbol_alphabet", "a-z!-?").unwrap(),
        )
        .unwrap();
        assert_eq!(rule.symbols.chars(), &['!', '-', '?']);
    }
}
