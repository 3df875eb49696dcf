use rand::Rng;
use std::fmt;

use crate::error::ConfigError;
use crate::models::ExpansionMode;
use crate::services::charset::{Alphabet, MAX_RUN};

/// One element of a pattern template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A word from the filtered source list
    Word,
    /// `n` characters from the digit alphabet
    Digit(usize),
    /// `n` characters from the symbol alphabet
    Symbol(usize),
    /// Copied verbatim
    Literal(String),
}

/// A parsed pattern such as `Word-Digit(2)` or `WordSymbolWordDigit(4)`.
///
/// The keywords `Word`, `Digit(n)` and `Symbol(n)` are tokens (`Digit` and `Symbol`
/// without a count mean one character); everything else is literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while !rest.is_empty() {
            let keyword = ["Word", "Digit", "Symbol"]
                .into_iter()
                .find(|k| rest.starts_with(k));

            let Some(keyword) = keyword else {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    literal.push(c);
                }
                rest = chars.as_str();
                continue;
            };

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            rest = &rest[keyword.len()..];

            if keyword == "Word" {
                tokens.push(Token::Word);
                continue;
            }

            let mut count = 1;
            if let Some(after_paren) = rest.strip_prefix('(') {
                let close = after_paren
                    .find(')')
                    .ok_or_else(|| invalid(format!("unclosed count after {}", keyword)))?;
                let digits = &after_paren[..close];
                count = digits
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid(format!("{}({}) needs a numeric count", keyword, digits)))?;
                if count == 0 {
                    return Err(invalid(format!("{}(0) produces nothing", keyword)));
                }
                if count > MAX_RUN {
                    return Err(invalid(format!("{}({}) is longer than {}", keyword, count, MAX_RUN)));
                }
                rest = &after_paren[close + 1..];
            }

            tokens.push(if keyword == "Digit" {
                Token::Digit(count)
            } else {
                Token::Symbol(count)
            });
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        if !tokens.iter().any(|t| !matches!(t, Token::Literal(_))) {
            return Err(invalid(
                "needs at least one Word, Digit or Symbol token".to_string(),
            ));
        }

        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of `Word` slots.
    pub fn word_slots(&self) -> usize {
        self.tokens.iter().filter(|t| matches!(t, Token::Word)).count()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                Token::Word => f.write_str("Word")?,
                Token::Digit(n) => write!(f, "Digit({})", n)?,
                Token::Symbol(n) => write!(f, "Symbol({})", n)?,
                Token::Literal(text) => f.write_str(text)?,
            }
        }
        Ok(())
    }
}

/// Expands a [`Template`] into concrete candidates.
///
/// Both strategies are reproducible: every random choice comes from the generator the
/// caller passes in, so the same words and the same seed give the same output.
///
/// - [`ExpansionMode::Sampled`]: `count` candidates, each `Word` slot drawn uniformly.
/// - [`ExpansionMode::Exhaustive`]: every word tuple over the `Word` slots in odometer
///   order (rightmost slot fastest). Words are reused across slots, so a template with
///   more slots than available words wraps instead of running dry.
///
/// Either way output stops at `max_candidates`.
#[derive(Debug, Clone)]
pub struct PatternExpander {
    template: Template,
    digits: Alphabet,
    symbols: Alphabet,
    mode: ExpansionMode,
    count: usize,
    max_candidates: usize,
}

impl PatternExpander {
    pub fn new(
        template: Template,
        digits: Alphabet,
        symbols: Alphabet,
        mode: ExpansionMode,
        count: usize,
        max_candidates: usize,
    ) -> Self {
        Self {
            template,
            digits,
            symbols,
            mode,
            count,
            max_candidates,
        }
    }

    /// How many candidates an expansion over `word_count` words will produce.
    pub fn planned(&self, word_count: usize) -> u64 {
        let slots = self.template.word_slots();
        if slots > 0 && word_count == 0 {
            return 0;
        }

        let cap = self.max_candidates as u64;
        match self.mode {
            ExpansionMode::Sampled => (self.count as u64).min(cap),
            ExpansionMode::Exhaustive => u32::try_from(slots)
                .ok()
                .and_then(|slots| (word_count as u64).checked_pow(slots))
                .unwrap_or(u64::MAX)
                .min(cap),
        }
    }

    pub fn expand<'a, R: Rng>(
        &'a self,
        words: &'a [String],
        rng: &'a mut R,
    ) -> Expansion<'a, R> {
        Expansion {
            expander: self,
            words,
            rng,
            odometer: vec![0; self.template.word_slots()],
            produced: 0,
            limit: self.planned(words.len()),
        }
    }

    fn render<R: Rng>(&self, indices: &[usize], words: &[String], rng: &mut R) -> String {
        let mut out = String::new();
        let mut slot = 0;
        for token in self.template.tokens() {
            match token {
                Token::Word => {
                    out.push_str(&words[indices[slot]]);
                    slot += 1;
                }
                Token::Digit(n) => out.push_str(&self.digits.draw(*n, rng)),
                Token::Symbol(n) => out.push_str(&self.symbols.draw(*n, rng)),
                Token::Literal(text) => out.push_str(text),
            }
        }
        out
    }
}

/// Lazy expansion, so the worker can check for cancellation between candidates.
pub struct Expansion<'a, R: Rng> {
    expander: &'a PatternExpander,
    words: &'a [String],
    rng: &'a mut R,
    odometer: Vec<usize>,
    produced: u64,
    limit: u64,
}

impl<R: Rng> Expansion<'_, R> {
    fn advance_odometer(&mut self) {
        for digit in self.odometer.iter_mut().rev() {
            *digit += 1;
            if *digit < self.words.len() {
                return;
            }
            *digit = 0;
        }
    }
}

impl<R: Rng> Iterator for Expansion<'_, R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.produced >= self.limit {
            return None;
        }
        self.produced += 1;

        let candidate = match self.expander.mode {
            ExpansionMode::Sampled => {
                let len = self.words.len();
                let indices: Vec<usize> = (0..self.odometer.len())
                    .map(|_| self.rng.random_range(0..len))
                    .collect();
                self.expander.render(&indices, self.words, &mut *self.rng)
            }
            ExpansionMode::Exhaustive => {
                let indices = self.odometer.clone();
                let candidate = self.expander.render(&indices, self.words, &mut *self.rng);
                self.advance_odometer();
                candidate
            }
        };

        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.limit - self.produced).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::charset::DEFAULT_SYMBOLS;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use regex::Regex;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    fn expander(pattern: &str, mode: ExpansionMode, count: usize, max: usize) -> PatternExpander {
        PatternExpander::new(
            Template::parse(pattern).unwrap(),
            Alphabet::parse("digit_alphabet", "0-9").unwrap(),
            Alphabet::parse("symbol_alphabet", DEFAULT_SYMBOLS).unwrap(),
            mode,
            count,
            max,
        )
    }

    #[test]
    fn test_parse_word_dash_digits() {
        let template = Template::parse("Word-Digit(2)").unwrap();
        assert_eq!(
            template.tokens(),
            &[Token::Word, Token::Literal("-".to_string()), Token::Digit(2)]
        );
        assert_eq!(template.to_string(), "Word-Digit(2)");
    }

    #[test]
    fn test_parse_bare_keywords_mean_one() {
        let template = Template::parse("WordSymbolWordDigit").unwrap();
        assert_eq!(
            template.tokens(),
            &[Token::Word, Token::Symbol(1), Token::Word, Token::Digit(1)]
        );
        assert_eq!(template.word_slots(), 2);
    }

    #[test]
    fn test_parse_rejects_bad_templates() {
        assert!(Template::parse("just text").is_err());
        assert!(Template::parse("Digit(0)").is_err());
        assert!(Template::parse("Digit(x)").is_err());
        assert!(Template::parse("WordDigit(3").is_err());
        assert!(Template::parse("Symbol(18446744073709551615)").is_err());
        assert!(Template::parse(&format!("Digit({})", MAX_RUN)).is_ok());
    }

    #[test]
    fn test_sampled_matches_shape() {
        let exp = expander("Word-Digit(2)", ExpansionMode::Sampled, 50, 1_000);
        let list = words(&["pass", "word"]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let shape = Regex::new(r"^[A-Za-z]+-\d{2}$").unwrap();
        let out: Vec<String> = exp.expand(&list, &mut rng).collect();
        assert_eq!(out.len(), 50);
        assert!(out.iter().all(|c| shape.is_match(c)), "{:?}", out);
    }

    #[test]
    fn test_same_seed_same_output() {
        let exp = expander("WordSymbol(2)WordDigit(3)", ExpansionMode::Sampled, 20, 1_000);
        let list = words(&["alpha", "beta", "gamma"]);

        let first: Vec<String> = exp.expand(&list, &mut ChaCha8Rng::seed_from_u64(42)).collect();
        let second: Vec<String> = exp.expand(&list, &mut ChaCha8Rng::seed_from_u64(42)).collect();
        let other: Vec<String> = exp.expand(&list, &mut ChaCha8Rng::seed_from_u64(43)).collect();

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn test_exhaustive_enumerates_in_odometer_order() {
        let exp = expander("Word.Word", ExpansionMode::Exhaustive, 0, 1_000);
        let list = words(&["a", "b"]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out: Vec<String> = exp.expand(&list, &mut rng).collect();
        assert_eq!(out, vec!["a.a", "a.b", "b.a", "b.b"]);
    }

    #[test]
    fn test_exhaustive_wraps_when_slots_exceed_words() {
        let exp = expander("WordWordWord", ExpansionMode::Exhaustive, 0, 1_000);
        let list = words(&["x"]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out: Vec<String> = exp.expand(&list, &mut rng).collect();
        assert_eq!(out, vec!["xxx"]);
    }

    #[test]
    fn test_exhaustive_capped_at_max_candidates() {
        let exp = expander("WordWordWord", ExpansionMode::Exhaustive, 0, 5);
        let list = words(&["a", "b", "c", "d"]);
        assert_eq!(exp.planned(list.len()), 5);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let out: Vec<String> = exp.expand(&list, &mut rng).collect();
        assert_eq!(out, vec!["aaa", "aab", "aac", "aad", "aba"]);
    }

    #[test]
    fn test_sampled_capped_at_max_candidates() {
        let exp = expander("Word", ExpansionMode::Sampled, 100, 10);
        assert_eq!(exp.planned(3), 10);
    }

    #[test]
    fn test_no_words_no_candidates() {
        let exp = expander("Word-Digit(2)", ExpansionMode::Sampled, 10, 100);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(exp.expand(&[], &mut rng).count(), 0);
    }

    #[test]
    fn test_wordless_template_ignores_word_list() {
        let exp = expander("PIN-Digit(4)", ExpansionMode::Exhaustive, 0, 100);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let out: Vec<String> = exp.expand(&[], &mut rng).collect();
        assert_eq!(out.len(), 1);
        assert!(Regex::new(r"^PIN-\d{4}$").unwrap().is_match(&out[0]));
    }
}
