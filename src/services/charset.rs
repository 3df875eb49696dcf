// Character classes and alphabets shared by the generator and fixer stages.

use crate::error::ConfigError;

/// Default digit alphabet used by `Digit(n)` tokens and the smart rule.
pub const DEFAULT_DIGITS: &str = "0-9";

/// Default symbol alphabet.
pub const DEFAULT_SYMBOLS: &str = "!@#$%^&*()-_+=";

/// Most words or drawn characters one candidate slot may ask for (`Digit(n)`,
/// `words_per_candidate`, appended characters, fixed-width numbers).
pub const MAX_RUN: usize = 256;

/// Visually confusable glyphs removed by ambiguous-character filtering.
pub const AMBIGUOUS: &[char] = &['0', 'O', '1', 'l', 'I'];

/// Class sizes used by the entropy heuristic.
pub const LOWER_POOL: u32 = 26;
pub const UPPER_POOL: u32 = 26;
pub const DIGIT_POOL: u32 = 10;
pub const SYMBOL_POOL: u32 = 32;

/// A symbol is anything printable that is neither alphanumeric nor whitespace.
pub fn is_symbol(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

pub fn count_digits(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

pub fn count_symbols(s: &str) -> usize {
    s.chars().filter(|&c| is_symbol(c)).count()
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Remove every ambiguous character from `s`.
pub fn strip_ambiguous(s: &str) -> String {
    s.chars().filter(|c| !AMBIGUOUS.contains(c)).collect()
}

/// Which character classes appear in a candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassPresence {
    pub lower: bool,
    pub upper: bool,
    pub digit: bool,
    pub symbol: bool,
}

impl ClassPresence {
    pub fn of(s: &str) -> Self {
        let mut presence = Self::default();
        for c in s.chars() {
            if c.is_lowercase() {
                presence.lower = true;
            } else if c.is_uppercase() {
                presence.upper = true;
            } else if c.is_ascii_digit() {
                presence.digit = true;
            } else if is_symbol(c) {
                presence.symbol = true;
            }
        }
        presence
    }

    /// Sum of the class sizes actually present.
    pub fn pool_size(&self) -> u32 {
        let mut pool = 0;
        if self.lower {
            pool += LOWER_POOL;
        }
        if self.upper {
            pool += UPPER_POOL;
        }
        if self.digit {
            pool += DIGIT_POOL;
        }
        if self.symbol {
            pool += SYMBOL_POOL;
        }
        pool
    }
}

/// Estimated strength in bits: `length * log2(pool)`.
pub fn entropy_bits(s: &str) -> f64 {
    let pool = ClassPresence::of(s).pool_size();
    if pool == 0 {
        return 0.0;
    }
    char_len(s) as f64 * f64::from(pool).log2()
}

/// Stable 64-bit FNV-1a hash.
///
/// Used wherever a choice has to be a pure function of the candidate text, so the
/// result does not depend on the standard library's hasher seed or version.
pub fn stable_hash(s: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    s.bytes()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// An ordered, non-empty set of characters to draw from.
///
/// Specs like `0-9` or `a-fA-F` expand ranges when both endpoints are ASCII
/// alphanumerics of the same class; any other `-` is taken literally, so the
/// default symbol set `!@#$%^&*()-_+=` keeps its dash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    pub fn parse(field: &'static str, spec: &str) -> Result<Self, ConfigError> {
        let input: Vec<char> = spec.chars().collect();
        let mut chars: Vec<char> = Vec::with_capacity(input.len());
        let mut i = 0;

        while i < input.len() {
            let c = input[i];
            if i + 2 < input.len() && input[i + 1] == '-' && same_range_class(c, input[i + 2]) {
                let end = input[i + 2];
                if end < c {
                    return Err(ConfigError::InvalidAlphabet {
                        field,
                        reason: format!("range {}-{} is reversed", c, end),
                    });
                }
                for code in (c as u32)..=(end as u32) {
                    if let Some(ch) = char::from_u32(code) {
                        push_unique(&mut chars, ch);
                    }
                }
                i += 3;
            } else {
                push_unique(&mut chars, c);
                i += 1;
            }
        }

        if chars.is_empty() {
            return Err(ConfigError::InvalidAlphabet {
                field,
                reason: "alphabet is empty".to_string(),
            });
        }

        Ok(Self { chars })
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at `index`, wrapping around the alphabet.
    pub fn nth_wrapping(&self, index: u64) -> char {
        self.chars[(index % self.chars.len() as u64) as usize]
    }

    /// Draw one character uniformly.
    pub fn pick<R: rand::Rng>(&self, rng: &mut R) -> char {
        self.chars[rng.random_range(0..self.chars.len())]
    }

    /// Draw `n` characters uniformly, independently.
    pub fn draw<R: rand::Rng>(&self, n: usize, rng: &mut R) -> String {
        (0..n).map(|_| self.pick(rng)).collect()
    }

    /// Build from explicit characters, or `None` if there are none.
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Option<Self> {
        let mut unique = Vec::new();
        for c in chars {
            push_unique(&mut unique, c);
        }
        if unique.is_empty() {
            None
        } else {
            Some(Self { chars: unique })
        }
    }

    /// Only the characters matching `keep`, or `None` if nothing would be left.
    pub fn retain(&self, keep: impl Fn(char) -> bool) -> Option<Self> {
        Self::from_chars(self.chars.iter().copied().filter(|&c| keep(c)))
    }

    /// A copy without ambiguous glyphs, or `None` if nothing would be left.
    pub fn without_ambiguous(&self) -> Option<Self> {
        self.retain(|c| !AMBIGUOUS.contains(&c))
    }
}

fn same_range_class(a: char, b: char) -> bool {
    (a.is_ascii_digit() && b.is_ascii_digit())
        || (a.is_ascii_lowercase() && b.is_ascii_lowercase())
        || (a.is_ascii_uppercase() && b.is_ascii_uppercase())
}

fn push_unique(chars: &mut Vec<char>, c: char) {
    if !chars.contains(&c) {
        chars.push(c);
    }
}
