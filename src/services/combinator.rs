use rand::Rng;
use rand::seq::SliceRandom;

use crate::models::{BetweenWords, CaseMode, NumberMode, NumberPlacement};
use crate::services::charset::Alphabet;

/// Draws beyond this many attempts give up on `unique_words` and allow a repeat.
const UNIQUE_DRAW_ATTEMPTS: usize = 16;

/// Builds candidates by combining source words.
///
/// Per candidate: draw `words_per_candidate` words, apply the case mode, optionally
/// shuffle the segments and join them. Between two words goes a separator (or nothing
/// when there are none), a symbol or a number, per `between`. Then drawn digits and
/// symbols are appended, and a number is put at the start or the end per
/// `number_placement`.
#[derive(Debug, Clone)]
pub struct Combinator {
    pub words_per_candidate: usize,
    pub unique_words: bool,
    pub case_mode: CaseMode,
    pub shuffle: bool,
    pub separators: Option<Alphabet>,
    pub append_digits: usize,
    pub append_symbols: usize,
    pub between: BetweenWords,
    pub number: NumberMode,
    pub number_placement: NumberPlacement,
    pub digits: Alphabet,
    pub symbols: Alphabet,
}

impl Combinator {
    /// Assemble one candidate, or `None` when there are no words to draw from.
    pub fn assemble<R: Rng>(&self, words: &[String], rng: &mut R) -> Option<String> {
        if words.is_empty() {
            return None;
        }

        let mut picked: Vec<usize> = Vec::with_capacity(self.words_per_candidate);
        for _ in 0..self.words_per_candidate {
            let mut index = rng.random_range(0..words.len());
            if self.unique_words {
                let mut attempts = 0;
                while picked.contains(&index) && attempts < UNIQUE_DRAW_ATTEMPTS {
                    index = rng.random_range(0..words.len());
                    attempts += 1;
                }
            }
            picked.push(index);
        }

        let mut segments: Vec<String> = picked
            .into_iter()
            .map(|i| apply_case(&words[i], self.case_mode, rng))
            .collect();

        if self.shuffle {
            segments.shuffle(rng);
        }

        Some(self.join(segments, rng))
    }

    /// Join segments with the configured in-between text, then add the appended
    /// characters and the placed number.
    pub fn join<R: Rng>(&self, segments: Vec<String>, rng: &mut R) -> String {
        let mut out = String::new();
        if self.number_placement == NumberPlacement::Start {
            out.push_str(&self.draw_number(rng));
        }

        for (i, segment) in segments.into_iter().enumerate() {
            if i > 0 {
                match self.between {
                    BetweenWords::Separator => {
                        if let Some(separators) = &self.separators {
                            out.push(separators.pick(rng));
                        }
                    }
                    BetweenWords::Symbol => out.push(self.symbols.pick(rng)),
                    BetweenWords::Number => out.push_str(&self.draw_number(rng)),
                }
            }
            out.push_str(&segment);
        }

        out.push_str(&self.digits.draw(self.append_digits, rng));
        out.push_str(&self.symbols.draw(self.append_symbols, rng));
        if self.number_placement == NumberPlacement::End {
            out.push_str(&self.draw_number(rng));
        }
        out
    }

    pub fn draw_number<R: Rng>(&self, rng: &mut R) -> String {
        match self.number {
            NumberMode::Fixed { len } => self.digits.draw(len, rng),
            NumberMode::Range { max } => rng.random_range(0..=max).to_string(),
        }
    }
}

/// Apply a case transformation to one word.
pub fn apply_case<R: Rng>(word: &str, mode: CaseMode, rng: &mut R) -> String {
    match mode {
        CaseMode::None => word.to_string(),
        CaseMode::Lower => word.to_lowercase(),
        CaseMode::Upper => word.to_uppercase(),
        CaseMode::Title => {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
                None => String::new(),
            }
        }
        CaseMode::Random => word
            .chars()
            .map(|c| {
                if rng.random_bool(0.5) {
                    c.to_uppercase().collect::<String>()
                } else {
                    c.to_lowercase().collect::<String>()
                }
            })
            .collect(),
    }
}

/// Literal text put around every candidate after all other transformations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affixes {
    pub prefix: String,
    pub suffix: String,
}

impl Affixes {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }

    pub fn apply(&self, candidate: String) -> String {
        if self.is_empty() {
            return candidate;
        }
        let mut out = String::with_capacity(self.prefix.len() + candidate.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(&candidate);
        out.push_str(&self.suffix);
        out
    }
}
