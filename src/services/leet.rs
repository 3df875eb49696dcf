use rand::Rng;
use std::collections::HashSet;

use crate::models::LeetMode;
use crate::services::charset::AMBIGUOUS;

/// Substitution table, matched case-insensitively.
pub const LEET_TABLE: &[(char, char)] = &[
    ('a', '@'),
    ('e', '3'),
    ('i', '1'),
    ('l', '1'),
    ('o', '0'),
    ('s', '$'),
    ('t', '7'),
];

/// Above this many substitutable positions partial mode samples subsets instead of
/// enumerating all of them.
pub const EXHAUSTIVE_POSITION_LIMIT: usize = 8;

const EXHAUSTIVE_SUBSET_LIMIT: usize = (1 << EXHAUSTIVE_POSITION_LIMIT) - 1;

pub fn substitute(c: char) -> Option<char> {
    let lower = c.to_ascii_lowercase();
    LEET_TABLE
        .iter()
        .find(|(from, _)| *from == lower)
        .map(|(_, to)| *to)
}

/// Produces leetspeak variants of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeetTransformer {
    mode: LeetMode,
    max_variants: usize,
    avoid_ambiguous: bool,
}

impl LeetTransformer {
    pub fn new(mode: LeetMode, max_variants: usize) -> Self {
        Self {
            mode,
            max_variants: max_variants.max(1),
            avoid_ambiguous: false,
        }
    }

    /// When `avoid` is set, skip substitutions whose replacement is an ambiguous glyph
    /// (`i`, `l` and `o`).
    pub fn avoiding_ambiguous(mut self, avoid: bool) -> Self {
        self.avoid_ambiguous = avoid;
        self
    }

    fn replacement(&self, c: char) -> Option<char> {
        substitute(c).filter(|sub| !(self.avoid_ambiguous && AMBIGUOUS.contains(sub)))
    }

    /// Variants of `word` according to the mode.
    ///
    /// - `Off`: the word itself.
    /// - `Full`: one variant with every substitutable character replaced.
    /// - `Partial`: one variant per non-empty subset of substitutable positions. Up to
    ///   [`EXHAUSTIVE_POSITION_LIMIT`] positions the subsets are taken in ascending
    ///   bitmask order; past that, distinct subsets are sampled from `rng`. Both stop at
    ///   `max_variants`.
    ///
    /// A word with nothing to substitute comes back unchanged, exactly once.
    pub fn variants<R: Rng>(&self, word: &str, rng: &mut R) -> Vec<String> {
        if self.mode == LeetMode::Off {
            return vec![word.to_string()];
        }

        let chars: Vec<char> = word.chars().collect();
        let positions: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|(_, c)| self.replacement(**c).is_some())
            .map(|(i, _)| i)
            .collect();

        if positions.is_empty() {
            return vec![word.to_string()];
        }

        match self.mode {
            LeetMode::Off => unreachable!("handled above"),
            LeetMode::Full => vec![self.apply_mask(&chars, &positions, u64::MAX)],
            LeetMode::Partial if positions.len() <= EXHAUSTIVE_POSITION_LIMIT => {
                let subsets = (1u64 << positions.len()) - 1;
                (1..=subsets)
                    .take(self.max_variants)
                    .map(|mask| self.apply_mask(&chars, &positions, mask))
                    .collect()
            }
            LeetMode::Partial => self.sample_subsets(&chars, &positions, rng),
        }
    }

    fn sample_subsets<R: Rng>(&self, chars: &[char], positions: &[usize], rng: &mut R) -> Vec<String> {
        // Positions beyond 64 are never substituted; a mask only has 64 bits.
        let width = positions.len().min(64);
        let full = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };

        // No more distinct non-empty subsets exist than `full` itself
        let wanted = self.max_variants.min(usize::try_from(full).unwrap_or(usize::MAX));

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(wanted.min(EXHAUSTIVE_SUBSET_LIMIT));
        let mut attempts = 0usize;

        while out.len() < wanted && attempts < wanted.saturating_mul(8) {
            attempts += 1;
            let mask = rng.random::<u64>() & full;
            if mask != 0 && seen.insert(mask) {
                out.push(self.apply_mask(chars, positions, mask));
            }
        }
        out
    }

    fn apply_mask(&self, chars: &[char], positions: &[usize], mask: u64) -> String {
        let mut out: Vec<char> = chars.to_vec();
        for (bit, &pos) in positions.iter().enumerate().take(64) {
            if mask & (1u64 << bit) != 0 {
                if let Some(sub) = self.replacement(chars[pos]) {
                    out[pos] = sub;
                }
            }
        }
        out.into_iter().collect()
    }
}
