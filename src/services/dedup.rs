use indexmap::IndexSet;

/// Drops repeated candidates, keeping the first occurrence.
///
/// Owned by a single job and passed explicitly through its pipeline. The seen-set is
/// the biggest memory consumer of a large run; with a `ceiling` it stops growing once it
/// holds that many entries, after which unseen candidates pass through untracked.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: IndexSet<String>,
    ceiling: Option<usize>,
    saturated: bool,
    duplicates: u64,
}

impl Deduplicator {
    pub fn new(ceiling: Option<usize>) -> Self {
        Self {
            seen: IndexSet::new(),
            ceiling,
            saturated: false,
            duplicates: 0,
        }
    }

    /// Whether `candidate` should be kept. Records it as seen when there is room.
    pub fn admit(&mut self, candidate: &str) -> bool {
        if self.seen.contains(candidate) {
            self.duplicates += 1;
            return false;
        }

        match self.ceiling {
            Some(ceiling) if self.seen.len() >= ceiling => {
                if !self.saturated {
                    self.saturated = true;
                    tracing::warn!(
                        "Deduplication set reached its ceiling of {} entries; later duplicates may pass",
                        ceiling
                    );
                }
            }
            _ => {
                self.seen.insert(candidate.to_string());
            }
        }
        true
    }

    /// Keep the first occurrence of every candidate, in input order.
    pub fn dedupe(&mut self, candidates: Vec<String>) -> Vec<String> {
        candidates
            .into_iter()
            .filter(|candidate| self.admit(candidate))
            .collect()
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }
}
