use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use std::fs;

use crate::error::SourceError;
use crate::models::SourcePolicy;

/// Words merged from one or more source lists.
///
/// Invariant: no entry is empty and none has leading or trailing whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    pub words: Vec<String>,
    /// Sources that could not be read under [`SourcePolicy::Skip`], with the reason
    pub skipped: Vec<(Utf8PathBuf, String)>,
}

impl SourceList {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Drop repeated words, keeping the first occurrence of each.
    pub fn dedupe(&mut self) -> usize {
        let before = self.words.len();
        let unique: IndexSet<String> = self.words.drain(..).collect();
        self.words = unique.into_iter().collect();
        before - self.words.len()
    }
}

/// Loads source word lists in the order given.
pub struct WordSource;

impl WordSource {
    /// Load and merge every path.
    ///
    /// Files are decoded lossily, so invalid UTF-8 becomes U+FFFD instead of failing the
    /// load. With [`SourcePolicy::Abort`] the first unreadable path is returned as an error;
    /// with [`SourcePolicy::Skip`] it is recorded in [`SourceList::skipped`].
    pub fn load(paths: &[Utf8PathBuf], policy: SourcePolicy) -> Result<SourceList, SourceError> {
        let mut list = SourceList::default();

        for path in paths {
            match Self::read_words(path) {
                Ok(words) => {
                    tracing::debug!("Loaded {} words from {}", words.len(), path);
                    list.words.extend(words);
                }
                Err(e) if policy == SourcePolicy::Skip => {
                    tracing::warn!("Skipping unreadable source {}: {}", path, e);
                    let reason = match &e {
                        SourceError::Unreadable { source, .. } => source.to_string(),
                    };
                    list.skipped.push((path.clone(), reason));
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Loaded {} words from {} sources ({} skipped)",
            list.words.len(),
            paths.len() - list.skipped.len(),
            list.skipped.len()
        );

        Ok(list)
    }

    fn read_words(path: &Utf8Path) -> Result<Vec<String>, SourceError> {
        let bytes = fs::read(path).map_err(|source| SourceError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::parse_words(&String::from_utf8_lossy(&bytes)))
    }

    /// Split text into trimmed, non-empty lines.
    pub fn parse_words(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}
