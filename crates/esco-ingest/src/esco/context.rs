//! Ancestor context carried down each branch of the crawl
//!
//! A context is a value: descending returns a new context and leaves the
//! parent's untouched, so sibling branches can never see each other's
//! ancestors.

use crate::config::MAX_ANCESTOR_LEVELS;
use crate::esco::models::EmbeddedAncestor;

/// Taxonomy level of a concept URI: the number of `.` in its last path segment
///
/// `.../skill/S1` is level 0, `.../skill/S1.2` level 1, `.../skill/S1.2.3` level 2.
pub fn level_of(uri: &str) -> usize {
    let trimmed = uri.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    segment.matches('.').count()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ancestor {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AncestorContext {
    levels: [Option<Ancestor>; MAX_ANCESTOR_LEVELS],
}

impl AncestorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a child at `level`
    ///
    /// Entries deeper than `level` are dropped. Levels beyond the record
    /// schema leave the context unchanged.
    pub fn descend(&self, level: usize, uri: &str, title: &str) -> AncestorContext {
        let mut next = self.clone();

        if level >= MAX_ANCESTOR_LEVELS {
            return next;
        }

        next.levels[level] = Some(Ancestor {
            uri: uri.to_string(),
            title: title.to_string(),
        });
        for deeper in next.levels.iter_mut().skip(level + 1) {
            *deeper = None;
        }

        next
    }

    pub fn get(&self, level: usize) -> Option<&Ancestor> {
        self.levels.get(level).and_then(Option::as_ref)
    }

    /// Number of populated levels
    pub fn len(&self) -> usize {
        self.levels.iter().filter(|level| level.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Context built from a skill's `_embedded.ancestors`
    ///
    /// Ancestors whose URI is the crawl root or the skill itself are excluded.
    /// When two ancestors share a level the first one listed wins.
    pub fn from_embedded(ancestors: &[EmbeddedAncestor], root_uri: &str, own_uri: &str) -> Self {
        let mut context = AncestorContext::new();

        for ancestor in ancestors {
            let Some(uri) = ancestor.uri() else {
                continue;
            };

            if uri == root_uri || uri == own_uri {
                continue;
            }

            let level = level_of(uri);
            if level < MAX_ANCESTOR_LEVELS && context.levels[level].is_none() {
                context.levels[level] = Some(Ancestor {
                    uri: uri.to_string(),
                    title: ancestor.title().unwrap_or_default().to_string(),
                });
            }
        }

        context
    }
}
