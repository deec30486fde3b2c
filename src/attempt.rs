//! Puzzle groups, finished puzzles and the per-attempt exclusion state.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::corpus::GROUP_SIZE;

/// One category realised as a puzzle row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub category: String,
    pub main_type: String,
    pub subtype: String,
    pub words: [String; GROUP_SIZE],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleKind {
    FalseGroup,
    IntentionalOverlap,
}

impl PuzzleKind {
    /// Number of groups in a complete puzzle of this kind.
    pub fn full_size(self) -> usize {
        match self {
            PuzzleKind::FalseGroup => GROUP_SIZE + 1,
            PuzzleKind::IntentionalOverlap => GROUP_SIZE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PuzzleKind::FalseGroup => "false_group",
            PuzzleKind::IntentionalOverlap => "intentional_overlap",
        }
    }
}

impl fmt::Display for PuzzleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An assembled puzzle. For false groups `groups[0]` is the seed and
/// `groups[i + 1]` is anchored on the seed's `i`-th word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub kind: PuzzleKind,
    pub groups: Vec<Group>,
}

impl Puzzle {
    pub fn is_complete(&self) -> bool {
        self.groups.len() == self.kind.full_size()
    }

    /// Content hash over kind, category names and words, in group order.
    pub fn puzzle_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        for group in &self.groups {
            hasher.update(b"|");
            hasher.update(group.category.as_bytes());
            hasher.update(b":");
            hasher.update(group.words.join(",").as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Exclusion state owned by a single assembly attempt. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct PuzzleAttempt {
    used_words: BTreeSet<String>,
    used_categories: BTreeSet<String>,
    groups: Vec<Group>,
}

impl PuzzleAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn used_words(&self) -> &BTreeSet<String> {
        &self.used_words
    }

    pub fn used_categories(&self) -> &BTreeSet<String> {
        &self.used_categories
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.used_categories.contains(category)
    }

    /// Record a group: its name and words join the exclusion sets.
    pub fn accept(&mut self, group: Group) {
        self.used_categories.insert(group.category.clone());
        self.used_words.extend(group.words.iter().cloned());
        self.groups.push(group);
    }

    pub fn into_puzzle(self, kind: PuzzleKind) -> Puzzle {
        Puzzle {
            kind,
            groups: self.groups,
        }
    }
}

#[cfg(test)]
pub(crate) fn group(category: &str, main_type: &str, subtype: &str, words: [&str; GROUP_SIZE]) -> Group {
    Group {
        category: category.to_string(),
        main_type: main_type.to_string(),
        subtype: subtype.to_string(),
        words: words.map(str::to_string),
    }
}
