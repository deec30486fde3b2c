//! Per-subtype selection weights.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CnxError, Result};

pub const DEFAULT_SUBTYPE_WEIGHT: i64 = 1;
/// Effective weights are clamped here so that summing one weight per
/// eligible category cannot overflow `u64`.
pub const MAX_SUBTYPE_WEIGHT: u64 = u32::MAX as u64;

/// `main_type -> subtype -> weight`. Unlisted subtypes weigh
/// [`DEFAULT_SUBTYPE_WEIGHT`]; a weight of zero or less removes the subtype
/// from selection entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtypeWeights(BTreeMap<String, BTreeMap<String, i64>>);

impl Default for SubtypeWeights {
    fn default() -> Self {
        Self::uniform()
            .with("form", "collocations", 4)
            .with("form", "anagrams", 1)
    }
}

impl SubtypeWeights {
    /// Every subtype at the default weight.
    pub fn uniform() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, main_type: &str, subtype: &str, weight: i64) -> Self {
        self.set(main_type, subtype, weight);
        self
    }

    pub fn set(&mut self, main_type: &str, subtype: &str, weight: i64) {
        self.0
            .entry(main_type.to_string())
            .or_default()
            .insert(subtype.to_string(), weight);
    }

    /// Effective weight, at most [`MAX_SUBTYPE_WEIGHT`], or `None` when the
    /// subtype is excluded.
    pub fn weight(&self, main_type: &str, subtype: &str) -> Option<u64> {
        let raw = self
            .0
            .get(main_type)
            .and_then(|subtypes| subtypes.get(subtype))
            .copied()
            .unwrap_or(DEFAULT_SUBTYPE_WEIGHT);
        u64::try_from(raw)
            .ok()
            .filter(|w| *w > 0)
            .map(|w| w.min(MAX_SUBTYPE_WEIGHT))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let weights: Self = serde_json::from_str(text)?;
        Ok(weights)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CnxError::invalid_config(format!("cannot read weight table {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }
}
