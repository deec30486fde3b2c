//! Difficulty ranking of finished groups by word-embedding coherence.
//!
//! The embedding source is external; anything that maps a word to a vector
//! (with a fallback for unknown words) can drive the ranking.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CnxError, Result};

pub trait EmbeddingOracle {
    /// Vector for `word`, or the oracle's fallback vector when unknown.
    fn embed(&self, word: &str) -> &[f32];
}

/// In-memory word vectors, looked up case-insensitively.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingFile {
    dim: usize,
    #[serde(default)]
    fallback: Option<Vec<f32>>,
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingTable {
    /// Every vector, the fallback included, must have the same length.
    pub fn new(vectors: HashMap<String, Vec<f32>>, fallback: Vec<f32>) -> Result<Self> {
        let dim = fallback.len();
        if let Some((word, v)) = vectors.iter().find(|(_, v)| v.len() != dim) {
            return Err(CnxError::invalid_config(format!(
                "embedding for {word:?} has {} dimensions, expected {dim}",
                v.len()
            )));
        }
        let vectors = vectors
            .into_iter()
            .map(|(word, v)| (word.to_lowercase(), v))
            .collect();
        Ok(Self { vectors, fallback })
    }

    /// `{"dim": N, "fallback": [...], "vectors": {"word": [...]}}`; the
    /// fallback defaults to the zero vector.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: EmbeddingFile = serde_json::from_str(text)?;
        let fallback = file.fallback.unwrap_or_else(|| vec![0.0; file.dim]);
        Self::new(file.vectors, fallback)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl EmbeddingOracle for EmbeddingTable {
    fn embed(&self, word: &str) -> &[f32] {
        self.vectors
            .get(&word.to_lowercase())
            .map_or(self.fallback.as_slice(), Vec::as_slice)
    }
}

/// Cosine similarity; zero when either vector has no length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Mean cosine similarity over all unordered pairs. Fewer than two words score 0.
pub fn average_pairwise_similarity<S, O>(words: &[S], oracle: &O) -> f32
where
    S: AsRef<str>,
    O: EmbeddingOracle + ?Sized,
{
    let vectors: Vec<&[f32]> = words.iter().map(|w| oracle.embed(w.as_ref())).collect();
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            total += cosine_similarity(vectors[i], vectors[j]);
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f32
    }
}

/// Exhaustively score every `k`-subset of `candidates` (in order) and return
/// the best one with its score. Ties keep the first subset found.
pub fn best_subset<T, F>(candidates: &[T], k: usize, mut score: F) -> Option<(Vec<T>, f32)>
where
    T: Clone,
    F: FnMut(&[T]) -> f32,
{
    if k == 0 || k > candidates.len() {
        return None;
    }
    let n = candidates.len();
    let mut idx: Vec<usize> = (0..k).collect();
    let mut best: Option<(Vec<T>, f32)> = None;
    let mut subset: Vec<T> = Vec::with_capacity(k);

    loop {
        subset.clear();
        subset.extend(idx.iter().map(|&i| candidates[i].clone()));
        let s = score(&subset);
        if best.as_ref().map_or(true, |(_, b)| s > *b) {
            best = Some((subset.clone(), s));
        }

        // advance to the next combination in lexicographic order
        let Some(pos) = (0..k).rev().find(|&i| idx[i] < n - k + i) else {
            break;
        };
        idx[pos] += 1;
        for i in (pos + 1)..k {
            idx[i] = idx[i - 1] + 1;
        }
    }
    best
}

/// A group placed by difficulty: rank 1 is the most coherent, easiest group.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedGroup {
    pub rank: usize,
    pub category: String,
    pub words: Vec<String>,
    pub similarity: f32,
}

/// Order groups from most to least coherent. Equal scores keep input order.
pub fn rank_groups<O>(groups: &[(String, Vec<String>)], oracle: &O) -> Vec<RankedGroup>
where
    O: EmbeddingOracle + ?Sized,
{
    let mut scored: Vec<(usize, f32)> = groups
        .iter()
        .enumerate()
        .map(|(i, (_, words))| (i, average_pairwise_similarity(words, oracle)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored
        .into_iter()
        .enumerate()
        .map(|(rank, (i, similarity))| RankedGroup {
            rank: rank + 1,
            category: groups[i].0.clone(),
            words: groups[i].1.clone(),
            similarity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EmbeddingTable {
        let vectors = HashMap::from([
            ("apple".to_string(), vec![1.0, 0.0, 0.0]),
            ("pear".to_string(), vec![0.9, 0.1, 0.0]),
            ("plum".to_string(), vec![0.95, 0.05, 0.0]),
            ("anvil".to_string(), vec![0.0, 0.0, 1.0]),
            ("hammer".to_string(), vec![0.0, 0.2, 0.9]),
        ]);
        EmbeddingTable::new(vectors, vec![0.0, 0.0, 0.0]).unwrap()
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn unknown_words_use_fallback_and_case_is_ignored() {
        let t = table();
        assert_eq!(t.embed("APPLE"), &[1.0, 0.0, 0.0]);
        assert_eq!(t.embed("zebra"), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn best_subset_picks_the_tight_cluster() {
        let t = table();
        let words = ["apple", "anvil", "pear", "hammer", "plum"];
        let (best, score) =
            best_subset(&words, 3, |subset| average_pairwise_similarity(subset, &t)).unwrap();
        assert_eq!(best, ["apple", "pear", "plum"]);
        assert!(score > 0.9);
        assert!(best_subset(&words, 6, |_| 0.0).is_none());
    }

    #[test]
    fn best_subset_visits_every_combination() {
        let items = [1, 2, 3, 4, 5];
        let mut seen = 0;
        best_subset(&items, 2, |_| {
            seen += 1;
            0.0
        });
        assert_eq!(seen, 10);
    }

    #[test]
    fn ranks_coherent_groups_first() {
        let t = table();
        let groups = vec![
            ("TOOLS".to_string(), vec!["anvil".to_string(), "apple".to_string()]),
            ("FRUITS".to_string(), vec!["apple".to_string(), "pear".to_string()]),
        ];
        let ranked = rank_groups(&groups, &t);
        assert_eq!(ranked[0].category, "FRUITS");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let text = r#"{"dim": 2, "vectors": {"a": [1.0, 0.0], "b": [1.0]}}"#;
        assert!(EmbeddingTable::from_json(text).is_err());
        let ok = EmbeddingTable::from_json(r#"{"dim": 2, "vectors": {"a": [1.0, 0.0]}}"#).unwrap();
        assert_eq!(ok.embed("missing"), &[0.0, 0.0]);
    }
}
