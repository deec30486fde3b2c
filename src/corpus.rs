//! Corpus indexing: facts folded into a category index and its inverse word index.
//!
//! Both maps are ordered so that any seeded walk over them is reproducible.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Words per puzzle group.
pub const GROUP_SIZE: usize = 4;

/// `main_type -> subtype -> category -> words`
pub type CategoryIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeSet<String>>>>;
/// `main_type -> subtype -> word -> categories`
pub type WordIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeSet<String>>>>;

/// One corpus row: `category` contains `word`, filed under `main_type/subtype`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub main_type: String,
    pub subtype: String,
    pub category: String,
    pub word: String,
}

impl Fact {
    pub fn new(
        main_type: impl Into<String>,
        subtype: impl Into<String>,
        category: impl Into<String>,
        word: impl Into<String>,
    ) -> Self {
        Self {
            main_type: main_type.into(),
            subtype: subtype.into(),
            category: category.into(),
            word: word.into(),
        }
    }
}

/// Read-only lookup structures built once per process.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    by_category: CategoryIndex,
    by_word: WordIndex,
}

impl Corpus {
    /// Fold facts into both indices. Facts with any field empty after trimming
    /// are skipped; duplicates collapse.
    pub fn from_facts<I>(facts: I) -> Self
    where
        I: IntoIterator<Item = Fact>,
    {
        let mut corpus = Corpus::default();
        for fact in facts {
            corpus.insert(&fact);
        }
        corpus
    }

    /// Returns false when the fact was rejected as malformed.
    pub fn insert(&mut self, fact: &Fact) -> bool {
        let main_type = fact.main_type.trim();
        let subtype = fact.subtype.trim();
        let category = fact.category.trim();
        let word = fact.word.trim();
        if main_type.is_empty() || subtype.is_empty() || category.is_empty() || word.is_empty() {
            return false;
        }

        self.by_category
            .entry(main_type.to_string())
            .or_default()
            .entry(subtype.to_string())
            .or_default()
            .entry(category.to_string())
            .or_default()
            .insert(word.to_string());
        self.by_word
            .entry(main_type.to_string())
            .or_default()
            .entry(subtype.to_string())
            .or_default()
            .entry(word.to_string())
            .or_default()
            .insert(category.to_string());
        true
    }

    pub fn by_category(&self) -> &CategoryIndex {
        &self.by_category
    }

    pub fn by_word(&self) -> &WordIndex {
        &self.by_word
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    pub fn main_types(&self) -> impl Iterator<Item = &str> {
        self.by_category.keys().map(String::as_str)
    }

    /// Subtypes of `main_type` with their `category -> words` maps.
    pub fn subtypes(
        &self,
        main_type: &str,
    ) -> impl Iterator<Item = (&str, &BTreeMap<String, BTreeSet<String>>)> {
        self.by_category
            .get(main_type)
            .into_iter()
            .flat_map(|subtypes| subtypes.iter().map(|(st, cats)| (st.as_str(), cats)))
    }

    pub fn words_of(&self, main_type: &str, subtype: &str, category: &str) -> Option<&BTreeSet<String>> {
        self.by_category.get(main_type)?.get(subtype)?.get(category)
    }

    pub fn categories_of(&self, main_type: &str, subtype: &str, word: &str) -> Option<&BTreeSet<String>> {
        self.by_word.get(main_type)?.get(subtype)?.get(word)
    }

    /// Every fact, in index order.
    pub fn facts(&self) -> impl Iterator<Item = Fact> + '_ {
        self.by_category.iter().flat_map(|(mt, subtypes)| {
            subtypes.iter().flat_map(move |(st, cats)| {
                cats.iter().flat_map(move |(cat, words)| {
                    words
                        .iter()
                        .map(move |w| Fact::new(mt.as_str(), st.as_str(), cat.as_str(), w.as_str()))
                })
            })
        })
    }

    pub fn stats(&self) -> CorpusStats {
        let mut stats = CorpusStats {
            main_types: self.by_category.len(),
            ..CorpusStats::default()
        };
        for subtypes in self.by_category.values() {
            stats.subtypes += subtypes.len();
            for cats in subtypes.values() {
                stats.categories += cats.len();
                stats.facts += cats.values().map(BTreeSet::len).sum::<usize>();
            }
        }
        stats
    }

    /// Stable sha256 over the sorted fact set, used to tag stored puzzles with
    /// the corpus they came from.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for fact in self.facts() {
            for field in [&fact.main_type, &fact.subtype, &fact.category, &fact.word] {
                hasher.update(field.as_bytes());
                hasher.update([0u8]);
            }
            hasher.update([b'\n']);
        }
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub main_types: usize,
    pub subtypes: usize,
    pub categories: usize,
    pub facts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Corpus {
        Corpus::from_facts(vec![
            Fact::new("meaning", "synonyms", "FRUITS", "APPLE"),
            Fact::new("meaning", "synonyms", "FRUITS", "PEAR"),
            Fact::new("meaning", "synonyms", "FRUITS", "APPLE"),
            Fact::new("form", "anagrams", "ANAGRAMS OF REAP", "PEAR"),
            Fact::new("form", "anagrams", "ANAGRAMS OF REAP", " RAPE "),
        ])
    }

    #[test]
    fn duplicates_collapse() {
        let corpus = sample();
        let words = corpus.words_of("meaning", "synonyms", "FRUITS").unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(corpus.stats().facts, 4);
    }

    #[test]
    fn word_index_is_inverse() {
        let corpus = sample();
        let cats = corpus.categories_of("form", "anagrams", "PEAR").unwrap();
        assert!(cats.contains("ANAGRAMS OF REAP"));
        // trimmed on the way in
        assert!(corpus.categories_of("form", "anagrams", "RAPE").is_some());
        // partitions stay separate
        assert!(corpus.categories_of("meaning", "anagrams", "PEAR").is_none());
    }

    #[test]
    fn blank_fields_are_skipped() {
        let corpus = Corpus::from_facts(vec![
            Fact::new("meaning", "synonyms", "  ", "APPLE"),
            Fact::new("meaning", "synonyms", "FRUITS", ""),
        ]);
        assert!(corpus.is_empty());
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let mut facts: Vec<Fact> = sample().facts().collect();
        let forward = Corpus::from_facts(facts.clone()).fingerprint();
        facts.reverse();
        let backward = Corpus::from_facts(facts).fingerprint();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 64);
    }
}
