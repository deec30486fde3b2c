//! Structural checks of an assembled puzzle against the corpus it came from.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::attempt::{Puzzle, PuzzleKind};
use crate::corpus::{Corpus, GROUP_SIZE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("category {category:?} not found under {main_type}/{subtype}")]
    UnknownCategory {
        category: String,
        main_type: String,
        subtype: String,
    },

    #[error("word {word:?} does not belong to category {category:?}")]
    ForeignWord { category: String, word: String },

    #[error("category {category:?} repeats a word")]
    RepeatedWordInGroup { category: String },

    #[error("category {0:?} appears more than once")]
    DuplicateCategory(String),

    #[error("word {word:?} appears in {first:?} and {second:?}")]
    SharedWord {
        word: String,
        first: String,
        second: String,
    },

    #[error("expected {expected} groups, found {found}")]
    GroupCount { expected: usize, found: usize },

    #[error("group {index} should be anchored on {anchor:?}")]
    MissingAnchor { index: usize, anchor: String },

    #[error("group {index} shares the main type {main_type:?} of the seed")]
    SameTypeAnchor { index: usize, main_type: String },
}

/// Check a complete puzzle.
///
/// Every group must be a real corpus category holding its four distinct
/// words, and category names must be unique. Words are unique across groups,
/// except that a false group's seed word `i` is, by construction, the first
/// word of group `i + 1`, whose main type must differ from the seed's.
pub fn validate_puzzle(corpus: &Corpus, puzzle: &Puzzle) -> Result<(), Violation> {
    let expected = puzzle.kind.full_size();
    if puzzle.groups.len() != expected {
        return Err(Violation::GroupCount {
            expected,
            found: puzzle.groups.len(),
        });
    }

    let mut names = BTreeSet::new();
    for group in &puzzle.groups {
        let words = corpus
            .words_of(&group.main_type, &group.subtype, &group.category)
            .ok_or_else(|| Violation::UnknownCategory {
                category: group.category.clone(),
                main_type: group.main_type.clone(),
                subtype: group.subtype.clone(),
            })?;
        if let Some(word) = group.words.iter().find(|w| !words.contains(*w)) {
            return Err(Violation::ForeignWord {
                category: group.category.clone(),
                word: word.clone(),
            });
        }
        let distinct: BTreeSet<&String> = group.words.iter().collect();
        if distinct.len() != GROUP_SIZE {
            return Err(Violation::RepeatedWordInGroup {
                category: group.category.clone(),
            });
        }
        if !names.insert(group.category.as_str()) {
            return Err(Violation::DuplicateCategory(group.category.clone()));
        }
    }

    // a false group's anchors are checked here, then skipped as word owners
    let false_group = puzzle.kind == PuzzleKind::FalseGroup;
    if false_group {
        let seed = &puzzle.groups[0];
        for (i, group) in puzzle.groups[1..].iter().enumerate() {
            if group.words[0] != seed.words[i] {
                return Err(Violation::MissingAnchor {
                    index: i + 2,
                    anchor: seed.words[i].clone(),
                });
            }
            if group.main_type == seed.main_type {
                return Err(Violation::SameTypeAnchor {
                    index: i + 2,
                    main_type: group.main_type.clone(),
                });
            }
        }
    }

    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for (gi, group) in puzzle.groups.iter().enumerate() {
        for (wi, word) in group.words.iter().enumerate() {
            if false_group && gi > 0 && wi == 0 {
                continue;
            }
            if let Some(first) = seen.insert(word.as_str(), group.category.as_str()) {
                return Err(Violation::SharedWord {
                    word: word.clone(),
                    first: first.to_string(),
                    second: group.category.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::{group, Group};
    use crate::corpus::Fact;

    fn corpus() -> Corpus {
        let mut facts = Vec::new();
        for (mt, st, name, words) in [
            ("meaning", "syn", "M1", vec!["a1", "a2", "a3", "a4"]),
            ("meaning", "syn", "M2", vec!["b1", "b2", "b3", "b4", "a1"]),
            ("form", "col", "F1", vec!["c1", "c2", "c3", "c4"]),
            ("form", "col", "F2", vec!["d1", "d2", "d3", "d4"]),
        ] {
            for w in words {
                facts.push(Fact::new(mt, st, name, w));
            }
        }
        Corpus::from_facts(facts)
    }

    fn overlap(groups: Vec<Group>) -> Puzzle {
        Puzzle {
            kind: PuzzleKind::IntentionalOverlap,
            groups,
        }
    }

    #[test]
    fn accepts_a_clean_chain() {
        let puzzle = overlap(vec![
            group("M1", "meaning", "syn", ["a1", "a2", "a3", "a4"]),
            group("F1", "form", "col", ["c1", "c2", "c3", "c4"]),
            group("M2", "meaning", "syn", ["b1", "b2", "b3", "b4"]),
            group("F2", "form", "col", ["d1", "d2", "d3", "d4"]),
        ]);
        assert_eq!(validate_puzzle(&corpus(), &puzzle), Ok(()));
    }

    #[test]
    fn flags_shared_words_and_foreign_words() {
        let shared = overlap(vec![
            group("M1", "meaning", "syn", ["a1", "a2", "a3", "a4"]),
            group("F1", "form", "col", ["c1", "c2", "c3", "c4"]),
            group("M2", "meaning", "syn", ["a1", "b2", "b3", "b4"]),
            group("F2", "form", "col", ["d1", "d2", "d3", "d4"]),
        ]);
        assert!(matches!(
            validate_puzzle(&corpus(), &shared),
            Err(Violation::SharedWord { .. })
        ));

        let foreign = overlap(vec![
            group("M1", "meaning", "syn", ["a1", "a2", "a3", "zz"]),
            group("F1", "form", "col", ["c1", "c2", "c3", "c4"]),
            group("M2", "meaning", "syn", ["b1", "b2", "b3", "b4"]),
            group("F2", "form", "col", ["d1", "d2", "d3", "d4"]),
        ]);
        assert!(matches!(
            validate_puzzle(&corpus(), &foreign),
            Err(Violation::ForeignWord { .. })
        ));
    }

    #[test]
    fn flags_wrong_group_count_and_unknown_category() {
        let short = overlap(vec![group("M1", "meaning", "syn", ["a1", "a2", "a3", "a4"])]);
        assert_eq!(
            validate_puzzle(&corpus(), &short),
            Err(Violation::GroupCount { expected: 4, found: 1 })
        );

        let unknown = overlap(vec![
            group("M1", "form", "syn", ["a1", "a2", "a3", "a4"]),
            group("F1", "form", "col", ["c1", "c2", "c3", "c4"]),
            group("M2", "meaning", "syn", ["b1", "b2", "b3", "b4"]),
            group("F2", "form", "col", ["d1", "d2", "d3", "d4"]),
        ]);
        assert!(matches!(
            validate_puzzle(&corpus(), &unknown),
            Err(Violation::UnknownCategory { .. })
        ));
    }

    #[test]
    fn false_group_anchor_must_lead() {
        let corpus = Corpus::from_facts(
            [
                ("meaning", "syn", "SEED", vec!["w1", "w2", "w3", "w4"]),
                ("form", "col", "G1", vec!["w1", "x1", "x2", "x3"]),
                ("form", "col", "G2", vec!["w2", "y1", "y2", "y3"]),
                ("form", "col", "G3", vec!["w3", "z1", "z2", "z3"]),
                ("form", "col", "G4", vec!["w4", "v1", "v2", "v3"]),
            ]
            .into_iter()
            .flat_map(|(mt, st, name, words)| words.into_iter().map(move |w| Fact::new(mt, st, name, w))),
        );
        let mut puzzle = Puzzle {
            kind: PuzzleKind::FalseGroup,
            groups: vec![
                group("SEED", "meaning", "syn", ["w1", "w2", "w3", "w4"]),
                group("G1", "form", "col", ["w1", "x1", "x2", "x3"]),
                group("G2", "form", "col", ["w2", "y1", "y2", "y3"]),
                group("G3", "form", "col", ["w3", "z1", "z2", "z3"]),
                group("G4", "form", "col", ["w4", "v1", "v2", "v3"]),
            ],
        };
        assert_eq!(validate_puzzle(&corpus, &puzzle), Ok(()));

        puzzle.groups.swap(1, 2);
        assert!(matches!(
            validate_puzzle(&corpus, &puzzle),
            Err(Violation::MissingAnchor { index: 2, .. })
        ));
    }
}
