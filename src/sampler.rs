//! Category samplers.
//!
//! Both samplers are pure functions of the corpus, the caller's exclusion sets
//! and the injected random source. "Nothing eligible" is `None`, never an error.

use std::collections::BTreeSet;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attempt::Group;
use crate::corpus::{Corpus, GROUP_SIZE};
use crate::weights::SubtypeWeights;

/// How an anchored pick treats its anchor word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPolicy {
    /// The anchor is the first word of the result, plus three unused words.
    ForceAnchor,
    /// Four unused words of a category that contains the anchor; the anchor
    /// itself is not forced into the result.
    Free,
}

/// Draw one item by weight. `None` for an empty or all-zero list.
fn weighted_choice<'a, T, R>(items: &'a [(T, u64)], rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    let dist = WeightedIndex::new(items.iter().map(|(_, w)| *w)).ok()?;
    items.get(dist.sample(rng)).map(|(item, _)| item)
}

/// Uniformly pick exactly `GROUP_SIZE` words without replacement, returned in
/// corpus order.
fn sample_words<R>(pool: &[&String], rng: &mut R) -> Option<[String; GROUP_SIZE]>
where
    R: Rng + ?Sized,
{
    if pool.len() < GROUP_SIZE {
        return None;
    }
    let mut picked: Vec<String> = pool
        .choose_multiple(rng, GROUP_SIZE)
        .map(|w| (*w).clone())
        .collect();
    picked.sort();
    picked.try_into().ok()
}

/// Pick a fresh category of `main_type` with at least four unused words and
/// sample four of them. Candidates are weighted by their subtype's weight.
pub fn pick_category<R>(
    main_type: &str,
    corpus: &Corpus,
    used_words: &BTreeSet<String>,
    used_categories: &BTreeSet<String>,
    weights: &SubtypeWeights,
    rng: &mut R,
) -> Option<Group>
where
    R: Rng + ?Sized,
{
    let mut eligible: Vec<((&str, &str, Vec<&String>), u64)> = Vec::new();
    for (subtype, categories) in corpus.subtypes(main_type) {
        let Some(weight) = weights.weight(main_type, subtype) else {
            continue;
        };
        for (name, words) in categories {
            if used_categories.contains(name) {
                continue;
            }
            let available: Vec<&String> = words.difference(used_words).collect();
            if available.len() >= GROUP_SIZE {
                eligible.push(((subtype, name.as_str(), available), weight));
            }
        }
    }

    let (subtype, name, available) = weighted_choice(&eligible, rng)?;
    let words = sample_words(available, rng)?;
    Some(Group {
        category: (*name).to_string(),
        main_type: main_type.to_string(),
        subtype: (*subtype).to_string(),
        words,
    })
}

/// Pick a fresh category of `target_main_type` that contains `anchor`.
///
/// One subtype holding the anchor is drawn by weight; its categories for the
/// anchor are then tried in random order. If none of them qualifies the call
/// fails without trying another subtype.
#[allow(clippy::too_many_arguments)]
pub fn pick_anchored_category<R>(
    anchor: &str,
    target_main_type: &str,
    corpus: &Corpus,
    used_categories: &BTreeSet<String>,
    used_words: &BTreeSet<String>,
    policy: AnchorPolicy,
    weights: &SubtypeWeights,
    rng: &mut R,
) -> Option<Group>
where
    R: Rng + ?Sized,
{
    let subtypes: Vec<(&str, u64)> = corpus
        .by_word()
        .get(target_main_type)?
        .iter()
        .filter(|(_, words)| words.contains_key(anchor))
        .filter_map(|(subtype, _)| {
            weights
                .weight(target_main_type, subtype)
                .map(|w| (subtype.as_str(), w))
        })
        .collect();
    let subtype = *weighted_choice(&subtypes, rng)?;

    let mut candidates: Vec<&String> = corpus
        .categories_of(target_main_type, subtype, anchor)?
        .iter()
        .collect();
    candidates.shuffle(rng);

    for name in candidates {
        if used_categories.contains(name) {
            continue;
        }
        let Some(all_words) = corpus.words_of(target_main_type, subtype, name) else {
            continue;
        };
        if !all_words.contains(anchor) {
            continue;
        }

        let words = match policy {
            AnchorPolicy::ForceAnchor => {
                let others: Vec<&String> = all_words
                    .iter()
                    .filter(|w| w.as_str() != anchor && !used_words.contains(*w))
                    .collect();
                if others.len() < GROUP_SIZE - 1 {
                    continue;
                }
                let mut picked = Vec::with_capacity(GROUP_SIZE);
                picked.push(anchor.to_string());
                picked.extend(
                    others
                        .choose_multiple(rng, GROUP_SIZE - 1)
                        .map(|w| (*w).clone()),
                );
                let Ok(words) = <[String; GROUP_SIZE]>::try_from(picked) else {
                    continue;
                };
                words
            }
            AnchorPolicy::Free => {
                let available: Vec<&String> = all_words.difference(used_words).collect();
                let Some(words) = sample_words(&available, rng) else {
                    continue;
                };
                words
            }
        };

        return Some(Group {
            category: name.clone(),
            main_type: target_main_type.to_string(),
            subtype: subtype.to_string(),
            words,
        });
    }
    None
}
