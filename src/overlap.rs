//! Intentional-overlap assembly: a four-category chain that alternates
//! between two main types, preferring categories linked to words already in
//! the puzzle.

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attempt::{Group, Puzzle, PuzzleAttempt, PuzzleKind};
use crate::corpus::{Corpus, GROUP_SIZE};
use crate::sampler::{pick_anchored_category, pick_category, AnchorPolicy};
use crate::weights::SubtypeWeights;

/// The two alternating main types. The chain always opens on `first`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapConfig {
    pub first: String,
    pub second: String,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            first: "meaning".to_string(),
            second: "form".to_string(),
        }
    }
}

impl OverlapConfig {
    /// The type that should follow `main_type`.
    pub fn partner(&self, main_type: &str) -> &str {
        if main_type == self.second {
            &self.first
        } else {
            &self.second
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Primary,
    Secondary,
}

/// One fallback strategy for filling the next slot of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Anchored(Side),
    Unanchored(Side),
}

const TIERS: [Tier; 4] = [
    Tier::Anchored(Side::Primary),
    Tier::Anchored(Side::Secondary),
    Tier::Unanchored(Side::Primary),
    Tier::Unanchored(Side::Secondary),
];

pub struct OverlapAssembler<'a> {
    corpus: &'a Corpus,
    weights: &'a SubtypeWeights,
    config: OverlapConfig,
}

impl<'a> OverlapAssembler<'a> {
    pub fn new(corpus: &'a Corpus, weights: &'a SubtypeWeights) -> Self {
        Self::with_config(corpus, weights, OverlapConfig::default())
    }

    pub fn with_config(corpus: &'a Corpus, weights: &'a SubtypeWeights, config: OverlapConfig) -> Self {
        Self {
            corpus,
            weights,
            config,
        }
    }

    /// Build one chain. An empty puzzle means the opening pick failed; fewer
    /// than four groups means every tier failed at some later step.
    pub fn assemble<R>(&self, rng: &mut R) -> Puzzle
    where
        R: Rng + ?Sized,
    {
        let mut attempt = PuzzleAttempt::new();

        let Some(opening) = pick_category(
            &self.config.first,
            self.corpus,
            attempt.used_words(),
            attempt.used_categories(),
            self.weights,
            rng,
        ) else {
            debug!("no opening {:?} category", self.config.first);
            return attempt.into_puzzle(PuzzleKind::IntentionalOverlap);
        };
        let mut realized = opening.main_type.clone();
        attempt.accept(opening);

        while attempt.len() < GROUP_SIZE {
            let primary = self.config.partner(&realized).to_string();
            let secondary = self.config.partner(&primary).to_string();

            let mut anchors: Vec<String> = attempt.used_words().iter().cloned().collect();
            anchors.shuffle(rng);

            let step = TIERS.iter().find_map(|tier| {
                let group = self.try_tier(*tier, &primary, &secondary, &anchors, &attempt, rng);
                if let Some(group) = &group {
                    trace!("step {} filled by {:?} with {:?}", attempt.len() + 1, tier, group.category);
                }
                group
            });

            match step {
                Some(group) => {
                    realized = group.main_type.clone();
                    attempt.accept(group);
                }
                None => {
                    debug!("overlap chain stopped at {} group(s)", attempt.len());
                    break;
                }
            }
        }

        attempt.into_puzzle(PuzzleKind::IntentionalOverlap)
    }

    fn try_tier<R>(
        &self,
        tier: Tier,
        primary: &str,
        secondary: &str,
        anchors: &[String],
        attempt: &PuzzleAttempt,
        rng: &mut R,
    ) -> Option<Group>
    where
        R: Rng + ?Sized,
    {
        let side = |s: Side| match s {
            Side::Primary => primary,
            Side::Secondary => secondary,
        };
        match tier {
            Tier::Anchored(s) => {
                let target = side(s);
                anchors.iter().find_map(|anchor| {
                    pick_anchored_category(
                        anchor,
                        target,
                        self.corpus,
                        attempt.used_categories(),
                        attempt.used_words(),
                        AnchorPolicy::Free,
                        self.weights,
                        rng,
                    )
                })
            }
            Tier::Unanchored(s) => pick_category(
                side(s),
                self.corpus,
                attempt.used_words(),
                attempt.used_categories(),
                self.weights,
                rng,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Fact;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn category(main_type: &str, name: &str, words: &[&str]) -> Vec<Fact> {
        words
            .iter()
            .map(|w| Fact::new(main_type, "base", name, *w))
            .collect()
    }

    #[test]
    fn partner_alternates() {
        let config = OverlapConfig::default();
        assert_eq!(config.partner("meaning"), "form");
        assert_eq!(config.partner("form"), "meaning");
        // unknown types fall to the second domain
        assert_eq!(config.partner("sound"), "form");
    }

    #[test]
    fn alternates_when_both_sides_available() {
        let mut facts = Vec::new();
        facts.extend(category("meaning", "M1", &["a1", "a2", "a3", "a4"]));
        facts.extend(category("meaning", "M2", &["b1", "b2", "b3", "b4"]));
        facts.extend(category("form", "F1", &["c1", "c2", "c3", "c4"]));
        facts.extend(category("form", "F2", &["d1", "d2", "d3", "d4"]));
        let corpus = Corpus::from_facts(facts);
        let weights = SubtypeWeights::uniform();
        let assembler = OverlapAssembler::new(&corpus, &weights);
        let mut rng = StdRng::seed_from_u64(21);

        let puzzle = assembler.assemble(&mut rng);
        let types: Vec<&str> = puzzle.groups.iter().map(|g| g.main_type.as_str()).collect();
        assert_eq!(types, ["meaning", "form", "meaning", "form"]);
        assert!(puzzle.is_complete());
    }

    #[test]
    fn falls_back_to_the_same_side() {
        let mut facts = Vec::new();
        for i in 0..4 {
            let words: Vec<String> = (0..4).map(|j| format!("m{i}{j}")).collect();
            let refs: Vec<&str> = words.iter().map(String::as_str).collect();
            facts.extend(category("meaning", &format!("M{i}"), &refs));
        }
        let corpus = Corpus::from_facts(facts);
        let weights = SubtypeWeights::uniform();
        let assembler = OverlapAssembler::new(&corpus, &weights);
        let mut rng = StdRng::seed_from_u64(4);

        let puzzle = assembler.assemble(&mut rng);
        assert_eq!(puzzle.groups.len(), 4);
        assert!(puzzle.groups.iter().all(|g| g.main_type == "meaning"));
    }

    #[test]
    fn missing_opening_type_yields_empty_chain() {
        let corpus = Corpus::from_facts(category("form", "F1", &["c1", "c2", "c3", "c4"]));
        let weights = SubtypeWeights::uniform();
        let assembler = OverlapAssembler::new(&corpus, &weights);
        let mut rng = StdRng::seed_from_u64(0);

        let puzzle = assembler.assemble(&mut rng);
        assert!(puzzle.groups.is_empty());
    }

    #[test]
    fn partial_chain_when_corpus_runs_dry() {
        let mut facts = Vec::new();
        facts.extend(category("meaning", "M1", &["a1", "a2", "a3", "a4"]));
        facts.extend(category("form", "F1", &["c1", "c2", "c3", "c4"]));
        let corpus = Corpus::from_facts(facts);
        let weights = SubtypeWeights::uniform();
        let assembler = OverlapAssembler::new(&corpus, &weights);
        let mut rng = StdRng::seed_from_u64(8);

        let puzzle = assembler.assemble(&mut rng);
        assert_eq!(puzzle.groups.len(), 2);
        assert!(!puzzle.is_complete());
    }

    #[test]
    fn anchored_tier_prefers_linked_categories() {
        // F_LINK shares "a1" with the opening category and has four fresh words.
        let mut facts = Vec::new();
        facts.extend(category("meaning", "M1", &["a1", "a2", "a3", "a4"]));
        facts.extend(category("form", "F_LINK", &["a1", "l1", "l2", "l3", "l4"]));
        facts.extend(category("form", "F_FREE", &["f1", "f2", "f3", "f4"]));
        let corpus = Corpus::from_facts(facts);
        let weights = SubtypeWeights::uniform();
        let assembler = OverlapAssembler::new(&corpus, &weights);

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let puzzle = assembler.assemble(&mut rng);
            assert_eq!(puzzle.groups[1].category, "F_LINK");
            assert!(!puzzle.groups[1].words.contains(&"a1".to_string()));
        }
    }

    #[test]
    fn linked_same_side_beats_unlinked_other_side() {
        // Nothing of "form" links to M1, but M_LINK shares "s" with it.
        let mut facts = Vec::new();
        facts.extend(category("meaning", "M1", &["a1", "a2", "a3", "s"]));
        facts.extend(category("meaning", "M_LINK", &["s", "b1", "b2", "b3", "b4"]));
        facts.extend(category("form", "F_FREE", &["f1", "f2", "f3", "f4"]));
        let corpus = Corpus::from_facts(facts);
        let weights = SubtypeWeights::uniform();
        let assembler = OverlapAssembler::new(&corpus, &weights);

        let mut opened_on_m1 = 0;
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let puzzle = assembler.assemble(&mut rng);
            if puzzle.groups[0].category != "M1" {
                continue;
            }
            opened_on_m1 += 1;
            assert_eq!(puzzle.groups[1].category, "M_LINK");
            assert_eq!(puzzle.groups[1].words, ["b1", "b2", "b3", "b4"]);
        }
        assert!(opened_on_m1 > 0);
    }
}
