//! False-group assembly: one seed category plus, for each seed word, a
//! category of another main type that is anchored on that word.

use std::fmt;

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::attempt::{Group, Puzzle, PuzzleAttempt, PuzzleKind};
use crate::corpus::Corpus;
use crate::sampler::{pick_anchored_category, pick_category, AnchorPolicy};
use crate::weights::SubtypeWeights;

/// Attempts before giving up on a false group.
pub const MAX_ATTEMPTS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FalseGroupConfig {
    pub max_attempts: usize,
}

impl Default for FalseGroupConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

/// Why a single attempt was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    NoSeed,
    NoOtherMainType { seed_main_type: String },
    NoAnchoredCategory { anchor: String },
    Collision { category: String },
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::NoSeed => write!(f, "no eligible seed category"),
            AttemptFailure::NoOtherMainType { seed_main_type } => {
                write!(f, "no main type other than {seed_main_type:?}")
            }
            AttemptFailure::NoAnchoredCategory { anchor } => {
                write!(f, "no cross-type category for anchor {anchor:?}")
            }
            AttemptFailure::Collision { category } => {
                write!(f, "category {category:?} already used")
            }
        }
    }
}

/// Result of the capped retry loop. `puzzle` is `None` once every attempt failed.
#[derive(Debug, Clone)]
pub struct FalseGroupOutcome {
    pub puzzle: Option<Puzzle>,
    pub attempts: usize,
    pub last_failure: Option<AttemptFailure>,
}

pub struct FalseGroupAssembler<'a> {
    corpus: &'a Corpus,
    weights: &'a SubtypeWeights,
    config: FalseGroupConfig,
}

impl<'a> FalseGroupAssembler<'a> {
    pub fn new(corpus: &'a Corpus, weights: &'a SubtypeWeights) -> Self {
        Self::with_config(corpus, weights, FalseGroupConfig::default())
    }

    pub fn with_config(corpus: &'a Corpus, weights: &'a SubtypeWeights, config: FalseGroupConfig) -> Self {
        Self {
            corpus,
            weights,
            config,
        }
    }

    /// Retry whole attempts, each from an empty state, until one yields all
    /// five groups or the cap is reached.
    pub fn assemble<R>(&self, rng: &mut R) -> FalseGroupOutcome
    where
        R: Rng + ?Sized,
    {
        let mut last_failure = None;
        let mut attempts = 0;
        while attempts < self.config.max_attempts {
            attempts += 1;
            match self.attempt_once(rng) {
                Ok(puzzle) => {
                    debug!("false group assembled after {attempts} attempt(s)");
                    return FalseGroupOutcome {
                        puzzle: Some(puzzle),
                        attempts,
                        last_failure,
                    };
                }
                Err(failure) => {
                    trace!("false group attempt {attempts} failed: {failure}");
                    last_failure = Some(failure);
                }
            }
        }
        debug!(
            "false group retry cap of {} exhausted",
            self.config.max_attempts
        );
        FalseGroupOutcome {
            puzzle: None,
            attempts,
            last_failure,
        }
    }

    /// One attempt: seed pick followed by the anchor loop.
    pub fn attempt_once<R>(&self, rng: &mut R) -> Result<Puzzle, AttemptFailure>
    where
        R: Rng + ?Sized,
    {
        let seed = self.pick_seed(rng).ok_or(AttemptFailure::NoSeed)?;
        self.complete_from_seed(seed, rng)
    }

    /// Seed from a main type chosen at random among those that can supply one.
    fn pick_seed<R>(&self, rng: &mut R) -> Option<Group>
    where
        R: Rng + ?Sized,
    {
        let mut main_types: Vec<&str> = self.corpus.main_types().collect();
        main_types.shuffle(rng);
        let empty = PuzzleAttempt::new();
        main_types.into_iter().find_map(|main_type| {
            pick_category(
                main_type,
                self.corpus,
                empty.used_words(),
                empty.used_categories(),
                self.weights,
                rng,
            )
        })
    }

    /// Run the anchor loop for a given seed. Seed words are visited in the
    /// order the group holds them (corpus order for sampled seeds); the first
    /// failure ends the attempt.
    pub fn complete_from_seed<R>(&self, seed: Group, rng: &mut R) -> Result<Puzzle, AttemptFailure>
    where
        R: Rng + ?Sized,
    {
        let targets: Vec<&str> = self
            .corpus
            .main_types()
            .filter(|mt| *mt != seed.main_type)
            .collect();
        if targets.is_empty() {
            return Err(AttemptFailure::NoOtherMainType {
                seed_main_type: seed.main_type,
            });
        }

        let anchors = seed.words.clone();
        let mut attempt = PuzzleAttempt::new();
        attempt.accept(seed);

        for anchor in anchors {
            let Some(target) = targets.choose(rng).copied() else {
                return Err(AttemptFailure::NoAnchoredCategory { anchor });
            };
            let group = pick_anchored_category(
                &anchor,
                target,
                self.corpus,
                attempt.used_categories(),
                attempt.used_words(),
                AnchorPolicy::ForceAnchor,
                self.weights,
                rng,
            )
            .ok_or_else(|| AttemptFailure::NoAnchoredCategory {
                anchor: anchor.clone(),
            })?;

            if attempt.has_category(&group.category) {
                return Err(AttemptFailure::Collision {
                    category: group.category,
                });
            }
            attempt.accept(group);
        }

        Ok(attempt.into_puzzle(PuzzleKind::FalseGroup))
    }
}
