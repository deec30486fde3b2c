//! # cnx_puzzles
//!
//! Assembles Connections-style word puzzles (groups of four related words)
//! from a curated category corpus.
//!
//! The corpus is indexed once into a category index and its inverse word
//! index ([`Corpus`]). Two assemblers draw from it:
//!
//! - [`FalseGroupAssembler`]: a seed category plus, for each of its four
//!   words, a category of another main type anchored on that word.
//! - [`OverlapAssembler`]: a four-category chain alternating between two
//!   main types, preferring categories linked to words already placed.
//!
//! Both take an injected random source, so seeded runs reproduce exactly.

pub mod attempt;
pub mod corpus;
pub mod driver;
pub mod error;
pub mod false_group;
pub mod loader;
pub mod overlap;
pub mod ranking;
pub mod report;
pub mod sampler;
pub mod store;
pub mod validate;
pub mod weights;

pub use attempt::{Group, Puzzle, PuzzleAttempt, PuzzleKind};
pub use corpus::{Corpus, Fact, GROUP_SIZE};
pub use driver::{BatchConfig, BatchDriver, BatchSummary, Mode, RunRecord, RunStatus};
pub use error::{CnxError, Result};
pub use false_group::{FalseGroupAssembler, FalseGroupConfig, FalseGroupOutcome, MAX_ATTEMPTS};
pub use loader::load_corpus;
pub use overlap::{OverlapAssembler, OverlapConfig};
pub use sampler::{pick_anchored_category, pick_category, AnchorPolicy};
pub use weights::SubtypeWeights;
