//! Batch driver: N independent assembly runs over one shared corpus.
//!
//! Run `i` always draws from `StdRng::seed_from_u64(base_seed + i)`, so a
//! batch reproduces exactly for a fixed base seed whatever the thread count.

use std::thread;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::attempt::{Puzzle, PuzzleKind};
use crate::corpus::Corpus;
use crate::error::Result;
use crate::false_group::{FalseGroupAssembler, FalseGroupConfig};
use crate::overlap::{OverlapAssembler, OverlapConfig};
use crate::weights::SubtypeWeights;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    FalseGroup,
    Overlap,
}

impl Mode {
    pub fn kind(self) -> PuzzleKind {
        match self {
            Mode::FalseGroup => PuzzleKind::FalseGroup,
            Mode::Overlap => PuzzleKind::IntentionalOverlap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    Partial,
    Empty,
}

/// Outcome of one run, whatever happened in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// 1-based position in the batch.
    pub run: usize,
    pub status: RunStatus,
    pub puzzle: Puzzle,
    pub attempts: usize,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub mode: Mode,
    pub runs: usize,
    /// Base seed; drawn from entropy (and logged) when absent.
    pub seed: Option<u64>,
    pub threads: usize,
    pub false_group: FalseGroupConfig,
    pub overlap: OverlapConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mode: Mode::FalseGroup,
            runs: 5,
            seed: None,
            threads: 1,
            false_group: FalseGroupConfig::default(),
            overlap: OverlapConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub base_seed: u64,
    pub runs: usize,
    pub complete: usize,
    pub partial: usize,
    pub empty: usize,
}

impl BatchSummary {
    fn count(&mut self, record: &RunRecord) {
        self.runs += 1;
        match record.status {
            RunStatus::Complete => self.complete += 1,
            RunStatus::Partial => self.partial += 1,
            RunStatus::Empty => self.empty += 1,
        }
    }
}

pub struct BatchDriver<'a> {
    corpus: &'a Corpus,
    weights: &'a SubtypeWeights,
    config: BatchConfig,
}

impl<'a> BatchDriver<'a> {
    pub fn new(corpus: &'a Corpus, weights: &'a SubtypeWeights, config: BatchConfig) -> Self {
        Self {
            corpus,
            weights,
            config,
        }
    }

    /// Run a single numbered attempt with its own random stream.
    pub fn run_one(&self, run: usize, base_seed: u64) -> RunRecord {
        let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(run as u64));
        let (puzzle, attempts) = match self.config.mode {
            Mode::FalseGroup => {
                let outcome =
                    FalseGroupAssembler::with_config(self.corpus, self.weights, self.config.false_group)
                        .assemble(&mut rng);
                let puzzle = outcome.puzzle.unwrap_or(Puzzle {
                    kind: PuzzleKind::FalseGroup,
                    groups: Vec::new(),
                });
                (puzzle, outcome.attempts)
            }
            Mode::Overlap => {
                let puzzle =
                    OverlapAssembler::with_config(self.corpus, self.weights, self.config.overlap.clone())
                        .assemble(&mut rng);
                (puzzle, 1)
            }
        };
        let status = if puzzle.is_complete() {
            RunStatus::Complete
        } else if puzzle.groups.is_empty() {
            RunStatus::Empty
        } else {
            RunStatus::Partial
        };
        RunRecord {
            run,
            status,
            puzzle,
            attempts,
        }
    }

    /// Run the batch, handing each resolved run to `sink` in run order. A
    /// sink error stops the batch.
    pub fn run<F>(&self, mut sink: F) -> Result<BatchSummary>
    where
        F: FnMut(&RunRecord) -> Result<()>,
    {
        let base_seed = self.config.seed.unwrap_or_else(rand::random);
        info!(
            "starting {} {:?} run(s) with base seed {base_seed} on {} thread(s)",
            self.config.runs,
            self.config.mode,
            self.config.threads.max(1)
        );

        let mut summary = BatchSummary {
            base_seed,
            ..BatchSummary::default()
        };

        if self.config.threads <= 1 {
            for run in 1..=self.config.runs {
                let record = self.run_one(run, base_seed);
                summary.count(&record);
                sink(&record)?;
            }
        } else {
            for record in self.run_parallel(base_seed) {
                summary.count(&record);
                sink(&record)?;
            }
        }

        info!(
            "finished {} run(s): {} complete, {} partial, {} empty",
            summary.runs, summary.complete, summary.partial, summary.empty
        );
        Ok(summary)
    }

    /// Collect every run, in order.
    pub fn run_collect(&self) -> Result<(BatchSummary, Vec<RunRecord>)> {
        let mut records = Vec::with_capacity(self.config.runs);
        let summary = self.run(|record| {
            records.push(record.clone());
            Ok(())
        })?;
        Ok((summary, records))
    }

    fn run_parallel(&self, base_seed: u64) -> Vec<RunRecord> {
        let threads = self.config.threads.min(self.config.runs.max(1));
        let mut records: Vec<RunRecord> = thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|worker| {
                    scope.spawn(move || {
                        (1..=self.config.runs)
                            .skip(worker)
                            .step_by(threads)
                            .map(|run| self.run_one(run, base_seed))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });
        records.sort_by_key(|record| record.run);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Fact;

    fn corpus() -> Corpus {
        let mut facts = Vec::new();
        for (mt, name, words) in [
            ("meaning", "M1", ["a1", "a2", "a3", "a4", "x1"]),
            ("meaning", "M2", ["b1", "b2", "b3", "b4", "x2"]),
            ("form", "F1", ["a1", "c2", "c3", "c4", "c5"]),
            ("form", "F2", ["b1", "d2", "d3", "d4", "d5"]),
            ("form", "F3", ["e1", "e2", "e3", "e4", "e5"]),
        ] {
            for w in words {
                facts.push(Fact::new(mt, "base", name, w));
            }
        }
        Corpus::from_facts(facts)
    }

    #[test]
    fn block_count_matches_run_count() {
        let corpus = corpus();
        let weights = SubtypeWeights::uniform();
        let config = BatchConfig {
            mode: Mode::FalseGroup,
            runs: 4,
            seed: Some(9),
            false_group: FalseGroupConfig { max_attempts: 10 },
            ..BatchConfig::default()
        };
        let (summary, records) = BatchDriver::new(&corpus, &weights, config).run_collect().unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(summary.runs, 4);
        assert_eq!(summary.complete + summary.partial + summary.empty, 4);
        assert_eq!(records.iter().map(|r| r.run).collect::<Vec<_>>(), [1, 2, 3, 4]);
        // this corpus cannot anchor four seed words
        assert!(records.iter().all(|r| r.status == RunStatus::Empty && r.attempts == 10));
    }

    #[test]
    fn threads_do_not_change_results() {
        let corpus = corpus();
        let weights = SubtypeWeights::uniform();
        let base = BatchConfig {
            mode: Mode::Overlap,
            runs: 7,
            seed: Some(1234),
            ..BatchConfig::default()
        };
        let (_, sequential) = BatchDriver::new(&corpus, &weights, base.clone()).run_collect().unwrap();
        let parallel_config = BatchConfig { threads: 3, ..base };
        let (_, parallel) = BatchDriver::new(&corpus, &weights, parallel_config).run_collect().unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn sink_errors_stop_the_batch() {
        let corpus = corpus();
        let weights = SubtypeWeights::uniform();
        let config = BatchConfig {
            mode: Mode::Overlap,
            runs: 3,
            seed: Some(5),
            ..BatchConfig::default()
        };
        let mut seen = 0;
        let result = BatchDriver::new(&corpus, &weights, config).run(|_| {
            seen += 1;
            Err(crate::error::CnxError::invalid_config("disk full"))
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }
}
