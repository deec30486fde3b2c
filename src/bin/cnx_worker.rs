use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use cnx_puzzles::store::PuzzleStore;
use cnx_puzzles::{
    load_corpus, BatchConfig, BatchDriver, Corpus, FalseGroupConfig, Group, Mode, OverlapConfig,
    RunStatus, SubtypeWeights, MAX_ATTEMPTS,
};

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Msg {
    Init {
        corpus_dir: PathBuf,
        weights_path: Option<PathBuf>,
        seed: Option<u64>,
        max_attempts: Option<usize>,
        overlap_types: Option<(String, String)>,
        db_path: Option<PathBuf>, // store complete puzzles when set
    },
    Generate {
        mode: Mode,
        count: usize,
    },
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum Out {
    Ready { facts: usize, categories: usize, base_seed: u64 },
    Tick { done: usize, total: usize },
    Puzzle { run: usize, status: RunStatus, attempts: usize, groups: Vec<Group> },
    Stats { complete: usize, inserted: usize },
    Done { runs: usize },
    Error { message: String },
}

struct State {
    corpus: Corpus, // immutable
    weights: SubtypeWeights,
    base_seed: u64,
    next_run: usize, // run numbers continue across Generate messages
    max_attempts: usize,
    overlap: OverlapConfig,
    db: Option<PuzzleStore>,
    corpus_hash: Option<String>,
}

fn emit<W: Write>(writer: &mut W, out: &Out) {
    match serde_json::to_string(out) {
        Ok(s) => {
            let _ = writeln!(writer, "{s}");
            let _ = writer.flush();
        }
        Err(e) => log::error!("cannot encode message: {e}"),
    }
}

fn init(
    corpus_dir: PathBuf,
    weights_path: Option<PathBuf>,
    seed: Option<u64>,
    max_attempts: Option<usize>,
    overlap_types: Option<(String, String)>,
    db_path: Option<PathBuf>,
) -> cnx_puzzles::Result<State> {
    let (corpus, _) = load_corpus(&corpus_dir)?;
    let weights = match weights_path {
        Some(path) => SubtypeWeights::from_path(&path)?,
        None => SubtypeWeights::default(),
    };
    let overlap = match overlap_types {
        Some((first, second)) => OverlapConfig { first, second },
        None => OverlapConfig::default(),
    };
    let db = db_path.as_deref().map(PuzzleStore::open).transpose()?;
    let corpus_hash = db.as_ref().map(|_| corpus.fingerprint());
    Ok(State {
        corpus,
        weights,
        base_seed: seed.unwrap_or_else(rand::random),
        next_run: 1,
        max_attempts: max_attempts.unwrap_or(MAX_ATTEMPTS),
        overlap,
        db,
        corpus_hash,
    })
}

fn run_generate_streaming<W: Write>(state: &mut State, mode: Mode, count: usize, writer: &mut W) {
    let config = BatchConfig {
        mode,
        runs: count,
        seed: Some(state.base_seed),
        threads: 1,
        false_group: FalseGroupConfig {
            max_attempts: state.max_attempts,
        },
        overlap: state.overlap.clone(),
    };
    let driver = BatchDriver::new(&state.corpus, &state.weights, config);

    let mut complete = 0usize;
    let mut inserted = 0usize;
    for done in 1..=count {
        let run = state.next_run + done - 1;
        let record = driver.run_one(run, state.base_seed);
        if record.status == RunStatus::Complete {
            complete += 1;
            if let Some(ref db) = state.db {
                match db.insert(&record.puzzle, state.corpus_hash.as_deref()) {
                    Ok(true) => inserted += 1,
                    Ok(false) => {}
                    Err(e) => emit(writer, &Out::Error { message: format!("store failed: {e}") }),
                }
            }
        }
        emit(
            writer,
            &Out::Puzzle {
                run: record.run,
                status: record.status,
                attempts: record.attempts,
                groups: record.puzzle.groups,
            },
        );
        if done % 10 == 0 || done == count {
            emit(writer, &Out::Tick { done, total: count });
        }
    }
    state.next_run += count;

    if state.db.is_some() {
        emit(writer, &Out::Stats { complete, inserted });
    }
    emit(writer, &Out::Done { runs: count });
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut line = String::new();
    let mut state_opt: Option<State> = None;
    let mut stdout = std::io::stdout();

    loop {
        line.clear();
        let n = match reader.read_line(&mut line) {
            Ok(n) => n,
            Err(e) => {
                log::error!("stdin closed: {e}");
                break;
            }
        };
        if n == 0 { break; }
        if line.trim().is_empty() { continue; }
        let msg: Msg = match serde_json::from_str(&line) {
            Ok(m) => m,
            Err(e) => { emit(&mut stdout, &Out::Error { message: format!("bad json: {e}") }); continue; }
        };
        match msg {
            Msg::Init { corpus_dir, weights_path, seed, max_attempts, overlap_types, db_path } => {
                match init(corpus_dir, weights_path, seed, max_attempts, overlap_types, db_path) {
                    Ok(state) => {
                        let stats = state.corpus.stats();
                        emit(
                            &mut stdout,
                            &Out::Ready { facts: stats.facts, categories: stats.categories, base_seed: state.base_seed },
                        );
                        state_opt = Some(state);
                    }
                    Err(e) => emit(&mut stdout, &Out::Error { message: e.to_string() }),
                }
            }
            Msg::Generate { mode, count } => {
                if let Some(ref mut state) = state_opt {
                    let mut handle = stdout.lock();
                    run_generate_streaming(state, mode, count, &mut handle);
                } else {
                    emit(&mut stdout, &Out::Error { message: "not initialized".into() });
                }
            }
        }
    }
}
