use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use cnx_puzzles::validate::validate_puzzle;
use cnx_puzzles::{load_corpus, Corpus, Fact, Puzzle};

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Msg {
    /// Either a corpus directory or inline facts; inline facts win when both are set.
    Init {
        corpus_dir: Option<PathBuf>,
        #[serde(default)]
        facts: Vec<Fact>,
    },
    Validate {
        puzzle: Puzzle,
    },
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum Out {
    Ready { categories: usize },
    Valid { puzzle_hash: String },
    Invalid { reason: String },
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

fn init(corpus_dir: Option<PathBuf>, facts: Vec<Fact>) -> Result<Corpus, String> {
    if !facts.is_empty() {
        return Ok(Corpus::from_facts(facts));
    }
    match corpus_dir {
        Some(dir) => load_corpus(&dir).map(|(corpus, _)| corpus).map_err(|e| e.to_string()),
        None => Err("init needs corpus_dir or facts".into()),
    }
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut line = String::new();
    let mut corpus_opt: Option<Corpus> = None;
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
            Err(e) => { emit(&mut stdout, &Out::Invalid { reason: format!("bad json: {e}") }); continue; }
        };
        match msg {
            Msg::Init { corpus_dir, facts } => match init(corpus_dir, facts) {
                Ok(corpus) => {
                    emit(&mut stdout, &Out::Ready { categories: corpus.stats().categories });
                    corpus_opt = Some(corpus);
                }
                Err(reason) => emit(&mut stdout, &Out::Invalid { reason }),
            },
            Msg::Validate { puzzle } => {
                if let Some(ref corpus) = corpus_opt {
                    match validate_puzzle(corpus, &puzzle) {
                        Ok(()) => emit(&mut stdout, &Out::Valid { puzzle_hash: puzzle.puzzle_hash() }),
                        Err(violation) => emit(&mut stdout, &Out::Invalid { reason: violation.to_string() }),
                    }
                } else {
                    emit(&mut stdout, &Out::Invalid { reason: "not initialized".into() });
                }
            }
        }
    }
}
