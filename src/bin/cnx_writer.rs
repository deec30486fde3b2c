use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use cnx_puzzles::store::PuzzleStore;
use cnx_puzzles::Puzzle;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Msg {
    Init { db_path: PathBuf },
    Store { puzzle: Puzzle, corpus_hash: Option<String> },
    Delete { hashes: Vec<String> },
    UpsertScores { items: Vec<(String, f64)> },
    Count,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum Out {
    Ready,
    Ack,
    Stored { puzzle_hash: String, inserted: bool },
    Deleted { count: usize },
    Updated { count: usize },
    Count { count: usize },
    Error { message: String },
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

fn handle(store: &mut PuzzleStore, msg: Msg) -> Out {
    let result = match msg {
        Msg::Init { .. } => return Out::Ack,
        Msg::Store { puzzle, corpus_hash } => store
            .insert(&puzzle, corpus_hash.as_deref())
            .map(|inserted| Out::Stored { puzzle_hash: puzzle.puzzle_hash(), inserted }),
        Msg::Delete { hashes } => store
            .delete(&hashes)
            .map(|count| Out::Deleted { count }),
        Msg::UpsertScores { items } => store
            .upsert_scores(&items)
            .map(|count| Out::Updated { count }),
        Msg::Count => store.count().map(|count| Out::Count { count }),
    };
    result.unwrap_or_else(|e| Out::Error { message: e.to_string() })
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut line = String::new();
    let mut stdout = std::io::stdout();
    let mut store_opt: Option<PuzzleStore> = None;

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
        if let Msg::Init { db_path } = msg {
            match PuzzleStore::open(&db_path) {
                Ok(store) => {
                    store_opt = Some(store);
                    emit(&mut stdout, &Out::Ready);
                }
                Err(e) => emit(&mut stdout, &Out::Error { message: e.to_string() }),
            }
            continue;
        }
        let out = match store_opt {
            Some(ref mut store) => handle(store, msg),
            None => Out::Error { message: "no db".into() },
        };
        emit(&mut stdout, &out);
    }
}
