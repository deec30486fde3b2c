//! SQLite persistence for generated puzzles, keyed by content hash.

use std::path::Path;
use std::thread;
use std::time::Duration;

use rusqlite::{params, Connection};

use crate::attempt::Puzzle;
use crate::error::Result;

const CREATE_PUZZLES_SQL: &str = r"
CREATE TABLE IF NOT EXISTS puzzles (
    puzzle_hash TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    group_count INTEGER NOT NULL,
    groups_json TEXT NOT NULL,
    corpus_hash TEXT,
    puzzle_quality_score REAL
);
CREATE INDEX IF NOT EXISTS idx_puzzles_kind ON puzzles(kind);
";

/// Retry `f` with exponential backoff: 50ms, 100ms, 200ms, ...
pub fn retry_with_backoff<F, T, E>(mut f: F, max_attempts: usize) -> std::result::Result<T, E>
where
    F: FnMut() -> std::result::Result<T, E>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match f() {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                log::debug!("attempt {attempt}/{max_attempts} failed: {e}");
                thread::sleep(Duration::from_millis(50 * (1 << (attempt - 1).min(10))));
                attempt += 1;
            }
        }
    }
}

pub struct PuzzleStore {
    conn: Connection,
}

impl PuzzleStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_millis(60_000))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_PUZZLES_SQL)?;
        Ok(Self { conn })
    }

    /// Store a puzzle once. Returns false if an identical puzzle is already stored.
    pub fn insert(&self, puzzle: &Puzzle, corpus_hash: Option<&str>) -> Result<bool> {
        let groups_json = serde_json::to_string(&puzzle.groups)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO puzzles (puzzle_hash, kind, group_count, groups_json, corpus_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                puzzle.puzzle_hash(),
                puzzle.kind.as_str(),
                puzzle.groups.len() as i64,
                groups_json,
                corpus_hash
            ],
        )?;
        Ok(inserted > 0)
    }

    pub fn get(&self, puzzle_hash: &str) -> Result<Option<Puzzle>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, groups_json FROM puzzles WHERE puzzle_hash = ?1")?;
        let mut rows = stmt.query(params![puzzle_hash])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let kind: String = row.get(0)?;
        let groups_json: String = row.get(1)?;
        let puzzle = Puzzle {
            kind: serde_json::from_value(serde_json::Value::String(kind))?,
            groups: serde_json::from_str(&groups_json)?,
        };
        Ok(Some(puzzle))
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM puzzles", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Delete by hash in one transaction, retrying on lock contention.
    pub fn delete(&mut self, hashes: &[String]) -> Result<usize> {
        let deleted = retry_with_backoff(
            || {
                let tx = self.conn.transaction()?;
                let mut deleted = 0;
                {
                    let mut stmt = tx.prepare("DELETE FROM puzzles WHERE puzzle_hash = ?1")?;
                    for hash in hashes {
                        deleted += stmt.execute(params![hash])?;
                    }
                }
                tx.commit()?;
                Ok::<usize, rusqlite::Error>(deleted)
            },
            5,
        )?;
        Ok(deleted)
    }

    /// Set quality scores by hash; unknown hashes are ignored.
    pub fn upsert_scores(&mut self, items: &[(String, f64)]) -> Result<usize> {
        let updated = retry_with_backoff(
            || {
                let tx = self.conn.transaction()?;
                let mut updated = 0;
                {
                    let mut stmt =
                        tx.prepare("UPDATE puzzles SET puzzle_quality_score = ?2 WHERE puzzle_hash = ?1")?;
                    for (hash, score) in items {
                        updated += stmt.execute(params![hash, score])?;
                    }
                }
                tx.commit()?;
                Ok::<usize, rusqlite::Error>(updated)
            },
            5,
        )?;
        Ok(updated)
    }

    pub fn score(&self, puzzle_hash: &str) -> Result<Option<f64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT puzzle_quality_score FROM puzzles WHERE puzzle_hash = ?1")?;
        let mut rows = stmt.query(params![puzzle_hash])?;
        let score = match rows.next()? {
            Some(row) => row.get(0)?,
            None => None,
        };
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::{group, PuzzleKind};
    use std::cell::Cell;

    fn puzzle(first: &str) -> Puzzle {
        Puzzle {
            kind: PuzzleKind::IntentionalOverlap,
            groups: vec![
                group(first, "meaning", "syn", ["a1", "a2", "a3", "a4"]),
                group("F1", "form", "col", ["c1", "c2", "c3", "c4"]),
            ],
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let store = PuzzleStore::open_in_memory().unwrap();
        assert!(store.insert(&puzzle("M1"), Some("abc")).unwrap());
        assert!(!store.insert(&puzzle("M1"), Some("abc")).unwrap());
        assert!(store.insert(&puzzle("M2"), None).unwrap());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn round_trips_through_json_columns() {
        let store = PuzzleStore::open_in_memory().unwrap();
        let original = puzzle("M1");
        store.insert(&original, None).unwrap();
        assert_eq!(store.get(&original.puzzle_hash()).unwrap(), Some(original));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn delete_and_score() {
        let mut store = PuzzleStore::open_in_memory().unwrap();
        let a = puzzle("M1");
        let b = puzzle("M2");
        store.insert(&a, None).unwrap();
        store.insert(&b, None).unwrap();

        let updated = store
            .upsert_scores(&[(a.puzzle_hash(), 0.75), ("nope".to_string(), 1.0)])
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(store.score(&a.puzzle_hash()).unwrap(), Some(0.75));
        assert_eq!(store.score(&b.puzzle_hash()).unwrap(), None);

        assert_eq!(store.delete(&[b.puzzle_hash()]).unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn opens_a_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("puzzles.db");
        {
            let store = PuzzleStore::open(&path).unwrap();
            store.insert(&puzzle("M1"), None).unwrap();
        }
        let reopened = PuzzleStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn backoff_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                calls.set(calls.get() + 1);
                Err("locked".to_string())
            },
            3,
        );
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);

        let ok: std::result::Result<u8, String> = retry_with_backoff(|| Ok(1), 3);
        assert_eq!(ok, Ok(1));
    }
}
