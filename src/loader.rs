//! Loads the corpus from a directory forest:
//! `root/<main_type>/<subtype>/*.csv`, each row `category;word`.

use std::fs::File;
use std::path::Path;

use log::{info, warn};
use walkdir::WalkDir;

use crate::corpus::{Corpus, Fact};
use crate::error::{CnxError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub files: usize,
    pub rows: usize,
    pub skipped_rows: usize,
    pub unreadable_files: usize,
}

/// Load every CSV under `root`. A missing root or a forest without a single
/// valid row is fatal; bad rows and unreadable files are logged and skipped.
pub fn load_corpus(root: &Path) -> Result<(Corpus, LoadStats)> {
    if !root.is_dir() {
        return Err(CnxError::corpus_unavailable(root, "not a directory"));
    }

    let mut corpus = Corpus::default();
    let mut stats = LoadStats::default();

    let walker = WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable corpus entry: {e}");
                stats.unreadable_files += 1;
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let (Some(main_type), Some(subtype)) = (dir_name(path, 2), dir_name(path, 1)) else {
            continue;
        };

        match load_file(path, &main_type, &subtype, &mut corpus, &mut stats) {
            Ok(()) => stats.files += 1,
            Err(e) => {
                warn!("error reading {}: {e}", path.display());
                stats.unreadable_files += 1;
            }
        }
    }

    if corpus.is_empty() {
        return Err(CnxError::corpus_unavailable(root, "no valid category rows found"));
    }
    let summary = corpus.stats();
    info!(
        "loaded {} facts in {} categories ({} main types, {} subtypes) from {} files; {} rows skipped",
        summary.facts,
        summary.categories,
        summary.main_types,
        summary.subtypes,
        stats.files,
        stats.skipped_rows
    );
    Ok((corpus, stats))
}

/// Name of the `up`-th ancestor directory of `path`.
fn dir_name(path: &Path, up: usize) -> Option<String> {
    path.ancestors()
        .nth(up)?
        .file_name()?
        .to_str()
        .map(str::to_string)
}

fn load_file(
    path: &Path,
    main_type: &str,
    subtype: &str,
    corpus: &mut Corpus,
    stats: &mut LoadStats,
) -> Result<()> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    for (line, record) in reader.records().enumerate() {
        stats.rows += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("{}:{}: unreadable row: {e}", path.display(), line + 1);
                stats.skipped_rows += 1;
                continue;
            }
        };
        let accepted = match (record.len(), record.get(0), record.get(1)) {
            (2, Some(category), Some(word)) => {
                corpus.insert(&Fact::new(main_type, subtype, category, word))
            }
            _ => false,
        };
        if !accepted {
            warn!("{}:{}: skipping malformed row {:?}", path.display(), line + 1, record);
            stats.skipped_rows += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_forest_and_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "meaning/hyponyms/fruits.csv",
            "FRUITS;APPLE\nFRUITS; PEAR \n;ORPHAN\nFRUITS;\nTOO;MANY;FIELDS\nLONELY\n",
        );
        write(dir.path(), "form/anagrams/reap.csv", "ANAGRAMS OF REAP;PEAR\n");
        write(dir.path(), "form/anagrams/notes.txt", "ignored;file\n");
        write(dir.path(), "stray.csv", "NOT;INDEXED\n");

        let (corpus, stats) = load_corpus(dir.path()).unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.skipped_rows, 4);

        let fruits = corpus.words_of("meaning", "hyponyms", "FRUITS").unwrap();
        assert!(fruits.contains("PEAR"));
        assert_eq!(fruits.len(), 2);
        assert!(corpus.categories_of("form", "anagrams", "PEAR").is_some());
        assert_eq!(corpus.stats().main_types, 2);
    }

    #[test]
    fn missing_root_is_fatal() {
        let err = load_corpus(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, CnxError::CorpusUnavailable { .. }));
    }

    #[test]
    fn empty_forest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "meaning/hyponyms/empty.csv", ";\n");
        let err = load_corpus(dir.path()).unwrap_err();
        assert!(err.is_fatal_to_batch());
    }
}
