//! Plain-text puzzle report: one block per run, failures included, so the
//! block count always equals the run count.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::driver::{RunRecord, RunStatus};
use crate::error::{CnxError, Result};
use crate::ranking::RankedGroup;

const RULE: &str = "-------------------------------------";
pub const NO_RESULT: &str = "No connections were generated for this run.";

/// `"<index>. <CATEGORY NAME>: w1, w2, w3, w4"`
pub fn format_group_line(index: usize, category: &str, words: &[String]) -> String {
    format!("{index}. {}: {}", category.to_uppercase(), words.join(", "))
}

/// `"(partial: <placed> of <full_size> groups)"`
pub fn partial_marker(placed: usize, full_size: usize) -> String {
    format!("(partial: {placed} of {full_size} groups)")
}

pub fn render_block(record: &RunRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Run {} ---", record.run);
    match record.status {
        RunStatus::Empty => {
            let _ = writeln!(out, "{NO_RESULT}");
        }
        RunStatus::Complete | RunStatus::Partial => {
            for (i, group) in record.puzzle.groups.iter().enumerate() {
                let _ = writeln!(out, "{}", format_group_line(i + 1, &group.category, &group.words));
            }
            if record.status == RunStatus::Partial {
                let _ = writeln!(
                    out,
                    "{}",
                    partial_marker(record.puzzle.groups.len(), record.puzzle.kind.full_size())
                );
            }
        }
    }
    let _ = writeln!(out, "\n{RULE}\n");
    out
}

/// Re-emit a parsed run with its groups in ranked order. Status lines are
/// written back the way `render_block` wrote them.
pub fn render_ranked_block(run: &ParsedRun, ranked: &[RankedGroup]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Run {} ---", run.run);
    if run.status == RunStatus::Empty || ranked.is_empty() {
        let _ = writeln!(out, "{NO_RESULT}");
    }
    for group in ranked {
        let _ = writeln!(out, "{}", format_group_line(group.rank, &group.category, &group.words));
    }
    if run.status == RunStatus::Partial {
        let full_size = run.full_size.unwrap_or(ranked.len());
        let _ = writeln!(out, "{}", partial_marker(ranked.len(), full_size));
    }
    let _ = writeln!(out, "\n{RULE}\n");
    out
}

/// Appends blocks to a report file as runs resolve.
pub struct ReportWriter {
    out: BufWriter<File>,
}

impl ReportWriter {
    pub fn append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn write_record(&mut self, record: &RunRecord) -> Result<()> {
        self.out.write_all(render_block(record).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGroup {
    pub index: usize,
    pub category: String,
    pub words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRun {
    pub run: usize,
    pub status: RunStatus,
    pub groups: Vec<ParsedGroup>,
    /// Group count of a finished puzzle, as read from a partial marker.
    pub full_size: Option<usize>,
}

/// Parse a report back into runs. Category names come back as written
/// (upper-cased).
pub fn parse_report(text: &str) -> Result<Vec<ParsedRun>> {
    let mut runs: Vec<ParsedRun> = Vec::new();

    for (n, raw) in text.lines().enumerate() {
        let line_no = n + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(run) = line.strip_prefix("--- Run ").and_then(|l| l.strip_suffix(" ---")) {
            let run = run
                .trim()
                .parse()
                .map_err(|_| CnxError::malformed_report(line_no, format!("bad run number {run:?}")))?;
            runs.push(ParsedRun {
                run,
                status: RunStatus::Complete,
                groups: Vec::new(),
                full_size: None,
            });
            continue;
        }
        if line.chars().all(|c| c == '-') {
            continue;
        }

        let current = runs
            .last_mut()
            .ok_or_else(|| CnxError::malformed_report(line_no, "content before the first run header"))?;

        if line == NO_RESULT {
            current.status = RunStatus::Empty;
        } else if let Some(marker) = line.strip_prefix("(partial:") {
            current.status = RunStatus::Partial;
            current.full_size = marker
                .split_whitespace()
                .nth(2)
                .and_then(|n| n.parse().ok());
        } else {
            current.groups.push(parse_group_line(line, line_no)?);
        }
    }
    Ok(runs)
}

fn parse_group_line(line: &str, line_no: usize) -> Result<ParsedGroup> {
    let (index, rest) = line
        .split_once(". ")
        .ok_or_else(|| CnxError::malformed_report(line_no, "expected '<index>. '"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| CnxError::malformed_report(line_no, format!("bad group index {index:?}")))?;
    let (category, words) = rest
        .rsplit_once(": ")
        .ok_or_else(|| CnxError::malformed_report(line_no, "expected '<CATEGORY>: <words>'"))?;
    let words: Vec<String> = words
        .split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    if words.is_empty() {
        return Err(CnxError::malformed_report(line_no, "group without words"));
    }
    Ok(ParsedGroup {
        index,
        category: category.trim().to_string(),
        words,
    })
}
