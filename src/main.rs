use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use cnx_puzzles::ranking::{rank_groups, EmbeddingTable};
use cnx_puzzles::report::{self, ReportWriter};
use cnx_puzzles::store::PuzzleStore;
use cnx_puzzles::validate::validate_puzzle;
use cnx_puzzles::{
    load_corpus, BatchConfig, BatchDriver, FalseGroupConfig, Mode, OverlapConfig, RunStatus,
    SubtypeWeights, MAX_ATTEMPTS,
};

#[derive(Debug, Parser)]
#[command(name = "cnx")]
#[command(about = "Assemble Connections-style puzzles from a category corpus")]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a batch of puzzle assembly attempts and append them to a report
    Generate(GenerateArgs),
    /// Re-order the groups of each run in a report from easiest to hardest
    Rank(RankArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Corpus root laid out as <main_type>/<subtype>/*.csv
    #[arg(long, default_value = "datasets")]
    corpus: PathBuf,

    /// JSON subtype weight table; built-in weights when absent
    #[arg(long)]
    weights: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::FalseGroup)]
    mode: Mode,

    #[arg(short = 'n', long, default_value_t = 5)]
    runs: usize,

    /// Base seed; run i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Whole-attempt retry cap for false groups
    #[arg(long, default_value_t = MAX_ATTEMPTS)]
    max_attempts: usize,

    /// Main type that opens an overlap chain
    #[arg(long, default_value = "meaning")]
    first_type: String,

    /// Main type that alternates with --first-type
    #[arg(long, default_value = "form")]
    second_type: String,

    /// Report file, appended to
    #[arg(short, long, default_value = "puzzles.txt")]
    output: PathBuf,

    /// Also store complete puzzles in this SQLite database
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RankArgs {
    /// Report produced by `cnx generate`
    #[arg(long)]
    report: PathBuf,

    /// JSON embedding table: {"dim": N, "fallback": [...], "vectors": {...}}
    #[arg(long)]
    embeddings: PathBuf,

    #[arg(short, long, default_value = "puzzles_ranked.txt")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .parse_default_env()
        .init();

    match cli.command {
        Command::Generate(args) => generate(args),
        Command::Rank(args) => rank(args),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    if args.first_type == args.second_type {
        anyhow::bail!("--first-type and --second-type must differ");
    }

    let (corpus, _) = load_corpus(&args.corpus)
        .with_context(|| format!("loading corpus from {}", args.corpus.display()))?;
    let weights = match &args.weights {
        Some(path) => SubtypeWeights::from_path(path)?,
        None => SubtypeWeights::default(),
    };

    let store = args
        .db
        .as_deref()
        .map(PuzzleStore::open)
        .transpose()
        .context("opening puzzle database")?;
    let corpus_hash = store.as_ref().map(|_| corpus.fingerprint());

    let config = BatchConfig {
        mode: args.mode,
        runs: args.runs,
        seed: args.seed,
        threads: args.threads,
        false_group: FalseGroupConfig {
            max_attempts: args.max_attempts,
        },
        overlap: OverlapConfig {
            first: args.first_type,
            second: args.second_type,
        },
    };

    let mut writer = ReportWriter::append(&args.output)
        .with_context(|| format!("opening report {}", args.output.display()))?;
    let mut stored = 0usize;
    let summary = BatchDriver::new(&corpus, &weights, config).run(|record| {
        writer.write_record(record)?;
        if record.status != RunStatus::Complete {
            return Ok(());
        }
        if let Err(violation) = validate_puzzle(&corpus, &record.puzzle) {
            warn!("run {} failed validation: {violation}", record.run);
            return Ok(());
        }
        if let Some(store) = &store {
            if store.insert(&record.puzzle, corpus_hash.as_deref())? {
                stored += 1;
            }
        }
        Ok(())
    })?;

    info!(
        "complete puzzles: {}/{} (base seed {}); report appended to {}",
        summary.complete,
        summary.runs,
        summary.base_seed,
        args.output.display()
    );
    if store.is_some() {
        info!("stored {stored} new puzzle(s)");
    }
    Ok(())
}

fn rank(args: RankArgs) -> Result<()> {
    let text = fs::read_to_string(&args.report)
        .with_context(|| format!("reading report {}", args.report.display()))?;
    let runs = report::parse_report(&text)?;
    let oracle = EmbeddingTable::from_path(&args.embeddings)
        .with_context(|| format!("loading embeddings from {}", args.embeddings.display()))?;

    let mut out = String::new();
    for run in &runs {
        let groups: Vec<(String, Vec<String>)> = run
            .groups
            .iter()
            .map(|g| (g.category.clone(), g.words.clone()))
            .collect();
        out.push_str(&report::render_ranked_block(run, &rank_groups(&groups, &oracle)));
    }
    fs::write(&args.output, out)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("ranked {} run(s) into {}", runs.len(), args.output.display());
    Ok(())
}
