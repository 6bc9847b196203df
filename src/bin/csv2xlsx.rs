//! csv2xlsx: merge a WildRank CSV export into a spreadsheet with one sheet
//! per result kind.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wildrank_server::merge::{
    self, merge_export, policy::parse_answer, Conflict, ConflictPolicy, CsvExport, MergeEvent,
    PromptConflicts, ReplaceConflicts, SkipConflicts, Workbook,
};

#[derive(Parser)]
#[command(name = "csv2xlsx")]
#[command(about = "Merge a WildRank CSV export into an xlsx workbook")]
struct Cli {
    /// CSV export to merge
    csv: PathBuf,

    /// Existing workbook to merge into; a fresh one is created if omitted
    workbook: Option<PathBuf>,

    /// Output workbook
    #[arg(short, long, default_value = merge::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Replace conflicting rows without asking
    #[arg(long, conflicts_with = "no_prompt")]
    replace: bool,

    /// Keep existing rows on conflict without asking
    #[arg(long)]
    no_prompt: bool,
}

fn ask_on_stdin(conflict: &Conflict<'_>) -> Option<bool> {
    println!("found 2 different versions of row {}", conflict.key);
    println!("old: {:?}", conflict.old);
    println!("new: {:?}", conflict.new);
    print!("Replace existing row? [y/N] ");
    io::stdout().flush().ok()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).ok()?;
    parse_answer(&answer)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wildrank_server=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let export = CsvExport::from_path(&cli.csv)
        .with_context(|| format!("Failed to read {}", cli.csv.display()))?;
    let mut workbook = match &cli.workbook {
        Some(path) => merge::xlsx::read_workbook(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Workbook::new(),
    };

    let mut policy: Box<dyn ConflictPolicy> = if cli.replace {
        Box::new(ReplaceConflicts)
    } else if cli.no_prompt {
        Box::new(SkipConflicts)
    } else {
        Box::new(PromptConflicts::new(ask_on_stdin))
    };

    let report = merge_export(&mut workbook, &export, policy.as_mut());
    for event in &report.events {
        match event {
            MergeEvent::AlreadyExists { key, .. } => println!("{} already exists, skipping", key),
            MergeEvent::ColumnPruned { sheet, column } => {
                println!("Deleting empty column from {} - {}", sheet, column)
            }
            _ => {}
        }
    }

    merge::xlsx::write_workbook(&workbook, &cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    println!(
        "{}: {} added, {} duplicate, {} conflicting ({} replaced), {} skipped",
        cli.output.display(),
        report.appended(),
        report.duplicates(),
        report.conflicts(),
        report.replaced(),
        report.unrouted()
    );
    Ok(())
}
