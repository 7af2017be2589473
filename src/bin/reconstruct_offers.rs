//! CLI tool for annotating a quote/trade CSV with top-N offer snapshots.
//!
//! # Usage
//!
//! ```bash
//! # Default run: top 10, counterparty 99 only, admin columns dropped
//! cargo run --release --bin reconstruct_offers -- \
//!     --input data/quotes.csv \
//!     --output data/offers.csv
//!
//! # Keep every row and export the warning ledger
//! cargo run --release --bin reconstruct_offers -- \
//!     --input data/quotes.csv \
//!     --output data/offers.csv \
//!     --no-filter --warnings data/warnings.json
//!
//! # Settings from a JSON file, overridden on the command line
//! cargo run --release --bin reconstruct_offers -- \
//!     --input data/quotes.csv --output data/offers.csv \
//!     --config pipeline.json --depth 5
//! ```

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use offer_book_reconstructor::{
    CarryForwardPolicy, CsvSnapshotWriter, CsvSource, PipelineConfig, ReconstructionEngine, Result,
};

/// Rebuild the best offers resting at every row of a quote/trade log
#[derive(Parser, Debug)]
#[command(name = "reconstruct_offers")]
#[command(about = "Annotate each row of a bond quote/trade CSV with the top offers on its cusip")]
struct Args {
    /// Input CSV with the quote/trade event log
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path
    #[arg(short, long)]
    output: PathBuf,

    /// JSON pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep only rows from this counterparty
    #[arg(long)]
    company: Option<String>,

    /// Number of ranked offers per snapshot
    #[arg(short, long)]
    depth: Option<usize>,

    /// Trade rows copy the snapshot of their own instrument's previous row
    #[arg(long)]
    same_instrument_carry: bool,

    /// Write every row regardless of counterparty
    #[arg(long, conflicts_with = "company")]
    no_filter: bool,

    /// Export the warning ledger as JSON
    #[arg(short, long)]
    warnings: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(depth) = args.depth {
        config = config.with_depth(depth);
    }
    if args.same_instrument_carry {
        config.replay.carry_forward = CarryForwardPolicy::SameInstrument;
    }
    if let Some(company) = &args.company {
        config.output.target_company_id = Some(company.clone());
    }
    if args.no_filter {
        config.output.target_company_id = None;
    }

    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    let start = Instant::now();

    let (table, events) = CsvSource::from_path(&args.input)?.into_parts()?;
    println!("Loaded {} rows from {}", table.len(), args.input.display());

    let mut engine = ReconstructionEngine::with_config(config.replay.clone());
    let snapshots = engine.replay(&events)?;

    let stats = engine.stats();
    println!(
        "Replayed {} instruments: {} quotes, {} trades, {} resets",
        stats.instruments, stats.quote_events, stats.trade_events, stats.resets
    );

    let written = CsvSnapshotWriter::new(config.output).write_to_path(&table, &snapshots, &args.output)?;
    println!(
        "Wrote {} of {} rows to {}",
        written.rows_written,
        written.rows_in,
        args.output.display()
    );

    if let Some(path) = &args.warnings {
        engine.warnings().export_to_file(path)?;
        println!(
            "Exported {} warnings to {}",
            engine.warnings().len(),
            path.display()
        );
    }

    println!("Done in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
