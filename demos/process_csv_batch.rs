//! CSV batch example.
//!
//! Reads a quote/trade CSV, replays it and writes the filtered, annotated
//! output next to it.
//!
//! Run with: cargo run --release --example process_csv_batch -- <input.csv> [output.csv]

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use offer_book_reconstructor::{
    CsvSnapshotWriter, CsvSource, PipelineConfig, ReconstructionEngine, WarningCategory,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let input = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: process_csv_batch <input.csv> [output.csv]");
            std::process::exit(1);
        }
    };
    let output = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| input.with_extension("offers.csv"));

    println!("=================================================================");
    println!("Offer Book Reconstructor - CSV Batch");
    println!("=================================================================\n");

    let config = PipelineConfig::default();
    let start = Instant::now();

    let (table, events) = CsvSource::from_path(&input)?.into_parts()?;
    println!("✓ Loaded {} rows ({} columns)", table.len(), table.headers().len());

    let mut engine = ReconstructionEngine::with_config(config.replay.clone());
    let snapshots = engine.replay(&events)?;
    println!("✓ Replayed in {:.3}s", start.elapsed().as_secs_f64());

    let stats = engine.stats();
    println!("\nReplay:");
    println!("  Instruments: {}", stats.instruments);
    println!("  Quote events: {}", stats.quote_events);
    println!("  Trade events: {}", stats.trade_events);
    println!("  Resets: {}", stats.resets);
    println!("  Untouched rows: {}", stats.untouched_rows);
    println!("  Peak book size: {}", stats.peak_book_size);

    let warnings = engine.warnings();
    println!("\nWarnings: {}", warnings.total_count());
    for category in [
        WarningCategory::DuplicateIdentifier,
        WarningCategory::UnknownIdentifier,
        WarningCategory::UnrecognizedOrderType,
        WarningCategory::BookReset,
    ] {
        println!("  {}: {}", category.name(), warnings.count_by_category(category));
    }

    let written = CsvSnapshotWriter::new(config.output).write_to_path(&table, &snapshots, &output)?;
    println!(
        "\n✓ Wrote {} of {} rows to {}",
        written.rows_written,
        written.rows_in,
        output.display()
    );

    Ok(())
}
