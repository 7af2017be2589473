//! Basic usage example: one instrument, a handful of quotes and trades.
//!
//! Run with: cargo run --example basic_usage

use offer_book_reconstructor::{Event, OrderType, ReconstructionEngine, RowSnapshot};

fn print_row(event: &Event, snapshot: &RowSnapshot) {
    println!("Row {}: {} {}", event.row, event.order_type, event.cusip);
    match snapshot {
        None => println!("  (no snapshot)"),
        Some(s) if s.is_empty() => println!("  (no live offers)"),
        Some(s) => {
            for (rank, level) in s.levels().enumerate() {
                println!(
                    "  {:>2}. {:>8.3} x {:>8} dealer {} @ {}",
                    rank + 1,
                    level.price,
                    level.size,
                    level.dealer,
                    level.timestamp
                );
            }
        }
    }
    println!();
}

fn main() {
    println!("=================================================================");
    println!("Offer Book Reconstructor - Basic Usage Example");
    println!("=================================================================\n");

    let mut engine = ReconstructionEngine::new(10);
    println!("✓ Created engine (top 10 offers)\n");

    let events = vec![
        Event::offering(0, "64971XAB4", "Q1", 101.25, 500_000.0, "7", "09:30:00"),
        Event::offering(1, "64971XAB4", "Q2", 100.75, 250_000.0, "12", "09:31:10"),
        Event::offering(2, "64971XAB4", "Q3", 100.75, 100_000.0, "7", "09:32:45"),
        Event::trade(3, "64971XAB4", OrderType::Sale, "09:33:00").with_company_id("99"),
        Event::delete(4, "64971XAB4", "Q2", "09:35:20"),
        Event::offering(5, "64971XAB4", "Q1", 100.50, 500_000.0, "7", "09:36:00"),
        Event::trade(6, "64971XAB4", OrderType::Purchase, "09:40:00").with_company_id("99"),
    ];

    println!("Replaying {} events...\n", events.len());
    let snapshots = engine.replay(&events).unwrap();

    for (event, snapshot) in events.iter().zip(&snapshots) {
        print_row(event, snapshot);
    }

    println!("Statistics:");
    let stats = engine.stats();
    println!("  Rows: {}", stats.rows);
    println!("  Upserts: {} ({} replaced)", stats.upserts, stats.replaced);
    println!("  Deletes: {}", stats.deletes);
    println!("  Trades: {} ({} carried)", stats.trade_events, stats.carried);
    println!("  Peak book size: {}", stats.peak_book_size);
    println!("  Warnings: {}", engine.warnings().len());

    println!("\n✓ Example complete!");
}
