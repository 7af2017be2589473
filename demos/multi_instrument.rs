//! Multi-instrument example.
//!
//! Shows the PURCHASE reset at an instrument boundary and how the two
//! carry-forward policies differ on an interleaved batch.
//!
//! Run with: cargo run --example multi_instrument

use offer_book_reconstructor::{
    CarryForwardPolicy, Event, MultiInstrumentBooks, Offer, OrderType, ReconstructionEngine,
    ReplayConfig, RowSnapshot,
};

fn describe(snapshot: &RowSnapshot) -> String {
    match snapshot {
        None => "none".to_string(),
        Some(s) if s.is_empty() => "empty".to_string(),
        Some(s) => format!("{:?}", s.prices()),
    }
}

fn main() {
    println!("=================================================================");
    println!("Offer Book Reconstructor - Multi-Instrument Example");
    println!("=================================================================\n");

    // Direct use of the per-instrument books
    let mut books = MultiInstrumentBooks::new(10);
    books.upsert("13063DAD0", Offer::new("A1", 99.50, 100_000.0, "3", 0, "10:00:00"));
    books.upsert("13063DAD0", Offer::new("A2", 99.25, 50_000.0, "8", 1, "10:00:05"));
    books.upsert("64971XAB4", Offer::new("B1", 101.00, 75_000.0, "3", 2, "10:00:10"));

    println!("Books:");
    let mut instruments = books.instruments();
    instruments.sort();
    for instrument in instruments {
        let snapshot = books.snapshot(instrument).unwrap();
        println!("  {}: {:?}", instrument, snapshot.prices());
    }
    println!("  Total offers: {}\n", books.total_offers());

    // Interleaved batch
    let events = vec![
        Event::offering(0, "13063DAD0", "A1", 99.50, 100_000.0, "3", "10:00:00"),
        Event::offering(1, "64971XAB4", "B1", 101.00, 75_000.0, "3", "10:00:10"),
        Event::trade(2, "13063DAD0", OrderType::Purchase, "10:01:00"),
        Event::trade(3, "13063DAD0", OrderType::Sale, "10:02:00"),
        Event::trade(4, "64971XAB4", OrderType::Sale, "10:03:00"),
    ];

    for policy in [
        CarryForwardPolicy::GlobalPrevious,
        CarryForwardPolicy::SameInstrument,
    ] {
        let config = ReplayConfig::new(10).with_carry_forward(policy);
        let mut engine = ReconstructionEngine::with_config(config);
        let snapshots = engine.replay(&events).unwrap();

        println!("{:?}:", policy);
        for (event, snapshot) in events.iter().zip(&snapshots) {
            println!(
                "  row {} {:<9} {:<9} -> {}",
                event.row,
                event.cusip,
                event.order_type,
                describe(snapshot)
            );
        }
        println!("  resets: {}\n", engine.stats().resets);
    }

    println!("✓ Example complete!");
}
