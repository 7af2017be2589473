//! # Offer-Book-Reconstructor
//!
//! Point-in-time top-N best offer reconstruction for municipal bond quote logs.
//!
//! The input is an ordered event log mixing dealer quote messages (OFFERING
//! inserts, updates and deletes) with trade prints (PURCHASE, SALE, ...)
//! across many instruments (`cusip`s). For every row the library rebuilds
//! the ranked view of the ten lowest-priced live offers on that row's
//! instrument, so each trade can be joined against the offers that were
//! resting when it printed.
//!
//! ## Features
//!
//! - **Per-instrument offer books**: ordered by price, ties broken by arrival
//! - **Fixed-depth snapshots**: always `depth` slots, absent ranks are `None`
//! - **Trade carry-forward**: trades inherit the preceding row's view
//! - **CSV in, CSV out**: counterparty filter and admin-column removal
//! - **Warning ledger**: duplicate or unknown quote ids, reset trades
//!
//! ## Quick Start
//!
//! ```rust
//! use offer_book_reconstructor::{Event, OrderType, ReconstructionEngine};
//!
//! let events = vec![
//!     Event::offering(0, "64971XAB4", "q1", 101.25, 500.0, "7", "09:30:00"),
//!     Event::offering(1, "64971XAB4", "q2", 100.50, 250.0, "9", "09:31:00"),
//!     Event::trade(2, "64971XAB4", OrderType::Sale, "09:32:00"),
//! ];
//!
//! let mut engine = ReconstructionEngine::new(10);
//! let snapshots = engine.replay(&events).unwrap();
//!
//! let sale = snapshots[2].as_ref().unwrap();
//! assert_eq!(sale.prices(), vec![100.50, 101.25]);
//! ```
//!
//! ### CSV Batches
//!
//! ```ignore
//! use offer_book_reconstructor::{CsvSnapshotWriter, CsvSource, PipelineConfig, ReconstructionEngine};
//!
//! let config = PipelineConfig::load_json("pipeline.json")?;
//! let (table, events) = CsvSource::from_path("quotes.csv")?.into_parts()?;
//!
//! let mut engine = ReconstructionEngine::with_config(config.replay.clone());
//! let snapshots = engine.replay(&events)?;
//!
//! CsvSnapshotWriter::new(config.output).write_to_path(&table, &snapshots, "offers.csv")?;
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `Event`, `OrderType`, `Offer`, `Snapshot`, `RowSnapshot` |
//! | [`lob`] | Books and replay: `OfferBook`, `MultiInstrumentBooks`, `ReconstructionEngine` |
//! | [`partition`] | Order-preserving grouping by instrument |
//! | [`source`] | Event sources: `CsvSource`, `VecSource`, `RawTable` |
//! | [`output`] | Snapshot sinks and `CsvSnapshotWriter` |
//! | [`config`] | `PipelineConfig` JSON configuration |
//! | [`warnings`] | Warning tracking: `WarningTracker`, `Warning`, `WarningCategory` |

pub mod config;
pub mod error;
pub mod lob;
pub mod output;
pub mod partition;
pub mod source;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{ReconError, Result};
pub use types::{
    Event, Offer, OfferLevel, OrderType, QuoteAction, RowSnapshot, Snapshot, DEFAULT_DEPTH,
};

// Re-exports - Reconstruction
pub use lob::{
    carry_forward, CarryForwardPolicy, CarryState, MultiInstrumentBooks, MultiInstrumentStats,
    OfferBook, ReconstructionEngine, ReplayConfig, ReplayStats, Resolution, RowOutcome,
};

// Re-exports - Input and output
pub use config::PipelineConfig;
pub use output::{
    company_matches, format_float, CsvSnapshotWriter, OutputConfig, PositionalSink, SnapshotColumns,
    SnapshotSink, WriteStats,
};
pub use partition::{is_contiguous, partition_by_instrument, Partitions};
pub use source::{CsvSource, EventSource, RawTable, SourceMetadata, VecSource};

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};
