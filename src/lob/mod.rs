//! Offer book reconstruction module.
//!
//! Per-instrument offer books and the replay engine that turns an event log
//! into row-aligned snapshots.

mod multi_instrument;
pub mod offer_book;
pub mod reconstructor;

pub use multi_instrument::{MultiInstrumentBooks, MultiInstrumentStats};
pub use offer_book::OfferBook;
pub use reconstructor::{
    carry_forward, CarryForwardPolicy, CarryState, ReconstructionEngine, ReplayConfig,
    ReplayStats, Resolution, RowOutcome,
};
