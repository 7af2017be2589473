//! Multi-instrument offer book manager.
//!
//! Holds one [`OfferBook`] per instrument. The reconstruction engine uses it
//! as its book store; it can also be driven directly for ad-hoc replay.

use ahash::AHashMap;

use super::offer_book::OfferBook;
use crate::error::{ReconError, Result};
use crate::types::{Offer, Snapshot};

/// Multi-instrument offer book manager.
///
/// # Example
/// ```
/// use offer_book_reconstructor::{MultiInstrumentBooks, Offer};
///
/// let mut books = MultiInstrumentBooks::new(10);
/// books.upsert("64971XAB4", Offer::new("q1", 101.25, 500.0, "7", 0, "09:30:00"));
/// books.upsert("13063DAD0", Offer::new("q1", 99.75, 250.0, "9", 1, "09:30:05"));
///
/// let snapshot = books.snapshot("64971XAB4").unwrap();
/// assert_eq!(snapshot.best().map(|l| l.price), Some(101.25));
/// ```
#[derive(Debug, Clone)]
pub struct MultiInstrumentBooks {
    /// Depth of emitted snapshots
    depth: usize,

    /// instrument -> book
    books: AHashMap<String, OfferBook>,

    stats: MultiInstrumentStats,
}

/// Statistics for multi-instrument processing.
#[derive(Debug, Clone, Default)]
pub struct MultiInstrumentStats {
    /// Total instruments tracked
    pub instrument_count: usize,

    /// Total book mutations across all instruments
    pub total_mutations: u64,

    /// Mutations per instrument
    pub mutations_per_instrument: AHashMap<String, u64>,
}

impl MultiInstrumentBooks {
    /// Create a new manager emitting `depth`-slot snapshots.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            books: AHashMap::new(),
            stats: MultiInstrumentStats::default(),
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Start tracking an instrument.
    ///
    /// Errors if the instrument is already tracked.
    pub fn add_instrument(&mut self, instrument: impl Into<String>) -> Result<()> {
        let instrument = instrument.into();

        if self.books.contains_key(&instrument) {
            return Err(ReconError::generic(format!(
                "Instrument {} already exists",
                instrument
            )));
        }

        self.books.insert(instrument.clone(), OfferBook::new());
        self.stats.instrument_count = self.books.len();
        self.stats.mutations_per_instrument.insert(instrument, 0);

        Ok(())
    }

    /// Stop tracking an instrument.
    pub fn remove_instrument(&mut self, instrument: &str) -> Result<()> {
        if self.books.remove(instrument).is_none() {
            return Err(ReconError::generic(format!(
                "Instrument not found: {instrument}"
            )));
        }

        self.stats.instrument_count = self.books.len();
        self.stats.mutations_per_instrument.remove(instrument);

        Ok(())
    }

    /// Book for an instrument, created empty on first use.
    pub fn book_mut(&mut self, instrument: &str) -> &mut OfferBook {
        if !self.books.contains_key(instrument) {
            self.stats.instrument_count = self.books.len() + 1;
        }
        self.books.entry(instrument.to_string()).or_default()
    }

    /// Book for an instrument, if tracked.
    pub fn book(&self, instrument: &str) -> Option<&OfferBook> {
        self.books.get(instrument)
    }

    /// Insert or replace an offer on an instrument's book.
    ///
    /// Same sequence-uniqueness rule as [`OfferBook::upsert`].
    pub fn upsert(&mut self, instrument: &str, offer: Offer) -> Option<Offer> {
        let replaced = self.book_mut(instrument).upsert(offer);
        self.count_mutation(instrument);
        replaced
    }

    /// Remove an offer from an instrument's book. No-op when absent.
    pub fn remove(&mut self, instrument: &str, identifier: &str) -> Option<Offer> {
        let removed = self.book_mut(instrument).remove(identifier);
        self.count_mutation(instrument);
        removed
    }

    /// Record a mutation applied through [`book_mut`](Self::book_mut).
    pub fn count_mutation(&mut self, instrument: &str) {
        self.stats.total_mutations += 1;
        *self
            .stats
            .mutations_per_instrument
            .entry(instrument.to_string())
            .or_insert(0) += 1;
    }

    /// Current snapshot for an instrument.
    pub fn snapshot(&self, instrument: &str) -> Result<Snapshot> {
        self.books
            .get(instrument)
            .map(|book| book.snapshot(self.depth))
            .ok_or_else(|| ReconError::generic(format!("Instrument not found: {instrument}")))
    }

    /// Empty one instrument's book.
    pub fn reset_instrument(&mut self, instrument: &str) -> Result<()> {
        let book = self
            .books
            .get_mut(instrument)
            .ok_or_else(|| ReconError::generic(format!("Instrument not found: {instrument}")))?;

        book.clear();

        Ok(())
    }

    /// Drop every instrument and reset statistics.
    pub fn clear(&mut self) {
        self.books.clear();
        self.stats = MultiInstrumentStats::default();
    }

    /// Tracked instruments (unordered).
    pub fn instruments(&self) -> Vec<&str> {
        self.books.keys().map(|s| s.as_str()).collect()
    }

    pub fn instrument_count(&self) -> usize {
        self.books.len()
    }

    /// Total offers resting across all books.
    pub fn total_offers(&self) -> usize {
        self.books.values().map(OfferBook::len).sum()
    }

    pub fn stats(&self) -> &MultiInstrumentStats {
        &self.stats
    }

    pub fn has_instrument(&self, instrument: &str) -> bool {
        self.books.contains_key(instrument)
    }
}
