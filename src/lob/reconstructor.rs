//! Offer book reconstruction engine.
//!
//! Replay runs in two phases:
//!
//! 1. Each instrument partition is replayed in order against its own
//!    [`OfferBook`](super::OfferBook). OFFERING rows mutate the book and
//!    record the ranked view; trade rows only record their kind.
//! 2. A single sequential fold over global row order resolves trade rows:
//!    a PURCHASE that follows a different instrument resets to an all-absent
//!    snapshot, every other trade row copies the previous row's snapshot.
//!
//! The fold state ([`CarryState`]) is passed in and returned explicitly, so
//! phase 1 has no cross-instrument coupling at all.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::multi_instrument::MultiInstrumentBooks;
use crate::error::{ReconError, Result};
use crate::output::SnapshotSink;
use crate::partition::{is_contiguous, partition_by_instrument};
use crate::source::EventSource;
use crate::types::{Event, Offer, OrderType, RowSnapshot, Snapshot, DEFAULT_DEPTH};
use crate::warnings::{WarningCategory, WarningTracker, WarningTrackerConfig};

/// Which "previous row" a trade row copies its snapshot from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarryForwardPolicy {
    /// The immediately preceding row of the whole batch, whatever its
    /// instrument; PURCHASE resets when that row is another instrument
    #[default]
    GlobalPrevious,

    /// The instrument's own preceding row; PURCHASE resets when it opens
    /// the instrument's sequence. Partitions become fully independent.
    SameInstrument,
}

/// Configuration for replay behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Number of ranked offers per snapshot
    pub depth: usize,

    /// Carry-forward reference for trade rows
    pub carry_forward: CarryForwardPolicy,

    /// Whether to validate events before replay
    pub validate_events: bool,

    /// Whether to keep a warning ledger
    pub track_warnings: bool,

    /// Whether recorded warnings are also logged
    pub log_warnings: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            carry_forward: CarryForwardPolicy::GlobalPrevious,
            validate_events: true,
            track_warnings: true,
            log_warnings: true,
        }
    }
}

impl ReplayConfig {
    /// Create a new config with the given snapshot depth.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            ..Default::default()
        }
    }

    /// Set carry-forward policy.
    pub fn with_carry_forward(mut self, policy: CarryForwardPolicy) -> Self {
        self.carry_forward = policy;
        self
    }

    /// Enable/disable event validation.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_events = validate;
        self
    }

    /// Enable/disable the warning ledger.
    pub fn with_warnings(mut self, track: bool) -> Self {
        self.track_warnings = track;
        self
    }

    /// Enable/disable warning logs.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 {
            return Err(ReconError::Config("depth must be at least 1".into()));
        }
        Ok(())
    }
}

/// What phase 1 recorded for a row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// OFFERING row: ranked view after the mutation
    Quoted(Snapshot),
    /// Trade row awaiting carry-forward resolution
    Trade(OrderType),
    /// Unrecognized kind: no snapshot written
    Untouched,
}

/// How phase 2 resolved a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Quoted,
    Reset,
    Carried,
    Untouched,
}

/// Fold state carried between rows in phase 2.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarryState<'a> {
    /// Instrument of the previous row
    pub instrument: Option<&'a str>,
    /// Snapshot emitted for the previous row
    pub snapshot: RowSnapshot,
}

/// Resolve one row given the state left by its predecessor.
///
/// Returns the state for the next row, the row's snapshot and how it was
/// resolved.
pub fn carry_forward<'a>(
    state: CarryState<'a>,
    event: &'a Event,
    outcome: RowOutcome,
    depth: usize,
) -> (CarryState<'a>, RowSnapshot, Resolution) {
    let (snapshot, resolution) = match outcome {
        RowOutcome::Quoted(snapshot) => (Some(snapshot), Resolution::Quoted),
        RowOutcome::Trade(OrderType::Purchase)
            if state.instrument != Some(event.cusip.as_str()) =>
        {
            (Some(Snapshot::empty(depth)), Resolution::Reset)
        }
        RowOutcome::Trade(_) => (state.snapshot, Resolution::Carried),
        RowOutcome::Untouched => (None, Resolution::Untouched),
    };

    let next = CarryState {
        instrument: Some(event.cusip.as_str()),
        snapshot: snapshot.clone(),
    };

    (next, snapshot, resolution)
}

/// Statistics for one replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayStats {
    /// Total rows replayed
    pub rows: u64,

    /// OFFERING rows
    pub quote_events: u64,

    /// OFFERING inserts/updates
    pub upserts: u64,

    /// OFFERING deletes
    pub deletes: u64,

    /// Upserts that replaced a resting offer
    pub replaced: u64,

    /// Deletes that found nothing to remove
    pub missed_deletes: u64,

    /// Trade rows
    pub trade_events: u64,

    /// Trade rows that copied the previous snapshot
    pub carried: u64,

    /// PURCHASE rows that reset to all-absent
    pub resets: u64,

    /// Rows with an unrecognized kind
    pub untouched_rows: u64,

    /// Distinct instruments
    pub instruments: usize,

    /// Largest single book seen
    pub peak_book_size: usize,
}

/// Reconstructs per-row top-N offer snapshots from an ordered event batch.
///
/// # Example
/// ```
/// use offer_book_reconstructor::{Event, OrderType, ReconstructionEngine};
///
/// let events = vec![
///     Event::offering(0, "X", "q1", 101.0, 500.0, "7", "09:30:00"),
///     Event::trade(1, "X", OrderType::Sale, "09:31:00"),
///     Event::delete(2, "X", "q1", "09:32:00"),
/// ];
///
/// let mut engine = ReconstructionEngine::new(10);
/// let snapshots = engine.replay(&events).unwrap();
///
/// assert_eq!(snapshots[0].as_ref().unwrap().best().unwrap().price, 101.0);
/// assert_eq!(snapshots[1], snapshots[0]);
/// assert!(snapshots[2].as_ref().unwrap().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ReconstructionEngine {
    config: ReplayConfig,

    /// One book per instrument
    books: MultiInstrumentBooks,

    stats: ReplayStats,

    warnings: WarningTracker,
}

impl ReconstructionEngine {
    /// Create an engine emitting `depth`-slot snapshots.
    pub fn new(depth: usize) -> Self {
        Self::with_config(ReplayConfig::new(depth))
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: ReplayConfig) -> Self {
        let warnings = WarningTracker::with_config(WarningTrackerConfig {
            log_warnings: config.log_warnings,
            ..Default::default()
        });

        Self {
            books: MultiInstrumentBooks::new(config.depth),
            config,
            stats: ReplayStats::default(),
            warnings,
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.config.depth
    }

    #[inline]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Statistics of the last replay.
    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    /// Warnings recorded during the last replay.
    pub fn warnings(&self) -> &WarningTracker {
        &self.warnings
    }

    /// Books as they stand after the last replay.
    pub fn books(&self) -> &MultiInstrumentBooks {
        &self.books
    }

    /// Replay a batch and return one snapshot per event, in input order.
    ///
    /// Each call starts from empty books, so replaying the same batch twice
    /// yields identical output.
    ///
    /// # Errors
    /// - `OutOfOrder` if row positions are not strictly increasing
    /// - `MalformedRecord` if validation is enabled and an event is incomplete
    pub fn replay(&mut self, events: &[Event]) -> Result<Vec<RowSnapshot>> {
        self.reset();
        self.config.validate()?;
        check_order(events)?;

        if self.config.validate_events {
            for event in events {
                event.validate()?;
            }
        }

        let partitions = partition_by_instrument(events);
        self.stats.instruments = partitions.len();

        // Phase 1: per-instrument replay
        let mut outcomes = vec![RowOutcome::Untouched; events.len()];
        for positions in partitions.values() {
            for &pos in positions {
                outcomes[pos] = self.apply_event(&events[pos])?;
            }
        }

        // Phase 2: carry-forward in global order
        let snapshots = match self.config.carry_forward {
            CarryForwardPolicy::GlobalPrevious => {
                if !is_contiguous(events) {
                    log::warn!(
                        "Instrument rows are interleaved; trade rows may copy another instrument's snapshot"
                    );
                }
                self.resolve_global(events, outcomes)
            }
            CarryForwardPolicy::SameInstrument => self.resolve_per_instrument(events, outcomes),
        };

        log::info!(
            "Replayed {} rows across {} instruments: {} quotes, {} trades ({} carried, {} resets), {} untouched",
            self.stats.rows,
            self.stats.instruments,
            self.stats.quote_events,
            self.stats.trade_events,
            self.stats.carried,
            self.stats.resets,
            self.stats.untouched_rows
        );

        Ok(snapshots)
    }

    /// Replay a batch and hand each `(row, snapshot)` pair to `sink` in order.
    ///
    /// Returns the number of rows emitted.
    pub fn replay_into<S: SnapshotSink>(&mut self, events: &[Event], sink: &mut S) -> Result<usize> {
        let snapshots = self.replay(events)?;
        for (event, snapshot) in events.iter().zip(&snapshots) {
            sink.accept(event.row, snapshot)?;
        }
        Ok(snapshots.len())
    }

    /// Drain a source and replay its events.
    pub fn replay_source<S: EventSource>(&mut self, source: S) -> Result<(Vec<Event>, Vec<RowSnapshot>)> {
        let events: Vec<Event> = source.events()?.collect();
        let snapshots = self.replay(&events)?;
        Ok((events, snapshots))
    }

    /// Reset books, statistics and warnings.
    pub fn reset(&mut self) {
        self.books = MultiInstrumentBooks::new(self.config.depth);
        self.stats = ReplayStats::default();
        self.warnings.clear();
    }

    /// Apply one event to its instrument's book (phase 1).
    fn apply_event(&mut self, event: &Event) -> Result<RowOutcome> {
        self.stats.rows += 1;

        match &event.order_type {
            OrderType::Offering => {
                self.stats.quote_events += 1;
                let identifier = event
                    .identifier
                    .as_deref()
                    .ok_or_else(|| ReconError::malformed(event.row, "identifier", "is missing"))?;

                if event.action.is_delete() {
                    self.stats.deletes += 1;
                    if self.books.remove(&event.cusip, identifier).is_none() {
                        self.stats.missed_deletes += 1;
                        self.warn(
                            WarningCategory::UnknownIdentifier,
                            format!("delete for {identifier} which is not resting on {}", event.cusip),
                            event,
                            Some(identifier),
                        );
                    }
                } else {
                    self.stats.upserts += 1;
                    let offer = Offer::from_event(event)?;
                    if self.books.upsert(&event.cusip, offer).is_some() {
                        self.stats.replaced += 1;
                        self.warn(
                            WarningCategory::DuplicateIdentifier,
                            format!("{identifier} re-quoted on {}; replaced resting offer", event.cusip),
                            event,
                            Some(identifier),
                        );
                    }
                }

                let book_size = self.books.book(&event.cusip).map_or(0, |b| b.len());
                self.stats.peak_book_size = self.stats.peak_book_size.max(book_size);

                Ok(RowOutcome::Quoted(self.books.snapshot(&event.cusip)?))
            }
            kind if kind.is_trade() => {
                self.stats.trade_events += 1;
                Ok(RowOutcome::Trade(kind.clone()))
            }
            kind => {
                self.stats.untouched_rows += 1;
                self.warn(
                    WarningCategory::UnrecognizedOrderType,
                    format!("unrecognized order type '{kind}'; no snapshot written"),
                    event,
                    None,
                );
                Ok(RowOutcome::Untouched)
            }
        }
    }

    fn resolve_global(&mut self, events: &[Event], outcomes: Vec<RowOutcome>) -> Vec<RowSnapshot> {
        let depth = self.config.depth;
        let mut state = CarryState::default();
        let mut snapshots = Vec::with_capacity(events.len());

        for (event, outcome) in events.iter().zip(outcomes) {
            let (next, snapshot, resolution) = carry_forward(state, event, outcome, depth);
            self.note_resolution(event, resolution);
            snapshots.push(snapshot);
            state = next;
        }

        snapshots
    }

    fn resolve_per_instrument(
        &mut self,
        events: &[Event],
        outcomes: Vec<RowOutcome>,
    ) -> Vec<RowSnapshot> {
        let depth = self.config.depth;
        let mut states: AHashMap<&str, CarryState<'_>> = AHashMap::new();
        let mut snapshots = Vec::with_capacity(events.len());

        for (event, outcome) in events.iter().zip(outcomes) {
            let state = states.remove(event.cusip.as_str()).unwrap_or_default();
            let (next, snapshot, resolution) = carry_forward(state, event, outcome, depth);
            self.note_resolution(event, resolution);
            snapshots.push(snapshot);
            states.insert(event.cusip.as_str(), next);
        }

        snapshots
    }

    fn note_resolution(&mut self, event: &Event, resolution: Resolution) {
        match resolution {
            Resolution::Carried => self.stats.carried += 1,
            Resolution::Reset => {
                self.stats.resets += 1;
                self.warn(
                    WarningCategory::BookReset,
                    format!("PURCHASE opened {}; snapshot reset", event.cusip),
                    event,
                    None,
                );
            }
            Resolution::Quoted | Resolution::Untouched => {}
        }
    }

    fn warn(
        &mut self,
        category: WarningCategory,
        message: String,
        event: &Event,
        identifier: Option<&str>,
    ) {
        if self.config.track_warnings {
            self.warnings
                .record_offer_warning(category, message, event.row, &event.cusip, identifier);
        }
    }
}

/// Row positions must be strictly increasing.
fn check_order(events: &[Event]) -> Result<()> {
    for pair in events.windows(2) {
        if pair[1].row <= pair[0].row {
            return Err(ReconError::OutOfOrder {
                previous: pair[0].row,
                row: pair[1].row,
            });
        }
    }
    Ok(())
}
