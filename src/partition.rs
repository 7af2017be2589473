//! Grouping of an ordered event batch by instrument.
//!
//! Partitions keep original relative order inside each instrument, and the
//! instruments themselves come out in first-appearance order. `IndexMap`
//! gives that ordering without relying on hash iteration order.

use indexmap::IndexMap;

use crate::types::Event;

/// Instrument -> ascending positions (into the event slice) of its events.
pub type Partitions<'a> = IndexMap<&'a str, Vec<usize>>;

/// Partition `events` by `cusip`, preserving order.
///
/// # Example
/// ```
/// use offer_book_reconstructor::partition::partition_by_instrument;
/// use offer_book_reconstructor::{Event, OrderType};
///
/// let events = vec![
///     Event::trade(0, "B", OrderType::Sale, "09:00:00"),
///     Event::trade(1, "A", OrderType::Sale, "09:00:01"),
///     Event::trade(2, "B", OrderType::Sale, "09:00:02"),
/// ];
///
/// let parts = partition_by_instrument(&events);
/// assert_eq!(parts.keys().copied().collect::<Vec<_>>(), vec!["B", "A"]);
/// assert_eq!(parts["B"], vec![0, 2]);
/// ```
pub fn partition_by_instrument(events: &[Event]) -> Partitions<'_> {
    let mut partitions: Partitions<'_> = IndexMap::new();
    for (pos, event) in events.iter().enumerate() {
        partitions.entry(event.cusip.as_str()).or_default().push(pos);
    }
    partitions
}

/// True when each instrument's rows form one contiguous run.
///
/// Carry-forward across instrument boundaries only means "the instrument's
/// own previous state" when this holds.
pub fn is_contiguous(events: &[Event]) -> bool {
    let mut closed: ahash::AHashSet<&str> = ahash::AHashSet::new();
    let mut current: Option<&str> = None;

    for event in events {
        let cusip = event.cusip.as_str();
        if current == Some(cusip) {
            continue;
        }
        if closed.contains(cusip) {
            return false;
        }
        if let Some(prev) = current {
            closed.insert(prev);
        }
        current = Some(cusip);
    }

    true
}
