//! Per-instrument book of resting offers.
//!
//! Offers are kept fully ranked in a `BTreeMap` keyed by
//! `(price, sequence)` with an identifier index on the side, so:
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `upsert`  | O(log n) |
//! | `remove`  | O(log n) |
//! | `top_k`   | O(k) |
//!
//! The book itself is unbounded. Depth applies only to the emitted view, so
//! offers ranked below the cut stay tracked and are promoted when a better
//! offer is removed.

use ahash::AHashMap;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::{Offer, Snapshot};

/// Ranking key: lower price first, then earlier sequence index.
#[derive(Debug, Clone, Copy)]
struct RankKey {
    price: f64,
    sequence: usize,
}

impl RankKey {
    #[inline]
    fn of(offer: &Offer) -> Self {
        // -0.0 and 0.0 are the same price; only the sequence may split them
        let price = if offer.price == 0.0 { 0.0 } else { offer.price };
        Self {
            price,
            sequence: offer.sequence,
        }
    }
}

impl Ord for RankKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .total_cmp(&other.price)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for RankKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

/// Mutable set of active offers for one instrument, keyed by identifier.
///
/// # Invariant
///
/// `index` and `ranked` always describe the same offers: at most one offer
/// per identifier, each stored under its own rank key.
#[derive(Debug, Clone, Default)]
pub struct OfferBook {
    /// Offers in rank order
    ranked: BTreeMap<RankKey, Offer>,

    /// identifier -> rank key
    index: AHashMap<String, RankKey>,
}

impl OfferBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an offer, replacing any offer with the same identifier.
    ///
    /// Returns the replaced offer, if there was one.
    ///
    /// Sequence indices must be unique per book. An offer whose
    /// `(price, sequence)` is already held by a different identifier is not
    /// inserted.
    pub fn upsert(&mut self, offer: Offer) -> Option<Offer> {
        let replaced = self.remove(&offer.identifier);

        let key = RankKey::of(&offer);
        if self.ranked.contains_key(&key) {
            log::warn!(
                "Sequence index {} reused at price {}; offer {} not inserted",
                offer.sequence,
                offer.price,
                offer.identifier
            );
            return replaced;
        }

        self.index.insert(offer.identifier.clone(), key);
        self.ranked.insert(key, offer);

        replaced
    }

    /// Remove the offer with this identifier. No-op when absent.
    pub fn remove(&mut self, identifier: &str) -> Option<Offer> {
        let key = self.index.remove(identifier)?;
        self.ranked.remove(&key)
    }

    /// The `k` best offers by `(price asc, sequence asc)`.
    ///
    /// Returns fewer than `k` when the book holds fewer offers.
    pub fn top_k(&self, k: usize) -> Vec<&Offer> {
        self.ranked.values().take(k).collect()
    }

    /// Ranked view with exactly `depth` slots.
    pub fn snapshot(&self, depth: usize) -> Snapshot {
        Snapshot::from_ranked(self.ranked.values(), depth)
    }

    /// Best offer.
    #[inline]
    pub fn best(&self) -> Option<&Offer> {
        self.ranked.values().next()
    }

    /// Look up an offer by identifier.
    pub fn get(&self, identifier: &str) -> Option<&Offer> {
        self.index
            .get(identifier)
            .and_then(|key| self.ranked.get(key))
    }

    /// Check if an identifier is resting in the book.
    #[inline]
    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Number of active offers.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All offers in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &Offer> {
        self.ranked.values()
    }

    /// Drop every offer.
    pub fn clear(&mut self) {
        self.ranked.clear();
        self.index.clear();
    }
}
