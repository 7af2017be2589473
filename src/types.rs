//! Core data types for quote/trade events, resting offers and snapshots.
//!
//! These types are designed to be:
//! - Explicit about absence (no numeric sentinels for "no offer")
//! - Cheap to clone for carry-forward between rows
//! - Serializable for diagnostics and export

use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};

/// Number of ranked offers emitted per snapshot.
pub const DEFAULT_DEPTH: usize = 10;

/// Kind of event carried in the `order_type` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Dealer quote insert/update/delete
    Offering,
    /// Bid-wanted solicitation
    BidWanted,
    /// Bid submitted into a bid-wanted
    BwBid,
    /// Situation bid
    SituationBid,
    /// Inter-dealer trade
    Dealer,
    /// Customer purchase
    Purchase,
    /// Customer sale
    Sale,
    /// Anything else; passed through with no snapshot
    Other(String),
}

impl OrderType {
    /// Parse the raw `order_type` column value.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "OFFERING" => OrderType::Offering,
            "BID WANTED" => OrderType::BidWanted,
            "BW BID" => OrderType::BwBid,
            "SITUATION BID" => OrderType::SituationBid,
            "DEALER" => OrderType::Dealer,
            "PURCHASE" => OrderType::Purchase,
            "SALE" => OrderType::Sale,
            other => OrderType::Other(other.to_string()),
        }
    }

    /// Column representation.
    pub fn as_str(&self) -> &str {
        match self {
            OrderType::Offering => "OFFERING",
            OrderType::BidWanted => "BID WANTED",
            OrderType::BwBid => "BW BID",
            OrderType::SituationBid => "SITUATION BID",
            OrderType::Dealer => "DEALER",
            OrderType::Purchase => "PURCHASE",
            OrderType::Sale => "SALE",
            OrderType::Other(raw) => raw,
        }
    }

    /// Check if this event mutates the resting offer book.
    #[inline]
    pub fn is_quote(&self) -> bool {
        matches!(self, OrderType::Offering)
    }

    /// Check if this is a trade/solicitation event that carries a snapshot.
    #[inline]
    pub fn is_trade(&self) -> bool {
        matches!(
            self,
            OrderType::BidWanted
                | OrderType::BwBid
                | OrderType::SituationBid
                | OrderType::Dealer
                | OrderType::Purchase
                | OrderType::Sale
        )
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// What an OFFERING event does to the identified offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteAction {
    /// Insert, or replace the offer with the same identifier
    Upsert,
    /// Remove the offer with the same identifier
    Delete,
}

impl QuoteAction {
    /// Parse the raw `action` column value. Only `DELETE` removes.
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "DELETE" {
            QuoteAction::Delete
        } else {
            QuoteAction::Upsert
        }
    }

    #[inline]
    pub fn is_delete(self) -> bool {
        matches!(self, QuoteAction::Delete)
    }
}

/// One normalized input row.
///
/// `row` is the stable original row position and doubles as the offer
/// sequence index used for price tie-breaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Original zero-based data row position (sequence index)
    pub row: usize,

    /// Instrument identifier
    pub cusip: String,

    /// Event kind
    pub order_type: OrderType,

    /// Quote action (only meaningful for OFFERING)
    pub action: QuoteAction,

    /// Offer price
    pub price: Option<f64>,

    /// Offer size
    pub amount: Option<f64>,

    /// Quoting counterparty
    pub company_id: Option<String>,

    /// Resting quote key
    pub identifier: Option<String>,

    /// Normalized time of day, carried through unmodified
    pub time_stamp: String,
}

impl Event {
    /// Create an OFFERING insert/update event.
    pub fn offering(
        row: usize,
        cusip: impl Into<String>,
        identifier: impl Into<String>,
        price: f64,
        amount: f64,
        dealer: impl Into<String>,
        time_stamp: impl Into<String>,
    ) -> Self {
        Self {
            row,
            cusip: cusip.into(),
            order_type: OrderType::Offering,
            action: QuoteAction::Upsert,
            price: Some(price),
            amount: Some(amount),
            company_id: Some(dealer.into()),
            identifier: Some(identifier.into()),
            time_stamp: time_stamp.into(),
        }
    }

    /// Create an OFFERING delete event.
    pub fn delete(
        row: usize,
        cusip: impl Into<String>,
        identifier: impl Into<String>,
        time_stamp: impl Into<String>,
    ) -> Self {
        Self {
            row,
            cusip: cusip.into(),
            order_type: OrderType::Offering,
            action: QuoteAction::Delete,
            price: None,
            amount: None,
            company_id: None,
            identifier: Some(identifier.into()),
            time_stamp: time_stamp.into(),
        }
    }

    /// Create a non-quote event (trade, solicitation or unrecognized kind).
    pub fn trade(
        row: usize,
        cusip: impl Into<String>,
        order_type: OrderType,
        time_stamp: impl Into<String>,
    ) -> Self {
        Self {
            row,
            cusip: cusip.into(),
            order_type,
            action: QuoteAction::Upsert,
            price: None,
            amount: None,
            company_id: None,
            identifier: None,
            time_stamp: time_stamp.into(),
        }
    }

    /// Set the counterparty.
    pub fn with_company_id(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    /// Validate the fields the engine relies on.
    ///
    /// OFFERING rows need an identifier; non-delete OFFERING rows also need
    /// a finite price, a finite amount and a dealer.
    pub fn validate(&self) -> Result<()> {
        if self.cusip.trim().is_empty() {
            return Err(ReconError::malformed(self.row, "cusip", "is empty"));
        }

        if !self.order_type.is_quote() {
            return Ok(());
        }

        if self.identifier.as_deref().map_or(true, |id| id.trim().is_empty()) {
            return Err(ReconError::malformed(
                self.row,
                "identifier",
                "is required for OFFERING rows",
            ));
        }

        if self.action.is_delete() {
            return Ok(());
        }

        match self.price {
            Some(p) if p.is_finite() => {}
            Some(p) => {
                return Err(ReconError::malformed(
                    self.row,
                    "price",
                    format!("is not finite ({p})"),
                ))
            }
            None => {
                return Err(ReconError::malformed(
                    self.row,
                    "price",
                    "is required for OFFERING rows",
                ))
            }
        }

        match self.amount {
            Some(a) if a.is_finite() => {}
            Some(a) => {
                return Err(ReconError::malformed(
                    self.row,
                    "amount",
                    format!("is not finite ({a})"),
                ))
            }
            None => {
                return Err(ReconError::malformed(
                    self.row,
                    "amount",
                    "is required for OFFERING rows",
                ))
            }
        }

        if self.company_id.is_none() {
            return Err(ReconError::malformed(
                self.row,
                "company_id",
                "is required for OFFERING rows",
            ));
        }

        Ok(())
    }
}

/// A resting offer held in an [`OfferBook`](crate::lob::OfferBook).
///
/// Never mutated in place: replacement is remove-then-insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub identifier: String,
    pub price: f64,
    pub size: f64,
    pub dealer: String,
    /// Sequence index of the event that created this offer
    pub sequence: usize,
    pub timestamp: String,
}

impl Offer {
    /// Create a new offer.
    pub fn new(
        identifier: impl Into<String>,
        price: f64,
        size: f64,
        dealer: impl Into<String>,
        sequence: usize,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            price,
            size,
            dealer: dealer.into(),
            sequence,
            timestamp: timestamp.into(),
        }
    }

    /// Build the offer an OFFERING upsert event describes.
    pub fn from_event(event: &Event) -> Result<Self> {
        event.validate()?;

        let missing = |field: &str| ReconError::malformed(event.row, field, "is missing");

        Ok(Self {
            identifier: event.identifier.clone().ok_or_else(|| missing("identifier"))?,
            price: event.price.ok_or_else(|| missing("price"))?,
            size: event.amount.ok_or_else(|| missing("amount"))?,
            dealer: event.company_id.clone().ok_or_else(|| missing("company_id"))?,
            sequence: event.row,
            timestamp: event.time_stamp.clone(),
        })
    }

    /// The emitted view of this offer.
    pub fn level(&self) -> OfferLevel {
        OfferLevel {
            price: self.price,
            size: self.size,
            dealer: self.dealer.clone(),
            timestamp: self.timestamp.clone(),
        }
    }
}

/// One ranked slot of a snapshot: `(price, size, dealer, timestamp)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferLevel {
    pub price: f64,
    pub size: f64,
    pub dealer: String,
    pub timestamp: String,
}

/// Ranked top-N offer view at a point in time.
///
/// Always holds exactly `depth` slots; filled slots come first, unfilled
/// ranks are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    slots: Vec<Option<OfferLevel>>,
}

/// The snapshot attached to an output row; `None` when no snapshot was written.
pub type RowSnapshot = Option<Snapshot>;

impl Snapshot {
    /// Create an all-absent snapshot with `depth` slots.
    pub fn empty(depth: usize) -> Self {
        Self {
            slots: vec![None; depth],
        }
    }

    /// Build from offers already in rank order; extra offers are dropped.
    pub fn from_ranked<'a, I>(offers: I, depth: usize) -> Self
    where
        I: IntoIterator<Item = &'a Offer>,
    {
        let mut snapshot = Self::empty(depth);
        for (slot, offer) in snapshot.slots.iter_mut().zip(offers) {
            *slot = Some(offer.level());
        }
        snapshot
    }

    /// Number of slots (filled or not).
    #[inline]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Number of filled slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.iter().take_while(|s| s.is_some()).count()
    }

    /// True when every slot is absent.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Best (rank 1) offer.
    #[inline]
    pub fn best(&self) -> Option<&OfferLevel> {
        self.level(0)
    }

    /// Offer at zero-based rank, if filled.
    #[inline]
    pub fn level(&self, rank: usize) -> Option<&OfferLevel> {
        self.slots.get(rank).and_then(Option::as_ref)
    }

    /// All slots in rank order.
    pub fn slots(&self) -> &[Option<OfferLevel>] {
        &self.slots
    }

    /// Filled levels in rank order.
    pub fn levels(&self) -> impl Iterator<Item = &OfferLevel> {
        self.slots.iter().map_while(Option::as_ref)
    }

    /// Prices of the filled levels, best first.
    pub fn prices(&self) -> Vec<f64> {
        self.levels().map(|l| l.price).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // OrderType / QuoteAction
    // =========================================================================

    #[test]
    fn test_order_type_parse() {
        assert_eq!(OrderType::parse("OFFERING"), OrderType::Offering);
        assert_eq!(OrderType::parse("BID WANTED"), OrderType::BidWanted);
        assert_eq!(OrderType::parse("BW BID"), OrderType::BwBid);
        assert_eq!(OrderType::parse("SITUATION BID"), OrderType::SituationBid);
        assert_eq!(OrderType::parse(" DEALER "), OrderType::Dealer);
        assert_eq!(OrderType::parse("PURCHASE"), OrderType::Purchase);
        assert_eq!(OrderType::parse("SALE"), OrderType::Sale);
        assert_eq!(
            OrderType::parse("INQUIRY"),
            OrderType::Other("INQUIRY".to_string())
        );
    }

    #[test]
    fn test_order_type_classes() {
        assert!(OrderType::Offering.is_quote());
        assert!(!OrderType::Offering.is_trade());
        assert!(OrderType::Purchase.is_trade());
        assert!(OrderType::BwBid.is_trade());
        let other = OrderType::Other("X".into());
        assert!(!other.is_quote());
        assert!(!other.is_trade());
        assert_eq!(other.to_string(), "X");
    }

    #[test]
    fn test_quote_action_parse() {
        assert_eq!(QuoteAction::parse("DELETE"), QuoteAction::Delete);
        assert_eq!(QuoteAction::parse("INSERT"), QuoteAction::Upsert);
        assert_eq!(QuoteAction::parse(""), QuoteAction::Upsert);
        assert!(QuoteAction::Delete.is_delete());
    }

    // =========================================================================
    // Event validation
    // =========================================================================

    #[test]
    fn test_event_validation() {
        let ok = Event::offering(0, "X", "q1", 101.0, 500.0, "7", "09:30:00");
        assert!(ok.validate().is_ok());

        let delete = Event::delete(1, "X", "q1", "09:31:00");
        assert!(delete.validate().is_ok());

        let trade = Event::trade(2, "X", OrderType::Sale, "09:32:00");
        assert!(trade.validate().is_ok());

        // Missing price on an upsert
        let mut bad = ok.clone();
        bad.price = None;
        assert!(matches!(
            bad.validate(),
            Err(ReconError::MalformedRecord { ref field, .. }) if field == "price"
        ));

        // NaN amount
        let mut bad = ok.clone();
        bad.amount = Some(f64::NAN);
        assert!(bad.validate().is_err());

        // Delete without identifier
        let mut bad = delete;
        bad.identifier = None;
        assert!(bad.validate().is_err());

        // Empty cusip
        let mut bad = ok;
        bad.cusip = " ".into();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_offer_from_event() {
        let event = Event::offering(4, "X", "q1", 99.5, 250.0, "12", "10:00:00");
        let offer = Offer::from_event(&event).unwrap();

        assert_eq!(offer.identifier, "q1");
        assert_eq!(offer.price, 99.5);
        assert_eq!(offer.size, 250.0);
        assert_eq!(offer.dealer, "12");
        assert_eq!(offer.sequence, 4);
        assert_eq!(offer.timestamp, "10:00:00");
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    #[test]
    fn test_snapshot_empty() {
        let snapshot = Snapshot::empty(10);
        assert_eq!(snapshot.depth(), 10);
        assert_eq!(snapshot.len(), 0);
        assert!(snapshot.is_empty());
        assert!(snapshot.best().is_none());
    }

    #[test]
    fn test_snapshot_from_ranked_truncates() {
        let offers: Vec<Offer> = (0..4)
            .map(|i| Offer::new(format!("q{i}"), 100.0 + i as f64, 10.0, "1", i, "t"))
            .collect();

        let snapshot = Snapshot::from_ranked(&offers, 3);
        assert_eq!(snapshot.depth(), 3);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.prices(), vec![100.0, 101.0, 102.0]);

        let snapshot = Snapshot::from_ranked(&offers[..1], 3);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.level(1).is_none());
        assert_eq!(snapshot.best().map(|l| l.price), Some(100.0));
    }

    #[test]
    fn test_zero_price_is_not_absent() {
        let offer = Offer::new("q0", 0.0, 5.0, "1", 0, "t");
        let snapshot = Snapshot::from_ranked([&offer], 2);
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.best().map(|l| l.price), Some(0.0));
    }
}
