//! Event source abstraction and CSV ingestion.
//!
//! A source turns some input into the ordered event sequence the engine
//! replays. Ingestion is batch and fail-fast: the first malformed row aborts
//! the whole load, so the engine never sees a partially-formed event.
//!
//! # Example
//!
//! ```
//! use offer_book_reconstructor::source::{CsvSource, EventSource};
//!
//! let data = "\
//! cusip,order_type,action,price,amount,company_id,identifier,time_stamp
//! 64971XAB4,OFFERING,INSERT,101.25,500,7,Q-1,2024-03-01 09:30:00
//! 64971XAB4,PURCHASE,,101.25,100,99,,2024-03-01 09:31:00
//! ";
//!
//! let source = CsvSource::from_reader(data.as_bytes()).unwrap();
//! assert_eq!(source.metadata().estimated_events, Some(2));
//!
//! let events: Vec<_> = source.events().unwrap().collect();
//! assert_eq!(events[0].time_stamp, "09:30:00");
//! assert_eq!(events[1].row, 1);
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::{ReconError, Result};
use crate::types::{Event, OrderType, QuoteAction};

// ============================================================================
// Column names
// ============================================================================

pub const COL_CUSIP: &str = "cusip";
pub const COL_ORDER_TYPE: &str = "order_type";
pub const COL_ACTION: &str = "action";
pub const COL_PRICE: &str = "price";
pub const COL_AMOUNT: &str = "amount";
pub const COL_COMPANY_ID: &str = "company_id";
pub const COL_IDENTIFIER: &str = "identifier";
pub const COL_TIME_STAMP: &str = "time_stamp";

/// Columns every input must carry.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    COL_CUSIP,
    COL_ORDER_TYPE,
    COL_ACTION,
    COL_PRICE,
    COL_AMOUNT,
    COL_COMPANY_ID,
    COL_IDENTIFIER,
    COL_TIME_STAMP,
];

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about an event source.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Provider name (e.g., "csv", "memory")
    pub provider: Option<String>,

    /// Number of events the source will yield
    pub estimated_events: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the estimated event count.
    pub fn with_estimated_events(mut self, count: u64) -> Self {
        self.estimated_events = Some(count);
        self
    }
}

// ============================================================================
// Event Source Trait
// ============================================================================

/// Trait for event sources.
///
/// - `events()` consumes `self` to allow single-pass iteration
/// - Events come out in original row order with strictly increasing `row`
pub trait EventSource {
    /// The iterator type for events.
    type EventIter: Iterator<Item = Event>;

    /// Consume the source and return an iterator over events.
    fn events(self) -> Result<Self::EventIter>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// In-memory source, mostly for tests and simulations.
pub struct VecSource {
    events: Vec<Event>,
    metadata: SourceMetadata,
}

impl VecSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_events(events.len() as u64),
            events,
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl EventSource for VecSource {
    type EventIter = std::vec::IntoIter<Event>;

    fn events(self) -> Result<Self::EventIter> {
        Ok(self.events.into_iter())
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// Raw table
// ============================================================================

/// The input table exactly as read: header plus every record's original text.
///
/// Kept alongside the parsed events so output can pass columns through.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn new(headers: StringRecord, rows: Vec<StringRecord>) -> Self {
        Self { headers, rows }
    }

    /// Read a whole CSV document.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a column that must exist.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ReconError::MissingColumn(name.to_string()))
    }

    /// Cell text, empty when the record is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or("")
    }

    /// Parse every row into an [`Event`], failing on the first bad row.
    pub fn parse_events(&self) -> Result<Vec<Event>> {
        let columns = ColumnMap::resolve(self)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, record)| columns.parse(row, record))
            .collect()
    }
}

/// Positions of the required columns.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    cusip: usize,
    order_type: usize,
    action: usize,
    price: usize,
    amount: usize,
    company_id: usize,
    identifier: usize,
    time_stamp: usize,
}

impl ColumnMap {
    fn resolve(table: &RawTable) -> Result<Self> {
        Ok(Self {
            cusip: table.require_column(COL_CUSIP)?,
            order_type: table.require_column(COL_ORDER_TYPE)?,
            action: table.require_column(COL_ACTION)?,
            price: table.require_column(COL_PRICE)?,
            amount: table.require_column(COL_AMOUNT)?,
            company_id: table.require_column(COL_COMPANY_ID)?,
            identifier: table.require_column(COL_IDENTIFIER)?,
            time_stamp: table.require_column(COL_TIME_STAMP)?,
        })
    }

    fn parse(&self, row: usize, record: &StringRecord) -> Result<Event> {
        let field = |col: usize| record.get(col).map(str::trim).unwrap_or("");

        let cusip = field(self.cusip);
        if cusip.is_empty() {
            return Err(ReconError::malformed(row, COL_CUSIP, "is empty"));
        }

        let order_type = field(self.order_type);
        if order_type.is_empty() {
            return Err(ReconError::malformed(row, COL_ORDER_TYPE, "is empty"));
        }

        let time_stamp = normalize_time_stamp(field(self.time_stamp)).ok_or_else(|| {
            ReconError::malformed(row, COL_TIME_STAMP, "has no time-of-day component")
        })?;

        let event = Event {
            row,
            cusip: cusip.to_string(),
            order_type: OrderType::parse(order_type),
            action: QuoteAction::parse(field(self.action)),
            price: parse_number(row, COL_PRICE, field(self.price))?,
            amount: parse_number(row, COL_AMOUNT, field(self.amount))?,
            company_id: non_empty(field(self.company_id)),
            identifier: non_empty(field(self.identifier)),
            time_stamp: time_stamp.to_string(),
        };

        event.validate()?;
        Ok(event)
    }
}

/// Keep the time-of-day token of a `date time` stamp.
///
/// `"2024-03-01 09:30:00"` becomes `"09:30:00"`; a stamp with no second
/// token yields `None`.
pub fn normalize_time_stamp(raw: &str) -> Option<&str> {
    raw.split_whitespace().nth(1)
}

fn parse_number(row: usize, field: &str, raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ReconError::malformed(
            row,
            field,
            format!("is not a finite number ({raw:?})"),
        )),
    }
}

fn non_empty(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

// ============================================================================
// CSV Source
// ============================================================================

/// Event source backed by a CSV document.
///
/// The raw table is read up front; events are parsed on `events()` or
/// [`into_parts`](Self::into_parts).
pub struct CsvSource {
    table: RawTable,
    metadata: SourceMetadata,
}

impl CsvSource {
    /// Load a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            ReconError::generic(format!("Failed to open {}: {e}", path.display()))
        })?;
        let file_size = file.metadata().ok().map(|m| m.len());

        let mut source = Self::from_reader(std::io::BufReader::new(file))?;
        source.metadata.file_path = Some(path.to_path_buf());
        source.metadata.file_size = file_size;

        log::info!(
            "Loaded {} rows from {}",
            source.table.len(),
            path.display()
        );

        Ok(source)
    }

    /// Load CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let table = RawTable::from_reader(reader)?;
        let metadata = SourceMetadata::new()
            .with_provider("csv")
            .with_estimated_events(table.len() as u64);

        Ok(Self { table, metadata })
    }

    /// The raw table as read.
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    /// Parse events and hand back the raw table alongside them.
    pub fn into_parts(self) -> Result<(RawTable, Vec<Event>)> {
        let events = self.table.parse_events()?;
        Ok((self.table, events))
    }
}

impl EventSource for CsvSource {
    type EventIter = std::vec::IntoIter<Event>;

    fn events(self) -> Result<Self::EventIter> {
        Ok(self.table.parse_events()?.into_iter())
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}
