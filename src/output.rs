//! Snapshot sinks and CSV output.
//!
//! The engine emits `(row, snapshot)` pairs; a [`SnapshotSink`] stores them
//! positionally so they line up with the original rows again. The CSV writer
//! then appends the 4 x depth snapshot columns to every row, keeps only the
//! target counterparty's rows and drops the administrative columns.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::error::{ReconError, Result};
use crate::source::{normalize_time_stamp, RawTable, COL_COMPANY_ID, COL_TIME_STAMP};
use crate::types::{RowSnapshot, Snapshot, DEFAULT_DEPTH};

/// Administrative columns removed before persistence.
pub const ADMIN_COLUMNS: [&str; 8] = [
    "action",
    "firm_time",
    "sharp_time",
    "identifier",
    "link_identifier",
    "settlement_date",
    "status",
    "company_id",
];

// ============================================================================
// Sinks
// ============================================================================

/// Receives snapshots in the order the engine emits them.
pub trait SnapshotSink {
    /// Store the snapshot for an original row position.
    fn accept(&mut self, row: usize, snapshot: &RowSnapshot) -> Result<()>;
}

/// Sink that stores snapshots by row position.
///
/// Rows never handed to the sink read back as `None`.
#[derive(Debug, Clone, Default)]
pub struct PositionalSink {
    slots: Vec<RowSnapshot>,
    accepted: usize,
}

impl PositionalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for a batch of `rows` rows.
    pub fn with_rows(rows: usize) -> Self {
        Self {
            slots: vec![None; rows],
            accepted: 0,
        }
    }

    /// Snapshot stored for a row.
    pub fn get(&self, row: usize) -> Option<&Snapshot> {
        self.slots.get(row).and_then(Option::as_ref)
    }

    /// Number of `accept` calls.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Row-aligned snapshots.
    pub fn into_inner(self) -> Vec<RowSnapshot> {
        self.slots
    }
}

impl SnapshotSink for PositionalSink {
    fn accept(&mut self, row: usize, snapshot: &RowSnapshot) -> Result<()> {
        if row >= self.slots.len() {
            self.slots.resize(row + 1, None);
        }
        self.slots[row] = snapshot.clone();
        self.accepted += 1;
        Ok(())
    }
}

// ============================================================================
// Columns
// ============================================================================

/// Render a float column value. Whole numbers keep one decimal (`101.0`),
/// matching how float columns are written elsewhere in the pipeline.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Names and cell rendering of the snapshot columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotColumns {
    depth: usize,
}

impl SnapshotColumns {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// `offerprice1..N`, `offersize1..N`, `offerdealer1..N`, `offertime1..N`.
    pub fn names(&self) -> Vec<String> {
        ["offerprice", "offersize", "offerdealer", "offertime"]
            .iter()
            .flat_map(|prefix| (1..=self.depth).map(move |i| format!("{prefix}{i}")))
            .collect()
    }

    /// Cells in [`names`](Self::names) order; absent slots are empty.
    pub fn cells(&self, snapshot: &RowSnapshot) -> Vec<String> {
        let level = |rank: usize| snapshot.as_ref().and_then(|s| s.level(rank));

        let mut cells = Vec::with_capacity(self.depth * 4);
        cells.extend((0..self.depth).map(|r| level(r).map(|l| format_float(l.price)).unwrap_or_default()));
        cells.extend((0..self.depth).map(|r| level(r).map(|l| format_float(l.size)).unwrap_or_default()));
        cells.extend((0..self.depth).map(|r| level(r).map(|l| l.dealer.clone()).unwrap_or_default()));
        cells.extend((0..self.depth).map(|r| level(r).map(|l| l.timestamp.clone()).unwrap_or_default()));
        cells
    }
}

// ============================================================================
// CSV writer
// ============================================================================

/// Output filtering and layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Keep only rows from this counterparty; `None` keeps every row
    pub target_company_id: Option<String>,

    /// Columns removed from the output
    pub drop_columns: Vec<String>,

    /// Snapshot depth (number of column groups)
    pub depth: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target_company_id: Some("99".to_string()),
            drop_columns: ADMIN_COLUMNS.iter().map(|c| c.to_string()).collect(),
            depth: DEFAULT_DEPTH,
        }
    }
}

impl OutputConfig {
    /// Set the counterparty filter.
    pub fn with_target_company(mut self, company_id: impl Into<String>) -> Self {
        self.target_company_id = Some(company_id.into());
        self
    }

    /// Keep every row.
    pub fn without_filter(mut self) -> Self {
        self.target_company_id = None;
        self
    }

    /// Set the snapshot depth.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }
}

/// Counts from one write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub rows_in: usize,
    pub rows_written: usize,
    pub columns_written: usize,
    pub columns_dropped: usize,
}

/// Company ids match on text, or numerically when both sides parse
/// (so `99` matches `99.0`).
pub fn company_matches(value: &str, target: &str) -> bool {
    let value = value.trim();
    let target = target.trim();
    if value == target {
        return true;
    }
    match (value.parse::<f64>(), target.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Writes annotated rows as CSV.
#[derive(Debug, Clone, Default)]
pub struct CsvSnapshotWriter {
    config: OutputConfig,
}

impl CsvSnapshotWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Write `table` with `snapshots` (row-aligned) appended.
    pub fn write<W: Write>(
        &self,
        table: &RawTable,
        snapshots: &[RowSnapshot],
        writer: W,
    ) -> Result<WriteStats> {
        if snapshots.len() != table.len() {
            return Err(ReconError::generic(format!(
                "{} snapshots for {} rows",
                snapshots.len(),
                table.len()
            )));
        }

        let company_col = match &self.config.target_company_id {
            Some(_) => Some(table.require_column(COL_COMPANY_ID)?),
            None => None,
        };

        for name in &self.config.drop_columns {
            if table.column_index(name).is_none() {
                log::debug!("Drop column {name} not present in input");
            }
        }

        let kept: Vec<usize> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(_, h)| !self.config.drop_columns.iter().any(|d| d.as_str() == *h))
            .map(|(i, _)| i)
            .collect();

        let time_col = table.column_index(COL_TIME_STAMP);
        let columns = SnapshotColumns::new(self.config.depth);
        let mut out = csv::Writer::from_writer(writer);

        let mut header: Vec<String> = kept
            .iter()
            .map(|&i| table.headers().get(i).unwrap_or("").to_string())
            .collect();
        header.extend(columns.names());
        out.write_record(&header)?;

        let mut stats = WriteStats {
            rows_in: table.len(),
            columns_written: header.len(),
            columns_dropped: table.headers().len() - kept.len(),
            ..Default::default()
        };

        for (row, snapshot) in snapshots.iter().enumerate() {
            if let (Some(col), Some(target)) = (company_col, &self.config.target_company_id) {
                if !company_matches(table.cell(row, col), target) {
                    continue;
                }
            }

            let mut record: Vec<String> = kept
                .iter()
                .map(|&col| {
                    let cell = table.cell(row, col);
                    if Some(col) == time_col {
                        normalize_time_stamp(cell).unwrap_or(cell).to_string()
                    } else {
                        cell.to_string()
                    }
                })
                .collect();
            record.extend(columns.cells(snapshot));
            out.write_record(&record)?;
            stats.rows_written += 1;
        }

        out.flush()?;

        log::info!(
            "Wrote {} of {} rows ({} columns, {} dropped)",
            stats.rows_written,
            stats.rows_in,
            stats.columns_written,
            stats.columns_dropped
        );

        Ok(stats)
    }

    /// Write to a file path.
    pub fn write_to_path(
        &self,
        table: &RawTable,
        snapshots: &[RowSnapshot],
        path: impl AsRef<Path>,
    ) -> Result<WriteStats> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write(table, snapshots, std::io::BufWriter::new(file))
    }
}
