//! Warning and issue tracking for offer book reconstruction.
//!
//! Nothing that happens inside the engine is fatal, but several conditions
//! are worth keeping a record of: an OFFERING insert reusing a live
//! identifier, a delete for an identifier that is not resting, rows with an
//! order kind the engine does not recognise, and PURCHASE resets.
//!
//! # Example
//!
//! ```
//! use offer_book_reconstructor::warnings::{Warning, WarningCategory, WarningTracker};
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record(
//!     Warning::new(WarningCategory::UnknownIdentifier, "delete for unknown offer")
//!         .with_row(42)
//!         .with_instrument("64971XAB4")
//!         .with_identifier("Q-77"),
//! );
//!
//! let summary = tracker.summary();
//! assert_eq!(summary.total, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// OFFERING insert for an identifier that was already resting
    DuplicateIdentifier,

    /// OFFERING delete for an identifier that was not resting
    UnknownIdentifier,

    /// Row kind outside the quote and trade sets
    UnrecognizedOrderType,

    /// PURCHASE at an instrument boundary cleared the emitted snapshot
    BookReset,

    /// Other/uncategorized warning
    Other,
}

impl WarningCategory {
    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::DuplicateIdentifier => "DUPLICATE_IDENTIFIER",
            WarningCategory::UnknownIdentifier => "UNKNOWN_IDENTIFIER",
            WarningCategory::UnrecognizedOrderType => "UNRECOGNIZED_ORDER_TYPE",
            WarningCategory::BookReset => "BOOK_RESET",
            WarningCategory::Other => "OTHER",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::DuplicateIdentifier => 1,
            WarningCategory::UnknownIdentifier => 2,
            WarningCategory::UnrecognizedOrderType => 2,
            WarningCategory::BookReset => 1,
            WarningCategory::Other => 1,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Unique warning ID, assigned by the tracker
    pub id: u64,

    /// Warning category
    pub category: WarningCategory,

    /// Human-readable message
    pub message: String,

    /// Source row position (if applicable)
    pub row: Option<usize>,

    /// Instrument identifier (if applicable)
    pub instrument: Option<String>,

    /// Offer identifier (if applicable)
    pub identifier: Option<String>,

    /// Additional context as key-value pairs
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub context: HashMap<String, String>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            category,
            message: message.into(),
            row: None,
            instrument: None,
            identifier: None,
            context: HashMap::new(),
        }
    }

    /// Set the row position.
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Set the instrument.
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Set the offer identifier.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Add context key-value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings (including deduplicated ones)
    pub total: u64,

    /// Number of warnings suppressed as duplicates
    pub suppressed: u64,

    /// Count by category
    pub by_category: HashMap<String, u64>,

    /// Count by severity
    pub by_severity: HashMap<u8, u64>,

    /// First row that produced a stored warning
    pub first_row: Option<usize>,

    /// Last row that produced a stored warning
    pub last_row: Option<usize>,

    /// Number of distinct instruments involved
    pub unique_instruments: u64,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings to keep in memory
    pub max_warnings: usize,

    /// Whether to forward warnings to the `log` facade
    pub log_warnings: bool,

    /// Minimum severity to log at `warn` level (lower severities go to `debug`)
    pub min_warn_severity: u8,

    /// Whether to suppress repeats of an identical category + message
    pub deduplicate: bool,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100_000,
            log_warnings: true,
            min_warn_severity: 3,
            deduplicate: true,
        }
    }
}

#[derive(Serialize)]
struct WarningExport<'a> {
    summary: WarningSummary,
    warnings: &'a [Warning],
}

/// Warning tracker for one reconstruction run.
#[derive(Debug, Clone)]
pub struct WarningTracker {
    config: WarningTrackerConfig,

    warnings: Vec<Warning>,

    next_id: u64,

    /// Count by category (for fast summary)
    category_counts: HashMap<WarningCategory, u64>,

    /// (category, message) pairs already recorded
    seen: HashSet<(WarningCategory, String)>,

    suppressed: u64,

    unique_instruments: HashSet<String>,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    /// Create a new warning tracker with custom configuration.
    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: 1,
            category_counts: HashMap::new(),
            seen: HashSet::new(),
            suppressed: 0,
            unique_instruments: HashSet::new(),
        }
    }

    /// Record a warning.
    ///
    /// Returns the warning ID if stored, or None if deduplicated.
    pub fn record(&mut self, mut warning: Warning) -> Option<u64> {
        *self.category_counts.entry(warning.category).or_insert(0) += 1;

        if let Some(instrument) = &warning.instrument {
            self.unique_instruments.insert(instrument.clone());
        }

        if self.config.deduplicate
            && !self
                .seen
                .insert((warning.category, warning.message.clone()))
        {
            self.suppressed += 1;
            return None;
        }

        warning.id = self.next_id;
        self.next_id += 1;

        if self.config.log_warnings {
            let row = warning
                .row
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            if warning.category.severity() >= self.config.min_warn_severity {
                log::warn!(
                    "[{}] row {}: {}",
                    warning.category.name(),
                    row,
                    warning.message
                );
            } else {
                log::debug!(
                    "[{}] row {}: {}",
                    warning.category.name(),
                    row,
                    warning.message
                );
            }
        }

        let id = warning.id;
        if self.warnings.len() < self.config.max_warnings {
            self.warnings.push(warning);
        }

        Some(id)
    }

    /// Record a simple warning with just category and message.
    pub fn record_simple(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
    ) -> Option<u64> {
        self.record(Warning::new(category, message))
    }

    /// Record a warning tied to an offer on an instrument at a row.
    pub fn record_offer_warning(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        row: usize,
        instrument: &str,
        identifier: Option<&str>,
    ) -> Option<u64> {
        let mut warning = Warning::new(category, message)
            .with_row(row)
            .with_instrument(instrument);
        if let Some(id) = identifier {
            warning = warning.with_identifier(id);
        }
        self.record(warning)
    }

    /// Number of stored warnings.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Get total count including deduplicated.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    /// Get count for a specific category.
    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Get warnings by category.
    pub fn warnings_by_category(&self, category: WarningCategory) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// Get summary statistics.
    pub fn summary(&self) -> WarningSummary {
        let mut by_category = HashMap::new();
        let mut by_severity = HashMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        WarningSummary {
            total: self.total_count(),
            suppressed: self.suppressed,
            by_category,
            by_severity,
            first_row: self.warnings.iter().find_map(|w| w.row),
            last_row: self.warnings.iter().rev().find_map(|w| w.row),
            unique_instruments: self.unique_instruments.len() as u64,
        }
    }

    /// Export summary and stored warnings to a JSON file.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let export = WarningExport {
            summary: self.summary(),
            warnings: &self.warnings,
        };
        serde_json::to_writer_pretty(&mut writer, &export)?;
        writer.flush()?;
        Ok(())
    }

    /// Export warnings to a CSV file (for spreadsheet analysis).
    pub fn export_to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record([
            "id",
            "category",
            "severity",
            "message",
            "row",
            "instrument",
            "identifier",
        ])?;

        for warning in &self.warnings {
            writer.write_record([
                warning.id.to_string(),
                warning.category.name().to_string(),
                warning.category.severity().to_string(),
                warning.message.clone(),
                warning.row.map(|r| r.to_string()).unwrap_or_default(),
                warning.instrument.clone().unwrap_or_default(),
                warning.identifier.clone().unwrap_or_default(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Clear all warnings.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.seen.clear();
        self.suppressed = 0;
        self.unique_instruments.clear();
        self.next_id = 1;
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}
