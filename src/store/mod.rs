//! Survey Store Module
//!
//! Per-survey access to the on-disk metadata and spectra tables.
//!
//! ## Responsibilities
//! - Order-preserving identifier resolution against survey tables
//! - Masked, row-selective metadata and spectra loading
//! - Representative record sizing for staging estimates

mod survey;

pub use survey::SurveyStore;

use crate::container::MetaRow;
use crate::error::{Result, VaultError};

/// Metadata rows from one survey, annotated with their origin.
#[derive(Debug, Clone)]
pub struct MetaTable {
    pub survey: String,
    pub rows: Vec<MetaRow>,
}

/// Metadata columns that accept equality filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaColumn {
    Instrument,
    Grating,
    SpecFile,
}

/// Equality filter over one metadata column.
#[derive(Debug, Clone)]
pub struct MetaFilter {
    column: MetaColumn,
    value: String,
}

impl MetaFilter {
    /// Build a filter. Column names: `instrument`, `grating`, `spec_file`.
    pub fn new(column: &str, value: impl Into<String>) -> Result<Self> {
        let column = match column {
            "instrument" => MetaColumn::Instrument,
            "grating" => MetaColumn::Grating,
            "spec_file" => MetaColumn::SpecFile,
            other => {
                return Err(VaultError::InvalidQueryParameter(format!(
                    "unknown metadata filter column: {}",
                    other
                )))
            }
        };
        Ok(Self {
            column,
            value: value.into(),
        })
    }

    pub(crate) fn matches(&self, row: &MetaRow) -> bool {
        let field = match self.column {
            MetaColumn::Instrument => &row.instrument,
            MetaColumn::Grating => &row.grating,
            MetaColumn::SpecFile => &row.spec_file,
        };
        field == &self.value
    }
}

/// Outcome of identifier resolution against one survey.
///
/// `mask[i]` marks metadata row `i` as part of the matched subset, `meta`
/// holds that subset in table order, and `order[k]` is the subset position
/// of the k-th requested identifier. Subset row `order[k]` therefore
/// corresponds to input `k`, repeats included.
#[derive(Debug, Clone)]
pub struct StagingResult {
    pub survey: String,
    pub mask: Vec<bool>,
    pub order: Vec<usize>,
    pub meta: MetaTable,
}

impl StagingResult {
    /// Number of distinct metadata rows in the matched subset.
    pub fn matched_rows(&self) -> usize {
        self.meta.rows.len()
    }

    /// Number of requested identifiers, repeats included.
    pub fn requested(&self) -> usize {
        self.order.len()
    }
}
