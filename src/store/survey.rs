//! Survey store
//!
//! Resolves identifier lists against per-survey tables and loads the
//! matched rows. The metadata table is streamed, never retained whole,
//! and spectra are read row-selectively in the caller's order.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::container::{ArchiveReader, MetaRow, SpectralRecord};
use crate::error::{Result, VaultError};

use super::{MetaFilter, MetaTable, StagingResult};

/// Read-side accessor for the archive's survey tables.
pub struct SurveyStore {
    reader: Arc<ArchiveReader>,

    /// Group names, in container order.
    surveys: Vec<String>,
}

impl SurveyStore {
    pub(crate) fn new(reader: Arc<ArchiveReader>) -> Self {
        let surveys = reader
            .directory()
            .groups
            .iter()
            .map(|g| g.name.clone())
            .collect();
        Self { reader, surveys }
    }

    /// Survey groups present in the archive, in container order.
    pub fn surveys(&self) -> &[String] {
        &self.surveys
    }

    pub fn contains(&self, survey: &str) -> bool {
        self.surveys.iter().any(|s| s == survey)
    }

    /// Rows in a survey's tables.
    pub fn row_count(&self, survey: &str) -> Result<usize> {
        self.reader.meta_row_count(survey)
    }

    /// Resolve identifiers against one survey.
    ///
    /// Coverage is all-or-nothing: every requested identifier must survive
    /// the filters, otherwise the whole resolve fails with no partial
    /// result. Repeated identifiers are accepted and map to the same
    /// subset row.
    ///
    /// Steps:
    /// 1. Stream the metadata table once, building the mask and the
    ///    matched subset in table order
    /// 2. Sort the matched identifiers once
    /// 3. Binary-search each input identifier back to its subset position
    pub fn resolve(
        &self,
        survey: &str,
        ids: &[u64],
        filters: &[MetaFilter],
    ) -> Result<StagingResult> {
        let total = self.reader.meta_row_count(survey)?;

        // Step 1: one pass over the table
        let requested: HashSet<u64> = ids.iter().copied().collect();
        let mut mask = vec![false; total];
        let mut matched: Vec<MetaRow> = Vec::new();
        for row_idx in 0..total {
            let row = self.reader.read_meta_row(survey, row_idx)?;
            if !requested.contains(&row.id) {
                continue;
            }
            if !filters.iter().all(|f| f.matches(&row)) {
                continue;
            }
            mask[row_idx] = true;
            matched.push(row);
        }

        // Step 2: argsort the matched identifiers
        let mut by_id: Vec<usize> = (0..matched.len()).collect();
        by_id.sort_unstable_by_key(|&i| matched[i].id);
        let sorted_ids: Vec<u64> = by_id.iter().map(|&i| matched[i].id).collect();

        // Step 3: map each input back to its subset position
        let mut order = Vec::with_capacity(ids.len());
        for &id in ids {
            let found = sorted_ids.binary_search(&id).map_err(|_| {
                VaultError::PartialCoverage {
                    survey: survey.to_string(),
                    missing_id: id,
                }
            })?;
            order.push(by_id[found]);
        }

        debug!(
            "resolved {} identifiers against {} ({} of {} rows matched)",
            ids.len(),
            survey,
            matched.len(),
            total
        );

        Ok(StagingResult {
            survey: survey.to_string(),
            mask,
            order,
            meta: MetaTable {
                survey: survey.to_string(),
                rows: matched,
            },
        })
    }

    /// Metadata for one survey. `ids = None` loads the full table;
    /// otherwise only rows whose identifier is listed, in table order.
    pub fn load_meta(&self, survey: &str, ids: Option<&[u64]>) -> Result<MetaTable> {
        let total = self.reader.meta_row_count(survey)?;
        let wanted: Option<HashSet<u64>> = ids.map(|ids| ids.iter().copied().collect());

        let mut rows = Vec::new();
        for row_idx in 0..total {
            let row = self.reader.read_meta_row(survey, row_idx)?;
            match &wanted {
                Some(wanted) if !wanted.contains(&row.id) => {}
                _ => rows.push(row),
            }
        }
        Ok(MetaTable {
            survey: survey.to_string(),
            rows,
        })
    }

    /// Spectral records for a resolved query, in request order.
    ///
    /// Only masked rows are touched on disk, each read directly into its
    /// output slot, so memory tracks the staged estimate rather than the
    /// survey's table size.
    pub fn load_spectra(&self, staging: &StagingResult) -> Result<Vec<SpectralRecord>> {
        // Table row index of each subset position.
        let masked_rows: Vec<usize> = staging
            .mask
            .iter()
            .enumerate()
            .filter_map(|(row_idx, &m)| m.then_some(row_idx))
            .collect();

        let mut records = Vec::with_capacity(staging.order.len());
        for &subset_pos in &staging.order {
            let row_idx = masked_rows.get(subset_pos).copied().ok_or_else(|| {
                VaultError::Container(format!(
                    "staging result inconsistent with survey {}",
                    staging.survey
                ))
            })?;
            records.push(self.reader.read_spec_row(&staging.survey, row_idx)?);
        }
        Ok(records)
    }

    /// Stored byte length of the survey's first spectral record, the
    /// per-row unit for staging estimates. Zero for an empty survey.
    pub fn representative_record_len(&self, survey: &str) -> Result<u64> {
        if self.reader.spec_row_count(survey)? == 0 {
            return Ok(0);
        }
        Ok(self.reader.spec_row_len(survey, 0)? as u64)
    }
}
