//! Catalog index
//!
//! Owns the union catalog for the lifetime of an open archive, together
//! with the identifier map and the spatial index over its positions.
//!
//! ## Responsibilities
//! - Validate catalog invariants at load (unique IDs, flags within the
//!   dictionary)
//! - Survey membership tests, decode/encode, survey-restricted filtering
//! - Radial search, sky matching, and redshift-aware pair finding

use std::collections::HashMap;

use tracing::warn;

use crate::container::CatalogRow;
use crate::error::{Result, VaultError};
use crate::units::{Angle, SkyPos, Velocity};

use super::sky::{self, SkyTree};
use super::SurveyDict;

/// Speed of light in km/s.
pub const C_KMS: f64 = 299_792.458;

/// In-memory catalog with identifier and spatial lookups.
pub struct CatalogIndex {
    rows: Vec<CatalogRow>,
    by_id: HashMap<u64, usize>,
    tree: SkyTree,
    dict: SurveyDict,

    /// Surveys with at least one member row, sorted.
    surveys: Vec<String>,
}

impl CatalogIndex {
    /// Build the index from catalog rows and the survey dictionary.
    ///
    /// Fails on duplicate identifiers or on membership flags using bits
    /// the dictionary does not define.
    pub fn new(rows: Vec<CatalogRow>, dict: SurveyDict) -> Result<Self> {
        let defined = dict.all_bits();
        let mut by_id = HashMap::with_capacity(rows.len());
        let mut union_flag = 0u64;

        for (pos, row) in rows.iter().enumerate() {
            if by_id.insert(row.id, pos).is_some() {
                return Err(VaultError::Container(format!(
                    "duplicate catalog identifier {}",
                    row.id
                )));
            }
            if row.survey_flag & !defined != 0 {
                return Err(VaultError::Container(format!(
                    "catalog row {} has survey flag bits outside the dictionary",
                    row.id
                )));
            }
            union_flag |= row.survey_flag;
        }

        let mut surveys = Vec::new();
        for (name, bit) in dict.iter() {
            if union_flag & bit != 0 {
                surveys.push(name.to_string());
            } else {
                warn!("survey {} is in the dictionary but no catalog row carries it", name);
            }
        }

        let tree = SkyTree::build(rows.iter().map(|r| sky::radec_to_unit(r.ra, r.dec)).collect());

        Ok(Self {
            rows,
            by_id,
            tree,
            dict,
            surveys,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dict(&self) -> &SurveyDict {
        &self.dict
    }

    /// Surveys with at least one catalog member, sorted by name.
    pub fn surveys(&self) -> &[String] {
        &self.surveys
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Whether `flag` marks membership in `survey`.
    pub fn membership(&self, flag: u64, survey: &str) -> Result<bool> {
        Ok(flag & self.dict.bit(survey)? != 0)
    }

    /// Survey names encoded in `flag`.
    pub fn decode_flag(&self, flag: u64) -> Vec<String> {
        self.dict.decode(flag)
    }

    /// Bitmask for a set of survey names.
    pub fn encode_surveys(&self, surveys: &[&str]) -> Result<u64> {
        self.dict.encode(surveys)
    }

    /// Restrict `ids` to catalog members of any of the named surveys,
    /// preserving input order. Identifiers absent from the catalog simply
    /// do not match; an unknown survey name is an error.
    pub fn filter_by_surveys(&self, surveys: &[&str], ids: &[u64]) -> Result<Vec<u64>> {
        let mask = self.dict.encode(surveys)?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| {
                self.by_id
                    .get(id)
                    .map(|&pos| self.rows[pos].survey_flag & mask != 0)
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Catalog rows for the given identifiers, in catalog order.
    /// Identifiers not in the catalog are skipped with a warning.
    pub fn rows_for_ids(&self, ids: &[u64]) -> Vec<&CatalogRow> {
        let mut positions: Vec<usize> = ids
            .iter()
            .filter_map(|id| self.by_id.get(id).copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();

        if positions.len() < ids.len() {
            warn!("{} of {} identifiers not in the catalog", ids.len() - positions.len(), ids.len());
        }
        positions.iter().map(|&pos| &self.rows[pos]).collect()
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Identifiers of catalog rows strictly within `radius` of `pos`,
    /// ordered by catalog row position.
    pub fn radial_search(&self, pos: SkyPos, radius: Angle) -> Result<Vec<u64>> {
        let hits = self.radial_hits(pos, radius)?;
        Ok(hits.iter().map(|&row| self.rows[row].id).collect())
    }

    /// Radial search returning private identifiers where they exist,
    /// falling back to the public identifier.
    pub fn radial_search_private(&self, pos: SkyPos, radius: Angle) -> Result<Vec<u64>> {
        let hits = self.radial_hits(pos, radius)?;
        Ok(hits
            .iter()
            .map(|&row| {
                let r = &self.rows[row];
                r.priv_id.unwrap_or(r.id)
            })
            .collect())
    }

    /// For each input position, whether any catalog row lies strictly
    /// within `radius` of it.
    pub fn radial_search_batch(&self, positions: &[SkyPos], radius: Angle) -> Result<Vec<bool>> {
        let limit = chord_limit(radius, "search radius")?;
        Ok(positions
            .iter()
            .map(|p| {
                let query = sky::radec_to_unit(p.ra_deg, p.dec_deg);
                self.tree.count_within(&query, limit) > 0
            })
            .collect())
    }

    /// Nearest-neighbor match of external positions against the catalog.
    /// A position matches iff its nearest catalog row is strictly within
    /// `tolerance`; non-matching positions are dropped, not errors.
    pub fn sky_match(&self, positions: &[SkyPos], tolerance: Angle) -> Result<Vec<u64>> {
        let limit = chord_limit(tolerance, "match tolerance")?;
        let mut matched = Vec::new();
        for p in positions {
            let query = sky::radec_to_unit(p.ra_deg, p.dec_deg);
            if let Some(hit) = self.tree.nearest(&query) {
                if hit.chord_sq < limit {
                    matched.push(self.rows[hit.row].id);
                }
            }
        }
        if matched.is_empty() && !positions.is_empty() {
            warn!("no catalog matches within {:.3} arcsec", tolerance.arcsec());
        }
        Ok(matched)
    }

    /// Foreground/background pairs from nearest neighbors on the sky.
    ///
    /// For every catalog row, its nearest other row strictly within
    /// `separation` forms a candidate pair; the pair is kept when the
    /// relativistic velocity offset between the two emission redshifts
    /// exceeds `dv_min` in magnitude. The lower-redshift member is the
    /// foreground; returned as (foreground ids, background ids).
    pub fn find_pairs(&self, separation: Angle, dv_min: Velocity) -> Result<(Vec<u64>, Vec<u64>)> {
        let limit = chord_limit(separation, "pair separation")?;
        let dv = dv_min.kms();
        if !dv.is_finite() || dv <= 0.0 {
            return Err(VaultError::InvalidQueryParameter(format!(
                "velocity offset must be positive, got {} km/s",
                dv
            )));
        }

        let mut foreground = Vec::new();
        let mut background = Vec::new();
        for (row, cat) in self.rows.iter().enumerate() {
            let query = sky::radec_to_unit(cat.ra, cat.dec);
            let hit = match self.tree.nearest_excluding(&query, row) {
                Some(hit) if hit.chord_sq < limit => hit,
                _ => continue,
            };

            // Keep each unordered pair once, oriented foreground first:
            // the sweep visits it from both ends, and only the
            // lower-redshift end sees a negative velocity offset.
            let v12 = velocity_between(cat.zem, self.rows[hit.row].zem);
            if v12.abs() > dv && v12 < 0.0 {
                foreground.push(cat.id);
                background.push(self.rows[hit.row].id);
            }
        }
        Ok((foreground, background))
    }

    fn radial_hits(&self, pos: SkyPos, radius: Angle) -> Result<Vec<usize>> {
        let limit = chord_limit(radius, "search radius")?;
        let query = sky::radec_to_unit(pos.ra_deg, pos.dec_deg);
        let mut rows: Vec<usize> = self.tree.within(&query, limit).iter().map(|h| h.row).collect();
        rows.sort_unstable();
        Ok(rows)
    }
}

/// Relativistic line-of-sight velocity offset between two emission
/// redshifts, in km/s. Negative when `z1 < z2`.
fn velocity_between(z1: f64, z2: f64) -> f64 {
    let r = (1.0 + z1) / (1.0 + z2);
    let r2 = r * r;
    C_KMS * (r2 - 1.0) / (r2 + 1.0)
}

/// Validate a positive angular bound and convert it to squared chord form.
fn chord_limit(angle: Angle, what: &str) -> Result<f64> {
    let rad = angle.radians();
    if !rad.is_finite() || rad <= 0.0 {
        return Err(VaultError::InvalidQueryParameter(format!(
            "{} must be positive, got {} rad",
            what, rad
        )));
    }
    Ok(sky::chord_sq(rad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_sign_follows_redshift_order() {
        // Lower first redshift means approaching: negative offset.
        assert!(velocity_between(2.0, 2.2) < 0.0);
        assert!(velocity_between(2.2, 2.0) > 0.0);
        assert_eq!(velocity_between(1.5, 1.5), 0.0);

        // Antisymmetric up to floating error.
        let a = velocity_between(1.0, 3.0);
        let b = velocity_between(3.0, 1.0);
        assert!((a + b).abs() < 1e-6);
    }

    #[test]
    fn velocity_magnitude_is_subluminal() {
        let v = velocity_between(0.0, 6.0);
        assert!(v.abs() < C_KMS);
    }
}
