//! Archive facade
//!
//! Single entry point tying the components together. Opens the container,
//! cross-checks the survey dictionary against the stored data groups, and
//! routes queries to the catalog index, the survey store, and the staging
//! planner.
//!
//! ## Responsibilities
//! - Open an archive and validate its internal consistency
//! - Serve spectra by identifier and by sky coordinate
//! - Aggregate loads across surveys, one outcome per survey
//! - Enforce the staging budget on every load
//!
//! ## Usage
//!
//! ```ignore
//! let mut vault = SpecVault::open(Path::new("archive.svlt"))?;
//! let fetched = vault.spectra_by_id(&["BOSS"], &[5, 2, 9], &[])?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::{CatalogIndex, SurveyDict};
use crate::config::Config;
use crate::container::ArchiveReader;
use crate::error::{Result, VaultError};
use crate::spectrum::Spectrum;
use crate::staging::StagingPlanner;
use crate::store::{MetaFilter, MetaTable, SurveyStore};
use crate::units::{Angle, SkyPos, Velocity};

/// Outcome of a staged load against one survey.
///
/// A multi-survey query yields one entry per survey considered, so a
/// refusal or an empty survey never hides a successful load elsewhere.
#[derive(Debug)]
pub enum SurveyFetch {
    /// Spectra and metadata, aligned index by index with the resolved
    /// identifiers.
    Loaded {
        survey: String,
        spectra: Vec<Spectrum>,
        meta: MetaTable,
    },
    /// The survey held no requested source.
    NoMatch { survey: String },
    /// The staging budget refused the load.
    Refused {
        survey: String,
        estimated_bytes: u64,
    },
}

impl SurveyFetch {
    pub fn survey(&self) -> &str {
        match self {
            SurveyFetch::Loaded { survey, .. } => survey,
            SurveyFetch::NoMatch { survey } => survey,
            SurveyFetch::Refused { survey, .. } => survey,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SurveyFetch::Loaded { .. })
    }
}

/// Read-only handle to a spectral archive.
///
/// Owns the catalog index, the survey store, and the staging planner.
/// Loads take `&mut self` so that estimate, authorization, and commit on
/// the shared budget cannot interleave.
pub struct SpecVault {
    path: PathBuf,
    config: Config,
    catalog: CatalogIndex,
    store: SurveyStore,
    planner: StagingPlanner,
}

impl SpecVault {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open an archive with default configuration.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Open an archive.
    ///
    /// Reads the directory and the survey dictionary, builds the catalog
    /// index in memory, and verifies that dictionary and data groups agree
    /// when `strict_open` is set. Spectra stay on disk until staged.
    pub fn open_with_config(path: &Path, config: Config) -> Result<Self> {
        // Step 1: map the container
        let reader = Arc::new(ArchiveReader::open(path)?);

        // Step 2: parse the survey dictionary
        let dict = SurveyDict::from_json(reader.survey_dict_json())?;

        // Step 3: index the catalog
        let rows = reader.read_catalog_rows()?;
        let catalog = CatalogIndex::new(rows, dict)?;

        // Step 4: attach the store and cross-check it against the dictionary
        let store = SurveyStore::new(Arc::clone(&reader));
        for name in catalog.dict().names() {
            if !store.contains(name) {
                if config.strict_open {
                    return Err(VaultError::Container(format!(
                        "survey {} is in the dictionary but has no data group",
                        name
                    )));
                }
                warn!("survey {} is in the dictionary but has no data group", name);
            }
        }
        for name in store.surveys() {
            if !catalog.dict().contains(name) {
                if config.strict_open {
                    return Err(VaultError::Container(format!(
                        "data group {} is missing from the survey dictionary",
                        name
                    )));
                }
                warn!("data group {} is missing from the survey dictionary", name);
            }
        }

        // Step 5: seed the staging planner
        let planner = StagingPlanner::new(&config);

        info!(
            "opened archive {} ({} catalog rows, {} surveys)",
            path.display(),
            catalog.len(),
            store.surveys().len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            catalog,
            store,
            planner,
        })
    }

    // =========================================================================
    // Staged Loads
    // =========================================================================

    /// Load spectra for explicit identifiers from each named survey.
    ///
    /// Every identifier must resolve in every named survey; a miss fails
    /// the whole call with [`VaultError::PartialCoverage`]. Budget refusals
    /// and empty surveys are reported per survey, not as errors.
    pub fn spectra_by_id(
        &mut self,
        surveys: &[&str],
        ids: &[u64],
        filters: &[MetaFilter],
    ) -> Result<Vec<SurveyFetch>> {
        let mut fetched = Vec::with_capacity(surveys.len());
        for &survey in surveys {
            fetched.push(self.fetch_survey(survey, ids, filters)?);
        }
        Ok(fetched)
    }

    /// Load spectra for every source strictly within `radius` of `pos`.
    ///
    /// Searches the catalog once, then loads each survey's members of the
    /// hit set. `surveys = None` considers every survey in the archive;
    /// an explicit list is intersected with the archive, unknown names
    /// skipped with a warning.
    pub fn spectra_by_coord(
        &mut self,
        pos: SkyPos,
        radius: Angle,
        surveys: Option<&[&str]>,
    ) -> Result<Vec<SurveyFetch>> {
        let ids = self.catalog.radial_search(pos, radius)?;
        if ids.is_empty() {
            warn!(
                "no sources within {:.2} arcsec of ({:.5}, {:.5})",
                radius.arcsec(),
                pos.ra_deg,
                pos.dec_deg
            );
            return Ok(Vec::new());
        }
        if ids.len() > 1 {
            warn!(
                "{} sources within {:.2} arcsec of ({:.5}, {:.5}), loading all of them",
                ids.len(),
                radius.arcsec(),
                pos.ra_deg,
                pos.dec_deg
            );
        }

        let selected: Vec<String> = match surveys {
            None => self.store.surveys().to_vec(),
            Some(requested) => {
                let mut keep = Vec::with_capacity(requested.len());
                for &name in requested {
                    if self.store.contains(name) {
                        keep.push(name.to_string());
                    } else {
                        warn!("skipping unknown survey {} in coordinate query", name);
                    }
                }
                keep
            }
        };

        let mut fetched = Vec::with_capacity(selected.len());
        for survey in selected {
            let survey_ids = self.catalog.filter_by_surveys(&[&survey], &ids)?;
            fetched.push(self.fetch_survey(&survey, &survey_ids, &[])?);
        }
        Ok(fetched)
    }

    /// Resolve, authorize, load, and account for one survey's spectra.
    fn fetch_survey(
        &mut self,
        survey: &str,
        ids: &[u64],
        filters: &[MetaFilter],
    ) -> Result<SurveyFetch> {
        if ids.is_empty() {
            warn!("no identifiers to load from {}", survey);
            return Ok(SurveyFetch::NoMatch {
                survey: survey.to_string(),
            });
        }

        let staging = self.store.resolve(survey, ids, filters)?;
        let estimate = self
            .planner
            .estimate_for(&self.store, survey, staging.requested())?;
        if !self.planner.authorize(estimate) {
            return Ok(SurveyFetch::Refused {
                survey: survey.to_string(),
                estimated_bytes: estimate,
            });
        }

        let records = self.store.load_spectra(&staging)?;
        let actual: u64 = records.iter().map(|r| r.nbytes()).sum();
        self.planner.commit(actual);
        self.planner.refresh();

        // Metadata comes back in table order; realign it with the spectra.
        let meta = MetaTable {
            survey: survey.to_string(),
            rows: staging
                .order
                .iter()
                .map(|&pos| staging.meta.rows[pos].clone())
                .collect(),
        };
        let spectra = records
            .into_iter()
            .map(|r| Spectrum::from_record(r, self.config.mask_policy))
            .collect();

        Ok(SurveyFetch::Loaded {
            survey: survey.to_string(),
            spectra,
            meta,
        })
    }

    // =========================================================================
    // Catalog Queries
    // =========================================================================

    /// Identifiers of sources strictly within `radius` of `pos`.
    pub fn radial_search(&self, pos: SkyPos, radius: Angle) -> Result<Vec<u64>> {
        self.catalog.radial_search(pos, radius)
    }

    /// Radial search reporting private identifiers where present.
    pub fn radial_search_private(&self, pos: SkyPos, radius: Angle) -> Result<Vec<u64>> {
        self.catalog.radial_search_private(pos, radius)
    }

    /// Per-position indicator of catalog coverage within `radius`.
    pub fn radial_search_batch(&self, positions: &[SkyPos], radius: Angle) -> Result<Vec<bool>> {
        self.catalog.radial_search_batch(positions, radius)
    }

    /// Match external positions against the catalog by nearest neighbor.
    pub fn sky_match(&self, positions: &[SkyPos], tolerance: Angle) -> Result<Vec<u64>> {
        self.catalog.sky_match(positions, tolerance)
    }

    /// Foreground/background pairs closer than `separation` on the sky
    /// with a velocity offset above `dv_min`.
    pub fn find_pairs(&self, separation: Angle, dv_min: Velocity) -> Result<(Vec<u64>, Vec<u64>)> {
        self.catalog.find_pairs(separation, dv_min)
    }

    /// Full metadata tables for the named surveys, no staging involved.
    pub fn metadata(&self, surveys: &[&str]) -> Result<Vec<MetaTable>> {
        surveys
            .iter()
            .map(|survey| self.store.load_meta(survey, None))
            .collect()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Surveys with data groups in the archive. The store's view wins over
    /// the catalog dictionary when the two disagree.
    pub fn surveys(&self) -> &[String] {
        self.store.surveys()
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn store(&self) -> &SurveyStore {
        &self.store
    }

    pub fn planner(&self) -> &StagingPlanner {
        &self.planner
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
