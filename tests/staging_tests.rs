//! Tests for the staging planner
//!
//! These tests verify:
//! - Estimates scale the representative record length by the row count
//! - Authorization refuses loads past the maximum without mutating state
//! - Manual accounting survives refresh when process probing is off
//! - The process memory probe on platforms that expose it

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use specvault::catalog::SurveyDict;
use specvault::container::{ArchiveBuilder, CatalogRow, MetaRow, SpectralRecord};
use specvault::staging::{process_rss_bytes, StagingPlanner};
use specvault::{Config, SpecVault};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn build_archive(path: &Path) {
    let mut bits = BTreeMap::new();
    bits.insert("BOSS".to_string(), 1);
    bits.insert("EMPTY".to_string(), 2);
    let dict = SurveyDict::new(bits).unwrap();

    let meta = MetaRow {
        id: 2,
        ra: 10.0,
        dec: 0.0,
        zem: 2.0,
        wv_min: 3600.0,
        wv_max: 3640.0,
        npix: 40,
        instrument: "SDSS-III".to_string(),
        grating: "BLUE".to_string(),
        spec_file: "spec_2.fits".to_string(),
    };
    let spec = SpectralRecord {
        wave: (0..40).map(|i| 3600.0 + i as f64).collect(),
        flux: vec![1.0; 40],
        sig: vec![1.0; 40],
        co: None,
    };
    let row = CatalogRow {
        id: 2,
        priv_id: None,
        ra: 10.0,
        dec: 0.0,
        zem: 2.0,
        sig_zem: 1e-4,
        survey_flag: 1,
    };

    let mut builder = ArchiveBuilder::create(path, &dict).unwrap();
    builder.add_catalog_row(&row).unwrap();
    builder.begin_survey("BOSS").unwrap();
    builder.add_observation(&meta, &spec).unwrap();
    builder.begin_survey("EMPTY").unwrap();
    builder.finish().unwrap();
}

fn open_fixture() -> (TempDir, PathBuf, SpecVault) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("staging.svlt");
    build_archive(&path);

    let config = Config::builder().probe_process_memory(false).build();
    let vault = SpecVault::open_with_config(&path, config).unwrap();
    (temp_dir, path, vault)
}

fn manual_planner(warning: u64, maximum: u64) -> StagingPlanner {
    let config = Config::builder()
        .budget_warning_bytes(warning)
        .budget_maximum_bytes(maximum)
        .probe_process_memory(false)
        .build();
    StagingPlanner::new(&config)
}

// =============================================================================
// Estimate Tests
// =============================================================================

#[test]
fn test_estimate_scales_with_rows() {
    let (_temp, _path, vault) = open_fixture();
    let planner = manual_planner(800, 1000);

    let unit = vault.store().representative_record_len("BOSS").unwrap();
    assert!(unit > 0);

    let estimate = planner.estimate_for(vault.store(), "BOSS", 3).unwrap();
    assert_eq!(estimate, unit * 3);
}

#[test]
fn test_estimate_zero_rows_touches_nothing() {
    let (_temp, _path, vault) = open_fixture();
    let planner = manual_planner(800, 1000);

    // Zero rows short-circuits before the survey is even looked up
    let estimate = planner.estimate_for(vault.store(), "NOPE", 0).unwrap();
    assert_eq!(estimate, 0);
}

#[test]
fn test_estimate_empty_survey_is_zero() {
    let (_temp, _path, vault) = open_fixture();
    let planner = manual_planner(800, 1000);

    let estimate = planner.estimate_for(vault.store(), "EMPTY", 5).unwrap();
    assert_eq!(estimate, 0);
}

// =============================================================================
// Budget Gate Tests
// =============================================================================

#[test]
fn test_budget_gate_sequence() {
    let mut planner = manual_planner(800, 1000);

    assert!(planner.authorize(600));
    planner.commit(600);

    // Refused, and refusal leaves the accounting untouched
    assert!(!planner.authorize(500));
    assert_eq!(planner.budget().used_bytes(), 600);

    // A smaller request still fits
    assert!(planner.authorize(300));
}

#[test]
fn test_refresh_without_probe_keeps_manual_accounting() {
    let mut planner = manual_planner(800, 1000);

    planner.commit(100);
    planner.refresh();

    assert_eq!(planner.budget().used_bytes(), 100);
}

// =============================================================================
// Process Probe Tests
// =============================================================================

#[cfg(target_os = "linux")]
#[test]
fn test_process_rss_is_measurable() {
    let rss = process_rss_bytes().unwrap();
    assert!(rss > 0);
}

#[cfg(target_os = "linux")]
#[test]
fn test_planner_seeds_from_process_memory() {
    let config = Config::builder()
        .budget_warning_bytes(u64::MAX)
        .budget_maximum_bytes(u64::MAX)
        .probe_process_memory(true)
        .build();
    let planner = StagingPlanner::new(&config);

    assert!(planner.budget().used_bytes() > 0);
}
