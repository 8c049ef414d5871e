//! Tests for the catalog index
//!
//! These tests verify:
//! - Survey bitmask encode/decode round trips
//! - Membership filtering via bitwise AND, preserving input order
//! - Radial search with a strict bound at the exact radius
//! - Nearest-neighbor sky matching
//! - Foreground/background pair finding and its parameter validation

use std::collections::BTreeMap;

use specvault::catalog::{CatalogIndex, SurveyDict};
use specvault::container::CatalogRow;
use specvault::{Angle, SkyPos, VaultError, Velocity};

// =============================================================================
// Helper Functions
// =============================================================================

fn dict(pairs: &[(&str, u64)]) -> SurveyDict {
    let bits: BTreeMap<String, u64> = pairs
        .iter()
        .map(|(name, bit)| (name.to_string(), *bit))
        .collect();
    SurveyDict::new(bits).unwrap()
}

fn row(id: u64, ra: f64, dec: f64, zem: f64, flag: u64) -> CatalogRow {
    CatalogRow {
        id,
        priv_id: None,
        ra,
        dec,
        zem,
        sig_zem: 1e-4,
        survey_flag: flag,
    }
}

/// Four sources along the equator around a query at the origin.
fn equator_index() -> CatalogIndex {
    let rows = vec![
        row(1, 0.0, 0.0, 2.0, 1),
        row(2, 0.9999, 0.0, 2.1, 1),
        row(3, 1.0, 0.0, 2.2, 1),
        row(4, 1.0001, 0.0, 2.3, 1),
    ];
    CatalogIndex::new(rows, dict(&[("A", 1)])).unwrap()
}

fn pos(ra: f64, dec: f64) -> SkyPos {
    SkyPos::new(ra, dec).unwrap()
}

// =============================================================================
// Bitmask Tests
// =============================================================================

#[test]
fn test_bitmask_round_trip() {
    let dict = dict(&[("A", 1), ("B", 2), ("C", 4)]);

    let subsets: [&[&str]; 7] = [
        &["A"],
        &["B"],
        &["C"],
        &["A", "B"],
        &["A", "C"],
        &["B", "C"],
        &["A", "B", "C"],
    ];
    for subset in subsets {
        let flag = dict.encode(subset).unwrap();
        assert_eq!(dict.decode(flag), subset.to_vec());
    }

    // The empty set is flag zero
    assert_eq!(dict.encode(&[]).unwrap(), 0);
    assert!(dict.decode(0).is_empty());
}

#[test]
fn test_encode_rejects_unknown_survey() {
    let dict = dict(&[("A", 1)]);
    let result = dict.encode(&["A", "NOPE"]);
    assert!(matches!(result, Err(VaultError::UnknownSurvey(_))));
}

#[test]
fn test_decode_ignores_undefined_bits() {
    let dict = dict(&[("A", 1), ("B", 2)]);
    assert_eq!(dict.decode(1 | 8), vec!["A".to_string()]);
}

#[test]
fn test_dict_rejects_overlapping_bits() {
    let mut bits = BTreeMap::new();
    bits.insert("A".to_string(), 1);
    bits.insert("B".to_string(), 3);
    assert!(matches!(
        SurveyDict::new(bits),
        Err(VaultError::Container(_))
    ));
}

#[test]
fn test_membership_filter_keeps_input_order() {
    let rows = vec![
        row(101, 1.0, 1.0, 2.0, 1),
        row(102, 2.0, 2.0, 2.0, 2),
        row(103, 3.0, 3.0, 2.0, 3),
    ];
    let index = CatalogIndex::new(rows, dict(&[("A", 1), ("B", 2)])).unwrap();

    let ids = [101, 102, 103];
    assert_eq!(index.filter_by_surveys(&["A"], &ids).unwrap(), vec![101, 103]);
    assert_eq!(index.filter_by_surveys(&["B"], &ids).unwrap(), vec![102, 103]);
    assert_eq!(
        index.filter_by_surveys(&["A", "B"], &ids).unwrap(),
        vec![101, 102, 103]
    );
}

#[test]
fn test_membership_filter_skips_absent_ids() {
    let rows = vec![row(101, 1.0, 1.0, 2.0, 1)];
    let index = CatalogIndex::new(rows, dict(&[("A", 1)])).unwrap();

    let kept = index.filter_by_surveys(&["A"], &[999, 101]).unwrap();
    assert_eq!(kept, vec![101]);
}

// =============================================================================
// Index Construction Tests
// =============================================================================

#[test]
fn test_duplicate_identifiers_rejected() {
    let rows = vec![row(7, 1.0, 1.0, 2.0, 1), row(7, 2.0, 2.0, 2.1, 1)];
    let result = CatalogIndex::new(rows, dict(&[("A", 1)]));
    assert!(matches!(result, Err(VaultError::Container(_))));
}

#[test]
fn test_undefined_flag_bits_rejected() {
    let rows = vec![row(7, 1.0, 1.0, 2.0, 8)];
    let result = CatalogIndex::new(rows, dict(&[("A", 1), ("B", 2), ("C", 4)]));
    assert!(matches!(result, Err(VaultError::Container(_))));
}

#[test]
fn test_rows_for_ids_in_catalog_order() {
    let rows = vec![
        row(101, 1.0, 1.0, 2.0, 1),
        row(102, 2.0, 2.0, 2.0, 1),
        row(103, 3.0, 3.0, 2.0, 1),
    ];
    let index = CatalogIndex::new(rows, dict(&[("A", 1)])).unwrap();

    let fetched = index.rows_for_ids(&[103, 101, 101]);
    let ids: Vec<u64> = fetched.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![101, 103]);
}

// =============================================================================
// Radial Search Tests
// =============================================================================

#[test]
fn test_radial_search_strict_at_exact_radius() {
    let index = equator_index();

    // Sources at 0, 0.9999, 1.0, and 1.0001 degrees from the query.
    // The bound is strict, so the source exactly at the radius is out.
    let hits = index
        .radial_search(pos(0.0, 0.0), Angle::from_degrees(1.0))
        .unwrap();
    assert_eq!(hits, vec![1, 2]);
}

#[test]
fn test_radial_search_rejects_nonpositive_radius() {
    let index = equator_index();

    for radius in [0.0, -1.0, f64::NAN] {
        let result = index.radial_search(pos(0.0, 0.0), Angle::from_degrees(radius));
        assert!(matches!(result, Err(VaultError::InvalidQueryParameter(_))));
    }
}

#[test]
fn test_radial_search_private_identifiers() {
    let mut with_priv = row(2, 0.9999, 0.0, 2.1, 1);
    with_priv.priv_id = Some(202);
    let rows = vec![row(1, 0.0, 0.0, 2.0, 1), with_priv];
    let index = CatalogIndex::new(rows, dict(&[("A", 1)])).unwrap();

    let hits = index
        .radial_search_private(pos(0.0, 0.0), Angle::from_degrees(1.0))
        .unwrap();
    assert_eq!(hits, vec![1, 202]);
}

#[test]
fn test_radial_search_batch_flags_coverage() {
    let index = equator_index();

    let positions = [pos(0.5, 0.0), pos(120.0, -60.0)];
    let covered = index
        .radial_search_batch(&positions, Angle::from_degrees(1.0))
        .unwrap();
    assert_eq!(covered, vec![true, false]);
}

// =============================================================================
// Sky Match Tests
// =============================================================================

#[test]
fn test_sky_match_within_tolerance_only() {
    let index = equator_index();

    let positions = [
        pos(0.00001, 0.0), // 0.036 arcsec from source 1
        pos(0.5, 0.0),     // half a degree from anything
    ];
    let matched = index
        .sky_match(&positions, Angle::from_arcsec(1.0))
        .unwrap();
    assert_eq!(matched, vec![1]);
}

// =============================================================================
// Pair Finding Tests
// =============================================================================

#[test]
fn test_pair_finder_orients_foreground_first() {
    let rows = vec![
        row(1, 10.0, 0.0, 2.0, 1),
        row(2, 10.0002, 0.0, 2.2, 1),
    ];
    let index = CatalogIndex::new(rows, dict(&[("A", 1)])).unwrap();

    let (fg, bg) = index
        .find_pairs(Angle::from_arcsec(5.0), Velocity::from_kms(100.0))
        .unwrap();

    // One pair, reported once, lower redshift in front
    assert_eq!(fg, vec![1]);
    assert_eq!(bg, vec![2]);
}

#[test]
fn test_pair_finder_respects_velocity_floor() {
    let rows = vec![
        row(1, 10.0, 0.0, 2.0, 1),
        row(2, 10.0002, 0.0, 2.2, 1),
    ];
    let index = CatalogIndex::new(rows, dict(&[("A", 1)])).unwrap();

    // The offset between z=2.0 and z=2.2 is about 19,300 km/s
    let (fg, bg) = index
        .find_pairs(Angle::from_arcsec(5.0), Velocity::from_kms(25_000.0))
        .unwrap();
    assert!(fg.is_empty());
    assert!(bg.is_empty());
}

#[test]
fn test_pair_finder_respects_separation() {
    let rows = vec![
        row(1, 10.0, 0.0, 2.0, 1),
        row(2, 11.0, 0.0, 2.2, 1),
    ];
    let index = CatalogIndex::new(rows, dict(&[("A", 1)])).unwrap();

    let (fg, _bg) = index
        .find_pairs(Angle::from_arcsec(5.0), Velocity::from_kms(100.0))
        .unwrap();
    assert!(fg.is_empty());
}

#[test]
fn test_pair_finder_rejects_nonpositive_velocity() {
    let index = equator_index();

    for dv in [0.0, -5.0, f64::NAN] {
        let result = index.find_pairs(Angle::from_arcsec(5.0), Velocity::from_kms(dv));
        assert!(matches!(result, Err(VaultError::InvalidQueryParameter(_))));
    }
}
