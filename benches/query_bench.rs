//! Benchmarks for SpecVault query paths

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use specvault::catalog::{CatalogIndex, SurveyDict};
use specvault::container::{ArchiveBuilder, CatalogRow, MetaRow, SpectralRecord};
use specvault::{Angle, Config, SkyPos, SpecVault, Velocity};
use tempfile::TempDir;

fn xorshift(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn shuffle(items: &mut [u64], state: &mut u64) {
    for i in (1..items.len()).rev() {
        let j = (xorshift(state) % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

fn synth_dict() -> SurveyDict {
    let mut bits = BTreeMap::new();
    bits.insert("SYNTH".to_string(), 1);
    SurveyDict::new(bits).unwrap()
}

fn synthetic_index(n: usize) -> CatalogIndex {
    let mut state = 0x5eed_cafe_f00d_u64;
    let rows = (0..n)
        .map(|i| {
            let ra = (xorshift(&mut state) % 360_000) as f64 / 1000.0;
            let dec = (xorshift(&mut state) % 170_000) as f64 / 1000.0 - 85.0;
            CatalogRow {
                id: i as u64,
                priv_id: None,
                ra,
                dec,
                zem: 1.0 + (xorshift(&mut state) % 3000) as f64 / 1000.0,
                sig_zem: 1e-4,
                survey_flag: 1,
            }
        })
        .collect();
    CatalogIndex::new(rows, synth_dict()).unwrap()
}

fn catalog_benchmarks(c: &mut Criterion) {
    let index = synthetic_index(10_000);
    let pos = SkyPos::new(180.0, 0.0).unwrap();
    let radius = Angle::from_degrees(2.0);

    c.bench_function("radial_search_10k", |b| {
        b.iter(|| {
            index
                .radial_search(black_box(pos), black_box(radius))
                .unwrap()
        })
    });

    c.bench_function("find_pairs_10k", |b| {
        b.iter(|| {
            index
                .find_pairs(Angle::from_arcsec(30.0), Velocity::from_kms(500.0))
                .unwrap()
        })
    });
}

fn store_benchmarks(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bench.svlt");

    // Table order deliberately disagrees with identifier order
    let mut state = 0xdead_beef_u64;
    let mut table_ids: Vec<u64> = (0..1000).collect();
    shuffle(&mut table_ids, &mut state);

    let mut builder = ArchiveBuilder::create(&path, &synth_dict()).unwrap();
    for &id in &table_ids {
        builder
            .add_catalog_row(&CatalogRow {
                id,
                priv_id: None,
                ra: (id % 360) as f64,
                dec: 0.0,
                zem: 2.0,
                sig_zem: 1e-4,
                survey_flag: 1,
            })
            .unwrap();
    }
    builder.begin_survey("SYNTH").unwrap();
    for &id in &table_ids {
        let meta = MetaRow {
            id,
            ra: (id % 360) as f64,
            dec: 0.0,
            zem: 2.0,
            wv_min: 3600.0,
            wv_max: 3616.0,
            npix: 16,
            instrument: "SYNTH".to_string(),
            grating: "G1".to_string(),
            spec_file: format!("spec_{}.fits", id),
        };
        let spec = SpectralRecord {
            wave: (0..16).map(|i| 3600.0 + i as f64).collect(),
            flux: vec![1.0; 16],
            sig: vec![1.0; 16],
            co: None,
        };
        builder.add_observation(&meta, &spec).unwrap();
    }
    builder.finish().unwrap();

    let config = Config::builder().probe_process_memory(false).build();
    let vault = SpecVault::open_with_config(&path, config).unwrap();

    let mut request = table_ids.clone();
    shuffle(&mut request, &mut state);

    c.bench_function("resolve_1k", |b| {
        b.iter(|| {
            vault
                .store()
                .resolve("SYNTH", black_box(&request), &[])
                .unwrap()
        })
    });
}

criterion_group!(benches, catalog_benchmarks, store_benchmarks);
criterion_main!(benches);
