//! Container Module
//!
//! Single-file columnar archive holding the union catalog and one group of
//! row-aligned metadata/spectra tables per survey.
//!
//! ## Responsibilities
//! - Define the on-disk format and its row payloads
//! - Write finished, immutable archive files (builder)
//! - Serve row-selective reads against an open archive (reader)
//!
//! ## File Format (V1)
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (8)                                               │
//! │ ┌───────────────┬──────────────┬───────────────────────┐ │
//! │ │ Magic "SVLT"  │ Version (2)  │ Reserved (2)          │ │
//! │ └───────────────┴──────────────┴───────────────────────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Survey dictionary (UTF-8 JSON)                           │
//! │   {"<survey>": <power-of-two bit>, ...}                  │
//! ├──────────────────────────────────────────────────────────┤
//! │ Table rows (catalog, then meta/spec pairs per survey)    │
//! │ ┌────────────┬─────────────────────────────────────────┐ │
//! │ │ RowLen (4) │ bincode payload                         │ │
//! │ └────────────┴─────────────────────────────────────────┘ │
//! │ ... (row order in the file is unspecified; the           │
//! │      directory locates every row by absolute offset)     │
//! ├──────────────────────────────────────────────────────────┤
//! │ Directory (bincode): dictionary span, catalog offsets,   │
//! │   group entries with meta/spec offsets                   │
//! ├──────────────────────────────────────────────────────────┤
//! │ Footer (16)                                              │
//! │ ┌───────────────────┬──────────────┬───────────────────┐ │
//! │ │ DirOffset (8)     │ DirCRC (4)   │ Reserved (4)      │ │
//! │ └───────────────────┴──────────────┴───────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers little-endian. The directory CRC covers the serialized
//! directory bytes, so an archive with a torn or bit-rotted tail is
//! rejected at open.

mod builder;
mod reader;

pub use builder::ArchiveBuilder;
pub use reader::ArchiveReader;

use serde::{Deserialize, Serialize};

/// File magic, first four bytes of every archive.
pub const MAGIC: &[u8; 4] = b"SVLT";

/// Current container format version.
pub const FORMAT_VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + reserved (2)
pub const HEADER_SIZE: usize = 8;

/// Footer size: directory offset (8) + directory CRC (4) + reserved (4)
pub const FOOTER_SIZE: usize = 16;

/// Maximum size of a single row payload (256 MB). A length prefix beyond
/// this is treated as corruption rather than an allocation request.
pub const MAX_ROW_SIZE: u32 = 256 * 1024 * 1024;

// =============================================================================
// Row Payloads
// =============================================================================

/// One entry of the union catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    /// Archive-wide unique identifier
    pub id: u64,

    /// Private identifier from the originating survey, where one exists
    pub priv_id: Option<u64>,

    /// Right ascension (degrees)
    pub ra: f64,

    /// Declination (degrees)
    pub dec: f64,

    /// Emission redshift
    pub zem: f64,

    /// Uncertainty on the emission redshift
    pub sig_zem: f64,

    /// Survey membership bitmask (set bits per the survey dictionary)
    pub survey_flag: u64,
}

/// Per-spectrum metadata inside a survey group, row-aligned with the
/// group's spectral records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRow {
    pub id: u64,
    pub ra: f64,
    pub dec: f64,
    pub zem: f64,

    /// Wavelength coverage (Angstrom)
    pub wv_min: f64,
    pub wv_max: f64,

    /// Pixel count of the spectral record
    pub npix: u32,

    pub instrument: String,
    pub grating: String,
    pub spec_file: String,
}

/// Raw spectral columns for one observation. Each record is independently
/// sized; the continuum column is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralRecord {
    pub wave: Vec<f64>,
    pub flux: Vec<f32>,
    pub sig: Vec<f32>,
    pub co: Option<Vec<f32>>,
}

impl SpectralRecord {
    /// In-memory byte size of the column data.
    pub fn nbytes(&self) -> u64 {
        let co_len = self.co.as_ref().map(|c| c.len()).unwrap_or(0);
        (self.wave.len() * 8 + (self.flux.len() + self.sig.len() + co_len) * 4) as u64
    }
}

// =============================================================================
// Directory
// =============================================================================

/// Byte span of one variable-length block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockLoc {
    pub offset: u64,
    pub len: u64,
}

/// Row locations of one length-prefixed table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableLoc {
    /// Absolute file offset of each row's length prefix, in table order.
    pub row_offsets: Vec<u64>,
}

impl TableLoc {
    pub fn row_count(&self) -> usize {
        self.row_offsets.len()
    }
}

/// One survey group: a metadata table and its row-aligned spectra table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    pub meta: TableLoc,
    pub spec: TableLoc,
}

/// Trailing directory describing where everything in the file lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directory {
    /// Span of the survey dictionary JSON block
    pub survey_dict: BlockLoc,

    /// Union catalog table
    pub catalog: TableLoc,

    /// Survey groups, in ingestion order
    pub groups: Vec<GroupEntry>,
}

impl Directory {
    /// Look up a survey group by name.
    pub fn group(&self, survey: &str) -> Option<&GroupEntry> {
        self.groups.iter().find(|g| g.name == survey)
    }
}
