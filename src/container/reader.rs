//! Archive reader
//!
//! Read-only access to a finished container file. The header, version, and
//! directory checksum are validated once at open; after that every table
//! row can be read selectively through the in-memory offset arrays.
//!
//! The file handle lives behind a `parking_lot::Mutex`, so reads take
//! `&self` and the reader can be shared.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, VaultError};

use super::{
    CatalogRow, Directory, GroupEntry, MetaRow, SpectralRecord, TableLoc,
    FOOTER_SIZE, FORMAT_VERSION, HEADER_SIZE, MAGIC, MAX_ROW_SIZE,
};

/// Reader over one archive file
pub struct ArchiveReader {
    path: PathBuf,
    file: Mutex<BufReader<File>>,
    directory: Directory,
    dict_json: String,
}

impl ArchiveReader {
    /// Open an archive for reading.
    ///
    /// On open:
    /// 1. Validate magic and format version
    /// 2. Locate the directory via the footer and verify its CRC
    /// 3. Load the directory and the survey dictionary block
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        if file_len < (HEADER_SIZE + FOOTER_SIZE) as u64 {
            return Err(VaultError::Container(format!(
                "file too small to be an archive: {} bytes",
                file_len
            )));
        }

        // Step 1: header
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;
        if &header[0..4] != MAGIC {
            return Err(VaultError::Container(
                "bad magic; not a spectral archive".to_string(),
            ));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FORMAT_VERSION {
            return Err(VaultError::Container(format!(
                "unsupported container version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        // Step 2: footer, then the directory it points at
        let footer_offset = file_len - FOOTER_SIZE as u64;
        reader.seek(SeekFrom::Start(footer_offset))?;
        let mut footer = [0u8; FOOTER_SIZE];
        reader.read_exact(&mut footer)?;
        let dir_offset = u64::from_le_bytes([
            footer[0], footer[1], footer[2], footer[3], footer[4], footer[5], footer[6],
            footer[7],
        ]);
        let dir_crc = u32::from_le_bytes([footer[8], footer[9], footer[10], footer[11]]);

        if dir_offset < HEADER_SIZE as u64 || dir_offset > footer_offset {
            return Err(VaultError::Container(format!(
                "directory offset {} out of bounds",
                dir_offset
            )));
        }

        let dir_len = (footer_offset - dir_offset) as usize;
        let mut dir_bytes = vec![0u8; dir_len];
        reader.seek(SeekFrom::Start(dir_offset))?;
        reader.read_exact(&mut dir_bytes)?;

        if crc32fast::hash(&dir_bytes) != dir_crc {
            return Err(VaultError::Container(
                "directory checksum mismatch".to_string(),
            ));
        }

        let directory: Directory = bincode::deserialize(&dir_bytes)
            .map_err(|e| VaultError::Serialization(format!("archive directory: {}", e)))?;

        // Step 3: survey dictionary block
        let mut dict_bytes = vec![0u8; directory.survey_dict.len as usize];
        reader.seek(SeekFrom::Start(directory.survey_dict.offset))?;
        reader.read_exact(&mut dict_bytes)?;
        let dict_json = String::from_utf8(dict_bytes)
            .map_err(|e| VaultError::Container(format!("survey dictionary block: {}", e)))?;

        debug!(
            "opened archive {}: {} catalog rows, {} survey groups",
            path.display(),
            directory.catalog.row_count(),
            directory.groups.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(reader),
            directory,
            dict_json,
        })
    }

    /// Path of the underlying archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Survey dictionary block as raw JSON text.
    pub fn survey_dict_json(&self) -> &str {
        &self.dict_json
    }

    /// The archive directory.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    // =========================================================================
    // Catalog Table
    // =========================================================================

    /// Read the full catalog table, in table order.
    pub fn read_catalog_rows(&self) -> Result<Vec<CatalogRow>> {
        let mut rows = Vec::with_capacity(self.directory.catalog.row_count());
        for &offset in &self.directory.catalog.row_offsets {
            rows.push(self.read_row_at(offset)?);
        }
        Ok(rows)
    }

    // =========================================================================
    // Survey Tables
    // =========================================================================

    /// Rows in a survey's metadata table (== its spectra table).
    pub fn meta_row_count(&self, survey: &str) -> Result<usize> {
        Ok(self.group(survey)?.meta.row_count())
    }

    /// Rows in a survey's spectra table.
    pub fn spec_row_count(&self, survey: &str) -> Result<usize> {
        Ok(self.group(survey)?.spec.row_count())
    }

    /// Read one metadata row of a survey.
    pub fn read_meta_row(&self, survey: &str, row: usize) -> Result<MetaRow> {
        let group = self.group(survey)?;
        let offset = Self::row_offset(&group.meta, row, survey)?;
        self.read_row_at(offset)
    }

    /// Read one spectral record of a survey.
    pub fn read_spec_row(&self, survey: &str, row: usize) -> Result<SpectralRecord> {
        let group = self.group(survey)?;
        let offset = Self::row_offset(&group.spec, row, survey)?;
        self.read_row_at(offset)
    }

    /// Stored byte length of one spectral record, without reading it.
    pub fn spec_row_len(&self, survey: &str, row: usize) -> Result<u32> {
        let group = self.group(survey)?;
        let offset = Self::row_offset(&group.spec, row, survey)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let mut len_bytes = [0u8; 4];
        file.read_exact(&mut len_bytes)?;
        Ok(u32::from_le_bytes(len_bytes))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn group(&self, survey: &str) -> Result<&GroupEntry> {
        self.directory
            .group(survey)
            .ok_or_else(|| VaultError::UnknownSurvey(survey.to_string()))
    }

    fn row_offset(table: &TableLoc, row: usize, survey: &str) -> Result<u64> {
        table.row_offsets.get(row).copied().ok_or_else(|| {
            VaultError::Container(format!(
                "row {} out of range for survey {} ({} rows)",
                row,
                survey,
                table.row_count()
            ))
        })
    }

    /// Read and decode one length-prefixed row at an absolute offset.
    fn read_row_at<T: DeserializeOwned>(&self, offset: u64) -> Result<T> {
        let payload = {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;

            let mut len_bytes = [0u8; 4];
            file.read_exact(&mut len_bytes)?;
            let len = u32::from_le_bytes(len_bytes);
            if len > MAX_ROW_SIZE {
                return Err(VaultError::Container(format!(
                    "row length {} at offset {} exceeds the {} byte maximum",
                    len, offset, MAX_ROW_SIZE
                )));
            }

            let mut payload = vec![0u8; len as usize];
            file.read_exact(&mut payload)?;
            payload
        };

        bincode::deserialize(&payload).map_err(|e| VaultError::Serialization(e.to_string()))
    }
}
