//! Archive builder
//!
//! Writes a container file front to back: header, survey dictionary,
//! table rows, then the directory and CRC-protected footer. A finished
//! archive is immutable; there is no append or rewrite path.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::catalog::SurveyDict;
use crate::error::{Result, VaultError};

use super::{
    BlockLoc, CatalogRow, Directory, GroupEntry, MetaRow, SpectralRecord, TableLoc,
    FORMAT_VERSION, MAGIC, MAX_ROW_SIZE,
};

/// Builder for creating new archive files
pub struct ArchiveBuilder {
    writer: BufWriter<File>,
    dict: SurveyDict,
    directory: Directory,
    current_group: Option<GroupEntry>,

    /// Bytes written so far; doubles as the next write offset.
    position: u64,
}

impl ArchiveBuilder {
    /// Create a new archive at `path` with the given survey dictionary.
    ///
    /// Writes the header and the dictionary block immediately.
    pub fn create(path: &Path, dict: &SurveyDict) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        // Header: magic + version + reserved
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&[0u8; 2])?;

        // Dictionary block, JSON text
        let dict_bytes = dict.to_json()?.into_bytes();
        writer.write_all(&dict_bytes)?;

        let header_len = (MAGIC.len() + 2 + 2) as u64;
        let directory = Directory {
            survey_dict: BlockLoc {
                offset: header_len,
                len: dict_bytes.len() as u64,
            },
            catalog: TableLoc::default(),
            groups: Vec::new(),
        };

        Ok(Self {
            writer,
            dict: dict.clone(),
            directory,
            current_group: None,
            position: header_len + dict_bytes.len() as u64,
        })
    }

    /// Append one catalog row.
    pub fn add_catalog_row(&mut self, row: &CatalogRow) -> Result<()> {
        let offset = self.write_row(row)?;
        self.directory.catalog.row_offsets.push(offset);
        Ok(())
    }

    /// Start a survey group. Observations appended afterwards belong to it
    /// until the next `begin_survey` or `finish`.
    pub fn begin_survey(&mut self, name: &str) -> Result<()> {
        if !self.dict.contains(name) {
            return Err(VaultError::UnknownSurvey(name.to_string()));
        }

        let duplicate = self.directory.groups.iter().any(|g| g.name == name)
            || self.current_group.as_ref().map(|g| g.name == name).unwrap_or(false);
        if duplicate {
            return Err(VaultError::Container(format!(
                "duplicate survey group: {}",
                name
            )));
        }

        self.close_group();
        self.current_group = Some(GroupEntry {
            name: name.to_string(),
            meta: TableLoc::default(),
            spec: TableLoc::default(),
        });
        Ok(())
    }

    /// Append one row-aligned observation (metadata + spectral record) to
    /// the open survey group.
    pub fn add_observation(&mut self, meta: &MetaRow, spec: &SpectralRecord) -> Result<()> {
        if self.current_group.is_none() {
            return Err(VaultError::Container(
                "no open survey group; call begin_survey first".to_string(),
            ));
        }

        let meta_offset = self.write_row(meta)?;
        let spec_offset = self.write_row(spec)?;

        if let Some(group) = self.current_group.as_mut() {
            group.meta.row_offsets.push(meta_offset);
            group.spec.row_offsets.push(spec_offset);
        }
        Ok(())
    }

    /// Finish the archive: write the directory and the CRC footer, then
    /// flush and sync everything to disk.
    pub fn finish(mut self) -> Result<()> {
        self.close_group();

        let dir_offset = self.position;
        let dir_bytes = bincode::serialize(&self.directory)
            .map_err(|e| VaultError::Serialization(format!("archive directory: {}", e)))?;
        let dir_crc = crc32fast::hash(&dir_bytes);

        self.writer.write_all(&dir_bytes)?;

        // Footer: directory offset + CRC + reserved
        self.writer.write_all(&dir_offset.to_le_bytes())?;
        self.writer.write_all(&dir_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;

        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;

        debug!(
            "finished archive: {} catalog rows, {} survey groups, directory at {}",
            self.directory.catalog.row_count(),
            self.directory.groups.len(),
            dir_offset
        );
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Write one length-prefixed bincode row; returns its absolute offset.
    fn write_row<T: Serialize>(&mut self, value: &T) -> Result<u64> {
        let payload = bincode::serialize(value)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;
        if payload.len() > MAX_ROW_SIZE as usize {
            return Err(VaultError::Serialization(format!(
                "row of {} bytes exceeds the {} byte maximum",
                payload.len(),
                MAX_ROW_SIZE
            )));
        }

        let offset = self.position;
        self.writer.write_all(&(payload.len() as u32).to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.position += 4 + payload.len() as u64;
        Ok(offset)
    }

    /// Move the open group (if any) into the directory.
    fn close_group(&mut self) {
        if let Some(group) = self.current_group.take() {
            self.directory.groups.push(group);
        }
    }
}
