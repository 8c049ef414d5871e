//! Catalog Module
//!
//! In-memory view of the archive's union catalog.
//!
//! ## Responsibilities
//! - Decode/encode survey membership from the flag bitmask
//! - Radial search and nearest-neighbor matching over sky positions
//! - Foreground/background pair construction from emission redshifts

mod index;
mod sky;

pub use index::CatalogIndex;

use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, VaultError};

/// Mapping from survey name to its bit value in the membership bitmask.
///
/// Every bit value is a distinct power of two, so membership of a row in
/// a survey reduces to `flag & bit != 0`.
#[derive(Debug, Clone)]
pub struct SurveyDict {
    bits: BTreeMap<String, u64>,
}

impl SurveyDict {
    /// Build a dictionary, validating that every bit value is a distinct
    /// power of two.
    pub fn new(bits: BTreeMap<String, u64>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (name, &bit) in &bits {
            if bit == 0 || bit & (bit - 1) != 0 {
                return Err(VaultError::Container(format!(
                    "survey dictionary: bit value {} for {} is not a power of two",
                    bit, name
                )));
            }
            if !seen.insert(bit) {
                return Err(VaultError::Container(format!(
                    "survey dictionary: bit value {} assigned twice",
                    bit
                )));
            }
        }
        Ok(Self { bits })
    }

    /// Parse a dictionary from its JSON text block.
    pub fn from_json(text: &str) -> Result<Self> {
        let bits: BTreeMap<String, u64> = serde_json::from_str(text)
            .map_err(|e| VaultError::Serialization(format!("survey dictionary: {}", e)))?;
        Self::new(bits)
    }

    /// Serialize the dictionary to JSON text.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.bits)
            .map_err(|e| VaultError::Serialization(format!("survey dictionary: {}", e)))
    }

    /// Bit value of a survey.
    pub fn bit(&self, survey: &str) -> Result<u64> {
        self.bits
            .get(survey)
            .copied()
            .ok_or_else(|| VaultError::UnknownSurvey(survey.to_string()))
    }

    pub fn contains(&self, survey: &str) -> bool {
        self.bits.contains_key(survey)
    }

    /// Survey names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.bits.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.bits.iter().map(|(name, &bit)| (name.as_str(), bit))
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Union of all defined bit values.
    pub fn all_bits(&self) -> u64 {
        self.bits.values().fold(0, |acc, &bit| acc | bit)
    }

    /// Survey names whose bit is set in `flag`, sorted.
    pub fn decode(&self, flag: u64) -> Vec<String> {
        self.bits
            .iter()
            .filter(|(_, &bit)| flag & bit != 0)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Bitmask with the named surveys' bits set.
    pub fn encode(&self, surveys: &[&str]) -> Result<u64> {
        let mut flag = 0;
        for survey in surveys {
            flag |= self.bit(survey)?;
        }
        Ok(flag)
    }
}
