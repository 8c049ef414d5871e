//! Configuration for SpecVault
//!
//! Centralized configuration with sensible defaults.

use crate::spectrum::MaskPolicy;

/// Main configuration for a SpecVault instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Staging Configuration
    // -------------------------------------------------------------------------
    /// Soft threshold for staged-spectra memory (bytes).
    /// Crossing it logs a warning; requests are still granted.
    pub budget_warning_bytes: u64,

    /// Hard ceiling for staged-spectra memory (bytes).
    /// A load whose estimate would push usage past this is refused.
    pub budget_maximum_bytes: u64,

    /// Re-derive used bytes from the process resident set size at open and
    /// after each committed load. Linux only; a no-op elsewhere. Disable for
    /// deterministic budget behavior in embeddings and tests.
    pub probe_process_memory: bool,

    // -------------------------------------------------------------------------
    // Open Configuration
    // -------------------------------------------------------------------------
    /// Cross-check the survey dictionary against the container's survey
    /// groups at open and fail on any mismatch.
    pub strict_open: bool,

    // -------------------------------------------------------------------------
    // Assembly Configuration
    // -------------------------------------------------------------------------
    /// Pixel-masking policy applied when assembling spectra.
    pub mask_policy: MaskPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            budget_warning_bytes: 5_000_000_000,   // 5 GB
            budget_maximum_bytes: 10_000_000_000,  // 10 GB
            probe_process_memory: true,
            strict_open: true,
            mask_policy: MaskPolicy::Edges,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the soft memory warning threshold (in bytes)
    pub fn budget_warning_bytes(mut self, bytes: u64) -> Self {
        self.config.budget_warning_bytes = bytes;
        self
    }

    /// Set the hard memory ceiling (in bytes)
    pub fn budget_maximum_bytes(mut self, bytes: u64) -> Self {
        self.config.budget_maximum_bytes = bytes;
        self
    }

    /// Enable or disable the process resident-set-size probe
    pub fn probe_process_memory(mut self, enabled: bool) -> Self {
        self.config.probe_process_memory = enabled;
        self
    }

    /// Enable or disable the dictionary/group cross-check at open
    pub fn strict_open(mut self, enabled: bool) -> Self {
        self.config.strict_open = enabled;
        self
    }

    /// Set the pixel-masking policy for assembled spectra
    pub fn mask_policy(mut self, policy: MaskPolicy) -> Self {
        self.config.mask_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
