//! Staging planner
//!
//! Memory accounting for spectra loads. Every load is estimated and
//! authorized against an explicit budget before any bytes leave disk;
//! actual consumption is committed afterwards. Refusal is a normal
//! negative outcome, not an error.

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::store::SurveyStore;

/// Running memory budget for staged spectra.
///
/// Used bytes only ever grow; there is no release operation. The count
/// can be re-synced to an externally measured value via [`set_used`].
///
/// Not safe for concurrent staging: authorize and commit are separate
/// calls, so two interleaved stagers could jointly overcommit. The facade
/// serializes them by taking `&mut self` on every staged load.
///
/// [`set_used`]: MemoryBudget::set_used
#[derive(Debug, Clone)]
pub struct MemoryBudget {
    used_bytes: u64,
    warning_bytes: u64,
    maximum_bytes: u64,
}

impl MemoryBudget {
    pub fn new(warning_bytes: u64, maximum_bytes: u64) -> Self {
        Self {
            used_bytes: 0,
            warning_bytes,
            maximum_bytes,
        }
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn warning_bytes(&self) -> u64 {
        self.warning_bytes
    }

    pub fn maximum_bytes(&self) -> u64 {
        self.maximum_bytes
    }

    /// Whether `estimate` additional bytes fit under the hard maximum.
    /// Refusal logs a warning and leaves the budget untouched.
    pub fn authorize(&self, estimate: u64) -> bool {
        let projected = self.used_bytes.saturating_add(estimate);
        if projected > self.maximum_bytes {
            warn!(
                "refusing staged load: {} used + {} estimated exceeds the {} byte maximum",
                self.used_bytes, estimate, self.maximum_bytes
            );
            return false;
        }
        true
    }

    /// Record bytes actually consumed by a granted load.
    pub fn commit(&mut self, bytes: u64) {
        self.used_bytes = self.used_bytes.saturating_add(bytes);
        self.check_warning();
    }

    /// Overwrite used bytes with an externally measured value.
    pub fn set_used(&mut self, bytes: u64) {
        self.used_bytes = bytes;
        self.check_warning();
    }

    fn check_warning(&self) {
        if self.used_bytes > self.warning_bytes {
            warn!(
                "staged spectra at {} bytes, past the {} byte warning threshold",
                self.used_bytes, self.warning_bytes
            );
        }
    }
}

/// Resident set size of the current process, where the platform exposes
/// one. Linux reads VmRSS from /proc/self/status; other platforms report
/// nothing.
pub fn process_rss_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
                return Some(kb * 1024);
            }
        }
        None
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Plans and accounts for staged spectra loads.
pub struct StagingPlanner {
    budget: MemoryBudget,
    probe_process: bool,
}

impl StagingPlanner {
    /// Build a planner from configuration, seeding the budget from the
    /// process resident set size when probing is enabled.
    pub fn new(config: &Config) -> Self {
        let mut planner = Self {
            budget: MemoryBudget::new(config.budget_warning_bytes, config.budget_maximum_bytes),
            probe_process: config.probe_process_memory,
        };
        planner.refresh();
        planner
    }

    /// Estimated bytes for loading `rows` spectral records from `survey`.
    ///
    /// Scales the stored size of the survey's first record; per-row length
    /// variation makes this an approximation, corrected at commit time.
    /// Zero rows estimate to zero without touching the table.
    pub fn estimate_for(&self, store: &SurveyStore, survey: &str, rows: usize) -> Result<u64> {
        if rows == 0 {
            return Ok(0);
        }
        let unit = store.representative_record_len(survey)?;
        Ok(unit.saturating_mul(rows as u64))
    }

    /// Whether an estimate fits the budget. Never mutates state.
    pub fn authorize(&self, estimate: u64) -> bool {
        self.budget.authorize(estimate)
    }

    /// Record bytes actually consumed by a granted load.
    pub fn commit(&mut self, bytes: u64) {
        self.budget.commit(bytes);
    }

    /// Re-derive used bytes from the process resident set size. A no-op
    /// when probing is disabled or unsupported.
    pub fn refresh(&mut self) {
        if !self.probe_process {
            return;
        }
        if let Some(rss) = process_rss_bytes() {
            debug!("process RSS at {} bytes", rss);
            self.budget.set_used(rss);
        }
    }

    pub fn budget(&self) -> &MemoryBudget {
        &self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_commit_sequence() {
        let mut budget = MemoryBudget::new(800, 1000);

        assert!(budget.authorize(600));
        budget.commit(600);
        assert_eq!(budget.used_bytes(), 600);

        // Over the maximum: refused, and refusal never mutates.
        assert!(!budget.authorize(500));
        assert_eq!(budget.used_bytes(), 600);

        // A smaller request still fits afterwards.
        assert!(budget.authorize(300));
    }

    #[test]
    fn warning_threshold_does_not_block() {
        let mut budget = MemoryBudget::new(100, 1000);
        budget.commit(500);
        // Past the warning, still under the maximum.
        assert!(budget.authorize(400));
        assert!(!budget.authorize(600));
    }

    #[test]
    fn set_used_overwrites() {
        let mut budget = MemoryBudget::new(800, 1000);
        budget.commit(600);
        budget.set_used(100);
        assert_eq!(budget.used_bytes(), 100);
        assert!(budget.authorize(850));
    }

    #[test]
    fn saturating_accounting() {
        let mut budget = MemoryBudget::new(u64::MAX, u64::MAX);
        budget.commit(u64::MAX);
        budget.commit(1);
        assert_eq!(budget.used_bytes(), u64::MAX);
        assert!(budget.authorize(0));
    }
}
