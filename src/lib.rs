//! # SpecVault
//!
//! A read-optimized access layer for multi-survey spectral archives with:
//! - A single columnar container file per archive
//! - Bitmask survey membership and kd-tree spatial search
//! - Order-preserving identifier resolution with all-or-nothing coverage
//! - An explicit memory budget gating every spectra load
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SpecVault                            │
//! │                    (archive facade)                         │
//! └───────────┬──────────────────┬──────────────────┬───────────┘
//!             │                  │                  │
//!             ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌───────────────┐   ┌────────────────┐
//!     │ CatalogIndex │   │  SurveyStore  │   │ StagingPlanner │
//!     └──────┬───────┘   └───────┬───────┘   └────────────────┘
//!            │                   │
//!            └─────────┬─────────┘
//!                      ▼
//!              ┌───────────────┐
//!              │ ArchiveReader │
//!              │  (container)  │
//!              └───────────────┘
//! ```
//!
//! The catalog index is built in memory at open time and carries survey
//! membership as a bitmask per source plus a kd-tree over unit vectors for
//! spatial queries. Metadata and spectra stay on disk; the survey store
//! resolves identifiers to table rows and reads only the rows a query
//! masked in. Every spectra load passes the staging planner's budget
//! before any bytes leave disk.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod units;
pub mod container;
pub mod catalog;
pub mod store;
pub mod staging;
pub mod spectrum;
pub mod facade;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, VaultError};
pub use config::Config;
pub use facade::{SpecVault, SurveyFetch};
pub use spectrum::{MaskPolicy, Spectrum};
pub use store::MetaFilter;
pub use units::{Angle, SkyPos, Velocity};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SpecVault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
