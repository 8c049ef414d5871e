//! Typed query quantities
//!
//! Angular sizes, velocities, and sky positions carry their unit in the
//! type, so a caller cannot hand a radius in the wrong unit or swap a
//! velocity for an angle. Range checks that cannot be expressed in the
//! type system happen at construction.

use crate::error::{Result, VaultError};

/// An angular size. Stored in radians; constructed in whatever unit the
/// caller has at hand.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Angle {
    radians: f64,
}

impl Angle {
    pub fn from_radians(radians: f64) -> Self {
        Self { radians }
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self {
            radians: degrees.to_radians(),
        }
    }

    pub fn from_arcsec(arcsec: f64) -> Self {
        Self {
            radians: (arcsec / 3600.0).to_radians(),
        }
    }

    pub fn radians(&self) -> f64 {
        self.radians
    }

    pub fn degrees(&self) -> f64 {
        self.radians.to_degrees()
    }

    pub fn arcsec(&self) -> f64 {
        self.radians.to_degrees() * 3600.0
    }
}

/// A line-of-sight velocity in km/s.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Velocity {
    kms: f64,
}

impl Velocity {
    pub fn from_kms(kms: f64) -> Self {
        Self { kms }
    }

    pub fn kms(&self) -> f64 {
        self.kms
    }
}

/// A sky position in degrees (RA in [0, 360], Dec in [-90, 90]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPos {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyPos {
    /// Build a sky position, rejecting out-of-range coordinates.
    pub fn new(ra_deg: f64, dec_deg: f64) -> Result<Self> {
        if !ra_deg.is_finite() || !(0.0..=360.0).contains(&ra_deg) {
            return Err(VaultError::InvalidQueryParameter(format!(
                "right ascension must be in [0, 360] degrees, got {}",
                ra_deg
            )));
        }
        if !dec_deg.is_finite() || !(-90.0..=90.0).contains(&dec_deg) {
            return Err(VaultError::InvalidQueryParameter(format!(
                "declination must be in [-90, 90] degrees, got {}",
                dec_deg
            )));
        }
        Ok(Self { ra_deg, dec_deg })
    }
}
