//! In-memory spectrum assembly
//!
//! Converts stored spectral records into the column layout handed to
//! callers, applying the configured pixel mask policy along the way.

use crate::container::SpectralRecord;

/// Pixel masking applied when a spectrum is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskPolicy {
    /// Keep every pixel.
    None,
    /// Mask leading and trailing pixels with non-positive error, the
    /// unexposed detector edges.
    #[default]
    Edges,
}

/// A single assembled spectrum.
///
/// Columns share one length; `good` marks pixels that survived the mask
/// policy. Callers that want the raw columns ignore `good`.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub wave: Vec<f64>,
    pub flux: Vec<f32>,
    pub sig: Vec<f32>,
    pub co: Option<Vec<f32>>,
    pub good: Vec<bool>,
}

impl Spectrum {
    pub fn from_columns(
        wave: Vec<f64>,
        flux: Vec<f32>,
        sig: Vec<f32>,
        co: Option<Vec<f32>>,
        policy: MaskPolicy,
    ) -> Self {
        let good = match policy {
            MaskPolicy::None => vec![true; wave.len()],
            MaskPolicy::Edges => edge_mask(&sig),
        };
        Self {
            wave,
            flux,
            sig,
            co,
            good,
        }
    }

    pub fn from_record(record: SpectralRecord, policy: MaskPolicy) -> Self {
        Self::from_columns(record.wave, record.flux, record.sig, record.co, policy)
    }

    pub fn npix(&self) -> usize {
        self.wave.len()
    }
}

/// Good-pixel mask that drops leading and trailing pixels whose error is
/// non-positive. Interior zeros are kept; only the contiguous edges go.
fn edge_mask(sig: &[f32]) -> Vec<bool> {
    let mut good = vec![true; sig.len()];
    for (i, &s) in sig.iter().enumerate() {
        if s > 0.0 {
            break;
        }
        good[i] = false;
    }
    for (i, &s) in sig.iter().enumerate().rev() {
        if s > 0.0 {
            break;
        }
        good[i] = false;
    }
    good
}
