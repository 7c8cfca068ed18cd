//! Centroid value type.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A measured 2-D position with per-axis uncertainty.
///
/// Error fields default to NaN; algorithms that do not estimate positional
/// uncertainty leave them unset.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Centroid {
    /// X position in the parent-frame coordinate convention.
    pub x: f64,
    /// Y position in the parent-frame coordinate convention.
    pub y: f64,
    /// Uncertainty on `x` (NaN if not estimated).
    pub x_err: f64,
    /// Uncertainty on `y` (NaN if not estimated).
    pub y_err: f64,
}

impl Centroid {
    /// Creates a centroid with unset errors.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            x_err: f64::NAN,
            y_err: f64::NAN,
        }
    }

    /// Creates a centroid with per-axis errors.
    #[must_use]
    pub fn with_errors(x: f64, y: f64, x_err: f64, y_err: f64) -> Self {
        Self { x, y, x_err, y_err }
    }
}

impl Default for Centroid {
    fn default() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }
}
