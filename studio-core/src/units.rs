//! Physical length units and DPI conversion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{StudioError, StudioResult};

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// A length unit understood by the print pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Device pixels at the document DPI.
    #[default]
    #[serde(alias = "px")]
    Pixel,
    /// Inches.
    #[serde(alias = "in")]
    Inch,
    /// Millimetres.
    #[serde(alias = "mm")]
    Millimeter,
}

impl Unit {
    /// Short suffix used in labels (`px`, `in`, `mm`).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Pixel => "px",
            Self::Inch => "in",
            Self::Millimeter => "mm",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Unit {
    type Err = StudioError;

    fn from_str(s: &str) -> StudioResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "px" | "pixel" | "pixels" => Ok(Self::Pixel),
            "in" | "inch" | "inches" => Ok(Self::Inch),
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => {
                Ok(Self::Millimeter)
            }
            other => Err(StudioError::UnknownUnit(other.to_string())),
        }
    }
}

/// Convert `value` from one unit to another at the given DPI.
///
/// Conversion goes through inches, so every unit pair is valid. A
/// non-positive DPI is a programming error.
#[must_use]
pub fn convert(value: f64, from: Unit, to: Unit, dpi: f64) -> f64 {
    debug_assert!(dpi > 0.0 && dpi.is_finite(), "dpi must be positive, got {dpi}");
    if from == to {
        return value;
    }

    let inches = match from {
        Unit::Pixel => value / dpi,
        Unit::Inch => value,
        Unit::Millimeter => value / MM_PER_INCH,
    };

    match to {
        Unit::Pixel => inches * dpi,
        Unit::Inch => inches,
        Unit::Millimeter => inches * MM_PER_INCH,
    }
}

/// Convert a length to pixels.
#[must_use]
pub fn to_pixels(value: f64, unit: Unit, dpi: f64) -> f64 {
    convert(value, unit, Unit::Pixel, dpi)
}
