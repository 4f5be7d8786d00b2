//! Print settings and the built-in preset table.

use serde::{Deserialize, Serialize};

use crate::units::{convert, Unit};

/// Print configuration stored with a project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintSettings {
    /// Bleed on each side, in `unit`.
    pub bleed: f64,
    /// Safe margin inside the trim, in `unit`.
    pub margin: f64,
    /// Unit for `bleed` and `margin`.
    pub unit: Unit,
    /// Target output resolution.
    pub dpi: f64,
    /// Apply the soft-proof filter when printing.
    pub soft_proof: bool,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            bleed: 0.125,
            margin: 0.25,
            unit: Unit::Inch,
            dpi: 300.0,
            soft_proof: false,
        }
    }
}

/// A pixel-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl PrintSettings {
    /// Settings pre-filled from a preset.
    #[must_use]
    pub fn from_preset(preset: &PrintPreset) -> Self {
        Self {
            bleed: preset.bleed,
            margin: preset.margin,
            unit: preset.unit,
            dpi: preset.dpi,
            soft_proof: false,
        }
    }

    /// Bleed in pixels at `canvas_dpi`.
    #[must_use]
    pub fn bleed_px(&self, canvas_dpi: f64) -> f64 {
        convert(self.bleed, self.unit, Unit::Pixel, canvas_dpi).max(0.0)
    }

    /// Margin in pixels at `canvas_dpi`.
    #[must_use]
    pub fn margin_px(&self, canvas_dpi: f64) -> f64 {
        convert(self.margin, self.unit, Unit::Pixel, canvas_dpi).max(0.0)
    }

    /// The area inside the safe margin of a `width` x `height` canvas.
    #[must_use]
    pub fn safe_area(&self, width: u32, height: u32, canvas_dpi: f64) -> PixelRect {
        let m = self.margin_px(canvas_dpi);
        let (w, h) = (f64::from(width), f64::from(height));
        let mx = m.min(w / 2.0);
        let my = m.min(h / 2.0);
        PixelRect {
            x: mx,
            y: my,
            width: w - 2.0 * mx,
            height: h - 2.0 * my,
        }
    }
}

/// A named paper or cake-board size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrintPreset {
    /// Stable identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Trim width in `unit`.
    pub width: f64,
    /// Trim height in `unit`.
    pub height: f64,
    /// Unit of all lengths.
    pub unit: Unit,
    /// Output resolution.
    pub dpi: f64,
    /// Bleed on each side.
    pub bleed: f64,
    /// Safe margin.
    pub margin: f64,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'static str>,
}

impl PrintPreset {
    /// Trim size in pixels at the preset DPI.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_size(&self) -> (u32, u32) {
        let w = convert(self.width, self.unit, Unit::Pixel, self.dpi).round();
        let h = convert(self.height, self.unit, Unit::Pixel, self.dpi).round();
        (w.max(1.0) as u32, h.max(1.0) as u32)
    }

    /// Safe area in pixels at the preset DPI.
    #[must_use]
    pub fn safe_area(&self) -> PixelRect {
        let (w, h) = self.pixel_size();
        PrintSettings::from_preset(self).safe_area(w, h, self.dpi)
    }
}

/// Built-in presets.
pub const PRINT_PRESETS: &[PrintPreset] = &[
    PrintPreset {
        id: "letter",
        name: "US Letter",
        width: 8.5,
        height: 11.0,
        unit: Unit::Inch,
        dpi: 300.0,
        bleed: 0.125,
        margin: 0.25,
        notes: None,
    },
    PrintPreset {
        id: "a4",
        name: "A4",
        width: 210.0,
        height: 297.0,
        unit: Unit::Millimeter,
        dpi: 300.0,
        bleed: 3.0,
        margin: 6.0,
        notes: None,
    },
    PrintPreset {
        id: "frosting-sheet-8x10",
        name: "Frosting Sheet 8x10",
        width: 8.0,
        height: 10.0,
        unit: Unit::Inch,
        dpi: 300.0,
        bleed: 0.125,
        margin: 0.25,
        notes: Some("Edible ink printers; trim with a craft knife"),
    },
    PrintPreset {
        id: "quarter-sheet",
        name: "Quarter Sheet Cake",
        width: 11.0,
        height: 7.5,
        unit: Unit::Inch,
        dpi: 300.0,
        bleed: 0.125,
        margin: 0.5,
        notes: Some("Leave room for border piping"),
    },
    PrintPreset {
        id: "half-sheet",
        name: "Half Sheet Cake",
        width: 15.0,
        height: 10.5,
        unit: Unit::Inch,
        dpi: 300.0,
        bleed: 0.125,
        margin: 0.5,
        notes: Some("Printed in two frosting sheets on most printers"),
    },
    PrintPreset {
        id: "round-8",
        name: "8\" Round",
        width: 7.5,
        height: 7.5,
        unit: Unit::Inch,
        dpi: 300.0,
        bleed: 0.125,
        margin: 0.375,
        notes: Some("Circle inscribed in the square trim"),
    },
    PrintPreset {
        id: "round-10",
        name: "10\" Round",
        width: 9.5,
        height: 9.5,
        unit: Unit::Inch,
        dpi: 300.0,
        bleed: 0.125,
        margin: 0.375,
        notes: Some("Circle inscribed in the square trim"),
    },
    PrintPreset {
        id: "cupcake-2in",
        name: "Cupcake Toppers (2\")",
        width: 2.0,
        height: 2.0,
        unit: Unit::Inch,
        dpi: 300.0,
        bleed: 0.0625,
        margin: 0.125,
        notes: Some("Tile on a frosting sheet with the circle grid"),
    },
];

/// Look up a preset by id.
#[must_use]
pub fn find_preset(id: &str) -> Option<&'static PrintPreset> {
    PRINT_PRESETS.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_ids_unique() {
        let mut ids: Vec<_> = PRINT_PRESETS.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), PRINT_PRESETS.len());
    }

    #[test]
    fn test_letter_pixel_size_and_bleed() {
        let letter = find_preset("LETTER").expect("letter");
        assert_eq!(letter.pixel_size(), (2550, 3300));
        let settings = PrintSettings::from_preset(letter);
        assert!((settings.bleed_px(300.0) - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_a4_millimetres() {
        let a4 = find_preset("a4").expect("a4");
        assert_eq!(a4.pixel_size(), (2480, 3508));
    }

    #[test]
    fn test_safe_area() {
        let area = find_preset("letter").expect("letter").safe_area();
        assert_eq!(area.x, 75.0);
        assert_eq!(area.width, 2400.0);
    }

    #[test]
    fn test_settings_json_uses_camel_case() {
        let json = serde_json::to_string(&PrintSettings::default()).expect("ser");
        assert!(json.contains("\"softProof\":false"));
        let back: PrintSettings = serde_json::from_str(&json).expect("de");
        assert_eq!(back, PrintSettings::default());
    }
}
