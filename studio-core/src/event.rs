//! Pointer input delivered by the host UI.

use serde::{Deserialize, Serialize};

use crate::selection::Point;

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    /// Shift (add to selection, constrain).
    pub shift: bool,
    /// Alt / Option (subtract, sample source, hide).
    pub alt: bool,
    /// Ctrl / Command.
    pub ctrl: bool,
}

/// A pointer down, move or up event in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerEvent {
    /// X position in canvas pixels.
    pub x: f32,
    /// Y position in canvas pixels.
    pub y: f32,
    /// Stylus pressure (0.0 to 1.0, if available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
    /// Held modifier keys.
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// An event with no pressure and no modifiers.
    #[must_use]
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    /// Same event with shift held.
    #[must_use]
    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    /// Same event with alt held.
    #[must_use]
    pub fn with_alt(mut self) -> Self {
        self.modifiers.alt = true;
        self
    }

    /// Same event with a pressure reading.
    #[must_use]
    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure.clamp(0.0, 1.0));
        self
    }

    /// Position as a point.
    #[must_use]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
