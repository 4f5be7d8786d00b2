//! Straight-alpha RGBA colours.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{StudioError, StudioResult};

/// An 8-bit straight (non-premultiplied) RGBA colour.
///
/// Serialized as a `#rrggbbaa` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Create a colour from straight RGBA channels.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque colour.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Convert to a tiny-skia colour.
    #[must_use]
    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    /// Convert to a premultiplied tiny-skia pixel.
    #[must_use]
    pub fn to_premultiplied(self) -> tiny_skia::PremultipliedColorU8 {
        tiny_skia::ColorU8::from_rgba(self.r, self.g, self.b, self.a).premultiply()
    }

    /// Recover a straight colour from a premultiplied pixel.
    #[must_use]
    pub fn from_premultiplied(pixel: tiny_skia::PremultipliedColorU8) -> Self {
        let c = pixel.demultiply();
        Self::rgba(c.red(), c.green(), c.blue(), c.alpha())
    }

    /// Same colour with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }

    /// Hex form `#rrggbbaa`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = StudioError;

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    fn from_str(s: &str) -> StudioResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || StudioError::InvalidColor(s.to_string());
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2).ok_or_else(invalid)?, 16)
            .map_err(|_| invalid());

        match hex.len() {
            3 => {
                let mut out = [0_u8; 3];
                for (slot, ch) in out.iter_mut().zip(hex.chars()) {
                    let nibble = ch.to_digit(16).ok_or_else(invalid)?;
                    // nibble < 16, so the widened value fits in u8
                    *slot = u8::try_from(nibble * 17).map_err(|_| invalid())?;
                }
                Ok(Self::rgb(out[0], out[1], out[2]))
            }
            6 => Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = StudioError;

    fn try_from(value: String) -> StudioResult<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}
