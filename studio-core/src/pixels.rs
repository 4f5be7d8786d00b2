//! Shared pixel storage for raster layers and layer masks.
//!
//! Both buffers are reference-counted and copy-on-write so history
//! snapshots can hold on to them without duplicating pixel data. A write
//! through [`PixelBuffer::pixmap_mut`] or [`AlphaBuffer::data_mut`] clones
//! the buffer only when a snapshot still shares it.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tiny_skia::{IntSize, Mask, Pixmap};

use crate::{Color, StudioError, StudioResult};

/// Premultiplied RGBA pixels owned by a raster layer.
#[derive(Debug, Clone)]
pub struct PixelBuffer(Arc<Pixmap>);

impl PixelBuffer {
    /// Create a transparent buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero.
    pub fn new(width: u32, height: u32) -> StudioResult<Self> {
        Pixmap::new(width, height)
            .map(|p| Self(Arc::new(p)))
            .ok_or_else(|| {
                StudioError::InvalidOperation(format!("invalid pixel buffer size {width}x{height}"))
            })
    }

    /// Create a buffer filled with a single colour.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero.
    pub fn filled(width: u32, height: u32, color: Color) -> StudioResult<Self> {
        let mut buffer = Self::new(width, height)?;
        buffer.pixmap_mut().fill(color.to_skia());
        Ok(buffer)
    }

    /// Build a buffer from straight RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` does not hold `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, data: &[u8]) -> StudioResult<Self> {
        let mut buffer = Self::new(width, height)?;
        let pixels = buffer.pixmap_mut().pixels_mut();
        if data.len() != pixels.len() * 4 {
            return Err(StudioError::ImageData(format!(
                "expected {} bytes for {width}x{height}, got {}",
                pixels.len() * 4,
                data.len()
            )));
        }
        for (dst, src) in pixels.iter_mut().zip(data.chunks_exact(4)) {
            *dst = Color::rgba(src[0], src[1], src[2], src[3]).to_premultiplied();
        }
        Ok(buffer)
    }

    /// Wrap an existing pixmap.
    #[must_use]
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self(Arc::new(pixmap))
    }

    /// Decode a PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a decodable PNG.
    pub fn decode_png(bytes: &[u8]) -> StudioResult<Self> {
        Pixmap::decode_png(bytes)
            .map(Self::from_pixmap)
            .map_err(|e| StudioError::ImageData(format!("PNG decode failed: {e}")))
    }

    /// Encode as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_png(&self) -> StudioResult<Vec<u8>> {
        self.0
            .encode_png()
            .map_err(|e| StudioError::ImageData(format!("PNG encode failed: {e}")))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Read access to the pixmap.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.0
    }

    /// Write access; clones the pixels if a snapshot shares them.
    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        Arc::make_mut(&mut self.0)
    }

    /// Straight colour at a pixel, `None` outside the buffer.
    #[must_use]
    pub fn color_at(&self, x: u32, y: u32) -> Option<Color> {
        self.0.pixel(x, y).map(Color::from_premultiplied)
    }

    /// Copy the raw premultiplied bytes out of the buffer.
    ///
    /// Used to hand pixels to the region-grow worker by value.
    #[must_use]
    pub fn copy_bytes(&self) -> Vec<u8> {
        self.0.data().to_vec()
    }

    /// Whether two buffers share the same allocation.
    #[must_use]
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage(other)
            || (self.width() == other.width()
                && self.height() == other.height()
                && self.0.data() == other.0.data())
    }
}

impl Serialize for PixelBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let png = self.encode_png().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&STANDARD.encode(png))
    }
}

impl<'de> Deserialize<'de> for PixelBuffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let png = STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)?;
        Self::decode_png(&png).map_err(serde::de::Error::custom)
    }
}

/// A single-channel 8-bit buffer (0 = hidden, 255 = revealed).
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaBuffer {
    width: u32,
    height: u32,
    data: Arc<Vec<u8>>,
}

impl AlphaBuffer {
    /// Create a buffer with every value set to `fill`.
    #[must_use]
    pub fn new(width: u32, height: u32, fill: u8) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            data: Arc::new(vec![fill; len]),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw values, row-major.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable values; clones if a snapshot shares them.
    pub fn data_mut(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Value at a pixel, `None` outside.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Convert to a tiny-skia clip mask of the same size.
    #[must_use]
    pub fn to_mask(&self) -> Option<Mask> {
        let size = IntSize::from_wh(self.width, self.height)?;
        Mask::from_vec(self.data.as_ref().clone(), size)
    }
}

#[derive(Serialize, Deserialize)]
struct AlphaBufferRepr {
    width: u32,
    height: u32,
    data: String,
}

impl Serialize for AlphaBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AlphaBufferRepr {
            width: self.width,
            height: self.height,
            data: STANDARD.encode(self.data.as_slice()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AlphaBuffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = AlphaBufferRepr::deserialize(deserializer)?;
        let data = STANDARD
            .decode(repr.data.as_bytes())
            .map_err(serde::de::Error::custom)?;
        if data.len() != repr.width as usize * repr.height as usize {
            return Err(serde::de::Error::custom("alpha buffer size mismatch"));
        }
        Ok(Self {
            width: repr.width,
            height: repr.height,
            data: Arc::new(data),
        })
    }
}
