//! Layers - the addressable units of a project's render stack.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pixels::{AlphaBuffer, PixelBuffer};
use crate::selection::Point;
use crate::Color;

/// Unique identifier for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Create a new unique layer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a layer combines with the layers beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Source-over.
    #[default]
    Normal,
    /// Multiply.
    Multiply,
    /// Screen.
    Screen,
    /// Overlay.
    Overlay,
    /// Darken.
    Darken,
    /// Lighten.
    Lighten,
    /// Difference.
    Difference,
    /// Exclusion.
    Exclusion,
    /// Soft light (W3C formula).
    SoftLight,
    /// Hard light.
    HardLight,
}

impl BlendMode {
    /// All modes in menu order.
    pub const ALL: [Self; 10] = [
        Self::Normal,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::Difference,
        Self::Exclusion,
        Self::SoftLight,
        Self::HardLight,
    ];

    /// The equivalent tiny-skia blend mode.
    #[must_use]
    pub const fn to_skia(self) -> tiny_skia::BlendMode {
        match self {
            Self::Normal => tiny_skia::BlendMode::SourceOver,
            Self::Multiply => tiny_skia::BlendMode::Multiply,
            Self::Screen => tiny_skia::BlendMode::Screen,
            Self::Overlay => tiny_skia::BlendMode::Overlay,
            Self::Darken => tiny_skia::BlendMode::Darken,
            Self::Lighten => tiny_skia::BlendMode::Lighten,
            Self::Difference => tiny_skia::BlendMode::Difference,
            Self::Exclusion => tiny_skia::BlendMode::Exclusion,
            Self::SoftLight => tiny_skia::BlendMode::SoftLight,
            Self::HardLight => tiny_skia::BlendMode::HardLight,
        }
    }
}

/// Placement of a layer on the canvas.
///
/// Applied as translate, then rotate (degrees, about the layer origin),
/// then uniform scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// X offset of the layer origin in canvas pixels.
    pub x: f32,
    /// Y offset of the layer origin in canvas pixels.
    pub y: f32,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Uniform scale factor.
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

impl Transform {
    /// A pure translation.
    #[must_use]
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    /// Layer-local to canvas matrix.
    #[must_use]
    pub fn to_skia(self) -> tiny_skia::Transform {
        tiny_skia::Transform::from_translate(self.x, self.y)
            .pre_rotate(self.rotation)
            .pre_scale(self.scale, self.scale)
    }

    /// Whether the transform is an integer translation.
    #[must_use]
    pub fn is_pixel_aligned(self) -> bool {
        self.rotation == 0.0
            && (self.scale - 1.0).abs() < f32::EPSILON
            && self.x.fract() == 0.0
            && self.y.fract() == 0.0
    }
}

/// A layer's persistent visibility mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMask {
    /// Whether the mask is applied when compositing.
    pub enabled: bool,
    /// Canvas-sized alpha values.
    pub alpha: AlphaBuffer,
}

impl LayerMask {
    /// A mask that reveals the whole canvas.
    #[must_use]
    pub fn revealing(width: u32, height: u32) -> Self {
        Self {
            enabled: true,
            alpha: AlphaBuffer::new(width, height, 255),
        }
    }
}

/// Pixel content of a raster layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "data", rename_all = "lowercase")]
pub enum RasterSource {
    /// Decoded pixels.
    Pixels(PixelBuffer),
    /// An encoded PNG reference, decoded on first use.
    Encoded(#[serde(with = "encoded_bytes")] Vec<u8>),
}

mod encoded_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Raster layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterLayer {
    /// Pixel content at the layer-local origin.
    pub source: RasterSource,
}

impl RasterLayer {
    /// Wrap decoded pixels.
    #[must_use]
    pub fn from_pixels(pixels: PixelBuffer) -> Self {
        Self {
            source: RasterSource::Pixels(pixels),
        }
    }

    /// Wrap encoded PNG bytes for lazy decoding.
    #[must_use]
    pub fn from_png(bytes: Vec<u8>) -> Self {
        Self {
            source: RasterSource::Encoded(bytes),
        }
    }

    /// Decoded pixels, decoding an encoded reference on the fly.
    ///
    /// Returns `None` when the reference cannot be decoded.
    #[must_use]
    pub fn resolve(&self) -> Option<std::borrow::Cow<'_, PixelBuffer>> {
        match &self.source {
            RasterSource::Pixels(p) => Some(std::borrow::Cow::Borrowed(p)),
            RasterSource::Encoded(bytes) => match PixelBuffer::decode_png(bytes) {
                Ok(p) => Some(std::borrow::Cow::Owned(p)),
                Err(e) => {
                    tracing::warn!("Raster layer decode failed: {e}");
                    None
                }
            },
        }
    }

    /// Decode in place (if needed) and return the pixels for editing.
    pub fn pixels_mut(&mut self) -> Option<&mut PixelBuffer> {
        if let RasterSource::Encoded(bytes) = &self.source {
            match PixelBuffer::decode_png(bytes) {
                Ok(decoded) => self.source = RasterSource::Pixels(decoded),
                Err(e) => {
                    tracing::warn!("Raster layer decode failed: {e}");
                    return None;
                }
            }
        }
        match &mut self.source {
            RasterSource::Pixels(p) => Some(p),
            RasterSource::Encoded(_) => None,
        }
    }
}

/// Horizontal text alignment relative to the layer origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Text starts at the origin.
    #[default]
    Left,
    /// Text is centred on the origin.
    Center,
    /// Text ends at the origin.
    Right,
}

/// Text layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    /// Text content; `\n` separates lines.
    pub content: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// CSS-style weight (100-900).
    pub font_weight: u16,
    /// Fill colour.
    pub fill: Color,
    /// Alignment.
    pub align: TextAlign,
}

impl Default for TextLayer {
    fn default() -> Self {
        Self {
            content: "Happy Birthday".to_string(),
            font_family: "sans-serif".to_string(),
            font_size: 48.0,
            font_weight: 400,
            fill: Color::BLACK,
            align: TextAlign::Left,
        }
    }
}

/// Vector geometry of a shape layer, in layer-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeGeometry {
    /// Axis-aligned rectangle at the origin.
    Rectangle {
        /// Width.
        width: f32,
        /// Height.
        height: f32,
        /// Corner radius (0 = square corners).
        corner_radius: f32,
    },
    /// Ellipse inscribed in `width` x `height` at the origin.
    Ellipse {
        /// Width.
        width: f32,
        /// Height.
        height: f32,
    },
    /// Straight line from the origin.
    Line {
        /// End point X.
        dx: f32,
        /// End point Y.
        dy: f32,
    },
    /// Polyline or polygon path.
    Path {
        /// Anchor points.
        points: Vec<Point>,
        /// Whether the path is closed.
        closed: bool,
    },
}

impl ShapeGeometry {
    /// Build the tiny-skia path for this geometry.
    #[must_use]
    pub fn to_path(&self) -> Option<tiny_skia::Path> {
        use tiny_skia::{PathBuilder, Rect};

        match self {
            Self::Rectangle {
                width,
                height,
                corner_radius,
            } => {
                let rect = Rect::from_xywh(0.0, 0.0, *width, *height)?;
                let r = corner_radius.min(width / 2.0).min(height / 2.0).max(0.0);
                if r <= 0.0 {
                    return Some(PathBuilder::from_rect(rect));
                }
                // Quadratic corners are close enough to arcs at cake-board scale.
                let mut pb = PathBuilder::new();
                pb.move_to(r, 0.0);
                pb.line_to(width - r, 0.0);
                pb.quad_to(*width, 0.0, *width, r);
                pb.line_to(*width, height - r);
                pb.quad_to(*width, *height, width - r, *height);
                pb.line_to(r, *height);
                pb.quad_to(0.0, *height, 0.0, height - r);
                pb.line_to(0.0, r);
                pb.quad_to(0.0, 0.0, r, 0.0);
                pb.close();
                pb.finish()
            }
            Self::Ellipse { width, height } => {
                PathBuilder::from_oval(Rect::from_xywh(0.0, 0.0, *width, *height)?)
            }
            Self::Line { dx, dy } => {
                let mut pb = PathBuilder::new();
                pb.move_to(0.0, 0.0);
                pb.line_to(*dx, *dy);
                pb.finish()
            }
            Self::Path { points, closed } => {
                let (first, rest) = points.split_first()?;
                let mut pb = PathBuilder::new();
                pb.move_to(first.x, first.y);
                for p in rest {
                    pb.line_to(p.x, p.y);
                }
                if *closed {
                    pb.close();
                }
                pb.finish()
            }
        }
    }
}

/// Stroke style for shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Stroke colour.
    pub color: Color,
    /// Stroke width in pixels.
    pub width: f32,
}

/// Shape layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeLayer {
    /// Geometry.
    pub geometry: ShapeGeometry,
    /// Fill colour, if filled.
    pub fill: Option<Color>,
    /// Stroke, if stroked.
    pub stroke: Option<StrokeStyle>,
}

/// The variant-specific content of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum LayerKind {
    /// Pixel layer.
    Raster(RasterLayer),
    /// Text layer.
    Text(TextLayer),
    /// Vector shape layer.
    Shape(ShapeLayer),
}

impl LayerKind {
    /// Short variant name for logs.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Raster(_) => "raster",
            Self::Text(_) => "text",
            Self::Shape(_) => "shape",
        }
    }
}

/// A layer with content and compositing attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique identifier.
    pub id: LayerId,
    /// Display name.
    pub name: String,
    /// Variant content.
    pub kind: LayerKind,
    /// Whether the layer is drawn.
    pub visible: bool,
    /// Whether tools may edit the layer.
    pub locked: bool,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Placement.
    pub transform: Transform,
    /// Optional persistent mask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<LayerMask>,
}

impl Layer {
    /// Create a visible, unlocked, fully opaque layer.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            kind,
            visible: true,
            locked: false,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            transform: Transform::default(),
            mask: None,
        }
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the blend mode.
    #[must_use]
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Set the opacity (clamped).
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Whether the layer contributes to the composite.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.visible && self.opacity > 0.0
    }

    /// Raster payload, if this is a raster layer.
    #[must_use]
    pub fn as_raster(&self) -> Option<&RasterLayer> {
        match &self.kind {
            LayerKind::Raster(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable raster payload, if this is a raster layer.
    pub fn as_raster_mut(&mut self) -> Option<&mut RasterLayer> {
        match &mut self.kind {
            LayerKind::Raster(r) => Some(r),
            _ => None,
        }
    }

    /// Layer-local integer offset used to map canvas pixels onto the buffer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pixel_offset(&self) -> (i32, i32) {
        (
            self.transform.x.round() as i32,
            self.transform.y.round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_order() {
        let t = Transform {
            x: 10.0,
            y: 20.0,
            rotation: 90.0,
            scale: 2.0,
        };
        let mut pts = [tiny_skia::Point::from_xy(1.0, 0.0)];
        t.to_skia().map_points(&mut pts);
        // scale -> (2, 0), rotate 90 -> (0, 2), translate -> (10, 22)
        assert!((pts[0].x - 10.0).abs() < 1e-4);
        assert!((pts[0].y - 22.0).abs() < 1e-4);
    }

    #[test]
    fn test_blend_mode_serde() {
        let json = serde_json::to_string(&BlendMode::SoftLight).expect("ser");
        assert_eq!(json, "\"soft-light\"");
    }

    #[test]
    fn test_layer_json_round_trip() {
        let layer = Layer::new(
            "Piping",
            LayerKind::Shape(ShapeLayer {
                geometry: ShapeGeometry::Ellipse {
                    width: 40.0,
                    height: 20.0,
                },
                fill: Some(Color::rgb(250, 200, 220)),
                stroke: None,
            }),
        )
        .with_opacity(1.5);
        assert_eq!(layer.opacity, 1.0);

        let json = serde_json::to_string(&layer).expect("ser");
        let back: Layer = serde_json::from_str(&json).expect("de");
        assert_eq!(back, layer);
    }

    #[test]
    fn test_lazy_raster_materializes() {
        let png = PixelBuffer::filled(2, 2, Color::WHITE)
            .expect("buffer")
            .encode_png()
            .expect("png");
        let mut raster = RasterLayer::from_png(png);
        assert!(raster.resolve().is_some());
        assert!(raster.pixels_mut().is_some());
        assert!(matches!(raster.source, RasterSource::Pixels(_)));

        let mut broken = RasterLayer::from_png(vec![1, 2, 3]);
        assert!(broken.resolve().is_none());
        assert!(broken.pixels_mut().is_none());
    }

    #[test]
    fn test_shape_paths() {
        let rounded = ShapeGeometry::Rectangle {
            width: 100.0,
            height: 50.0,
            corner_radius: 10.0,
        };
        let bounds = rounded.to_path().expect("path").bounds();
        assert!((bounds.width() - 100.0).abs() < 1e-3);
        assert!(ShapeGeometry::Path {
            points: vec![],
            closed: true
        }
        .to_path()
        .is_none());
    }
}
