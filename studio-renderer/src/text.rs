//! Font registry and text rasterization.
//!
//! Fonts are registered by the host (there is no system font discovery).
//! A text layer resolves its font by family and weight: the nearest weight
//! within the family wins, and when the family is not registered at all
//! the nearest weight across every registered family is used instead.

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use studio_core::{TextAlign, TextLayer};
use tiny_skia::Pixmap;
use tracing::debug;

use crate::error::{RenderError, RenderResult};

struct FontFace {
    family: String,
    weight: u16,
    font: FontArc,
}

/// Registered fonts.
#[derive(Default)]
pub struct FontBook {
    faces: Vec<FontFace>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.faces.iter().map(|face| (&face.family, face.weight)))
            .finish()
    }
}

impl FontBook {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a font from TrueType/OpenType bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Resource`] if the bytes are not a font.
    pub fn register(&mut self, family: &str, weight: u16, bytes: Vec<u8>) -> RenderResult<()> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| RenderError::Resource(format!("Invalid font for {family}: {e}")))?;
        self.register_font(family, weight, font);
        Ok(())
    }

    /// Register an already-parsed font. Replaces an existing face with the
    /// same family and weight.
    pub fn register_font(&mut self, family: &str, weight: u16, font: FontArc) {
        let family = family.trim().to_lowercase();
        self.faces
            .retain(|face| !(face.family == family && face.weight == weight));
        debug!(%family, weight, "Font registered");
        self.faces.push(FontFace {
            family,
            weight,
            font,
        });
    }

    /// Number of registered faces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Whether no fonts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// The best face for a family and weight, `None` if nothing is
    /// registered.
    #[must_use]
    pub fn resolve(&self, family: &str, weight: u16) -> Option<&FontArc> {
        let wanted = family.trim().to_lowercase();
        nearest_weight(self.faces.iter().filter(|face| face.family == wanted), weight)
            .or_else(|| nearest_weight(self.faces.iter(), weight))
    }
}

fn nearest_weight<'a>(faces: impl Iterator<Item = &'a FontFace>, weight: u16) -> Option<&'a FontArc> {
    faces
        .min_by_key(|face| face.weight.abs_diff(weight))
        .map(|face| &face.font)
}

/// A rasterized text block in layer-local space.
#[derive(Debug)]
pub struct TextRaster {
    /// Glyph coverage tinted with the fill colour.
    pub pixmap: Pixmap,
    /// Layer-local X of the pixmap's left edge.
    pub left: f32,
    /// Layer-local Y of the pixmap's top edge.
    pub top: f32,
}

/// Rasterize a text layer. The layer origin is the top of the first line;
/// alignment is relative to the origin's X. `None` for text with no
/// visible glyphs.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
pub fn rasterize_text(font: &FontArc, text: &TextLayer) -> Option<TextRaster> {
    let scale = PxScale::from(text.font_size.max(1.0));
    let scaled = font.as_scaled(scale);
    let line_height = scaled.height() + scaled.line_gap();

    let mut outlined = Vec::new();
    for (index, line) in text.content.split('\n').enumerate() {
        let mut caret = 0.0_f32;
        let mut previous: Option<GlyphId> = None;
        let mut placed = Vec::new();
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            placed.push((id, caret));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
        let shift = match text.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => -caret / 2.0,
            TextAlign::Right => -caret,
        };
        let baseline = scaled.ascent() + index as f32 * line_height;
        outlined.extend(placed.into_iter().filter_map(|(id, x)| {
            font.outline_glyph(id.with_scale_and_position(scale, point(x + shift, baseline)))
        }));
    }

    if outlined.is_empty() {
        return None;
    }
    let (min_x, min_y, max_x, max_y) = outlined.iter().map(ab_glyph::OutlinedGlyph::px_bounds).fold(
        (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        |(x0, y0, x1, y1), b| (x0.min(b.min.x), y0.min(b.min.y), x1.max(b.max.x), y1.max(b.max.y)),
    );
    let (left, top) = (min_x.floor(), min_y.floor());
    let width = (max_x.ceil() - left).max(1.0) as u32;
    let height = (max_y.ceil() - top).max(1.0) as u32;

    let mut coverage = vec![0.0_f32; width as usize * height as usize];
    for glyph in &outlined {
        let bounds = glyph.px_bounds();
        let (gx, gy) = ((bounds.min.x - left) as i64, (bounds.min.y - top) as i64);
        glyph.draw(|x, y, c| {
            let (px, py) = (gx + i64::from(x), gy + i64::from(y));
            if px < 0 || py < 0 || px >= i64::from(width) || py >= i64::from(height) {
                return;
            }
            let idx = py as usize * width as usize + px as usize;
            coverage[idx] = (coverage[idx] + c).min(1.0);
        });
    }

    let mut pixmap = Pixmap::new(width, height)?;
    let fill = text.fill;
    for (pixel, c) in pixmap.pixels_mut().iter_mut().zip(&coverage) {
        if *c <= 0.0 {
            continue;
        }
        let alpha = (f32::from(fill.a) * c).round() as u8;
        *pixel = fill.with_alpha(alpha).to_premultiplied();
    }
    Some(TextRaster { pixmap, left, top })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_book_resolves_nothing() {
        let book = FontBook::new();
        assert!(book.is_empty());
        assert!(book.resolve("sans-serif", 400).is_none());
    }

    #[test]
    fn test_register_rejects_garbage() {
        let mut book = FontBook::new();
        let err = book
            .register("Broken", 400, b"not a font".to_vec())
            .expect_err("garbage bytes");
        assert!(matches!(err, RenderError::Resource(_)));
        assert_eq!(book.len(), 0);
    }

    /// Loads a system font when one is installed.
    fn system_font() -> Option<FontArc> {
        let bytes = std::fs::read("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf").ok()?;
        FontArc::try_from_vec(bytes).ok()
    }

    #[test]
    fn test_resolve_prefers_family_then_nearest_weight() {
        let Some(font) = system_font() else {
            return;
        };
        let mut book = FontBook::new();
        book.register_font("Script", 400, font.clone());
        book.register_font("Block", 700, font.clone());
        book.register_font("Block", 300, font);
        assert_eq!(book.len(), 3);

        let same = |got: Option<&FontArc>, index: usize| {
            got.is_some_and(|f| std::ptr::eq(f, &book.faces[index].font))
        };
        assert!(same(book.resolve("block", 350), 2));
        assert!(same(book.resolve("BLOCK", 600), 1));
        assert!(same(book.resolve("Unknown", 420), 0));
    }

    #[test]
    fn test_alignment_moves_block() {
        let Some(font) = system_font() else {
            return;
        };
        let mut text = TextLayer {
            content: "Cake\nDay".to_string(),
            font_size: 32.0,
            ..TextLayer::default()
        };
        let left = rasterize_text(&font, &text).expect("glyphs");
        assert!(left.left >= -1.0);
        assert!(left.pixmap.height() > 40, "two lines tall");

        text.align = TextAlign::Right;
        let right = rasterize_text(&font, &text).expect("glyphs");
        assert!(right.left < -40.0);

        text.content = "   ".to_string();
        assert!(rasterize_text(&font, &text).is_none());
    }
}
