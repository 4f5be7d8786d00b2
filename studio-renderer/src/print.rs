//! Print rendering: bleed, crop marks and soft proofing.

use serde::{Deserialize, Serialize};
use studio_core::{PrintSettings, Project};
use tiny_skia::{Color, FilterQuality, Paint, Pattern, Pixmap, Rect, SpreadMode, Transform};
use tracing::{debug, info};

use crate::composite::{new_surface, Compositor};
use crate::error::{RenderError, RenderResult};

/// Length of each crop-mark arm in output pixels.
pub const CROP_MARK_LENGTH: u32 = 24;

/// Options for a print render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrintOptions {
    /// Extend the output by the bleed on every side.
    pub include_bleed: bool,
    /// Draw crop marks in the bleed area.
    pub include_marks: bool,
    /// Output scale factor.
    pub scale: f32,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            include_bleed: true,
            include_marks: true,
            scale: 1.0,
        }
    }
}

/// A print-ready surface and where the trim box sits on it.
#[derive(Debug)]
pub struct PrintSurface {
    /// Flattened output (opaque, on white).
    pub pixmap: Pixmap,
    /// Trim box left edge.
    pub trim_x: u32,
    /// Trim box top edge.
    pub trim_y: u32,
    /// Trim box width.
    pub trim_width: u32,
    /// Trim box height.
    pub trim_height: u32,
    /// Effective output DPI (project DPI times scale).
    pub dpi: f64,
}

impl PrintSurface {
    /// Whether there is room around the trim box for marks.
    #[must_use]
    pub fn has_bleed_area(&self) -> bool {
        self.trim_x > 0 && self.trim_y > 0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_len(value: f64, scale: f64) -> u32 {
    (value * scale).round().max(1.0) as u32
}

/// Render a project for print.
///
/// The output is `round((w + 2·bleed) · scale)` by `round((h + 2·bleed) ·
/// scale)` with the scaled trim box centred. Artwork edge pixels extend
/// into the bleed, everything is flattened onto white, and crop marks are
/// drawn at the four trim corners when there is a bleed area to hold them.
///
/// # Errors
///
/// Returns an error for a non-positive scale or when a surface cannot be
/// allocated.
#[allow(clippy::cast_precision_loss)]
pub fn render_for_print(
    compositor: &Compositor,
    project: &Project,
    settings: &PrintSettings,
    options: &PrintOptions,
) -> RenderResult<PrintSurface> {
    if !(options.scale.is_finite() && options.scale > 0.0) {
        return Err(RenderError::Export(format!(
            "Invalid print scale: {}",
            options.scale
        )));
    }
    let scale = f64::from(options.scale);
    let bleed = if options.include_bleed {
        settings.bleed_px(project.dpi)
    } else {
        0.0
    };
    let (w, h) = (f64::from(project.width), f64::from(project.height));
    let out_w = scaled_len(w + 2.0 * bleed, scale);
    let out_h = scaled_len(h + 2.0 * bleed, scale);
    let trim_w = scaled_len(w, scale).min(out_w);
    let trim_h = scaled_len(h, scale).min(out_h);
    let (trim_x, trim_y) = ((out_w - trim_w) / 2, (out_h - trim_h) / 2);

    let artwork = compositor.render(project)?;
    let mut pixmap = new_surface(out_w, out_h)?;
    pixmap.fill(Color::WHITE);

    let quality = if (scale - 1.0).abs() < f64::EPSILON {
        FilterQuality::Nearest
    } else {
        FilterQuality::Bicubic
    };
    let sx = trim_w as f32 / project.width as f32;
    let sy = trim_h as f32 / project.height as f32;
    let paint = Paint {
        shader: Pattern::new(
            artwork.as_ref(),
            SpreadMode::Pad,
            quality,
            1.0,
            Transform::from_translate(trim_x as f32, trim_y as f32).pre_scale(sx, sy),
        ),
        ..Paint::default()
    };
    if let Some(full) = Rect::from_xywh(0.0, 0.0, out_w as f32, out_h as f32) {
        pixmap.fill_rect(full, &paint, Transform::identity(), None);
    }

    let mut surface = PrintSurface {
        pixmap,
        trim_x,
        trim_y,
        trim_width: trim_w,
        trim_height: trim_h,
        dpi: project.dpi * scale,
    };

    if options.include_marks {
        if surface.has_bleed_area() {
            draw_crop_marks(&mut surface);
        } else {
            debug!("No bleed area; crop marks skipped");
        }
    }
    if settings.soft_proof {
        soft_proof(&mut surface.pixmap);
    }

    info!(
        width = out_w,
        height = out_h,
        bleed_px = bleed,
        soft_proof = settings.soft_proof,
        "Print surface rendered"
    );
    Ok(surface)
}

/// L-shaped 1 px marks outside each trim corner, arms pointing away from
/// the trim box and limited to the bleed area.
#[allow(clippy::cast_precision_loss)]
fn draw_crop_marks(surface: &mut PrintSurface) {
    let (x0, y0) = (surface.trim_x, surface.trim_y);
    let (x1, y1) = (x0 + surface.trim_width, y0 + surface.trim_height);
    let (out_w, out_h) = (surface.pixmap.width(), surface.pixmap.height());
    let len_x = CROP_MARK_LENGTH.min(x0).min(out_w - x1);
    let len_y = CROP_MARK_LENGTH.min(y0).min(out_h - y1);

    let mut paint = Paint::default();
    paint.set_color(Color::BLACK);

    // (x, y, width, height) in output pixels
    let marks = [
        // top-left
        (x0 - len_x, y0 - 1, len_x, 1),
        (x0 - 1, y0 - len_y, 1, len_y),
        // top-right
        (x1, y0 - 1, len_x, 1),
        (x1, y0 - len_y, 1, len_y),
        // bottom-left
        (x0 - len_x, y1, len_x, 1),
        (x0 - 1, y1, 1, len_y),
        // bottom-right
        (x1, y1, len_x, 1),
        (x1, y1, 1, len_y),
    ];
    for (x, y, w, h) in marks {
        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) {
            surface
                .pixmap
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
}

/// Approximate edible-ink soft proof: mild desaturation and tonal
/// compression toward the printable range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn soft_proof(pixmap: &mut Pixmap) {
    const SATURATION: f32 = 0.85;
    const FLOOR: f32 = 12.0;
    const RANGE: f32 = 0.9;

    for pixel in pixmap.pixels_mut() {
        let a = pixel.alpha();
        if a == 0 {
            continue;
        }
        let c = pixel.demultiply();
        let (r, g, b) = (f32::from(c.red()), f32::from(c.green()), f32::from(c.blue()));
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        let adjust = |v: f32| {
            let desaturated = luma + (v - luma) * SATURATION;
            (FLOOR + desaturated * RANGE).round().clamp(0.0, 255.0) as u8
        };
        let proofed = tiny_skia::ColorU8::from_rgba(adjust(r), adjust(g), adjust(b), a);
        *pixel = proofed.premultiply();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::{Layer, LayerKind, PixelBuffer, RasterLayer, Unit};

    fn red_project(width: u32, height: u32, dpi: f64) -> Project {
        let mut project = Project::new(width, height, dpi).expect("project");
        let pixels =
            PixelBuffer::filled(width, height, studio_core::Color::rgb(220, 0, 0)).expect("pixels");
        project.insert_layer(Layer::new(
            "art",
            LayerKind::Raster(RasterLayer::from_pixels(pixels)),
        ));
        project
    }

    fn rgba(surface: &PrintSurface, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let p = surface.pixmap.pixel(x, y).expect("in bounds").demultiply();
        (p.red(), p.green(), p.blue(), p.alpha())
    }

    #[test]
    fn test_letter_bleed_dimensions() {
        let project = Project::new(2400, 3000, 300.0).expect("project");
        let surface = render_for_print(
            &Compositor::default(),
            &project,
            &PrintSettings::default(),
            &PrintOptions::default(),
        )
        .expect("print");
        assert_eq!((surface.pixmap.width(), surface.pixmap.height()), (2475, 3075));
        assert_eq!((surface.trim_x, surface.trim_y), (37, 37));
        assert_eq!((surface.trim_width, surface.trim_height), (2400, 3000));
    }

    #[test]
    fn test_no_bleed_means_no_marks() {
        let project = red_project(100, 80, 100.0);
        let options = PrintOptions {
            include_bleed: false,
            ..PrintOptions::default()
        };
        let surface =
            render_for_print(&Compositor::default(), &project, &PrintSettings::default(), &options)
                .expect("print");
        assert_eq!((surface.pixmap.width(), surface.pixmap.height()), (100, 80));
        assert!(!surface.has_bleed_area());
        assert_eq!(rgba(&surface, 0, 0), (220, 0, 0, 255));
    }

    #[test]
    fn test_crop_marks_sit_in_bleed_and_art_extends() {
        // 0.5 in bleed at 100 dpi = 50 px per side
        let settings = PrintSettings {
            bleed: 0.5,
            unit: Unit::Inch,
            ..PrintSettings::default()
        };
        let project = red_project(100, 100, 100.0);
        let surface = render_for_print(
            &Compositor::default(),
            &project,
            &settings,
            &PrintOptions::default(),
        )
        .expect("print");
        assert_eq!(surface.pixmap.width(), 200);
        assert_eq!((surface.trim_x, surface.trim_y), (50, 50));

        // Arms along the extended trim lines.
        assert_eq!(rgba(&surface, 40, 49), (0, 0, 0, 255));
        assert_eq!(rgba(&surface, 49, 40), (0, 0, 0, 255));
        assert_eq!(rgba(&surface, 160, 150), (0, 0, 0, 255));
        assert_eq!(rgba(&surface, 150, 170), (0, 0, 0, 255));
        // Beyond the 24 px arm the bleed shows extended artwork.
        assert_eq!(rgba(&surface, 20, 49), (220, 0, 0, 255));
        // Inside the trim box is untouched artwork.
        assert_eq!(rgba(&surface, 100, 100), (220, 0, 0, 255));
    }

    #[test]
    fn test_scale_applies_to_output() {
        let project = red_project(100, 100, 100.0);
        let settings = PrintSettings {
            bleed: 0.1,
            unit: Unit::Inch,
            ..PrintSettings::default()
        };
        let options = PrintOptions {
            scale: 2.0,
            include_marks: false,
            ..PrintOptions::default()
        };
        let surface = render_for_print(&Compositor::default(), &project, &settings, &options)
            .expect("print");
        assert_eq!(surface.pixmap.width(), 240);
        assert_eq!(surface.trim_width, 200);
        assert!((surface.dpi - 200.0).abs() < f64::EPSILON);

        let bad = PrintOptions {
            scale: 0.0,
            ..PrintOptions::default()
        };
        assert!(render_for_print(&Compositor::default(), &project, &settings, &bad).is_err());
    }

    #[test]
    fn test_soft_proof_compresses_extremes() {
        let mut pixmap = Pixmap::new(2, 1).expect("pixmap");
        pixmap.fill(Color::BLACK);
        let white = tiny_skia::ColorU8::from_rgba(255, 255, 255, 255).premultiply();
        pixmap.pixels_mut()[1] = white;
        soft_proof(&mut pixmap);
        let black = pixmap.pixel(0, 0).expect("pixel");
        let white = pixmap.pixel(1, 0).expect("pixel");
        assert!(black.red() > 0);
        assert!(white.red() < 255);
        assert_eq!(black.alpha(), 255);
    }
}
