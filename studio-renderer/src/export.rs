//! Project export to image and document formats.
//!
//! Content exports render the canvas as the user sees it (optionally
//! cropped to the crop tool's frame). Print exports go through
//! [`render_for_print`] first. PDF output needs the `pdf` feature; without
//! it the PDF path produces a print-view HTML document sized for the
//! platform print dialog.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use studio_core::{convert, CropFrame, PrintSettings, Project, Unit};
use tiny_skia::{Pixmap, PixmapPaint, Transform};
use tracing::info;

use crate::composite::{new_surface, Compositor};
use crate::error::{RenderError, RenderResult};
use crate::print::{render_for_print, PrintOptions};

/// JPEG quality used for content exports.
pub const CONTENT_JPEG_QUALITY: u8 = 92;
/// JPEG quality used for print exports.
pub const PRINT_JPEG_QUALITY: u8 = 95;

/// Requested export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG image, transparency preserved.
    Png,
    /// JPEG image flattened on the background colour.
    Jpeg,
    /// Single-page PDF with an embedded raster image.
    Pdf,
}

impl FromStr for ExportFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> RenderResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "pdf" => Ok(Self::Pdf),
            other => Err(RenderError::Export(format!("Unknown export format: {other}"))),
        }
    }
}

/// What an export actually produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputKind {
    /// PNG bytes.
    Png,
    /// JPEG bytes.
    Jpeg,
    /// PDF bytes.
    Pdf,
    /// Print-view HTML (PDF fallback).
    PrintHtml,
}

impl OutputKind {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Pdf => "pdf",
            Self::PrintHtml => "html",
        }
    }

    /// MIME type.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Pdf => "application/pdf",
            Self::PrintHtml => "text/html",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoded export output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    /// What the bytes are.
    pub kind: OutputKind,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

impl ExportBlob {
    /// Suggested file name for `stem`.
    #[must_use]
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.kind.extension())
    }
}

/// Configuration for content export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportConfig {
    /// Background for formats without transparency, as RGB bytes.
    pub background: [u8; 3],
    /// JPEG quality 1-100.
    pub jpeg_quality: u8,
    /// Crop frame applied to content exports.
    pub crop: Option<CropFrame>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            background: [255, 255, 255],
            jpeg_quality: CONTENT_JPEG_QUALITY,
            crop: None,
        }
    }
}

/// Exports projects through a [`Compositor`].
#[derive(Debug, Default)]
pub struct ProjectExporter {
    compositor: Compositor,
    config: ExportConfig,
}

impl ProjectExporter {
    /// Create an exporter.
    #[must_use]
    pub fn new(compositor: Compositor, config: ExportConfig) -> Self {
        Self { compositor, config }
    }

    /// Create an exporter with default configuration and no fonts.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// The compositor.
    #[must_use]
    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Export the canvas content, cropped if a crop frame is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn export(&self, project: &Project, format: ExportFormat) -> RenderResult<ExportBlob> {
        let mut surface = self.compositor.render(project)?;
        if let Some(crop) = self.config.crop {
            surface = crop_surface(&surface, crop)?;
        }
        let blob = match format {
            ExportFormat::Png => ExportBlob {
                kind: OutputKind::Png,
                bytes: encode_png(&surface)?,
            },
            ExportFormat::Jpeg => ExportBlob {
                kind: OutputKind::Jpeg,
                bytes: encode_jpeg(&surface, self.config.jpeg_quality, self.config.background)?,
            },
            ExportFormat::Pdf => document(
                &surface,
                project.dpi,
                "Cake Studio Export",
                self.config.background,
            )?,
        };
        info!(
            kind = %blob.kind,
            bytes = blob.bytes.len(),
            width = surface.width(),
            height = surface.height(),
            "Content exported"
        );
        Ok(blob)
    }

    /// Export a print render (bleed, marks, soft proof) of the project.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn export_print(
        &self,
        project: &Project,
        settings: &PrintSettings,
        options: &PrintOptions,
        format: ExportFormat,
    ) -> RenderResult<ExportBlob> {
        let print = render_for_print(&self.compositor, project, settings, options)?;
        let blob = match format {
            ExportFormat::Png => ExportBlob {
                kind: OutputKind::Png,
                bytes: encode_png(&print.pixmap)?,
            },
            ExportFormat::Jpeg => ExportBlob {
                kind: OutputKind::Jpeg,
                bytes: encode_jpeg(&print.pixmap, PRINT_JPEG_QUALITY, [255, 255, 255])?,
            },
            ExportFormat::Pdf => {
                document(&print.pixmap, print.dpi, "Cake Studio Print", [255, 255, 255])?
            }
        };
        info!(
            kind = %blob.kind,
            bytes = blob.bytes.len(),
            dpi = print.dpi,
            "Print exported"
        );
        Ok(blob)
    }
}

/// Copy the crop frame out of a surface. The frame is clamped to the
/// surface; a frame entirely outside it is an error.
///
/// # Errors
///
/// Returns [`RenderError::Export`] for an empty crop.
#[allow(clippy::cast_possible_wrap)]
pub fn crop_surface(surface: &Pixmap, crop: CropFrame) -> RenderResult<Pixmap> {
    let x1 = crop.x.saturating_add(crop.width).min(surface.width());
    let y1 = crop.y.saturating_add(crop.height).min(surface.height());
    if crop.x >= x1 || crop.y >= y1 {
        return Err(RenderError::Export(format!(
            "Crop frame {crop:?} is outside the {}x{} canvas",
            surface.width(),
            surface.height()
        )));
    }
    let mut out = new_surface(x1 - crop.x, y1 - crop.y)?;
    out.draw_pixmap(
        -(crop.x as i32),
        -(crop.y as i32),
        surface.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(out)
}

/// Encode as PNG with transparency.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
pub fn encode_png(surface: &Pixmap) -> RenderResult<Vec<u8>> {
    surface
        .encode_png()
        .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
}

/// Flatten onto `background` and encode as JPEG.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_jpeg(surface: &Pixmap, quality: u8, background: [u8; 3]) -> RenderResult<Vec<u8>> {
    let (width, height) = (surface.width(), surface.height());
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in surface.data().chunks_exact(4) {
        // Premultiplied: out = src + bg * (1 - alpha)
        let inv = 1.0 - f32::from(pixel[3]) / 255.0;
        for (channel, bg) in pixel[..3].iter().zip(background) {
            rgb.push(f32::from(bg).mul_add(inv, f32::from(*channel)).round().min(255.0) as u8);
        }
    }

    let mut buf = std::io::Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder
        .write_image(&rgb, width, height, image::ColorType::Rgb8.into())
        .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Physical size of a `width`x`height` pixel surface printed at `dpi`.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if `dpi` is not a positive number.
pub fn physical_size(width: u32, height: u32, dpi: f64, unit: Unit) -> RenderResult<(f64, f64)> {
    if !(dpi.is_finite() && dpi > 0.0) {
        return Err(RenderError::Export(format!("Invalid output DPI: {dpi}")));
    }
    Ok((
        convert(f64::from(width), Unit::Pixel, unit, dpi),
        convert(f64::from(height), Unit::Pixel, unit, dpi),
    ))
}

/// Composite `surface` over an opaque `background`.
///
/// # Errors
///
/// Returns [`RenderError::Surface`] if the output surface can't be allocated.
pub fn flatten(surface: &Pixmap, background: [u8; 3]) -> RenderResult<Pixmap> {
    let mut out = new_surface(surface.width(), surface.height())?;
    let [r, g, b] = background;
    out.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));
    out.draw_pixmap(
        0,
        0,
        surface.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(out)
}

#[cfg(feature = "pdf")]
fn document(surface: &Pixmap, dpi: f64, title: &str, background: [u8; 3]) -> RenderResult<ExportBlob> {
    Ok(ExportBlob {
        kind: OutputKind::Pdf,
        bytes: encode_pdf(surface, dpi, title, background)?,
    })
}

#[cfg(not(feature = "pdf"))]
fn document(surface: &Pixmap, dpi: f64, title: &str, background: [u8; 3]) -> RenderResult<ExportBlob> {
    tracing::warn!("PDF support not compiled in; producing a print-view document instead");
    Ok(ExportBlob {
        kind: OutputKind::PrintHtml,
        bytes: print_view_html(surface, dpi, title, background)?.into_bytes(),
    })
}

/// A single-page PDF sized from the surface's pixel dimensions and `dpi`,
/// with the artwork flattened onto `background`.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if `dpi` is invalid or PDF generation
/// fails.
#[cfg(feature = "pdf")]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_pdf(
    surface: &Pixmap,
    dpi: f64,
    title: &str,
    background: [u8; 3],
) -> RenderResult<Vec<u8>> {
    let (w_mm, h_mm) = physical_size(surface.width(), surface.height(), dpi, Unit::Millimeter)?;
    let png = encode_png(&flatten(surface, background)?)?;
    let (doc, page, layer) = printpdf::PdfDocument::new(
        title,
        printpdf::Mm(w_mm as f32),
        printpdf::Mm(h_mm as f32),
        "Artwork",
    );
    let current_layer = doc.get_page(page).get_layer(layer);

    let dynamic_image = printpdf::image_crate::load_from_memory(&png)
        .map_err(|e| RenderError::Export(format!("Failed to decode PNG for PDF: {e}")))?;
    let pdf_image = printpdf::Image::from_dynamic_image(&dynamic_image);
    let transform = printpdf::ImageTransform {
        translate_x: Some(printpdf::Mm(0.0)),
        translate_y: Some(printpdf::Mm(0.0)),
        dpi: Some(dpi as f32),
        ..Default::default()
    };
    pdf_image.add_to_layer(current_layer, transform);

    doc.save_to_bytes()
        .map_err(|e| RenderError::Export(format!("PDF save failed: {e}")))
}

/// A print-view HTML document: the PNG inline, flattened onto `background`,
/// with `@page` sized to the physical output so the platform print dialog
/// reproduces it 1:1.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if `dpi` is invalid or PNG encoding
/// fails.
pub fn print_view_html(
    surface: &Pixmap,
    dpi: f64,
    title: &str,
    background: [u8; 3],
) -> RenderResult<String> {
    let (w_in, h_in) = physical_size(surface.width(), surface.height(), dpi, Unit::Inch)?;
    let png = encode_png(&flatten(surface, background)?)?;
    let title = escape_html(title);
    Ok(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <style>@page {{ size: {w_in:.4}in {h_in:.4}in; margin: 0; }} \
         html, body {{ margin: 0; padding: 0; }} \
         img {{ display: block; width: {w_in:.4}in; height: {h_in:.4}in; }}</style>\
         </head><body><img alt=\"{title}\" src=\"data:image/png;base64,{}\"></body></html>\n",
        STANDARD.encode(png)
    ))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
