//! Flattening a project's layer stack into one surface.

use studio_core::{Layer, LayerKind, Project, ShapeLayer, TextLayer};
use tiny_skia::{FillRule, FilterQuality, Paint, Pixmap, PixmapPaint, Stroke, Transform};
use tracing::{debug, warn};

use crate::error::{RenderError, RenderResult};
use crate::text::{rasterize_text, FontBook};

/// Allocate a transparent surface.
///
/// # Errors
///
/// Returns [`RenderError::Surface`] for zero or oversized dimensions.
pub fn new_surface(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height)
        .ok_or_else(|| RenderError::Surface(format!("Cannot allocate {width}x{height} surface")))
}

/// Renders projects with a set of registered fonts.
#[derive(Debug, Default)]
pub struct Compositor {
    fonts: FontBook,
}

impl Compositor {
    /// A compositor using `fonts` for text layers.
    #[must_use]
    pub fn new(fonts: FontBook) -> Self {
        Self { fonts }
    }

    /// Registered fonts.
    #[must_use]
    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Mutable font registry.
    pub fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    /// Composite every rendered layer bottom to top onto a transparent
    /// canvas-sized surface.
    ///
    /// Layers whose content cannot be produced (an undecodable raster
    /// reference, text with no registered font) are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a surface cannot be allocated.
    pub fn render(&self, project: &Project) -> RenderResult<Pixmap> {
        let (width, height) = (project.width, project.height);
        let mut canvas = new_surface(width, height)?;

        for layer in project.layers().iter().rev() {
            if !layer.is_rendered() {
                continue;
            }
            let Some(surface) = self.render_layer(layer, width, height)? else {
                continue;
            };
            let mask = layer
                .mask
                .as_ref()
                .filter(|m| m.enabled)
                .and_then(|m| {
                    if (m.alpha.width(), m.alpha.height()) == (width, height) {
                        m.alpha.to_mask()
                    } else {
                        warn!(id = %layer.id, "Layer mask size does not match canvas; ignoring it");
                        None
                    }
                });
            let paint = PixmapPaint {
                opacity: layer.opacity.clamp(0.0, 1.0),
                blend_mode: layer.blend_mode.to_skia(),
                quality: FilterQuality::Nearest,
            };
            canvas.draw_pixmap(0, 0, surface.as_ref(), &paint, Transform::identity(), mask.as_ref());
        }
        Ok(canvas)
    }

    /// Draw one layer's content, transformed, onto a canvas-sized surface.
    /// `Ok(None)` when the layer has nothing to draw.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be allocated.
    pub fn render_layer(&self, layer: &Layer, width: u32, height: u32) -> RenderResult<Option<Pixmap>> {
        let mut surface = new_surface(width, height)?;
        let transform = layer.transform.to_skia();
        let drawn = match &layer.kind {
            LayerKind::Raster(raster) => match raster.resolve() {
                Some(pixels) => {
                    let quality = if layer.transform.is_pixel_aligned() {
                        FilterQuality::Nearest
                    } else {
                        FilterQuality::Bilinear
                    };
                    let paint = PixmapPaint {
                        quality,
                        ..PixmapPaint::default()
                    };
                    surface.draw_pixmap(0, 0, pixels.pixmap().as_ref(), &paint, transform, None);
                    true
                }
                None => {
                    warn!(id = %layer.id, name = %layer.name, "Skipping undecodable raster layer");
                    false
                }
            },
            LayerKind::Text(text) => self.draw_text(&mut surface, layer, text, transform),
            LayerKind::Shape(shape) => draw_shape(&mut surface, shape, transform),
        };
        Ok(drawn.then_some(surface))
    }

    fn draw_text(&self, surface: &mut Pixmap, layer: &Layer, text: &TextLayer, transform: Transform) -> bool {
        let Some(font) = self.fonts.resolve(&text.font_family, text.font_weight) else {
            warn!(
                id = %layer.id,
                family = %text.font_family,
                "No font registered; skipping text layer"
            );
            return false;
        };
        let Some(raster) = rasterize_text(font, text) else {
            debug!(id = %layer.id, "Text layer has no visible glyphs");
            return false;
        };
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        surface.draw_pixmap(
            0,
            0,
            raster.pixmap.as_ref(),
            &paint,
            transform.pre_translate(raster.left, raster.top),
            None,
        );
        true
    }
}

fn draw_shape(surface: &mut Pixmap, shape: &ShapeLayer, transform: Transform) -> bool {
    let Some(path) = shape.geometry.to_path() else {
        debug!("Degenerate shape geometry");
        return false;
    };
    if let Some(fill) = shape.fill {
        let mut paint = Paint::default();
        paint.set_color(fill.to_skia());
        paint.anti_alias = true;
        surface.fill_path(&path, &paint, FillRule::Winding, transform, None);
    }
    if let Some(style) = shape.stroke {
        let mut paint = Paint::default();
        paint.set_color(style.color.to_skia());
        paint.anti_alias = true;
        let stroke = Stroke {
            width: style.width.max(0.0),
            ..Stroke::default()
        };
        surface.stroke_path(&path, &paint, &stroke, transform, None);
    }
    true
}

/// Composite a project without any fonts registered.
///
/// # Errors
///
/// Returns an error if a surface cannot be allocated.
pub fn render_project_to_surface(project: &Project) -> RenderResult<Pixmap> {
    Compositor::default().render(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::{
        BlendMode, Color, LayerMask, PixelBuffer, RasterLayer, ShapeGeometry, StrokeStyle,
        Transform as LayerTransform,
    };

    fn pixel(surface: &Pixmap, x: u32, y: u32) -> Color {
        Color::from_premultiplied(surface.pixel(x, y).expect("in bounds"))
    }

    fn solid(color: Color, w: u32, h: u32) -> Layer {
        let pixels = PixelBuffer::filled(w, h, color).expect("pixels");
        Layer::new("solid", LayerKind::Raster(RasterLayer::from_pixels(pixels)))
    }

    #[test]
    fn test_top_layer_wins_and_order_matters() {
        let mut project = Project::new(20, 20, 300.0).expect("project");
        project.insert_layer(solid(Color::rgb(255, 0, 0), 20, 20));
        project.insert_layer(
            solid(Color::rgb(0, 0, 255), 10, 10).with_transform(LayerTransform::at(5.0, 5.0)),
        );
        let surface = render_project_to_surface(&project).expect("render");
        assert_eq!(pixel(&surface, 1, 1), Color::rgb(255, 0, 0));
        assert_eq!(pixel(&surface, 10, 10), Color::rgb(0, 0, 255));
        assert_eq!(pixel(&surface, 16, 16), Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_hidden_and_transparent_layers_skipped() {
        let mut project = Project::new(8, 8, 300.0).expect("project");
        project.insert_layer(solid(Color::rgb(10, 200, 10), 8, 8));
        let hidden = project.insert_layer(solid(Color::rgb(255, 0, 0), 8, 8));
        project.layer_mut(hidden).expect("layer").visible = false;
        project.insert_layer(solid(Color::rgb(0, 0, 255), 8, 8).with_opacity(0.0));

        let surface = render_project_to_surface(&project).expect("render");
        assert_eq!(pixel(&surface, 4, 4), Color::rgb(10, 200, 10));
    }

    #[test]
    fn test_opacity_and_blend_mode() {
        let mut project = Project::new(4, 4, 300.0).expect("project");
        project.insert_layer(solid(Color::WHITE, 4, 4));
        project.insert_layer(solid(Color::BLACK, 4, 4).with_opacity(0.5));
        let surface = render_project_to_surface(&project).expect("render");
        let grey = pixel(&surface, 0, 0);
        assert!((i32::from(grey.r) - 128).abs() <= 1, "got {grey:?}");

        let mut project = Project::new(4, 4, 300.0).expect("project");
        project.insert_layer(solid(Color::rgb(200, 100, 50), 4, 4));
        project.insert_layer(
            solid(Color::rgb(128, 128, 128), 4, 4).with_blend_mode(BlendMode::Multiply),
        );
        let surface = render_project_to_surface(&project).expect("render");
        let multiplied = pixel(&surface, 0, 0);
        assert!((i32::from(multiplied.r) - 100).abs() <= 1, "got {multiplied:?}");
        assert!((i32::from(multiplied.g) - 50).abs() <= 1, "got {multiplied:?}");
    }

    #[test]
    fn test_enabled_mask_hides_pixels() {
        let mut project = Project::new(10, 10, 300.0).expect("project");
        let id = project.insert_layer(solid(Color::rgb(0, 0, 0), 10, 10));
        let mut mask = LayerMask::revealing(10, 10);
        for v in &mut mask.alpha.data_mut()[..50] {
            *v = 0;
        }
        project.layer_mut(id).expect("layer").mask = Some(mask);

        let surface = render_project_to_surface(&project).expect("render");
        assert_eq!(pixel(&surface, 2, 2).a, 0);
        assert_eq!(pixel(&surface, 2, 7).a, 255);

        assert!(project.set_mask_enabled(id, false));
        let surface = render_project_to_surface(&project).expect("render");
        assert_eq!(pixel(&surface, 2, 2).a, 255);
    }

    #[test]
    fn test_shapes_fill_and_stroke() {
        let mut project = Project::new(40, 40, 300.0).expect("project");
        let rect = ShapeLayer {
            geometry: ShapeGeometry::Rectangle {
                width: 20.0,
                height: 10.0,
                corner_radius: 0.0,
            },
            fill: Some(Color::rgb(0, 160, 0)),
            stroke: None,
        };
        project.insert_layer(
            Layer::new("rect", LayerKind::Shape(rect)).with_transform(LayerTransform::at(5.0, 5.0)),
        );
        let line = ShapeLayer {
            geometry: ShapeGeometry::Line { dx: 0.0, dy: 30.0 },
            fill: None,
            stroke: Some(StrokeStyle {
                color: Color::rgb(0, 0, 200),
                width: 4.0,
            }),
        };
        project.insert_layer(
            Layer::new("line", LayerKind::Shape(line)).with_transform(LayerTransform::at(35.0, 5.0)),
        );

        let surface = render_project_to_surface(&project).expect("render");
        assert_eq!(pixel(&surface, 10, 10), Color::rgb(0, 160, 0));
        assert_eq!(pixel(&surface, 10, 20).a, 0);
        assert_eq!(pixel(&surface, 35, 20), Color::rgb(0, 0, 200));
    }

    #[test]
    fn test_text_without_fonts_is_skipped() {
        let mut project = Project::new(50, 50, 300.0).expect("project");
        project.insert_layer(Layer::new("title", LayerKind::Text(TextLayer::default())));
        let surface = render_project_to_surface(&project).expect("render");
        assert!(surface.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn test_undecodable_raster_is_skipped() {
        let mut project = Project::new(6, 6, 300.0).expect("project");
        project.insert_layer(solid(Color::rgb(1, 2, 3), 6, 6));
        project.insert_layer(Layer::new(
            "broken",
            LayerKind::Raster(RasterLayer::from_png(b"definitely not png".to_vec())),
        ));
        let surface = render_project_to_surface(&project).expect("render");
        assert_eq!(pixel(&surface, 3, 3), Color::rgb(1, 2, 3));
    }
}
