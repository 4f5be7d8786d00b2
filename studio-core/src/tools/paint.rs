//! Pixel painting tools: brush, eraser, mask brush, eyedropper, bucket and
//! gradient.

use tiny_skia::{
    BlendMode, FillRule, GradientStop, IntSize, LinearGradient, Mask, Paint, PathBuilder, Rect,
    SpreadMode, Transform,
};
use tracing::{debug, trace};

use super::{brush_diameter, paint_dab, paint_segment, round_stroke, Tool, ToolContext, ToolKind};
use crate::event::PointerEvent;
use crate::layer::LayerMask;
use crate::pixels::AlphaBuffer;
use crate::region;
use crate::selection::Point;
use crate::Color;

fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

/// Brush and eraser. The eraser paints with destination-out.
#[derive(Debug)]
pub struct BrushTool {
    erase: bool,
    last: Option<Point>,
}

impl BrushTool {
    /// A painting brush.
    #[must_use]
    pub fn brush() -> Self {
        Self {
            erase: false,
            last: None,
        }
    }

    /// An eraser.
    #[must_use]
    pub fn eraser() -> Self {
        Self {
            erase: true,
            last: None,
        }
    }

    fn paint(&self, ctx: &ToolContext<'_>) -> Paint<'static> {
        if self.erase {
            let mut paint = solid_paint(Color::BLACK);
            paint.blend_mode = BlendMode::DestinationOut;
            paint
        } else {
            solid_paint(ctx.state.paint.primary)
        }
    }
}

impl Tool for BrushTool {
    fn kind(&self) -> ToolKind {
        if self.erase {
            ToolKind::Eraser
        } else {
            ToolKind::Brush
        }
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if ctx.state.paintable_layer_id().is_none() {
            return;
        }
        ctx.state
            .mark(if self.erase { "Eraser" } else { "Brush Stroke" });
        let paint = self.paint(ctx);
        let diameter = brush_diameter(ctx.state.paint.brush_size, event);
        let at = event.point();
        // A click without movement still leaves a dot.
        ctx.state
            .edit_active_pixels(|pixmap, clip| paint_dab(pixmap, clip, at, diameter, &paint));
        self.last = Some(at);
    }

    fn on_pointer_move(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(from) = self.last else { return };
        let to = event.point();
        let paint = self.paint(ctx);
        let diameter = brush_diameter(ctx.state.paint.brush_size, event);
        ctx.state
            .edit_active_pixels(|pixmap, clip| paint_segment(pixmap, clip, from, to, diameter, &paint));
        self.last = Some(to);
    }

    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if self.last.is_some() {
            self.on_pointer_move(event, ctx);
        }
        self.last = None;
    }
}

/// Paints into the active layer's persistent mask: reveal by default,
/// hide with alt. Not clipped by the selection.
#[derive(Debug, Default)]
pub struct MaskBrushTool {
    last: Option<Point>,
    hide: bool,
}

impl MaskBrushTool {
    fn stamp(&self, ctx: &mut ToolContext<'_>, from: Point, to: Point, diameter: f32) {
        let (width, height) = (ctx.state.project().width, ctx.state.project().height);
        let Some(layer) = ctx.state.active_layer_mut() else {
            return;
        };
        let mask = layer
            .mask
            .get_or_insert_with(|| LayerMask::revealing(width, height));

        let path = if from == to {
            PathBuilder::from_circle(to.x, to.y, diameter / 2.0)
        } else {
            let mut pb = PathBuilder::new();
            pb.move_to(from.x, from.y);
            pb.line_to(to.x, to.y);
            pb.finish()
                .and_then(|line| line.stroke(&round_stroke(diameter), 1.0))
        };
        if let Some(path) = path {
            apply_coverage(&mut mask.alpha, &path, self.hide);
        }
    }
}

fn apply_coverage(alpha: &mut AlphaBuffer, path: &tiny_skia::Path, hide: bool) {
    let Some(mut coverage) = Mask::new(alpha.width(), alpha.height()) else {
        return;
    };
    coverage.fill_path(path, FillRule::Winding, true, Transform::identity());
    for (dst, &c) in alpha.data_mut().iter_mut().zip(coverage.data()) {
        if c == 0 {
            continue;
        }
        *dst = if hide {
            u8::try_from(u16::from(*dst) * u16::from(255 - c) / 255).unwrap_or(0)
        } else {
            (*dst).max(c)
        };
    }
}

impl Tool for MaskBrushTool {
    fn kind(&self) -> ToolKind {
        ToolKind::MaskBrush
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if ctx.state.paintable_layer_id().is_none() {
            return;
        }
        ctx.state.mark("Mask Brush");
        self.hide = event.modifiers.alt;
        let at = event.point();
        let diameter = brush_diameter(ctx.state.paint.brush_size, event);
        self.stamp(ctx, at, at, diameter);
        self.last = Some(at);
    }

    fn on_pointer_move(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(from) = self.last else { return };
        let to = event.point();
        let diameter = brush_diameter(ctx.state.paint.brush_size, event);
        self.stamp(ctx, from, to, diameter);
        self.last = Some(to);
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.last = None;
    }
}

/// Samples the composited surface into the primary colour (secondary with
/// alt).
#[derive(Debug, Default)]
pub struct EyedropperTool;

impl Tool for EyedropperTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eyedropper
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(surface) = ctx.surface else {
            debug!("Eyedropper: no composited surface");
            return;
        };
        if event.x < 0.0 || event.y < 0.0 {
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let Some(pixel) = surface.pixel(event.x.floor() as u32, event.y.floor() as u32) else {
            trace!("Eyedropper outside surface");
            return;
        };
        let color = Color::from_premultiplied(pixel);
        if event.modifiers.alt {
            ctx.state.paint.secondary = color;
        } else {
            ctx.state.paint.primary = color;
        }
    }
}

/// Tolerance flood fill in the primary colour, clipped by the selection.
#[derive(Debug, Default)]
pub struct BucketTool;

impl Tool for BucketTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Bucket
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if ctx.state.paintable_layer_id().is_none() {
            return;
        }
        let tolerance = ctx.state.paint.tolerance;
        let region = {
            let Some(layer) = ctx.state.active_layer() else {
                return;
            };
            let (ox, oy) = layer.pixel_offset();
            let Some(pixels) = layer.as_raster().and_then(|r| r.resolve()) else {
                return;
            };
            #[allow(clippy::cast_possible_truncation)]
            let seed = (event.x.floor() as i32 - ox, event.y.floor() as i32 - oy);
            region::flood_fill(
                pixels.pixmap().data(),
                pixels.width(),
                pixels.height(),
                seed,
                tolerance,
            )
        };
        let Some(region) = region else {
            trace!("Bucket seed outside layer");
            return;
        };

        let color = ctx.state.paint.primary;
        ctx.state.mark("Paint Bucket");
        ctx.state.edit_active_pixels(|pixmap, clip| {
            let mut coverage = region.to_alpha();
            if let Some(selection) = &clip.mask {
                for (c, s) in coverage.iter_mut().zip(selection.data()) {
                    *c = (*c).min(*s);
                }
            }
            let Some(size) = IntSize::from_wh(pixmap.width(), pixmap.height()) else {
                return;
            };
            let Some(mask) = Mask::from_vec(coverage, size) else {
                return;
            };
            #[allow(clippy::cast_precision_loss)]
            let Some(rect) = Rect::from_xywh(0.0, 0.0, pixmap.width() as f32, pixmap.height() as f32)
            else {
                return;
            };
            let mut paint = solid_paint(color);
            paint.anti_alias = false;
            pixmap.fill_rect(rect, &paint, Transform::identity(), Some(&mask));
        });
    }
}

/// Linear gradient from primary to secondary over the layer, applied on
/// release and clipped by the selection.
#[derive(Debug, Default)]
pub struct GradientTool {
    start: Option<Point>,
}

impl Tool for GradientTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Gradient
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if ctx.state.paintable_layer_id().is_some() {
            self.start = Some(event.point());
        }
    }

    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(start) = self.start.take() else {
            return;
        };
        let end = event.point();
        if start.distance(end) < 1.0 || ctx.state.paintable_layer_id().is_none() {
            return;
        }
        let stops = vec![
            GradientStop::new(0.0, ctx.state.paint.primary.to_skia()),
            GradientStop::new(1.0, ctx.state.paint.secondary.to_skia()),
        ];
        ctx.state.mark("Gradient");
        ctx.state.edit_active_pixels(|pixmap, clip| {
            let (a, b) = (clip.local(start), clip.local(end));
            let Some(shader) = LinearGradient::new(
                tiny_skia::Point::from_xy(a.x, a.y),
                tiny_skia::Point::from_xy(b.x, b.y),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            ) else {
                return;
            };
            #[allow(clippy::cast_precision_loss)]
            let Some(rect) = Rect::from_xywh(0.0, 0.0, pixmap.width() as f32, pixmap.height() as f32)
            else {
                return;
            };
            let paint = Paint {
                shader,
                anti_alias: false,
                ..Paint::default()
            };
            pixmap.fill_rect(rect, &paint, Transform::identity(), clip.mask.as_ref());
        });
    }
}
