//! Retouching tools: clone stamp, spot healing and patch.

use tiny_skia::{
    FilterQuality, Paint, Pixmap, PixmapPaint, PremultipliedColorU8, SpreadMode, Transform,
};
use tracing::debug;

use super::{brush_diameter, paint_dab, paint_segment, spaced_points, Tool, ToolContext, ToolKind};
use crate::event::PointerEvent;
use crate::selection::Point;
use crate::Color;

struct CloneStroke {
    /// Layer pixels at stroke start.
    source: Pixmap,
    /// Source position minus stroke start.
    offset: (f32, f32),
    last: Point,
}

/// Clone stamp. Alt-click sets the source; strokes copy from a snapshot
/// taken when the stroke starts, keeping the source-to-stroke offset.
#[derive(Default)]
pub struct CloneTool {
    source: Option<Point>,
    stroke: Option<CloneStroke>,
}

impl std::fmt::Debug for CloneTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloneTool")
            .field("source", &self.source)
            .field("stroking", &self.stroke.is_some())
            .finish()
    }
}

impl CloneTool {
    /// The current source point, if one was set.
    #[must_use]
    pub fn source(&self) -> Option<Point> {
        self.source
    }

    fn stamp(stroke: &CloneStroke, ctx: &mut ToolContext<'_>, to: Point, diameter: f32) {
        let from = stroke.last;
        let shader = tiny_skia::Pattern::new(
            stroke.source.as_ref(),
            SpreadMode::Pad,
            FilterQuality::Nearest,
            1.0,
            Transform::from_translate(-stroke.offset.0, -stroke.offset.1),
        );
        let paint = Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        };
        ctx.state
            .edit_active_pixels(|pixmap, clip| paint_segment(pixmap, clip, from, to, diameter, &paint));
    }
}

impl Tool for CloneTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Clone
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if event.modifiers.alt {
            self.source = Some(event.point());
            debug!(x = event.x, y = event.y, "Clone source set");
            return;
        }
        let Some(source) = self.source else {
            debug!("Clone stamp: no source set");
            return;
        };
        if ctx.state.paintable_layer_id().is_none() {
            return;
        }
        let Some(snapshot) = ctx
            .state
            .active_layer()
            .and_then(|l| l.as_raster())
            .and_then(|r| r.resolve())
            .map(|p| p.pixmap().clone())
        else {
            return;
        };

        ctx.state.mark("Clone Stamp");
        let at = event.point();
        let stroke = CloneStroke {
            source: snapshot,
            offset: (source.x - at.x, source.y - at.y),
            last: at,
        };
        let diameter = brush_diameter(ctx.state.paint.brush_size, event);
        Self::stamp(&stroke, ctx, at, diameter);
        self.stroke = Some(stroke);
    }

    fn on_pointer_move(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(stroke) = self.stroke.as_mut() else {
            return;
        };
        let to = event.point();
        let diameter = brush_diameter(ctx.state.paint.brush_size, event);
        Self::stamp(stroke, ctx, to, diameter);
        stroke.last = to;
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.stroke = None;
    }
}

/// Width of the sampling ring around a healing dab.
const RING_WIDTH: f32 = 3.0;

/// Mean premultiplied colour of the pixels in the annulus `r..r + RING_WIDTH`
/// around a layer-local point.
fn ring_mean(pixmap: &Pixmap, center: Point, radius: f32) -> Option<Color> {
    let outer = radius + RING_WIDTH;
    #[allow(clippy::cast_possible_truncation)]
    let (x0, y0, x1, y1) = (
        (center.x - outer).floor().max(0.0) as u32,
        (center.y - outer).floor().max(0.0) as u32,
        (center.x + outer).ceil() as u32,
        (center.y + outer).ceil() as u32,
    );
    let mut sum = [0_u64; 4];
    let mut count = 0_u64;
    for y in y0..y1.min(pixmap.height()) {
        for x in x0..x1.min(pixmap.width()) {
            #[allow(clippy::cast_precision_loss)]
            let d = Point::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
            if d < radius || d > outer {
                continue;
            }
            if let Some(px) = pixmap.pixel(x, y) {
                sum[0] += u64::from(px.red());
                sum[1] += u64::from(px.green());
                sum[2] += u64::from(px.blue());
                sum[3] += u64::from(px.alpha());
                count += 1;
            }
        }
    }
    if count == 0 {
        return None;
    }
    let avg = |v: u64| u8::try_from(v / count).unwrap_or(u8::MAX);
    PremultipliedColorU8::from_rgba(avg(sum[0]), avg(sum[1]), avg(sum[2]), avg(sum[3]))
        .map(Color::from_premultiplied)
}

/// Spot healing: each dab is filled with the mean colour of the ring
/// around it.
#[derive(Debug, Default)]
pub struct SpotHealingTool {
    last: Option<Point>,
}

impl SpotHealingTool {
    fn heal(ctx: &mut ToolContext<'_>, at: Point, diameter: f32) {
        ctx.state.edit_active_pixels(|pixmap, clip| {
            let Some(color) = ring_mean(pixmap, clip.local(at), diameter / 2.0) else {
                return;
            };
            let mut paint = Paint::default();
            paint.set_color(color.to_skia());
            paint.anti_alias = true;
            paint_dab(pixmap, clip, at, diameter, &paint);
        });
    }
}

impl Tool for SpotHealingTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SpotHealing
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if ctx.state.paintable_layer_id().is_none() {
            return;
        }
        ctx.state.mark("Spot Healing");
        let at = event.point();
        Self::heal(ctx, at, brush_diameter(ctx.state.paint.brush_size, event));
        self.last = Some(at);
    }

    fn on_pointer_move(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(last) = self.last else { return };
        let diameter = brush_diameter(ctx.state.paint.brush_size, event);
        for at in spaced_points(last, event.point(), diameter / 2.0) {
            Self::heal(ctx, at, diameter);
        }
        self.last = Some(event.point());
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.last = None;
    }
}

/// Patch: drag from a source area toward the selection; on release the
/// layer, shifted by the drag, is composited into the selection.
/// A selected pixel `p` takes its content from `p - (end - start)`.
#[derive(Debug, Default)]
pub struct PatchTool {
    start: Option<Point>,
}

impl Tool for PatchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Patch
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.start = Some(event.point());
    }

    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(start) = self.start.take() else {
            return;
        };
        if ctx.state.selection().is_empty() {
            debug!("Patch: nothing selected");
            return;
        }
        if ctx.state.paintable_layer_id().is_none() {
            return;
        }
        let end = event.point();
        #[allow(clippy::cast_possible_truncation)]
        let (dx, dy) = (
            (end.x - start.x).round() as i32,
            (end.y - start.y).round() as i32,
        );
        if dx == 0 && dy == 0 {
            return;
        }

        let opacity = ctx.state.paint.patch_opacity.clamp(0.0, 1.0);
        ctx.state.mark("Patch");
        ctx.state.edit_active_pixels(|pixmap, clip| {
            let source = pixmap.clone();
            let paint = PixmapPaint {
                opacity,
                quality: FilterQuality::Nearest,
                ..PixmapPaint::default()
            };
            pixmap.draw_pixmap(
                dx,
                dy,
                source.as_ref(),
                &paint,
                Transform::identity(),
                clip.mask.as_ref(),
            );
        });
    }
}
