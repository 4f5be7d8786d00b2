//! Tools that create new layers.

use tracing::debug;

use super::{Tool, ToolContext, ToolKind};
use crate::event::PointerEvent;
use crate::layer::{Layer, LayerKind, ShapeGeometry, ShapeLayer, StrokeStyle, TextLayer, Transform};
use crate::selection::Point;
use crate::state::ShapeKind;

/// Clicking within this distance of the first pen anchor closes the path.
const CLOSE_DISTANCE: f32 = 6.0;

/// Click to place a text layer using the text defaults and primary colour.
#[derive(Debug, Default)]
pub struct TextTool;

impl Tool for TextTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Text
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let text = TextLayer {
            fill: ctx.state.paint.primary,
            ..ctx.state.paint.text.clone()
        };
        let layer = Layer::new("Text", LayerKind::Text(text))
            .with_transform(Transform::at(event.x, event.y));
        let id = ctx.state.insert_layer("Add Text", layer);
        debug!(%id, x = event.x, y = event.y, "Text layer created");
    }
}

/// Drag out a rectangle, ellipse or line.
#[derive(Debug, Default)]
pub struct ShapeTool {
    start: Option<Point>,
}

impl ShapeTool {
    fn build(kind: ShapeKind, start: Point, end: Point, ctx: &ToolContext<'_>) -> Layer {
        let paint = &ctx.state.paint;
        let (w, h) = ((end.x - start.x).abs(), (end.y - start.y).abs());
        let corner = Transform::at(start.x.min(end.x), start.y.min(end.y));
        let (name, shape, transform) = match kind {
            ShapeKind::Rectangle => (
                "Rectangle",
                ShapeLayer {
                    geometry: ShapeGeometry::Rectangle {
                        width: w,
                        height: h,
                        corner_radius: 0.0,
                    },
                    fill: Some(paint.primary),
                    stroke: None,
                },
                corner,
            ),
            ShapeKind::Ellipse => (
                "Ellipse",
                ShapeLayer {
                    geometry: ShapeGeometry::Ellipse {
                        width: w,
                        height: h,
                    },
                    fill: Some(paint.primary),
                    stroke: None,
                },
                corner,
            ),
            ShapeKind::Line => (
                "Line",
                ShapeLayer {
                    geometry: ShapeGeometry::Line {
                        dx: end.x - start.x,
                        dy: end.y - start.y,
                    },
                    fill: None,
                    stroke: Some(StrokeStyle {
                        color: paint.primary,
                        width: paint.brush_size.max(1.0),
                    }),
                },
                Transform::at(start.x, start.y),
            ),
        };
        Layer::new(name, LayerKind::Shape(shape)).with_transform(transform)
    }
}

impl Tool for ShapeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Shape
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.start = Some(event.point());
    }

    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(start) = self.start.take() else {
            return;
        };
        let end = event.point();
        if start.distance(end) < 1.0 {
            debug!("Shape drag too small");
            return;
        }
        let kind = ctx.state.paint.shape;
        let layer = Self::build(kind, start, end, ctx);
        ctx.state.insert_layer("Add Shape", layer);
    }
}

/// Click to place anchors; click the first anchor again to close the path
/// into a filled polygon layer.
#[derive(Debug, Default)]
pub struct PenTool {
    anchors: Vec<Point>,
}

impl PenTool {
    /// Anchors placed so far.
    #[must_use]
    pub fn anchors(&self) -> &[Point] {
        &self.anchors
    }

    fn close(&mut self, ctx: &mut ToolContext<'_>) {
        let anchors = std::mem::take(&mut self.anchors);
        let min_x = anchors.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let min_y = anchors.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let points = anchors
            .iter()
            .map(|p| Point::new(p.x - min_x, p.y - min_y))
            .collect();
        let shape = ShapeLayer {
            geometry: ShapeGeometry::Path {
                points,
                closed: true,
            },
            fill: Some(ctx.state.paint.primary),
            stroke: None,
        };
        let layer =
            Layer::new("Path", LayerKind::Shape(shape)).with_transform(Transform::at(min_x, min_y));
        let id = ctx.state.insert_layer("Add Path", layer);
        debug!(%id, anchors = anchors.len(), "Pen path closed");
    }
}

impl Tool for PenTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Pen
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let at = event.point();
        let closes = self.anchors.len() >= 3
            && self
                .anchors
                .first()
                .is_some_and(|first| first.distance(at) <= CLOSE_DISTANCE);
        if closes {
            self.close(ctx);
        } else {
            self.anchors.push(at);
        }
    }
}
