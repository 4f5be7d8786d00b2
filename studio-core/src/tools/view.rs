//! Move, crop and viewport tools.

use tracing::debug;

use super::{Tool, ToolContext, ToolKind};
use crate::event::PointerEvent;
use crate::grid::snap_to_grid;
use crate::layer::{LayerId, Transform};
use crate::selection::Point;
use crate::state::CropFrame;

#[derive(Debug, Clone, Copy)]
struct MoveDrag {
    layer: LayerId,
    start: Point,
    origin: Transform,
    marked: bool,
}

/// Drags the active layer. The checkpoint is recorded on the first actual
/// movement, and the grid snap is applied on release.
#[derive(Debug, Default)]
pub struct MoveTool {
    drag: Option<MoveDrag>,
}

impl MoveTool {
    fn apply(drag: &mut MoveDrag, event: &PointerEvent, ctx: &mut ToolContext<'_>) -> Option<Transform> {
        let (dx, dy) = (event.x - drag.start.x, event.y - drag.start.y);
        if dx == 0.0 && dy == 0.0 && !drag.marked {
            return None;
        }
        if !drag.marked {
            ctx.state.mark("Move Layer");
            drag.marked = true;
        }
        let moved = Transform {
            x: drag.origin.x + dx,
            y: drag.origin.y + dy,
            ..drag.origin
        };
        let layer = ctx.state.project_mut().layer_mut(drag.layer)?;
        layer.transform = moved;
        Some(moved)
    }
}

impl Tool for MoveTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Move
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(layer) = ctx.state.active_layer() else {
            debug!("Move: no active layer");
            return;
        };
        if layer.locked {
            debug!(id = %layer.id, "Move: layer is locked");
            return;
        }
        self.drag = Some(MoveDrag {
            layer: layer.id,
            start: event.point(),
            origin: layer.transform,
            marked: false,
        });
    }

    fn on_pointer_move(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if let Some(drag) = self.drag.as_mut() {
            Self::apply(drag, event, ctx);
        }
    }

    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(mut drag) = self.drag.take() else {
            return;
        };
        let Some(moved) = Self::apply(&mut drag, event, ctx) else {
            return;
        };
        let dims = ctx.state.canvas_dims();
        let snapped = snap_to_grid(moved, dims, &ctx.state.grid);
        if let Some(layer) = ctx.state.project_mut().layer_mut(drag.layer) {
            layer.transform = snapped;
        }
        debug!(x = snapped.x, y = snapped.y, "Layer moved");
    }
}

/// Drag out the output crop frame; a click clears it.
#[derive(Debug, Default)]
pub struct CropTool {
    start: Option<Point>,
}

impl Tool for CropTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Crop
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.start = Some(event.point());
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(start) = self.start.take() else {
            return;
        };
        let dims = ctx.state.canvas_dims();
        let clamp_x = |v: f32| v.round().clamp(0.0, dims.width as f32) as u32;
        let clamp_y = |v: f32| v.round().clamp(0.0, dims.height as f32) as u32;
        let (x0, x1) = (clamp_x(start.x.min(event.x)), clamp_x(start.x.max(event.x)));
        let (y0, y1) = (clamp_y(start.y.min(event.y)), clamp_y(start.y.max(event.y)));

        ctx.state.viewport.crop = if x1 > x0 && y1 > y0 {
            Some(CropFrame {
                x: x0,
                y: y0,
                width: x1 - x0,
                height: y1 - y0,
            })
        } else {
            None
        };
        debug!(crop = ?ctx.state.viewport.crop, "Crop frame set");
    }
}

/// Grab-to-pan. Pointer positions are in canvas space, so while the canvas
/// follows the pointer the grabbed point stays under it; the pan is the
/// offset from that point.
#[derive(Debug, Default)]
pub struct HandTool {
    grab: Option<Point>,
}

impl Tool for HandTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Hand
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.grab = Some(event.point());
    }

    fn on_pointer_move(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(grab) = self.grab else { return };
        let viewport = &mut ctx.state.viewport;
        let zoom = viewport.zoom;
        viewport.pan_by((event.x - grab.x) * zoom, (event.y - grab.y) * zoom);
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.grab = None;
    }
}

/// Click to zoom in around the pointer; alt-click zooms out.
#[derive(Debug, Default)]
pub struct ZoomTool;

impl Tool for ZoomTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Zoom
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let factor = if event.modifiers.alt { 0.5 } else { 2.0 };
        ctx.state.viewport.zoom_at(factor, event.point());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridConfig;
    use crate::layer::{Layer, LayerKind, TextLayer};
    use crate::project::Project;
    use crate::state::StudioState;

    fn state_with_text() -> (StudioState, LayerId) {
        let mut project = Project::new(400, 300, 300.0).expect("project");
        let id = project.insert_layer(
            Layer::new("title", LayerKind::Text(TextLayer::default()))
                .with_transform(Transform::at(10.0, 10.0)),
        );
        (StudioState::new(project), id)
    }

    fn gesture(tool: &mut dyn Tool, s: &mut StudioState, points: &[PointerEvent]) {
        let mut ctx = ToolContext {
            state: s,
            surface: None,
        };
        let (first, rest) = points.split_first().expect("points");
        tool.on_pointer_down(first, &mut ctx);
        for e in rest {
            tool.on_pointer_move(e, &mut ctx);
        }
        tool.on_pointer_up(points.last().expect("last"), &mut ctx);
    }

    fn position(s: &StudioState, id: LayerId) -> (f32, f32) {
        let t = s.project().layer(id).expect("layer").transform;
        (t.x, t.y)
    }

    #[test]
    fn test_move_drags_any_layer_kind() {
        let (mut s, id) = state_with_text();
        gesture(
            &mut MoveTool::default(),
            &mut s,
            &[
                PointerEvent::at(50.0, 50.0),
                PointerEvent::at(60.0, 55.0),
                PointerEvent::at(80.0, 70.0),
            ],
        );
        assert_eq!(position(&s, id), (40.0, 30.0));
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history().undo_label(), Some("Move Layer"));
        assert!(s.undo());
        assert_eq!(position(&s, id), (10.0, 10.0));
    }

    #[test]
    fn test_move_click_records_nothing() {
        let (mut s, id) = state_with_text();
        gesture(&mut MoveTool::default(), &mut s, &[PointerEvent::at(50.0, 50.0)]);
        assert!(!s.can_undo());
        assert_eq!(position(&s, id), (10.0, 10.0));
    }

    #[test]
    fn test_move_snaps_on_release() {
        let (mut s, id) = state_with_text();
        s.grid = GridConfig {
            enabled: true,
            snap_enabled: true,
            ..GridConfig::default()
        };
        // 10 + 97 = 107, 10 + 83 = 93
        gesture(
            &mut MoveTool::default(),
            &mut s,
            &[PointerEvent::at(0.0, 0.0), PointerEvent::at(97.0, 83.0)],
        );
        assert_eq!(position(&s, id), (100.0, 100.0));
    }

    #[test]
    fn test_move_respects_lock() {
        let (mut s, id) = state_with_text();
        s.project_mut().layer_mut(id).expect("layer").locked = true;
        gesture(
            &mut MoveTool::default(),
            &mut s,
            &[PointerEvent::at(0.0, 0.0), PointerEvent::at(30.0, 30.0)],
        );
        assert_eq!(position(&s, id), (10.0, 10.0));
        assert!(!s.can_undo());
    }

    #[test]
    fn test_crop_clamps_and_clears() {
        let (mut s, _) = state_with_text();
        let mut crop = CropTool::default();
        gesture(
            &mut crop,
            &mut s,
            &[PointerEvent::at(350.0, 250.0), PointerEvent::at(500.0, -20.0)],
        );
        assert_eq!(
            s.viewport.crop,
            Some(CropFrame {
                x: 350,
                y: 0,
                width: 50,
                height: 250
            })
        );
        gesture(&mut crop, &mut s, &[PointerEvent::at(10.0, 10.0)]);
        assert_eq!(s.viewport.crop, None);
        assert!(!s.can_undo());
    }

    #[test]
    fn test_hand_and_zoom_only_touch_viewport() {
        let (mut s, id) = state_with_text();
        s.viewport.set_zoom(2.0);
        gesture(
            &mut HandTool::default(),
            &mut s,
            &[PointerEvent::at(10.0, 10.0), PointerEvent::at(15.0, 7.0)],
        );
        assert_eq!((s.viewport.pan_x, s.viewport.pan_y), (10.0, -6.0));

        gesture(&mut ZoomTool, &mut s, &[PointerEvent::at(0.0, 0.0)]);
        assert_eq!(s.viewport.zoom, 4.0);
        gesture(&mut ZoomTool, &mut s, &[PointerEvent::at(0.0, 0.0).with_alt()]);
        assert_eq!(s.viewport.zoom, 2.0);

        assert_eq!(position(&s, id), (10.0, 10.0));
        assert!(!s.can_undo());
    }
}
