//! Selection tools.
//!
//! Marquee and lasso commit a polygon on release; quick select commits a
//! dab per pointer sample; the wand hands the work to the region-grow
//! worker. Shift adds to the selection and alt subtracts from it.

use tracing::debug;

use super::{spaced_points, Tool, ToolContext, ToolKind};
use crate::event::PointerEvent;
use crate::selection::{Point, Polygon, Selection, SelectionMode};
use crate::state::StudioState;

/// Drags smaller than this on either axis count as a click.
const CLICK_SLOP: f32 = 1.0;

/// Segments of a quick-select dab.
const DAB_SEGMENTS: usize = 16;

/// A click without a drag: in replace mode it drops the selection.
fn click_without_drag(state: &mut StudioState, mode: SelectionMode) {
    if mode == SelectionMode::Replace && !state.selection().is_empty() {
        state.mark("Deselect");
        state.set_selection(Selection::new());
    }
}

fn commit(state: &mut StudioState, label: &str, mode: SelectionMode, polygon: Polygon) {
    state.mark(label);
    let next = state.selection().apply(mode, vec![polygon]);
    state.set_selection(next);
}

/// Rectangular marquee.
#[derive(Debug, Default)]
pub struct MarqueeTool {
    start: Option<Point>,
    mode: SelectionMode,
}

impl Tool for MarqueeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Marquee
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.start = Some(event.point());
        self.mode = SelectionMode::from_modifiers(event.modifiers.shift, event.modifiers.alt);
    }

    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(start) = self.start.take() else {
            return;
        };
        let end = event.point();
        let (w, h) = ((end.x - start.x).abs(), (end.y - start.y).abs());
        if w < CLICK_SLOP || h < CLICK_SLOP {
            click_without_drag(ctx.state, self.mode);
            return;
        }
        let rect = Polygon::rect(start.x.min(end.x), start.y.min(end.y), w, h);
        commit(ctx.state, "Marquee Selection", self.mode, rect);
    }
}

/// Freehand lasso.
#[derive(Debug, Default)]
pub struct LassoTool {
    points: Vec<Point>,
    mode: SelectionMode,
    active: bool,
}

impl LassoTool {
    fn push(&mut self, p: Point) {
        if self.points.last().map_or(true, |last| last.distance(p) >= 1.0) {
            self.points.push(p);
        }
    }
}

impl Tool for LassoTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Lasso
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        self.points.clear();
        self.points.push(event.point());
        self.mode = SelectionMode::from_modifiers(event.modifiers.shift, event.modifiers.alt);
        self.active = true;
    }

    fn on_pointer_move(&mut self, event: &PointerEvent, _ctx: &mut ToolContext<'_>) {
        if self.active {
            self.push(event.point());
        }
    }

    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        self.push(event.point());
        let polygon = Polygon::new(std::mem::take(&mut self.points));
        if polygon.points().len() < 3 || polygon.area() < f64::from(CLICK_SLOP) {
            click_without_drag(ctx.state, self.mode);
            return;
        }
        commit(ctx.state, "Lasso Selection", self.mode, polygon);
    }
}

/// Magic wand: selects the contiguous region of similar colour under the
/// click on the active layer.
#[derive(Debug, Default)]
pub struct WandTool;

impl Tool for WandTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Wand
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let mode = SelectionMode::from_modifiers(event.modifiers.shift, event.modifiers.alt);
        if !ctx.state.request_region_grow(event.point(), mode) {
            debug!(x = event.x, y = event.y, "Magic wand request not submitted");
        }
    }
}

/// Paints the selection with circular dabs.
#[derive(Debug, Default)]
pub struct QuickSelectTool {
    last: Option<Point>,
    /// Mode for dabs after the first.
    follow: SelectionMode,
}

impl QuickSelectTool {
    fn dab(state: &mut StudioState, at: Point, mode: SelectionMode) {
        let radius = state.paint.quick_select_radius.max(1.0);
        let dab = Polygon::circle(at.x, at.y, radius, DAB_SEGMENTS);
        let next = state.selection().apply(mode, vec![dab]);
        state.set_selection(next);
    }
}

impl Tool for QuickSelectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::QuickSelect
    }

    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let first = SelectionMode::from_modifiers(event.modifiers.shift, event.modifiers.alt);
        self.follow = if event.modifiers.alt {
            SelectionMode::Subtract
        } else {
            SelectionMode::Add
        };
        ctx.state.mark("Quick Select");
        Self::dab(ctx.state, event.point(), first);
        self.last = Some(event.point());
    }

    fn on_pointer_move(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        let Some(last) = self.last else { return };
        let spacing = ctx.state.paint.quick_select_radius / 2.0;
        for at in spaced_points(last, event.point(), spacing) {
            Self::dab(ctx.state, at, self.follow);
        }
        self.last = Some(event.point());
    }

    fn on_pointer_up(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>) {
        self.on_pointer_move(event, ctx);
        self.last = None;
    }
}
