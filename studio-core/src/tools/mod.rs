//! Pointer-driven tools.
//!
//! Exactly one tool is active at a time (see [`crate::Editor`]). Every
//! tool implements the same three-handler [`Tool`] contract and is created
//! from its [`ToolKind`]. Tools never fail: when their guard conditions are
//! not met (no active layer, locked layer, wrong layer variant, no
//! composited surface) the handlers do nothing.

mod create;
mod paint;
mod retouch;
mod select;
mod view;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::event::PointerEvent;
use crate::selection::Point;
use crate::state::{PaintClip, StudioState};
use crate::{StudioError, StudioResult};

pub use create::{PenTool, ShapeTool, TextTool};
pub use paint::{BrushTool, BucketTool, EyedropperTool, GradientTool, MaskBrushTool};
pub use retouch::{CloneTool, PatchTool, SpotHealingTool};
pub use select::{LassoTool, MarqueeTool, QuickSelectTool, WandTool};
pub use view::{CropTool, HandTool, MoveTool, ZoomTool};

/// Identifier of every tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    /// Move the active layer.
    #[default]
    Move,
    /// Paint with the primary colour.
    Brush,
    /// Erase to transparency.
    Eraser,
    /// Paint the layer mask.
    MaskBrush,
    /// Sample the composited colour.
    Eyedropper,
    /// Create text layers.
    Text,
    /// Rectangular selection.
    Marquee,
    /// Freehand selection.
    Lasso,
    /// Magic wand selection.
    Wand,
    /// Brush-style selection.
    QuickSelect,
    /// Flood fill.
    Bucket,
    /// Linear gradient.
    Gradient,
    /// Clone stamp.
    Clone,
    /// Spot healing brush.
    SpotHealing,
    /// Patch selection from elsewhere.
    Patch,
    /// Create shape layers.
    Shape,
    /// Create polygon paths.
    Pen,
    /// Set the output crop frame.
    Crop,
    /// Pan the viewport.
    Hand,
    /// Zoom the viewport.
    Zoom,
}

impl ToolKind {
    /// Every tool, in palette order.
    pub const ALL: [Self; 20] = [
        Self::Move,
        Self::Brush,
        Self::Eraser,
        Self::MaskBrush,
        Self::Eyedropper,
        Self::Text,
        Self::Marquee,
        Self::Lasso,
        Self::Wand,
        Self::QuickSelect,
        Self::Bucket,
        Self::Gradient,
        Self::Clone,
        Self::SpotHealing,
        Self::Patch,
        Self::Shape,
        Self::Pen,
        Self::Crop,
        Self::Hand,
        Self::Zoom,
    ];

    /// Host-facing identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Brush => "brush",
            Self::Eraser => "eraser",
            Self::MaskBrush => "maskBrush",
            Self::Eyedropper => "eyedropper",
            Self::Text => "text",
            Self::Marquee => "marquee",
            Self::Lasso => "lasso",
            Self::Wand => "wand",
            Self::QuickSelect => "quickSelect",
            Self::Bucket => "bucket",
            Self::Gradient => "gradient",
            Self::Clone => "clone",
            Self::SpotHealing => "spotHealing",
            Self::Patch => "patch",
            Self::Shape => "shape",
            Self::Pen => "pen",
            Self::Crop => "crop",
            Self::Hand => "hand",
            Self::Zoom => "zoom",
        }
    }

    /// Create a fresh instance of this tool.
    #[must_use]
    pub fn create(self) -> Box<dyn Tool> {
        match self {
            Self::Move => Box::<MoveTool>::default(),
            Self::Brush => Box::new(BrushTool::brush()),
            Self::Eraser => Box::new(BrushTool::eraser()),
            Self::MaskBrush => Box::<MaskBrushTool>::default(),
            Self::Eyedropper => Box::<EyedropperTool>::default(),
            Self::Text => Box::<TextTool>::default(),
            Self::Marquee => Box::<MarqueeTool>::default(),
            Self::Lasso => Box::<LassoTool>::default(),
            Self::Wand => Box::<WandTool>::default(),
            Self::QuickSelect => Box::<QuickSelectTool>::default(),
            Self::Bucket => Box::<BucketTool>::default(),
            Self::Gradient => Box::<GradientTool>::default(),
            Self::Clone => Box::<CloneTool>::default(),
            Self::SpotHealing => Box::<SpotHealingTool>::default(),
            Self::Patch => Box::<PatchTool>::default(),
            Self::Shape => Box::<ShapeTool>::default(),
            Self::Pen => Box::<PenTool>::default(),
            Self::Crop => Box::<CropTool>::default(),
            Self::Hand => Box::<HandTool>::default(),
            Self::Zoom => Box::<ZoomTool>::default(),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = StudioError;

    fn from_str(s: &str) -> StudioResult<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| StudioError::UnknownTool(s.to_string()))
    }
}

/// What a tool handler can see and change.
pub struct ToolContext<'a> {
    /// Session state (write access).
    pub state: &'a mut StudioState,
    /// The last composited surface, if the host has one.
    pub surface: Option<&'a Pixmap>,
}

/// The uniform pointer contract.
pub trait Tool: Send {
    /// Which tool this is.
    fn kind(&self) -> ToolKind;

    /// Pointer pressed.
    fn on_pointer_down(&mut self, event: &PointerEvent, ctx: &mut ToolContext<'_>);

    /// Pointer moved (pressed or not).
    fn on_pointer_move(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) {}

    /// Pointer released.
    fn on_pointer_up(&mut self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) {}
}

/// Effective brush diameter for an event.
pub(crate) fn brush_diameter(size: f32, event: &PointerEvent) -> f32 {
    let pressure = event.pressure.unwrap_or(1.0).clamp(0.1, 1.0);
    (size * pressure).max(1.0)
}

/// Round-capped stroke of the given width.
pub(crate) fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

/// A filled circle at a canvas point, clipped by the selection.
pub(crate) fn paint_dab(pixmap: &mut Pixmap, clip: &PaintClip, at: Point, diameter: f32, paint: &Paint<'_>) {
    let local = clip.local(at);
    if let Some(path) = PathBuilder::from_circle(local.x, local.y, diameter / 2.0) {
        pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), clip.mask.as_ref());
    }
}

/// A round-capped segment between canvas points, clipped by the selection.
pub(crate) fn paint_segment(
    pixmap: &mut Pixmap,
    clip: &PaintClip,
    from: Point,
    to: Point,
    diameter: f32,
    paint: &Paint<'_>,
) {
    if from == to {
        paint_dab(pixmap, clip, to, diameter, paint);
        return;
    }
    let (a, b) = (clip.local(from), clip.local(to));
    let mut pb = PathBuilder::new();
    pb.move_to(a.x, a.y);
    pb.line_to(b.x, b.y);
    if let Some(path) = pb.finish() {
        pixmap.stroke_path(
            &path,
            paint,
            &round_stroke(diameter),
            Transform::identity(),
            clip.mask.as_ref(),
        );
    }
}

/// Points every `spacing` pixels from `from` (exclusive) to `to`
/// (inclusive).
pub(crate) fn spaced_points(from: Point, to: Point, spacing: f32) -> Vec<Point> {
    let distance = from.distance(to);
    if distance <= f32::EPSILON {
        return Vec::new();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let steps = (distance / spacing.max(1.0)).ceil().max(1.0) as usize;
    (1..=steps)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / steps as f32;
            Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
        })
        .collect()
}
