//! The single-writer session container passed to every tool.
//!
//! `StudioState` owns the project, the selection, the active layer, the
//! undo history and the session-only settings (grid, paint, viewport). Only
//! the interactive thread mutates it; the region-grow worker receives
//! copies of pixel data and reports back through a ticket that is applied
//! here by [`StudioState::poll_background`] or
//! [`StudioState::wait_background`].

use serde::{Deserialize, Serialize};
use tiny_skia::{Mask, Pixmap};
use tracing::{debug, info, warn};

use crate::grid::{CanvasDims, GridCache, GridConfig, GridPoint};
use crate::history::{History, DEFAULT_HISTORY_DEPTH};
use crate::layer::{Layer, LayerId, LayerKind, TextLayer};
use crate::project::Project;
use crate::selection::{Point, Selection, SelectionMode};
use crate::worker::{GrowTicket, RegionGrowRequest, RegionGrowResponse, RegionGrowWorker};
use crate::{Color, StudioResult};

/// Minimum viewport zoom.
pub const MIN_ZOOM: f32 = 0.05;
/// Maximum viewport zoom.
pub const MAX_ZOOM: f32 = 32.0;

/// Geometry created by the shape tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Rectangle.
    #[default]
    Rectangle,
    /// Ellipse.
    Ellipse,
    /// Straight line.
    Line,
}

/// Colours and tool options shared by the tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintSettings {
    /// Foreground colour.
    pub primary: Color,
    /// Background colour (gradient end, eyedropper alt target).
    pub secondary: Color,
    /// Brush diameter in pixels.
    pub brush_size: f32,
    /// Wand and bucket tolerance.
    pub tolerance: u8,
    /// Quick-select dab radius in pixels.
    pub quick_select_radius: f32,
    /// Shape tool geometry.
    pub shape: ShapeKind,
    /// Template for new text layers.
    pub text: TextLayer,
    /// Opacity of patch composites.
    pub patch_opacity: f32,
}

impl Default for PaintSettings {
    fn default() -> Self {
        Self {
            primary: Color::BLACK,
            secondary: Color::WHITE,
            brush_size: 12.0,
            tolerance: 32,
            quick_select_radius: 15.0,
            shape: ShapeKind::Rectangle,
            text: TextLayer::default(),
            patch_opacity: 0.85,
        }
    }
}

/// Output crop frame in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropFrame {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

/// View framing. Never part of history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Zoom factor.
    pub zoom: f32,
    /// Screen-space pan X.
    pub pan_x: f32,
    /// Screen-space pan Y.
    pub pan_y: f32,
    /// Crop applied to content exports.
    pub crop: Option<CropFrame>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            crop: None,
        }
    }
}

impl Viewport {
    /// Set the zoom, clamped to the supported range.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Multiply the zoom, keeping the canvas point under `anchor` fixed on
    /// screen.
    pub fn zoom_at(&mut self, factor: f32, anchor: Point) {
        let screen_x = anchor.x * self.zoom + self.pan_x;
        let screen_y = anchor.y * self.zoom + self.pan_y;
        self.set_zoom(self.zoom * factor);
        self.pan_x = screen_x - anchor.x * self.zoom;
        self.pan_y = screen_y - anchor.y * self.zoom;
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }
}

/// Everything one undo step restores.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Project state.
    pub project: Project,
    /// Selection state.
    pub selection: Selection,
    /// Active layer.
    pub active_layer: Option<LayerId>,
}

/// Selection clip for a paint operation, in layer-local space.
pub(crate) struct PaintClip {
    /// Layer offset: canvas = local + offset.
    pub offset: (f32, f32),
    /// Selection mask, `None` when nothing is selected.
    pub mask: Option<Mask>,
}

impl PaintClip {
    pub(crate) fn local(&self, p: Point) -> Point {
        Point::new(p.x - self.offset.0, p.y - self.offset.1)
    }
}

#[derive(Debug, Clone, Copy)]
struct GrowTarget {
    id: u64,
    mode: SelectionMode,
    offset: (f32, f32),
}

#[derive(Debug)]
struct PendingGrow {
    ticket: GrowTicket,
    target: GrowTarget,
}

/// Session state shared by all tools.
#[derive(Debug)]
pub struct StudioState {
    project: Project,
    selection: Selection,
    active_layer: Option<LayerId>,
    history: History<Snapshot>,
    /// Grid settings.
    pub grid: GridConfig,
    grid_cache: GridCache,
    /// Paint settings.
    pub paint: PaintSettings,
    /// Viewport.
    pub viewport: Viewport,
    worker: Option<RegionGrowWorker>,
    pending_grow: Option<PendingGrow>,
}

impl StudioState {
    /// Start a session on `project`. The top layer becomes active.
    #[must_use]
    pub fn new(project: Project) -> Self {
        let active_layer = project.layers().first().map(|l| l.id);
        Self {
            project,
            selection: Selection::new(),
            active_layer,
            history: History::new(DEFAULT_HISTORY_DEPTH),
            grid: GridConfig::default(),
            grid_cache: GridCache::new(),
            paint: PaintSettings::default(),
            viewport: Viewport::default(),
            worker: None,
            pending_grow: None,
        }
    }

    /// Replace the project wholesale, resetting selection and history.
    pub fn load_project(&mut self, project: Project) {
        info!(
            width = project.width,
            height = project.height,
            layers = project.layer_count(),
            "Project loaded"
        );
        self.active_layer = project.layers().first().map(|l| l.id);
        self.project = project;
        self.selection = Selection::new();
        self.history.clear();
        self.pending_grow = None;
        self.viewport.crop = None;
    }

    /// The project.
    #[must_use]
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Mutable project access for host-driven layer edits.
    ///
    /// Callers are expected to [`mark`](Self::mark) first.
    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    /// Canvas size and DPI.
    #[must_use]
    pub fn canvas_dims(&self) -> CanvasDims {
        CanvasDims {
            width: self.project.width,
            height: self.project.height,
            dpi: self.project.dpi,
        }
    }

    /// The current selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    /// Active layer id.
    #[must_use]
    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.active_layer
    }

    /// Active layer.
    #[must_use]
    pub fn active_layer(&self) -> Option<&Layer> {
        self.active_layer.and_then(|id| self.project.layer(id))
    }

    /// Mutable active layer.
    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        let id = self.active_layer?;
        self.project.layer_mut(id)
    }

    /// Activate a layer. Returns `false` if it does not exist.
    pub fn set_active_layer(&mut self, id: LayerId) -> bool {
        if self.project.layer(id).is_none() {
            debug!(%id, "set_active_layer: no such layer");
            return false;
        }
        self.active_layer = Some(id);
        true
    }

    /// Add a layer on top with an "Add Layer" checkpoint and activate it.
    pub fn add_layer(&mut self, kind: LayerKind, name: impl Into<String>) -> LayerId {
        self.insert_layer("Add Layer", Layer::new(name, kind))
    }

    /// Insert a prepared layer on top under a checkpoint and activate it.
    pub fn insert_layer(&mut self, label: &str, layer: Layer) -> LayerId {
        self.mark(label);
        let id = self.project.insert_layer(layer);
        self.active_layer = Some(id);
        id
    }

    /// Add a transparent raster layer with a checkpoint and activate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel buffer cannot be allocated.
    pub fn add_raster_layer(&mut self, name: impl Into<String>) -> StudioResult<LayerId> {
        let snapshot = self.snapshot();
        let id = self.project.add_raster_layer(name)?;
        self.history.mark("Add Layer", snapshot);
        self.active_layer = Some(id);
        Ok(id)
    }

    /// Delete a layer with a checkpoint. The next layer down (or the new
    /// top) becomes active if the active layer was removed.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(index) = self.project.index_of(id) else {
            debug!(%id, "remove_layer: no such layer");
            return false;
        };
        self.mark("Delete Layer");
        self.project.remove_layer(id);
        if self.active_layer == Some(id) {
            let layers = self.project.layers();
            self.active_layer = layers
                .get(index)
                .or_else(|| layers.last())
                .map(|l| l.id);
        }
        true
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            project: self.project.clone(),
            selection: self.selection.clone(),
            active_layer: self.active_layer,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.project = snapshot.project;
        self.selection = snapshot.selection;
        self.active_layer = snapshot
            .active_layer
            .filter(|id| self.project.layer(*id).is_some());
    }

    /// Record a checkpoint before a gesture mutates state.
    pub fn mark(&mut self, label: &str) {
        let snapshot = self.snapshot();
        self.history.mark(label, snapshot);
    }

    /// Undo one step. Returns `false` at the boundary.
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    /// Redo one step. Returns `false` at the boundary.
    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    /// Whether undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The history, for labels.
    #[must_use]
    pub fn history(&self) -> &History<Snapshot> {
        &self.history
    }

    /// Grid points for the current canvas, memoized.
    pub fn grid_points(&mut self) -> std::sync::Arc<Vec<GridPoint>> {
        let (w, h, dpi) = (self.project.width, self.project.height, self.project.dpi);
        self.grid_cache.points(w, h, dpi, &self.grid)
    }

    /// The active layer if tools may paint on it: unlocked raster.
    pub(crate) fn paintable_layer_id(&self) -> Option<LayerId> {
        let Some(layer) = self.active_layer() else {
            debug!("No active layer");
            return None;
        };
        if layer.locked {
            debug!(id = %layer.id, "Active layer is locked");
            return None;
        }
        if layer.as_raster().is_none() {
            debug!(id = %layer.id, kind = layer.kind.variant_name(), "Active layer is not raster");
            return None;
        }
        Some(layer.id)
    }

    /// Run `f` on the active layer's pixels with the selection clip in
    /// layer-local space. `None` if the active layer is not paintable.
    pub(crate) fn edit_active_pixels<R>(
        &mut self,
        f: impl FnOnce(&mut Pixmap, &PaintClip) -> R,
    ) -> Option<R> {
        let id = self.paintable_layer_id()?;
        let selection = self.selection.clone();
        let layer = self.project.layer_mut(id)?;
        #[allow(clippy::cast_precision_loss)]
        let offset = {
            let (x, y) = layer.pixel_offset();
            (x as f32, y as f32)
        };
        let pixels = layer.as_raster_mut()?.pixels_mut()?;
        let pixmap = pixels.pixmap_mut();
        let clip = PaintClip {
            offset,
            mask: selection.clip_mask(pixmap.width(), pixmap.height(), offset),
        };
        Some(f(pixmap, &clip))
    }

    /// Queue a magic-wand region grow seeded at a canvas point on the
    /// active layer. Supersedes any request still in flight.
    pub fn request_region_grow(&mut self, at: Point, mode: SelectionMode) -> bool {
        let Some(id) = self.paintable_layer_id() else {
            return false;
        };
        let (ox, oy, width, height, bytes) = {
            let Some(layer) = self.project.layer(id) else {
                return false;
            };
            let (ox, oy) = layer.pixel_offset();
            let Some(pixels) = layer.as_raster().and_then(|r| r.resolve()) else {
                return false;
            };
            (ox, oy, pixels.width(), pixels.height(), pixels.copy_bytes())
        };
        #[allow(clippy::cast_possible_truncation)]
        let seed = (at.x.floor() as i32 - ox, at.y.floor() as i32 - oy);

        if self.worker.is_none() {
            match RegionGrowWorker::spawn() {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => {
                    warn!("Region grow unavailable: {e}");
                    return false;
                }
            }
        }
        let Some(worker) = self.worker.as_mut() else {
            return false;
        };
        let request_id = worker.next_request_id();
        let request =
            RegionGrowRequest::new(request_id, seed, self.paint.tolerance, width, height, bytes);

        match worker.submit(request) {
            Ok(ticket) => {
                if let Some(stale) = self.pending_grow.take() {
                    debug!(
                        stale = stale.ticket.id(),
                        newer = request_id,
                        "Superseding pending region grow"
                    );
                }
                #[allow(clippy::cast_precision_loss)]
                let offset = (ox as f32, oy as f32);
                self.pending_grow = Some(PendingGrow {
                    ticket,
                    target: GrowTarget {
                        id: request_id,
                        mode,
                        offset,
                    },
                });
                true
            }
            Err(e) => {
                warn!("Region grow submit failed: {e}");
                false
            }
        }
    }

    /// Id of the region grow awaiting a result, if any.
    #[must_use]
    pub fn pending_region_grow(&self) -> Option<u64> {
        self.pending_grow.as_ref().map(|p| p.ticket.id())
    }

    /// Apply a finished region grow without blocking. Returns `true` if the
    /// selection changed.
    pub fn poll_background(&mut self) -> bool {
        let Some(pending) = self.pending_grow.as_mut() else {
            return false;
        };
        let target = pending.target;
        match pending.ticket.try_take() {
            Ok(None) => false,
            Ok(Some(response)) => {
                self.pending_grow = None;
                self.apply_region_grow(target, response)
            }
            Err(e) => {
                warn!("Region grow failed: {e}");
                self.pending_grow = None;
                false
            }
        }
    }

    /// Block until the pending region grow finishes and apply it. Returns
    /// `true` if the selection changed.
    pub fn wait_background(&mut self) -> bool {
        let Some(PendingGrow { ticket, target }) = self.pending_grow.take() else {
            return false;
        };
        match ticket.blocking_wait() {
            Ok(response) => self.apply_region_grow(target, response),
            Err(e) => {
                warn!("Region grow failed: {e}");
                false
            }
        }
    }

    fn apply_region_grow(&mut self, target: GrowTarget, response: RegionGrowResponse) -> bool {
        if response.id != target.id {
            debug!(
                got = response.id,
                expected = target.id,
                "Discarding stale region grow response"
            );
            return false;
        }
        if response.polygons.is_empty() {
            debug!(id = response.id, "Region grow found nothing; selection unchanged");
            return false;
        }
        let polygons = response
            .polygons
            .iter()
            .map(|p| p.translated(target.offset.0, target.offset.1))
            .collect();
        self.mark("Magic Wand");
        self.selection = self.selection.apply(target.mode, polygons);
        true
    }
}
