//! The project document: canvas geometry, layer stack and print settings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layer::{BlendMode, Layer, LayerId, LayerKind, LayerMask, RasterLayer, Transform};
use crate::pixels::PixelBuffer;
use crate::print::{PrintPreset, PrintSettings};
use crate::{StudioError, StudioResult};

/// A partial update for [`Project::update_layer`]. `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPatch {
    /// New name.
    pub name: Option<String>,
    /// New transform.
    pub transform: Option<Transform>,
    /// New opacity (clamped to `0.0..=1.0`).
    pub opacity: Option<f32>,
    /// New blend mode.
    pub blend_mode: Option<BlendMode>,
    /// New visibility.
    pub visible: Option<bool>,
    /// New lock state.
    pub locked: Option<bool>,
}

impl LayerPatch {
    fn apply(self, layer: &mut Layer) {
        if let Some(name) = self.name {
            layer.name = name;
        }
        if let Some(transform) = self.transform {
            layer.transform = transform;
        }
        if let Some(opacity) = self.opacity {
            layer.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(blend_mode) = self.blend_mode {
            layer.blend_mode = blend_mode;
        }
        if let Some(visible) = self.visible {
            layer.visible = visible;
        }
        if let Some(locked) = self.locked {
            layer.locked = locked;
        }
    }
}

/// A design document.
///
/// Layers are ordered top to bottom: index 0 is drawn last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Canvas resolution.
    pub dpi: f64,
    layers: Vec<Layer>,
    /// Print configuration.
    #[serde(default)]
    pub print: PrintSettings,
}

impl Project {
    /// Create an empty project.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or the DPI is not positive.
    pub fn new(width: u32, height: u32, dpi: f64) -> StudioResult<Self> {
        let project = Self {
            width,
            height,
            dpi,
            layers: Vec::new(),
            print: PrintSettings::default(),
        };
        project.validate()?;
        Ok(project)
    }

    /// Create an empty project sized and configured from a print preset.
    ///
    /// # Errors
    ///
    /// Returns an error if the preset describes an invalid canvas.
    pub fn from_preset(preset: &PrintPreset) -> StudioResult<Self> {
        let (width, height) = preset.pixel_size();
        let mut project = Self::new(width, height, preset.dpi)?;
        project.print = PrintSettings::from_preset(preset);
        Ok(project)
    }

    fn validate(&self) -> StudioResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StudioError::InvalidOperation(format!(
                "canvas size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.dpi > 0.0 && self.dpi.is_finite()) {
            return Err(StudioError::InvalidOperation(format!(
                "dpi must be positive, got {}",
                self.dpi
            )));
        }
        Ok(())
    }

    /// Layers, topmost first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Whether the project has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Stack index of a layer.
    #[must_use]
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// Get a layer by id.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Get a mutable layer by id.
    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Insert a prepared layer as the new top layer.
    pub fn insert_layer(&mut self, layer: Layer) -> LayerId {
        let id = layer.id;
        debug!(%id, kind = layer.kind.variant_name(), "Layer added");
        self.layers.insert(0, layer);
        id
    }

    /// Add a layer as the new top layer.
    pub fn add_layer(&mut self, kind: LayerKind, name: impl Into<String>) -> LayerId {
        self.insert_layer(Layer::new(name, kind))
    }

    /// Add a transparent, canvas-sized raster layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the pixel buffer cannot be allocated.
    pub fn add_raster_layer(&mut self, name: impl Into<String>) -> StudioResult<LayerId> {
        let pixels = PixelBuffer::new(self.width, self.height)?;
        Ok(self.add_layer(LayerKind::Raster(RasterLayer::from_pixels(pixels)), name))
    }

    /// Remove a layer. Returns the removed layer, `None` if it was missing.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let Some(index) = self.index_of(id) else {
            debug!(%id, "remove_layer: no such layer");
            return None;
        };
        Some(self.layers.remove(index))
    }

    /// Move a layer to `new_index` (clamped to the stack).
    pub fn reorder_layer(&mut self, id: LayerId, new_index: usize) -> bool {
        let Some(index) = self.index_of(id) else {
            debug!(%id, "reorder_layer: no such layer");
            return false;
        };
        let layer = self.layers.remove(index);
        let target = new_index.min(self.layers.len());
        self.layers.insert(target, layer);
        true
    }

    /// Apply a partial update.
    pub fn update_layer(&mut self, id: LayerId, patch: LayerPatch) -> bool {
        let Some(layer) = self.layer_mut(id) else {
            debug!(%id, "update_layer: no such layer");
            return false;
        };
        patch.apply(layer);
        true
    }

    /// A layer's mask, if it has one.
    #[must_use]
    pub fn mask(&self, id: LayerId) -> Option<&LayerMask> {
        self.layer(id).and_then(|l| l.mask.as_ref())
    }

    /// Enable or disable a layer's mask, allocating a fully revealing mask
    /// the first time one is enabled.
    pub fn set_mask_enabled(&mut self, id: LayerId, enabled: bool) -> bool {
        let (width, height) = (self.width, self.height);
        let Some(layer) = self.layer_mut(id) else {
            debug!(%id, "set_mask_enabled: no such layer");
            return false;
        };
        match &mut layer.mask {
            Some(mask) => mask.enabled = enabled,
            None if enabled => layer.mask = Some(LayerMask::revealing(width, height)),
            None => {}
        }
        true
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> StudioResult<String> {
        serde_json::to_string(self).map_err(StudioError::Serialization)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or describes an invalid
    /// canvas.
    pub fn from_json(json: &str) -> StudioResult<Self> {
        let project: Self = serde_json::from_str(json).map_err(StudioError::Serialization)?;
        project.validate()?;
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{TextLayer, Transform};
    use crate::Color;

    fn project() -> Project {
        Project::new(200, 100, 300.0).expect("project")
    }

    fn text(p: &mut Project, name: &str) -> LayerId {
        p.add_layer(LayerKind::Text(TextLayer::default()), name)
    }

    #[test]
    fn test_new_layers_go_on_top() {
        let mut p = project();
        let a = text(&mut p, "a");
        let b = text(&mut p, "b");
        assert_eq!(p.index_of(b), Some(0));
        assert_eq!(p.index_of(a), Some(1));
    }

    #[test]
    fn test_reorder_clamps() {
        let mut p = project();
        let a = text(&mut p, "a");
        let _b = text(&mut p, "b");
        let c = text(&mut p, "c");
        assert!(p.reorder_layer(c, 99));
        assert_eq!(p.index_of(c), Some(2));
        assert!(p.reorder_layer(a, 0));
        assert_eq!(p.layers()[0].id, a);
    }

    #[test]
    fn test_missing_ids_are_noops() {
        let mut p = project();
        text(&mut p, "a");
        let before = p.clone();
        let ghost = LayerId::new();
        assert!(p.remove_layer(ghost).is_none());
        assert!(!p.reorder_layer(ghost, 0));
        assert!(!p.update_layer(ghost, LayerPatch::default()));
        assert!(!p.set_mask_enabled(ghost, true));
        assert_eq!(p, before);
    }

    #[test]
    fn test_update_patch() {
        let mut p = project();
        let id = text(&mut p, "a");
        let patch = LayerPatch {
            opacity: Some(-2.0),
            transform: Some(Transform::at(5.0, 6.0)),
            locked: Some(true),
            ..LayerPatch::default()
        };
        assert!(p.update_layer(id, patch));
        let layer = p.layer(id).expect("layer");
        assert_eq!(layer.opacity, 0.0);
        assert_eq!(layer.transform.x, 5.0);
        assert!(layer.locked);
        assert_eq!(layer.name, "a");
    }

    #[test]
    fn test_mask_allocated_on_first_enable() {
        let mut p = project();
        let id = text(&mut p, "a");
        assert!(p.mask(id).is_none());
        assert!(p.set_mask_enabled(id, false));
        assert!(p.mask(id).is_none());
        assert!(p.set_mask_enabled(id, true));
        let mask = p.mask(id).expect("mask");
        assert_eq!((mask.alpha.width(), mask.alpha.height()), (200, 100));
        assert_eq!(mask.alpha.get(0, 0), Some(255));
        assert!(p.set_mask_enabled(id, false));
        assert!(!p.mask(id).expect("mask").enabled);
    }

    #[test]
    fn test_json_round_trip_with_pixels() {
        let mut p = project();
        let id = p.add_raster_layer("paint").expect("raster");
        if let Some(pixels) = p
            .layer_mut(id)
            .and_then(Layer::as_raster_mut)
            .and_then(RasterLayer::pixels_mut)
        {
            pixels.pixmap_mut().fill(Color::rgb(10, 20, 30).to_skia());
        }
        text(&mut p, "title");

        let json = p.to_json().expect("to_json");
        let back = Project::from_json(&json).expect("from_json");
        assert_eq!(back, p);
    }

    #[test]
    fn test_invalid_canvas_rejected() {
        assert!(Project::new(0, 10, 300.0).is_err());
        assert!(Project::new(10, 10, 0.0).is_err());
        assert!(Project::from_json("{\"width\":0,\"height\":1,\"dpi\":72,\"layers\":[]}").is_err());
        assert!(Project::from_json("not json").is_err());
    }
}
