//! Layout grids and drag snapping.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::layer::Transform;
use crate::units::{convert, Unit};

/// Grid cell shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridShape {
    /// Rectangular cells.
    #[default]
    Rect,
    /// Packed circles (cupcake trays, tier guides).
    Circle,
}

/// Working-session grid settings. Not saved with the project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    /// Whether the grid is drawn.
    pub enabled: bool,
    /// Cell shape.
    pub shape: GridShape,
    /// Rect cell width in `unit`.
    pub cell_width: f64,
    /// Rect cell height in `unit`.
    pub cell_height: f64,
    /// Circle radius in `unit`.
    pub radius: f64,
    /// Unit of the dimensions above.
    pub unit: Unit,
    /// Whether cell centres are marked.
    pub show_centers: bool,
    /// Whether drags snap to the grid.
    pub snap_enabled: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            shape: GridShape::Rect,
            cell_width: 50.0,
            cell_height: 50.0,
            radius: 25.0,
            unit: Unit::Pixel,
            show_centers: false,
            snap_enabled: false,
        }
    }
}

/// One grid cell: centre and radii in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Centre X.
    pub cx: f64,
    /// Centre Y.
    pub cy: f64,
    /// Horizontal radius (half cell width for rect grids).
    pub rx: f64,
    /// Vertical radius.
    pub ry: f64,
}

/// Canvas size and resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasDims {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Dots per inch.
    pub dpi: f64,
}

struct CircleLattice {
    radius: f64,
    cols: u32,
    rows: u32,
    origin_x: f64,
    origin_y: f64,
}

impl CircleLattice {
    fn new(width: u32, height: u32, dpi: f64, config: &GridConfig) -> Option<Self> {
        let radius = convert(config.radius, config.unit, Unit::Pixel, dpi);
        if radius <= 0.0 || !radius.is_finite() {
            return None;
        }
        let d = radius * 2.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (cols, rows) = (
            (f64::from(width) / d).floor() as u32,
            (f64::from(height) / d).floor() as u32,
        );
        if cols == 0 || rows == 0 {
            return None;
        }
        Some(Self {
            radius,
            cols,
            rows,
            origin_x: (f64::from(width) - f64::from(cols) * d) / 2.0 + radius,
            origin_y: (f64::from(height) - f64::from(rows) * d) / 2.0 + radius,
        })
    }

    fn centre(&self, col: u32, row: u32) -> (f64, f64) {
        let d = self.radius * 2.0;
        (
            self.origin_x + f64::from(col) * d,
            self.origin_y + f64::from(row) * d,
        )
    }
}

fn rect_cell(config: &GridConfig, dpi: f64) -> Option<(f64, f64)> {
    let cw = convert(config.cell_width, config.unit, Unit::Pixel, dpi);
    let ch = convert(config.cell_height, config.unit, Unit::Pixel, dpi);
    (cw > 0.0 && ch > 0.0 && cw.is_finite() && ch.is_finite()).then_some((cw, ch))
}

/// Every cell of the grid covering the canvas. Empty when the grid is
/// disabled or its dimensions are not positive.
#[must_use]
pub fn compute_grid_points(width: u32, height: u32, dpi: f64, config: &GridConfig) -> Vec<GridPoint> {
    if !config.enabled {
        return Vec::new();
    }
    match config.shape {
        GridShape::Rect => {
            let Some((cw, ch)) = rect_cell(config, dpi) else {
                return Vec::new();
            };
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (cols, rows) = (
                (f64::from(width) / cw).ceil() as u32,
                (f64::from(height) / ch).ceil() as u32,
            );
            (0..rows)
                .flat_map(|row| {
                    (0..cols).map(move |col| GridPoint {
                        cx: (f64::from(col) + 0.5) * cw,
                        cy: (f64::from(row) + 0.5) * ch,
                        rx: cw / 2.0,
                        ry: ch / 2.0,
                    })
                })
                .collect()
        }
        GridShape::Circle => {
            let Some(lattice) = CircleLattice::new(width, height, dpi, config) else {
                return Vec::new();
            };
            (0..lattice.rows)
                .flat_map(|row| (0..lattice.cols).map(move |col| (col, row)))
                .map(|(col, row)| {
                    let (cx, cy) = lattice.centre(col, row);
                    GridPoint {
                        cx,
                        cy,
                        rx: lattice.radius,
                        ry: lattice.radius,
                    }
                })
                .collect()
        }
    }
}

/// Snap a dragged layer position to the grid.
///
/// Rect grids round to the nearest cell corner; circle grids move to the
/// nearest circle centre. Identity when snapping is off.
#[must_use]
pub fn snap_to_grid(transform: Transform, dims: CanvasDims, config: &GridConfig) -> Transform {
    if !config.snap_enabled {
        return transform;
    }
    let (x, y) = (f64::from(transform.x), f64::from(transform.y));
    let snapped = match config.shape {
        GridShape::Rect => {
            rect_cell(config, dims.dpi).map(|(cw, ch)| ((x / cw).round() * cw, (y / ch).round() * ch))
        }
        GridShape::Circle => {
            CircleLattice::new(dims.width, dims.height, dims.dpi, config).map(|lattice| {
                let d = lattice.radius * 2.0;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let nearest = |v: f64, origin: f64, count: u32| {
                    ((v - origin) / d).round().clamp(0.0, f64::from(count - 1)) as u32
                };
                lattice.centre(
                    nearest(x, lattice.origin_x, lattice.cols),
                    nearest(y, lattice.origin_y, lattice.rows),
                )
            })
        }
    };

    match snapped {
        #[allow(clippy::cast_possible_truncation)]
        Some((sx, sy)) => Transform {
            x: sx as f32,
            y: sy as f32,
            ..transform
        },
        None => transform,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    width: u32,
    height: u32,
    dpi: f64,
    config: GridConfig,
}

/// Memoizes [`compute_grid_points`] on its inputs.
#[derive(Debug, Default)]
pub struct GridCache {
    key: Option<CacheKey>,
    points: Arc<Vec<GridPoint>>,
    computations: usize,
}

impl GridCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grid points for these inputs, recomputed only when an input changed.
    pub fn points(&mut self, width: u32, height: u32, dpi: f64, config: &GridConfig) -> Arc<Vec<GridPoint>> {
        let key = CacheKey {
            width,
            height,
            dpi,
            config: *config,
        };
        if self.key.as_ref() != Some(&key) {
            self.points = Arc::new(compute_grid_points(width, height, dpi, config));
            self.key = Some(key);
            self.computations += 1;
        }
        Arc::clone(&self.points)
    }

    /// How many times the points were actually computed.
    #[must_use]
    pub fn computations(&self) -> usize {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_snap() -> GridConfig {
        GridConfig {
            snap_enabled: true,
            ..GridConfig::default()
        }
    }

    const DIMS: CanvasDims = CanvasDims {
        width: 1000,
        height: 800,
        dpi: 300.0,
    };

    #[test]
    fn test_rect_snap_to_corner() {
        let snapped = snap_to_grid(Transform::at(107.0, 93.0), DIMS, &rect_snap());
        assert_eq!((snapped.x, snapped.y), (100.0, 100.0));
    }

    #[test]
    fn test_snap_disabled_is_identity() {
        let t = Transform {
            x: 107.0,
            y: 93.0,
            rotation: 15.0,
            scale: 1.5,
        };
        assert_eq!(snap_to_grid(t, DIMS, &GridConfig::default()), t);
    }

    #[test]
    fn test_snap_keeps_rotation_and_scale() {
        let t = Transform {
            x: 26.0,
            y: 74.0,
            rotation: 30.0,
            scale: 2.0,
        };
        let s = snap_to_grid(t, DIMS, &rect_snap());
        assert_eq!((s.x, s.y, s.rotation, s.scale), (50.0, 50.0, 30.0, 2.0));
    }

    #[test]
    fn test_rect_points_cover_canvas() {
        let config = GridConfig {
            enabled: true,
            ..GridConfig::default()
        };
        let points = compute_grid_points(120, 100, 300.0, &config);
        // ceil(120/50) x ceil(100/50) = 3 x 2
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], GridPoint { cx: 25.0, cy: 25.0, rx: 25.0, ry: 25.0 });
        assert!(compute_grid_points(120, 100, 300.0, &GridConfig::default()).is_empty());
    }

    #[test]
    fn test_circle_grid_and_snap() {
        let config = GridConfig {
            enabled: true,
            snap_enabled: true,
            shape: GridShape::Circle,
            radius: 10.0,
            ..GridConfig::default()
        };
        let dims = CanvasDims {
            width: 100,
            height: 50,
            dpi: 72.0,
        };
        let points = compute_grid_points(dims.width, dims.height, dims.dpi, &config);
        // 5 columns x 2 rows, block centred vertically (5px margin)
        assert_eq!(points.len(), 10);
        assert_eq!((points[0].cx, points[0].cy), (10.0, 15.0));

        let snapped = snap_to_grid(Transform::at(33.0, 40.0), dims, &config);
        assert_eq!((snapped.x, snapped.y), (30.0, 35.0));
    }

    #[test]
    fn test_physical_units() {
        let config = GridConfig {
            enabled: true,
            snap_enabled: true,
            cell_width: 1.0,
            cell_height: 1.0,
            unit: Unit::Inch,
            ..GridConfig::default()
        };
        let s = snap_to_grid(Transform::at(170.0, 140.0), DIMS, &config);
        assert_eq!((s.x, s.y), (300.0, 0.0));
    }

    #[test]
    fn test_cache_memoizes() {
        let mut cache = GridCache::new();
        let config = GridConfig {
            enabled: true,
            ..GridConfig::default()
        };
        let a = cache.points(200, 200, 300.0, &config);
        let b = cache.points(200, 200, 300.0, &config);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.computations(), 1);

        let wider = GridConfig {
            cell_width: 25.0,
            ..config
        };
        assert_eq!(cache.points(200, 200, 300.0, &wider).len(), 32);
        assert_eq!(cache.computations(), 2);
    }
}
