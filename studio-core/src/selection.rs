//! Polygon selections and their rasterization into clip masks.
//!
//! A [`Selection`] is an ordered list of regions. Each region is a group of
//! closed polygons filled together with the even-odd rule (so traced holes
//! stay holes) and either included in or excluded from the selection.
//! Every operation returns a new selection; polygons are never edited in
//! place, which keeps history snapshots cheap to clone and compare.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, IntSize, Mask, PathBuilder};

/// A 2D point in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A closed polygon (the last point connects back to the first).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create a polygon from its vertices.
    #[must_use]
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle; negative sizes are normalized.
    #[must_use]
    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        let (x0, x1) = (x.min(x + width), x.max(x + width));
        let (y0, y1) = (y.min(y + height), y.max(y + height));
        Self::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    /// Regular polygon approximating a circle.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn circle(cx: f32, cy: f32, radius: f32, segments: usize) -> Self {
        let segments = segments.max(3);
        let points = (0..segments)
            .map(|i| {
                let angle = std::f32::consts::TAU * i as f32 / segments as f32;
                Point::new(cx + radius * angle.cos(), cy + radius * angle.sin())
            })
            .collect();
        Self::new(points)
    }

    /// Vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Whether the polygon encloses any area at all.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// Signed shoelace area (positive when clockwise in y-down space).
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y)
            })
            .sum();
        twice / 2.0
    }

    /// Unsigned enclosed area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// A copy shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
        )
    }

    /// Even-odd point containment.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.points[i], self.points[j]);
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    fn push_to(&self, pb: &mut PathBuilder) {
        if let Some((first, rest)) = self.points.split_first() {
            pb.move_to(first.x, first.y);
            for p in rest {
                pb.line_to(p.x, p.y);
            }
            pb.close();
        }
    }
}

/// How new polygons combine with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Discard the current selection.
    #[default]
    Replace,
    /// Union with the current selection.
    Add,
    /// Remove from the current selection.
    Subtract,
}

impl SelectionMode {
    /// Modifier-key semantics: shift adds, alt subtracts, neither replaces.
    #[must_use]
    pub const fn from_modifiers(shift: bool, alt: bool) -> Self {
        if shift {
            Self::Add
        } else if alt {
            Self::Subtract
        } else {
            Self::Replace
        }
    }
}

/// Whether a region adds to or removes from the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionOp {
    /// Pixels inside the region are selected.
    Include,
    /// Pixels inside the region are deselected.
    Exclude,
}

/// A group of polygons filled together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRegion {
    /// Include or exclude.
    pub op: RegionOp,
    /// Outlines (outer contours and holes).
    pub polygons: Vec<Polygon>,
}

impl SelectionRegion {
    fn contains(&self, p: Point) -> bool {
        self.polygons.iter().filter(|poly| poly.contains(p)).count() % 2 == 1
    }
}

/// The current selection. Empty means "no selection", i.e. everything is
/// paintable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    regions: Arc<Vec<SelectionRegion>>,
}

impl Selection {
    /// The empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn from_regions(regions: Vec<SelectionRegion>) -> Self {
        Self {
            regions: Arc::new(normalize(regions)),
        }
    }

    fn with_region(&self, op: RegionOp, polygons: Vec<Polygon>) -> Self {
        let polygons: Vec<Polygon> = polygons.into_iter().filter(|p| !p.is_degenerate()).collect();
        if polygons.is_empty() {
            return self.clone();
        }
        let mut regions = self.regions.as_ref().clone();
        regions.push(SelectionRegion { op, polygons });
        Self::from_regions(regions)
    }

    /// A selection holding exactly `polygons` (degenerate ones dropped).
    #[must_use]
    pub fn replace(&self, polygons: Vec<Polygon>) -> Self {
        Self::new().with_region(RegionOp::Include, polygons)
    }

    /// Union with one polygon.
    #[must_use]
    pub fn add(&self, polygon: Polygon) -> Self {
        self.add_all(vec![polygon])
    }

    /// Union with a polygon group (even-odd filled).
    #[must_use]
    pub fn add_all(&self, polygons: Vec<Polygon>) -> Self {
        self.with_region(RegionOp::Include, polygons)
    }

    /// Remove one polygon.
    #[must_use]
    pub fn subtract(&self, polygon: Polygon) -> Self {
        self.subtract_all(vec![polygon])
    }

    /// Remove a polygon group (even-odd filled).
    #[must_use]
    pub fn subtract_all(&self, polygons: Vec<Polygon>) -> Self {
        self.with_region(RegionOp::Exclude, polygons)
    }

    /// Combine according to a [`SelectionMode`].
    #[must_use]
    pub fn apply(&self, mode: SelectionMode, polygons: Vec<Polygon>) -> Self {
        match mode {
            SelectionMode::Replace => self.replace(polygons),
            SelectionMode::Add => self.add_all(polygons),
            SelectionMode::Subtract => self.subtract_all(polygons),
        }
    }

    /// Whether nothing is selected (everything paintable).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions in application order.
    #[must_use]
    pub fn regions(&self) -> &[SelectionRegion] {
        &self.regions
    }

    /// Polygons of all included regions.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.regions
            .iter()
            .filter(|r| r.op == RegionOp::Include)
            .flat_map(|r| r.polygons.iter())
    }

    /// A copy shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let regions = self
            .regions
            .iter()
            .map(|r| SelectionRegion {
                op: r.op,
                polygons: r.polygons.iter().map(|p| p.translated(dx, dy)).collect(),
            })
            .collect();
        Self {
            regions: Arc::new(regions),
        }
    }

    /// Whether a canvas point is selected. An empty selection selects
    /// everything.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        if self.is_empty() {
            return true;
        }
        self.regions.iter().fold(false, |selected, region| {
            match (region.op, region.contains(p)) {
                (RegionOp::Include, true) => true,
                (RegionOp::Exclude, true) => false,
                (_, false) => selected,
            }
        })
    }

    /// Rasterize into a `width` x `height` clip mask whose origin sits at
    /// canvas position `origin` (a layer's offset).
    ///
    /// Returns `None` for an empty selection: no clipping applies.
    #[must_use]
    pub fn clip_mask(&self, width: u32, height: u32, origin: (f32, f32)) -> Option<Mask> {
        if self.is_empty() {
            return None;
        }
        let size = IntSize::from_wh(width, height)?;
        let mut acc = vec![0_u8; width as usize * height as usize];
        let shift = tiny_skia::Transform::from_translate(-origin.0, -origin.1);

        for region in self.regions.iter() {
            let mut pb = PathBuilder::new();
            for polygon in &region.polygons {
                polygon.push_to(&mut pb);
            }
            let Some(path) = pb.finish() else { continue };
            let Some(mut scratch) = Mask::new(width, height) else {
                continue;
            };
            scratch.fill_path(&path, FillRule::EvenOdd, false, shift);

            for (dst, &cov) in acc.iter_mut().zip(scratch.data()) {
                *dst = match region.op {
                    RegionOp::Include => (*dst).max(cov),
                    RegionOp::Exclude => {
                        let keep = u16::from(255 - cov);
                        // (dst * keep) / 255 stays within u8
                        u8::try_from(u16::from(*dst) * keep / 255).unwrap_or(0)
                    }
                };
            }
        }

        Mask::from_vec(acc, size)
    }
}

/// Keep the region list minimal so set algebra stays exact:
/// an include region followed later by an exclude region with identical
/// polygons contributes nothing and is dropped, and excludes with nothing
/// before them are dropped.
fn normalize(mut regions: Vec<SelectionRegion>) -> Vec<SelectionRegion> {
    let mut j = 0;
    while j < regions.len() {
        if regions[j].op == RegionOp::Exclude {
            let excluded = regions[j].polygons.clone();
            let mut i = 0;
            while i < j {
                if regions[i].op == RegionOp::Include && regions[i].polygons == excluded {
                    regions.remove(i);
                    j -= 1;
                } else {
                    i += 1;
                }
            }
        }
        j += 1;
    }

    let leading = regions
        .iter()
        .take_while(|r| r.op == RegionOp::Exclude)
        .count();
    regions.drain(..leading);
    regions
}
