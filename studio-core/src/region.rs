//! Tolerance-based region growing and boundary extraction.
//!
//! Regions are 4-connected: pixels touching only at a corner belong to
//! different regions. Pixels are compared as premultiplied RGBA bytes using
//! the largest per-channel difference against the seed.
//!
//! Boundaries are traced along pixel edges, so a region of `n` whole pixels
//! always encloses exactly `n` square units before simplification.

use std::collections::VecDeque;

use tracing::trace;

use crate::selection::{Point, Polygon};

/// Default Ramer-Douglas-Peucker tolerance in pixels.
pub const DEFAULT_EPSILON: f32 = 2.0;

/// A binary mask produced by region growing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    inside: Vec<bool>,
}

impl RegionMask {
    /// Mask width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether `(x, y)` is part of the region. Out-of-range is outside.
    #[must_use]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return false;
        }
        self.inside[y as usize * self.width as usize + x as usize]
    }

    /// Number of pixels in the region.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inside.iter().filter(|&&v| v).count()
    }

    /// 8-bit coverage (255 inside, 0 outside), row-major.
    #[must_use]
    pub fn to_alpha(&self) -> Vec<u8> {
        self.inside.iter().map(|&v| if v { 255 } else { 0 }).collect()
    }
}

fn max_channel_distance(a: &[u8], b: &[u8]) -> u8 {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}

/// Magic-wand region: like [`flood_fill`], but a seed on a fully
/// transparent pixel selects nothing.
#[must_use]
pub fn grow_region(
    pixels: &[u8],
    width: u32,
    height: u32,
    seed: (i32, i32),
    tolerance: u8,
) -> Option<RegionMask> {
    let (sx, sy) = (usize::try_from(seed.0).ok()?, usize::try_from(seed.1).ok()?);
    let alpha = pixels.get((sy * width as usize + sx) * 4 + 3).copied();
    if sx < width as usize && alpha == Some(0) {
        return None;
    }
    flood_fill(pixels, width, height, seed, tolerance)
}

/// Flood-fill from `seed` over premultiplied RGBA `pixels`.
///
/// Returns `None` if the seed lies outside the buffer or `pixels` is too
/// short for the given size.
#[must_use]
pub fn flood_fill(
    pixels: &[u8],
    width: u32,
    height: u32,
    seed: (i32, i32),
    tolerance: u8,
) -> Option<RegionMask> {
    let (w, h) = (width as usize, height as usize);
    if pixels.len() < w * h * 4 {
        trace!(len = pixels.len(), width, height, "pixel buffer too short for region grow");
        return None;
    }
    let (sx, sy) = (usize::try_from(seed.0).ok()?, usize::try_from(seed.1).ok()?);
    if sx >= w || sy >= h {
        return None;
    }

    let seed_px = &pixels[(sy * w + sx) * 4..(sy * w + sx) * 4 + 4];
    let seed_px: [u8; 4] = [seed_px[0], seed_px[1], seed_px[2], seed_px[3]];

    let mut inside = vec![false; w * h];
    let mut queue = VecDeque::new();
    inside[sy * w + sx] = true;
    queue.push_back((sx, sy));

    while let Some((x, y)) = queue.pop_front() {
        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx >= w || ny >= h {
                continue;
            }
            let idx = ny * w + nx;
            if inside[idx] {
                continue;
            }
            if max_channel_distance(&pixels[idx * 4..idx * 4 + 4], &seed_px) <= tolerance {
                inside[idx] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    Some(RegionMask {
        width,
        height,
        inside,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    East,
    South,
    West,
    North,
}

impl Dir {
    const fn bit(self) -> u8 {
        match self {
            Self::East => 1,
            Self::South => 2,
            Self::West => 4,
            Self::North => 8,
        }
    }

    const fn step(self) -> (i64, i64) {
        match self {
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
            Self::North => (0, -1),
        }
    }

    /// Clockwise on screen (y down).
    const fn right(self) -> Self {
        match self {
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
            Self::North => Self::East,
        }
    }

    const fn left(self) -> Self {
        self.right().right().right()
    }
}

/// Trace the region boundary into closed rings.
///
/// Every boundary edge is directed with the region on its right, so outer
/// contours run clockwise on screen and holes counter-clockwise. At corner
/// contacts the tracer turns right, which keeps diagonal neighbours apart.
/// Collinear vertices are dropped.
#[must_use]
pub fn trace_contours(mask: &RegionMask) -> Vec<Polygon> {
    let vw = i64::from(mask.width) + 1;
    let vh = i64::from(mask.height) + 1;
    let index = |x: i64, y: i64| (y * vw + x) as usize;
    let mut outgoing = vec![0_u8; (vw * vh) as usize];

    for y in 0..i64::from(mask.height) {
        for x in 0..i64::from(mask.width) {
            if !mask.contains(x, y) {
                continue;
            }
            if !mask.contains(x, y - 1) {
                outgoing[index(x, y)] |= Dir::East.bit();
            }
            if !mask.contains(x + 1, y) {
                outgoing[index(x + 1, y)] |= Dir::South.bit();
            }
            if !mask.contains(x, y + 1) {
                outgoing[index(x + 1, y + 1)] |= Dir::West.bit();
            }
            if !mask.contains(x - 1, y) {
                outgoing[index(x, y + 1)] |= Dir::North.bit();
            }
        }
    }

    let mut rings = Vec::new();
    for start in 0..outgoing.len() {
        while outgoing[start] != 0 {
            let sx = start as i64 % vw;
            let sy = start as i64 / vw;
            let mut dir = [Dir::East, Dir::South, Dir::West, Dir::North]
                .into_iter()
                .find(|d| outgoing[start] & d.bit() != 0)
                .unwrap_or(Dir::East);
            let (mut x, mut y) = (sx, sy);
            let mut vertices: Vec<(i64, i64, Dir)> = Vec::new();

            loop {
                outgoing[index(x, y)] &= !dir.bit();
                vertices.push((x, y, dir));
                let (dx, dy) = dir.step();
                x += dx;
                y += dy;
                if x == sx && y == sy {
                    break;
                }
                let here = outgoing[index(x, y)];
                let Some(next) = [dir.right(), dir, dir.left()]
                    .into_iter()
                    .find(|d| here & d.bit() != 0)
                else {
                    break;
                };
                dir = next;
            }

            // keep only vertices where the direction changes
            let n = vertices.len();
            let ring: Vec<Point> = (0..n)
                .filter(|&i| vertices[(i + n - 1) % n].2 != vertices[i].2)
                .map(|i| Point::new(vertices[i].0 as f32, vertices[i].1 as f32))
                .collect();
            if ring.len() >= 3 {
                rings.push(Polygon::new(ring));
            }
        }
    }
    rings
}

fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

fn simplify_open(points: &[Point], epsilon: f32) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    let mut stack = vec![(0, points.len() - 1)];

    while let Some((first, last)) = stack.pop() {
        let mut farthest = (0.0_f32, first);
        for i in first + 1..last {
            let d = segment_distance(points[i], points[first], points[last]);
            if d > farthest.0 {
                farthest = (d, i);
            }
        }
        if farthest.0 > epsilon {
            keep[farthest.1] = true;
            stack.push((first, farthest.1));
            stack.push((farthest.1, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Ramer-Douglas-Peucker over a closed ring.
///
/// The ring is split at the vertex farthest from the first one and each half
/// is simplified separately. The result may have fewer than three points.
#[must_use]
pub fn simplify_ring(points: &[Point], epsilon: f32) -> Vec<Point> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }
    let origin = points[0];
    let split = points
        .iter()
        .enumerate()
        .max_by(|a, b| origin.distance(*a.1).total_cmp(&origin.distance(*b.1)))
        .map_or(0, |(i, _)| i);
    if split == 0 {
        return vec![origin];
    }

    let mut first_half = simplify_open(&points[..=split], epsilon);
    let mut second: Vec<Point> = points[split..].to_vec();
    second.push(origin);
    let second_half = simplify_open(&second, epsilon);

    // drop the shared split point and the closing origin
    first_half.extend_from_slice(&second_half[1..second_half.len() - 1]);
    first_half
}

/// Grow, trace and simplify in one step: the region-grow worker's job.
///
/// Returned polygons are in pixel-buffer coordinates; rings simplified
/// below three points are dropped.
#[must_use]
pub fn region_polygons(
    pixels: &[u8],
    width: u32,
    height: u32,
    seed: (i32, i32),
    tolerance: u8,
    epsilon: f32,
) -> Vec<Polygon> {
    let Some(mask) = grow_region(pixels, width, height, seed, tolerance) else {
        return Vec::new();
    };
    trace_contours(&mask)
        .into_iter()
        .map(|ring| Polygon::new(simplify_ring(ring.points(), epsilon)))
        .filter(|p| !p.is_degenerate())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(width: u32, height: u32, paint: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
        let mut out = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                out.extend_from_slice(&paint(x, y));
            }
        }
        out
    }

    const RED: [u8; 4] = [255, 0, 0, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    fn net_area(polys: &[Polygon]) -> f64 {
        polys.iter().map(Polygon::signed_area).sum()
    }

    #[test]
    fn test_grow_square() {
        let px = canvas(10, 10, |x, y| {
            if (2..6).contains(&x) && (3..7).contains(&y) {
                RED
            } else {
                CLEAR
            }
        });
        let mask = grow_region(&px, 10, 10, (3, 4), 0).expect("region");
        assert_eq!(mask.count(), 16);
        assert!(grow_region(&px, 10, 10, (0, 0), 0).is_none());
        assert!(grow_region(&px, 10, 10, (-1, 4), 0).is_none());
        assert!(grow_region(&px, 10, 10, (10, 4), 0).is_none());
    }

    #[test]
    fn test_flood_fill_accepts_transparent_seed() {
        let px = canvas(6, 6, |x, _| if x < 3 { CLEAR } else { RED });
        assert_eq!(flood_fill(&px, 6, 6, (0, 0), 0).expect("region").count(), 18);
        assert!(grow_region(&px, 6, 6, (0, 0), 0).is_none());
    }

    #[test]
    fn test_four_connectivity() {
        // Two red pixels touching only at a corner.
        let px = canvas(4, 4, |x, y| if (x, y) == (1, 1) || (x, y) == (2, 2) { RED } else { CLEAR });
        let mask = grow_region(&px, 4, 4, (1, 1), 0).expect("region");
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn test_tolerance_admits_near_colours() {
        let px = canvas(3, 1, |x, _| [250 - (x as u8) * 10, 0, 0, 255]);
        assert_eq!(grow_region(&px, 3, 1, (0, 0), 9).expect("region").count(), 1);
        assert_eq!(grow_region(&px, 3, 1, (0, 0), 20).expect("region").count(), 3);
    }

    #[test]
    fn test_trace_square_has_four_corners() {
        let px = canvas(8, 8, |x, y| if (1..5).contains(&x) && (2..5).contains(&y) { RED } else { CLEAR });
        let mask = grow_region(&px, 8, 8, (2, 3), 0).expect("region");
        let rings = trace_contours(&mask);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].points().len(), 4);
        assert!((rings[0].signed_area() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_trace_ring_with_hole() {
        // 6x6 block with a 2x2 hole in the middle.
        let px = canvas(8, 8, |x, y| {
            let block = (1..7).contains(&x) && (1..7).contains(&y);
            let hole = (3..5).contains(&x) && (3..5).contains(&y);
            if block && !hole {
                RED
            } else {
                CLEAR
            }
        });
        let mask = grow_region(&px, 8, 8, (1, 1), 0).expect("region");
        let rings = trace_contours(&mask);
        assert_eq!(rings.len(), 2);
        assert!((net_area(&rings) - 32.0).abs() < 1e-9);
        assert!(rings.iter().any(|r| r.signed_area() < 0.0));
    }

    #[test]
    fn test_isolated_pixel_simplifies_away() {
        let px = canvas(5, 5, |x, y| if (x, y) == (2, 2) { RED } else { CLEAR });
        assert!(region_polygons(&px, 5, 5, (2, 2), 0, DEFAULT_EPSILON).is_empty());
        assert_eq!(region_polygons(&px, 5, 5, (2, 2), 0, 0.0).len(), 1);
    }

    #[test]
    fn test_simplify_keeps_significant_corners() {
        let ring = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.3),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let out = simplify_ring(&ring, 1.0);
        assert_eq!(out.len(), 4);
        assert!(!out.contains(&Point::new(5.0, 0.3)));
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(grow_region(&[255; 8], 4, 4, (0, 0), 0).is_none());
    }
}
