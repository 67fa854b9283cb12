use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use bevy::prelude::*;

use crate::{EPSILON, RELATIVE_EPSILON, point_tolerance, ray::ray_plane_intersection};

/// Exact, totally ordered identity of a point.
///
/// Compares the coordinate bit patterns with `-0.0` folded into `0.0`, so two
/// points are the same key only when they are the same position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey([u32; 3]);

impl From<Vec3> for PointKey {
    fn from(p: Vec3) -> Self {
        fn bits(v: f32) -> u32 {
            if v == 0.0 { 0 } else { v.to_bits() }
        }
        Self([bits(p.x), bits(p.y), bits(p.z)])
    }
}

/// Whether `a` and `b` agree within `epsilon`, widened for points far from
/// the origin.
pub fn points_approx_eq(a: Vec3, b: Vec3, epsilon: f32) -> bool {
    let magnitude = a.abs().max_element().max(b.abs().max_element());
    let scale = (magnitude * RELATIVE_EPSILON / EPSILON).max(1.0);
    (a - b).abs().max_element() <= epsilon * scale
}

// ---------------------------------------------------------------------------
// Segment3
// ---------------------------------------------------------------------------

/// A line segment with its endpoints in canonical order.
#[derive(Clone, Copy, Debug)]
pub struct Segment3 {
    start: Vec3,
    end: Vec3,
}

impl Segment3 {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        if PointKey::from(a) <= PointKey::from(b) {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn end(&self) -> Vec3 {
        self.end
    }

    pub fn center(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    pub fn length(&self) -> f32 {
        (self.end - self.start).length()
    }

    pub fn translate(&self, delta: Vec3) -> Self {
        Self::new(self.start + delta, self.end + delta)
    }

    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (points_approx_eq(self.start, other.start, epsilon)
            && points_approx_eq(self.end, other.end, epsilon))
            || (points_approx_eq(self.start, other.end, epsilon)
                && points_approx_eq(self.end, other.start, epsilon))
    }

    fn key(&self) -> [PointKey; 2] {
        [self.start.into(), self.end.into()]
    }
}

impl PartialEq for Segment3 {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Segment3 {}

impl Hash for Segment3 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Segment3 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment3 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

// ---------------------------------------------------------------------------
// Polygon3
// ---------------------------------------------------------------------------

/// A planar, convex vertex loop.
///
/// The loop is rotated so its smallest vertex (by [`PointKey`]) comes first;
/// the winding is kept. Two polygons are equal when their loops are.
#[derive(Clone, Debug)]
pub struct Polygon3 {
    vertices: Vec<Vec3>,
}

impl Polygon3 {
    pub fn new(mut vertices: Vec<Vec3>) -> Self {
        if let Some(first) = vertices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| PointKey::from(**v))
            .map(|(i, _)| i)
        {
            vertices.rotate_left(first);
        }
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Arithmetic mean of the vertices.
    pub fn center(&self) -> Vec3 {
        if self.vertices.is_empty() {
            return Vec3::ZERO;
        }
        self.vertices.iter().sum::<Vec3>() / self.vertices.len() as f32
    }

    /// Unit normal by Newell's method, zero for degenerate loops.
    pub fn normal(&self) -> Vec3 {
        let mut normal = Vec3::ZERO;
        for (i, current) in self.vertices.iter().enumerate() {
            let next = self.vertices[(i + 1) % self.vertices.len()];
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }
        normal.normalize_or_zero()
    }

    pub fn translate(&self, delta: Vec3) -> Self {
        Self::new(self.vertices.iter().map(|v| *v + delta).collect())
    }

    /// Whether `point` lies on the polygon's plane and inside its loop.
    pub fn contains_point(&self, point: Vec3) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        let normal = self.normal();
        if normal == Vec3::ZERO || normal.dot(point - self.vertices[0]).abs() > point_tolerance(point) {
            return false;
        }
        let mut sign = 0.0_f32;
        for (i, current) in self.vertices.iter().enumerate() {
            let next = self.vertices[(i + 1) % self.vertices.len()];
            let side = (next - *current).cross(point - *current).dot(normal);
            if side.abs() <= EPSILON {
                continue;
            }
            if sign == 0.0 {
                sign = side.signum();
            } else if side.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Distance along `ray` to where it crosses the polygon.
    pub fn intersect_ray(&self, ray: Ray3d) -> Option<f32> {
        let normal = self.normal();
        if normal == Vec3::ZERO {
            return None;
        }
        let hit = ray_plane_intersection(ray, self.vertices[0], normal)?;
        self.contains_point(hit)
            .then(|| (hit - ray.origin).dot(*ray.direction))
    }

    /// Same loop within `epsilon`, whatever vertex either loop starts at.
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        let n = self.vertices.len();
        if n != other.vertices.len() {
            return false;
        }
        (0..n.max(1)).any(|offset| {
            (0..n).all(|i| {
                points_approx_eq(self.vertices[i], other.vertices[(i + offset) % n], epsilon)
            })
        })
    }

    /// Every vertex of every polygon, in order. Shared vertices repeat.
    pub fn vertices_of<'a>(polygons: impl IntoIterator<Item = &'a Polygon3>) -> Vec<Vec3> {
        polygons
            .into_iter()
            .flat_map(|polygon| polygon.vertices.iter().copied())
            .collect()
    }

    fn keys(&self) -> impl Iterator<Item = PointKey> + '_ {
        self.vertices.iter().map(|v| PointKey::from(*v))
    }
}

impl PartialEq for Polygon3 {
    fn eq(&self, other: &Self) -> bool {
        self.vertices.len() == other.vertices.len() && self.keys().eq(other.keys())
    }
}

impl Eq for Polygon3 {}

impl Hash for Polygon3 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for key in self.keys() {
            key.hash(state);
        }
    }
}

impl PartialOrd for Polygon3 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Polygon3 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.keys().cmp(other.keys())
    }
}
