use std::ops::BitOr;

use bevy::prelude::*;
use chisel_geometry::{Polygon3, Segment3};

use super::VertexHandle;
use crate::document::EditedBrush;

/// Bit set tagging what a [`Hit`] struck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HitType(u32);

impl HitType {
    pub const NONE: Self = Self(0);
    pub const VERTEX_HANDLE: Self = Self(1 << 0);
    pub const EDGE_HANDLE: Self = Self(1 << 1);
    pub const FACE_HANDLE: Self = Self(1 << 2);
    pub const BRUSH_FACE: Self = Self(1 << 3);
    pub const ANY_HANDLE: Self = Self(Self::VERTEX_HANDLE.0 | Self::EDGE_HANDLE.0 | Self::FACE_HANDLE.0);
    pub const ANY: Self = Self(u32::MAX);

    /// Whether the two sets share at least one type.
    pub fn matches(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for HitType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A ray hit on a brush face (not a handle).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushFaceHit {
    pub brush: Entity,
    /// Index into the brush's face list.
    pub face: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HitTarget {
    Vertex(VertexHandle),
    Edge(Segment3),
    Face(Polygon3),
    BrushFace(BrushFaceHit),
}

/// A value that can ride in a [`Hit`] and be read back out by type.
pub trait HitPayload: Sized {
    fn from_target(target: &HitTarget) -> Option<&Self>;
    fn into_target(self) -> HitTarget;
}

impl HitPayload for VertexHandle {
    fn from_target(target: &HitTarget) -> Option<&Self> {
        match target {
            HitTarget::Vertex(handle) => Some(handle),
            _ => None,
        }
    }

    fn into_target(self) -> HitTarget {
        HitTarget::Vertex(self)
    }
}

impl HitPayload for Segment3 {
    fn from_target(target: &HitTarget) -> Option<&Self> {
        match target {
            HitTarget::Edge(handle) => Some(handle),
            _ => None,
        }
    }

    fn into_target(self) -> HitTarget {
        HitTarget::Edge(self)
    }
}

impl HitPayload for Polygon3 {
    fn from_target(target: &HitTarget) -> Option<&Self> {
        match target {
            HitTarget::Face(handle) => Some(handle),
            _ => None,
        }
    }

    fn into_target(self) -> HitTarget {
        HitTarget::Face(self)
    }
}

impl HitPayload for BrushFaceHit {
    fn from_target(target: &HitTarget) -> Option<&Self> {
        match target {
            HitTarget::BrushFace(hit) => Some(hit),
            _ => None,
        }
    }

    fn into_target(self) -> HitTarget {
        HitTarget::BrushFace(self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub hit_type: HitType,
    /// Distance along the pick ray.
    pub distance: f32,
    pub point: Vec3,
    pub target: HitTarget,
}

impl Hit {
    pub fn new(hit_type: HitType, distance: f32, point: Vec3, target: impl HitPayload) -> Self {
        Self {
            hit_type,
            distance,
            point,
            target: target.into_target(),
        }
    }

    pub fn has_type(&self, hit_type: HitType) -> bool {
        self.hit_type.matches(hit_type)
    }

    /// The payload, if it is a `T`.
    pub fn target<T: HitPayload>(&self) -> Option<&T> {
        T::from_target(&self.target)
    }
}

/// Hits along one pick ray, nearest first.
///
/// Hits at exactly the same distance keep insertion order, so when several
/// handle managers are queried against one result the first-queried
/// manager's hit wins a tie.
#[derive(Clone, Debug, Default)]
pub struct PickResult {
    hits: Vec<Hit>,
}

impl PickResult {
    pub fn add_hit(&mut self, hit: Hit) {
        if hit.distance.is_nan() {
            return;
        }
        let index = self.hits.partition_point(|h| h.distance <= hit.distance);
        self.hits.insert(index, hit);
    }

    pub fn first(&self) -> Option<&Hit> {
        self.hits.first()
    }

    pub fn first_of_type(&self, hit_type: HitType) -> Option<&Hit> {
        self.hits.iter().find(|h| h.has_type(hit_type))
    }

    pub fn hits_of_type(&self, hit_type: HitType) -> impl Iterator<Item = &Hit> {
        self.hits.iter().filter(move |h| h.has_type(hit_type))
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

/// Add a [`HitType::BRUSH_FACE`] hit for every brush face `ray` crosses.
pub fn pick_brush_faces(ray: Ray3d, brushes: &[EditedBrush], pick_result: &mut PickResult) {
    for brush in brushes {
        for (face, indices) in brush.geometry.face_polygons.iter().enumerate() {
            if indices.len() < 3 {
                continue;
            }
            let polygon = Polygon3::new(indices.iter().map(|&vi| brush.geometry.vertices[vi]).collect());
            if let Some(distance) = polygon.intersect_ray(ray) {
                pick_result.add_hit(Hit::new(
                    HitType::BRUSH_FACE,
                    distance,
                    ray.get_point(distance),
                    BrushFaceHit {
                        brush: brush.entity,
                        face,
                    },
                ));
            }
        }
    }
}
