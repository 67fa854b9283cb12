//! Addressable brush sub-elements: vertices, edges and faces.
//!
//! A handle's identity is its geometry. Two handles reached from different
//! brushes (or from a rebuilt brush) are the same handle when they sit at the
//! same position, which is what lets a selection survive a document rebuild.

mod manager;
mod pick;

use std::cmp::Ordering;
use std::fmt;

use bevy::prelude::*;
use chisel_geometry::{BrushGeometry, PointKey, Polygon3, Segment3, points_approx_eq};

pub use manager::HandleManager;
pub use pick::{BrushFaceHit, Hit, HitPayload, HitTarget, HitType, PickResult, pick_brush_faces};

/// A vertex handle: one brush corner position.
#[derive(Clone, Copy, Debug)]
pub struct VertexHandle(pub Vec3);

impl VertexHandle {
    pub fn position(&self) -> Vec3 {
        self.0
    }
}

impl PartialEq for VertexHandle {
    fn eq(&self, other: &Self) -> bool {
        PointKey::from(self.0) == PointKey::from(other.0)
    }
}

impl Eq for VertexHandle {}

impl PartialOrd for VertexHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VertexHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        PointKey::from(self.0).cmp(&PointKey::from(other.0))
    }
}

/// One kind of handle a [`HandleManager`] can track.
pub trait HandleKind: HitPayload + Clone + Ord + fmt::Debug + Send + Sync + 'static {
    /// Tag put on pick hits against this kind of handle.
    const HIT_TYPE: HitType;

    /// Every handle of this kind on one brush, duplicates allowed.
    fn collect(geometry: &BrushGeometry) -> Vec<Self>;

    /// Canonical position: where the handle is drawn and dragged from.
    fn center(&self) -> Vec3;

    fn translate(&self, delta: Vec3) -> Self;

    /// Brush vertices this handle is made of.
    fn vertex_positions(&self) -> Vec<Vec3>;

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool;
}

impl HandleKind for VertexHandle {
    const HIT_TYPE: HitType = HitType::VERTEX_HANDLE;

    fn collect(geometry: &BrushGeometry) -> Vec<Self> {
        geometry.vertices.iter().copied().map(VertexHandle).collect()
    }

    fn center(&self) -> Vec3 {
        self.0
    }

    fn translate(&self, delta: Vec3) -> Self {
        VertexHandle(self.0 + delta)
    }

    fn vertex_positions(&self) -> Vec<Vec3> {
        vec![self.0]
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        points_approx_eq(self.0, other.0, epsilon)
    }
}

impl HandleKind for Segment3 {
    const HIT_TYPE: HitType = HitType::EDGE_HANDLE;

    fn collect(geometry: &BrushGeometry) -> Vec<Self> {
        geometry.edges()
    }

    fn center(&self) -> Vec3 {
        Segment3::center(self)
    }

    fn translate(&self, delta: Vec3) -> Self {
        Segment3::translate(self, delta)
    }

    fn vertex_positions(&self) -> Vec<Vec3> {
        vec![self.start(), self.end()]
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        Segment3::approx_eq(self, other, epsilon)
    }
}

impl HandleKind for Polygon3 {
    const HIT_TYPE: HitType = HitType::FACE_HANDLE;

    fn collect(geometry: &BrushGeometry) -> Vec<Self> {
        geometry.polygons().collect()
    }

    fn center(&self) -> Vec3 {
        Polygon3::center(self)
    }

    fn translate(&self, delta: Vec3) -> Self {
        Polygon3::translate(self, delta)
    }

    fn vertex_positions(&self) -> Vec<Vec3> {
        self.vertices().to_vec()
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        Polygon3::approx_eq(self, other, epsilon)
    }
}
