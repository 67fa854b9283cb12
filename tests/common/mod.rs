//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use bevy::prelude::*;
use chisel::document::{EditedBrush, MapDocument};
use chisel_geometry::{BrushGeometry, EPSILON, Polygon3, Segment3, cuboid_faces, points_approx_eq};

/// One call made against a [`RecordingDocument`].
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    MoveVertices { name: String, positions: Vec<Vec3>, delta: Vec3 },
    MoveEdges { name: String, edges: Vec<Segment3>, delta: Vec3 },
    MoveFaces { name: String, faces: Vec<Polygon3>, delta: Vec3 },
    RemoveVertices { name: String, positions: Vec<Vec3> },
}

/// In-memory document that records every request. When accepting, moves
/// translate the matching vertices in place and bump the revision.
pub struct RecordingDocument {
    pub brushes: Vec<EditedBrush>,
    pub revision: u64,
    pub accept: bool,
    pub requests: Vec<Request>,
}

impl RecordingDocument {
    pub fn new(brushes: Vec<EditedBrush>) -> Self {
        Self {
            brushes,
            revision: 1,
            accept: true,
            requests: Vec::new(),
        }
    }

    pub fn denying(brushes: Vec<EditedBrush>) -> Self {
        Self {
            accept: false,
            ..Self::new(brushes)
        }
    }

    fn translate(&mut self, positions: &[Vec3], delta: Vec3) -> bool {
        if !self.accept {
            return false;
        }
        for brush in &mut self.brushes {
            for vertex in &mut brush.geometry.vertices {
                if positions.iter().any(|p| points_approx_eq(*p, *vertex, EPSILON)) {
                    *vertex += delta;
                }
            }
        }
        self.revision += 1;
        true
    }
}

impl MapDocument for RecordingDocument {
    fn revision(&self) -> u64 {
        self.revision
    }

    fn edited_brushes(&self) -> Vec<EditedBrush> {
        self.brushes.clone()
    }

    fn move_vertices(&mut self, name: &str, positions: Vec<Vec3>, delta: Vec3) -> bool {
        self.requests.push(Request::MoveVertices {
            name: name.to_string(),
            positions: positions.clone(),
            delta,
        });
        self.translate(&positions, delta)
    }

    fn move_edges(&mut self, name: &str, edges: Vec<Segment3>, delta: Vec3) -> bool {
        let positions: Vec<Vec3> = edges.iter().flat_map(|e| [e.start(), e.end()]).collect();
        self.requests.push(Request::MoveEdges {
            name: name.to_string(),
            edges,
            delta,
        });
        self.translate(&positions, delta)
    }

    fn move_faces(&mut self, name: &str, faces: Vec<Polygon3>, delta: Vec3) -> bool {
        let positions = Polygon3::vertices_of(&faces);
        self.requests.push(Request::MoveFaces {
            name: name.to_string(),
            faces,
            delta,
        });
        self.translate(&positions, delta)
    }

    fn remove_vertices(&mut self, name: &str, positions: Vec<Vec3>) -> bool {
        self.requests.push(Request::RemoveVertices {
            name: name.to_string(),
            positions,
        });
        if self.accept {
            self.revision += 1;
        }
        self.accept
    }
}

pub fn entities<const N: usize>() -> [Entity; N] {
    let mut world = World::new();
    std::array::from_fn(|_| world.spawn_empty().id())
}

/// Axis-aligned cube of half-size 1.
pub fn cube(entity: Entity, center: Vec3) -> EditedBrush {
    EditedBrush {
        entity,
        geometry: BrushGeometry::from_faces(&cuboid_faces(center, Vec3::ONE)),
    }
}

/// The face of `brush` whose outward normal is `normal`.
pub fn face_with_normal(brush: &EditedBrush, normal: Vec3) -> Polygon3 {
    brush
        .geometry
        .polygons()
        .find(|p| p.normal().dot(normal) > 0.99)
        .expect("face with that normal")
}
