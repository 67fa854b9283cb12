mod camera;
mod hull;
mod polygon;
mod ray;

use bevy::prelude::*;

pub use camera::{PickCamera, PickProjection};
pub use hull::{HullFace, merge_hull_triangles, rebuild_faces_from_vertices};
pub use polygon::{PointKey, Polygon3, Segment3, points_approx_eq};
pub use ray::{ray_plane_intersection, ray_sphere_intersection};

/// Absolute tolerance for coordinates near the origin.
pub const EPSILON: f32 = 1e-4;

/// Tolerance per unit of coordinate magnitude. Plane-derived vertices lose
/// precision in proportion to their distance from the origin.
pub const RELATIVE_EPSILON: f32 = 1e-5;

/// Tolerance for comparing coordinates of magnitude up to `magnitude`.
pub fn tolerance_at(magnitude: f32) -> f32 {
    EPSILON.max(magnitude.abs() * RELATIVE_EPSILON)
}

/// Tolerance for comparisons involving `point`.
pub fn point_tolerance(point: Vec3) -> f32 {
    tolerance_at(point.abs().max_element())
}

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Reflect, Default, PartialEq)]
pub struct BrushPlane {
    pub normal: Vec3,
    pub distance: f32,
}

#[derive(Clone, Debug, Reflect, Default, PartialEq)]
pub struct BrushFaceData {
    pub plane: BrushPlane,
    /// Asset-relative texture path (e.g. "textures/brick.png").
    pub texture_path: Option<String>,
    pub uv_offset: Vec2,
    pub uv_scale: Vec2,
    pub uv_rotation: f32,
}

impl BrushFaceData {
    pub fn from_plane(normal: Vec3, distance: f32) -> Self {
        Self {
            plane: BrushPlane { normal, distance },
            uv_scale: Vec2::ONE,
            ..default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("brush has {0} vertices, at least 4 are required")]
    TooFewVertices(usize),
    #[error("brush has {0} non-degenerate faces, at least 4 are required")]
    TooFewFaces(usize),
    #[error("face {face} references vertex {vertex} which does not exist")]
    DanglingVertex { face: usize, vertex: usize },
}

/// Vertices and per-face vertex loops derived from a brush's planes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrushGeometry {
    pub vertices: Vec<Vec3>,
    /// Per-face: ordered vertex indices into `vertices`.
    pub face_polygons: Vec<Vec<usize>>,
}

impl BrushGeometry {
    pub fn from_faces(faces: &[BrushFaceData]) -> Self {
        let (vertices, face_polygons) = compute_brush_geometry(faces);
        Self {
            vertices,
            face_polygons,
        }
    }

    /// Apply `f` to every vertex, keeping the topology.
    pub fn map_vertices(&self, f: impl Fn(Vec3) -> Vec3) -> Self {
        Self {
            vertices: self.vertices.iter().map(|v| f(*v)).collect(),
            face_polygons: self.face_polygons.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.vertices.len() < 4 {
            return Err(GeometryError::TooFewVertices(self.vertices.len()));
        }
        for (face, polygon) in self.face_polygons.iter().enumerate() {
            if let Some(&vertex) = polygon.iter().find(|&&vi| vi >= self.vertices.len()) {
                return Err(GeometryError::DanglingVertex { face, vertex });
            }
        }
        let faces = self.face_polygons.iter().filter(|p| p.len() >= 3).count();
        if faces < 4 {
            return Err(GeometryError::TooFewFaces(faces));
        }
        Ok(())
    }

    /// Face loops with at least three vertices, as polygons.
    pub fn polygons(&self) -> impl Iterator<Item = Polygon3> + '_ {
        self.face_polygons
            .iter()
            .filter(|indices| indices.len() >= 3)
            .map(|indices| Polygon3::new(indices.iter().map(|&vi| self.vertices[vi]).collect()))
    }

    /// Unique edges of all face loops.
    pub fn edges(&self) -> Vec<Segment3> {
        let mut unique: Vec<(usize, usize)> = Vec::new();
        for polygon in &self.face_polygons {
            if polygon.len() < 2 {
                continue;
            }
            for i in 0..polygon.len() {
                let a = polygon[i];
                let b = polygon[(i + 1) % polygon.len()];
                let edge = (a.min(b), a.max(b));
                if !unique.contains(&edge) {
                    unique.push(edge);
                }
            }
        }
        unique
            .into_iter()
            .map(|(a, b)| Segment3::new(self.vertices[a], self.vertices[b]))
            .collect()
    }

    /// Index of the vertex at `position`, if any.
    pub fn find_vertex(&self, position: Vec3) -> Option<usize> {
        self.vertices
            .iter()
            .position(|v| points_approx_eq(*v, position, EPSILON))
    }
}

// ---------------------------------------------------------------------------
// Plane geometry
// ---------------------------------------------------------------------------

/// Solve the intersection of three planes. Returns None if degenerate.
pub fn plane_triple_intersection(p1: &BrushPlane, p2: &BrushPlane, p3: &BrushPlane) -> Option<Vec3> {
    let n1 = p1.normal.as_dvec3();
    let n2 = p2.normal.as_dvec3();
    let n3 = p3.normal.as_dvec3();

    let det = n1.dot(n2.cross(n3));
    if det.abs() < f64::from(EPSILON) {
        return None;
    }

    // Solved in f64: far from the origin the f32 products cancel badly.
    let point = (n2.cross(n3) * f64::from(p1.distance)
        + n3.cross(n1) * f64::from(p2.distance)
        + n1.cross(n2) * f64::from(p3.distance))
        / det;
    Some(point.as_vec3())
}

/// Check if a point is inside (or on the boundary of) all half-planes.
pub fn point_inside_all_planes(point: Vec3, faces: &[BrushFaceData]) -> bool {
    faces
        .iter()
        .all(|face| face.plane.normal.dot(point) <= face.plane.distance + point_tolerance(point))
}

/// Compute brush geometry from face planes.
/// Returns (unique vertices, per-face polygon vertex indices).
pub fn compute_brush_geometry(faces: &[BrushFaceData]) -> (Vec<Vec3>, Vec<Vec<usize>>) {
    let n = faces.len();
    let mut vertices: Vec<Vec3> = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let Some(point) =
                    plane_triple_intersection(&faces[i].plane, &faces[j].plane, &faces[k].plane)
                else {
                    continue;
                };
                if !point_inside_all_planes(point, faces) {
                    continue;
                }
                if !vertices.iter().any(|v| points_approx_eq(*v, point, EPSILON)) {
                    vertices.push(point);
                }
            }
        }
    }

    let mut face_polygons = Vec::with_capacity(n);
    for face in faces {
        let mut face_verts: Vec<usize> = vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                (face.plane.normal.dot(**v) - face.plane.distance).abs() < point_tolerance(**v)
            })
            .map(|(vi, _)| vi)
            .collect();

        if face_verts.len() >= 3 {
            sort_face_vertices_by_winding(&vertices, &mut face_verts, face.plane.normal);
        }

        face_polygons.push(face_verts);
    }

    (vertices, face_polygons)
}

/// Sort face vertex indices counter-clockwise around the face normal.
pub fn sort_face_vertices_by_winding(vertices: &[Vec3], indices: &mut [usize], normal: Vec3) {
    if indices.len() < 3 {
        return;
    }

    let centroid: Vec3 = indices.iter().map(|&i| vertices[i]).sum::<Vec3>() / indices.len() as f32;
    let (u_axis, v_axis) = compute_face_tangent_axes(normal);

    indices.sort_by(|&a, &b| {
        let da = vertices[a] - centroid;
        let db = vertices[b] - centroid;
        let angle_a = da.dot(v_axis).atan2(da.dot(u_axis));
        let angle_b = db.dot(v_axis).atan2(db.dot(u_axis));
        angle_a.total_cmp(&angle_b)
    });
}

/// Compute tangent axes for a face from its normal (paraxial projection).
///
/// `u × v` points along `normal`, so increasing angle in (u, v) is
/// counter-clockwise seen from outside.
pub fn compute_face_tangent_axes(normal: Vec3) -> (Vec3, Vec3) {
    let abs_n = normal.abs();
    let up = if abs_n.y >= abs_n.x && abs_n.y >= abs_n.z {
        // Normal is mostly Y, use Z as reference
        Vec3::Z
    } else {
        Vec3::Y
    };
    let u = up.cross(normal).normalize_or_zero();
    let v = normal.cross(u).normalize_or_zero();
    (u, v)
}

/// Face planes of an axis-aligned box centred on `center`.
pub fn cuboid_faces(center: Vec3, half_extents: Vec3) -> Vec<BrushFaceData> {
    [
        (Vec3::X, half_extents.x),
        (Vec3::NEG_X, half_extents.x),
        (Vec3::Y, half_extents.y),
        (Vec3::NEG_Y, half_extents.y),
        (Vec3::Z, half_extents.z),
        (Vec3::NEG_Z, half_extents.z),
    ]
    .into_iter()
    .map(|(normal, half)| BrushFaceData::from_plane(normal, half + normal.dot(center)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_cube_has_eight_vertices_and_six_quads() {
        let geometry = BrushGeometry::from_faces(&cuboid_faces(Vec3::ZERO, Vec3::ONE));
        assert_eq!(geometry.vertices.len(), 8);
        assert_eq!(geometry.face_polygons.len(), 6);
        assert!(geometry.face_polygons.iter().all(|p| p.len() == 4));
        assert!(geometry.validate().is_ok());
    }

    #[test]
    fn cube_edges_are_unique() {
        let geometry = BrushGeometry::from_faces(&cuboid_faces(Vec3::ZERO, Vec3::ONE));
        assert_eq!(geometry.edges().len(), 12);
    }

    #[test]
    fn offset_cuboid_is_centred() {
        let center = Vec3::new(4.0, -2.0, 8.0);
        let geometry = BrushGeometry::from_faces(&cuboid_faces(center, Vec3::splat(0.5)));
        let centroid = geometry.vertices.iter().sum::<Vec3>() / geometry.vertices.len() as f32;
        assert!((centroid - center).length() < EPSILON);
    }

    #[test]
    fn face_loops_wind_counter_clockwise_from_outside() {
        let geometry = BrushGeometry::from_faces(&cuboid_faces(Vec3::ZERO, Vec3::ONE));
        let faces = cuboid_faces(Vec3::ZERO, Vec3::ONE);
        for (polygon, face) in geometry.polygons().zip(&faces) {
            assert!(polygon.normal().dot(face.plane.normal) > 0.99);
        }
    }

    #[test]
    fn open_plane_set_fails_validation() {
        let faces = &cuboid_faces(Vec3::ZERO, Vec3::ONE)[..3];
        let geometry = BrushGeometry::from_faces(faces);
        assert!(matches!(
            geometry.validate(),
            Err(GeometryError::TooFewVertices(_))
        ));
    }

    #[test]
    fn tolerance_grows_with_distance_from_origin() {
        assert_eq!(tolerance_at(0.5), EPSILON);
        assert_eq!(tolerance_at(-3000.0), 3000.0 * RELATIVE_EPSILON);
        assert!(point_tolerance(Vec3::new(0.0, -2000.0, 10.0)) > EPSILON);
    }

    /// Drag one corner of a cube far from the origin through several hull
    /// rebuilds, the way the document edits brushes.
    fn drag_far_corner(center: Vec3, half: f32, delta: Vec3, steps: usize) {
        let mut faces = cuboid_faces(center, Vec3::splat(half));
        let mut corner = center + Vec3::splat(half);
        for step in 0..steps {
            let geometry = BrushGeometry::from_faces(&faces);
            assert_eq!(geometry.vertices.len(), 8, "step {step}");
            let index = geometry.find_vertex(corner).expect("corner survives");
            let mut moved = geometry.vertices.clone();
            moved[index] += delta;
            corner += delta;

            let (rebuilt, hull) = rebuild_faces_from_vertices(&faces, &moved).expect("hull");
            assert_eq!(hull.len(), 8, "step {step}");
            let geometry = BrushGeometry::from_faces(&rebuilt);
            assert_eq!(geometry.vertices.len(), hull.len(), "step {step}");
            assert!(geometry.validate().is_ok());
            faces = rebuilt;
        }
        let geometry = BrushGeometry::from_faces(&faces);
        assert!(geometry.find_vertex(corner).is_some());
    }

    #[test]
    fn far_brush_keeps_its_vertices_through_rebuilds() {
        drag_far_corner(Vec3::splat(1000.0), 32.0, Vec3::new(3.3, 1.7, 0.9), 4);
        drag_far_corner(Vec3::splat(3000.0), 64.0, Vec3::new(3.3, 1.7, 0.9), 4);
        drag_far_corner(Vec3::new(-8000.0, 200.0, 4000.0), 64.0, Vec3::new(-2.5, 0.75, 1.25), 3);
    }

    #[test]
    fn parallel_planes_do_not_intersect() {
        let a = BrushPlane {
            normal: Vec3::X,
            distance: 1.0,
        };
        let b = BrushPlane {
            normal: Vec3::NEG_X,
            distance: 1.0,
        };
        let c = BrushPlane {
            normal: Vec3::Y,
            distance: 1.0,
        };
        assert!(plane_triple_intersection(&a, &b, &c).is_none());
    }
}
