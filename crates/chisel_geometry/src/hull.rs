use std::collections::HashSet;

use avian3d::parry::math::Point as ParryPoint;
use avian3d::parry::transformation::convex_hull;
use bevy::prelude::*;

use crate::{
    BrushFaceData, BrushPlane, EPSILON, point_tolerance, sort_face_vertices_by_winding, tolerance_at,
};

fn vec3_to_point(v: Vec3) -> ParryPoint<f32> {
    ParryPoint::new(v.x, v.y, v.z)
}

fn point_to_vec3(p: &ParryPoint<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub struct HullFace {
    pub normal: Vec3,
    pub distance: f32,
    pub vertex_indices: Vec<usize>,
}

/// Merge the triangles from a convex hull into coplanar polygon faces.
pub fn merge_hull_triangles(vertices: &[Vec3], triangles: &[[u32; 3]]) -> Vec<HullFace> {
    let mut face_groups: Vec<(Vec3, f32, HashSet<usize>)> = Vec::new();

    for tri in triangles {
        let a = vertices[tri[0] as usize].as_dvec3();
        let b = vertices[tri[1] as usize].as_dvec3();
        let c = vertices[tri[2] as usize].as_dvec3();
        let normal = (b - a).cross(c - a).normalize_or_zero();
        if normal.length_squared() < 0.5 {
            continue; // degenerate triangle
        }
        let distance = normal.dot((a + b + c) / 3.0) as f32;
        let normal = normal.as_vec3();

        let corners = tri.iter().map(|&i| i as usize);
        let existing = face_groups.iter().position(|(gn, gd, _)| {
            gn.dot(normal) > 1.0 - EPSILON && (distance - *gd).abs() < tolerance_at(distance)
        });
        match existing {
            Some(index) => face_groups[index].2.extend(corners),
            None => face_groups.push((normal, distance, corners.collect())),
        }
    }

    face_groups
        .into_iter()
        .map(|(normal, distance, vert_set)| {
            let mut vertex_indices: Vec<usize> = vert_set.into_iter().collect();
            sort_face_vertices_by_winding(vertices, &mut vertex_indices, normal);
            HullFace {
                normal,
                distance,
                vertex_indices,
            }
        })
        .collect()
}

/// True when the points span a volume (not all coincident, collinear or coplanar).
fn spans_volume(points: &[Vec3]) -> bool {
    let Some(&origin) = points.first() else {
        return false;
    };
    let Some(&second) = points.iter().find(|p| (**p - origin).length() > EPSILON) else {
        return false;
    };
    let axis = second - origin;
    let Some(normal) = points
        .iter()
        .map(|p| axis.cross(*p - origin))
        .find(|n| n.length() > EPSILON)
    else {
        return false;
    };
    points
        .iter()
        .any(|p| normal.normalize().dot(*p - origin).abs() > EPSILON)
}

/// Rebuild brush faces around a new vertex cloud using its convex hull.
///
/// Texture attributes are carried over from the old face whose plane best
/// matches each new face. Returns the new faces and the hull's vertices, or
/// `None` when the cloud does not enclose a volume with at least four faces.
pub fn rebuild_faces_from_vertices(
    old_faces: &[BrushFaceData],
    new_vertices: &[Vec3],
) -> Option<(Vec<BrushFaceData>, Vec<Vec3>)> {
    if new_vertices.len() < 4 || !spans_volume(new_vertices) {
        return None;
    }

    let points: Vec<ParryPoint<f32>> = new_vertices.iter().map(|v| vec3_to_point(*v)).collect();
    let (hull_verts, hull_tris) = convex_hull(&points);

    if hull_verts.len() < 4 || hull_tris.is_empty() {
        return None;
    }

    let hull_positions: Vec<Vec3> = hull_verts.iter().map(point_to_vec3).collect();
    let hull_faces = merge_hull_triangles(&hull_positions, &hull_tris);

    if hull_faces.len() < 4 {
        return None;
    }

    let faces = hull_faces
        .iter()
        .map(|hull_face| {
            let template = best_matching_face(old_faces, hull_face, &hull_positions);
            BrushFaceData {
                plane: BrushPlane {
                    normal: hull_face.normal,
                    distance: hull_face.distance,
                },
                texture_path: template.and_then(|f| f.texture_path.clone()),
                uv_offset: template.map_or(Vec2::ZERO, |f| f.uv_offset),
                uv_scale: template.map_or(Vec2::ONE, |f| f.uv_scale),
                uv_rotation: template.map_or(0.0, |f| f.uv_rotation),
            }
        })
        .collect();

    Some((faces, hull_positions))
}

/// Old face with the most new-face vertices on its plane, ties broken by
/// normal similarity.
fn best_matching_face<'a>(
    old_faces: &'a [BrushFaceData],
    hull_face: &HullFace,
    hull_positions: &[Vec3],
) -> Option<&'a BrushFaceData> {
    old_faces
        .iter()
        .map(|old| {
            let on_plane = hull_face
                .vertex_indices
                .iter()
                .filter(|&&vi| {
                    let position = hull_positions[vi];
                    (old.plane.normal.dot(position) - old.plane.distance).abs()
                        < point_tolerance(position)
                })
                .count() as f32;
            let score = on_plane + hull_face.normal.dot(old.plane.normal) * 0.1;
            (old, score)
        })
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(old, _)| old)
}
