use bevy::prelude::*;
use chisel_commands::EditorCommand;
use chisel_geometry::{BrushFaceData, BrushGeometry, BrushPlane, cuboid_faces};

pub struct BrushPlugin;

impl Plugin for BrushPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Brush>()
            .register_type::<BrushFaceData>()
            .register_type::<BrushPlane>()
            .init_resource::<DocumentRevision>();
    }
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Canonical brush data: outward face planes. Geometry is derived from this.
#[derive(Component, Reflect, Clone, Debug, Default, PartialEq)]
#[reflect(Component, Default)]
pub struct Brush {
    pub faces: Vec<BrushFaceData>,
}

impl Brush {
    pub fn cuboid(half_x: f32, half_y: f32, half_z: f32) -> Self {
        Self {
            faces: cuboid_faces(Vec3::ZERO, Vec3::new(half_x, half_y, half_z)),
        }
    }

    /// Axis-aligned box between two corners, in brush-local space.
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            faces: cuboid_faces((min + max) * 0.5, (max - min) * 0.5),
        }
    }

    pub fn geometry(&self) -> BrushGeometry {
        BrushGeometry::from_faces(&self.faces)
    }
}

/// Counter bumped by every document mutation (apply, undo, redo) and by
/// selection changes. Handle sets built at an older revision are stale.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRevision(pub u64);

impl DocumentRevision {
    pub fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

fn bump_revision(world: &mut World) {
    if let Some(mut revision) = world.get_resource_mut::<DocumentRevision>() {
        revision.bump();
    }
}

// ---------------------------------------------------------------------------
// Undo command
// ---------------------------------------------------------------------------

pub struct SetBrush {
    pub entity: Entity,
    pub old: Brush,
    pub new: Brush,
    pub label: String,
}

impl EditorCommand for SetBrush {
    fn execute(&self, world: &mut World) {
        if let Some(mut brush) = world.get_mut::<Brush>(self.entity) {
            *brush = self.new.clone();
        }
        bump_revision(world);
    }

    fn undo(&self, world: &mut World) {
        if let Some(mut brush) = world.get_mut::<Brush>(self.entity) {
            *brush = self.old.clone();
        }
        bump_revision(world);
    }

    fn description(&self) -> &str {
        &self.label
    }
}
