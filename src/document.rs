//! The document facade the handle tools edit through.
//!
//! Every mutation is a transaction: either every affected brush is rebuilt and
//! one undoable command lands in the history, or nothing changes and the call
//! reports `false`.

use bevy::prelude::*;
use chisel_commands::{CommandGroup, CommandHistory, EditorCommand};
use chisel_geometry::{
    BrushGeometry, EPSILON, Polygon3, Segment3, points_approx_eq, rebuild_faces_from_vertices,
};

use crate::brush::{Brush, DocumentRevision, SetBrush};
use crate::selection::Selection;

/// One brush open for handle editing, with its geometry in world space.
#[derive(Clone, Debug)]
pub struct EditedBrush {
    pub entity: Entity,
    pub geometry: BrushGeometry,
}

/// What the handle tools need from the document.
pub trait MapDocument {
    /// Bumped by every applied, undone or redone mutation.
    fn revision(&self) -> u64;

    /// The brushes whose handles are editable, in world space.
    fn edited_brushes(&self) -> Vec<EditedBrush>;

    fn move_vertices(&mut self, name: &str, positions: Vec<Vec3>, delta: Vec3) -> bool;

    fn move_edges(&mut self, name: &str, edges: Vec<Segment3>, delta: Vec3) -> bool;

    fn move_faces(&mut self, name: &str, faces: Vec<Polygon3>, delta: Vec3) -> bool;

    /// Remove the given vertices. Positions may repeat.
    fn remove_vertices(&mut self, name: &str, positions: Vec<Vec3>) -> bool;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("no edited brush has a vertex at any of the given positions")]
    NoMatchingVertices,
    #[error("brush {0:?} no longer exists")]
    MissingBrush(Entity),
    #[error("brush {0:?} would not enclose a volume")]
    DegenerateBrush(Entity),
    #[error("brush {0:?} would lose a vertex inside its hull")]
    VertexAbsorbed(Entity),
    #[error("brush {entity:?} would keep only {remaining} vertices")]
    TooFewVertices { entity: Entity, remaining: usize },
}

#[derive(Clone, Copy, Debug)]
enum VertexEdit {
    Translate(Vec3),
    Remove,
}

// ---------------------------------------------------------------------------
// WorldDocument
// ---------------------------------------------------------------------------

/// [`MapDocument`] over a Bevy world: brushes are `Brush` entities, the
/// editing universe is the [`Selection`], and edits go through the
/// [`CommandHistory`] as `SetBrush` commands.
pub struct WorldDocument<'w> {
    world: &'w mut World,
}

impl<'w> WorldDocument<'w> {
    pub fn new(world: &'w mut World) -> Self {
        world.init_resource::<CommandHistory>();
        world.init_resource::<DocumentRevision>();
        Self { world }
    }

    pub fn brush(&self, entity: Entity) -> Option<&Brush> {
        self.world.get::<Brush>(entity)
    }

    /// Pixel size of a face texture, once the asset server has loaded it.
    pub fn texture_size(&self, path: &str) -> Option<UVec2> {
        let handle = self
            .world
            .get_resource::<AssetServer>()?
            .get_handle::<Image>(bevy::asset::AssetPath::parse(path))?;
        let image = self.world.get_resource::<Assets<Image>>()?.get(&handle)?;
        Some(image.size())
    }

    fn brush_to_world(&self, entity: Entity) -> Option<(Brush, GlobalTransform)> {
        let brush = self.world.get::<Brush>(entity)?.clone();
        let transform = self
            .world
            .get::<GlobalTransform>(entity)
            .copied()
            .unwrap_or_default();
        Some((brush, transform))
    }

    /// Build one `SetBrush` per brush touched by `edit`, or fail without
    /// side effects.
    fn plan(&self, name: &str, targets: &[Vec3], edit: VertexEdit) -> Result<Vec<SetBrush>, EditError> {
        let mut commands = Vec::new();
        for edited in self.edited_brushes() {
            let (brush, transform) = self
                .brush_to_world(edited.entity)
                .ok_or(EditError::MissingBrush(edited.entity))?;
            let to_local = transform.affine().inverse();

            let matched: Vec<bool> = edited
                .geometry
                .vertices
                .iter()
                .map(|v| targets.iter().any(|t| points_approx_eq(*v, *t, EPSILON)))
                .collect();
            if !matched.contains(&true) {
                continue;
            }

            let new_vertices: Vec<Vec3> = match edit {
                VertexEdit::Translate(delta) => edited
                    .geometry
                    .vertices
                    .iter()
                    .zip(&matched)
                    .map(|(v, &moved)| to_local.transform_point3(if moved { *v + delta } else { *v }))
                    .collect(),
                VertexEdit::Remove => edited
                    .geometry
                    .vertices
                    .iter()
                    .zip(&matched)
                    .filter(|(_, moved)| !**moved)
                    .map(|(v, _)| to_local.transform_point3(*v))
                    .collect(),
            };

            if matches!(edit, VertexEdit::Remove) && new_vertices.len() < 4 {
                return Err(EditError::TooFewVertices {
                    entity: edited.entity,
                    remaining: new_vertices.len(),
                });
            }

            let (faces, hull) = rebuild_faces_from_vertices(&brush.faces, &new_vertices)
                .ok_or(EditError::DegenerateBrush(edited.entity))?;

            // Every requested vertex must survive as a corner of the new hull.
            if matches!(edit, VertexEdit::Translate(_)) && hull.len() != new_vertices.len() {
                return Err(EditError::VertexAbsorbed(edited.entity));
            }
            let rebuilt = BrushGeometry::from_faces(&faces);
            if rebuilt.validate().is_err() || rebuilt.vertices.len() != hull.len() {
                return Err(EditError::DegenerateBrush(edited.entity));
            }

            commands.push(SetBrush {
                entity: edited.entity,
                old: brush,
                new: Brush { faces },
                label: name.to_string(),
            });
        }

        if commands.is_empty() {
            return Err(EditError::NoMatchingVertices);
        }
        Ok(commands)
    }

    fn apply(&mut self, name: &str, targets: &[Vec3], edit: VertexEdit) -> bool {
        let commands = match self.plan(name, targets, edit) {
            Ok(commands) => commands,
            Err(err) => {
                debug!("{name} rejected: {err}");
                return false;
            }
        };

        let brush_count = commands.len();
        let command = CommandGroup {
            commands: commands
                .into_iter()
                .map(|c| Box::new(c) as Box<dyn EditorCommand>)
                .collect(),
            label: name.to_string(),
        };

        self.world
            .resource_scope(|world, mut history: Mut<CommandHistory>| {
                history.execute(Box::new(command), world);
            });
        debug!("{name}: rebuilt {brush_count} brush(es)");
        true
    }
}

impl MapDocument for WorldDocument<'_> {
    fn revision(&self) -> u64 {
        self.world
            .get_resource::<DocumentRevision>()
            .map_or(0, |revision| revision.0)
    }

    fn edited_brushes(&self) -> Vec<EditedBrush> {
        let Some(selection) = self.world.get_resource::<Selection>() else {
            return Vec::new();
        };
        selection
            .entities
            .iter()
            .filter_map(|&entity| {
                let (brush, transform) = self.brush_to_world(entity)?;
                Some(EditedBrush {
                    entity,
                    geometry: brush
                        .geometry()
                        .map_vertices(|v| transform.transform_point(v)),
                })
            })
            .collect()
    }

    fn move_vertices(&mut self, name: &str, positions: Vec<Vec3>, delta: Vec3) -> bool {
        self.apply(name, &positions, VertexEdit::Translate(delta))
    }

    fn move_edges(&mut self, name: &str, edges: Vec<Segment3>, delta: Vec3) -> bool {
        let positions: Vec<Vec3> = edges.iter().flat_map(|e| [e.start(), e.end()]).collect();
        self.apply(name, &positions, VertexEdit::Translate(delta))
    }

    fn move_faces(&mut self, name: &str, faces: Vec<Polygon3>, delta: Vec3) -> bool {
        let positions = Polygon3::vertices_of(&faces);
        self.apply(name, &positions, VertexEdit::Translate(delta))
    }

    fn remove_vertices(&mut self, name: &str, positions: Vec<Vec3>) -> bool {
        self.apply(name, &positions, VertexEdit::Remove)
    }
}
