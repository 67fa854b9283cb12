use bevy::prelude::*;

use crate::brush::DocumentRevision;

pub struct SelectionPlugin;

impl Plugin for SelectionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Selection>()
            .add_systems(PostUpdate, bump_revision_on_selection_change)
            .add_observer(on_selected_removed);
    }
}

/// Marker on every brush open for handle editing.
#[derive(Component)]
pub struct Selected;

/// Brushes open for handle editing, in selection order. Their handles form
/// the tools' universe.
#[derive(Resource, Default)]
pub struct Selection {
    pub entities: Vec<Entity>,
}

impl Selection {
    /// Replace the selection with `entities`.
    ///
    /// Brushes staying selected keep their marker, so the removal observer
    /// never sees them.
    pub fn select_multiple(&mut self, commands: &mut Commands, entities: &[Entity]) {
        for entity in std::mem::take(&mut self.entities) {
            if entities.contains(&entity) {
                continue;
            }
            if let Ok(mut ec) = commands.get_entity(entity) {
                ec.remove::<Selected>();
            }
        }
        for &entity in entities {
            if !self.entities.contains(&entity) {
                self.entities.push(entity);
                commands.entity(entity).insert(Selected);
            }
        }
    }

    /// Add or remove one brush, keeping the rest.
    pub fn toggle(&mut self, commands: &mut Commands, entity: Entity) {
        if let Some(index) = self.entities.iter().position(|&e| e == entity) {
            self.entities.remove(index);
            if let Ok(mut ec) = commands.get_entity(entity) {
                ec.remove::<Selected>();
            }
        } else {
            self.entities.push(entity);
            commands.entity(entity).insert(Selected);
        }
    }

    pub fn clear(&mut self, commands: &mut Commands) {
        for entity in self.entities.drain(..) {
            if let Ok(mut ec) = commands.get_entity(entity) {
                ec.remove::<Selected>();
            }
        }
    }

    pub fn is_selected(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }
}

/// A different brush set is a different handle universe.
fn bump_revision_on_selection_change(
    selection: Res<Selection>,
    mut revision: ResMut<DocumentRevision>,
) {
    if selection.is_changed() && !selection.is_added() {
        revision.bump();
    }
}

/// Despawned brushes leave the selection.
fn on_selected_removed(trigger: On<Remove, Selected>, mut selection: ResMut<Selection>) {
    let entity = trigger.event_target();
    selection.entities.retain(|&e| e != entity);
}
