pub mod brush;
pub mod document;
pub mod handles;
pub mod interaction;
pub mod preferences;
pub mod selection;
pub mod textures;
pub mod tools;

use std::path::PathBuf;

use bevy::prelude::*;

/// Brush handle editing: brushes, selection, undo history, preferences and
/// the vertex/edge/face tools.
pub struct ChiselPlugin {
    /// Preferences file loaded at startup, `None` for defaults.
    pub preferences: Option<PathBuf>,
}

impl Default for ChiselPlugin {
    fn default() -> Self {
        Self {
            preferences: preferences::PreferencesPlugin::default().path,
        }
    }
}

impl Plugin for ChiselPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            brush::BrushPlugin,
            selection::SelectionPlugin,
            chisel_commands::CommandHistoryPlugin,
            preferences::PreferencesPlugin {
                path: self.preferences.clone(),
            },
            interaction::HandleInteractionPlugin,
        ));
    }
}
