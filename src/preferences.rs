use std::fs;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub struct PreferencesPlugin {
    /// File to load from at startup. Defaults are used when `None`.
    pub path: Option<PathBuf>,
}

impl Default for PreferencesPlugin {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("chisel_preferences.json")),
        }
    }
}

impl Plugin for PreferencesPlugin {
    fn build(&self, app: &mut App) {
        let preferences = match &self.path {
            Some(path) => Preferences::load_or_default(path),
            None => Preferences::default(),
        };
        app.insert_resource(ClearColor(preferences.background()))
            .insert_resource(preferences)
            .add_systems(Update, sync_clear_color);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("could not access preferences file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed preferences: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid preference `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// sRGBA colour with channels in `0.0..=1.0`.
pub type Rgba = [f32; 4];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HandleColors {
    pub vertex: Rgba,
    pub edge: Rgba,
    pub face: Rgba,
    pub selected: Rgba,
    pub highlighted: Rgba,
}

impl Default for HandleColors {
    fn default() -> Self {
        Self {
            vertex: [1.0, 1.0, 1.0, 1.0],
            edge: [0.9, 0.9, 0.9, 1.0],
            face: [0.8, 0.8, 1.0, 1.0],
            selected: [1.0, 0.5, 0.0, 1.0],
            highlighted: [1.0, 1.0, 0.3, 1.0],
        }
    }
}

/// Editor preferences persisted as JSON.
#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Preferences {
    /// Pick tolerance around a handle centre, in screen pixels.
    pub handle_radius: f32,
    /// Hits further along the pick ray than this are ignored.
    pub max_pick_distance: f32,
    /// 3D view background.
    pub background: Rgba,
    pub handles: HandleColors,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            handle_radius: 4.0,
            max_pick_distance: 10_000.0,
            background: [0.0, 0.0, 0.0, 1.0],
            handles: HandleColors::default(),
        }
    }
}

fn srgba(rgba: Rgba) -> Color {
    Color::srgba(rgba[0], rgba[1], rgba[2], rgba[3])
}

impl Preferences {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let content = fs::read_to_string(path)?;
        let preferences: Self = serde_json::from_str(&content)?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Load `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(preferences) => preferences,
            Err(err) => {
                warn!("Ignoring preferences at {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let path = path.as_ref();
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Preferences saved to {}", path.display());
        Ok(())
    }

    pub fn can_reset_to_defaults(&self) -> bool {
        *self != Self::default()
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }

    pub fn validate(&self) -> Result<(), PreferencesError> {
        if !self.handle_radius.is_finite() || self.handle_radius <= 0.0 {
            return Err(PreferencesError::Invalid {
                field: "handle_radius",
                reason: format!("{} is not a positive pixel count", self.handle_radius),
            });
        }
        if self.max_pick_distance.is_nan() || self.max_pick_distance <= 0.0 {
            return Err(PreferencesError::Invalid {
                field: "max_pick_distance",
                reason: format!("{} is not a positive distance", self.max_pick_distance),
            });
        }
        let colors = [
            ("background", self.background),
            ("handles.vertex", self.handles.vertex),
            ("handles.edge", self.handles.edge),
            ("handles.face", self.handles.face),
            ("handles.selected", self.handles.selected),
            ("handles.highlighted", self.handles.highlighted),
        ];
        for (field, rgba) in colors {
            if rgba.iter().any(|c| !(0.0..=1.0).contains(c)) {
                return Err(PreferencesError::Invalid {
                    field,
                    reason: format!("{rgba:?} has a channel outside 0..=1"),
                });
            }
        }
        Ok(())
    }

    pub fn background(&self) -> Color {
        srgba(self.background)
    }

    pub fn vertex_color(&self) -> Color {
        srgba(self.handles.vertex)
    }

    pub fn edge_color(&self) -> Color {
        srgba(self.handles.edge)
    }

    pub fn face_color(&self) -> Color {
        srgba(self.handles.face)
    }

    pub fn selected_color(&self) -> Color {
        srgba(self.handles.selected)
    }

    pub fn highlighted_color(&self) -> Color {
        srgba(self.handles.highlighted)
    }
}

fn sync_clear_color(preferences: Res<Preferences>, mut clear_color: ResMut<ClearColor>) {
    if preferences.is_changed() {
        clear_color.0 = preferences.background();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("chisel-prefs-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn defaults_are_valid_and_not_resettable() {
        let preferences = Preferences::default();
        assert!(preferences.validate().is_ok());
        assert!(!preferences.can_reset_to_defaults());
        assert_eq!(preferences.handle_radius, 4.0);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut preferences = Preferences {
            handle_radius: 9.0,
            ..default()
        };
        assert!(preferences.can_reset_to_defaults());
        preferences.reset_to_defaults();
        assert_eq!(preferences, Preferences::default());
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("save_then_load.json");
        let mut preferences = Preferences::default();
        preferences.handle_radius = 6.0;
        preferences.handles.selected = [0.0, 1.0, 0.0, 1.0];
        preferences.save(&path).expect("save");

        assert_eq!(Preferences::load(&path).expect("load"), preferences);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let preferences: Preferences =
            serde_json::from_str(r#"{ "handle_radius": 2.5 }"#).expect("parse");
        assert_eq!(preferences.handle_radius, 2.5);
        assert_eq!(preferences.handles, HandleColors::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let preferences = Preferences {
            handle_radius: 0.0,
            ..default()
        };
        assert!(matches!(
            preferences.validate(),
            Err(PreferencesError::Invalid {
                field: "handle_radius",
                ..
            })
        ));

        let mut preferences = Preferences::default();
        preferences.handles.edge = [1.5, 0.0, 0.0, 1.0];
        assert!(preferences.validate().is_err());
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let path = temp_path("broken.json");
        fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        fs::write(&path, "not json").expect("write");
        assert!(matches!(Preferences::load(&path), Err(PreferencesError::Json(_))));
        assert_eq!(Preferences::load_or_default(&path), Preferences::default());
        let _ = fs::remove_file(&path);
    }
}
