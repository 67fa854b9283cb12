use std::path::PathBuf;

use anyhow::Context;
use bevy::prelude::*;
use chisel::{ChiselPlugin, brush::Brush, preferences::Preferences, selection::Selection};

fn main() -> anyhow::Result<()> {
    let preferences = std::env::args_os().nth(1).map(PathBuf::from);
    if let Some(path) = &preferences {
        Preferences::load(path)
            .with_context(|| format!("loading preferences from {}", path.display()))?;
    }

    let exit = App::new()
        .add_plugins((DefaultPlugins, ChiselPlugin { preferences }))
        .add_systems(Startup, spawn_scene)
        .run();
    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => anyhow::bail!("editor exited with code {code}"),
    }
}

fn spawn_scene(mut commands: Commands, mut selection: ResMut<Selection>) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(5.0, 4.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            illuminance: 10000.0,
            ..default()
        },
        Transform::from_xyz(10.0, 20.0, 10.0)
            .with_rotation(Quat::from_euler(EulerRot::XYZ, -0.8, 0.4, 0.0)),
    ));

    // Two boxes sharing a face, both open for editing (press ` to start).
    let floor = commands
        .spawn((
            Name::new("Floor"),
            Brush::from_corners(Vec3::new(-2.0, -0.5, -2.0), Vec3::new(0.0, 0.0, 2.0)),
            Transform::default(),
        ))
        .id();
    let step = commands
        .spawn((
            Name::new("Step"),
            Brush::from_corners(Vec3::new(0.0, -0.5, -2.0), Vec3::new(2.0, 0.5, 2.0)),
            Transform::default(),
        ))
        .id();
    selection.select_multiple(&mut commands, &[floor, step]);
}
