use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;

use skyreach_rs::audio::GameAudioPlugin;
use skyreach_rs::domain::{InputPlugin, PlayerPlugin, SessionPlugin, SimulationPlugin, UiPlugin};
use skyreach_rs::MenuCamera;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.35, 0.55, 0.78)))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 220.0,
        })
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "skyreach — rooftop platformer".into(),
                resolution: (1400., 900.).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((
            SessionPlugin,
            SimulationPlugin,
            PlayerPlugin,
            InputPlugin,
            UiPlugin,
            GameAudioPlugin,
        ))
        .add_systems(Startup, setup_menu_camera)
        .run();
}

fn setup_menu_camera(mut commands: Commands) {
    commands.spawn((
        Camera3dBundle {
            camera: Camera {
                hdr: true,
                ..default()
            },
            tonemapping: Tonemapping::TonyMcMapface,
            transform: Transform::from_xyz(-14.0, 10.0, 18.0)
                .looking_at(Vec3::new(0.0, 2.0, 0.0), Vec3::Y),
            ..default()
        },
        BloomSettings::default(),
        MenuCamera,
    ));
}
