//! First-person motion controller. Look runs in the variable-rate phase,
//! movement in the fixed-rate physics phase; the session layer flips the
//! input-enable switch and never touches the body directly.

use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;

use crate::domain::controls::FrameInput;
use crate::domain::session::{AppState, SessionState};

use super::{layers, ray_hits_top, Collider, DynamicBody, StaticCollider};

#[derive(Component)]
pub struct Player;

/// Child holding the camera; vertical look lives here so body yaw stays the
/// only rotation physics ever sees.
#[derive(Component, Default)]
pub struct PlayerHead {
    pub pitch: f32,
}

#[derive(Component, Default)]
pub struct Grounded(pub bool);

#[derive(Resource, Clone)]
pub struct PlayerSettings {
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Radians of rotation per pixel of mouse travel.
    pub look_sensitivity: f32,
    pub pitch_limit: f32,
    pub jump_speed: f32,
    /// Length of the downward ground ray, measured from the feet.
    pub ground_ray: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            walk_speed: 5.0,
            run_speed: 10.0,
            look_sensitivity: 0.0025,
            pitch_limit: 85.0_f32.to_radians(),
            jump_speed: 7.0,
            ground_ray: 0.3,
        }
    }
}

/// The input-enable switch flipped by the session state machine. While off,
/// look and move processing stop entirely; gravity does not.
#[derive(Resource)]
pub struct PlayerInputEnabled(pub bool);

impl Default for PlayerInputEnabled {
    fn default() -> Self {
        Self(true)
    }
}

pub fn input_enabled(enabled: Res<PlayerInputEnabled>) -> bool {
    enabled.0
}

/// Zero the horizontal velocity, leaving the vertical (gravity) component
/// untouched.
pub fn halt_horizontal(body: &mut DynamicBody) {
    body.linvel.x = 0.0;
    body.linvel.z = 0.0;
}

pub fn clamped_pitch(current: f32, delta: f32, limit: f32) -> f32 {
    (current + delta).clamp(-limit, limit)
}

/// Rotate the local move axes into world space by the body yaw, preserving
/// the existing vertical velocity.
pub fn desired_velocity(rotation: Quat, axes: Vec2, speed: f32, vertical: f32) -> Vec3 {
    let local = Vec3::new(axes.x, 0.0, -axes.y).normalize_or_zero() * speed;
    let mut world = rotation * local;
    world.y = vertical;
    world
}

pub fn spawn_player(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    position: Vec3,
) -> Entity {
    let body = commands
        .spawn((
            PbrBundle {
                mesh: meshes.add(Capsule3d::new(0.4, 1.0)),
                material: materials.add(Color::srgb(0.85, 0.9, 0.95)),
                transform: Transform::from_translation(position),
                ..default()
            },
            DynamicBody::default(),
            Collider {
                half_extents: Vec3::new(0.4, 0.9, 0.4),
            },
            Grounded::default(),
            Player,
        ))
        .id();

    let head = commands
        .spawn((
            SpatialBundle::from_transform(Transform::from_xyz(0.0, 0.7, 0.0)),
            PlayerHead::default(),
        ))
        .id();

    let camera = commands
        .spawn((
            Camera3dBundle {
                camera: Camera {
                    hdr: true,
                    ..default()
                },
                tonemapping: Tonemapping::TonyMcMapface,
                ..default()
            },
            BloomSettings::default(),
        ))
        .id();

    commands.entity(head).push_children(&[camera]);
    commands.entity(body).push_children(&[head]);
    body
}

pub fn player_look(
    input: Res<FrameInput>,
    settings: Res<PlayerSettings>,
    mut bodies: Query<&mut Transform, (With<Player>, Without<PlayerHead>)>,
    mut heads: Query<(&mut Transform, &mut PlayerHead), Without<Player>>,
) {
    let delta = input.look_delta;
    if delta == Vec2::ZERO {
        return;
    }
    let Ok(mut body) = bodies.get_single_mut() else {
        return;
    };
    body.rotate_y(-delta.x * settings.look_sensitivity);

    let Ok((mut head_tf, mut head)) = heads.get_single_mut() else {
        return;
    };
    head.pitch = clamped_pitch(
        head.pitch,
        -delta.y * settings.look_sensitivity,
        settings.pitch_limit,
    );
    head_tf.rotation = Quat::from_rotation_x(head.pitch);
}

pub fn apply_player_movement(
    mut input: ResMut<FrameInput>,
    settings: Res<PlayerSettings>,
    mut players: Query<(&Transform, &mut DynamicBody, &Grounded), With<Player>>,
) {
    let Ok((transform, mut body, grounded)) = players.get_single_mut() else {
        return;
    };
    let speed = if input.run {
        settings.run_speed
    } else {
        settings.walk_speed
    };
    body.linvel = desired_velocity(transform.rotation, input.move_axes, speed, body.linvel.y);

    if input.take_jump() && grounded.0 {
        body.linvel.y = settings.jump_speed;
    }
}

pub fn update_grounded(
    settings: Res<PlayerSettings>,
    statics: Query<(&Transform, &StaticCollider)>,
    mut players: Query<(&Transform, &Collider, &mut Grounded), (With<Player>, Without<StaticCollider>)>,
) {
    let Ok((transform, collider, mut grounded)) = players.get_single_mut() else {
        return;
    };
    // cast from just inside the feet so resting contact still registers
    let feet = transform.translation - Vec3::Y * (collider.half_extents.y - 0.05);
    let reach = settings.ground_ray + 0.05;
    grounded.0 = statics.iter().any(|(tf, col)| {
        col.layers & layers::GROUND != 0 && ray_hits_top(feet, reach, tf.translation, col.half_extents)
    });
}

/// Flipped on by the session layer whenever play resumes.
pub fn on_input_enabled(mut enabled: ResMut<PlayerInputEnabled>) {
    enabled.0 = true;
}

/// Flipped off on pause and on terminal states: horizontal motion stops at
/// once, queued input is dropped, gravity keeps acting.
pub fn on_input_disabled(
    mut enabled: ResMut<PlayerInputEnabled>,
    mut input: ResMut<FrameInput>,
    mut players: Query<&mut DynamicBody, With<Player>>,
) {
    enabled.0 = false;
    input.clear();
    match players.get_single_mut() {
        Ok(mut body) => halt_horizontal(&mut body),
        Err(_) => debug!("input disabled with no player body present"),
    }
}

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerSettings>()
            .init_resource::<PlayerInputEnabled>()
            .add_systems(
                Update,
                player_look
                    .run_if(input_enabled)
                    .run_if(in_state(AppState::InGame))
                    .run_if(in_state(SessionState::Playing)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halt_horizontal_preserves_vertical_velocity() {
        let mut body = DynamicBody {
            linvel: Vec3::new(4.0, -9.0, 2.5),
            ..default()
        };
        halt_horizontal(&mut body);
        assert_eq!(body.linvel, Vec3::new(0.0, -9.0, 0.0));
    }

    #[test]
    fn pitch_clamps_at_the_configured_limit() {
        let limit = 85.0_f32.to_radians();
        assert_eq!(clamped_pitch(0.0, 4.0, limit), limit);
        assert_eq!(clamped_pitch(0.0, -4.0, limit), -limit);
        let mid = clamped_pitch(0.2, 0.1, limit);
        assert!((mid - 0.3).abs() < 1e-6);
    }

    #[test]
    fn forward_input_moves_along_facing_and_keeps_fall_speed() {
        // facing +X after a -90 degree yaw
        let yaw = Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2);
        let vel = desired_velocity(yaw, Vec2::new(0.0, 1.0), 5.0, -3.0);
        assert!((vel.x - 5.0).abs() < 1e-4);
        assert!(vel.z.abs() < 1e-4);
        assert_eq!(vel.y, -3.0);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let vel = desired_velocity(Quat::IDENTITY, Vec2::new(1.0, 1.0), 5.0, 0.0);
        let horizontal = Vec2::new(vel.x, vel.z).length();
        assert!((horizontal - 5.0).abs() < 1e-4);
    }

    #[test]
    fn zero_input_stops_horizontal_motion() {
        let vel = desired_velocity(Quat::IDENTITY, Vec2::ZERO, 5.0, -2.0);
        assert_eq!(vel, Vec3::new(0.0, -2.0, 0.0));
    }
}
