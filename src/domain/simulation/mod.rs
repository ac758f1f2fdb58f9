//! Authoritative game state: dynamic bodies, the fixed-rate physics phase,
//! level content, and the zones that feed the session state machine.
//!
//! The physics here is intentionally thin. Bodies are axis-aligned boxes,
//! platforms are static boxes, and grounding is a single downward ray; the
//! session layer only ever reads positions and velocities and writes them
//! back through the respawn contracts.

use bevy::prelude::*;
use rand::Rng;

use crate::domain::session::{self, AppState, SessionState};

pub mod goal;
pub mod level;
pub mod player;
pub mod respawn;

/// Collision category bits carried by static geometry. The ground ray only
/// accepts GROUND surfaces, so rails and trim can block movement without
/// granting jumps.
pub mod layers {
    pub const NONE: u8 = 0;
    pub const GROUND: u8 = 1 << 0;
}

#[derive(Resource, Clone)]
pub struct PhysicsSettings {
    pub gravity: f32,
    pub max_fall_speed: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: 19.62,
            max_fall_speed: 40.0,
        }
    }
}

/// A simulated body. Kinematic bodies integrate but ignore gravity and
/// collision response; they are also excluded from respawn tracking.
#[derive(Component, Debug, Clone, Default)]
pub struct DynamicBody {
    pub linvel: Vec3,
    pub angvel: Vec3,
    pub kinematic: bool,
}

/// Axis-aligned collision box of a dynamic body.
#[derive(Component, Debug, Clone, Copy)]
pub struct Collider {
    pub half_extents: Vec3,
}

/// Axis-aligned collision box of level geometry.
#[derive(Component, Debug, Clone, Copy)]
pub struct StaticCollider {
    pub half_extents: Vec3,
    pub layers: u8,
}

/// Marks a body that has been taken out of the world pending a delayed
/// recovery. Suspended bodies are hidden and skip every physics system.
#[derive(Component)]
pub struct Suspended;

pub fn aabb_contains(center: Vec3, half_extents: Vec3, point: Vec3) -> bool {
    let delta = (point - center).abs();
    delta.x <= half_extents.x && delta.y <= half_extents.y && delta.z <= half_extents.z
}

/// Downward ray test against the top face of a box. Hits only when the ray
/// origin is above the face and within `max_dist` of it.
pub fn ray_hits_top(origin: Vec3, max_dist: f32, center: Vec3, half_extents: Vec3) -> bool {
    if (origin.x - center.x).abs() > half_extents.x
        || (origin.z - center.z).abs() > half_extents.z
    {
        return false;
    }
    let top = center.y + half_extents.y;
    top <= origin.y && origin.y - top <= max_dist
}

/// Push an overlapping box out of a static box along the axis of least
/// penetration, killing the velocity component that points into the surface.
/// Returns whether there was an overlap.
pub fn resolve_aabb_collision(
    pos: &mut Vec3,
    vel: &mut Vec3,
    half_extents: Vec3,
    center: Vec3,
    c_half_extents: Vec3,
) -> bool {
    let delta = *pos - center;
    let overlap = half_extents + c_half_extents - delta.abs();
    if overlap.x <= 0.0 || overlap.y <= 0.0 || overlap.z <= 0.0 {
        return false;
    }

    if overlap.y <= overlap.x && overlap.y <= overlap.z {
        pos.y += overlap.y * delta.y.signum();
        if vel.y * delta.y < 0.0 {
            vel.y = 0.0;
        }
    } else if overlap.x <= overlap.z {
        pos.x += overlap.x * delta.x.signum();
        if vel.x * delta.x < 0.0 {
            vel.x = 0.0;
        }
    } else {
        pos.z += overlap.z * delta.z.signum();
        if vel.z * delta.z < 0.0 {
            vel.z = 0.0;
        }
    }
    true
}

fn apply_gravity(
    time: Res<Time>,
    physics: Res<PhysicsSettings>,
    mut bodies: Query<&mut DynamicBody, Without<Suspended>>,
) {
    let dt = time.delta_seconds();
    for mut body in &mut bodies {
        if body.kinematic {
            continue;
        }
        body.linvel.y = (body.linvel.y - physics.gravity * dt).max(-physics.max_fall_speed);
    }
}

fn integrate_bodies(
    time: Res<Time>,
    mut bodies: Query<(&mut Transform, &DynamicBody), Without<Suspended>>,
) {
    let dt = time.delta_seconds();
    for (mut transform, body) in &mut bodies {
        transform.translation += body.linvel * dt;
        if body.angvel != Vec3::ZERO {
            let spin = Quat::from_scaled_axis(body.angvel * dt);
            transform.rotation = (spin * transform.rotation).normalize();
        }
    }
}

fn resolve_collisions(
    statics: Query<(&Transform, &StaticCollider)>,
    mut bodies: Query<
        (&mut Transform, &mut DynamicBody, &Collider),
        (Without<StaticCollider>, Without<Suspended>),
    >,
) {
    for (mut transform, mut body, collider) in &mut bodies {
        if body.kinematic {
            continue;
        }
        for (static_tf, static_col) in &statics {
            resolve_aabb_collision(
                &mut transform.translation,
                &mut body.linvel,
                collider.half_extents,
                static_tf.translation,
                static_col.half_extents,
            );
        }
    }
}

// ── Transient burst effects ─────────────────────────────────────────────────

pub const EFFECT_LIFETIME: f32 = 0.6;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BurstKind {
    Death,
    Win,
    Checkpoint,
}

#[derive(Resource)]
pub struct EffectAssets {
    shard: Handle<Mesh>,
    death: Handle<StandardMaterial>,
    win: Handle<StandardMaterial>,
    checkpoint: Handle<StandardMaterial>,
}

/// Remaining seconds before a transient entity self-destructs.
#[derive(Component)]
pub struct Lifespan(pub f32);

#[derive(Component)]
pub struct EffectParticle {
    pub vel: Vec3,
}

fn init_effect_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let glowing = |base: Color, emissive: LinearRgba| StandardMaterial {
        base_color: base,
        emissive,
        ..default()
    };
    commands.insert_resource(EffectAssets {
        shard: meshes.add(Cuboid::new(0.12, 0.12, 0.12)),
        death: materials.add(glowing(
            Color::srgb(0.9, 0.2, 0.15),
            LinearRgba::rgb(4.0, 0.4, 0.3),
        )),
        win: materials.add(glowing(
            Color::srgb(1.0, 0.85, 0.3),
            LinearRgba::rgb(5.0, 4.0, 1.0),
        )),
        checkpoint: materials.add(glowing(
            Color::srgb(0.3, 0.7, 1.0),
            LinearRgba::rgb(0.8, 2.5, 5.0),
        )),
    });
}

/// Scatter a handful of short-lived glowing shards; they expire on their own.
pub fn spawn_burst(commands: &mut Commands, effects: &EffectAssets, origin: Vec3, kind: BurstKind) {
    let mut rng = rand::thread_rng();
    let material = match kind {
        BurstKind::Death => effects.death.clone(),
        BurstKind::Win => effects.win.clone(),
        BurstKind::Checkpoint => effects.checkpoint.clone(),
    };
    for _ in 0..24 {
        let dir = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(0.2..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .normalize_or_zero();
        let vel = dir * rng.gen_range(2.0..6.0);
        let mut particle = commands.spawn((
            PbrBundle {
                mesh: effects.shard.clone(),
                material: material.clone(),
                transform: Transform::from_translation(origin),
                ..default()
            },
            EffectParticle { vel },
            Lifespan(EFFECT_LIFETIME),
        ));
        if kind == BurstKind::Win {
            particle.insert(goal::GoalEffect);
        }
    }
}

fn update_effects(time: Res<Time>, mut particles: Query<(&mut Transform, &mut EffectParticle)>) {
    let dt = time.delta_seconds();
    for (mut transform, mut particle) in &mut particles {
        particle.vel.y -= 9.81 * dt;
        let delta = particle.vel * dt;
        transform.translation += delta;
    }
}

fn tick_lifespans(
    time: Res<Time>,
    mut commands: Commands,
    mut transients: Query<(Entity, &mut Lifespan)>,
) {
    let dt = time.delta_seconds();
    for (entity, mut lifespan) in &mut transients {
        lifespan.0 -= dt;
        if lifespan.0 <= 0.0 {
            commands.entity(entity).despawn_recursive();
        }
    }
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PhysicsSettings>()
            .init_resource::<respawn::RespawnRegistry>()
            .init_resource::<respawn::PendingRecoveries>()
            .init_resource::<level::LevelCatalog>()
            .add_event::<level::LevelRequest>()
            .add_event::<respawn::RecoveryDue>()
            .add_event::<respawn::SoftReset>()
            .add_systems(Startup, init_effect_assets)
            .add_systems(
                FixedUpdate,
                (
                    player::apply_player_movement.run_if(player::input_enabled),
                    apply_gravity,
                    integrate_bodies,
                    resolve_collisions,
                    player::update_grounded,
                    respawn::detect_fallen_bodies,
                    respawn::update_checkpoints,
                    goal::detect_goal,
                )
                    .chain()
                    .run_if(in_state(AppState::InGame))
                    .run_if(in_state(SessionState::Playing)),
            )
            .add_systems(
                Update,
                (
                    respawn::register_spawned_bodies,
                    respawn::apply_recoveries.after(session::drain_scheduler),
                    respawn::handle_soft_reset,
                    update_effects,
                    tick_lifespans,
                )
                    .run_if(in_state(AppState::InGame)),
            )
            .add_systems(Update, level::handle_level_requests)
            .add_systems(OnEnter(AppState::Menu), level::activate_menu_camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_contains_is_inclusive() {
        let center = Vec3::new(0.0, -15.0, 0.0);
        let half = Vec3::new(10.0, 5.0, 10.0);
        assert!(aabb_contains(center, half, Vec3::new(0.0, -12.0, 0.0)));
        assert!(aabb_contains(center, half, Vec3::new(10.0, -20.0, 10.0)));
        assert!(!aabb_contains(center, half, Vec3::new(0.0, -9.9, 0.0)));
    }

    #[test]
    fn ground_ray_only_hits_tops_within_reach() {
        let center = Vec3::ZERO;
        let half = Vec3::new(2.0, 0.5, 2.0);
        // standing just above the top face
        assert!(ray_hits_top(Vec3::new(0.0, 0.7, 0.0), 0.3, center, half));
        // too high
        assert!(!ray_hits_top(Vec3::new(0.0, 1.0, 0.0), 0.3, center, half));
        // outside the footprint
        assert!(!ray_hits_top(Vec3::new(3.0, 0.7, 0.0), 0.3, center, half));
        // below the face
        assert!(!ray_hits_top(Vec3::new(0.0, 0.2, 0.0), 0.3, center, half));
    }

    #[test]
    fn landing_resolves_upward_and_kills_fall_speed() {
        let mut pos = Vec3::new(0.0, 0.8, 0.0);
        let mut vel = Vec3::new(3.0, -10.0, 0.0);
        let hit = resolve_aabb_collision(
            &mut pos,
            &mut vel,
            Vec3::new(0.4, 0.9, 0.4),
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(5.0, 0.5, 5.0),
        );
        assert!(hit);
        assert_eq!(vel.y, 0.0);
        assert_eq!(vel.x, 3.0);
        assert!((pos.y - 0.9).abs() < 1e-4);
    }

    #[test]
    fn separated_boxes_do_not_resolve() {
        let mut pos = Vec3::new(0.0, 5.0, 0.0);
        let mut vel = Vec3::new(0.0, -1.0, 0.0);
        let hit = resolve_aabb_collision(
            &mut pos,
            &mut vel,
            Vec3::splat(0.5),
            Vec3::ZERO,
            Vec3::splat(1.0),
        );
        assert!(!hit);
        assert_eq!(pos, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(vel.y, -1.0);
    }
}
