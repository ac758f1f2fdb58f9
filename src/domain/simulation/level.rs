//! Built-in level catalog and the load/teardown path. Loading despawns the
//! previous level instance wholesale, invalidates everything it scheduled,
//! and hands the clock a structured [`LevelConfig`] record.

use bevy::prelude::*;

use crate::domain::controls::FrameInput;
use crate::domain::session::clock::LevelClock;
use crate::domain::session::scheduler::Scheduler;
use crate::domain::session::{AppState, SessionState};
use crate::MenuCamera;

use super::goal::GoalZone;
use super::player;
use super::respawn::{CheckpointZone, FallZone, PendingRecoveries, RespawnRegistry};
use super::{layers, Collider, DynamicBody, Lifespan, StaticCollider};

pub const DEFAULT_TIME: f32 = 15.0;
pub const WARNING_TIME: f32 = 5.0;

/// Everything spawned for one level instance; torn down in one sweep.
#[derive(Component)]
pub struct LevelScoped;

/// Navigation requests issued by panels, the session controller, and the
/// auto-advance timer.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelRequest {
    Menu,
    Restart,
    Next,
    Index(usize),
}

pub struct Platform {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub layers: u8,
}

pub struct LevelDef {
    pub name: &'static str,
    /// Explicit designer override; wins over the name suffix and the table.
    pub time_limit: Option<f32>,
    pub player_spawn: Vec3,
    pub platforms: &'static [Platform],
    pub crates: &'static [Vec3],
    pub spinners: &'static [Vec3],
    pub checkpoint: Option<Vec3>,
    pub goal: Vec3,
    pub fall_y: f32,
}

/// Structured timing record consumed by the clock; levels never hand the
/// clock raw display names.
#[derive(Debug, Clone)]
pub struct LevelConfig {
    pub index: usize,
    pub name: String,
    pub total_time: f32,
    pub warning_time: f32,
}

#[derive(Resource, Debug, Clone)]
pub struct CurrentLevel {
    pub index: usize,
    pub config: LevelConfig,
}

#[derive(Resource)]
pub struct LevelCatalog {
    levels: &'static [LevelDef],
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self { levels: LEVELS }
    }
}

impl LevelCatalog {
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LevelDef> {
        self.levels.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.levels.iter().map(|def| def.name)
    }

    pub fn config_for(&self, index: usize) -> Option<LevelConfig> {
        let def = self.get(index)?;
        Some(LevelConfig {
            index,
            name: def.name.to_string(),
            total_time: resolve_total_time(def, index),
            warning_time: WARNING_TIME,
        })
    }
}

/// Parse a bracketed seconds suffix out of a display name, e.g.
/// `"Crate Causeway [25s]"` -> `Some(25.0)`.
pub fn parse_time_suffix(name: &str) -> Option<f32> {
    let lower = name.to_ascii_lowercase();
    let start = lower.find('[')? + 1;
    let end = lower[start..].find("s]")? + start;
    if end <= start {
        return None;
    }
    lower[start..end]
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|t| *t > 0.0)
}

/// Ordinal fallback table: first level 10 s, second 20 s, third 30 s.
pub fn ordinal_time(index: usize) -> Option<f32> {
    match index {
        0 => Some(10.0),
        1 => Some(20.0),
        2 => Some(30.0),
        _ => None,
    }
}

pub fn resolve_total_time(def: &LevelDef, index: usize) -> f32 {
    def.time_limit
        .or_else(|| parse_time_suffix(def.name))
        .or_else(|| ordinal_time(index))
        .unwrap_or(DEFAULT_TIME)
}

pub fn activate_menu_camera(mut cameras: Query<&mut Camera, With<MenuCamera>>) {
    for mut camera in &mut cameras {
        camera.is_active = true;
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_level_requests(
    mut requests: EventReader<LevelRequest>,
    mut commands: Commands,
    catalog: Res<LevelCatalog>,
    current: Option<Res<CurrentLevel>>,
    scoped: Query<Entity, Or<(With<LevelScoped>, With<Lifespan>)>>,
    mut menu_cameras: Query<&mut Camera, With<MenuCamera>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut scheduler: ResMut<Scheduler>,
    mut registry: ResMut<RespawnRegistry>,
    mut pending: ResMut<PendingRecoveries>,
    mut clock: ResMut<LevelClock>,
    mut time: ResMut<Time<Virtual>>,
    mut input: ResMut<FrameInput>,
    mut next_app: ResMut<NextState<AppState>>,
    mut next_session: ResMut<NextState<SessionState>>,
) {
    // coalesce: the last request of the frame wins
    let Some(request) = requests.read().last().copied() else {
        return;
    };

    let target = match request {
        LevelRequest::Menu => None,
        LevelRequest::Restart => match current.as_deref() {
            Some(level) => Some(level.index),
            None => {
                warn!("restart requested with no level loaded");
                return;
            }
        },
        LevelRequest::Next => {
            let next = current.as_deref().map_or(0, |level| level.index + 1);
            if next < catalog.len() {
                Some(next)
            } else {
                warn!("no level beyond index {next}; returning to menu");
                None
            }
        }
        LevelRequest::Index(index) => {
            if index < catalog.len() {
                Some(index)
            } else {
                error!("level index {index} out of range ({} levels)", catalog.len());
                return;
            }
        }
    };

    // Tear the old instance down: scoped entities, scheduled callbacks and
    // respawn records all die with the level.
    for entity in &scoped {
        commands.entity(entity).despawn_recursive();
    }
    scheduler.clear();
    pending.clear();
    registry.clear();
    input.clear();
    time.unpause();
    time.set_relative_speed(1.0);
    next_session.set(SessionState::Playing);

    match target {
        Some(index) => {
            let (Some(def), Some(config)) = (catalog.get(index), catalog.config_for(index)) else {
                error!("level index {index} vanished from the catalog");
                next_app.set(AppState::Menu);
                return;
            };
            info!(
                "loading level {} '{}' ({}s)",
                index, config.name, config.total_time
            );
            spawn_level(&mut commands, &mut meshes, &mut materials, def);
            *clock = LevelClock::from_config(&config);
            clock.start();
            commands.insert_resource(CurrentLevel { index, config });
            for mut camera in &mut menu_cameras {
                camera.is_active = false;
            }
            next_app.set(AppState::InGame);
        }
        None => {
            commands.remove_resource::<CurrentLevel>();
            *clock = LevelClock::default();
            next_app.set(AppState::Menu);
        }
    }
}

fn spawn_level(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    def: &LevelDef,
) {
    let stone = materials.add(Color::srgb(0.55, 0.56, 0.6));
    let crate_mat = materials.add(Color::srgb(0.75, 0.5, 0.25));
    let spinner_mat = materials.add(StandardMaterial {
        base_color: Color::srgb(0.8, 0.3, 0.9),
        emissive: LinearRgba::rgb(2.0, 0.5, 3.0),
        ..default()
    });
    let goal_mat = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 0.85, 0.3),
        emissive: LinearRgba::rgb(5.0, 4.0, 1.0),
        ..default()
    });
    let checkpoint_mat = materials.add(StandardMaterial {
        base_color: Color::srgb(0.3, 0.7, 1.0),
        emissive: LinearRgba::rgb(0.6, 1.8, 3.5),
        ..default()
    });

    for platform in def.platforms {
        let size = platform.half_extents * 2.0;
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::new(size.x, size.y, size.z)),
                material: stone.clone(),
                transform: Transform::from_translation(platform.center),
                ..default()
            },
            StaticCollider {
                half_extents: platform.half_extents,
                layers: platform.layers,
            },
            LevelScoped,
        ));
    }

    for &center in def.crates {
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::new(0.8, 0.8, 0.8)),
                material: crate_mat.clone(),
                transform: Transform::from_translation(center),
                ..default()
            },
            DynamicBody::default(),
            Collider {
                half_extents: Vec3::splat(0.4),
            },
            LevelScoped,
        ));
    }

    // decorative spinners: kinematic, so they never enter the respawn registry
    for &center in def.spinners {
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::new(1.4, 0.2, 0.2)),
                material: spinner_mat.clone(),
                transform: Transform::from_translation(center),
                ..default()
            },
            DynamicBody {
                angvel: Vec3::Y * 1.6,
                kinematic: true,
                ..default()
            },
            LevelScoped,
        ));
    }

    if let Some(center) = def.checkpoint {
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::new(1.8, 0.1, 1.8)),
                material: checkpoint_mat.clone(),
                transform: Transform::from_translation(center),
                ..default()
            },
            CheckpointZone {
                half_extents: Vec3::new(0.9, 1.6, 0.9),
                used: false,
            },
            LevelScoped,
        ));
    }

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Cuboid::new(1.2, 2.4, 1.2)),
            material: goal_mat.clone(),
            transform: Transform::from_translation(def.goal),
            ..default()
        },
        GoalZone {
            half_extents: Vec3::new(1.2, 1.8, 1.2),
            win_delay: 0.5,
            triggered: false,
        },
        LevelScoped,
    ));

    commands.spawn((
        SpatialBundle::from_transform(Transform::from_xyz(0.0, def.fall_y - 5.0, 0.0)),
        FallZone {
            half_extents: Vec3::new(400.0, 5.0, 400.0),
            respawn_delay: 0.2,
        },
        LevelScoped,
    ));

    commands.spawn((
        DirectionalLightBundle {
            directional_light: DirectionalLight {
                illuminance: 9_000.0,
                shadows_enabled: true,
                ..default()
            },
            transform: Transform::from_rotation(Quat::from_euler(
                EulerRot::YXZ,
                0.6,
                -1.0,
                0.0,
            )),
            ..default()
        },
        LevelScoped,
    ));

    let player = player::spawn_player(commands, meshes, materials, def.player_spawn);
    commands.entity(player).insert(LevelScoped);
}

// ── Built-in levels ─────────────────────────────────────────────────────────

const LEVELS: &[LevelDef] = &[
    LevelDef {
        name: "First Steps",
        time_limit: None,
        player_spawn: Vec3::new(0.0, 2.0, 8.0),
        platforms: &[
            Platform {
                center: Vec3::new(0.0, -0.5, 6.0),
                half_extents: Vec3::new(4.0, 0.5, 5.0),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(0.0, -0.5, -3.0),
                half_extents: Vec3::new(2.0, 0.5, 2.0),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(0.0, 0.0, -10.0),
                half_extents: Vec3::new(3.0, 0.5, 3.0),
                layers: layers::GROUND,
            },
        ],
        crates: &[Vec3::new(1.5, 0.5, 4.0)],
        spinners: &[],
        checkpoint: None,
        goal: Vec3::new(0.0, 1.7, -10.0),
        fall_y: -10.0,
    },
    LevelDef {
        name: "Crate Causeway [25s]",
        time_limit: None,
        player_spawn: Vec3::new(-12.0, 2.0, 0.0),
        platforms: &[
            Platform {
                center: Vec3::new(-12.0, -0.5, 0.0),
                half_extents: Vec3::new(3.0, 0.5, 3.0),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(-5.0, 0.0, 0.0),
                half_extents: Vec3::new(1.5, 0.5, 1.5),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(1.0, 0.5, 2.0),
                half_extents: Vec3::new(1.5, 0.5, 1.5),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(7.0, 1.0, 0.0),
                half_extents: Vec3::new(1.5, 0.5, 1.5),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(13.0, 1.5, -2.0),
                half_extents: Vec3::new(2.5, 0.5, 2.5),
                layers: layers::GROUND,
            },
            // guard rail: blocks movement but is not a jumpable surface
            Platform {
                center: Vec3::new(13.0, 2.6, -4.4),
                half_extents: Vec3::new(2.5, 0.6, 0.1),
                layers: layers::NONE,
            },
        ],
        crates: &[Vec3::new(-5.0, 1.0, 0.0), Vec3::new(1.0, 1.5, 2.0)],
        spinners: &[Vec3::new(1.0, 2.5, 2.0)],
        checkpoint: Some(Vec3::new(1.0, 1.1, 2.0)),
        goal: Vec3::new(13.0, 3.2, -2.0),
        fall_y: -10.0,
    },
    LevelDef {
        name: "Spiral Ascent",
        time_limit: None,
        player_spawn: Vec3::new(0.0, 2.0, 10.0),
        platforms: &[
            Platform {
                center: Vec3::new(0.0, -0.5, 10.0),
                half_extents: Vec3::new(3.0, 0.5, 3.0),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(5.0, 0.5, 6.0),
                half_extents: Vec3::new(1.5, 0.5, 1.5),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(7.0, 1.5, 0.0),
                half_extents: Vec3::new(1.5, 0.5, 1.5),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(4.0, 2.5, -5.0),
                half_extents: Vec3::new(1.5, 0.5, 1.5),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(-2.0, 3.5, -7.0),
                half_extents: Vec3::new(1.5, 0.5, 1.5),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(-7.0, 4.5, -3.0),
                half_extents: Vec3::new(1.5, 0.5, 1.5),
                layers: layers::GROUND,
            },
            Platform {
                center: Vec3::new(-7.0, 5.5, 4.0),
                half_extents: Vec3::new(2.0, 0.5, 2.0),
                layers: layers::GROUND,
            },
        ],
        crates: &[Vec3::new(0.5, 0.5, 9.0), Vec3::new(-7.0, 6.5, 4.5)],
        spinners: &[Vec3::new(7.0, 3.0, 0.0), Vec3::new(-2.0, 5.0, -7.0)],
        checkpoint: Some(Vec3::new(4.0, 3.1, -5.0)),
        goal: Vec3::new(-7.0, 7.2, 4.0),
        fall_y: -10.0,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &'static str, time_limit: Option<f32>) -> LevelDef {
        LevelDef {
            name,
            time_limit,
            player_spawn: Vec3::ZERO,
            platforms: &[],
            crates: &[],
            spinners: &[],
            checkpoint: None,
            goal: Vec3::ZERO,
            fall_y: -10.0,
        }
    }

    #[test]
    fn parses_bracketed_seconds_suffix() {
        assert_eq!(parse_time_suffix("Crate Causeway [25s]"), Some(25.0));
        assert_eq!(parse_time_suffix("Sprint [2.5s]"), Some(2.5));
        assert_eq!(parse_time_suffix("Rooftops [40S]"), Some(40.0));
    }

    #[test]
    fn rejects_missing_or_malformed_suffixes() {
        assert_eq!(parse_time_suffix("First Steps"), None);
        assert_eq!(parse_time_suffix("Oops [s]"), None);
        assert_eq!(parse_time_suffix("Oops [abcs]"), None);
        assert_eq!(parse_time_suffix("Oops [-5s]"), None);
        assert_eq!(parse_time_suffix("Unclosed [12"), None);
    }

    #[test]
    fn explicit_override_beats_suffix_and_table() {
        assert_eq!(resolve_total_time(&def("Anything [25s]", Some(99.0)), 0), 99.0);
    }

    #[test]
    fn suffix_beats_ordinal_table() {
        assert_eq!(resolve_total_time(&def("Second [25s]", None), 1), 25.0);
    }

    #[test]
    fn ordinal_table_then_default() {
        assert_eq!(resolve_total_time(&def("A", None), 0), 10.0);
        assert_eq!(resolve_total_time(&def("B", None), 1), 20.0);
        assert_eq!(resolve_total_time(&def("C", None), 2), 30.0);
        assert_eq!(resolve_total_time(&def("D", None), 7), DEFAULT_TIME);
    }

    #[test]
    fn catalog_resolves_shipped_levels() {
        let catalog = LevelCatalog::default();
        assert_eq!(catalog.config_for(0).unwrap().total_time, 10.0);
        assert_eq!(catalog.config_for(1).unwrap().total_time, 25.0);
        assert_eq!(catalog.config_for(2).unwrap().total_time, 30.0);
        assert!(catalog.config_for(catalog.len()).is_none());
    }
}
