//! Respawn bookkeeping: spawn-pose registry, the out-of-bounds recovery
//! zone, and checkpoint pads that re-record the player's spawn pose.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::audio::{CueKind, PlayCue};
use crate::domain::session::clock::LevelClock;
use crate::domain::session::scheduler::{ScheduleHandle, ScheduledAction, Scheduler};

use super::goal::{GoalEffect, GoalZone};
use super::{aabb_contains, spawn_burst, BurstKind, DynamicBody, EffectAssets, Suspended};
use super::player::{Player, PlayerHead};

/// Position + orientation snapshot recorded at registration time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl SpawnPose {
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            translation: transform.translation,
            rotation: transform.rotation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestoreOutcome {
    /// The body was registered; restore to this pose.
    Restored(SpawnPose),
    /// The body was unknown; its current pose has been recorded instead so
    /// the next fall from the same spot restores cleanly.
    SelfHealed,
}

/// Level-scoped map of body -> recorded spawn pose. Entries survive until
/// the level instance is torn down.
#[derive(Resource, Default)]
pub struct RespawnRegistry {
    poses: HashMap<Entity, SpawnPose>,
}

impl RespawnRegistry {
    /// Record `pose` for `entity`. A second registration is a no-op;
    /// returns whether the entry is new.
    pub fn register(&mut self, entity: Entity, pose: SpawnPose) -> bool {
        match self.poses.entry(entity) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(pose);
                true
            }
        }
    }

    pub fn is_registered(&self, entity: Entity) -> bool {
        self.poses.contains_key(&entity)
    }

    /// Look up the recorded pose, self-healing on a miss by recording the
    /// caller-provided current pose.
    pub fn resolve_restore(&mut self, entity: Entity, current: SpawnPose) -> RestoreOutcome {
        match self.poses.get(&entity) {
            Some(pose) => RestoreOutcome::Restored(*pose),
            None => {
                self.poses.insert(entity, current);
                RestoreOutcome::SelfHealed
            }
        }
    }

    /// Checkpoint: overwrite the recorded pose. No-op (false) when the body
    /// was never registered.
    pub fn update_spawn_pose(&mut self, entity: Entity, pose: SpawnPose) -> bool {
        match self.poses.get_mut(&entity) {
            Some(slot) => {
                *slot = pose;
                true
            }
            None => false,
        }
    }

    pub fn unregister(&mut self, entity: Entity) -> bool {
        self.poses.remove(&entity).is_some()
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.poses.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn clear(&mut self) {
        self.poses.clear();
    }
}

/// Zero both velocities, then apply the recorded pose. Safe to call twice:
/// the result is the same pose and zero velocity both times.
pub fn restore_body(transform: &mut Transform, body: &mut DynamicBody, pose: &SpawnPose) {
    body.linvel = Vec3::ZERO;
    body.angvel = Vec3::ZERO;
    transform.translation = pose.translation;
    transform.rotation = pose.rotation;
}

/// One outstanding recovery per body; a second fall while one is pending is
/// ignored (first recovery wins).
#[derive(Resource, Default)]
pub struct PendingRecoveries(HashMap<Entity, Option<ScheduleHandle>>);

impl PendingRecoveries {
    pub fn is_pending(&self, entity: Entity) -> bool {
        self.0.contains_key(&entity)
    }

    pub fn begin(&mut self, entity: Entity, handle: Option<ScheduleHandle>) -> bool {
        if self.0.contains_key(&entity) {
            return false;
        }
        self.0.insert(entity, handle);
        true
    }

    pub fn finish(&mut self, entity: Entity) {
        self.0.remove(&entity);
    }

    /// Drop every pending recovery, yielding the scheduler handles that
    /// still need cancelling.
    pub fn drain(&mut self) -> Vec<ScheduleHandle> {
        self.0.drain().filter_map(|(_, handle)| handle).collect()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Volume below the playable space that reclaims fallen bodies.
#[derive(Component)]
pub struct FallZone {
    pub half_extents: Vec3,
    pub respawn_delay: f32,
}

/// One-shot pad that re-records the player's spawn pose when first touched.
#[derive(Component)]
pub struct CheckpointZone {
    pub half_extents: Vec3,
    pub used: bool,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct RecoveryDue(pub Entity);

/// Debug action: restore every registered body, re-arm goals, reset the
/// clock, all without reloading the level.
#[derive(Event, Default)]
pub struct SoftReset;

/// Bulk + on-demand registration in one pass: every newly spawned
/// fully-simulated body is recorded once; kinematic bodies are skipped.
pub fn register_spawned_bodies(
    mut registry: ResMut<RespawnRegistry>,
    bodies: Query<(Entity, &Transform, &DynamicBody), Added<DynamicBody>>,
) {
    let mut registered = 0;
    for (entity, transform, body) in &bodies {
        if body.kinematic {
            continue;
        }
        if registry.register(entity, SpawnPose::from_transform(transform)) {
            registered += 1;
        }
    }
    if registered > 0 {
        debug!("registered {registered} bodies for respawn");
    }
}

#[allow(clippy::too_many_arguments)]
pub fn detect_fallen_bodies(
    mut commands: Commands,
    zones: Query<(&Transform, &FallZone)>,
    bodies: Query<(Entity, &Transform, &DynamicBody), (Without<Suspended>, Without<FallZone>)>,
    registry: Option<Res<RespawnRegistry>>,
    mut pending: ResMut<PendingRecoveries>,
    mut scheduler: ResMut<Scheduler>,
    mut recoveries: EventWriter<RecoveryDue>,
    mut cues: EventWriter<PlayCue>,
    effects: Option<Res<EffectAssets>>,
) {
    for (zone_tf, zone) in &zones {
        for (entity, body_tf, body) in &bodies {
            if body.kinematic {
                continue;
            }
            if !aabb_contains(zone_tf.translation, zone.half_extents, body_tf.translation) {
                continue;
            }
            if registry.is_none() {
                warn!("fall zone hit but no respawn registry is available; ignoring");
                continue;
            }
            // first recovery wins; later falls while pending are ignored
            if pending.is_pending(entity) {
                continue;
            }
            info!("{entity} fell out of bounds");
            cues.send(PlayCue(CueKind::Death));
            if let Some(effects) = effects.as_deref() {
                spawn_burst(&mut commands, effects, body_tf.translation, BurstKind::Death);
            }
            if zone.respawn_delay > 0.0 {
                commands.entity(entity).insert((Suspended, Visibility::Hidden));
                let handle = scheduler.after(
                    zone.respawn_delay,
                    ScheduledAction::RecoverBody(entity),
                );
                pending.begin(entity, Some(handle));
            } else {
                pending.begin(entity, None);
                recoveries.send(RecoveryDue(entity));
            }
        }
    }
}

pub fn apply_recoveries(
    mut events: EventReader<RecoveryDue>,
    mut commands: Commands,
    mut registry: ResMut<RespawnRegistry>,
    mut pending: ResMut<PendingRecoveries>,
    mut bodies: Query<(&mut Transform, &mut DynamicBody, &mut Visibility)>,
    players: Query<(), With<Player>>,
    mut heads: Query<(&mut Transform, &mut PlayerHead), Without<DynamicBody>>,
) {
    for &RecoveryDue(entity) in events.read() {
        pending.finish(entity);
        let Ok((mut transform, mut body, mut visibility)) = bodies.get_mut(entity) else {
            debug!("recovery target {entity} no longer exists; skipping");
            continue;
        };
        commands.entity(entity).remove::<Suspended>();
        *visibility = Visibility::Inherited;
        match registry.resolve_restore(entity, SpawnPose::from_transform(&transform)) {
            RestoreOutcome::Restored(pose) => {
                restore_body(&mut transform, &mut body, &pose);
                if players.get(entity).is_ok() {
                    if let Ok((mut head_tf, mut head)) = heads.get_single_mut() {
                        head.pitch = 0.0;
                        head_tf.rotation = Quat::IDENTITY;
                    }
                }
            }
            RestoreOutcome::SelfHealed => {
                warn!("restore asked for unregistered {entity}; recorded its current pose");
            }
        }
    }
}

pub fn update_checkpoints(
    mut zones: Query<(&Transform, &mut CheckpointZone)>,
    players: Query<(Entity, &Transform), (With<Player>, Without<CheckpointZone>)>,
    mut registry: ResMut<RespawnRegistry>,
    mut cues: EventWriter<PlayCue>,
) {
    let Ok((player, player_tf)) = players.get_single() else {
        return;
    };
    for (zone_tf, mut zone) in &mut zones {
        if zone.used {
            continue;
        }
        if !aabb_contains(zone_tf.translation, zone.half_extents, player_tf.translation) {
            continue;
        }
        zone.used = true;
        let pose = SpawnPose {
            translation: zone_tf.translation + Vec3::Y * 1.2,
            rotation: player_tf.rotation,
        };
        if registry.update_spawn_pose(player, pose) {
            cues.send(PlayCue(CueKind::Checkpoint));
            info!("checkpoint reached; player spawn pose updated");
        } else {
            warn!("checkpoint touched by an unregistered player body");
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_soft_reset(
    mut events: EventReader<SoftReset>,
    mut commands: Commands,
    mut registry: ResMut<RespawnRegistry>,
    mut pending: ResMut<PendingRecoveries>,
    mut scheduler: ResMut<Scheduler>,
    mut clock: ResMut<LevelClock>,
    mut bodies: Query<(&mut Transform, &mut DynamicBody, &mut Visibility)>,
    mut goals: Query<&mut GoalZone>,
    effects: Query<Entity, With<GoalEffect>>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    for handle in pending.drain() {
        scheduler.cancel(handle);
    }

    let mut restored = 0;
    for entity in registry.entities() {
        // bodies despawned since registration are skipped, not errors
        let Ok((mut transform, mut body, mut visibility)) = bodies.get_mut(entity) else {
            continue;
        };
        if let RestoreOutcome::Restored(pose) =
            registry.resolve_restore(entity, SpawnPose::from_transform(&transform))
        {
            restore_body(&mut transform, &mut body, &pose);
            commands.entity(entity).remove::<Suspended>();
            *visibility = Visibility::Inherited;
            restored += 1;
        }
    }

    for mut goal in &mut goals {
        goal.reset();
    }
    for effect in &effects {
        commands.entity(effect).despawn_recursive();
    }
    clock.reset();
    info!("soft reset: restored {restored} bodies");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(x: f32) -> SpawnPose {
        SpawnPose {
            translation: Vec3::new(x, 0.0, 0.0),
            rotation: Quat::IDENTITY,
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = RespawnRegistry::default();
        let body = Entity::from_raw(1);
        assert!(registry.register(body, pose(1.0)));
        assert!(!registry.register(body, pose(2.0)));
        assert_eq!(
            registry.resolve_restore(body, pose(9.0)),
            RestoreOutcome::Restored(pose(1.0))
        );
    }

    #[test]
    fn restore_on_unregistered_body_self_heals_idempotently() {
        let mut registry = RespawnRegistry::default();
        let body = Entity::from_raw(1);
        // first call records the current pose and does not restore
        assert_eq!(
            registry.resolve_restore(body, pose(3.0)),
            RestoreOutcome::SelfHealed
        );
        // second call restores to that same recorded pose
        assert_eq!(
            registry.resolve_restore(body, pose(7.0)),
            RestoreOutcome::Restored(pose(3.0))
        );
    }

    #[test]
    fn checkpoint_updates_only_registered_bodies() {
        let mut registry = RespawnRegistry::default();
        let body = Entity::from_raw(1);
        assert!(!registry.update_spawn_pose(body, pose(5.0)));
        registry.register(body, pose(1.0));
        assert!(registry.update_spawn_pose(body, pose(5.0)));
        assert_eq!(
            registry.resolve_restore(body, pose(0.0)),
            RestoreOutcome::Restored(pose(5.0))
        );
    }

    #[test]
    fn unregistered_bodies_behave_as_unknown_again() {
        let mut registry = RespawnRegistry::default();
        let body = Entity::from_raw(1);
        registry.register(body, pose(1.0));
        assert!(registry.unregister(body));
        assert!(!registry.unregister(body));
        assert_eq!(
            registry.resolve_restore(body, pose(4.0)),
            RestoreOutcome::SelfHealed
        );
    }

    #[test]
    fn restore_body_zeroes_velocity_and_is_idempotent() {
        let mut transform = Transform::from_xyz(10.0, -20.0, 3.0);
        let mut body = DynamicBody {
            linvel: Vec3::new(1.0, -30.0, 2.0),
            angvel: Vec3::splat(4.0),
            ..default()
        };
        let target = pose(2.0);

        restore_body(&mut transform, &mut body, &target);
        restore_body(&mut transform, &mut body, &target);

        assert_eq!(transform.translation, target.translation);
        assert_eq!(body.linvel, Vec3::ZERO);
        assert_eq!(body.angvel, Vec3::ZERO);
    }

    #[test]
    fn first_pending_recovery_wins() {
        let mut pending = PendingRecoveries::default();
        let body = Entity::from_raw(1);
        assert!(pending.begin(body, None));
        assert!(!pending.begin(body, None));
        pending.finish(body);
        assert!(pending.begin(body, None));
    }
}
