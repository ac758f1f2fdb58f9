//! Level-exit trigger: a one-shot latch that celebrates immediately and asks
//! the session controller to enter Won after a short delay.

use bevy::prelude::*;

use crate::audio::{CueKind, PlayCue};
use crate::domain::session::scheduler::{ScheduledAction, Scheduler};

use super::player::Player;
use super::{aabb_contains, spawn_burst, BurstKind, EffectAssets};

#[derive(Component)]
pub struct GoalZone {
    pub half_extents: Vec3,
    /// Seconds between the player entering and the Won transition.
    pub win_delay: f32,
    pub triggered: bool,
}

impl GoalZone {
    /// Latch: true exactly once per level instance (until reset).
    pub fn try_trigger(&mut self) -> bool {
        if self.triggered {
            return false;
        }
        self.triggered = true;
        true
    }

    /// Re-arm the latch; used only by an explicit level reset.
    pub fn reset(&mut self) {
        self.triggered = false;
    }
}

/// Marks the goal's celebratory particles so a reset can cut them short.
#[derive(Component)]
pub struct GoalEffect;

pub fn detect_goal(
    mut commands: Commands,
    mut zones: Query<(&Transform, &mut GoalZone)>,
    players: Query<&Transform, (With<Player>, Without<GoalZone>)>,
    mut scheduler: ResMut<Scheduler>,
    mut cues: EventWriter<PlayCue>,
    effects: Option<Res<EffectAssets>>,
) {
    let Ok(player_tf) = players.get_single() else {
        return;
    };
    for (zone_tf, mut zone) in &mut zones {
        if !aabb_contains(zone_tf.translation, zone.half_extents, player_tf.translation) {
            continue;
        }
        if !zone.try_trigger() {
            continue;
        }
        info!("goal reached; winning in {}s", zone.win_delay);
        cues.send(PlayCue(CueKind::Win));
        if let Some(effects) = effects.as_deref() {
            spawn_burst(&mut commands, effects, zone_tf.translation, BurstKind::Win);
        }
        scheduler.after(zone.win_delay, ScheduledAction::FinishGoal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> GoalZone {
        GoalZone {
            half_extents: Vec3::ONE,
            win_delay: 0.5,
            triggered: false,
        }
    }

    #[test]
    fn latch_fires_exactly_once() {
        let mut goal = zone();
        assert!(goal.try_trigger());
        assert!(!goal.try_trigger());
        assert!(!goal.try_trigger());
    }

    #[test]
    fn reset_rearms_the_latch() {
        let mut goal = zone();
        assert!(goal.try_trigger());
        goal.reset();
        assert!(goal.try_trigger());
    }
}
