//! Deferred-callback scheduler: a queue of (deadline, action) pairs advanced
//! once per frame. Gameplay delays live on the simulated lane and freeze with
//! the session; presentation delays live on the wall lane so they keep
//! counting while simulated time is stopped on a terminal screen.

use bevy::prelude::*;

use crate::domain::simulation::level::LevelRequest;

/// Cancellation token for a scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduledAction {
    /// Reactivate and restore a fallen body.
    RecoverBody(Entity),
    /// Ask the session controller to enter the Won state.
    FinishGoal,
    /// Hand a load request to the level loader.
    LoadLevel(LevelRequest),
}

struct Entry {
    handle: ScheduleHandle,
    due: f64,
    action: ScheduledAction,
}

#[derive(Resource, Default)]
pub struct Scheduler {
    sim: Vec<Entry>,
    wall: Vec<Entry>,
    sim_now: f64,
    wall_now: f64,
    next_handle: u64,
}

impl Scheduler {
    fn handle(&mut self) -> ScheduleHandle {
        self.next_handle += 1;
        ScheduleHandle(self.next_handle)
    }

    /// Schedule `action` after `delay` seconds of simulated time.
    pub fn after(&mut self, delay: f32, action: ScheduledAction) -> ScheduleHandle {
        let handle = self.handle();
        let due = self.sim_now + f64::from(delay.max(0.0));
        self.sim.push(Entry { handle, due, action });
        handle
    }

    /// Schedule `action` after `delay` seconds of wall time.
    pub fn after_wall(&mut self, delay: f32, action: ScheduledAction) -> ScheduleHandle {
        let handle = self.handle();
        let due = self.wall_now + f64::from(delay.max(0.0));
        self.wall.push(Entry { handle, due, action });
        handle
    }

    /// Remove a scheduled action before it fires. Returns false when the
    /// handle already fired or was cancelled.
    pub fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        let before = self.sim.len() + self.wall.len();
        self.sim.retain(|e| e.handle != handle);
        self.wall.retain(|e| e.handle != handle);
        before != self.sim.len() + self.wall.len()
    }

    /// Drop every outstanding action. Called on level teardown so nothing
    /// owned by the dying level instance can fire into the next one.
    pub fn clear(&mut self) {
        self.sim.clear();
        self.wall.clear();
    }

    pub fn pending(&self) -> usize {
        self.sim.len() + self.wall.len()
    }

    /// Advance both lanes and return every action whose deadline passed,
    /// earliest first within each lane.
    pub fn advance(&mut self, sim_dt: f32, wall_dt: f32) -> Vec<ScheduledAction> {
        self.sim_now += f64::from(sim_dt);
        self.wall_now += f64::from(wall_dt);

        let mut due = Vec::new();
        Self::drain_lane(&mut self.sim, self.sim_now, &mut due);
        Self::drain_lane(&mut self.wall, self.wall_now, &mut due);
        due.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        due.into_iter().map(|(_, action)| action).collect()
    }

    fn drain_lane(lane: &mut Vec<Entry>, now: f64, due: &mut Vec<(f64, ScheduledAction)>) {
        let mut i = 0;
        while i < lane.len() {
            if lane[i].due <= now {
                let entry = lane.remove(i);
                due.push((entry.due, entry.action));
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_at_deadline_in_order() {
        let mut sched = Scheduler::default();
        sched.after(0.5, ScheduledAction::FinishGoal);
        sched.after(0.2, ScheduledAction::RecoverBody(Entity::from_raw(7)));

        assert!(sched.advance(0.1, 0.1).is_empty());
        let fired = sched.advance(0.5, 0.5);
        assert_eq!(
            fired,
            vec![
                ScheduledAction::RecoverBody(Entity::from_raw(7)),
                ScheduledAction::FinishGoal,
            ]
        );
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn never_fires_before_deadline() {
        let mut sched = Scheduler::default();
        sched.after(0.2, ScheduledAction::RecoverBody(Entity::from_raw(1)));
        assert!(sched.advance(0.1, 0.1).is_empty());
        assert_eq!(sched.advance(0.1, 0.1).len(), 1);
    }

    #[test]
    fn frozen_sim_lane_holds_while_wall_lane_runs() {
        let mut sched = Scheduler::default();
        sched.after(0.1, ScheduledAction::FinishGoal);
        sched.after_wall(0.3, ScheduledAction::LoadLevel(LevelRequest::Next));

        // simulated time frozen: only wall deadlines make progress
        assert!(sched.advance(0.0, 0.2).is_empty());
        let fired = sched.advance(0.0, 0.2);
        assert_eq!(fired, vec![ScheduledAction::LoadLevel(LevelRequest::Next)]);
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn cancel_prevents_firing() {
        let mut sched = Scheduler::default();
        let handle = sched.after(0.1, ScheduledAction::FinishGoal);
        assert!(sched.cancel(handle));
        assert!(!sched.cancel(handle));
        assert!(sched.advance(1.0, 1.0).is_empty());
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut sched = Scheduler::default();
        sched.after(0.1, ScheduledAction::FinishGoal);
        sched.after_wall(0.1, ScheduledAction::LoadLevel(LevelRequest::Menu));
        sched.clear();
        assert!(sched.advance(1.0, 1.0).is_empty());
    }

    #[test]
    fn zero_delay_fires_on_next_advance() {
        let mut sched = Scheduler::default();
        sched.after(0.0, ScheduledAction::FinishGoal);
        assert_eq!(sched.advance(0.0, 0.0).len(), 1);
    }
}
