//! Per-level countdown with a one-shot warning cue and a one-shot expiry.

use bevy::prelude::*;

use crate::domain::simulation::level::LevelConfig;

pub const WARNING_THRESHOLD: f32 = 5.0;

/// Countdown state for the running level. Ticked with simulated time, so the
/// session pausing virtual time stops it; the `running` flag is toggled by
/// the session layer as well so the clock stays inert on its own terms.
#[derive(Resource, Debug, Clone)]
pub struct LevelClock {
    total: f32,
    remaining: f32,
    warning_threshold: f32,
    running: bool,
    warning_fired: bool,
}

impl Default for LevelClock {
    fn default() -> Self {
        Self {
            total: 15.0,
            remaining: 15.0,
            warning_threshold: WARNING_THRESHOLD,
            running: false,
            warning_fired: false,
        }
    }
}

/// What a single tick observed. Both flags fire at most once per level
/// instance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub warning: bool,
    pub expired: bool,
}

impl LevelClock {
    /// A stopped clock configured for `config`; call [`LevelClock::start`]
    /// once the level is actually live.
    pub fn from_config(config: &LevelConfig) -> Self {
        Self {
            total: config.total_time,
            remaining: config.total_time,
            warning_threshold: config.warning_time,
            running: false,
            warning_fired: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Count down by `dt` seconds. The warning fires the first time the
    /// remaining time crosses the threshold while still positive; expiry
    /// fires exactly once, stopping the clock.
    pub fn tick(&mut self, dt: f32) -> ClockTick {
        let mut out = ClockTick::default();
        if !self.running {
            return out;
        }

        self.remaining = (self.remaining - dt).max(0.0);

        if !self.warning_fired && self.remaining <= self.warning_threshold && self.remaining > 0.0 {
            self.warning_fired = true;
            out.warning = true;
        }

        if self.remaining <= 0.0 {
            self.running = false;
            out.expired = true;
        }
        out
    }

    /// Unclamped: bonus time may push the clock above its configured total.
    pub fn add_bonus(&mut self, seconds: f32) {
        self.remaining += seconds;
    }

    pub fn reset(&mut self) {
        self.remaining = self.total;
        self.running = true;
        self.warning_fired = false;
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn total(&self) -> f32 {
        self.total
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn in_warning(&self) -> bool {
        self.remaining <= self.warning_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(total: f32, warning: f32) -> LevelClock {
        let mut clock = LevelClock::from_config(&LevelConfig {
            index: 0,
            name: "test".into(),
            total_time: total,
            warning_time: warning,
        });
        clock.start();
        clock
    }

    #[test]
    fn warning_fires_exactly_once_on_crossing() {
        let mut clock = clock(10.0, 5.0);
        let mut warnings = 0;
        for _ in 0..6 {
            if clock.tick(1.0).warning {
                warnings += 1;
            }
        }
        assert_eq!(warnings, 1);
        assert!((clock.remaining() - 4.0).abs() < f32::EPSILON);
        assert!(clock.in_warning());
    }

    #[test]
    fn expiry_fires_exactly_once_even_past_zero() {
        let mut clock = clock(3.0, 1.0);
        let mut expiries = 0;
        for _ in 0..10 {
            if clock.tick(2.0).expired {
                expiries += 1;
            }
        }
        assert_eq!(expiries, 1);
        assert_eq!(clock.remaining(), 0.0);
        assert!(!clock.is_running());
    }

    #[test]
    fn paused_clock_does_not_count_down() {
        let mut clock = clock(10.0, 5.0);
        clock.pause();
        let tick = clock.tick(4.0);
        assert_eq!(tick, ClockTick::default());
        assert_eq!(clock.remaining(), 10.0);
        clock.resume();
        clock.tick(4.0);
        assert_eq!(clock.remaining(), 6.0);
    }

    #[test]
    fn bonus_time_is_unclamped() {
        let mut clock = clock(10.0, 5.0);
        clock.add_bonus(25.0);
        assert_eq!(clock.remaining(), 35.0);
    }

    #[test]
    fn warning_latch_is_sticky_across_bonus_time() {
        let mut clock = clock(10.0, 5.0);
        for _ in 0..6 {
            clock.tick(1.0);
        }
        clock.add_bonus(20.0);
        let mut warnings = 0;
        for _ in 0..19 {
            if clock.tick(1.0).warning {
                warnings += 1;
            }
        }
        // back under the threshold, but the latch already fired this level
        assert!(clock.in_warning());
        assert_eq!(warnings, 0);
    }

    #[test]
    fn reset_restores_time_and_rearms_the_warning() {
        let mut clock = clock(10.0, 5.0);
        for _ in 0..10 {
            clock.tick(2.0);
        }
        assert!(!clock.is_running());

        clock.reset();
        assert_eq!(clock.remaining(), 10.0);
        assert!(clock.is_running());

        let mut warnings = 0;
        for _ in 0..6 {
            if clock.tick(1.0).warning {
                warnings += 1;
            }
        }
        assert_eq!(warnings, 1);
    }

    #[test]
    fn whole_tick_to_zero_skips_warning_and_expires() {
        let mut clock = clock(6.0, 5.0);
        let tick = clock.tick(6.0);
        assert!(!tick.warning);
        assert!(tick.expired);
    }
}
