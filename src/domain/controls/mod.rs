//! Keybinds and per-frame input gathering. Raw device state is flattened
//! into a [`FrameInput`] snapshot once per frame; everything downstream
//! reads the snapshot and never touches the devices directly.

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;

use crate::domain::session::{AppState, BonusTime, SessionState};
use crate::domain::simulation::respawn::SoftReset;

#[derive(Resource)]
pub struct Keybinds {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub run: KeyCode,
    pub jump: KeyCode,
    pub pause: KeyCode,
}

impl Default for Keybinds {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            run: KeyCode::ShiftLeft,
            jump: KeyCode::Space,
            pause: KeyCode::Escape,
        }
    }
}

/// One frame's worth of player intent: look delta in pixels, move axes in
/// [-1, 1], the run modifier, and edge-triggered jump/pause requests that
/// are consumed by whoever acts on them.
#[derive(Resource, Default)]
pub struct FrameInput {
    pub look_delta: Vec2,
    pub move_axes: Vec2,
    pub run: bool,
    jump_queued: bool,
    pause_queued: bool,
}

impl FrameInput {
    pub fn queue_jump(&mut self) {
        self.jump_queued = true;
    }

    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump_queued)
    }

    pub fn press_pause(&mut self) {
        self.pause_queued = true;
    }

    pub fn take_pause(&mut self) -> bool {
        std::mem::take(&mut self.pause_queued)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn gather_frame_input(
    keys: Res<ButtonInput<KeyCode>>,
    mut motion: EventReader<MouseMotion>,
    binds: Res<Keybinds>,
    mut input: ResMut<FrameInput>,
) {
    let mut look = Vec2::ZERO;
    for ev in motion.read() {
        look += ev.delta;
    }
    input.look_delta = look;

    let mut axes = Vec2::ZERO;
    if keys.pressed(binds.forward) {
        axes.y += 1.0;
    }
    if keys.pressed(binds.back) {
        axes.y -= 1.0;
    }
    if keys.pressed(binds.right) {
        axes.x += 1.0;
    }
    if keys.pressed(binds.left) {
        axes.x -= 1.0;
    }
    input.move_axes = axes.clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
    input.run = keys.pressed(binds.run);

    if keys.just_pressed(binds.jump) {
        input.queue_jump();
    }
    if keys.just_pressed(binds.pause) {
        input.press_pause();
    }
}

/// Development shortcuts, same spirit as the help/diagnostics toggles:
/// F5 puts the whole run back to its start without a reload, F6 grants
/// bonus time.
fn debug_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut soft_reset: EventWriter<SoftReset>,
    mut bonus: EventWriter<BonusTime>,
) {
    if keys.just_pressed(KeyCode::F5) {
        soft_reset.send(SoftReset);
    }
    if keys.just_pressed(KeyCode::F6) {
        bonus.send(BonusTime(10.0));
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Keybinds>()
            .init_resource::<FrameInput>()
            .add_systems(Update, gather_frame_input)
            .add_systems(
                Update,
                debug_keys
                    .run_if(in_state(AppState::InGame))
                    .run_if(in_state(SessionState::Playing)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_and_pause_requests_are_consumed_once() {
        let mut input = FrameInput::default();
        input.queue_jump();
        input.press_pause();
        assert!(input.take_jump());
        assert!(!input.take_jump());
        assert!(input.take_pause());
        assert!(!input.take_pause());
    }

    #[test]
    fn clear_drops_held_state_and_queued_edges() {
        let mut input = FrameInput {
            look_delta: Vec2::new(3.0, -2.0),
            move_axes: Vec2::new(1.0, 1.0),
            run: true,
            ..default()
        };
        input.queue_jump();
        input.press_pause();
        input.clear();
        assert_eq!(input.look_delta, Vec2::ZERO);
        assert_eq!(input.move_axes, Vec2::ZERO);
        assert!(!input.run);
        assert!(!input.take_jump());
        assert!(!input.take_pause());
    }
}
