//! The session state machine. Exactly one `SessionState` exists per level
//! instance; every frame the clock, zones, player controller and panels
//! observe it through run conditions instead of reaching into each other.
//!
//! Transition rules: Playing <-> Paused any number of times; Playing -> Won
//! and Playing -> Lost are one-shot and mutually exclusive, cleared only by
//! tearing the level instance down. Operations invoked from a state that
//! forbids them are silent no-ops.

use bevy::prelude::*;
use bevy::window::{CursorGrabMode, PrimaryWindow};

use crate::audio::{CueKind, PlayCue};
use crate::domain::controls::FrameInput;
use crate::domain::simulation::level::LevelRequest;
use crate::domain::simulation::player::{self, PlayerInputEnabled};
use crate::domain::simulation::respawn::RecoveryDue;

pub mod clock;
pub mod scheduler;

use clock::LevelClock;
use scheduler::{ScheduledAction, Scheduler};

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppState {
    #[default]
    Menu,
    InGame,
}

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Playing,
    Paused,
    Won,
    Lost,
}

#[derive(Resource, Clone)]
pub struct SessionSettings {
    pub pause_enabled: bool,
    pub lock_cursor: bool,
    /// Load the next level automatically a few seconds after winning.
    pub auto_advance: bool,
    pub auto_advance_delay: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            pause_enabled: true,
            lock_cursor: true,
            auto_advance: false,
            auto_advance_delay: 3.0,
        }
    }
}

/// Request to enter the Won state, sent by the goal trigger's delayed
/// callback. Ignored outside Playing.
#[derive(Event, Default)]
pub struct GoalReached;

/// The level clock ran out. Ignored outside Playing.
#[derive(Event, Default)]
pub struct ClockExpired;

/// Add seconds to the running clock (power-ups, debug key).
#[derive(Event, Debug, Clone, Copy)]
pub struct BonusTime(pub f32);

fn toggle_pause(
    mut input: ResMut<FrameInput>,
    settings: Res<SessionSettings>,
    state: Res<State<SessionState>>,
    mut next: ResMut<NextState<SessionState>>,
) {
    if !input.take_pause() {
        return;
    }
    if !settings.pause_enabled {
        return;
    }
    match state.get() {
        SessionState::Playing => next.set(SessionState::Paused),
        SessionState::Paused => next.set(SessionState::Playing),
        // terminal screens ignore the pause key
        SessionState::Won | SessionState::Lost => {}
    }
}

fn tick_clock(
    time: Res<Time>,
    mut clock: ResMut<LevelClock>,
    mut cues: EventWriter<PlayCue>,
    mut expired: EventWriter<ClockExpired>,
) {
    let tick = clock.tick(time.delta_seconds());
    if tick.warning {
        warn!("time is running out");
        cues.send(PlayCue(CueKind::Warning));
    }
    if tick.expired {
        info!("level time expired");
        expired.send(ClockExpired);
    }
}

fn grant_bonus_time(mut events: EventReader<BonusTime>, mut clock: ResMut<LevelClock>) {
    for &BonusTime(seconds) in events.read() {
        clock.add_bonus(seconds);
        info!("bonus time: +{seconds}s");
    }
}

/// Advance both scheduler lanes once per frame and fan the due actions out
/// as events. The simulated lane uses virtual time, so pausing or freezing
/// the session holds every gameplay delay in place.
pub fn drain_scheduler(
    time: Res<Time>,
    real_time: Res<Time<Real>>,
    mut scheduler: ResMut<Scheduler>,
    mut recoveries: EventWriter<RecoveryDue>,
    mut goals: EventWriter<GoalReached>,
    mut levels: EventWriter<LevelRequest>,
) {
    for action in scheduler.advance(time.delta_seconds(), real_time.delta_seconds()) {
        match action {
            ScheduledAction::RecoverBody(entity) => {
                recoveries.send(RecoveryDue(entity));
            }
            ScheduledAction::FinishGoal => {
                goals.send(GoalReached);
            }
            ScheduledAction::LoadLevel(request) => {
                levels.send(request);
            }
        }
    }
}

fn handle_goal_reached(
    mut events: EventReader<GoalReached>,
    mut next: ResMut<NextState<SessionState>>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();
    info!("session won");
    next.set(SessionState::Won);
}

fn handle_clock_expired(
    mut events: EventReader<ClockExpired>,
    mut next: ResMut<NextState<SessionState>>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();
    info!("session lost");
    next.set(SessionState::Lost);
}

fn on_pause_entered(
    mut time: ResMut<Time<Virtual>>,
    mut clock: ResMut<LevelClock>,
    mut cues: EventWriter<PlayCue>,
) {
    time.pause();
    clock.pause();
    cues.send(PlayCue(CueKind::PanelOpen));
    info!("session paused");
}

fn on_pause_exited(mut time: ResMut<Time<Virtual>>, mut clock: ResMut<LevelClock>) {
    time.unpause();
    clock.resume();
    info!("session resumed");
}

fn on_won_entered(
    settings: Res<SessionSettings>,
    mut time: ResMut<Time<Virtual>>,
    mut clock: ResMut<LevelClock>,
    mut scheduler: ResMut<Scheduler>,
    mut cues: EventWriter<PlayCue>,
) {
    time.pause();
    clock.pause();
    cues.send(PlayCue(CueKind::PanelOpen));
    if settings.auto_advance {
        // simulated time is frozen on the win screen; the auto-advance
        // delay counts wall time instead
        scheduler.after_wall(
            settings.auto_advance_delay,
            ScheduledAction::LoadLevel(LevelRequest::Next),
        );
        info!("auto-advancing in {}s", settings.auto_advance_delay);
    }
}

fn on_lost_entered(
    mut time: ResMut<Time<Virtual>>,
    mut clock: ResMut<LevelClock>,
    mut cues: EventWriter<PlayCue>,
) {
    time.pause();
    clock.pause();
    cues.send(PlayCue(CueKind::PanelOpen));
}

fn capture_cursor(
    settings: Res<SessionSettings>,
    app_state: Res<State<AppState>>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if !settings.lock_cursor || *app_state.get() != AppState::InGame {
        return;
    }
    let Ok(mut window) = windows.get_single_mut() else {
        return;
    };
    window.cursor.grab_mode = CursorGrabMode::Locked;
    window.cursor.visible = false;
}

fn release_cursor(mut windows: Query<&mut Window, With<PrimaryWindow>>) {
    let Ok(mut window) = windows.get_single_mut() else {
        return;
    };
    window.cursor.grab_mode = CursorGrabMode::None;
    window.cursor.visible = true;
}

fn on_menu_entered(mut time: ResMut<Time<Virtual>>) {
    time.unpause();
    time.set_relative_speed(1.0);
}

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppState>()
            .init_state::<SessionState>()
            .init_resource::<SessionSettings>()
            .init_resource::<Scheduler>()
            .init_resource::<LevelClock>()
            .init_resource::<FrameInput>()
            .init_resource::<PlayerInputEnabled>()
            .add_event::<PlayCue>()
            .add_event::<GoalReached>()
            .add_event::<ClockExpired>()
            .add_event::<BonusTime>()
            .add_event::<LevelRequest>()
            .add_event::<RecoveryDue>()
            .add_systems(
                Update,
                (
                    toggle_pause,
                    grant_bonus_time,
                    tick_clock.run_if(in_state(SessionState::Playing)),
                    drain_scheduler,
                    handle_goal_reached.run_if(in_state(SessionState::Playing)),
                    handle_clock_expired.run_if(in_state(SessionState::Playing)),
                )
                    .chain()
                    .run_if(in_state(AppState::InGame)),
            )
            .add_systems(OnEnter(SessionState::Paused), on_pause_entered)
            .add_systems(OnExit(SessionState::Paused), on_pause_exited)
            .add_systems(OnEnter(SessionState::Won), on_won_entered)
            .add_systems(OnEnter(SessionState::Lost), on_lost_entered)
            .add_systems(
                OnEnter(SessionState::Playing),
                (player::on_input_enabled, capture_cursor),
            )
            .add_systems(
                OnExit(SessionState::Playing),
                (player::on_input_disabled, release_cursor),
            )
            .add_systems(
                OnEnter(AppState::InGame),
                (player::on_input_enabled, capture_cursor),
            )
            .add_systems(OnEnter(AppState::Menu), (on_menu_entered, release_cursor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Resource, Default)]
    struct CueLog(Vec<CueKind>);

    fn log_cues(mut log: ResMut<CueLog>, mut cues: EventReader<PlayCue>) {
        for cue in cues.read() {
            log.0.push(cue.0);
        }
    }

    fn test_app() -> App {
        let mut app = App::new();
        // MinimalPlugins carries no state machinery, so add it explicitly
        app.add_plugins((MinimalPlugins, bevy::state::app::StatesPlugin));
        app.add_plugins(SessionPlugin);
        app.init_resource::<CueLog>();
        app.add_systems(Update, log_cues);
        app.world_mut()
            .resource_mut::<NextState<AppState>>()
            .set(AppState::InGame);
        app.update();
        app
    }

    fn session_state(app: &App) -> SessionState {
        *app.world().resource::<State<SessionState>>().get()
    }

    fn press_pause(app: &mut App) {
        app.world_mut().resource_mut::<FrameInput>().press_pause();
        app.update(); // toggle consumes the press, queues the transition
        app.update(); // transition applies, enter/exit hooks run
    }

    fn panel_cues(app: &App) -> usize {
        app.world()
            .resource::<CueLog>()
            .0
            .iter()
            .filter(|cue| **cue == CueKind::PanelOpen)
            .count()
    }

    #[test]
    fn pause_alternates_and_even_press_counts_restore_playing() {
        let mut app = test_app();
        assert_eq!(session_state(&app), SessionState::Playing);

        for round in 0..4 {
            press_pause(&mut app);
            let expected = if round % 2 == 0 {
                SessionState::Paused
            } else {
                SessionState::Playing
            };
            assert_eq!(session_state(&app), expected);
        }
    }

    #[test]
    fn pausing_freezes_time_and_gates_input_until_resume() {
        let mut app = test_app();

        press_pause(&mut app);
        assert_eq!(session_state(&app), SessionState::Paused);
        assert!(app.world().resource::<Time<Virtual>>().is_paused());
        assert!(!app.world().resource::<PlayerInputEnabled>().0);
        assert_eq!(panel_cues(&app), 1);

        press_pause(&mut app);
        assert_eq!(session_state(&app), SessionState::Playing);
        assert!(!app.world().resource::<Time<Virtual>>().is_paused());
        assert!(app.world().resource::<PlayerInputEnabled>().0);
    }

    #[test]
    fn won_transition_is_one_shot() {
        let mut app = test_app();

        // double-fire within one frame collapses into a single transition
        app.world_mut().send_event(GoalReached);
        app.world_mut().send_event(GoalReached);
        app.update();
        app.update();
        assert_eq!(session_state(&app), SessionState::Won);
        assert!(app.world().resource::<Time<Virtual>>().is_paused());
        assert!(!app.world().resource::<PlayerInputEnabled>().0);
        assert_eq!(panel_cues(&app), 1);

        // and firing again from Won changes nothing
        app.world_mut().send_event(GoalReached);
        app.update();
        app.update();
        assert_eq!(session_state(&app), SessionState::Won);
        assert_eq!(panel_cues(&app), 1);
    }

    #[test]
    fn terminal_states_ignore_pause_and_each_other() {
        let mut app = test_app();

        app.world_mut().send_event(ClockExpired);
        app.update();
        app.update();
        assert_eq!(session_state(&app), SessionState::Lost);

        // pause key is a no-op on a terminal screen
        press_pause(&mut app);
        assert_eq!(session_state(&app), SessionState::Lost);

        // winning after losing is impossible within the same instance
        app.world_mut().send_event(GoalReached);
        app.update();
        app.update();
        assert_eq!(session_state(&app), SessionState::Lost);
    }

    #[test]
    fn expiry_cannot_fire_while_paused() {
        let mut app = test_app();
        press_pause(&mut app);

        // even if an expiry event somehow arrives while paused, the guard
        // keeps the session in Paused
        app.world_mut().send_event(ClockExpired);
        app.update();
        app.update();
        assert_eq!(session_state(&app), SessionState::Paused);
    }
}
