//! HUD, menus, and UX overlays. Systems here are thin: each one picks the
//! resources the current state needs and hands them to a panel function.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPlugin};

use crate::audio::{AudioSettings, PlayCue};
use crate::domain::session::clock::LevelClock;
use crate::domain::session::{AppState, SessionSettings, SessionState};
use crate::domain::simulation::level::{CurrentLevel, LevelCatalog, LevelRequest};

pub mod panels;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .add_systems(Update, menu_ui.run_if(in_state(AppState::Menu)))
            .add_systems(Update, hud_ui.run_if(in_state(AppState::InGame)))
            .add_systems(
                Update,
                pause_ui
                    .run_if(in_state(AppState::InGame))
                    .run_if(in_state(SessionState::Paused)),
            )
            .add_systems(
                Update,
                win_ui
                    .run_if(in_state(AppState::InGame))
                    .run_if(in_state(SessionState::Won)),
            )
            .add_systems(
                Update,
                lose_ui
                    .run_if(in_state(AppState::InGame))
                    .run_if(in_state(SessionState::Lost)),
            );
    }
}

fn menu_ui(
    mut contexts: EguiContexts,
    catalog: Res<LevelCatalog>,
    mut session_settings: ResMut<SessionSettings>,
    mut audio_settings: ResMut<AudioSettings>,
    mut levels: EventWriter<LevelRequest>,
    mut cues: EventWriter<PlayCue>,
    mut exit: EventWriter<AppExit>,
) {
    panels::menu_panel::show_menu_panel(
        contexts.ctx_mut(),
        &catalog,
        &mut session_settings,
        &mut audio_settings,
        &mut levels,
        &mut cues,
        &mut exit,
    );
}

fn hud_ui(
    mut contexts: EguiContexts,
    clock: Res<LevelClock>,
    current: Option<Res<CurrentLevel>>,
) {
    panels::hud::show_hud(contexts.ctx_mut(), &clock, current.as_deref());
}

fn pause_ui(
    mut contexts: EguiContexts,
    mut next_session: ResMut<NextState<SessionState>>,
    mut levels: EventWriter<LevelRequest>,
    mut cues: EventWriter<PlayCue>,
) {
    panels::pause_panel::show_pause_panel(
        contexts.ctx_mut(),
        &mut next_session,
        &mut levels,
        &mut cues,
    );
}

fn win_ui(
    mut contexts: EguiContexts,
    settings: Res<SessionSettings>,
    mut levels: EventWriter<LevelRequest>,
    mut cues: EventWriter<PlayCue>,
) {
    panels::win_panel::show_win_panel(contexts.ctx_mut(), &settings, &mut levels, &mut cues);
}

fn lose_ui(
    mut contexts: EguiContexts,
    mut levels: EventWriter<LevelRequest>,
    mut cues: EventWriter<PlayCue>,
) {
    panels::lose_panel::show_lose_panel(contexts.ctx_mut(), &mut levels, &mut cues);
}
