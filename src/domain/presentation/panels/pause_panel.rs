use bevy::prelude::*;
use bevy_egui::egui;

use crate::audio::{CueKind, PlayCue};
use crate::domain::session::SessionState;
use crate::domain::simulation::level::LevelRequest;

pub fn show_pause_panel(
    ctx: &mut egui::Context,
    next_session: &mut NextState<SessionState>,
    levels: &mut EventWriter<LevelRequest>,
    cues: &mut EventWriter<PlayCue>,
) {
    egui::Window::new("Paused")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            if ui.button("Resume").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                next_session.set(SessionState::Playing);
            }
            if ui.button("Restart Level").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                levels.send(LevelRequest::Restart);
            }
            if ui.button("Main Menu").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                levels.send(LevelRequest::Menu);
            }
        });
}
