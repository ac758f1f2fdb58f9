use bevy::prelude::*;
use bevy_egui::egui::{self, Align2, Color32, FontId, RichText};

use crate::audio::{CueKind, PlayCue};
use crate::domain::session::SessionSettings;
use crate::domain::simulation::level::LevelRequest;

pub fn show_win_panel(
    ctx: &mut egui::Context,
    settings: &SessionSettings,
    levels: &mut EventWriter<LevelRequest>,
    cues: &mut EventWriter<PlayCue>,
) {
    egui::Area::new("win_banner".into())
        .anchor(Align2::CENTER_CENTER, egui::Vec2::new(0.0, -120.0))
        .show(ctx, |ui| {
            ui.label(
                RichText::new("Level Complete!")
                    .font(FontId::proportional(48.0))
                    .color(Color32::GREEN),
            );
        });

    egui::Window::new("Victory")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            if settings.auto_advance {
                ui.label(format!(
                    "Next level in {:.0} seconds...",
                    settings.auto_advance_delay
                ));
                ui.separator();
            }
            if ui.button("Next Level").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                levels.send(LevelRequest::Next);
            }
            if ui.button("Replay").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                levels.send(LevelRequest::Restart);
            }
            if ui.button("Main Menu").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                levels.send(LevelRequest::Menu);
            }
        });
}
