use bevy::prelude::*;
use bevy_egui::egui::{self, Align2, Color32, FontId, RichText};

use crate::audio::{CueKind, PlayCue};
use crate::domain::simulation::level::LevelRequest;

pub fn show_lose_panel(
    ctx: &mut egui::Context,
    levels: &mut EventWriter<LevelRequest>,
    cues: &mut EventWriter<PlayCue>,
) {
    egui::Area::new("lose_banner".into())
        .anchor(Align2::CENTER_CENTER, egui::Vec2::new(0.0, -120.0))
        .show(ctx, |ui| {
            ui.label(
                RichText::new("Time's Up!")
                    .font(FontId::proportional(48.0))
                    .color(Color32::RED),
            );
        });

    egui::Window::new("Defeat")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            if ui.button("Retry").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                levels.send(LevelRequest::Restart);
            }
            if ui.button("Main Menu").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                levels.send(LevelRequest::Menu);
            }
        });
}
