use bevy::app::AppExit;
use bevy::prelude::*;
use bevy_egui::egui::{self, Align2, Color32, FontId, RichText};

use crate::audio::{AudioSettings, CueKind, PlayCue};
use crate::domain::session::SessionSettings;
use crate::domain::simulation::level::{LevelCatalog, LevelRequest};

#[allow(clippy::too_many_arguments)]
pub fn show_menu_panel(
    ctx: &mut egui::Context,
    catalog: &LevelCatalog,
    session_settings: &mut SessionSettings,
    audio_settings: &mut AudioSettings,
    levels: &mut EventWriter<LevelRequest>,
    cues: &mut EventWriter<PlayCue>,
    exit: &mut EventWriter<AppExit>,
) {
    egui::Area::new("menu_title".into())
        .anchor(Align2::CENTER_TOP, egui::Vec2::new(0.0, 60.0))
        .show(ctx, |ui| {
            ui.label(
                RichText::new("SKYREACH")
                    .font(FontId::proportional(56.0))
                    .color(Color32::WHITE),
            );
        });

    egui::Window::new("Main Menu")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label("Select a level:");
            for (index, name) in catalog.names().enumerate() {
                if ui.button(name).clicked() {
                    cues.send(PlayCue(CueKind::ButtonClick));
                    levels.send(LevelRequest::Index(index));
                }
            }

            ui.separator();

            ui.checkbox(&mut session_settings.auto_advance, "Auto-advance levels");
            ui.add(
                egui::Slider::new(&mut audio_settings.music_volume, 0.0..=1.0)
                    .text("Music Volume"),
            );
            ui.add(
                egui::Slider::new(&mut audio_settings.sfx_volume, 0.0..=1.0).text("SFX Volume"),
            );

            ui.separator();

            if ui.button("Quit").clicked() {
                cues.send(PlayCue(CueKind::ButtonClick));
                exit.send(AppExit::Success);
            }
        });
}
