use bevy_egui::egui::{self, Align2, Color32, FontId, RichText};

use crate::domain::session::clock::LevelClock;
use crate::domain::simulation::level::CurrentLevel;

pub fn show_hud(ctx: &mut egui::Context, clock: &LevelClock, current: Option<&CurrentLevel>) {
    egui::Area::new("hud_timer".into())
        .anchor(Align2::CENTER_TOP, egui::Vec2::new(0.0, 12.0))
        .show(ctx, |ui| {
            let color = if clock.in_warning() {
                Color32::RED
            } else {
                Color32::WHITE
            };
            ui.vertical_centered(|ui| {
                ui.label(
                    RichText::new(format!("Time: {}", format_time(clock.remaining())))
                        .font(FontId::proportional(28.0))
                        .color(color),
                );
                if let Some(level) = current {
                    ui.label(
                        RichText::new(level.config.name.as_str())
                            .font(FontId::proportional(14.0))
                            .color(Color32::LIGHT_GRAY),
                    );
                }
            });
        });
}

pub fn format_time(seconds: f32) -> String {
    let total = seconds.max(0.0) as u32;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(9.4), "00:09");
        assert_eq!(format_time(75.0), "01:15");
        assert_eq!(format_time(-3.0), "00:00");
    }
}
