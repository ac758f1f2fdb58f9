pub mod hud;
pub mod lose_panel;
pub mod menu_panel;
pub mod pause_panel;
pub mod win_panel;
