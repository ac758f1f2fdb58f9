//! Domain modules split by discipline so teams can work independently.
//! - `controls`: keybinds and per-frame input gathering.
//! - `presentation`: HUD, menus, and UX overlays.
//! - `session`: the level session state machine, clock, and scheduler.
//! - `simulation`: physics, level content, and authoritative game state.

pub mod controls;
pub mod presentation;
pub mod session;
pub mod simulation;

pub use controls::InputPlugin;
pub use presentation::UiPlugin;
pub use session::{AppState, SessionPlugin, SessionState};
pub use simulation::player::PlayerPlugin;
pub use simulation::SimulationPlugin;
