//! Skyreach: a small first-person 3D platformer built around a frame-driven
//! session layer. The library half exposes the domain plugins so the binary
//! stays a thin app assembler and the state machines stay unit-testable.

use bevy::prelude::*;

pub mod audio;
pub mod domain;

/// Camera used while no level is loaded. Level loads deactivate it in favor
/// of the player's head camera; returning to the menu re-activates it.
#[derive(Component)]
pub struct MenuCamera;
