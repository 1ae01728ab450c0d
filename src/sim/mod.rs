//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only, injected into the pattern factories
//! - No wall-clock reads; every timer accumulates dt
//! - No rendering, audio, or platform dependencies - side effects leave as
//!   [`GameEvent`]s for the host to dispatch

pub mod collision;
pub mod pattern;
pub mod state;
pub mod tick;
pub mod world;

pub use collision::Aabb;
pub use pattern::{Difficulty, PatternError, PatternKind, PatternSpec, choose_pattern};
pub use state::{
    GameEvent, GameOverReason, GamePhase, GameState, Player, SessionState, TickInput,
};
pub use tick::tick;
pub use world::{Advance, Collider, ColliderHandle, ColliderKind, Pickup, PickupKind, WorldMap};
