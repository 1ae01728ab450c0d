//! Canyon Dash - a side-scrolling endless runner simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain, physics, collisions, game state)
//! - `hooks`: Collaborator interfaces (animation, audio, debug drawing)
//! - `tuning`: Data-driven game balance

pub mod hooks;
pub mod sim;
pub mod tuning;

pub use tuning::Tuning;

/// Engine constants (fixed by the simulation, not tunable balance)
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest dt a single tick will accept; anything bigger is clamped
    pub const MAX_TICK_DT: f32 = 0.1;

    /// Viewport extent in world units (camera-relative)
    pub const VIEWPORT_WIDTH: f32 = 1920.0;
    pub const VIEWPORT_HEIGHT: f32 = 1080.0;

    /// Baseline surface Y for placed patterns (world Y grows downward)
    pub const BASE_SURFACE_Y: f32 = 900.0;
    /// Surface Y reported where nothing covers an X - far below the play
    /// area so an unsupported player free-falls convincingly
    pub const VOID_SURFACE_Y: f32 = 100_000.0;

    /// Thickness of the ground collider strip tracking a pattern surface
    pub const GROUND_STRIP_HEIGHT: f32 = 6.0;
    /// Colliders fully behind `scroll - GC_MARGIN` are garbage-collected
    pub const GC_MARGIN: f32 = 400.0;
    /// How far past the right viewport edge patterns are spawned ahead
    pub const SPAWN_LOOKAHEAD: f32 = 600.0;
    /// Off-screen slack below the viewport before the off-camera check queues
    pub const OFFSCREEN_MARGIN: f32 = 300.0;
}

/// Does `[a0, a1)` overlap `[b0, b1)` on one axis?
#[inline]
pub fn spans_overlap(a0: f32, a1: f32, b0: f32, b1: f32) -> bool {
    a0 < b1 && b0 < a1
}
