//! Game state and core simulation types
//!
//! Everything that drives a run lives here: the player entity with its
//! vertical kinematics, the session bookkeeping (score, power-up, pending
//! game-over), and the top-level `GameState` bundle the tick advances.
//! Session flags that were historically scattered globals (controls enabled,
//! one-shot guards, death state) are fields on one struct so `reset` is
//! trivially complete.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::tuning::Tuning;

use super::pattern::PatternSpec;
use super::world::{PickupKind, WorldMap};

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Active gameplay
    Running,
    /// Run ended; terminal until an explicit reset
    GameOver,
}

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    FellIntoPit,
    OffScreen,
    Hazard,
}

/// Input commands for a single tick. Jump events are pushed by the host
/// (edge-triggered), never polled.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Jump button went down this tick
    pub jump_pressed: bool,
    /// Jump button went up this tick
    pub jump_released: bool,
    /// Demo autoplay - the sim synthesizes its own jump input
    pub idle_mode: bool,
}

/// Side-effect requests for the host's collaborators (animation, audio).
/// Drained once per frame; the sim never calls collaborators directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Jumped,
    DoubleJumped,
    Landed,
    PickupCollected { kind: PickupKind, pos: Vec2 },
    PowerUpStarted,
    /// Final-second blink cue
    PowerUpEnding,
    PowerUpEnded,
    /// Lethal contact; the die animation and hit effect play here
    PlayerHit { pos: Vec2 },
    GameOver { reason: GameOverReason },
}

/// The player entity. `y` is the center of a square hitbox with half-extent
/// `radius`; world Y grows downward.
#[derive(Debug, Clone, Copy)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub vel_y: f32,
    pub radius: f32,
    pub on_ground: bool,
    /// Budget of additional mid-air jumps; a ground jump is free
    pub jumps_left: u32,
    pub max_jumps: u32,
    pub holding_jump: bool,
    pub hold_elapsed: f32,
    pub dead: bool,
    /// Bottom edge before the last integration step, for crossing tests
    pub prev_bottom: f32,
}

impl Player {
    /// Spawn grounded at `x` on the baseline surface
    pub fn new(x: f32, tuning: &Tuning) -> Self {
        let radius = tuning.player_radius;
        Self {
            x,
            y: BASE_SURFACE_Y - radius,
            vel_y: 0.0,
            radius,
            on_ground: true,
            jumps_left: tuning.max_air_jumps,
            max_jumps: tuning.max_air_jumps,
            holding_jump: false,
            hold_elapsed: 0.0,
            dead: false,
            prev_bottom: BASE_SURFACE_Y,
        }
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.radius
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x - self.radius
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.radius
    }

    /// Jump-start input. Grounded jumps are free; airborne jumps consume the
    /// budget; with the budget spent the input is ignored entirely.
    /// Returns the event to emit, if the jump happened.
    pub fn press_jump(&mut self, tuning: &Tuning) -> Option<GameEvent> {
        if self.dead {
            return None;
        }
        if self.on_ground {
            self.vel_y = -tuning.jump_speed;
            self.on_ground = false;
            self.holding_jump = true;
            self.hold_elapsed = 0.0;
            Some(GameEvent::Jumped)
        } else if self.jumps_left > 0 {
            self.jumps_left -= 1;
            self.vel_y = -tuning.jump_speed;
            self.holding_jump = true;
            self.hold_elapsed = 0.0;
            Some(GameEvent::DoubleJumped)
        } else {
            None
        }
    }

    /// Jump-end input; stops the hold extension
    pub fn release_jump(&mut self) {
        self.holding_jump = false;
    }

    /// Advance horizontally (camera speed times the player factor)
    pub fn advance(&mut self, dist: f32) {
        if !self.dead {
            self.x += dist;
        }
    }

    /// One integration step against the support surface at the player's X.
    ///
    /// Landing is a downward crossing test: previous bottom at/above the
    /// surface, new bottom at/below it, while descending. A player already
    /// below the surface is never snapped up.
    pub fn integrate(&mut self, dt: f32, support_y: f32, tuning: &Tuning) {
        self.prev_bottom = self.bottom();
        if self.dead {
            return;
        }

        if self.on_ground {
            let step = support_y - self.bottom();
            if step.abs() <= tuning.step_tolerance {
                // Follow small surface steps between adjacent patterns
                self.y = support_y - self.radius;
                return;
            }
            // Support fell away - walked off an edge, onto a pit, into void
            self.on_ground = false;
        }

        let gravity = if self.holding_jump
            && self.vel_y < 0.0
            && self.hold_elapsed < tuning.max_jump_hold
        {
            self.hold_elapsed += dt;
            tuning.gravity * tuning.hold_gravity_fraction
        } else {
            tuning.gravity
        };
        self.vel_y += gravity * dt;
        self.y += self.vel_y * dt;

        if self.vel_y >= 0.0 && self.prev_bottom <= support_y && self.bottom() >= support_y {
            self.land(support_y);
        }
    }

    /// Snap onto a surface top and restore the jump budget
    pub fn land(&mut self, surface_y: f32) {
        self.y = surface_y - self.radius;
        self.vel_y = 0.0;
        self.on_ground = true;
        self.jumps_left = self.max_jumps;
        self.hold_elapsed = 0.0;
    }
}

/// A queued soft game-over waiting out its grace window
#[derive(Debug, Clone, Copy)]
pub struct PendingGameOver {
    pub reason: GameOverReason,
    pub remaining: f32,
}

/// Per-run bookkeeping. One struct, one owner, no ambient globals.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: GamePhase,
    pub game_over_reason: Option<GameOverReason>,
    /// Monotonically increasing; fed by pickups and distance tiers
    pub score: u64,
    /// Distance tiers already paid out
    pub distance_tier: u64,
    /// Power-up tiers already activated
    pub powerup_tier: u64,
    /// Invincibility seconds remaining (0 = inactive)
    pub invincible_remaining: f32,
    /// One-shot guard for the end-of-invincibility blink cue
    pub blink_announced: bool,
    pub controls_enabled: bool,
    pub pending_game_over: Option<PendingGameOver>,
    /// Runs after a lethal hit; forced game-over when it expires
    pub death_timer: Option<f32>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::Running,
            game_over_reason: None,
            score: 0,
            distance_tier: 0,
            powerup_tier: 0,
            invincible_remaining: 0.0,
            blink_announced: false,
            controls_enabled: true,
            pending_game_over: None,
            death_timer: None,
        }
    }

    #[inline]
    pub fn is_invincible(&self) -> bool {
        self.invincible_remaining > 0.0
    }

    /// Queue a soft game-over behind the grace window. Only one is ever
    /// pending, and the first request wins: conditions that persist
    /// re-request every tick, and letting them restart the timer would keep
    /// the window from ever elapsing. The slot frees when the timer expires
    /// (fired or cancelled by the recovery re-check).
    pub fn request_game_over(&mut self, reason: GameOverReason, grace: f32) {
        if self.pending_game_over.is_none() {
            self.pending_game_over = Some(PendingGameOver { reason, remaining: grace });
        }
    }

    /// Commit a game-over immediately, bypassing grace and suppression
    pub fn force_game_over(&mut self, reason: GameOverReason) {
        self.phase = GamePhase::GameOver;
        self.game_over_reason = Some(reason);
        self.pending_game_over = None;
        self.controls_enabled = false;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the player spawns inside the opening pattern
pub const PLAYER_SPAWN_X: f32 = 200.0;
/// Nominal length of the guaranteed-safe opening pattern
pub const OPENING_PATTERN_LEN: f32 = 1400.0;

/// Complete game state advanced by [`tick`](super::tick::tick)
#[derive(Debug)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Tuning,
    pub world: WorldMap,
    pub player: Player,
    pub session: SessionState,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// World-generation RNG; every draw goes through here so a seed
    /// reproduces a run exactly
    pub rng: Pcg32,
    /// Side-effect queue, drained by the host each frame
    pub events: Vec<GameEvent>,
    spawn_x: f32,
}

impl GameState {
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let tuning = tuning.sanitized();
        let mut world = WorldMap::new(&tuning);
        // Deterministic safe ground under the spawn point; the tick spawner
        // fills everything beyond it
        let opening = PatternSpec::plain_ground(OPENING_PATTERN_LEN, true, true, &tuning);
        world.add_pattern(&opening, 0.0);

        let player = Player::new(PLAYER_SPAWN_X, &tuning);
        Self {
            seed,
            tuning,
            world,
            player,
            session: SessionState::new(),
            time_ticks: 0,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            spawn_x: PLAYER_SPAWN_X,
        }
    }

    /// World distance the player has covered this run
    #[inline]
    pub fn distance(&self) -> f32 {
        self.player.x - self.spawn_x
    }

    /// Hand the queued side-effect requests to the host
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Restart: rebuild the world from scratch (factories re-draw their own
    /// randomness from the continuing RNG stream), fresh player and session.
    pub fn reset(&mut self) {
        self.world.reset();
        let opening = PatternSpec::plain_ground(OPENING_PATTERN_LEN, true, true, &self.tuning);
        self.world.add_pattern(&opening, 0.0);
        self.player = Player::new(PLAYER_SPAWN_X, &self.tuning);
        self.session = SessionState::new();
        self.time_ticks = 0;
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> Tuning {
        Tuning::default()
    }

    #[test]
    fn ground_jump_is_free_air_jumps_consume_budget() {
        let t = tuning();
        let mut p = Player::new(0.0, &t);
        assert_eq!(p.jumps_left, 2);

        // Ground jump: free
        assert_eq!(p.press_jump(&t), Some(GameEvent::Jumped));
        assert!(!p.on_ground);
        assert_eq!(p.jumps_left, 2);

        // Two air jumps consume the budget
        assert_eq!(p.press_jump(&t), Some(GameEvent::DoubleJumped));
        assert_eq!(p.jumps_left, 1);
        assert_eq!(p.press_jump(&t), Some(GameEvent::DoubleJumped));
        assert_eq!(p.jumps_left, 0);

        // Third air jump: ignored, no velocity change
        let vel = p.vel_y;
        assert_eq!(p.press_jump(&t), None);
        assert_eq!(p.vel_y, vel);

        // Landing restores the budget
        p.land(BASE_SURFACE_Y);
        assert_eq!(p.jumps_left, 2);
        assert!(p.on_ground);
    }

    #[test]
    fn landing_requires_downward_crossing() {
        let t = tuning();
        let surface = BASE_SURFACE_Y;

        // Descending across the surface: lands
        let mut p = Player::new(0.0, &t);
        p.on_ground = false;
        p.y = surface - p.radius - 5.0;
        p.vel_y = 300.0;
        p.integrate(0.05, surface, &t);
        assert!(p.on_ground);
        assert_eq!(p.vel_y, 0.0);
        assert_eq!(p.bottom(), surface);

        // Already below the surface: never snapped up
        let mut p = Player::new(0.0, &t);
        p.on_ground = false;
        p.y = surface + 100.0;
        p.vel_y = 300.0;
        p.integrate(0.05, surface, &t);
        assert!(!p.on_ground);
        assert!(p.y > surface + 100.0);

        // Ascending through the surface line: no landing
        let mut p = Player::new(0.0, &t);
        p.on_ground = false;
        p.y = surface - p.radius - 5.0;
        p.vel_y = -800.0;
        p.integrate(0.01, surface, &t);
        assert!(!p.on_ground);
    }

    #[test]
    fn hold_extends_ascent() {
        let t = tuning();
        let dt = 0.01;

        // Held jump: reduced gravity while ascending within the hold budget
        let mut held = Player::new(0.0, &t);
        held.press_jump(&t);
        held.integrate(dt, VOID_SURFACE_Y, &t);

        let mut released = Player::new(0.0, &t);
        released.press_jump(&t);
        released.release_jump();
        released.integrate(dt, VOID_SURFACE_Y, &t);

        // The held jump decelerates less
        assert!(held.vel_y < released.vel_y);
        let expected_held = -t.jump_speed + t.gravity * t.hold_gravity_fraction * dt;
        let expected_released = -t.jump_speed + t.gravity * dt;
        assert!((held.vel_y - expected_held).abs() < 0.01);
        assert!((released.vel_y - expected_released).abs() < 0.01);
    }

    #[test]
    fn hold_budget_expires() {
        let t = tuning();
        let dt = 0.01;
        let mut p = Player::new(0.0, &t);
        p.press_jump(&t);

        // Burn through the whole hold budget
        let steps = (t.max_jump_hold / dt).ceil() as u32 + 1;
        for _ in 0..steps {
            p.integrate(dt, VOID_SURFACE_Y, &t);
        }
        assert!(p.hold_elapsed >= t.max_jump_hold);

        // Past the budget full gravity applies even while held
        let before = p.vel_y;
        p.integrate(dt, VOID_SURFACE_Y, &t);
        assert!((p.vel_y - before - t.gravity * dt).abs() < 0.01);
    }

    #[test]
    fn grounded_player_follows_small_steps_and_falls_off_large_ones() {
        let t = tuning();
        let mut p = Player::new(0.0, &t);

        // Small step: follow
        p.integrate(0.01, BASE_SURFACE_Y - 20.0, &t);
        assert!(p.on_ground);
        assert_eq!(p.bottom(), BASE_SURFACE_Y - 20.0);

        // Support gone: release into free fall
        p.integrate(0.01, VOID_SURFACE_Y, &t);
        assert!(!p.on_ground);
        assert!(p.vel_y > 0.0);
    }

    #[test]
    fn dead_player_is_frozen() {
        let t = tuning();
        let mut p = Player::new(0.0, &t);
        p.dead = true;
        let (x, y) = (p.x, p.y);
        p.advance(100.0);
        p.integrate(0.1, VOID_SURFACE_Y, &t);
        assert_eq!(p.press_jump(&t), None);
        assert_eq!((p.x, p.y), (x, y));
    }

    #[test]
    fn new_game_state_spawns_grounded_on_safe_ground() {
        let state = GameState::new(1234);
        assert!(state.player.on_ground);
        assert!(state.world.is_on_pattern(state.player.x));
        assert!(!state.world.is_over_pit(state.player.x));
        assert_eq!(state.session.phase, GamePhase::Running);
    }

    #[test]
    fn reset_rebuilds_a_fresh_run() {
        let mut state = GameState::new(99);
        state.session.score = 500;
        state.session.force_game_over(GameOverReason::Hazard);
        state.player.dead = true;
        state.player.x += 4000.0;

        state.reset();
        assert_eq!(state.session.score, 0);
        assert_eq!(state.session.phase, GamePhase::Running);
        assert!(!state.player.dead);
        assert!(state.player.on_ground);
        assert_eq!(state.distance(), 0.0);
        assert!(state.world.is_on_pattern(state.player.x));
    }
}
