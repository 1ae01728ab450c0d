//! Per-tick simulation advance
//!
//! The single entry point driving a run. Order within one tick is strict:
//! world spawning, world/camera advance, player input + physics against the
//! post-advance surface, collision resolution on the post-integration
//! position, then score/power-up/game-over bookkeeping. Resolving against
//! stale surface data is how phantom deaths happen, so the order is not
//! negotiable.

use rand::Rng;

use crate::consts::*;

use super::collision;
use super::pattern::{self, PatternSpec};
use super::state::{GameEvent, GameOverReason, GamePhase, GameState, TickInput};

/// Spawner backstop: patterns placed per tick, far above anything a real
/// horizon ever needs
const MAX_SPAWNS_PER_TICK: u32 = 8;

/// Advance the game state by one timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Malformed dt is a driver bug; never let it corrupt the world
    if !dt.is_finite() || dt <= 0.0 {
        log::warn!("ignoring tick with bad dt={dt}");
        return;
    }
    let dt = dt.min(MAX_TICK_DT);

    if state.session.phase == GamePhase::GameOver {
        return;
    }

    // Demo autoplay synthesizes its own jump input
    let mut input = input.clone();
    if input.idle_mode {
        synthesize_idle_input(state, &mut input);
    }
    let input = &input;

    state.time_ticks += 1;

    // (a) keep the world populated ahead of the camera
    spawn_ahead(state);

    // (b) world/camera advance
    let advance = state.world.update(dt, state.tuning.speed_accel);

    // (c) input + physics against the post-advance support query
    if state.session.controls_enabled {
        if input.jump_pressed {
            if let Some(event) = state.player.press_jump(&state.tuning) {
                state.events.push(event);
            }
        }
        if input.jump_released {
            state.player.release_jump();
        }
    }
    state.player.advance(advance.speed * state.tuning.player_speed_factor * dt);
    let was_airborne = !state.player.on_ground;
    let support = state.world.support_y_at(state.player.x);
    state.player.integrate(dt, support, &state.tuning);
    if was_airborne && state.player.on_ground {
        state.events.push(GameEvent::Landed);
    }

    // (d) collision & outcome resolution on the post-integration position
    collision::resolve(
        &mut state.player,
        &mut state.world,
        &mut state.session,
        &mut state.events,
        &state.tuning,
    );

    // (e) bookkeeping
    award_distance_score(state);
    update_powerup(state, dt);
    update_death_and_grace(state, dt);
}

/// Fill the world up to the camera horizon. Factory failure substitutes
/// guaranteed-safe plain ground - one bad pattern never aborts the tick.
fn spawn_ahead(state: &mut GameState) {
    let horizon = state.world.scroll() + VIEWPORT_WIDTH + SPAWN_LOOKAHEAD;
    let mut spawned = 0;
    while state.world.frontier() < horizon && spawned < MAX_SPAWNS_PER_TICK {
        spawned += 1;
        let start_x = state.world.frontier();

        // Occasional inter-pattern gap once hazards are open, registered as
        // a pit so the fall-through check knows about it
        let mut place_x = start_x;
        if start_x >= state.tuning.hazard_distance_threshold && state.rng.random_bool(0.15) {
            let width = state
                .rng
                .random_range(state.tuning.gap_min..=state.tuning.gap_max);
            state.world.add_pit(start_x, width);
            place_x = start_x + width;
        }

        let kind = pattern::choose_pattern(place_x, &mut state.rng, &state.tuning);
        let rng = &mut state.rng;
        let tuning = &state.tuning;
        let placed = state
            .world
            .add_pattern_with(place_x, |sx| kind.build(sx, rng, tuning));
        if placed.is_none() {
            let substitute = PatternSpec::plain_ground(700.0, true, true, &state.tuning);
            state.world.add_pattern(&substitute, place_x);
        }
    }
}

/// Distance scoring: one payout per tier crossed, catching up over every
/// tier a large frame delta skipped
fn award_distance_score(state: &mut GameState) {
    let target = (state.distance().max(0.0) / state.tuning.distance_score_step) as u64;
    while state.session.distance_tier < target {
        state.session.distance_tier += 1;
        state.session.score += state.tuning.distance_score_points;
    }
}

/// Power-up activation on score tiers, plus the invincibility countdown.
/// Bringing `powerup_tier` fully current makes a multi-tier score jump in
/// one tick activate exactly once.
fn update_powerup(state: &mut GameState, dt: f32) {
    let tier = state.session.score / state.tuning.powerup_score_step;
    if tier > state.session.powerup_tier {
        state.session.powerup_tier = tier;
        state.session.invincible_remaining = state.tuning.invincibility_duration;
        state.session.blink_announced = false;
        state.events.push(GameEvent::PowerUpStarted);
    }

    if state.session.invincible_remaining > 0.0 {
        state.session.invincible_remaining -= dt;
        if !state.session.blink_announced
            && state.session.invincible_remaining <= state.tuning.invincibility_blink_window
        {
            state.session.blink_announced = true;
            state.events.push(GameEvent::PowerUpEnding);
        }
        if state.session.invincible_remaining <= 0.0 {
            state.session.invincible_remaining = 0.0;
            state.events.push(GameEvent::PowerUpEnded);
        }
    }
}

/// Death-effect and grace-window timers.
///
/// The death timer forces the game-over unconditionally - a lethal hit ends
/// the run regardless of footing. The grace timer re-checks its condition at
/// expiry: a player back on a pattern and grounded cancels the soft
/// game-over (transient off-camera flickers self-correct here).
fn update_death_and_grace(state: &mut GameState, dt: f32) {
    if let Some(timer) = state.session.death_timer.take() {
        let timer = timer - dt;
        if timer > 0.0 {
            state.session.death_timer = Some(timer);
        } else {
            state.session.force_game_over(GameOverReason::Hazard);
            state.events.push(GameEvent::GameOver { reason: GameOverReason::Hazard });
            log::info!(
                "game over: hazard (score {}, distance {:.0})",
                state.session.score,
                state.distance()
            );
            return;
        }
    }

    if let Some(pending) = state.session.pending_game_over.take() {
        let remaining = pending.remaining - dt;
        if remaining > 0.0 {
            state.session.pending_game_over =
                Some(super::state::PendingGameOver { remaining, ..pending });
        } else if state.world.is_on_pattern(state.player.x) && state.player.on_ground {
            log::debug!("soft game-over cancelled, player recovered");
        } else {
            state.session.force_game_over(pending.reason);
            state.events.push(GameEvent::GameOver { reason: pending.reason });
            log::info!(
                "game over: {:?} (score {}, distance {:.0})",
                pending.reason,
                state.session.score,
                state.distance()
            );
        }
    }
}

/// Demo autoplay: jump over whatever is coming, stop holding at the apex
fn synthesize_idle_input(state: &GameState, input: &mut TickInput) {
    let player = &state.player;
    if player.dead || !state.session.controls_enabled {
        return;
    }

    if player.on_ground {
        let reach = state.world.speed() * state.tuning.player_speed_factor * 0.35 + 80.0;
        let surface = state.world.surface_y_at(player.x);
        let threat_ahead = state.world.obstacles().any(|(_, c)| {
            c.top_y < surface && c.x < player.right() + reach && c.right() > player.right()
        });
        let pit_ahead = state.world.is_over_pit(player.x + reach * 0.5)
            || state.world.is_over_pit(player.x + reach);
        if threat_ahead || pit_ahead {
            input.jump_pressed = true;
        }
    } else if player.vel_y >= 0.0 && player.holding_jump {
        input.jump_released = true;
    }
}
