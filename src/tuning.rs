//! Data-driven game balance
//!
//! Every gameplay constant lives here so balance passes never touch the
//! simulation code. Values are the shipped defaults; a JSON blob can
//! override them at startup (sanitized - a bad config degrades to defaults
//! per field group, it never crashes the sim).

use serde::{Deserialize, Serialize};

/// Gameplay tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Player kinematics ===
    /// Downward acceleration (world units/s^2)
    pub gravity: f32,
    /// Initial upward speed of a jump (world units/s)
    pub jump_speed: f32,
    /// Gravity fraction applied while the jump button is held during ascent
    pub hold_gravity_fraction: f32,
    /// Budget of hold-extended ascent time per jump (seconds)
    pub max_jump_hold: f32,
    /// Additional mid-air jumps available after leaving the ground
    pub max_air_jumps: u32,
    /// Player half-extent (square hitbox)
    pub player_radius: f32,
    /// Player advances slightly faster than the camera so it can close
    /// distance on stationary obstacles
    pub player_speed_factor: f32,
    /// Grounded players follow surface steps up to this height difference;
    /// anything larger releases them into free fall
    pub step_tolerance: f32,

    // === World scroll ===
    /// Scroll speed at the start of a run (world units/s)
    pub start_speed: f32,
    /// Scroll acceleration (world units/s^2, uncapped)
    pub speed_accel: f32,

    // === Pattern geometry ===
    /// Width of one ground tile
    pub tile_width: f32,
    /// Width of a ground end cap (extends past the nominal span)
    pub cap_width: f32,
    /// World distance after which hazard patterns enter the rotation
    pub hazard_distance_threshold: f32,
    /// Inter-pattern gap bounds once hazards are open (registered as pits)
    pub gap_min: f32,
    pub gap_max: f32,
    /// Clearance between a patrolling plane's belly and the surface
    pub plane_altitude: f32,

    // === Outcome thresholds ===
    /// Minimum downward speed before a pit fall can register
    pub pit_fall_vel: f32,
    /// How far below the expected surface the player's bottom must be
    pub pit_fall_depth: f32,
    /// Grace delay before a soft game-over commits (seconds)
    pub grace_delay: f32,
    /// Duration of the lethal-hit effect before the forced game-over
    pub death_effect_duration: f32,

    // === Scoring & power-up ===
    /// Distance per scoring tier (world units)
    pub distance_score_step: f32,
    /// Points awarded per distance tier
    pub distance_score_points: u64,
    /// Score interval that triggers an invincibility power-up
    pub powerup_score_step: u64,
    /// Invincibility duration (seconds)
    pub invincibility_duration: f32,
    /// Blink cue window at the end of invincibility (seconds)
    pub invincibility_blink_window: f32,
    /// Pickup hitbox edge length
    pub pickup_size: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 4000.0,
            jump_speed: 1400.0,
            hold_gravity_fraction: 0.45,
            max_jump_hold: 0.25,
            max_air_jumps: 2,
            player_radius: 45.0,
            player_speed_factor: 1.12,
            step_tolerance: 24.0,

            start_speed: 340.0,
            speed_accel: 9.0,

            tile_width: 70.0,
            cap_width: 35.0,
            hazard_distance_threshold: 6000.0,
            gap_min: 160.0,
            gap_max: 300.0,
            plane_altitude: 150.0,

            pit_fall_vel: 60.0,
            pit_fall_depth: 12.0,
            grace_delay: 0.45,
            death_effect_duration: 0.9,

            distance_score_step: 100.0,
            distance_score_points: 15,
            powerup_score_step: 1000,
            invincibility_duration: 6.0,
            invincibility_blink_window: 1.0,
            pickup_size: 36.0,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON, falling back to defaults on parse failure and
    /// sanitizing whatever was parsed.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Tuning>(json) {
            Ok(t) => t.sanitized(),
            Err(e) => {
                log::warn!("tuning config rejected ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Clamp every field into a usable range. Non-finite or non-positive
    /// values revert to the shipped default for that field.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        fn pos(name: &'static str, v: &mut f32, fallback: f32) {
            if !v.is_finite() || *v <= 0.0 {
                log::warn!("tuning field {name}={v} out of range, reverting to {fallback}");
                *v = fallback;
            }
        }

        pos("gravity", &mut self.gravity, d.gravity);
        pos("jump_speed", &mut self.jump_speed, d.jump_speed);
        pos("max_jump_hold", &mut self.max_jump_hold, d.max_jump_hold);
        pos("player_radius", &mut self.player_radius, d.player_radius);
        pos("step_tolerance", &mut self.step_tolerance, d.step_tolerance);
        pos("start_speed", &mut self.start_speed, d.start_speed);
        pos("tile_width", &mut self.tile_width, d.tile_width);
        pos("cap_width", &mut self.cap_width, d.cap_width);
        pos("gap_min", &mut self.gap_min, d.gap_min);
        pos("gap_max", &mut self.gap_max, d.gap_max);
        pos("plane_altitude", &mut self.plane_altitude, d.plane_altitude);
        pos("grace_delay", &mut self.grace_delay, d.grace_delay);
        pos(
            "death_effect_duration",
            &mut self.death_effect_duration,
            d.death_effect_duration,
        );
        pos(
            "distance_score_step",
            &mut self.distance_score_step,
            d.distance_score_step,
        );
        pos(
            "invincibility_duration",
            &mut self.invincibility_duration,
            d.invincibility_duration,
        );
        pos("pickup_size", &mut self.pickup_size, d.pickup_size);

        if !self.hold_gravity_fraction.is_finite() {
            self.hold_gravity_fraction = d.hold_gravity_fraction;
        }
        self.hold_gravity_fraction = self.hold_gravity_fraction.clamp(0.0, 1.0);

        if !self.player_speed_factor.is_finite() || self.player_speed_factor < 1.0 {
            log::warn!(
                "tuning field player_speed_factor={} out of range, reverting",
                self.player_speed_factor
            );
            self.player_speed_factor = d.player_speed_factor;
        }
        if !self.speed_accel.is_finite() || self.speed_accel < 0.0 {
            self.speed_accel = d.speed_accel;
        }
        if !self.hazard_distance_threshold.is_finite() || self.hazard_distance_threshold < 0.0 {
            self.hazard_distance_threshold = d.hazard_distance_threshold;
        }
        if self.gap_max < self.gap_min {
            self.gap_max = self.gap_min;
        }
        if !self.pit_fall_vel.is_finite() || self.pit_fall_vel < 0.0 {
            self.pit_fall_vel = d.pit_fall_vel;
        }
        if !self.pit_fall_depth.is_finite() || self.pit_fall_depth < 0.0 {
            self.pit_fall_depth = d.pit_fall_depth;
        }
        if !self.invincibility_blink_window.is_finite() || self.invincibility_blink_window < 0.0 {
            self.invincibility_blink_window = d.invincibility_blink_window;
        }
        if self.distance_score_points == 0 {
            self.distance_score_points = d.distance_score_points;
        }
        if self.powerup_score_step == 0 {
            self.powerup_score_step = d.powerup_score_step;
        }
        if self.max_air_jumps == 0 {
            self.max_air_jumps = d.max_air_jumps;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_sanitize() {
        let t = Tuning::default().sanitized();
        assert_eq!(t.gravity, 4000.0);
        assert_eq!(t.jump_speed, 1400.0);
        assert_eq!(t.max_air_jumps, 2);
    }

    #[test]
    fn bad_json_falls_back_to_defaults() {
        let t = Tuning::from_json("{ not json");
        assert_eq!(t.gravity, Tuning::default().gravity);
    }

    #[test]
    fn partial_json_overrides_one_field() {
        let t = Tuning::from_json(r#"{ "jump_speed": 1600.0 }"#);
        assert_eq!(t.jump_speed, 1600.0);
        assert_eq!(t.gravity, Tuning::default().gravity);
    }

    #[test]
    fn nan_and_negative_fields_revert() {
        let mut t = Tuning::default();
        t.gravity = f32::NAN;
        t.jump_speed = -5.0;
        t.hold_gravity_fraction = 3.0;
        let t = t.sanitized();
        assert_eq!(t.gravity, 4000.0);
        assert_eq!(t.jump_speed, 1400.0);
        assert_eq!(t.hold_gravity_fraction, 1.0);
    }

    #[test]
    fn gap_bounds_stay_ordered() {
        let mut t = Tuning::default();
        t.gap_min = 500.0;
        t.gap_max = 100.0;
        let t = t.sanitized();
        assert!(t.gap_max >= t.gap_min);
    }
}
