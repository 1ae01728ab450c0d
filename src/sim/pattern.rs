//! Pattern factories - self-contained world segments
//!
//! A pattern is an independently authored stretch of terrain: ground tiles
//! with end caps, plus optional obstacles, pits, patrolling planes and
//! pickups, all in pattern-local coordinates. Factories are stateless pure
//! functions of their inputs and the injected RNG; they know nothing about
//! the world that will host them. Geometry is validated here so the world
//! map never sees a degenerate spec.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tuning::Tuning;

/// Difficulty tag declared by each factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// The available pattern factories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    /// Flat ground, nothing hostile
    Plain,
    /// Landable blocks on flat ground
    BlockStep,
    /// Spike clusters on flat ground
    SpikeRun,
    /// Ground with pits carved into the span
    BrokenGround,
    /// A patrolling plane hazard sweeping above the ground
    PlanePatrol,
    /// Dense spikes with a block refuge
    SpikeGauntlet,
}

/// What an obstacle box does on contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Solid and landable
    Block,
    /// Lethal on any contact
    Spike,
}

/// An obstacle box in pattern-local coordinates
#[derive(Debug, Clone, Copy)]
pub struct ObstacleSpec {
    pub offset_x: f32,
    pub width: f32,
    pub height: f32,
    pub kind: ObstacleKind,
}

/// A span with no ground, in pattern-local coordinates
#[derive(Debug, Clone, Copy)]
pub struct PitSpec {
    pub offset_x: f32,
    pub width: f32,
}

/// A horizontally patrolling plane hazard. `offset_x` anchors the sweep
/// center; the visual position oscillates `amplitude` units to either side.
#[derive(Debug, Clone, Copy)]
pub struct MoverSpec {
    pub offset_x: f32,
    pub width: f32,
    pub height: f32,
    /// Clearance between the plane's belly and the surface
    pub altitude: f32,
    pub amplitude: f32,
    pub angular_rate: f32,
    pub phase: f32,
}

/// A coin pickup in pattern-local coordinates
#[derive(Debug, Clone, Copy)]
pub struct PickupSpec {
    pub offset_x: f32,
    /// Height of the pickup center above the pattern surface
    pub height_above: f32,
}

/// Construction-time factory failures. The hot path recovers from these by
/// substituting a plain-ground pattern; they are never surfaced to the player.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("non-finite geometry in {0} pattern")]
    NonFinite(&'static str),
}

/// A fully validated segment, ready for placement
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub kind: PatternKind,
    pub difficulty: Difficulty,
    /// Horizontal extent in world units, excluding end caps
    pub nominal_len: f32,
    /// Local X of the leftmost rendered point (negative when a left cap
    /// extends past the nominal span)
    pub visual_start: f32,
    /// Full rendered width including caps - the authoritative span
    pub visual_len: f32,
    /// Vertical offset from the pattern anchor to the landable surface top
    /// (negative = raised)
    pub surface_offset: f32,
    pub pits: Vec<PitSpec>,
    pub obstacles: Vec<ObstacleSpec>,
    pub movers: Vec<MoverSpec>,
    pub pickups: Vec<PickupSpec>,
}

impl PatternKind {
    pub const ALL: [PatternKind; 6] = [
        PatternKind::Plain,
        PatternKind::BlockStep,
        PatternKind::SpikeRun,
        PatternKind::BrokenGround,
        PatternKind::PlanePatrol,
        PatternKind::SpikeGauntlet,
    ];

    pub fn difficulty(self) -> Difficulty {
        match self {
            PatternKind::Plain | PatternKind::BlockStep => Difficulty::Easy,
            PatternKind::SpikeRun | PatternKind::BrokenGround | PatternKind::PlanePatrol => {
                Difficulty::Medium
            }
            PatternKind::SpikeGauntlet => Difficulty::Hard,
        }
    }

    /// Build a segment of this kind. `start_x` informs only internal pacing
    /// decisions (how hostile a layout is allowed this early); placement is
    /// the caller's business.
    pub fn build(
        self,
        start_x: f32,
        rng: &mut impl Rng,
        tuning: &Tuning,
    ) -> Result<PatternSpec, PatternError> {
        let spec = match self {
            PatternKind::Plain => plain(rng, tuning),
            PatternKind::BlockStep => block_step(rng, tuning),
            PatternKind::SpikeRun => spike_run(start_x, rng, tuning),
            PatternKind::BrokenGround => broken_ground(rng, tuning),
            PatternKind::PlanePatrol => plane_patrol(rng, tuning),
            PatternKind::SpikeGauntlet => spike_gauntlet(rng, tuning),
        };
        spec.finish(tuning)
    }
}

impl PatternSpec {
    /// Flat safe ground with no hazards. Deterministic; this is the
    /// substitute used whenever a factory fails and the seed of every run.
    pub fn plain_ground(nominal_len: f32, left_cap: bool, right_cap: bool, tuning: &Tuning) -> Self {
        let nominal_len = if nominal_len.is_finite() {
            nominal_len.max(tuning.tile_width)
        } else {
            tuning.tile_width
        };
        let visual_start = if left_cap { -tuning.cap_width } else { 0.0 };
        let visual_end = nominal_len + if right_cap { tuning.cap_width } else { 0.0 };
        Self {
            kind: PatternKind::Plain,
            difficulty: Difficulty::Easy,
            nominal_len,
            visual_start,
            visual_len: visual_end - visual_start,
            surface_offset: 0.0,
            pits: Vec::new(),
            obstacles: Vec::new(),
            movers: Vec::new(),
            pickups: Vec::new(),
        }
    }

    /// Validate and clamp raw factory output. Degenerate geometry is clamped
    /// into the playable span here, never left for the world map to detect;
    /// non-finite geometry is an error.
    fn finish(mut self, tuning: &Tuning) -> Result<Self, PatternError> {
        let finite = self.nominal_len.is_finite()
            && self.surface_offset.is_finite()
            && self.visual_start.is_finite()
            && self.visual_len.is_finite()
            && self.pits.iter().all(|p| p.offset_x.is_finite() && p.width.is_finite())
            && self.obstacles.iter().all(|o| {
                o.offset_x.is_finite() && o.width.is_finite() && o.height.is_finite()
            })
            && self.movers.iter().all(|m| {
                m.offset_x.is_finite()
                    && m.width.is_finite()
                    && m.amplitude.is_finite()
                    && m.angular_rate.is_finite()
                    && m.phase.is_finite()
            })
            && self.pickups.iter().all(|p| p.offset_x.is_finite() && p.height_above.is_finite());
        if !finite {
            return Err(PatternError::NonFinite(self.kind.name()));
        }

        // Minimum playable width: one tile
        self.nominal_len = self.nominal_len.max(tuning.tile_width);
        let len = self.nominal_len;

        for o in &mut self.obstacles {
            o.width = o.width.clamp(10.0, len);
            o.height = o.height.max(10.0);
            o.offset_x = o.offset_x.clamp(0.0, len - o.width);
        }
        for p in &mut self.pits {
            p.width = p.width.clamp(10.0, len);
            p.offset_x = p.offset_x.clamp(0.0, len - p.width);
        }
        for m in &mut self.movers {
            m.width = m.width.clamp(10.0, len);
            m.height = m.height.max(10.0);
            // Keep the whole sweep inside the span
            let half = m.width / 2.0;
            m.amplitude = m.amplitude.abs().min((len / 2.0 - half).max(0.0));
            m.offset_x = m.offset_x.clamp(half + m.amplitude, len - half - m.amplitude);
        }
        for p in &mut self.pickups {
            p.offset_x = p.offset_x.clamp(0.0, len);
        }

        Ok(self)
    }
}

impl PatternKind {
    fn name(self) -> &'static str {
        match self {
            PatternKind::Plain => "plain",
            PatternKind::BlockStep => "block-step",
            PatternKind::SpikeRun => "spike-run",
            PatternKind::BrokenGround => "broken-ground",
            PatternKind::PlanePatrol => "plane-patrol",
            PatternKind::SpikeGauntlet => "spike-gauntlet",
        }
    }
}

fn base(kind: PatternKind, tiles: u32, tuning: &Tuning) -> PatternSpec {
    let mut spec =
        PatternSpec::plain_ground(tiles as f32 * tuning.tile_width, true, true, tuning);
    spec.kind = kind;
    spec.difficulty = kind.difficulty();
    spec
}

/// A short run of coins at even spacing
fn coin_row(spec: &mut PatternSpec, start: f32, count: u32, spacing: f32, height: f32) {
    for i in 0..count {
        spec.pickups.push(PickupSpec {
            offset_x: start + i as f32 * spacing,
            height_above: height,
        });
    }
}

fn plain(rng: &mut impl Rng, tuning: &Tuning) -> PatternSpec {
    let tiles = rng.random_range(8..=14);
    let mut spec = base(PatternKind::Plain, tiles, tuning);
    if rng.random_bool(0.5) {
        let start = spec.nominal_len * rng.random_range(0.25..0.5);
        coin_row(&mut spec, start, 3, 60.0, 120.0);
    }
    spec
}

fn block_step(rng: &mut impl Rng, tuning: &Tuning) -> PatternSpec {
    let tiles = rng.random_range(10..=14);
    let mut spec = base(PatternKind::BlockStep, tiles, tuning);
    let blocks = rng.random_range(1..=2);
    for i in 0..blocks {
        let slot = spec.nominal_len * (0.3 + 0.4 * i as f32);
        let height = rng.random_range(90.0..150.0);
        spec.obstacles.push(ObstacleSpec {
            offset_x: slot + rng.random_range(-40.0..40.0),
            width: rng.random_range(80.0..110.0),
            height,
            kind: ObstacleKind::Block,
        });
        // Coins on top reward clearing the block
        spec.pickups.push(PickupSpec {
            offset_x: slot + 45.0,
            height_above: height + 80.0,
        });
    }
    spec
}

fn spike_run(start_x: f32, rng: &mut impl Rng, tuning: &Tuning) -> PatternSpec {
    let tiles = rng.random_range(10..=16);
    let mut spec = base(PatternKind::SpikeRun, tiles, tuning);
    // Single cluster while the run is young, up to two later
    let max_clusters = if start_x < tuning.hazard_distance_threshold * 1.5 { 1 } else { 2 };
    let clusters = rng.random_range(1..=max_clusters);
    for i in 0..clusters {
        let slot = spec.nominal_len * (0.35 + 0.35 * i as f32);
        spec.obstacles.push(ObstacleSpec {
            offset_x: slot,
            width: rng.random_range(60.0..130.0),
            height: 60.0,
            kind: ObstacleKind::Spike,
        });
    }
    if rng.random_bool(0.4) {
        let start = spec.nominal_len * 0.1;
        coin_row(&mut spec, start, 3, 55.0, 110.0);
    }
    spec
}

fn broken_ground(rng: &mut impl Rng, tuning: &Tuning) -> PatternSpec {
    let tiles = rng.random_range(12..=16);
    let mut spec = base(PatternKind::BrokenGround, tiles, tuning);
    let pits = rng.random_range(1..=2);
    let margin = tuning.tile_width * 2.0;
    for i in 0..pits {
        let width = rng.random_range(140.0..260.0);
        let lo = margin + (spec.nominal_len - 2.0 * margin) * (i as f32 / pits as f32);
        let hi = (margin + (spec.nominal_len - 2.0 * margin) * ((i + 1) as f32 / pits as f32)
            - width)
            .max(lo + 1.0);
        let offset_x = rng.random_range(lo..hi);
        spec.pits.push(PitSpec { offset_x, width });
        // Coin arc over the gap
        spec.pickups.push(PickupSpec {
            offset_x: offset_x + width / 2.0,
            height_above: 180.0,
        });
    }
    spec
}

fn plane_patrol(rng: &mut impl Rng, tuning: &Tuning) -> PatternSpec {
    let tiles = rng.random_range(12..=16);
    let mut spec = base(PatternKind::PlanePatrol, tiles, tuning);
    spec.movers.push(MoverSpec {
        offset_x: spec.nominal_len / 2.0,
        width: 130.0,
        height: 60.0,
        altitude: tuning.plane_altitude,
        amplitude: spec.nominal_len * 0.25,
        angular_rate: rng.random_range(1.2..2.0),
        phase: rng.random_range(0.0..std::f32::consts::TAU),
    });
    if rng.random_bool(0.3) {
        spec.obstacles.push(ObstacleSpec {
            offset_x: spec.nominal_len * 0.7,
            width: 80.0,
            height: 60.0,
            kind: ObstacleKind::Spike,
        });
    }
    spec
}

fn spike_gauntlet(rng: &mut impl Rng, tuning: &Tuning) -> PatternSpec {
    let tiles = rng.random_range(14..=18);
    let mut spec = base(PatternKind::SpikeGauntlet, tiles, tuning);
    spec.surface_offset = match rng.random_range(0..3) {
        0 => 0.0,
        1 => -30.0,
        _ => -60.0,
    };
    let clusters = rng.random_range(2..=3);
    for i in 0..clusters {
        let slot = spec.nominal_len * (0.2 + 0.25 * i as f32);
        spec.obstacles.push(ObstacleSpec {
            offset_x: slot,
            width: rng.random_range(80.0..140.0),
            height: 60.0,
            kind: ObstacleKind::Spike,
        });
    }
    // A refuge block between the clusters
    spec.obstacles.push(ObstacleSpec {
        offset_x: spec.nominal_len * 0.55,
        width: 100.0,
        height: rng.random_range(110.0..160.0),
        kind: ObstacleKind::Block,
    });
    let coins_from = spec.nominal_len * 0.5;
    coin_row(&mut spec, coins_from, 4, 55.0, 280.0);
    spec
}

/// Weighted factory selection. Hazard patterns enter the rotation only after
/// `hazard_distance_threshold`; PlanePatrol is excluded entirely before it.
/// Anything above Easy chosen before the threshold collapses to Plain - the
/// early-game ramp is a hard constraint on the caller, not a factory concern.
pub fn choose_pattern(world_x: f32, rng: &mut impl Rng, tuning: &Tuning) -> PatternKind {
    let hazards_open = world_x >= tuning.hazard_distance_threshold;
    let roll: u32 = rng.random_range(0..100);

    let mut kind = if hazards_open {
        match roll {
            0..25 => PatternKind::Plain,
            25..45 => PatternKind::BlockStep,
            45..65 => PatternKind::SpikeRun,
            65..80 => PatternKind::BrokenGround,
            80..90 => PatternKind::PlanePatrol,
            _ => PatternKind::SpikeGauntlet,
        }
    } else if roll < 70 {
        PatternKind::Plain
    } else {
        PatternKind::BlockStep
    };

    if !hazards_open && kind.difficulty() > Difficulty::Easy {
        kind = PatternKind::Plain;
    }
    kind
}
