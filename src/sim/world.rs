//! World map - the terrain database of the run
//!
//! Owns the ordered placement of patterns along the scroll axis, converts
//! pattern-local geometry into world-space colliders and pits, advances the
//! scroll/speed pair, and answers the spatial queries the physics and
//! collision passes need every tick ("what is the ground height at X",
//! "is X over a pit", "which obstacle boxes are live").
//!
//! Colliders live in a dense arena with stable generational handles so a
//! moving hazard can update its own collider in place each tick - no
//! re-matching search between visuals and collision state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::tuning::Tuning;

use super::pattern::{PatternError, PatternSpec};

/// What a collider box does on contact - exhaustively matched in the
/// resolver, never a pile of booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderKind {
    /// Thin strip tracking a pattern's landable surface
    Ground,
    /// Solid, landable box
    Block,
    /// Lethal on contact
    Spike,
    /// Lethal patrolling plane; its box follows the visual every tick
    Plane,
}

impl ColliderKind {
    #[inline]
    pub fn is_lethal(self) -> bool {
        matches!(self, ColliderKind::Spike | ColliderKind::Plane)
    }

    #[inline]
    pub fn is_ground(self) -> bool {
        matches!(self, ColliderKind::Ground)
    }
}

/// An axis-aligned collision box in world coordinates
#[derive(Debug, Clone, Copy)]
pub struct Collider {
    pub x: f32,
    pub width: f32,
    pub height: f32,
    pub top_y: f32,
    pub kind: ColliderKind,
}

impl Collider {
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom_y(&self) -> f32 {
        self.top_y + self.height
    }
}

/// Stable reference to an arena slot. Survives unrelated removals; resolves
/// to nothing once its collider is gone (the generation check catches slot
/// reuse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColliderHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    collider: Option<Collider>,
}

/// Dense collider storage with stable handles and preserved insertion order.
#[derive(Debug, Default, Clone)]
pub struct ColliderArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<ColliderHandle>,
}

impl ColliderArena {
    pub fn insert(&mut self, collider: Collider) -> ColliderHandle {
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.collider = Some(collider);
            ColliderHandle { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, collider: Some(collider) });
            ColliderHandle { index, generation: 0 }
        };
        self.order.push(handle);
        handle
    }

    pub fn get(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.collider.as_ref())
    }

    pub fn get_mut(&mut self, handle: ColliderHandle) -> Option<&mut Collider> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.collider.as_mut())
    }

    pub fn remove(&mut self, handle: ColliderHandle) -> Option<Collider> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let removed = slot.collider.take()?;
        slot.generation += 1;
        self.free.push(handle.index);
        self.order.retain(|h| *h != handle);
        Some(removed)
    }

    /// Drop every collider failing the predicate. Freed slots never leave
    /// dangling handles - stale handles just resolve to `None`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Collider) -> bool) {
        let removed: Vec<ColliderHandle> = self
            .order
            .iter()
            .copied()
            .filter(|&h| self.get(h).is_some_and(|c| !keep(c)))
            .collect();
        for handle in removed {
            self.remove(handle);
        }
    }

    /// Live colliders in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (ColliderHandle, &Collider)> {
        self.order.iter().filter_map(|&h| self.get(h).map(|c| (h, c)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.order.clear();
    }
}

/// A pattern's registration record. Span bookkeeping uses the rendered
/// visual bounds, never the nominal length - end caps extend the visible
/// footprint, and an under-sized span would let the player stand on ground
/// the map does not recognize.
#[derive(Debug, Clone, Copy)]
pub struct PlacedPattern {
    pub world_start: f32,
    pub world_span: f32,
    /// Landable surface top in world Y
    pub surface_y: f32,
    pub surface_offset: f32,
}

impl PlacedPattern {
    #[inline]
    pub fn world_end(&self) -> f32 {
        self.world_start + self.world_span
    }

    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        x >= self.world_start && x <= self.world_end()
    }
}

/// A span with explicitly no ground. Tracked independently of colliders and
/// pattern membership: a pit is an absence, and it can sit inside an
/// otherwise registered pattern span.
#[derive(Debug, Clone, Copy)]
pub struct Pit {
    pub world_x: f32,
    pub width: f32,
}

impl Pit {
    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        x >= self.world_x && x < self.world_x + self.width
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.world_x + self.width
    }
}

/// Collectible kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Coin,
}

/// A collectible attached to its owning pattern for its whole lifetime
#[derive(Debug, Clone, Copy)]
pub struct Pickup {
    pub kind: PickupKind,
    pub pos: Vec2,
    pub collected: bool,
}

/// A patrolling plane hazard. Owns the handle to its collider, created at
/// spawn; the box is re-derived from the current visual position every tick
/// the hazard exists.
#[derive(Debug, Clone, Copy)]
struct MovingHazard {
    collider: ColliderHandle,
    anchor_x: f32,
    amplitude: f32,
    angular_rate: f32,
    phase: f32,
    width: f32,
}

impl MovingHazard {
    #[inline]
    fn visual_left(&self) -> f32 {
        self.anchor_x + self.phase.sin() * self.amplitude - self.width / 2.0
    }
}

/// Scroll/speed pair returned by the per-tick world advance
#[derive(Debug, Clone, Copy)]
pub struct Advance {
    pub scroll: f32,
    pub speed: f32,
}

/// The world map. Mutated only here; the resolver reads.
#[derive(Debug)]
pub struct WorldMap {
    scroll: f32,
    speed: f32,
    start_speed: f32,
    /// Sorted by `world_start`; `longest_span` bounds the backward scan of
    /// the binary-searched span queries.
    patterns: Vec<PlacedPattern>,
    longest_span: f32,
    colliders: ColliderArena,
    pits: Vec<Pit>,
    pickups: Vec<Pickup>,
    movers: Vec<MovingHazard>,
    /// Right edge of everything placed so far; the spawner fills up to the
    /// camera horizon from here
    frontier: f32,
    debug_hitboxes: bool,
}

impl WorldMap {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            scroll: 0.0,
            speed: tuning.start_speed,
            start_speed: tuning.start_speed,
            patterns: Vec::new(),
            longest_span: 0.0,
            colliders: ColliderArena::default(),
            pits: Vec::new(),
            pickups: Vec::new(),
            movers: Vec::new(),
            frontier: 0.0,
            debug_hitboxes: false,
        }
    }

    #[inline]
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    pub fn frontier(&self) -> f32 {
        self.frontier
    }

    /// Invoke `factory` and register its output. On factory failure nothing
    /// is registered at all - no colliders, no pits, no span entry - and the
    /// failure is logged and swallowed (the caller substitutes safe ground).
    pub fn add_pattern_with<F>(&mut self, start_x: f32, factory: F) -> Option<PlacedPattern>
    where
        F: FnOnce(f32) -> Result<PatternSpec, PatternError>,
    {
        match factory(start_x) {
            Ok(spec) => Some(self.add_pattern(&spec, start_x)),
            Err(e) => {
                log::warn!("pattern factory failed at x={start_x:.0}: {e}");
                None
            }
        }
    }

    /// Register a validated pattern at `start_x` (the anchor of its nominal
    /// span). Converts all declared geometry to world coordinates.
    pub fn add_pattern(&mut self, spec: &PatternSpec, start_x: f32) -> PlacedPattern {
        let surface_y = BASE_SURFACE_Y + spec.surface_offset;
        let placed = PlacedPattern {
            world_start: start_x + spec.visual_start,
            world_span: spec.visual_len,
            surface_y,
            surface_offset: spec.surface_offset,
        };

        // Ground strip tracking the landable surface across the full
        // rendered span
        self.colliders.insert(Collider {
            x: placed.world_start,
            width: placed.world_span,
            height: GROUND_STRIP_HEIGHT,
            top_y: surface_y,
            kind: ColliderKind::Ground,
        });

        for o in &spec.obstacles {
            self.colliders.insert(Collider {
                x: start_x + o.offset_x,
                width: o.width,
                height: o.height,
                top_y: surface_y - o.height,
                kind: match o.kind {
                    super::pattern::ObstacleKind::Block => ColliderKind::Block,
                    super::pattern::ObstacleKind::Spike => ColliderKind::Spike,
                },
            });
        }

        for m in &spec.movers {
            let anchor_x = start_x + m.offset_x;
            let visual_left = anchor_x + m.phase.sin() * m.amplitude - m.width / 2.0;
            let handle = self.colliders.insert(Collider {
                x: visual_left,
                width: m.width,
                height: m.height,
                top_y: surface_y - m.altitude - m.height,
                kind: ColliderKind::Plane,
            });
            self.movers.push(MovingHazard {
                collider: handle,
                anchor_x,
                amplitude: m.amplitude,
                angular_rate: m.angular_rate,
                phase: m.phase,
                width: m.width,
            });
        }

        for p in &spec.pits {
            self.pits.push(Pit { world_x: start_x + p.offset_x, width: p.width });
        }

        for c in &spec.pickups {
            self.pickups.push(Pickup {
                kind: PickupKind::Coin,
                pos: Vec2::new(start_x + c.offset_x, surface_y - c.height_above),
                collected: false,
            });
        }

        let idx = self.patterns.partition_point(|p| p.world_start <= placed.world_start);
        self.patterns.insert(idx, placed);
        self.longest_span = self.longest_span.max(placed.world_span);
        self.frontier = self.frontier.max(start_x + spec.nominal_len);
        placed
    }

    /// Register a standalone gap (no ground) starting at `world_x`. The
    /// frontier advances past it so the next pattern lands on the far side.
    pub fn add_pit(&mut self, world_x: f32, width: f32) {
        if !world_x.is_finite() || !width.is_finite() || width <= 0.0 {
            log::warn!("ignoring degenerate pit at x={world_x} width={width}");
            return;
        }
        self.pits.push(Pit { world_x, width });
        self.frontier = self.frontier.max(world_x + width);
    }

    /// Advance scroll and speed, step moving hazards, and garbage-collect
    /// everything that fell behind the camera. The single per-tick entry
    /// point for world motion; physics must run after it.
    pub fn update(&mut self, dt: f32, speed_accel: f32) -> Advance {
        self.scroll += self.speed * dt;
        // Monotonic, uncapped - intentional infinite ramp (see DESIGN.md)
        self.speed += speed_accel * dt;

        for m in &mut self.movers {
            m.phase += m.angular_rate * dt;
            // Collider box follows the visual every tick it exists
            if let Some(c) = self.colliders.get_mut(m.collider) {
                c.x = m.visual_left();
            }
        }

        let cutoff = self.scroll - GC_MARGIN;
        let before = self.colliders.len();
        self.colliders.retain(|c| c.right() >= cutoff);
        if self.colliders.len() != before {
            log::debug!("collected {} stale colliders", before - self.colliders.len());
        }
        // A mover whose collider was collected goes with it
        let colliders = &self.colliders;
        self.movers.retain(|m| colliders.get(m.collider).is_some());
        self.patterns.retain(|p| p.world_end() >= cutoff);
        self.pits.retain(|p| p.right() >= cutoff);
        self.pickups.retain(|p| !p.collected && p.pos.x + PICKUP_GC_SLACK >= cutoff);

        Advance { scroll: self.scroll, speed: self.speed }
    }

    fn pattern_at(&self, x: f32) -> Option<&PlacedPattern> {
        let idx = self.patterns.partition_point(|p| p.world_start <= x);
        // Scan backward; `longest_span` bounds how far a containing span
        // can start before x
        self.patterns[..idx]
            .iter()
            .rev()
            .take_while(|p| p.world_start + self.longest_span >= x)
            .find(|p| p.contains(x))
    }

    /// Is `x` within any placed pattern's rendered span?
    pub fn is_on_pattern(&self, x: f32) -> bool {
        self.pattern_at(x).is_some()
    }

    /// Landable surface Y for the pattern covering `x`, or the void surface
    /// far below the play area when nothing covers it.
    pub fn surface_y_at(&self, x: f32) -> f32 {
        self.pattern_at(x).map_or(VOID_SURFACE_Y, |p| p.surface_y)
    }

    /// Like [`surface_y_at`](Self::surface_y_at), but a pit is an absence of
    /// ground even inside a pattern span - this is the query physics
    /// integrates against.
    pub fn support_y_at(&self, x: f32) -> f32 {
        if self.is_over_pit(x) { VOID_SURFACE_Y } else { self.surface_y_at(x) }
    }

    /// Is `x` within any registered pit span? Independent of pattern
    /// membership by design.
    pub fn is_over_pit(&self, x: f32) -> bool {
        self.pits.iter().any(|p| p.contains(x))
    }

    /// Non-ground colliders in insertion order, for the resolver scan
    pub fn obstacles(&self) -> impl Iterator<Item = (ColliderHandle, &Collider)> {
        self.colliders.iter().filter(|(_, c)| !c.kind.is_ground())
    }

    /// Every live collider, for debug drawing
    pub fn colliders(&self) -> impl Iterator<Item = (ColliderHandle, &Collider)> {
        self.colliders.iter()
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    pub fn pickups_mut(&mut self) -> &mut [Pickup] {
        &mut self.pickups
    }

    /// Dev-only hitbox visualization toggle; returns the new state. Has no
    /// effect on collision outcomes.
    pub fn toggle_hitbox_debug(&mut self) -> bool {
        self.debug_hitboxes = !self.debug_hitboxes;
        self.debug_hitboxes
    }

    pub fn hitbox_debug(&self) -> bool {
        self.debug_hitboxes
    }

    /// Clear every placement and restore scroll/speed to initial values.
    pub fn reset(&mut self) {
        log::info!("world reset");
        self.scroll = 0.0;
        self.speed = self.start_speed;
        self.patterns.clear();
        self.longest_span = 0.0;
        self.colliders.clear();
        self.pits.clear();
        self.pickups.clear();
        self.movers.clear();
        self.frontier = 0.0;
    }
}

/// Pickups linger slightly past the GC cutoff so a trailing collection
/// animation has something to point at
const PICKUP_GC_SLACK: f32 = 64.0;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pattern::{ObstacleKind, ObstacleSpec, PatternKind, PitSpec};

    fn world() -> (WorldMap, Tuning) {
        let t = Tuning::default();
        (WorldMap::new(&t), t)
    }

    fn plain(t: &Tuning, len: f32) -> PatternSpec {
        PatternSpec::plain_ground(len, true, true, t)
    }

    #[test]
    fn span_coverage_uses_visual_bounds() {
        let (mut w, t) = world();
        let placed = w.add_pattern(&plain(&t, 700.0), 0.0);

        // Caps extend the registered span past the nominal length
        assert_eq!(placed.world_start, -t.cap_width);
        assert_eq!(placed.world_span, 700.0 + 2.0 * t.cap_width);

        assert!(w.is_on_pattern(placed.world_start));
        assert!(w.is_on_pattern(0.0));
        assert!(w.is_on_pattern(350.0));
        assert!(w.is_on_pattern(placed.world_end()));
        assert!(!w.is_on_pattern(placed.world_start - 1.0));
        assert!(!w.is_on_pattern(placed.world_end() + 1.0));
    }

    #[test]
    fn surface_query_falls_back_to_void() {
        let (mut w, t) = world();
        w.add_pattern(&plain(&t, 700.0), 0.0);
        assert_eq!(w.surface_y_at(100.0), BASE_SURFACE_Y);
        assert_eq!(w.surface_y_at(5_000.0), VOID_SURFACE_Y);
    }

    #[test]
    fn surface_query_honors_surface_offset() {
        let (mut w, t) = world();
        let mut spec = plain(&t, 700.0);
        spec.surface_offset = -60.0;
        w.add_pattern(&spec, 0.0);
        assert_eq!(w.surface_y_at(100.0), BASE_SURFACE_Y - 60.0);
    }

    #[test]
    fn pit_membership_is_independent_of_pattern_membership() {
        let (mut w, t) = world();
        let mut spec = plain(&t, 700.0);
        spec.pits.push(PitSpec { offset_x: 200.0, width: 150.0 });
        w.add_pattern(&spec, 0.0);

        // Same X is simultaneously on-pattern and over-pit
        assert!(w.is_on_pattern(250.0));
        assert!(w.is_over_pit(250.0));
        assert!(!w.is_over_pit(100.0));

        // Support reports void over the pit, surface does not
        assert_eq!(w.surface_y_at(250.0), BASE_SURFACE_Y);
        assert_eq!(w.support_y_at(250.0), VOID_SURFACE_Y);
        assert_eq!(w.support_y_at(100.0), BASE_SURFACE_Y);
    }

    #[test]
    fn factory_failure_registers_nothing() {
        let (mut w, _t) = world();
        let placed = w.add_pattern_with(0.0, |_| {
            Err(crate::sim::pattern::PatternError::NonFinite("test"))
        });
        assert!(placed.is_none());
        assert!(w.colliders.is_empty());
        assert!(w.pits.is_empty());
        assert!(w.patterns.is_empty());
        assert!(w.pickups.is_empty());
        assert!(!w.is_on_pattern(0.0));
    }

    #[test]
    fn obstacles_are_registered_in_world_coordinates() {
        let (mut w, t) = world();
        let mut spec = plain(&t, 700.0);
        spec.obstacles.push(ObstacleSpec {
            offset_x: 300.0,
            width: 100.0,
            height: 120.0,
            kind: ObstacleKind::Block,
        });
        w.add_pattern(&spec, 1000.0);

        let obstacles: Vec<_> = w.obstacles().collect();
        assert_eq!(obstacles.len(), 1);
        let c = obstacles[0].1;
        assert_eq!(c.x, 1300.0);
        assert_eq!(c.top_y, BASE_SURFACE_Y - 120.0);
        assert_eq!(c.kind, ColliderKind::Block);
    }

    #[test]
    fn gc_removes_colliders_by_position_not_order() {
        let (mut w, t) = world();
        // Deliberately add out of left-to-right order
        w.add_pattern(&plain(&t, 400.0), 3000.0);
        w.add_pattern(&plain(&t, 400.0), 0.0);
        assert_eq!(w.colliders.len(), 2);

        // Scroll far enough that only the first-added (rightmost) survives
        let dt = 1.0;
        w.speed = 1500.0;
        w.update(dt, 0.0);
        assert!(w.scroll > 400.0 + GC_MARGIN + t.cap_width);

        let survivors: Vec<_> = w.colliders().collect();
        assert_eq!(survivors.len(), 1);
        assert!(survivors[0].1.x >= 2000.0);
        assert!(w.is_on_pattern(3100.0));
        assert!(!w.is_on_pattern(100.0));
    }

    #[test]
    fn mover_collider_follows_visual_every_tick() {
        let (mut w, t) = world();
        let mut spec = PatternKind::PlanePatrol
            .build(10_000.0, &mut rand_pcg::Pcg32::new(42, 54), &t)
            .expect("plane patrol builds");
        spec.movers[0].phase = 0.0;
        spec.movers[0].angular_rate = std::f32::consts::FRAC_PI_2; // quarter turn per second
        w.add_pattern(&spec, 0.0);

        let before = w
            .obstacles()
            .find(|(_, c)| c.kind == ColliderKind::Plane)
            .map(|(_, c)| c.x)
            .expect("plane collider registered");

        // One simulated second: phase hits pi/2, sweep reaches full amplitude
        for _ in 0..100 {
            w.update(0.01, 0.0);
        }
        let after = w
            .obstacles()
            .find(|(_, c)| c.kind == ColliderKind::Plane)
            .map(|(_, c)| c.x)
            .expect("plane collider still live");

        let amplitude = spec.movers[0].amplitude;
        assert!((after - before - amplitude).abs() < amplitude * 0.05);
    }

    #[test]
    fn standalone_pit_advances_frontier() {
        let (mut w, t) = world();
        w.add_pattern(&plain(&t, 700.0), 0.0);
        let end = w.frontier();
        w.add_pit(end, 300.0);
        assert_eq!(w.frontier(), end + 300.0);
        assert!(w.is_over_pit(end + 150.0));
        assert!(!w.is_on_pattern(end + 150.0));
    }

    #[test]
    fn reset_clears_everything() {
        let (mut w, t) = world();
        let mut spec = plain(&t, 700.0);
        spec.pits.push(PitSpec { offset_x: 100.0, width: 50.0 });
        w.add_pattern(&spec, 0.0);
        w.update(0.5, 10.0);

        w.reset();
        assert_eq!(w.scroll(), 0.0);
        assert_eq!(w.speed(), t.start_speed);
        assert_eq!(w.frontier(), 0.0);
        assert!(w.colliders.is_empty());
        assert!(!w.is_on_pattern(100.0));
        assert!(!w.is_over_pit(110.0));
    }

    #[test]
    fn arena_handles_survive_unrelated_removals() {
        let mut arena = ColliderArena::default();
        let mk = |x: f32| Collider {
            x,
            width: 10.0,
            height: 10.0,
            top_y: 0.0,
            kind: ColliderKind::Block,
        };
        let a = arena.insert(mk(1.0));
        let b = arena.insert(mk(2.0));
        let c = arena.insert(mk(3.0));

        arena.remove(b);
        assert_eq!(arena.get(a).map(|c| c.x), Some(1.0));
        assert_eq!(arena.get(c).map(|c| c.x), Some(3.0));
        assert!(arena.get(b).is_none());

        // Slot reuse bumps the generation; the stale handle stays dead
        let d = arena.insert(mk(4.0));
        assert!(arena.get(b).is_none());
        assert_eq!(arena.get(d).map(|c| c.x), Some(4.0));

        // Insertion order: a, c, d
        let xs: Vec<f32> = arena.iter().map(|(_, c)| c.x).collect();
        assert_eq!(xs, vec![1.0, 3.0, 4.0]);
    }
}
