//! Collision resolution and run outcomes
//!
//! One pass per tick, after physics integration, in a fixed rule order:
//! landing on obstacles, side blocking, a broad lethal sweep, pit falls,
//! the off-camera check, then pickup collection. The pass reads the world
//! and writes the player and session; it never mutates world geometry
//! except to mark pickups collected.

use glam::Vec2;

use crate::consts::*;
use crate::tuning::Tuning;

use super::state::{GameEvent, GameOverReason, Player, SessionState};
use super::world::{Collider, ColliderKind, WorldMap};

/// Axis-aligned box, top-left anchored (world Y grows downward)
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_collider(c: &Collider) -> Self {
        Self { x: c.x, y: c.top_y, w: c.width, h: c.height }
    }

    pub fn centered(center: Vec2, half: f32) -> Self {
        Self { x: center.x - half, y: center.y - half, w: half * 2.0, h: half * 2.0 }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

fn player_aabb(player: &Player) -> Aabb {
    Aabb::centered(Vec2::new(player.x, player.y), player.radius)
}

/// What the per-obstacle rules concluded for this tick
enum Contact {
    None,
    Lethal,
}

/// Run the full resolution pass. Must be called with the post-integration
/// player position and the post-advance world.
pub fn resolve(
    player: &mut Player,
    world: &mut WorldMap,
    session: &mut SessionState,
    events: &mut Vec<GameEvent>,
    tuning: &Tuning,
) {
    // The death sequence owns the player once it starts
    if player.dead {
        return;
    }

    match resolve_obstacles(player, world, session, events) {
        Contact::Lethal => {
            start_death_sequence(player, session, events, tuning);
            return;
        }
        Contact::None => {}
    }

    resolve_pit_fall(player, world, session, tuning);
    resolve_off_camera(player, world, session, tuning);
    collect_pickups(player, world, session, events, tuning);
}

/// Rules 1-3: landing, side blocking, and the broad lethal sweep.
///
/// While invincible a lethal box behaves exactly like a solid block - the
/// landing and blocking physics still apply, only the kill is suppressed.
fn resolve_obstacles(
    player: &mut Player,
    world: &WorldMap,
    session: &SessionState,
    events: &mut Vec<GameEvent>,
) -> Contact {
    let invincible = session.is_invincible();

    for (_, c) in world.obstacles() {
        let solid = match c.kind {
            ColliderKind::Ground => continue,
            ColliderKind::Block => true,
            ColliderKind::Spike | ColliderKind::Plane => invincible,
        };

        if !crate::spans_overlap(player.left(), player.right(), c.x, c.right()) {
            continue;
        }

        // Rule 1: landing - bottom edge crossed the obstacle top while
        // descending (crossing, not containment: already-below never snaps)
        let crossed_top =
            player.vel_y >= 0.0 && player.prev_bottom <= c.top_y && player.bottom() >= c.top_y;
        if crossed_top {
            if solid {
                player.land(c.top_y);
                events.push(GameEvent::Landed);
                continue;
            }
            return Contact::Lethal;
        }

        // Rule 2: side blocking - running into the box below its top
        if player.bottom() > c.top_y && player.y < c.bottom_y() {
            if solid {
                // Clamp against the left face; never clip through
                player.x = player.x.min(c.x - player.radius);
                continue;
            }
            return Contact::Lethal;
        }
    }

    // Rule 3: broad sweep, defense in depth against anything the
    // edge-crossing rules missed (fast movers, corner clips)
    if !invincible {
        let bounds = player_aabb(player);
        for (_, c) in world.obstacles() {
            if c.kind.is_lethal() && bounds.intersects(&Aabb::from_collider(c)) {
                return Contact::Lethal;
            }
        }
    }

    Contact::None
}

/// Lethal contact: freeze the player, hand the visuals to the host, and arm
/// the timer whose expiry forces the game-over.
fn start_death_sequence(
    player: &mut Player,
    session: &mut SessionState,
    events: &mut Vec<GameEvent>,
    tuning: &Tuning,
) {
    player.dead = true;
    player.vel_y = 0.0;
    session.controls_enabled = false;
    session.death_timer = Some(tuning.death_effect_duration);
    events.push(GameEvent::PlayerHit { pos: Vec2::new(player.x, player.y) });
    log::info!("lethal contact at x={:.0}", player.x);
}

/// Rule 4: falling into a registered pit. Distinct from death-by-hazard;
/// requires real downward motion and the bottom meaningfully below the
/// expected surface, so skimming a pit during a jump never triggers. For a
/// gap between patterns the expected surface is the baseline the neighbors
/// sit on.
fn resolve_pit_fall(
    player: &Player,
    world: &WorldMap,
    session: &mut SessionState,
    tuning: &Tuning,
) {
    if !world.is_over_pit(player.x) || player.vel_y <= tuning.pit_fall_vel {
        return;
    }
    let expected_surface = if world.is_on_pattern(player.x) {
        world.surface_y_at(player.x)
    } else {
        BASE_SURFACE_Y
    };
    if player.bottom() > expected_surface + tuning.pit_fall_depth {
        session.request_game_over(GameOverReason::FellIntoPit, tuning.grace_delay);
    }
}

/// Rule 5: behind the camera or far below the viewport. Queued behind the
/// grace window; the expiry re-check in the tick cancels it if the player is
/// back on a pattern and grounded by then.
fn resolve_off_camera(
    player: &Player,
    world: &WorldMap,
    session: &mut SessionState,
    tuning: &Tuning,
) {
    let screen_x = player.x - world.scroll();
    let behind_camera = screen_x + player.radius < 0.0;
    let below_viewport = player.y - player.radius > VIEWPORT_HEIGHT + OFFSCREEN_MARGIN;
    if behind_camera || below_viewport {
        session.request_game_over(GameOverReason::OffScreen, tuning.grace_delay);
    }
}

/// Rule 6: pickup collection. Bounding-box intersection; each pickup
/// transitions collected exactly once and is never revived.
fn collect_pickups(
    player: &Player,
    world: &mut WorldMap,
    session: &mut SessionState,
    events: &mut Vec<GameEvent>,
    tuning: &Tuning,
) {
    let bounds = player_aabb(player);
    let half = tuning.pickup_size / 2.0;
    for p in world.pickups_mut() {
        if p.collected {
            continue;
        }
        if bounds.intersects(&Aabb::centered(p.pos, half)) {
            p.collected = true;
            session.score += 1;
            events.push(GameEvent::PickupCollected { kind: p.kind, pos: p.pos });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::pattern::{MoverSpec, ObstacleKind, ObstacleSpec, PatternSpec, PickupSpec};
    use crate::tuning::Tuning;

    fn setup() -> (Player, WorldMap, SessionState, Vec<GameEvent>, Tuning) {
        let t = Tuning::default();
        let w = WorldMap::new(&t);
        let p = Player::new(200.0, &t);
        (p, w, SessionState::new(), Vec::new(), t)
    }

    fn ground_with_obstacle(w: &mut WorldMap, t: &Tuning, kind: ObstacleKind) -> f32 {
        let mut spec = PatternSpec::plain_ground(1400.0, true, true, t);
        spec.obstacles.push(ObstacleSpec {
            offset_x: 400.0,
            width: 100.0,
            height: 120.0,
            kind,
        });
        w.add_pattern(&spec, 0.0);
        BASE_SURFACE_Y - 120.0 // obstacle top
    }

    #[test]
    fn descending_onto_a_block_lands_on_it() {
        let (mut p, mut w, mut s, mut e, t) = setup();
        let top = ground_with_obstacle(&mut w, &t, ObstacleKind::Block);

        p.x = 450.0;
        p.on_ground = false;
        p.vel_y = 400.0;
        p.prev_bottom = top - 10.0;
        p.y = top + 5.0 - p.radius; // bottom just past the top

        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        assert!(p.on_ground);
        assert_eq!(p.bottom(), top);
        assert_eq!(p.vel_y, 0.0);
        assert!(e.contains(&GameEvent::Landed));
        assert!(!p.dead);
    }

    #[test]
    fn descending_onto_a_spike_starts_the_death_sequence() {
        let (mut p, mut w, mut s, mut e, t) = setup();
        let top = ground_with_obstacle(&mut w, &t, ObstacleKind::Spike);

        p.x = 450.0;
        p.on_ground = false;
        p.vel_y = 400.0;
        p.prev_bottom = top - 10.0;
        p.y = top + 5.0 - p.radius;

        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        assert!(p.dead);
        assert_eq!(p.vel_y, 0.0);
        assert!(!s.controls_enabled);
        assert_eq!(s.death_timer, Some(t.death_effect_duration));
        assert!(matches!(e[0], GameEvent::PlayerHit { .. }));
    }

    #[test]
    fn running_into_a_block_side_clamps_x() {
        let (mut p, mut w, mut s, mut e, t) = setup();
        ground_with_obstacle(&mut w, &t, ObstacleKind::Block);

        // Grounded, overlapping the block's left face
        p.x = 400.0 + 10.0;
        p.prev_bottom = p.bottom();

        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        assert_eq!(p.x, 400.0 - p.radius);
        assert!(!p.dead);
    }

    #[test]
    fn invincibility_turns_lethal_boxes_into_solids() {
        let (mut p, mut w, mut s, mut e, t) = setup();
        let top = ground_with_obstacle(&mut w, &t, ObstacleKind::Spike);
        s.invincible_remaining = 3.0;

        // Landing on the spike while invincible
        p.x = 450.0;
        p.on_ground = false;
        p.vel_y = 400.0;
        p.prev_bottom = top - 10.0;
        p.y = top + 5.0 - p.radius;
        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        assert!(!p.dead);
        assert!(p.on_ground);
        assert_eq!(p.bottom(), top);

        // Side contact while invincible blocks instead of killing
        let mut p2 = Player::new(410.0, &t);
        p2.prev_bottom = p2.bottom();
        resolve(&mut p2, &mut w, &mut s, &mut e, &t);
        assert!(!p2.dead);
        assert_eq!(p2.x, 400.0 - p2.radius);
    }

    #[test]
    fn broad_sweep_catches_head_clip_on_a_plane() {
        let (mut p, mut w, mut s, mut e, t) = setup();
        let mut spec = PatternSpec::plain_ground(1400.0, true, true, &t);
        spec.movers.push(MoverSpec {
            offset_x: 450.0,
            width: 100.0,
            height: 60.0,
            altitude: 150.0,
            amplitude: 0.0,
            angular_rate: 0.0,
            phase: 0.0,
        });
        w.add_pattern(&spec, 0.0);
        let plane_bottom = BASE_SURFACE_Y - 150.0;

        // Ascending with the head clipping the plane's belly: no top
        // crossing (rule 1) and the center is below the box (rule 2 misses),
        // but the sweep still sees the overlap
        p.x = 450.0;
        p.on_ground = false;
        p.vel_y = -900.0;
        p.y = plane_bottom + 10.0;
        p.prev_bottom = p.bottom() + 9.0;

        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        assert!(p.dead);
    }

    #[test]
    fn pit_fall_requires_depth_and_velocity() {
        let (mut p, mut w, mut s, mut e, t) = setup();
        w.add_pattern(&PatternSpec::plain_ground(700.0, true, true, &t), 0.0);
        w.add_pit(800.0, 300.0);

        // Over the pit but barely moving: no game-over request
        p.x = 900.0;
        p.on_ground = false;
        p.vel_y = 10.0;
        p.y = BASE_SURFACE_Y - p.radius;
        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        assert!(s.pending_game_over.is_none());

        // Falling fast and deep: queued as fell-into-pit
        p.vel_y = 200.0;
        p.y = BASE_SURFACE_Y + 50.0;
        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        let pending = s.pending_game_over.expect("pit fall queued");
        assert_eq!(pending.reason, GameOverReason::FellIntoPit);
    }

    #[test]
    fn behind_camera_queues_off_screen() {
        let (mut p, mut w, mut s, mut e, t) = setup();
        w.add_pattern(&PatternSpec::plain_ground(5000.0, true, true, &t), 0.0);
        w.update(10.0, 0.0); // scroll well past the player

        p.x = 200.0;
        p.prev_bottom = p.bottom();
        assert!(p.x + p.radius < w.scroll());

        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        let pending = s.pending_game_over.expect("off-screen queued");
        assert_eq!(pending.reason, GameOverReason::OffScreen);
    }

    #[test]
    fn pickup_collects_exactly_once() {
        let (mut p, mut w, mut s, mut e, t) = setup();
        let mut spec = PatternSpec::plain_ground(700.0, true, true, &t);
        spec.pickups.push(PickupSpec { offset_x: 200.0, height_above: 40.0 });
        w.add_pattern(&spec, 0.0);

        p.x = 200.0;
        p.prev_bottom = p.bottom();
        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        assert_eq!(s.score, 1);
        assert_eq!(
            e.iter()
                .filter(|ev| matches!(ev, GameEvent::PickupCollected { .. }))
                .count(),
            1
        );

        // Second pass over the same spot: nothing new
        resolve(&mut p, &mut w, &mut s, &mut e, &t);
        assert_eq!(s.score, 1);
        assert_eq!(
            e.iter()
                .filter(|ev| matches!(ev, GameEvent::PickupCollected { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn aabb_intersection_basics() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Aabb::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&Aabb::new(10.0, 0.0, 5.0, 5.0))); // touching edges don't overlap
        assert!(!a.intersects(&Aabb::new(0.0, 20.0, 5.0, 5.0)));
    }
}
