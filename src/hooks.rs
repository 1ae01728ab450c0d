//! Collaborator interfaces
//!
//! The simulation never talks to an animation rig, a mixer, or a renderer
//! directly - it queues [`GameEvent`]s, and the host dispatches them through
//! these traits once per frame. Everything here is fire-and-forget: a
//! collaborator that is not ready yet (assets still loading) degrades
//! silently and must never be able to crash a tick.

use crate::sim::world::WorldMap;
use crate::sim::{GameEvent, GameOverReason};

/// Sound effect kinds the sim can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    Jump,
    DoubleJump,
    Pickup,
    /// Lethal contact
    Hit,
    PowerUp,
    GameOver,
}

/// Animation track used for locomotion (run/jump/fall)
pub const TRACK_MOVEMENT: usize = 0;
/// Animation track used for overlays (blink, hit flashes)
pub const TRACK_FX: usize = 1;

/// Skeletal-animation player, treated as a black box
pub trait AnimationPlayer {
    fn play(&mut self, name: &str, looped: bool, track: usize);
    fn pause_track(&mut self, track: usize);
    fn resume_track(&mut self, track: usize);
    fn set_time_scale(&mut self, scale: f32);
    /// Animations currently loaded; anything else is not playable yet
    fn animation_names(&self) -> Vec<String>;
}

/// Fire-and-forget audio output; no return value is ever consulted
pub trait AudioSink {
    fn play_effect(&mut self, effect: SoundEffect);
    fn start_music(&mut self);
    fn stop_music(&mut self);
}

/// Immediate-mode debug drawing for collider visualization
pub trait DebugDraw {
    fn draw_box(&mut self, x: f32, y: f32, w: f32, h: f32, lethal: bool);
}

/// Stand-in for a collaborator that has not loaded yet
pub struct NullAnimation;

impl AnimationPlayer for NullAnimation {
    fn play(&mut self, _name: &str, _looped: bool, _track: usize) {}
    fn pause_track(&mut self, _track: usize) {}
    fn resume_track(&mut self, _track: usize) {}
    fn set_time_scale(&mut self, _scale: f32) {}
    fn animation_names(&self) -> Vec<String> {
        Vec::new()
    }
}

pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play_effect(&mut self, _effect: SoundEffect) {}
    fn start_music(&mut self) {}
    fn stop_music(&mut self) {}
}

pub struct NullDebugDraw;

impl DebugDraw for NullDebugDraw {
    fn draw_box(&mut self, _x: f32, _y: f32, _w: f32, _h: f32, _lethal: bool) {}
}

/// Play an animation only if the rig actually has it. Collaborators load
/// asynchronously during setup; a missing name is expected early on.
fn play_if_loaded(anim: &mut dyn AnimationPlayer, name: &str, looped: bool, track: usize) {
    if anim.animation_names().iter().any(|n| n == name) {
        anim.play(name, looped, track);
    } else {
        log::debug!("animation '{name}' not loaded yet, skipping");
    }
}

/// Map one frame's drained events onto collaborator calls
pub fn dispatch_events(
    events: &[GameEvent],
    anim: &mut dyn AnimationPlayer,
    audio: &mut dyn AudioSink,
) {
    for event in events {
        match event {
            GameEvent::Jumped => {
                audio.play_effect(SoundEffect::Jump);
                play_if_loaded(anim, "jump", false, TRACK_MOVEMENT);
            }
            GameEvent::DoubleJumped => {
                audio.play_effect(SoundEffect::DoubleJump);
                play_if_loaded(anim, "jump", false, TRACK_MOVEMENT);
            }
            GameEvent::Landed => {
                play_if_loaded(anim, "run", true, TRACK_MOVEMENT);
            }
            GameEvent::PickupCollected { .. } => {
                audio.play_effect(SoundEffect::Pickup);
            }
            GameEvent::PowerUpStarted => {
                audio.play_effect(SoundEffect::PowerUp);
            }
            GameEvent::PowerUpEnding => {
                play_if_loaded(anim, "blink", true, TRACK_FX);
            }
            GameEvent::PowerUpEnded => {
                anim.pause_track(TRACK_FX);
            }
            GameEvent::PlayerHit { .. } => {
                audio.play_effect(SoundEffect::Hit);
                play_if_loaded(anim, "die", false, TRACK_MOVEMENT);
            }
            GameEvent::GameOver { reason } => {
                audio.play_effect(SoundEffect::GameOver);
                audio.stop_music();
                if *reason == GameOverReason::FellIntoPit {
                    play_if_loaded(anim, "fall", false, TRACK_MOVEMENT);
                }
            }
        }
    }
}

/// Draw every live collider when the hitbox debug flag is on
pub fn draw_hitboxes(world: &WorldMap, draw: &mut dyn DebugDraw) {
    if !world.hitbox_debug() {
        return;
    }
    for (_, c) in world.colliders() {
        draw.draw_box(c.x, c.top_y, c.width, c.height, c.kind.is_lethal());
    }
}
