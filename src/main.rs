//! Canyon Dash headless driver
//!
//! Runs the simulation without a renderer: fixed-timestep loop, demo-AI
//! input, events dispatched to logging collaborators. Useful for soak
//! testing the world generator and for watching a seed play out.
//!
//!     canyon-dash [seed] [seconds]

use canyon_dash::consts::*;
use canyon_dash::hooks::{self, AudioSink, NullAnimation, SoundEffect};
use canyon_dash::sim::{GamePhase, GameState, TickInput, tick};

/// Audio collaborator that just logs what it would play
struct LoggingAudio;

impl AudioSink for LoggingAudio {
    fn play_effect(&mut self, effect: SoundEffect) {
        log::debug!("sfx: {effect:?}");
    }
    fn start_music(&mut self) {
        log::debug!("music: start");
    }
    fn stop_music(&mut self) {
        log::debug!("music: stop");
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0xC0FFEE);
    let seconds: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60.0);

    log::info!("canyon-dash headless run: seed={seed} duration={seconds}s");

    let mut state = GameState::new(seed);
    let mut anim = NullAnimation;
    let mut audio = LoggingAudio;
    audio.start_music();

    let input = TickInput { idle_mode: true, ..Default::default() };

    // Frame loop at 60 fps with fixed-dt substeps, the same shape a
    // render-driven host uses
    let frame_dt = 1.0 / 60.0;
    let frames = (seconds / frame_dt).ceil() as u64;
    let mut accumulator = 0.0f32;

    for frame in 0..frames {
        accumulator += frame_dt;
        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut state, &input, SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }

        let events = state.drain_events();
        hooks::dispatch_events(&events, &mut anim, &mut audio);

        if state.session.phase == GamePhase::GameOver {
            break;
        }

        // Once a second, a progress line
        if frame % 60 == 0 {
            log::info!(
                "t={:>4.0}s score={:<6} distance={:>7.0} speed={:>5.0}",
                frame as f32 * frame_dt,
                state.session.score,
                state.distance(),
                state.world.speed(),
            );
        }
    }

    match state.session.game_over_reason {
        Some(reason) => log::info!(
            "run over: {reason:?} after {:.0} units, score {}",
            state.distance(),
            state.session.score
        ),
        None => log::info!(
            "run survived the full window: {:.0} units, score {}",
            state.distance(),
            state.session.score
        ),
    }
}
