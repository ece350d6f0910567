//! Bullet Dodge Arena headless runner
//!
//! Drives a bot through a single-player run and two bots through a versus
//! match, then prints a JSON report. Usage: `arena-sim [seed]`.
//!
//! Environment:
//! - `ARENA_SIM_DATA_DIR`: persist settings and high scores as JSON files here
//! - `ARENA_SIM_TUNING`: path to a tuning JSON document
//! - `RUST_LOG`: log filter (env_logger)

use std::env;
use std::error::Error;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use bullet_dodge_arena::consts::SIM_DT;
use bullet_dodge_arena::sim::{
    Arena, FixedStep, MatchOutcome, PlayerInput, PlayerSlot, RoundStats, RunPhase, RunSummary,
    SoloLayout, VersusArena, VersusLayout,
};
use bullet_dodge_arena::storage::{FileStore, MemoryStore, Store};
use bullet_dodge_arena::{HighScores, Settings, Tuning};

const DEFAULT_SEED: u64 = 0x5EED;
/// Simulated wall-clock cap per mode
const SOLO_TIME_LIMIT_S: f64 = 180.0;
const VERSUS_TIME_LIMIT_S: f64 = 120.0;

#[derive(Debug, Serialize)]
struct SoloReport {
    summary: RunSummary,
    game_over: bool,
    high_score_rank: Option<usize>,
    best_score: Option<u64>,
}

#[derive(Debug, Serialize)]
struct VersusReport {
    outcome: Option<MatchOutcome>,
    stats: [RoundStats; 2],
    ticks: u64,
}

#[derive(Debug, Serialize)]
struct SimReport {
    seed: u64,
    solo: SoloReport,
    versus: VersusReport,
}

/// Variable frame time around 60 fps
fn frame_dt(rng: &mut Pcg32) -> f32 {
    rng.random_range(0.012..0.024)
}

fn solo_bot(arena: &Arena, rng: &mut Pcg32) -> PlayerInput {
    let player = arena.player();
    let px = player.body.center().x;
    let target = arena
        .enemies()
        .filter(|(_, e)| e.body.is_live())
        .map(|(_, e)| e.body.center().x - px)
        .min_by(|a, b| a.abs().total_cmp(&b.abs()));

    let move_axis = match target {
        Some(dx) if dx.abs() > 160.0 => dx.signum() * rng.random_range(0.6..1.0),
        // Nudge toward the target so facing tracks it
        Some(dx) => dx.signum() * 0.05,
        None => rng.random_range(-0.3..0.3),
    };

    PlayerInput {
        move_axis,
        jump: player.grounded && rng.random_bool(0.03),
        shoot: target.is_some(),
    }
}

fn versus_bot(arena: &VersusArena, slot: PlayerSlot, rng: &mut Pcg32) -> PlayerInput {
    let me = arena.player(slot);
    let them = arena.player(slot.opponent());
    let dx = them.body.center().x - me.body.center().x;

    let move_axis = if dx.abs() > 240.0 {
        dx.signum() * rng.random_range(0.5..1.0)
    } else {
        dx.signum() * rng.random_range(0.0..0.2)
    };

    PlayerInput {
        move_axis,
        jump: me.grounded && rng.random_bool(0.04),
        shoot: them.body.active && rng.random_bool(0.7),
    }
}

fn run_solo(tuning: Tuning, rng: &mut Pcg32) -> (RunSummary, bool) {
    let mut arena = Arena::new(SoloLayout::default(), tuning);
    let mut clock = FixedStep::default();
    let mut now_ms = 0.0_f64;

    'frames: while now_ms < SOLO_TIME_LIMIT_S * 1000.0 {
        let steps = clock.advance(frame_dt(rng));
        for _ in 0..steps {
            let input = solo_bot(&arena, rng);
            now_ms += f64::from(SIM_DT) * 1000.0;
            if arena.tick(&input, clock.step(), now_ms) == RunPhase::GameOver {
                break 'frames;
            }
        }
    }

    let summary = arena.summary();
    log::info!(
        "Solo run ended: score {}, wave {}, {} kills, {} dodges",
        summary.score,
        summary.wave,
        summary.kills,
        summary.dodges
    );
    (summary, arena.phase() == RunPhase::GameOver)
}

fn run_versus(tuning: Tuning, rng: &mut Pcg32) -> VersusReport {
    let mut arena = VersusArena::new(VersusLayout::default(), tuning);
    let mut clock = FixedStep::default();
    let mut now_ms = 0.0_f64;

    'frames: while now_ms < VERSUS_TIME_LIMIT_S * 1000.0 {
        let steps = clock.advance(frame_dt(rng));
        for _ in 0..steps {
            let inputs = [
                versus_bot(&arena, PlayerSlot::One, rng),
                versus_bot(&arena, PlayerSlot::Two, rng),
            ];
            now_ms += f64::from(SIM_DT) * 1000.0;
            if arena.tick(&inputs, clock.step(), now_ms).is_over() {
                break 'frames;
            }
        }
    }

    let outcome = arena.outcome();
    match &outcome {
        Some(o) => log::info!("Versus match won by {:?} after {} ticks", o.winner, arena.ticks()),
        None => log::info!("Versus match hit the time limit after {} ticks", arena.ticks()),
    }

    VersusReport {
        outcome,
        stats: [arena.stats(PlayerSlot::One), arena.stats(PlayerSlot::Two)],
        ticks: arena.ticks(),
    }
}

fn load_tuning() -> Tuning {
    let Ok(path) = env::var("ARENA_SIM_TUNING") else {
        return Tuning::default();
    };
    match fs::read_to_string(&path) {
        Ok(json) => {
            log::info!("Loaded tuning from {}", path);
            Tuning::from_json(&json)
        }
        Err(e) => {
            log::warn!("Failed to read tuning {}: {}", path, e);
            Tuning::default()
        }
    }
}

fn open_store() -> Result<Box<dyn Store>, Box<dyn Error>> {
    match env::var("ARENA_SIM_DATA_DIR") {
        Ok(dir) => {
            let store = FileStore::open(&dir)?;
            log::info!("Persisting to {}", store.dir().display());
            Ok(Box::new(store))
        }
        Err(_) => Ok(Box::new(MemoryStore::new())),
    }
}

fn now_timestamp_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let seed = match env::args().nth(1) {
        Some(arg) => arg.parse::<u64>()?,
        None => DEFAULT_SEED,
    };
    log::info!("Bullet Dodge Arena sim starting (seed {})", seed);

    let tuning = load_tuning();
    let mut store = open_store()?;
    let settings = Settings::load(store.as_ref());
    log::debug!("Control scheme: {}", settings.control_scheme.as_str());

    let mut rng = Pcg32::seed_from_u64(seed);
    let (summary, game_over) = run_solo(tuning, &mut rng);

    let mut scores = HighScores::load(store.as_ref());
    let rank = scores.add_run(&summary, now_timestamp_ms());
    if rank.is_some() {
        scores.save(store.as_mut())?;
    }

    let versus = run_versus(tuning, &mut rng);

    let report = SimReport {
        seed,
        solo: SoloReport {
            summary,
            game_over,
            high_score_rank: rank,
            best_score: scores.top_score(),
        },
        versus,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
