//! Bullet Dodge Arena - A 2D side-view arena shooter simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pooling, kinematics, collisions, waves, rounds)
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences with load/normalize/persist
//! - `storage`: Key-value JSON persistence
//! - `highscores`: Finished-run leaderboard

pub mod highscores;
pub mod settings;
pub mod sim;
pub mod storage;
pub mod tuning;

pub use highscores::HighScores;
pub use settings::{ControlScheme, Settings};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Downward acceleration (pixels/s²)
    pub const GRAVITY: f32 = 1600.0;

    /// Player horizontal tuning
    pub const PLAYER_MAX_SPEED: f32 = 360.0;
    pub const PLAYER_ACCELERATION: f32 = 2400.0;
    pub const PLAYER_FRICTION: f32 = 2200.0;
    pub const PLAYER_JUMP_SPEED: f32 = 560.0;

    /// Player body defaults
    pub const PLAYER_WIDTH: f32 = 28.0;
    pub const PLAYER_HEIGHT: f32 = 40.0;
    pub const PLAYER_HEALTH: f32 = 100.0;
    pub const PLAYER_SHOOT_COOLDOWN_MS: f64 = 220.0;

    /// Bullets
    pub const PLAYER_BULLET_DAMAGE: f32 = 25.0;
    pub const PLAYER_BULLET_SPEED: f32 = 760.0;
    pub const ENEMY_BULLET_SPEED: f32 = 430.0;
    pub const VERSUS_BULLET_SPEED: f32 = 780.0;
    pub const BULLET_SIZE: f32 = 6.0;
    pub const BULLET_DEFAULT_LIFETIME_MS: f32 = 1000.0;
    pub const SOLO_BULLET_LIFETIME_MS: f32 = 2200.0;
    pub const VERSUS_BULLET_LIFETIME_MS: f32 = 2500.0;
    /// Minimum damage an enemy bullet deals
    pub const ENEMY_BULLET_MIN_DAMAGE: f32 = 4.0;

    /// Single-player world layout
    pub const SOLO_WORLD_MIN_WIDTH: f32 = 1600.0;
    pub const SOLO_WORLD_MULT: f32 = 3.0;
    pub const SOLO_GROUND_HEIGHT: f32 = 56.0;
    pub const SOLO_OFFSCREEN_MARGIN: f32 = 120.0;
    /// Falling this far below the ground kills the player
    pub const SOLO_FALL_DEATH_DEPTH: f32 = 320.0;

    /// Versus world layout
    pub const VERSUS_WORLD_MIN_WIDTH: f32 = 2200.0;
    pub const VERSUS_GROUND_HEIGHT: f32 = 22.0;
    pub const VERSUS_OFFSCREEN_MARGIN: f32 = 180.0;
    pub const VERSUS_PLATFORM_HEIGHT: f32 = 30.0;

    /// Versus round defaults
    pub const DEFAULT_RESPAWN_DELAY_MS: f64 = 1500.0;
    pub const DEFAULT_WIN_KILLS: u32 = 5;

    /// Pool warm-up sizes
    pub const ENEMY_POOL_PREALLOCATE: usize = 40;
    pub const BULLET_POOL_PREALLOCATE: usize = 160;
    /// Upper bound on any configured preallocation
    pub const MAX_POOL_PREALLOCATE: usize = 4096;
}

/// Coerce a frame delta to a usable value: non-finite or negative becomes 0
#[inline]
pub fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 { dt } else { 0.0 }
}

/// Clamp a move-intent axis into [-1, 1]; NaN reads as no intent
#[inline]
pub fn clamp_intent(intent: f32) -> f32 {
    if intent.is_finite() {
        intent.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Coerce a length to a finite non-negative value
#[inline]
pub fn non_negative(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
