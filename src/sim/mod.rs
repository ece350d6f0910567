//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (pool slot / roster order)
//! - No rendering, audio, or platform dependencies
//!
//! Per tick: kinematics, then collision, then spawning (single-player) or
//! round timers (versus). Listeners observe events within the same tick.

pub mod ai;
pub mod collision;
pub mod events;
pub mod physics;
pub mod pool;
pub mod round;
pub mod score;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod versus;

pub use collision::{Penetration, is_near_miss, penetration, resolve_terrain};
pub use events::{
    EventBus, EventListener, EventRecorder, EventSink, GameEvent, HitSource, HitTarget,
    ListenerError, ListenerFailure, NullSink, SubscriptionId,
};
pub use physics::KinematicsTuning;
pub use pool::{Handle, ObjectPool};
pub use round::{MatchOutcome, MatchState, RoundStats, RoundTracker, VersusRules, decide_winner};
pub use score::{ScoreAggregator, ScoreRules, ScoreState};
pub use spawn::{WaveDefinition, WaveEntry, WaveInfo, WavePhase, WaveScheduler, build_wave_definition};
pub use state::{
    Aabb, Actor, Body, Bullet, BulletHandle, BulletOwner, Enemy, EnemyHandle, EnemyKind, EnemyPose,
    Facing, FireParams, Platform, Player, PlayerInput, PlayerSlot,
};
pub use tick::{Arena, FixedStep, RunPhase, RunSummary, SoloLayout};
pub use versus::{VersusArena, VersusLayout};
