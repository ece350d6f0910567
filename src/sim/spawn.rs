//! Wave generation and timed enemy spawning
//!
//! A wave is a queue of (kind, delay) entries derived from the wave number.
//! The scheduler drains that queue on a countdown, materializing enemies
//! from the pool at round-robin spawn points.

use std::collections::VecDeque;

use glam::Vec2;
use serde::Serialize;

use super::events::{EventSink, GameEvent};
use super::pool::ObjectPool;
use super::state::{Enemy, EnemyHandle, EnemyKind};
use crate::sanitize_dt;

/// Used when the scene supplies no usable spawn points
pub const DEFAULT_SPAWN_POINTS: [Vec2; 4] = [
    Vec2::new(-64.0, 0.0),
    Vec2::new(140.0, -32.0),
    Vec2::new(620.0, -32.0),
    Vec2::new(940.0, 0.0),
];

/// Upper bound on spawns processed by a single update
pub const MAX_SPAWNS_PER_UPDATE: usize = 200;

const MIN_SPAWN_INTERVAL_MS: f64 = 260.0;
const BASE_SPAWN_INTERVAL_MS: f64 = 920.0;
const SPAWN_INTERVAL_STEP_MS: f64 = 45.0;
const MIN_ENTRY_DELAY_MS: f64 = 140.0;
const MIN_REARM_MS: f64 = 80.0;

/// Kinds that arrive slower stretch the base interval
pub fn delay_multiplier(kind: EnemyKind) -> f64 {
    match kind {
        EnemyKind::Grunt => 1.0,
        EnemyKind::Rusher => 0.85,
        EnemyKind::Sniper => 1.25,
        EnemyKind::Tank => 1.6,
        EnemyKind::Boss => 2.25,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaveEntry {
    pub kind: EnemyKind,
    /// Countdown applied after this entry spawns
    pub delay_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveDefinition {
    pub wave: u32,
    pub spawn_interval_ms: f64,
    pub entries: Vec<WaveEntry>,
}

impl WaveDefinition {
    pub fn count(&self, kind: EnemyKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

/// Deterministic entry queue for `wave`; wave 0 is treated as wave 1
pub fn build_wave_definition(wave: u32) -> WaveDefinition {
    let wave = wave.max(1);
    let n = wave as f64;
    let spawn_interval_ms = (BASE_SPAWN_INTERVAL_MS - n * SPAWN_INTERVAL_STEP_MS).max(MIN_SPAWN_INTERVAL_MS);

    let mut entries = Vec::new();
    let mut push_many = |kind: EnemyKind, amount: u32| {
        let delay_ms = (spawn_interval_ms * delay_multiplier(kind)).round().max(MIN_ENTRY_DELAY_MS);
        entries.extend((0..amount).map(|_| WaveEntry { kind, delay_ms }));
    };

    push_many(EnemyKind::Grunt, 3 + wave * 2);
    if wave >= 2 {
        push_many(EnemyKind::Rusher, 1 + wave / 2);
    }
    if wave >= 3 {
        push_many(EnemyKind::Sniper, 1 + (wave - 1) / 2);
    }
    if wave >= 4 {
        push_many(EnemyKind::Tank, (wave - 2) / 2);
    }
    if wave % 5 == 0 {
        push_many(EnemyKind::Boss, 1);
    }

    WaveDefinition {
        wave,
        spawn_interval_ms,
        entries,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WavePhase {
    #[default]
    Idle,
    Active,
}

/// Snapshot for HUD display
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaveInfo {
    pub current_wave: u32,
    pub phase: WavePhase,
    pub pending_spawns: usize,
    pub spawn_timer_ms: f64,
    pub spawned_this_wave: u32,
}

#[derive(Debug, Clone, Default)]
pub struct WaveScheduler {
    current_wave: u32,
    phase: WavePhase,
    pending: VecDeque<WaveEntry>,
    spawn_timer_ms: f64,
    spawned_this_wave: u32,
    wave_start_pending: bool,
}

impl WaveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue wave `wave` and arm the first spawn immediately
    pub fn start_wave(&mut self, wave: u32) -> WaveInfo {
        let definition = build_wave_definition(wave);
        self.current_wave = definition.wave;
        self.phase = WavePhase::Active;
        self.pending = definition.entries.into();
        self.spawn_timer_ms = 0.0;
        self.spawned_this_wave = 0;
        self.wave_start_pending = true;
        self.wave_info()
    }

    /// Queue the wave after the current one
    pub fn start_next_wave(&mut self) -> WaveInfo {
        self.start_wave(self.current_wave + 1)
    }

    pub fn wave_info(&self) -> WaveInfo {
        WaveInfo {
            current_wave: self.current_wave,
            phase: self.phase,
            pending_spawns: self.pending.len(),
            spawn_timer_ms: self.spawn_timer_ms,
            spawned_this_wave: self.spawned_this_wave,
        }
    }

    pub fn current_wave(&self) -> u32 {
        self.current_wave
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Back to wave 0, nothing queued
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Queue drained and no rostered enemy still alive
    pub fn is_wave_cleared(&self, enemies: &ObjectPool<Enemy>, roster: &[EnemyHandle]) -> bool {
        if self.phase != WavePhase::Active || !self.pending.is_empty() {
            return false;
        }
        !roster
            .iter()
            .any(|&handle| enemies.get(handle).is_some_and(|enemy| enemy.body.active))
    }

    /// Advance the spawn countdown by `dt` seconds
    ///
    /// Dead enemies are released back to `enemies` and dropped from `roster`
    /// before anything spawns. With `auto_start`, an idle scheduler starts
    /// the next wave first.
    pub fn update(
        &mut self,
        dt: f32,
        enemies: &mut ObjectPool<Enemy>,
        roster: &mut Vec<EnemyHandle>,
        spawn_points: &[Vec2],
        auto_start: bool,
        events: &mut dyn EventSink,
    ) {
        let dt = sanitize_dt(dt);
        if dt <= 0.0 {
            return;
        }

        recycle_inactive(enemies, roster);

        if self.phase == WavePhase::Idle && auto_start {
            self.start_next_wave();
        }
        if self.phase != WavePhase::Active {
            return;
        }

        if self.wave_start_pending {
            self.wave_start_pending = false;
            log::info!("Wave {} started: {} enemies queued", self.current_wave, self.pending.len());
            events.emit(GameEvent::WaveStart {
                wave: self.current_wave,
                total_enemies: self.pending.len(),
            });
        }

        self.spawn_timer_ms -= dt as f64 * 1000.0;

        let mut spawned = 0;
        while self.spawn_timer_ms <= 0.0 && spawned < MAX_SPAWNS_PER_UPDATE {
            let Some(entry) = self.pending.pop_front() else {
                break;
            };
            let pos = spawn_point(spawn_points, self.spawned_this_wave as usize);

            let handle = enemies.acquire();
            if let Some(enemy) = enemies.get_mut(handle) {
                enemy.configure(entry.kind, pos);
            }
            roster.push(handle);
            self.spawned_this_wave += 1;

            log::debug!("Spawned {} at ({:.0}, {:.0})", entry.kind.as_str(), pos.x, pos.y);
            events.emit(GameEvent::EnemySpawned {
                wave: self.current_wave,
                enemy: handle,
                kind: entry.kind,
                pos,
            });

            self.spawn_timer_ms += entry.delay_ms.max(MIN_REARM_MS);
            spawned += 1;
        }

        if self.is_wave_cleared(enemies, roster) {
            self.phase = WavePhase::Idle;
            self.spawn_timer_ms = 0.0;
            log::info!("Wave {} cleared ({} spawned)", self.current_wave, self.spawned_this_wave);
            events.emit(GameEvent::WaveCleared {
                wave: self.current_wave,
                spawned: self.spawned_this_wave,
            });
        }
    }
}

/// Round-robin spawn coordinate; unusable points fall back to the defaults
pub fn spawn_point(points: &[Vec2], spawn_index: usize) -> Vec2 {
    let fallback = DEFAULT_SPAWN_POINTS[spawn_index % DEFAULT_SPAWN_POINTS.len()];
    if points.is_empty() {
        return fallback;
    }
    let point = points[spawn_index % points.len()];
    Vec2::new(
        if point.x.is_finite() { point.x } else { fallback.x },
        if point.y.is_finite() { point.y } else { fallback.y },
    )
}

/// Release dead enemies and compact the roster in place
pub fn recycle_inactive(enemies: &mut ObjectPool<Enemy>, roster: &mut Vec<EnemyHandle>) {
    roster.retain(|&handle| {
        let alive = enemies.get(handle).is_some_and(|enemy| enemy.body.active);
        if !alive {
            enemies.release(handle);
        }
        alive
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_wave_one_definition() {
        let def = build_wave_definition(1);
        assert_eq!(def.wave, 1);
        assert_eq!(def.spawn_interval_ms, 875.0);
        assert_eq!(def.entries.len(), 5);
        assert!(def.entries.iter().all(|e| e.kind == EnemyKind::Grunt && e.delay_ms == 875.0));
        assert_eq!(build_wave_definition(0), def);
    }

    #[test]
    fn test_wave_five_mix() {
        let def = build_wave_definition(5);
        assert_eq!(def.spawn_interval_ms, 695.0);
        assert_eq!(def.count(EnemyKind::Grunt), 13);
        assert_eq!(def.count(EnemyKind::Rusher), 3);
        assert_eq!(def.count(EnemyKind::Sniper), 3);
        assert_eq!(def.count(EnemyKind::Tank), 1);
        assert_eq!(def.count(EnemyKind::Boss), 1);
        let boss = def.entries.last().unwrap();
        assert_eq!(boss.kind, EnemyKind::Boss);
        assert_eq!(boss.delay_ms, 1564.0);
    }

    #[test]
    fn test_interval_floors() {
        let def = build_wave_definition(60);
        assert_eq!(def.spawn_interval_ms, 260.0);
        let rusher = def.entries.iter().find(|e| e.kind == EnemyKind::Rusher).unwrap();
        assert_eq!(rusher.delay_ms, 221.0);
    }

    #[test]
    fn test_first_update_announces_and_spawns() {
        let mut scheduler = WaveScheduler::new();
        let mut pool = ObjectPool::new(Enemy::default);
        let mut roster = Vec::new();
        let mut events = Vec::new();

        scheduler.start_wave(1);
        scheduler.update(DT, &mut pool, &mut roster, &[], false, &mut events);

        let names: Vec<_> = events.iter().map(GameEvent::name).collect();
        assert_eq!(names, vec!["wave_start", "enemy_spawned"]);
        assert!(matches!(events[0], GameEvent::WaveStart { wave: 1, total_enemies: 5 }));
        assert_eq!(roster.len(), 1);
        let enemy = pool.get(roster[0]).unwrap();
        assert_eq!(enemy.body.pos, DEFAULT_SPAWN_POINTS[0]);
        assert_eq!(scheduler.wave_info().pending_spawns, 4);
    }

    #[test]
    fn test_spawn_points_round_robin() {
        let mut scheduler = WaveScheduler::new();
        let mut pool = ObjectPool::new(Enemy::default);
        let mut roster = Vec::new();
        let points = [Vec2::new(1.0, 1.0), Vec2::new(2.0, f32::NAN)];

        scheduler.start_wave(1);
        scheduler.update(10.0, &mut pool, &mut roster, &points, false, &mut NullSinkCounter::default());

        let positions: Vec<_> = roster.iter().map(|&h| pool.get(h).unwrap().body.pos).collect();
        assert_eq!(positions.len(), 5);
        assert_eq!(positions[0], Vec2::new(1.0, 1.0));
        assert_eq!(positions[1], Vec2::new(2.0, DEFAULT_SPAWN_POINTS[1].y));
        assert_eq!(positions[2], Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_loop_guard_caps_spawns() {
        let mut scheduler = WaveScheduler::new();
        let mut pool = ObjectPool::new(Enemy::default);
        let mut roster = Vec::new();

        let info = scheduler.start_wave(200);
        scheduler.update(1.0e6, &mut pool, &mut roster, &[], false, &mut NullSinkCounter::default());

        assert_eq!(roster.len(), MAX_SPAWNS_PER_UPDATE);
        assert_eq!(scheduler.wave_info().pending_spawns, info.pending_spawns - MAX_SPAWNS_PER_UPDATE);
    }

    #[test]
    fn test_wave_clears_after_enemies_die() {
        let mut scheduler = WaveScheduler::new();
        let mut pool = ObjectPool::new(Enemy::default);
        let mut roster = Vec::new();
        let mut events = Vec::new();

        scheduler.start_wave(1);
        scheduler.update(10.0, &mut pool, &mut roster, &[], false, &mut events);
        assert!(!scheduler.is_wave_cleared(&pool, &roster));
        assert_eq!(scheduler.phase(), WavePhase::Active);

        for &handle in &roster {
            pool.get_mut(handle).unwrap().body.kill();
        }
        events.clear();
        scheduler.update(DT, &mut pool, &mut roster, &[], false, &mut events);

        assert!(roster.is_empty());
        assert_eq!(pool.active_count(), 0);
        assert_eq!(scheduler.phase(), WavePhase::Idle);
        assert!(matches!(events.as_slice(), [GameEvent::WaveCleared { wave: 1, spawned: 5 }]));
    }

    #[test]
    fn test_auto_start_advances_wave() {
        let mut scheduler = WaveScheduler::new();
        let mut pool = ObjectPool::new(Enemy::default);
        let mut roster = Vec::new();
        let mut events = Vec::new();

        scheduler.update(DT, &mut pool, &mut roster, &[], false, &mut events);
        assert!(events.is_empty());

        scheduler.update(DT, &mut pool, &mut roster, &[], true, &mut events);
        assert_eq!(scheduler.current_wave(), 1);
        assert_eq!(events[0].name(), "wave_start");
    }

    #[test]
    fn test_non_positive_dt_is_noop() {
        let mut scheduler = WaveScheduler::new();
        let mut pool = ObjectPool::new(Enemy::default);
        let mut roster = Vec::new();
        let mut events = Vec::new();

        scheduler.start_wave(3);
        scheduler.update(0.0, &mut pool, &mut roster, &[], true, &mut events);
        scheduler.update(-1.0, &mut pool, &mut roster, &[], true, &mut events);
        assert!(events.is_empty());
        assert!(roster.is_empty());
    }

    /// Counts without storing
    #[derive(Default)]
    struct NullSinkCounter(usize);

    impl EventSink for NullSinkCounter {
        fn emit(&mut self, _event: GameEvent) {
            self.0 += 1;
        }
    }

    proptest! {
        #[test]
        fn prop_wave_size_never_shrinks(wave in 1u32..500) {
            let current = build_wave_definition(wave).entries.len();
            let next = build_wave_definition(wave + 1).entries.len();
            prop_assert!(next >= current);
        }

        #[test]
        fn prop_kinds_unlock_at_thresholds(wave in 1u32..500) {
            let def = build_wave_definition(wave);
            prop_assert_eq!(def.count(EnemyKind::Rusher) > 0, wave >= 2);
            prop_assert_eq!(def.count(EnemyKind::Sniper) > 0, wave >= 3);
            prop_assert_eq!(def.count(EnemyKind::Tank) > 0, wave >= 4);
            prop_assert_eq!(def.count(EnemyKind::Boss) == 1, wave % 5 == 0);
        }
    }
}
