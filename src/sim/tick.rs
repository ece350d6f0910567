//! Fixed timestep simulation tick
//!
//! `Arena` runs the single-player pipeline: input, AI, kinematics, collision,
//! spawning, bullet motion, then run-over detection. Events raised anywhere in
//! a tick reach the score ledger before `tick` returns.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;

use super::ai;
use super::collision;
use super::events::{EventBus, EventSink, GameEvent, HitSource};
use super::physics;
use super::pool::ObjectPool;
use super::score::{ScoreAggregator, ScoreState};
use super::spawn::{WaveInfo, WavePhase, WaveScheduler};
use super::state::{
    Actor, Bullet, BulletHandle, BulletOwner, Enemy, EnemyHandle, EnemyKind, FireParams, Platform,
    Player, PlayerInput, PlayerSlot,
};
use crate::consts::*;
use crate::sanitize_dt;
use crate::tuning::Tuning;

/// Where released enemies are parked until reuse
const PARKED_POS: Vec2 = Vec2::new(-9999.0, -9999.0);

/// Converts variable frame time into fixed simulation steps
#[derive(Debug, Clone, Copy)]
pub struct FixedStep {
    accumulator: f32,
    step: f32,
    max_substeps: u32,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(SIM_DT, MAX_SUBSTEPS)
    }
}

impl FixedStep {
    pub fn new(step: f32, max_substeps: u32) -> Self {
        let step = if step.is_finite() && step > 0.0 { step } else { SIM_DT };
        Self {
            accumulator: 0.0,
            step,
            max_substeps: max_substeps.max(1),
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Fraction of a step left in the accumulator (for interpolation)
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Bank `frame_dt` and return how many fixed steps to run now
    ///
    /// Backlog beyond `max_substeps` whole steps is dropped.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += sanitize_dt(frame_dt);

        let mut substeps = 0;
        while self.accumulator >= self.step && substeps < self.max_substeps {
            self.accumulator -= self.step;
            substeps += 1;
        }
        if self.accumulator >= self.step {
            self.accumulator %= self.step;
        }
        substeps
    }
}

/// Static geometry for a single-player run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoloLayout {
    pub world_width: f32,
    pub ground_y: f32,
    pub platforms: Vec<Platform>,
    pub spawn_points: Vec<Vec2>,
    pub player_start: Vec2,
}

impl SoloLayout {
    /// Ground strip, two ledges, and three enemy entrances for a viewport
    pub fn for_view(view_width: f32, view_height: f32) -> Self {
        let world_width = SOLO_WORLD_MIN_WIDTH.max(view_width.max(1.0) * SOLO_WORLD_MULT);
        let ground_y = view_height.max(1.0) - SOLO_GROUND_HEIGHT;

        Self {
            world_width,
            ground_y,
            platforms: vec![
                Platform::new(0.0, ground_y, world_width, SOLO_GROUND_HEIGHT),
                Platform::new(world_width * 0.28, ground_y - 170.0, 280.0, 28.0),
                Platform::new(world_width * 0.62, ground_y - 220.0, 300.0, 28.0),
            ],
            spawn_points: vec![
                Vec2::new(-40.0, ground_y - 80.0),
                Vec2::new(world_width * 0.35, ground_y - 260.0),
                Vec2::new(world_width + 40.0, ground_y - 80.0),
            ],
            player_start: Vec2::new(220.0, ground_y - PLAYER_HEIGHT),
        }
    }
}

impl Default for SoloLayout {
    fn default() -> Self {
        Self::for_view(960.0, 540.0)
    }
}

/// Single-player run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RunPhase {
    #[default]
    Playing,
    GameOver,
}

/// End-of-run (or in-progress) numbers for HUD and leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub score: u64,
    pub kills: u32,
    pub dodges: u32,
    pub hits: u32,
    pub deaths: u32,
    pub wave: u32,
    pub time_seconds: u32,
    pub ticks: u64,
}

pub struct Arena {
    tuning: Tuning,
    layout: SoloLayout,
    player: Player,
    enemies: ObjectPool<Enemy>,
    roster: Vec<EnemyHandle>,
    bullets: ObjectPool<Bullet>,
    live_bullets: Vec<BulletHandle>,
    scheduler: WaveScheduler,
    bus: EventBus,
    score: Rc<RefCell<ScoreAggregator>>,
    phase: RunPhase,
    elapsed_ms: f64,
    ticks: u64,
}

impl Arena {
    pub fn new(layout: SoloLayout, tuning: Tuning) -> Self {
        Self::with_enemy_factory(layout, tuning, Enemy::default)
    }

    /// Build enemies with `factory` instead of `Enemy::default`
    pub fn with_enemy_factory(
        layout: SoloLayout,
        tuning: Tuning,
        factory: impl FnMut() -> Enemy + 'static,
    ) -> Self {
        let mut enemies = ObjectPool::with_reset(factory, |enemy: &mut Enemy| {
            enemy.configure(EnemyKind::Grunt, PARKED_POS);
            enemy.body.active = false;
        });
        enemies.preallocate(tuning.pools.clamped().enemies);

        let mut bullets = ObjectPool::with_reset(Bullet::default, Bullet::reset);
        bullets.preallocate(tuning.pools.clamped().bullets);

        let score = Rc::new(RefCell::new(ScoreAggregator::new(tuning.score)));
        let mut bus = EventBus::new();
        bus.subscribe(score.clone());

        Self {
            player: Player::new(layout.player_start),
            tuning,
            layout,
            enemies,
            roster: Vec::new(),
            bullets,
            live_bullets: Vec::new(),
            scheduler: WaveScheduler::new(),
            bus,
            score,
            phase: RunPhase::Playing,
            elapsed_ms: 0.0,
            ticks: 0,
        }
    }

    /// Return every pooled object and start a fresh run
    pub fn reset(&mut self) {
        for handle in self.roster.drain(..) {
            self.enemies.release(handle);
        }
        for handle in self.live_bullets.drain(..) {
            self.bullets.release(handle);
        }
        self.player = Player::new(self.layout.player_start);
        self.scheduler.reset();
        self.score.borrow_mut().reset();
        self.bus.take_failures();
        self.phase = RunPhase::Playing;
        self.elapsed_ms = 0.0;
        self.ticks = 0;
        log::info!("Arena reset");
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn layout(&self) -> &SoloLayout {
        &self.layout
    }

    pub fn enemies(&self) -> impl Iterator<Item = (EnemyHandle, &Enemy)> + '_ {
        self.roster
            .iter()
            .filter_map(|&handle| self.enemies.get(handle).map(|enemy| (handle, enemy)))
    }

    pub fn bullets(&self) -> impl Iterator<Item = (BulletHandle, &Bullet)> + '_ {
        self.live_bullets
            .iter()
            .filter_map(|&handle| self.bullets.get(handle).map(|bullet| (handle, bullet)))
    }

    pub fn enemy_pool(&self) -> &ObjectPool<Enemy> {
        &self.enemies
    }

    pub fn bullet_pool(&self) -> &ObjectPool<Bullet> {
        &self.bullets
    }

    pub fn wave_info(&self) -> WaveInfo {
        self.scheduler.wave_info()
    }

    pub fn score(&self) -> ScoreState {
        self.score.borrow().state()
    }

    /// Dispatcher for HUD/audio subscribers
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn summary(&self) -> RunSummary {
        let score = self.score();
        RunSummary {
            score: score.score,
            kills: score.kills,
            dodges: score.dodges,
            hits: score.hits,
            deaths: score.deaths,
            wave: score.wave.max(self.scheduler.current_wave()),
            time_seconds: (self.elapsed_ms / 1000.0).floor() as u32,
            ticks: self.ticks,
        }
    }

    /// Advance the run by `dt` seconds; `now_ms` gates shot cooldowns
    pub fn tick(&mut self, input: &PlayerInput, dt: f32, now_ms: f64) -> RunPhase {
        let dt = sanitize_dt(dt);
        if dt <= 0.0 || self.phase == RunPhase::GameOver {
            return self.phase;
        }
        self.ticks += 1;
        self.elapsed_ms += dt as f64 * 1000.0;

        self.player.apply_input(input);
        if input.shoot {
            self.fire_player_bullet(now_ms);
        }

        if self.scheduler.phase() == WavePhase::Idle && self.roster.is_empty() {
            self.scheduler.start_next_wave();
        }

        let shooters = ai::update_enemies(
            &mut self.enemies,
            &self.roster,
            std::slice::from_ref(&self.player),
            now_ms,
            &mut self.bus,
        );
        for shooter in shooters {
            self.fire_enemy_bullet(shooter);
        }

        physics::step_kinematics(
            std::slice::from_mut(&mut self.player),
            &mut self.enemies,
            &self.roster,
            &self.tuning.kinematics,
            dt,
        );
        collision::resolve_all_terrain(
            std::slice::from_mut(&mut self.player),
            &mut self.enemies,
            &self.roster,
            &self.layout.platforms,
        );
        collision::resolve_solo_bullets(
            &mut self.bullets,
            &self.live_bullets,
            &mut self.player,
            &mut self.enemies,
            &self.roster,
            &mut self.bus,
        );

        self.cull_fallen_enemies();
        self.scheduler.update(
            dt,
            &mut self.enemies,
            &mut self.roster,
            &self.layout.spawn_points,
            false,
            &mut self.bus,
        );
        for &handle in &self.roster {
            if let Some(enemy) = self.enemies.get_mut(handle) {
                enemy.update_pose();
            }
        }

        self.advance_bullets(dt);
        self.recycle_bullets();

        let max_x = (self.layout.world_width - self.player.body.size.x).max(0.0);
        self.player.body.pos.x = self.player.body.pos.x.clamp(0.0, max_x);

        self.check_fall_death();

        if !self.player.body.active {
            self.phase = RunPhase::GameOver;
            let summary = self.summary();
            log::info!(
                "Run over: score {} on wave {} ({} kills, {} dodges)",
                summary.score,
                summary.wave,
                summary.kills,
                summary.dodges
            );
        }
        self.phase
    }

    fn fire_player_bullet(&mut self, now_ms: f64) {
        if !self.player.body.active || !self.player.can_shoot(now_ms) {
            return;
        }
        let center = self.player.body.center();
        self.launch_bullet(FireParams {
            pos: Vec2::new(center.x, center.y - 4.0),
            direction: Vec2::new(self.player.facing.sign(), 0.0),
            speed: PLAYER_BULLET_SPEED,
            damage: PLAYER_BULLET_DAMAGE,
            owner: BulletOwner::Player(PlayerSlot::One),
            lifetime_ms: SOLO_BULLET_LIFETIME_MS,
        });
        self.player.mark_shot(now_ms);
    }

    /// Put a pooled bullet into play; it moves and resolves from the next tick
    pub fn launch_bullet(&mut self, params: FireParams) -> BulletHandle {
        let owner = params.owner;
        let handle = self.bullets.acquire();
        if let Some(bullet) = self.bullets.get_mut(handle) {
            bullet.fire(params);
        }
        self.live_bullets.push(handle);
        self.bus.emit(GameEvent::BulletFired { owner, bullet: handle });
        handle
    }

    /// Aimed shot from the enemy's center toward the player's center
    fn fire_enemy_bullet(&mut self, shooter: EnemyHandle) {
        if !self.player.body.active {
            return;
        }
        let Some(enemy) = self.enemies.get(shooter) else {
            return;
        };
        if !enemy.body.active {
            return;
        }
        let from = enemy.body.center();
        let damage = enemy.damage.max(ENEMY_BULLET_MIN_DAMAGE);
        let direction = self.player.body.center() - from;

        self.launch_bullet(FireParams {
            pos: from,
            direction,
            speed: ENEMY_BULLET_SPEED,
            damage,
            owner: BulletOwner::Enemy(shooter),
            lifetime_ms: SOLO_BULLET_LIFETIME_MS,
        });
    }

    fn advance_bullets(&mut self, dt: f32) {
        let margin = SOLO_OFFSCREEN_MARGIN;
        let max_x = self.layout.world_width + margin;
        let max_y = self.layout.ground_y + margin * 2.0;

        for &handle in &self.live_bullets {
            let Some(bullet) = self.bullets.get_mut(handle) else {
                continue;
            };
            bullet.advance(dt);
            let pos = bullet.body.pos;
            if pos.x < -margin || pos.x > max_x || pos.y < -margin * 2.0 || pos.y > max_y {
                bullet.body.kill();
            }
        }
    }

    fn recycle_bullets(&mut self) {
        let bullets = &mut self.bullets;
        self.live_bullets.retain(|&handle| {
            let alive = bullets.get(handle).is_some_and(|bullet| bullet.body.active);
            if !alive {
                bullets.release(handle);
            }
            alive
        });
    }

    /// Enemies that drop out of the world are removed without kill credit
    fn cull_fallen_enemies(&mut self) {
        let floor = self.layout.ground_y + SOLO_FALL_DEATH_DEPTH;
        for &handle in &self.roster {
            if let Some(enemy) = self.enemies.get_mut(handle) {
                if enemy.body.active && enemy.body.pos.y > floor {
                    log::debug!("{} fell out of the world", enemy.kind.as_str());
                    enemy.body.kill();
                }
            }
        }
    }

    fn check_fall_death(&mut self) {
        let player = &mut self.player;
        if !player.body.active || player.body.pos.y <= self.layout.ground_y + SOLO_FALL_DEATH_DEPTH {
            return;
        }
        let before = player.health;
        let damage = player.max_health;
        let after = player.take_damage(damage);
        let is_fatal = !player.body.active || (before > 0.0 && after <= 0.0);
        self.bus.emit(GameEvent::PlayerHit {
            player: PlayerSlot::One,
            source: HitSource::Fall,
            damage,
            is_fatal,
        });
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("phase", &self.phase)
            .field("wave", &self.scheduler.current_wave())
            .field("enemies", &self.roster.len())
            .field("bullets", &self.live_bullets.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}
