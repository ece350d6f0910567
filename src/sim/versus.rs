//! Two-player duel
//!
//! Same kinematics and terrain rules as single-player, with no enemies.
//! Bullets only hurt the shooter's opponent, dead players come back after a
//! countdown, and the match ends once a slot reaches the kill target.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;

use super::collision;
use super::events::{EventBus, EventSink, GameEvent};
use super::physics;
use super::pool::ObjectPool;
use super::round::{MatchOutcome, MatchState, RoundStats, RoundTracker};
use super::state::{
    Bullet, BulletHandle, BulletOwner, Facing, FireParams, Platform, Player, PlayerInput, PlayerSlot,
};
use crate::consts::*;
use crate::sanitize_dt;
use crate::tuning::Tuning;

/// Players this far outside the world are put back at their spawn
const OUT_OF_BOUNDS_DEPTH: f32 = 420.0;
/// Gap between a spawned player's feet and the platform top
const SPAWN_LIFT: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersusLayout {
    pub world_width: f32,
    pub view_height: f32,
    pub ground_y: f32,
    pub platform_y: f32,
    pub platforms: Vec<Platform>,
    pub spawn_points: [Vec2; 2],
}

impl VersusLayout {
    /// Two mirrored ledges over a ground strip
    pub fn for_view(view_width: f32, view_height: f32) -> Self {
        let view_width = view_width.max(1.0);
        let view_height = view_height.max(1.0);

        let world_width = VERSUS_WORLD_MIN_WIDTH.max((view_width * 2.3).round());
        let ground_y = (view_height - VERSUS_GROUND_HEIGHT).max(0.0);
        let platform_y = (view_height * 0.84).round().max(80.0);

        let edge_pad = (view_width * 0.12).round().max(120.0);
        let platform_width = (view_width * 0.48).round().max(320.0);
        let left_x = edge_pad;
        let right_x = (left_x + platform_width + 260.0).max(world_width - edge_pad - platform_width);

        let spawn_y = platform_y - PLAYER_HEIGHT - SPAWN_LIFT;
        let half_player = PLAYER_WIDTH * 0.5;

        Self {
            world_width,
            view_height,
            ground_y,
            platform_y,
            platforms: vec![
                Platform::new(left_x, platform_y, platform_width, VERSUS_PLATFORM_HEIGHT),
                Platform::new(right_x, platform_y, platform_width, VERSUS_PLATFORM_HEIGHT),
                Platform::new(0.0, ground_y, world_width, VERSUS_GROUND_HEIGHT),
            ],
            spawn_points: [
                Vec2::new(left_x + platform_width * 0.74 - half_player, spawn_y),
                Vec2::new(right_x + platform_width * 0.26 - half_player, spawn_y),
            ],
        }
    }

    pub fn spawn_point(&self, slot: PlayerSlot) -> Vec2 {
        self.spawn_points[slot.index()]
    }
}

impl Default for VersusLayout {
    fn default() -> Self {
        Self::for_view(1280.0, 720.0)
    }
}

/// Slots face each other on (re)spawn
pub fn spawn_facing(slot: PlayerSlot) -> Facing {
    match slot {
        PlayerSlot::One => Facing::Right,
        PlayerSlot::Two => Facing::Left,
    }
}

pub struct VersusArena {
    tuning: Tuning,
    layout: VersusLayout,
    players: [Player; 2],
    bullets: ObjectPool<Bullet>,
    live_bullets: Vec<BulletHandle>,
    bus: EventBus,
    tracker: Rc<RefCell<RoundTracker>>,
    match_state: MatchState,
    ticks: u64,
}

impl VersusArena {
    pub fn new(layout: VersusLayout, tuning: Tuning) -> Self {
        let mut bullets = ObjectPool::with_reset(Bullet::default, Bullet::reset);
        bullets.preallocate(tuning.pools.clamped().bullets);

        let tracker = Rc::new(RefCell::new(RoundTracker::new(tuning.versus.respawn_delay_ms)));
        let mut bus = EventBus::new();
        bus.subscribe(tracker.clone());

        let mut arena = Self {
            tuning,
            players: [
                Player::new(layout.spawn_point(PlayerSlot::One)),
                Player::new(layout.spawn_point(PlayerSlot::Two)),
            ],
            layout,
            bullets,
            live_bullets: Vec::new(),
            bus,
            tracker,
            match_state: MatchState::InProgress,
            ticks: 0,
        };
        for slot in PlayerSlot::ALL {
            arena.respawn(slot);
        }
        arena
    }

    /// Fresh match: both players respawned, stats and bullets cleared
    pub fn reset(&mut self) {
        for handle in self.live_bullets.drain(..) {
            self.bullets.release(handle);
        }
        self.tracker.borrow_mut().reset();
        self.match_state = MatchState::InProgress;
        self.ticks = 0;
        for slot in PlayerSlot::ALL {
            self.respawn(slot);
        }
        log::info!("Versus match reset");
    }

    pub fn layout(&self) -> &VersusLayout {
        &self.layout
    }

    pub fn player(&self, slot: PlayerSlot) -> &Player {
        &self.players[slot.index()]
    }

    pub fn player_mut(&mut self, slot: PlayerSlot) -> &mut Player {
        &mut self.players[slot.index()]
    }

    pub fn stats(&self, slot: PlayerSlot) -> RoundStats {
        self.tracker.borrow().stats(slot)
    }

    pub fn respawn_timer_ms(&self, slot: PlayerSlot) -> Option<f64> {
        self.tracker.borrow().respawn_timer_ms(slot)
    }

    pub fn match_state(&self) -> MatchState {
        self.match_state
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.match_state.outcome().copied()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn bullets(&self) -> impl Iterator<Item = (BulletHandle, &Bullet)> + '_ {
        self.live_bullets
            .iter()
            .filter_map(|&handle| self.bullets.get(handle).map(|bullet| (handle, bullet)))
    }

    pub fn bullet_pool(&self) -> &ObjectPool<Bullet> {
        &self.bullets
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Advance the duel; does nothing once the match is decided
    pub fn tick(&mut self, inputs: &[PlayerInput; 2], dt: f32, now_ms: f64) -> MatchState {
        let dt = sanitize_dt(dt);
        if dt <= 0.0 || self.match_state.is_over() {
            return self.match_state;
        }
        self.ticks += 1;

        for slot in PlayerSlot::ALL {
            let input = &inputs[slot.index()];
            self.players[slot.index()].apply_input(input);
            if input.shoot {
                self.fire(slot, now_ms);
            }
        }

        for player in &mut self.players {
            physics::integrate_player(player, &self.tuning.kinematics, dt);
            collision::resolve_terrain(player, &self.layout.platforms);
        }

        collision::resolve_versus_bullets(&mut self.bullets, &self.live_bullets, &mut self.players, &mut self.bus);

        for slot in PlayerSlot::ALL {
            let player = &mut self.players[slot.index()];
            let max_x = (self.layout.world_width - player.body.size.x).max(0.0);
            player.body.pos.x = player.body.pos.x.clamp(0.0, max_x);
            if player.body.active && self.is_out_of_bounds(slot) {
                log::debug!("Player {:?} left the world; respawning", slot);
                self.respawn(slot);
            }
        }

        self.advance_bullets(dt);
        self.recycle_bullets();

        let ready = self.tracker.borrow_mut().update(dt);
        for slot in ready {
            self.respawn(slot);
        }

        let stats = self.tracker.borrow().all_stats();
        if let Some(outcome) = self.match_state.evaluate(&stats, self.tuning.versus.win_kills) {
            log::info!(
                "Match over: {:?} wins {}-{}",
                outcome.winner,
                outcome.stats[outcome.winner.index()].kills,
                outcome.stats[outcome.winner.opponent().index()].kills
            );
            self.bus.emit(GameEvent::VersusMatchOver { winner: outcome.winner });
        }
        self.match_state
    }

    fn respawn(&mut self, slot: PlayerSlot) {
        let pos = self.layout.spawn_point(slot);
        self.players[slot.index()].respawn_at(pos, spawn_facing(slot));
    }

    fn is_out_of_bounds(&self, slot: PlayerSlot) -> bool {
        let pos = self.players[slot.index()].body.pos;
        pos.x < -VERSUS_OFFSCREEN_MARGIN
            || pos.x > self.layout.world_width + VERSUS_OFFSCREEN_MARGIN
            || pos.y > self.layout.view_height + OUT_OF_BOUNDS_DEPTH
            || pos.y < -OUT_OF_BOUNDS_DEPTH
    }

    /// Straight shot from just in front of the player's chest
    fn fire(&mut self, slot: PlayerSlot, now_ms: f64) -> bool {
        let player = &mut self.players[slot.index()];
        if !player.body.active || !player.can_shoot(now_ms) {
            return false;
        }

        let direction_x = player.facing.sign();
        let center = player.body.center();
        let pos = Vec2::new(center.x + direction_x * player.body.size.x * 0.45, center.y - 3.0);
        player.mark_shot(now_ms);

        let handle = self.bullets.acquire();
        if let Some(bullet) = self.bullets.get_mut(handle) {
            bullet.fire(FireParams {
                pos,
                direction: Vec2::new(direction_x, 0.0),
                speed: VERSUS_BULLET_SPEED,
                damage: PLAYER_BULLET_DAMAGE,
                owner: BulletOwner::Player(slot),
                lifetime_ms: VERSUS_BULLET_LIFETIME_MS,
            });
        }
        self.live_bullets.push(handle);
        self.bus.emit(GameEvent::BulletFired {
            owner: BulletOwner::Player(slot),
            bullet: handle,
        });
        true
    }

    fn advance_bullets(&mut self, dt: f32) {
        let margin = VERSUS_OFFSCREEN_MARGIN;
        let max_x = self.layout.world_width + margin;
        let max_y = self.layout.view_height + margin;

        for &handle in &self.live_bullets {
            let Some(bullet) = self.bullets.get_mut(handle) else {
                continue;
            };
            bullet.advance(dt);
            let pos = bullet.body.pos;
            if pos.x < -margin || pos.x > max_x || pos.y < -margin || pos.y > max_y {
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
}

impl std::fmt::Debug for VersusArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersusArena")
            .field("match_state", &self.match_state)
            .field("bullets", &self.live_bullets.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}
