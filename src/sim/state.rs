//! Entity types shared by every simulation system
//!
//! Entities are constructed once and reconfigured in place on (re)spawn, so a
//! pooled handle keeps pointing at the same instance across reuse.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pool::Handle;
use crate::consts::*;
use crate::{clamp_intent, non_negative};

pub type EnemyHandle = Handle<Enemy>;
pub type BulletHandle = Handle<Bullet>;

/// Axis-aligned rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Aabb {
    /// Negative or non-finite sizes collapse to zero
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(non_negative(width), non_negative(height)),
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Inclusive overlap test (touching edges count)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.pos.x <= other.pos.x + other.size.x
            && self.pos.x + self.size.x >= other.pos.x
            && self.pos.y <= other.pos.y + other.size.y
            && self.pos.y + self.size.y >= other.pos.y
    }

    /// Whether every component is a usable number
    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.size.is_finite()
    }
}

/// Kinematic state common to every simulated object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    /// False means logically dead / awaiting reuse
    pub active: bool,
}

impl Body {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            size: Vec2::new(non_negative(size.x), non_negative(size.y)),
            active: true,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb {
            pos: self.pos,
            size: self.size,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Deactivate and stop
    pub fn kill(&mut self) {
        self.active = false;
        self.vel = Vec2::ZERO;
    }

    /// Active with finite bounds
    pub fn is_live(&self) -> bool {
        self.active && self.bounds().is_finite()
    }
}

/// Anything that stands on terrain and takes damage
pub trait Actor {
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;
    fn set_grounded(&mut self, grounded: bool);
    fn health(&self) -> f32;
    /// Apply damage and return the remaining health
    fn take_damage(&mut self, amount: f32) -> f32;
}

/// One of the two player seats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::One, PlayerSlot::Two];

    pub fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PlayerSlot::One),
            1 => Some(PlayerSlot::Two),
            _ => None,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }
}

/// Horizontal facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }
}

/// Per-tick player intents, supplied by the input collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// Normalized move axis (-1..1)
    pub move_axis: f32,
    /// Jump edge-trigger
    pub jump: bool,
    /// Shoot (pressed or held)
    pub shoot: bool,
}

/// A human-controlled actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub body: Body,
    pub health: f32,
    pub max_health: f32,
    pub grounded: bool,
    pub facing: Facing,
    pub move_intent: f32,
    pub jump_requested: bool,
    pub shoot_cooldown_ms: f64,
    /// None until the first shot
    pub last_shot_at_ms: Option<f64>,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self::with_size(pos, Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT), PLAYER_HEALTH)
    }

    pub fn with_size(pos: Vec2, size: Vec2, max_health: f32) -> Self {
        let max_health = if max_health.is_finite() { max_health.max(1.0) } else { PLAYER_HEALTH };
        Self {
            body: Body::new(pos, size),
            health: max_health,
            max_health,
            grounded: false,
            facing: Facing::Right,
            move_intent: 0.0,
            jump_requested: false,
            shoot_cooldown_ms: PLAYER_SHOOT_COOLDOWN_MS,
            last_shot_at_ms: None,
        }
    }

    /// Latch this tick's intents; jump requests persist until consumed
    pub fn apply_input(&mut self, input: &PlayerInput) {
        self.move_intent = clamp_intent(input.move_axis);
        if self.move_intent != 0.0 && self.body.active {
            self.facing = if self.move_intent < 0.0 { Facing::Left } else { Facing::Right };
        }
        self.jump_requested |= input.jump;
    }

    pub fn can_shoot(&self, now_ms: f64) -> bool {
        match self.last_shot_at_ms {
            None => true,
            Some(last) => now_ms - last >= self.shoot_cooldown_ms,
        }
    }

    pub fn mark_shot(&mut self, now_ms: f64) {
        if now_ms.is_finite() {
            self.last_shot_at_ms = Some(now_ms);
        }
    }

    pub fn heal(&mut self, amount: f32) -> f32 {
        let healing = non_negative(amount);
        if healing > 0.0 && self.health < self.max_health {
            self.health = (self.health + healing).min(self.max_health);
        }
        self.health
    }

    /// Restore a fresh life at `pos`
    pub fn respawn_at(&mut self, pos: Vec2, facing: Facing) {
        self.body.pos = pos;
        self.body.vel = Vec2::ZERO;
        self.body.active = true;
        self.health = self.max_health;
        self.grounded = false;
        self.move_intent = 0.0;
        self.jump_requested = false;
        self.last_shot_at_ms = None;
        self.facing = facing;
    }
}

impl Actor for Player {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn take_damage(&mut self, amount: f32) -> f32 {
        let damage = non_negative(amount);
        if damage <= 0.0 || self.health <= 0.0 {
            return self.health;
        }
        self.health = (self.health - damage).max(0.0);
        if self.health <= 0.0 {
            self.body.active = false;
        }
        self.health
    }
}

/// Opponent archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyKind {
    #[default]
    Grunt,
    Sniper,
    Rusher,
    Tank,
    Boss,
}

/// Per-kind base stats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    pub hp: f32,
    pub speed: f32,
    pub damage: f32,
    pub fire_cooldown_ms: f64,
    pub size: f32,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 5] = [
        EnemyKind::Grunt,
        EnemyKind::Sniper,
        EnemyKind::Rusher,
        EnemyKind::Tank,
        EnemyKind::Boss,
    ];

    pub fn stats(self) -> EnemyStats {
        let (hp, speed, damage, fire_cooldown_ms, size) = match self {
            EnemyKind::Grunt => (40.0, 120.0, 8.0, 900.0, 24.0),
            EnemyKind::Sniper => (30.0, 80.0, 14.0, 1500.0, 24.0),
            EnemyKind::Rusher => (28.0, 180.0, 6.0, 700.0, 22.0),
            EnemyKind::Tank => (90.0, 60.0, 16.0, 1400.0, 30.0),
            EnemyKind::Boss => (300.0, 75.0, 24.0, 1000.0, 44.0),
        };
        EnemyStats {
            hp,
            speed,
            damage,
            fire_cooldown_ms,
            size,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnemyKind::Grunt => "GRUNT",
            EnemyKind::Sniper => "SNIPER",
            EnemyKind::Rusher => "RUSHER",
            EnemyKind::Tank => "TANK",
            EnemyKind::Boss => "BOSS",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "GRUNT" => Some(EnemyKind::Grunt),
            "SNIPER" => Some(EnemyKind::Sniper),
            "RUSHER" => Some(EnemyKind::Rusher),
            "TANK" => Some(EnemyKind::Tank),
            "BOSS" => Some(EnemyKind::Boss),
            _ => None,
        }
    }

    /// Unknown labels spawn as grunts
    pub fn from_label(label: &str) -> Self {
        Self::parse(label).unwrap_or_default()
    }
}

/// Coarse enemy pose, refreshed every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemyPose {
    #[default]
    Idle,
    Moving,
    Jumping,
    Falling,
    Dead,
}

/// An AI-controlled opponent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub body: Body,
    pub kind: EnemyKind,
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
    pub damage: f32,
    pub fire_cooldown_ms: f64,
    pub last_shot_at_ms: Option<f64>,
    pub move_intent: f32,
    pub grounded: bool,
    pub pose: EnemyPose,
}

impl Default for Enemy {
    /// An inert grunt, ready to be configured
    fn default() -> Self {
        let mut enemy = Self::new(EnemyKind::Grunt, Vec2::ZERO);
        enemy.body.active = false;
        enemy
    }
}

impl Enemy {
    pub fn new(kind: EnemyKind, pos: Vec2) -> Self {
        let mut enemy = Self {
            body: Body::new(pos, Vec2::ZERO),
            kind,
            health: 1.0,
            max_health: 1.0,
            speed: 0.0,
            damage: 0.0,
            fire_cooldown_ms: 1000.0,
            last_shot_at_ms: None,
            move_intent: 0.0,
            grounded: false,
            pose: EnemyPose::Idle,
        };
        enemy.configure(kind, pos);
        enemy
    }

    /// Reconfigure in place for a fresh spawn
    pub fn configure(&mut self, kind: EnemyKind, pos: Vec2) -> &mut Self {
        let stats = kind.stats();
        let pos = if pos.is_finite() { pos } else { Vec2::ZERO };
        self.kind = kind;
        self.max_health = stats.hp;
        self.health = stats.hp;
        self.speed = stats.speed;
        self.damage = stats.damage;
        self.fire_cooldown_ms = stats.fire_cooldown_ms;
        self.last_shot_at_ms = None;
        self.pose = EnemyPose::Idle;
        self.body = Body::new(pos, Vec2::splat(stats.size));
        self.move_intent = 0.0;
        self.grounded = false;
        self
    }

    pub fn can_shoot(&self, now_ms: f64) -> bool {
        if !now_ms.is_finite() {
            return false;
        }
        match self.last_shot_at_ms {
            None => true,
            Some(last) => now_ms - last >= self.fire_cooldown_ms,
        }
    }

    pub fn mark_shot(&mut self, now_ms: f64) {
        if now_ms.is_finite() {
            self.last_shot_at_ms = Some(now_ms);
        }
    }

    pub fn update_pose(&mut self) {
        if !self.body.active {
            return;
        }
        let vel = self.body.vel;
        self.pose = if vel.y.abs() > f32::EPSILON {
            if vel.y < 0.0 { EnemyPose::Jumping } else { EnemyPose::Falling }
        } else if vel.x.abs() > f32::EPSILON {
            EnemyPose::Moving
        } else {
            EnemyPose::Idle
        };
    }
}

impl Actor for Enemy {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn take_damage(&mut self, amount: f32) -> f32 {
        if !self.body.active {
            return self.health;
        }
        self.health = (self.health - non_negative(amount)).max(0.0);
        if self.health <= 0.0 {
            self.body.kill();
            self.pose = EnemyPose::Dead;
        }
        self.health
    }
}

/// Who fired a bullet; decides which faction it can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulletOwner {
    #[default]
    Unowned,
    Player(PlayerSlot),
    Enemy(EnemyHandle),
}

impl BulletOwner {
    pub fn is_player(&self) -> bool {
        matches!(self, BulletOwner::Player(_))
    }
}

/// Launch parameters for `Bullet::fire`
#[derive(Debug, Clone, Copy)]
pub struct FireParams {
    pub pos: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub owner: BulletOwner,
    pub lifetime_ms: f32,
}

/// A straight-line projectile
#[derive(Debug, Clone)]
pub struct Bullet {
    pub body: Body,
    pub direction: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub owner: BulletOwner,
    pub previous_pos: Vec2,
    /// Latched once a near miss has been credited
    pub dodge_counted: bool,
    pub lifetime_ms: f32,
    pub age_ms: f32,
}

impl Default for Bullet {
    fn default() -> Self {
        let mut body = Body::new(Vec2::ZERO, Vec2::splat(BULLET_SIZE));
        body.active = false;
        Self {
            body,
            direction: Vec2::X,
            speed: 0.0,
            damage: 0.0,
            owner: BulletOwner::Unowned,
            previous_pos: Vec2::ZERO,
            dodge_counted: false,
            lifetime_ms: BULLET_DEFAULT_LIFETIME_MS,
            age_ms: 0.0,
        }
    }
}

impl Bullet {
    pub fn fire(&mut self, params: FireParams) {
        let direction = if params.direction.is_finite() {
            params.direction.normalize_or_zero()
        } else {
            Vec2::ZERO
        };
        self.direction = if direction == Vec2::ZERO { Vec2::X } else { direction };

        let pos = if params.pos.is_finite() { params.pos } else { Vec2::ZERO };
        self.body.pos = pos;
        self.previous_pos = pos;
        self.speed = non_negative(params.speed);
        self.damage = if params.damage.is_finite() { params.damage } else { 0.0 };
        self.owner = params.owner;
        self.lifetime_ms = if params.lifetime_ms.is_finite() && params.lifetime_ms > 0.0 {
            params.lifetime_ms
        } else {
            BULLET_DEFAULT_LIFETIME_MS
        };
        self.age_ms = 0.0;
        self.dodge_counted = false;
        self.body.vel = self.direction * self.speed;
        self.body.active = true;
    }

    /// Straight-line motion; expires once its lifetime elapses
    pub fn advance(&mut self, dt: f32) {
        if !self.body.active {
            return;
        }
        let dt = crate::sanitize_dt(dt);
        // A zero step keeps the last segment for the crossing test
        if dt <= 0.0 {
            return;
        }

        self.previous_pos = self.body.pos;
        self.body.pos += self.body.vel * dt;
        self.age_ms += dt * 1000.0;
        if self.age_ms >= self.lifetime_ms {
            self.body.kill();
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Static terrain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub rect: Aabb,
    pub active: bool,
}

impl Platform {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            rect: Aabb::new(x, y, width, height),
            active: true,
        }
    }
}
