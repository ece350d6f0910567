//! Kinematics integrator
//!
//! Players accelerate toward a target speed and decay by friction; enemies
//! move at a flat per-kind speed. Bullets are not integrated here.

use serde::{Deserialize, Serialize};

use super::pool::ObjectPool;
use super::state::{Enemy, EnemyHandle, Player};
use crate::consts::*;
use crate::{clamp_intent, non_negative, sanitize_dt};

/// Player/enemy motion constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsTuning {
    pub gravity: f32,
    pub max_speed: f32,
    pub acceleration: f32,
    pub friction: f32,
    pub jump_speed: f32,
}

impl Default for KinematicsTuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            max_speed: PLAYER_MAX_SPEED,
            acceleration: PLAYER_ACCELERATION,
            friction: PLAYER_FRICTION,
            jump_speed: PLAYER_JUMP_SPEED,
        }
    }
}

#[inline]
pub fn apply_gravity(vy: f32, gravity: f32, dt: f32) -> f32 {
    vy + gravity * dt
}

/// Reduce speed magnitude by `friction * dt`, stopping at zero
#[inline]
pub fn apply_friction(vx: f32, friction: f32, dt: f32) -> f32 {
    let magnitude = (vx.abs() - friction * dt).max(0.0);
    if vx > 0.0 {
        magnitude
    } else if vx < 0.0 {
        -magnitude
    } else {
        0.0
    }
}

/// Advance one player by `dt` seconds
pub fn integrate_player(player: &mut Player, tuning: &KinematicsTuning, dt: f32) {
    let dt = sanitize_dt(dt);
    if dt <= 0.0 || !player.body.active {
        return;
    }

    let body = &mut player.body;
    let move_intent = clamp_intent(player.move_intent);
    if move_intent != 0.0 {
        let accelerated = body.vel.x + move_intent * tuning.acceleration * dt;
        body.vel.x = accelerated.clamp(-tuning.max_speed, tuning.max_speed);
    } else {
        body.vel.x = apply_friction(body.vel.x, tuning.friction, dt);
    }
    player.move_intent = 0.0;

    if player.jump_requested && player.grounded {
        body.vel.y = -tuning.jump_speed;
        player.grounded = false;
    }
    player.jump_requested = false;

    if !player.grounded {
        body.vel.y = apply_gravity(body.vel.y, tuning.gravity, dt);
    }

    body.pos += body.vel * dt;
}

/// Advance one enemy: flat horizontal speed, gravity always applied
pub fn integrate_enemy(enemy: &mut Enemy, gravity: f32, dt: f32) {
    let dt = sanitize_dt(dt);
    if dt <= 0.0 || !enemy.body.active {
        return;
    }

    let move_intent = clamp_intent(enemy.move_intent);
    enemy.body.vel.x = move_intent * non_negative(enemy.speed);
    enemy.move_intent = 0.0;

    enemy.body.vel.y = apply_gravity(enemy.body.vel.y, gravity, dt);
    enemy.body.pos += enemy.body.vel * dt;
}

/// Integrate every active player and rostered enemy
pub fn step_kinematics(
    players: &mut [Player],
    enemies: &mut ObjectPool<Enemy>,
    roster: &[EnemyHandle],
    tuning: &KinematicsTuning,
    dt: f32,
) {
    if sanitize_dt(dt) <= 0.0 {
        return;
    }

    for player in players.iter_mut() {
        integrate_player(player, tuning, dt);
    }
    for &handle in roster {
        if let Some(enemy) = enemies.get_mut(handle) {
            integrate_enemy(enemy, tuning.gravity, dt);
        }
    }
}
