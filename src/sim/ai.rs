//! Enemy steering and fire decisions
//!
//! Enemies walk toward the nearest live player along X and shoot once the
//! horizontal gap is within their kind's range.

use super::events::{EventSink, GameEvent};
use super::pool::ObjectPool;
use super::state::{Enemy, EnemyHandle, EnemyKind, Player, PlayerSlot};

/// Below this horizontal gap an enemy stops walking
const STEER_DEAD_ZONE: f32 = 0.001;

/// Horizontal distance within which a kind opens fire
pub fn shoot_range_x(kind: EnemyKind) -> f32 {
    match kind {
        EnemyKind::Grunt => 240.0,
        EnemyKind::Rusher => 200.0,
        EnemyKind::Tank => 280.0,
        EnemyKind::Boss => 360.0,
        EnemyKind::Sniper => 520.0,
    }
}

/// Nearest live player to `from_x`: slot and signed horizontal offset
pub fn nearest_player_on_x(from_x: f32, players: &[Player]) -> Option<(PlayerSlot, f32)> {
    let mut nearest: Option<(PlayerSlot, f32)> = None;
    for (index, player) in players.iter().enumerate() {
        if !player.body.is_live() {
            continue;
        }
        let Some(slot) = PlayerSlot::from_index(index) else {
            continue;
        };
        let dx = player.body.center().x - from_x;
        match nearest {
            Some((_, best)) if best.abs() <= dx.abs() => {}
            _ => nearest = Some((slot, dx)),
        }
    }
    nearest
}

/// Set move intents and pick shooters for this tick
///
/// Returns the enemies that fired, in roster order. Each has already had its
/// cooldown marked at `now_ms`.
pub fn update_enemies(
    enemies: &mut ObjectPool<Enemy>,
    roster: &[EnemyHandle],
    players: &[Player],
    now_ms: f64,
    events: &mut dyn EventSink,
) -> Vec<EnemyHandle> {
    let mut shooters = Vec::new();

    for &handle in roster {
        let Some(enemy) = enemies.get_mut(handle) else {
            continue;
        };
        if !enemy.body.is_live() {
            continue;
        }

        let nearest = nearest_player_on_x(enemy.body.center().x, players);

        let move_intent = match nearest {
            Some((_, dx)) if enemy.kind != EnemyKind::Sniper => {
                if dx > STEER_DEAD_ZONE {
                    1.0
                } else if dx < -STEER_DEAD_ZONE {
                    -1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
        enemy.move_intent = move_intent;
        events.emit(GameEvent::EnemyMoveIntent {
            enemy: handle,
            move_intent,
            target: nearest.map(|(slot, _)| slot),
        });

        let Some((_, dx)) = nearest else {
            continue;
        };
        if !enemy.can_shoot(now_ms) || dx.abs() > shoot_range_x(enemy.kind) {
            continue;
        }

        enemy.mark_shot(now_ms);
        events.emit(GameEvent::EnemyShoot { enemy: handle });
        shooters.push(handle);
    }

    shooters
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn spawn(pool: &mut ObjectPool<Enemy>, kind: EnemyKind, x: f32) -> EnemyHandle {
        let handle = pool.acquire();
        pool.get_mut(handle).unwrap().configure(kind, Vec2::new(x, 0.0));
        handle
    }

    #[test]
    fn test_steers_toward_nearest_player() {
        let mut pool = ObjectPool::new(Enemy::default);
        let grunt = spawn(&mut pool, EnemyKind::Grunt, 500.0);
        let players = [Player::new(Vec2::new(0.0, 0.0)), Player::new(Vec2::new(900.0, 0.0))];
        let mut events = Vec::new();

        update_enemies(&mut pool, &[grunt], &players, 0.0, &mut events);

        assert_eq!(pool.get(grunt).unwrap().move_intent, 1.0);
        assert!(matches!(
            events[0],
            GameEvent::EnemyMoveIntent {
                move_intent: 1.0,
                target: Some(PlayerSlot::Two),
                ..
            }
        ));
    }

    #[test]
    fn test_sniper_holds_position_but_shoots_far() {
        let mut pool = ObjectPool::new(Enemy::default);
        let sniper = spawn(&mut pool, EnemyKind::Sniper, 500.0);
        let players = [Player::new(Vec2::new(0.0, 0.0))];
        let mut events = Vec::new();

        let shooters = update_enemies(&mut pool, &[sniper], &players, 0.0, &mut events);

        assert_eq!(pool.get(sniper).unwrap().move_intent, 0.0);
        assert_eq!(shooters, vec![sniper]);
        assert_eq!(events.last().map(GameEvent::name), Some("enemy_shoot"));
    }

    #[test]
    fn test_range_and_cooldown_gate_fire() {
        let mut pool = ObjectPool::new(Enemy::default);
        let rusher = spawn(&mut pool, EnemyKind::Rusher, 500.0);
        let grunt = spawn(&mut pool, EnemyKind::Grunt, 100.0);
        let players = [Player::new(Vec2::new(0.0, 0.0))];
        let mut events = Vec::new();

        let shooters = update_enemies(&mut pool, &[rusher, grunt], &players, 1000.0, &mut events);
        assert_eq!(shooters, vec![grunt]);

        let shooters = update_enemies(&mut pool, &[rusher, grunt], &players, 1500.0, &mut events);
        assert!(shooters.is_empty());
        let shooters = update_enemies(&mut pool, &[rusher, grunt], &players, 1900.0, &mut events);
        assert_eq!(shooters, vec![grunt]);
    }

    #[test]
    fn test_no_live_players_means_idle() {
        let mut pool = ObjectPool::new(Enemy::default);
        let grunt = spawn(&mut pool, EnemyKind::Grunt, 10.0);
        let mut dead = Player::new(Vec2::ZERO);
        dead.body.active = false;
        let mut events = Vec::new();

        let shooters = update_enemies(&mut pool, &[grunt], &[dead], 0.0, &mut events);

        assert!(shooters.is_empty());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GameEvent::EnemyMoveIntent { target: None, .. }));
    }
}
