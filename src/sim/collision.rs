//! Collision detection and response
//!
//! Two passes per tick, in order: actors are pushed out of terrain along the
//! axis of least penetration, then bullets are resolved against the opposing
//! faction. Bullets that miss are checked for near misses.

use glam::Vec2;

use super::events::{EventSink, GameEvent, HitSource, HitTarget};
use super::pool::ObjectPool;
use super::state::{
    Aabb, Actor, Body, Bullet, BulletHandle, BulletOwner, Enemy, EnemyHandle, Platform, Player,
    PlayerSlot,
};
use crate::non_negative;

/// Depth below which a top-face overlap is resting contact, not penetration
pub const CONTACT_EPSILON: f32 = 0.01;
/// Depth a landed actor is left embedded so the next tick still sees contact
pub const RESTING_DEPTH: f32 = CONTACT_EPSILON * 0.5;

/// Center offset and per-axis overlap between two boxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// `a.center - b.center`
    pub delta: Vec2,
    /// Half combined extent minus center distance; positive means overlapping
    pub overlap: Vec2,
}

/// Axis an actor was pushed out along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAxis {
    X,
    Y,
}

#[inline]
pub fn aabb_overlap(a: &Aabb, b: &Aabb) -> bool {
    a.overlaps(b)
}

pub fn penetration(a: &Aabb, b: &Aabb) -> Penetration {
    let delta = a.center() - b.center();
    let half_combined = (a.size + b.size) * 0.5;
    Penetration {
        delta,
        overlap: half_combined - delta.abs(),
    }
}

/// Push `actor` out of one platform
///
/// Returns the axis used and whether the actor ended up standing on top.
/// An actor resting on a top face (overlap in `0..=CONTACT_EPSILON`) is not
/// moved but still counts as standing. Any gap, however small, is no contact.
pub fn push_out<A: Actor>(actor: &mut A, platform: &Platform) -> Option<(PushAxis, bool)> {
    let bounds = actor.body().bounds();
    let pen = penetration(&bounds, &platform.rect);
    if !(pen.overlap.x > 0.0) || !(pen.overlap.y >= 0.0) {
        return None;
    }

    let body = actor.body_mut();
    if pen.overlap.y <= CONTACT_EPSILON {
        if pen.delta.y < 0.0 && body.vel.y >= 0.0 {
            body.vel.y = 0.0;
            return Some((PushAxis::Y, true));
        }
        return None;
    }

    if pen.overlap.x < pen.overlap.y {
        body.pos.x += if pen.delta.x < 0.0 { -pen.overlap.x } else { pen.overlap.x };
        body.vel.x = 0.0;
        return Some((PushAxis::X, false));
    }

    body.vel.y = 0.0;
    // Actor center above platform center: landed on top
    if pen.delta.y < 0.0 {
        body.pos.y -= pen.overlap.y - RESTING_DEPTH;
        return Some((PushAxis::Y, true));
    }
    body.pos.y += pen.overlap.y;
    Some((PushAxis::Y, false))
}

/// Resolve one actor against every active platform and set its grounded flag
pub fn resolve_terrain<A: Actor>(actor: &mut A, platforms: &[Platform]) {
    if !actor.body().is_live() {
        return;
    }

    let mut grounded = false;
    for platform in platforms {
        if !platform.active || !platform.rect.is_finite() {
            continue;
        }
        if let Some((PushAxis::Y, true)) = push_out(actor, platform) {
            grounded = true;
        }
    }
    actor.set_grounded(grounded);
}

/// Terrain pass for players first, then rostered enemies
pub fn resolve_all_terrain(
    players: &mut [Player],
    enemies: &mut ObjectPool<Enemy>,
    roster: &[EnemyHandle],
    platforms: &[Platform],
) {
    for player in players.iter_mut() {
        resolve_terrain(player, platforms);
    }
    for &handle in roster {
        if let Some(enemy) = enemies.get_mut(handle) {
            resolve_terrain(enemy, platforms);
        }
    }
}

/// Apply bullet damage; returns whether the hit killed a previously live target
fn strike<A: Actor>(target: &mut A, damage: f32) -> bool {
    let before = target.health();
    let was_active = target.body().active;
    target.take_damage(damage);
    let after = target.health();
    let fatal = !target.body().active || (before > 0.0 && after <= 0.0);
    was_active && fatal
}

/// Near-miss predicate: the bullet's x crossed the target's center line this
/// tick while staying inside the vertical window
pub fn is_near_miss(bullet: &Bullet, target: &Body) -> bool {
    let target_center = target.center();
    let previous_x = if bullet.previous_pos.x.is_finite() {
        bullet.previous_pos.x
    } else {
        bullet.body.pos.x
    };
    let current_x = bullet.body.pos.x;

    let crossed = (previous_x <= target_center.x && current_x >= target_center.x)
        || (previous_x >= target_center.x && current_x <= target_center.x);
    if !crossed {
        return false;
    }

    let window = target.size.y * 0.65 + bullet.body.size.y * 1.5;
    (bullet.body.center().y - target_center.y).abs() <= window
}

/// Single-player bullet pass: player bullets hit enemies, all others hit the player
pub fn resolve_solo_bullets(
    bullets: &mut ObjectPool<Bullet>,
    live: &[BulletHandle],
    player: &mut Player,
    enemies: &mut ObjectPool<Enemy>,
    roster: &[EnemyHandle],
    events: &mut dyn EventSink,
) {
    for &bullet_handle in live {
        let Some(bullet) = bullets.get_mut(bullet_handle) else {
            continue;
        };
        if !bullet.body.is_live() {
            continue;
        }

        let damage = non_negative(bullet.damage);
        let bounds = bullet.body.bounds();

        if bullet.owner.is_player() {
            for &enemy_handle in roster {
                let Some(enemy) = enemies.get_mut(enemy_handle) else {
                    continue;
                };
                if !enemy.body.is_live() || !bounds.overlaps(&enemy.body.bounds()) {
                    continue;
                }

                let killed = strike(enemy, damage);
                bullet.body.kill();
                events.emit(GameEvent::BulletHit {
                    bullet: bullet_handle,
                    target: HitTarget::Enemy(enemy_handle),
                    shooter: None,
                    damage,
                });
                if killed {
                    events.emit(GameEvent::EnemyKilled {
                        enemy: enemy_handle,
                        kind: enemy.kind,
                        bullet: bullet_handle,
                    });
                }
                break;
            }
            continue;
        }

        if !player.body.is_live() {
            continue;
        }

        if bounds.overlaps(&player.body.bounds()) {
            let is_fatal = strike(player, damage);
            bullet.body.kill();
            events.emit(GameEvent::BulletHit {
                bullet: bullet_handle,
                target: HitTarget::Player(PlayerSlot::One),
                shooter: None,
                damage,
            });
            events.emit(GameEvent::PlayerHit {
                player: PlayerSlot::One,
                source: HitSource::Bullet(bullet_handle),
                damage,
                is_fatal,
            });
            continue;
        }

        if !bullet.dodge_counted && is_near_miss(bullet, &player.body) {
            bullet.dodge_counted = true;
            events.emit(GameEvent::BulletDodged {
                bullet: bullet_handle,
                player: PlayerSlot::One,
            });
        }
    }
}

/// Two-player bullet pass: each bullet can only hit its owner's opponent
pub fn resolve_versus_bullets(
    bullets: &mut ObjectPool<Bullet>,
    live: &[BulletHandle],
    players: &mut [Player; 2],
    events: &mut dyn EventSink,
) {
    for &bullet_handle in live {
        let Some(bullet) = bullets.get_mut(bullet_handle) else {
            continue;
        };
        if !bullet.body.is_live() {
            continue;
        }
        let BulletOwner::Player(shooter) = bullet.owner else {
            continue;
        };

        let target_slot = shooter.opponent();
        let target = &mut players[target_slot.index()];
        if !target.body.is_live() {
            continue;
        }

        if bullet.body.bounds().overlaps(&target.body.bounds()) {
            let damage = non_negative(bullet.damage);
            let is_fatal = strike(target, damage);
            bullet.body.kill();

            events.emit(GameEvent::BulletHit {
                bullet: bullet_handle,
                target: HitTarget::Player(target_slot),
                shooter: Some(shooter),
                damage,
            });
            events.emit(GameEvent::VersusPlayerHit {
                bullet: bullet_handle,
                shooter,
                target: target_slot,
                damage,
                is_fatal,
            });
            if is_fatal {
                events.emit(GameEvent::VersusKill {
                    bullet: bullet_handle,
                    killer: shooter,
                    victim: target_slot,
                    damage,
                });
            }
            continue;
        }

        if !bullet.dodge_counted && is_near_miss(bullet, &target.body) {
            bullet.dodge_counted = true;
            events.emit(GameEvent::VersusDodge {
                bullet: bullet_handle,
                shooter,
                dodger: target_slot,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{EnemyKind, FireParams};

    fn ground() -> Platform {
        Platform::new(0.0, 100.0, 500.0, 20.0)
    }

    fn fire(
        pool: &mut ObjectPool<Bullet>,
        pos: Vec2,
        direction: Vec2,
        owner: BulletOwner,
    ) -> BulletHandle {
        let handle = pool.acquire();
        pool.get_mut(handle).unwrap().fire(FireParams {
            pos,
            direction,
            speed: 400.0,
            damage: 25.0,
            owner,
            lifetime_ms: 2000.0,
        });
        handle
    }

    #[test]
    fn test_landing_on_platform_grounds_actor() {
        let mut player = Player::new(Vec2::new(50.0, 62.0)); // bottom at 102
        player.body.vel = Vec2::new(30.0, 200.0);

        resolve_terrain(&mut player, &[ground()]);

        assert!(player.grounded);
        assert_eq!(player.body.vel.y, 0.0);
        assert_eq!(player.body.vel.x, 30.0);
        assert!((player.body.pos.y - (60.0 + RESTING_DEPTH)).abs() < 0.001);

        // Resting contact holds without moving the actor again
        let rest = player.body.pos;
        resolve_terrain(&mut player, &[ground()]);
        assert!(player.grounded);
        assert_eq!(player.body.pos, rest);
    }

    #[test]
    fn test_hairline_gap_is_not_contact() {
        // Bottom at 99.995, platform top at 100
        let mut player = Player::new(Vec2::new(50.0, 59.995));
        player.grounded = true;
        resolve_terrain(&mut player, &[ground()]);
        assert!(!player.grounded);
        assert_eq!(player.body.pos.y, 59.995);
    }

    #[test]
    fn test_touching_nothing_clears_grounded() {
        let mut player = Player::new(Vec2::new(50.0, 0.0));
        player.grounded = true;
        resolve_terrain(&mut player, &[ground()]);
        assert!(!player.grounded);
    }

    #[test]
    fn test_side_penetration_resolves_on_x() {
        let wall = Platform::new(100.0, 0.0, 20.0, 200.0);
        let mut player = Player::new(Vec2::new(75.0, 80.0)); // right edge at 103
        player.body.vel = Vec2::new(200.0, 50.0);

        resolve_terrain(&mut player, &[wall]);

        assert!((player.body.pos.x - 72.0).abs() < 0.001);
        assert_eq!(player.body.vel.x, 0.0);
        assert_eq!(player.body.vel.y, 50.0);
        assert!(!player.grounded);
    }

    #[test]
    fn test_ceiling_hit_does_not_ground() {
        let ceiling = Platform::new(0.0, 0.0, 500.0, 20.0);
        let mut player = Player::new(Vec2::new(50.0, 18.0));
        player.body.vel.y = -300.0;
        resolve_terrain(&mut player, &[ceiling]);
        assert_eq!(player.body.vel.y, 0.0);
        assert!(!player.grounded);
        assert!((player.body.pos.y - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_inactive_platform_ignored_and_multiple_resolved() {
        let mut disabled = ground();
        disabled.active = false;
        let mut player = Player::new(Vec2::new(50.0, 62.0));
        resolve_terrain(&mut player, &[disabled]);
        assert!(!player.grounded);

        let wall = Platform::new(76.0, 0.0, 20.0, 99.0);
        let mut player = Player::new(Vec2::new(50.0, 62.0));
        resolve_terrain(&mut player, &[ground(), wall]);
        assert!(player.grounded);
        assert!(player.body.pos.x + player.body.size.x <= 76.0 + 0.001);
    }

    #[test]
    fn test_player_bullet_kills_first_enemy_only() {
        let mut bullets = ObjectPool::new(Bullet::default);
        let mut enemies = ObjectPool::new(Enemy::default);
        let first = enemies.acquire();
        let second = enemies.acquire();
        for handle in [first, second] {
            enemies
                .get_mut(handle)
                .unwrap()
                .configure(EnemyKind::Rusher, Vec2::new(100.0, 100.0));
        }
        let shot = fire(&mut bullets, Vec2::new(105.0, 105.0), Vec2::X, BulletOwner::Player(PlayerSlot::One));
        bullets.get_mut(shot).unwrap().damage = 50.0;
        let mut player = Player::new(Vec2::new(400.0, 0.0));
        let mut events = Vec::new();

        resolve_solo_bullets(&mut bullets, &[shot], &mut player, &mut enemies, &[first, second], &mut events);

        assert!(!enemies.get(first).unwrap().body.active);
        assert!(enemies.get(second).unwrap().body.active);
        assert!(!bullets.get(shot).unwrap().body.active);
        let names: Vec<_> = events.iter().map(GameEvent::name).collect();
        assert_eq!(names, vec!["bullet_hit", "enemy_killed"]);
    }

    #[test]
    fn test_non_lethal_hit_emits_no_kill() {
        let mut bullets = ObjectPool::new(Bullet::default);
        let mut enemies = ObjectPool::new(Enemy::default);
        let tank = enemies.acquire();
        enemies.get_mut(tank).unwrap().configure(EnemyKind::Tank, Vec2::new(100.0, 100.0));
        let shot = fire(&mut bullets, Vec2::new(105.0, 105.0), Vec2::X, BulletOwner::Player(PlayerSlot::One));
        let mut player = Player::new(Vec2::new(400.0, 0.0));
        let mut events = Vec::new();

        resolve_solo_bullets(&mut bullets, &[shot], &mut player, &mut enemies, &[tank], &mut events);

        assert_eq!(enemies.get(tank).unwrap().health, 65.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "bullet_hit");
    }

    #[test]
    fn test_enemy_bullet_hits_player_with_fatal_flag() {
        let mut bullets = ObjectPool::new(Bullet::default);
        let mut enemies = ObjectPool::new(Enemy::default);
        let shooter = enemies.acquire();
        let mut player = Player::new(Vec2::new(100.0, 100.0));
        player.health = 20.0;
        let shot = fire(&mut bullets, Vec2::new(110.0, 110.0), Vec2::X, BulletOwner::Enemy(shooter));
        let mut events = Vec::new();

        resolve_solo_bullets(&mut bullets, &[shot], &mut player, &mut enemies, &[], &mut events);

        assert!(!player.body.active);
        assert!(matches!(
            events.last(),
            Some(GameEvent::PlayerHit {
                is_fatal: true,
                player: PlayerSlot::One,
                ..
            })
        ));
    }

    #[test]
    fn test_dodge_credited_exactly_once() {
        let mut bullets = ObjectPool::new(Bullet::default);
        let mut enemies = ObjectPool::new(Enemy::default);
        let shooter = enemies.acquire();
        // Player spans y 100..140, center x 114
        let mut player = Player::new(Vec2::new(100.0, 100.0));
        // Bullet passes just above the player's head
        let shot = fire(&mut bullets, Vec2::new(150.0, 90.0), Vec2::NEG_X, BulletOwner::Enemy(shooter));
        let mut events = Vec::new();

        let mut reversed = false;
        for _ in 0..30 {
            bullets.get_mut(shot).unwrap().advance(1.0 / 60.0);
            resolve_solo_bullets(&mut bullets, &[shot], &mut player, &mut enemies, &[], &mut events);
            // Send it back across the center line once it has been credited
            let bullet = bullets.get_mut(shot).unwrap();
            if bullet.dodge_counted && !reversed && bullet.body.pos.x < 90.0 {
                bullet.body.vel = -bullet.body.vel;
                reversed = true;
            }
        }
        assert!(reversed);
        assert!(bullets.get(shot).unwrap().body.pos.x > 114.0);

        let dodges = events.iter().filter(|e| e.name() == "bullet_dodged").count();
        assert_eq!(dodges, 1);
        assert!(player.body.active);
    }

    #[test]
    fn test_parallel_bullet_never_dodges() {
        let mut bullet = Bullet::default();
        bullet.fire(FireParams {
            pos: Vec2::new(100.0, 50.0),
            direction: Vec2::Y,
            speed: 100.0,
            damage: 1.0,
            owner: BulletOwner::Unowned,
            lifetime_ms: 5000.0,
        });
        let target = Body::new(Vec2::new(150.0, 50.0), Vec2::new(28.0, 40.0));
        for _ in 0..30 {
            bullet.advance(1.0 / 60.0);
            assert!(!is_near_miss(&bullet, &target));
        }
    }

    #[test]
    fn test_far_crossing_is_not_a_dodge() {
        let mut bullet = Bullet::default();
        bullet.body.size = Vec2::splat(6.0);
        bullet.previous_pos = Vec2::new(120.0, 0.0);
        bullet.body.pos = Vec2::new(108.0, 0.0);
        let target = Body::new(Vec2::new(100.0, 100.0), Vec2::new(28.0, 40.0));
        // Window = 40 * 0.65 + 6 * 1.5 = 35; distance = 120 - 3 = 117
        assert!(!is_near_miss(&bullet, &target));
        bullet.body.pos.y = 95.0;
        bullet.previous_pos.y = 95.0;
        assert!(is_near_miss(&bullet, &target));
    }

    #[test]
    fn test_versus_bullet_only_hits_opponent() {
        let mut bullets = ObjectPool::new(Bullet::default);
        let mut players = [
            Player::new(Vec2::new(100.0, 100.0)),
            Player::new(Vec2::new(100.0, 100.0)),
        ];
        let own = fire(&mut bullets, Vec2::new(110.0, 110.0), Vec2::X, BulletOwner::Player(PlayerSlot::One));
        let stray = fire(&mut bullets, Vec2::new(110.0, 110.0), Vec2::X, BulletOwner::Unowned);
        let mut events = Vec::new();

        resolve_versus_bullets(&mut bullets, &[own, stray], &mut players, &mut events);

        assert_eq!(players[0].health, 100.0);
        assert_eq!(players[1].health, 75.0);
        assert!(bullets.get(stray).unwrap().body.active);
        let names: Vec<_> = events.iter().map(GameEvent::name).collect();
        assert_eq!(names, vec!["bullet_hit", "versus:player_hit"]);
    }

    #[test]
    fn test_versus_fatal_hit_emits_kill() {
        let mut bullets = ObjectPool::new(Bullet::default);
        let mut players = [
            Player::new(Vec2::new(100.0, 100.0)),
            Player::new(Vec2::new(300.0, 100.0)),
        ];
        players[0].health = 10.0;
        let shot = fire(&mut bullets, Vec2::new(110.0, 110.0), Vec2::NEG_X, BulletOwner::Player(PlayerSlot::Two));
        let mut events = Vec::new();

        resolve_versus_bullets(&mut bullets, &[shot], &mut players, &mut events);

        assert!(matches!(
            events.last(),
            Some(GameEvent::VersusKill {
                killer: PlayerSlot::Two,
                victim: PlayerSlot::One,
                ..
            })
        ));
        assert!(events.iter().any(|e| matches!(e, GameEvent::VersusPlayerHit { is_fatal: true, .. })));
    }
}
