//! Typed domain events and a synchronous dispatcher
//!
//! Systems write events into an `EventSink`. The `EventBus` sink delivers each
//! event to every subscriber immediately, in subscription order. A listener
//! that fails is logged and recorded; the remaining listeners still run.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use thiserror::Error;

use super::state::{BulletHandle, BulletOwner, EnemyHandle, EnemyKind, PlayerSlot};

/// What a bullet struck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Player(PlayerSlot),
    Enemy(EnemyHandle),
}

/// Cause of player damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitSource {
    Bullet(BulletHandle),
    /// Fell out of the world
    Fall,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    EnemyMoveIntent {
        enemy: EnemyHandle,
        move_intent: f32,
        target: Option<PlayerSlot>,
    },
    EnemyShoot {
        enemy: EnemyHandle,
    },
    BulletFired {
        owner: BulletOwner,
        bullet: BulletHandle,
    },
    WaveStart {
        wave: u32,
        total_enemies: usize,
    },
    EnemySpawned {
        wave: u32,
        enemy: EnemyHandle,
        kind: EnemyKind,
        pos: Vec2,
    },
    WaveCleared {
        wave: u32,
        spawned: u32,
    },
    BulletHit {
        bullet: BulletHandle,
        target: HitTarget,
        /// Set in versus mode
        shooter: Option<PlayerSlot>,
        damage: f32,
    },
    EnemyKilled {
        enemy: EnemyHandle,
        kind: EnemyKind,
        bullet: BulletHandle,
    },
    PlayerHit {
        player: PlayerSlot,
        source: HitSource,
        damage: f32,
        is_fatal: bool,
    },
    BulletDodged {
        bullet: BulletHandle,
        player: PlayerSlot,
    },
    VersusPlayerHit {
        bullet: BulletHandle,
        shooter: PlayerSlot,
        target: PlayerSlot,
        damage: f32,
        is_fatal: bool,
    },
    VersusKill {
        bullet: BulletHandle,
        killer: PlayerSlot,
        victim: PlayerSlot,
        damage: f32,
    },
    VersusDodge {
        bullet: BulletHandle,
        shooter: PlayerSlot,
        dodger: PlayerSlot,
    },
    VersusMatchOver {
        winner: PlayerSlot,
    },
}

impl GameEvent {
    /// Wire name consumed by audio/HUD collaborators
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::EnemyMoveIntent { .. } => "enemy_move_intent",
            GameEvent::EnemyShoot { .. } => "enemy_shoot",
            GameEvent::BulletFired { .. } => "bullet_fired",
            GameEvent::WaveStart { .. } => "wave_start",
            GameEvent::EnemySpawned { .. } => "enemy_spawned",
            GameEvent::WaveCleared { .. } => "wave_cleared",
            GameEvent::BulletHit { .. } => "bullet_hit",
            GameEvent::EnemyKilled { .. } => "enemy_killed",
            GameEvent::PlayerHit { .. } => "player_hit",
            GameEvent::BulletDodged { .. } => "bullet_dodged",
            GameEvent::VersusPlayerHit { .. } => "versus:player_hit",
            GameEvent::VersusKill { .. } => "versus:kill",
            GameEvent::VersusDodge { .. } => "versus:dodge",
            GameEvent::VersusMatchOver { .. } => "versus:match_over",
        }
    }

    /// Whether a hit event killed its target
    pub fn is_fatal(&self) -> bool {
        match self {
            GameEvent::PlayerHit { is_fatal, .. } | GameEvent::VersusPlayerHit { is_fatal, .. } => {
                *is_fatal
            }
            GameEvent::VersusKill { .. } => true,
            _ => false,
        }
    }
}

/// Destination for emitted events
pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

/// Drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: GameEvent) {}
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ListenerError {
    #[error("listener rejected {event}: {reason}")]
    Rejected { event: &'static str, reason: String },
    /// The listener's state was already borrowed when the event arrived
    #[error("listener busy during {event}")]
    Busy { event: &'static str },
}

/// Subscriber interface
///
/// Failures are reported by returning `Err`. A panicking listener is not
/// caught and unwinds through `EventBus::dispatch`.
pub trait EventListener {
    fn on_event(&mut self, event: &GameEvent) -> Result<(), ListenerError>;
}

/// A listener call that returned an error
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerFailure {
    pub subscription: SubscriptionId,
    pub event: &'static str,
    pub error: ListenerError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u32);

type Callback = Box<dyn FnMut(&GameEvent) -> Result<(), ListenerError>>;

struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

/// Synchronous in-order dispatcher
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u32,
    failures: Vec<ListenerFailure>,
    emitted: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared listener; the caller keeps its own `Rc` to read state
    ///
    /// Events that arrive while the listener is already borrowed are skipped
    /// for it and recorded as `ListenerError::Busy`.
    pub fn subscribe<L: EventListener + 'static>(&mut self, listener: Rc<RefCell<L>>) -> SubscriptionId {
        self.subscribe_fn(move |event| match listener.try_borrow_mut() {
            Ok(mut listener) => listener.on_event(event),
            Err(_) => Err(ListenerError::Busy { event: event.name() }),
        })
    }

    pub fn subscribe_fn(
        &mut self,
        callback: impl FnMut(&GameEvent) -> Result<(), ListenerError> + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            callback: Box::new(callback),
        });
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Total events dispatched since creation
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Drain recorded listener failures
    pub fn take_failures(&mut self) -> Vec<ListenerFailure> {
        std::mem::take(&mut self.failures)
    }

    pub fn dispatch(&mut self, event: &GameEvent) {
        self.emitted += 1;
        for subscriber in &mut self.subscribers {
            if let Err(error) = (subscriber.callback)(event) {
                log::warn!("Event listener failed on {}: {}", event.name(), error);
                self.failures.push(ListenerFailure {
                    subscription: subscriber.id,
                    event: event.name(),
                    error,
                });
            }
        }
    }
}

impl EventSink for EventBus {
    fn emit(&mut self, event: GameEvent) {
        self.dispatch(&event);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscribers.len())
            .field("emitted", &self.emitted)
            .field("failures", &self.failures.len())
            .finish()
    }
}

/// Listener that keeps a copy of every event (HUD feeds, tests)
#[derive(Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<GameEvent>,
}

impl EventRecorder {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(GameEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventListener for EventRecorder {
    fn on_event(&mut self, event: &GameEvent) -> Result<(), ListenerError> {
        self.events.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave_start(wave: u32) -> GameEvent {
        GameEvent::WaveStart {
            wave,
            total_enemies: 3,
        }
    }

    #[test]
    fn test_dispatch_in_subscription_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in 0..3 {
            let order = order.clone();
            bus.subscribe_fn(move |_| {
                order.borrow_mut().push(tag);
                Ok(())
            });
        }
        bus.emit(wave_start(1));
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let recorder = Rc::new(RefCell::new(EventRecorder::default()));
        let mut bus = EventBus::new();
        let failing = bus.subscribe_fn(|event| {
            Err(ListenerError::Rejected {
                event: event.name(),
                reason: "boom".into(),
            })
        });
        bus.subscribe(recorder.clone());

        bus.emit(wave_start(2));

        assert_eq!(recorder.borrow().events.len(), 1);
        let failures = bus.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].subscription, failing);
        assert_eq!(failures[0].event, "wave_start");
        assert!(bus.take_failures().is_empty());
    }

    #[test]
    fn test_borrowed_listener_is_skipped_not_fatal() {
        let held = Rc::new(RefCell::new(EventRecorder::default()));
        let later = Rc::new(RefCell::new(EventRecorder::default()));
        let mut bus = EventBus::new();
        let held_id = bus.subscribe(held.clone());
        bus.subscribe(later.clone());

        {
            let _guard = held.borrow_mut();
            bus.emit(wave_start(1));
        }
        bus.emit(wave_start(2));

        assert_eq!(later.borrow().events.len(), 2);
        assert_eq!(held.borrow().events, vec![wave_start(2)]);
        let failures = bus.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].subscription, held_id);
        assert_eq!(failures[0].error, ListenerError::Busy { event: "wave_start" });
    }

    #[test]
    fn test_unsubscribe() {
        let recorder = Rc::new(RefCell::new(EventRecorder::default()));
        let mut bus = EventBus::new();
        let id = bus.subscribe(recorder.clone());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(wave_start(1));
        assert!(recorder.borrow().events.is_empty());
        assert_eq!(bus.emitted(), 1);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(wave_start(1).name(), "wave_start");
        assert_eq!(
            GameEvent::VersusMatchOver {
                winner: PlayerSlot::Two
            }
            .name(),
            "versus:match_over"
        );
    }
}
