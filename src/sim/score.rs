//! Single-player score ledger
//!
//! Every counter moves in response to exactly one event kind.

use serde::{Deserialize, Serialize};

use super::events::{EventListener, GameEvent, ListenerError};

/// Points awarded per scoring event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreRules {
    pub kill_points: u64,
    pub dodge_points: u64,
    pub wave_clear_points: u64,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self {
            kill_points: 100,
            dodge_points: 10,
            wave_clear_points: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreState {
    pub score: u64,
    pub kills: u32,
    pub dodges: u32,
    pub wave: u32,
    pub deaths: u32,
    pub hits: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreAggregator {
    rules: ScoreRules,
    state: ScoreState,
}

impl ScoreAggregator {
    pub fn new(rules: ScoreRules) -> Self {
        Self {
            rules,
            state: ScoreState::default(),
        }
    }

    pub fn state(&self) -> ScoreState {
        self.state
    }

    pub fn rules(&self) -> &ScoreRules {
        &self.rules
    }

    pub fn reset(&mut self) {
        self.state = ScoreState::default();
    }

    /// Fold one event into the ledger; unrelated events are ignored
    pub fn apply(&mut self, event: &GameEvent) {
        let state = &mut self.state;
        match event {
            GameEvent::EnemyKilled { .. } => {
                state.kills += 1;
                state.score += self.rules.kill_points;
            }
            GameEvent::BulletDodged { .. } => {
                state.dodges += 1;
                state.score += self.rules.dodge_points;
            }
            GameEvent::WaveStart { wave, .. } => {
                state.wave = *wave;
            }
            GameEvent::WaveCleared { wave, .. } => {
                state.wave = *wave;
                state.score += self.rules.wave_clear_points;
            }
            GameEvent::PlayerHit { is_fatal, .. } => {
                state.hits += 1;
                if *is_fatal {
                    state.deaths += 1;
                }
            }
            _ => {}
        }
    }
}

impl EventListener for ScoreAggregator {
    fn on_event(&mut self, event: &GameEvent) -> Result<(), ListenerError> {
        self.apply(event);
        Ok(())
    }
}
