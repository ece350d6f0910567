//! Versus round bookkeeping and match resolution
//!
//! `RoundTracker` folds versus events into per-slot stats and owns respawn
//! countdowns. `MatchState` reads those stats and flips to terminal once.

use serde::{Deserialize, Serialize};

use super::events::{EventListener, GameEvent, ListenerError};
use super::state::PlayerSlot;
use crate::consts::{DEFAULT_RESPAWN_DELAY_MS, DEFAULT_WIN_KILLS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundStats {
    pub kills: u32,
    pub deaths: u32,
    pub dodges: u32,
}

/// Versus balance knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersusRules {
    pub respawn_delay_ms: f64,
    /// Kills needed to end the match
    pub win_kills: u32,
}

impl Default for VersusRules {
    fn default() -> Self {
        Self {
            respawn_delay_ms: DEFAULT_RESPAWN_DELAY_MS,
            win_kills: DEFAULT_WIN_KILLS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundTracker {
    respawn_delay_ms: f64,
    stats: [RoundStats; 2],
    respawn_timers_ms: [Option<f64>; 2],
}

impl Default for RoundTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RESPAWN_DELAY_MS)
    }
}

impl RoundTracker {
    /// Non-finite delays fall back to the default; negatives clamp to zero
    pub fn new(respawn_delay_ms: f64) -> Self {
        let respawn_delay_ms = if respawn_delay_ms.is_finite() {
            respawn_delay_ms.max(0.0)
        } else {
            DEFAULT_RESPAWN_DELAY_MS
        };
        Self {
            respawn_delay_ms,
            stats: [RoundStats::default(); 2],
            respawn_timers_ms: [None; 2],
        }
    }

    pub fn respawn_delay_ms(&self) -> f64 {
        self.respawn_delay_ms
    }

    pub fn stats(&self, slot: PlayerSlot) -> RoundStats {
        self.stats[slot.index()]
    }

    pub fn all_stats(&self) -> [RoundStats; 2] {
        self.stats
    }

    /// Remaining countdown, if armed
    pub fn respawn_timer_ms(&self, slot: PlayerSlot) -> Option<f64> {
        self.respawn_timers_ms[slot.index()]
    }

    pub fn reset(&mut self) {
        self.stats = [RoundStats::default(); 2];
        self.respawn_timers_ms = [None; 2];
    }

    /// Arm a slot's countdown unless it is already running
    fn schedule_respawn(&mut self, slot: PlayerSlot) {
        let timer = &mut self.respawn_timers_ms[slot.index()];
        if timer.is_none() {
            *timer = Some(self.respawn_delay_ms);
        }
    }

    pub fn apply(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::VersusDodge { dodger, .. } => {
                self.stats[dodger.index()].dodges += 1;
            }
            GameEvent::VersusKill { killer, victim, .. } => {
                self.stats[killer.index()].kills += 1;
                self.stats[victim.index()].deaths += 1;
                self.schedule_respawn(victim);
            }
            GameEvent::VersusPlayerHit {
                target,
                is_fatal: true,
                ..
            } => {
                self.schedule_respawn(target);
            }
            _ => {}
        }
    }

    /// Count down armed timers; returns the slots that are ready to respawn
    pub fn update(&mut self, dt: f32) -> Vec<PlayerSlot> {
        let mut ready = Vec::new();
        if !dt.is_finite() || dt <= 0.0 {
            return ready;
        }
        let dt_ms = dt as f64 * 1000.0;

        for slot in PlayerSlot::ALL {
            let timer = &mut self.respawn_timers_ms[slot.index()];
            let Some(remaining) = *timer else {
                continue;
            };
            let remaining = remaining - dt_ms;
            if remaining > 0.0 {
                *timer = Some(remaining);
            } else {
                *timer = None;
                ready.push(slot);
            }
        }
        ready
    }
}

impl EventListener for RoundTracker {
    fn on_event(&mut self, event: &GameEvent) -> Result<(), ListenerError> {
        self.apply(event);
        Ok(())
    }
}

/// Winner once either slot reaches `win_kills`
///
/// A lone slot at the threshold wins outright. When both have reached it:
/// fewer deaths, then more dodges, then slot One.
pub fn decide_winner(stats: &[RoundStats; 2], win_kills: u32) -> Option<PlayerSlot> {
    let threshold = win_kills.max(1);
    let [one, two] = stats;
    match (one.kills >= threshold, two.kills >= threshold) {
        (false, false) => None,
        (true, false) => Some(PlayerSlot::One),
        (false, true) => Some(PlayerSlot::Two),
        (true, true) => {
            let two_wins = two.deaths < one.deaths
                || (two.deaths == one.deaths && two.dodges > one.dodges);
            Some(if two_wins { PlayerSlot::Two } else { PlayerSlot::One })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner: PlayerSlot,
    pub stats: [RoundStats; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchState {
    #[default]
    InProgress,
    Over(MatchOutcome),
}

impl MatchState {
    /// Returns the outcome only on the transition into `Over`
    pub fn evaluate(&mut self, stats: &[RoundStats; 2], win_kills: u32) -> Option<MatchOutcome> {
        if self.is_over() {
            return None;
        }
        let winner = decide_winner(stats, win_kills)?;
        let outcome = MatchOutcome { winner, stats: *stats };
        *self = MatchState::Over(outcome);
        Some(outcome)
    }

    pub fn is_over(&self) -> bool {
        matches!(self, MatchState::Over(_))
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        match self {
            MatchState::Over(outcome) => Some(outcome),
            MatchState::InProgress => None,
        }
    }
}
