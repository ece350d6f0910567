//! High score leaderboard system
//!
//! Persisted through a `Store`, tracks top 10 finished runs.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::sim::RunSummary;
use crate::storage::{self, StorageError, Store};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// One finished run on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// Wave reached
    pub wave: u32,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub dodges: u32,
    /// Run length in whole seconds
    #[serde(default)]
    pub time_seconds: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

impl HighScoreEntry {
    pub fn from_run(run: &RunSummary, timestamp: f64) -> Self {
        Self {
            score: run.score,
            wave: run.wave,
            kills: run.kills,
            dodges: run.dodges,
            time_seconds: run.time_seconds,
            timestamp,
        }
    }

    /// `Less` when `self` places above `other`
    ///
    /// Score decides; equal scores go to the deeper wave, then the shorter
    /// run. Anything still equal is a tie.
    pub fn board_order(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then(other.wave.cmp(&self.wave))
            .then(self.time_seconds.cmp(&other.time_seconds))
    }
}

/// Top runs, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub const STORAGE_KEY: &'static str = "highscores";

    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Board index a run would take; tied runs slot in behind existing ones
    fn slot_for(&self, entry: &HighScoreEntry) -> Option<usize> {
        if entry.score == 0 {
            return None;
        }
        let index = self
            .entries
            .partition_point(|existing| existing.board_order(entry) != Ordering::Greater);
        (index < MAX_HIGH_SCORES).then_some(index)
    }

    /// Whether a finished run would make the board
    pub fn qualifies(&self, run: &RunSummary) -> bool {
        self.potential_rank(run).is_some()
    }

    /// 1-indexed rank a run would take, None if it falls off the board
    pub fn potential_rank(&self, run: &RunSummary) -> Option<usize> {
        self.slot_for(&HighScoreEntry::from_run(run, 0.0)).map(|index| index + 1)
    }

    /// Record a finished run if it makes the board; returns its 1-indexed rank
    pub fn add_run(&mut self, run: &RunSummary, timestamp: f64) -> Option<usize> {
        let entry = HighScoreEntry::from_run(run, timestamp);
        let index = self.slot_for(&entry)?;
        self.entries.insert(index, entry);
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(index + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load from `store`, starting fresh when absent or corrupt
    pub fn load(store: &dyn Store) -> Self {
        match storage::load_json::<HighScores>(store, Self::STORAGE_KEY) {
            Some(mut scores) => {
                scores.entries.sort_by(HighScoreEntry::board_order);
                scores.entries.truncate(MAX_HIGH_SCORES);
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            None => {
                log::info!("No high scores found, starting fresh");
                Self::new()
            }
        }
    }

    pub fn save(&self, store: &mut dyn Store) -> Result<(), StorageError> {
        storage::save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, storage_key};

    fn run(score: u64) -> RunSummary {
        RunSummary {
            score,
            wave: 2,
            kills: 3,
            dodges: 4,
            time_seconds: 61,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_score_never_qualifies() {
        let mut scores = HighScores::new();
        assert!(!scores.qualifies(&run(0)));
        assert_eq!(scores.add_run(&run(0), 0.0), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_runs_sorted_descending() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_run(&run(500), 1.0), Some(1));
        assert_eq!(scores.add_run(&run(900), 2.0), Some(1));
        assert_eq!(scores.add_run(&run(700), 3.0), Some(2));
        assert_eq!(scores.add_run(&run(700), 4.0), Some(3));

        let ordered: Vec<u64> = scores.entries.iter().map(|e| e.score).collect();
        assert_eq!(ordered, vec![900, 700, 700, 500]);
        assert_eq!(scores.entries[1].timestamp, 3.0);
        assert_eq!(scores.top_score(), Some(900));
        assert_eq!(scores.entries[0].time_seconds, 61);
    }

    #[test]
    fn test_equal_scores_rank_by_wave_then_time() {
        let mut scores = HighScores::new();
        scores.add_run(&run(700), 1.0);

        let deeper = RunSummary { wave: 5, ..run(700) };
        assert_eq!(scores.potential_rank(&deeper), Some(1));
        assert_eq!(scores.add_run(&deeper, 2.0), Some(1));

        let quicker = RunSummary { time_seconds: 30, ..run(700) };
        assert_eq!(scores.add_run(&quicker, 3.0), Some(2));

        let order: Vec<f64> = scores.entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(order, vec![2.0, 3.0, 1.0]);
        assert_eq!(scores.entries[0].wave, 5);
    }

    #[test]
    fn test_board_caps_at_ten() {
        let mut scores = HighScores::new();
        for i in 1..=MAX_HIGH_SCORES as u64 {
            scores.add_run(&run(i * 100), i as f64);
        }
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        // Ties the last entry without beating it
        assert!(!scores.qualifies(&run(100)));
        assert!(scores.qualifies(&RunSummary { wave: 3, ..run(100) }));
        assert_eq!(scores.potential_rank(&run(150)), Some(10));
        assert_eq!(scores.potential_rank(&run(5000)), Some(1));

        assert_eq!(scores.add_run(&run(150), 99.0), Some(10));
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.entries.last().map(|e| e.score), Some(150));
    }

    #[test]
    fn test_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(HighScores::load(&store).is_empty());

        let mut scores = HighScores::new();
        scores.add_run(&run(1200), 10.0);
        scores.save(&mut store).unwrap();

        assert_eq!(HighScores::load(&store), scores);
    }

    #[test]
    fn test_legacy_entries_without_run_stats_load() {
        let mut store = MemoryStore::new();
        store
            .set(
                &storage_key(HighScores::STORAGE_KEY),
                r#"{"entries":[{"score":10,"wave":1,"timestamp":0.0},{"score":40,"wave":3,"timestamp":1.0}]}"#,
            )
            .unwrap();

        let scores = HighScores::load(&store);
        assert_eq!(scores.top_score(), Some(40));
        assert_eq!(scores.entries[1].kills, 0);
    }
}
