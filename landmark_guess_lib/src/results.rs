use chrono::{DateTime, Utc};

use crate::{coordinate::Coordinate, difficulty::Difficulty};

/// A resolved round, as handed to history and results views.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub landmark_id: i64,
    pub landmark_name: String,
    pub guess: Option<Coordinate>,
    pub distance_km: Option<f64>,
    pub score: u32,
    pub timed_out: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct GameResult {
    pub total_score: u32,
    pub difficulty: Difficulty,
    pub rounds: Vec<RoundResult>,
    pub finished_at: DateTime<Utc>,
}

impl GameResult {
    pub fn timed_out_rounds(&self) -> usize {
        self.rounds.iter().filter(|round| round.timed_out).count()
    }
}
