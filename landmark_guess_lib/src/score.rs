use crate::difficulty::Difficulty;

pub const MAX_SCORE_PER_ROUND: u32 = 1000;
pub const DEFAULT_DECAY_KM: f64 = 2.5;
pub const DEFAULT_HARD_MULTIPLIER: f64 = 1.15;
/// Largest per-round maximum a model accepts, so totals of long sessions stay far from `u32::MAX`.
pub const MAX_SCORE_LIMIT: u32 = 1_000_000;

/// Exponential decay scoring: `max * e^(-distance / decay)`, scaled by a difficulty
/// multiplier and capped at `max_score`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreModel {
    pub max_score: u32,
    pub decay_km: f64,
    pub hard_multiplier: f64,
}

impl Default for ScoreModel {
    fn default() -> Self {
        Self {
            max_score: MAX_SCORE_PER_ROUND,
            decay_km: DEFAULT_DECAY_KM,
            hard_multiplier: DEFAULT_HARD_MULTIPLIER,
        }
    }
}

impl ScoreModel {
    /// `max_score` is capped at [`MAX_SCORE_LIMIT`]. A decay that is not a positive finite
    /// number falls back to [`DEFAULT_DECAY_KM`].
    pub fn new(max_score: u32, decay_km: f64, hard_multiplier: f64) -> Self {
        let decay_km = if decay_km.is_finite() && decay_km > 0. {
            decay_km
        } else {
            DEFAULT_DECAY_KM
        };

        Self {
            max_score: max_score.min(MAX_SCORE_LIMIT),
            decay_km,
            hard_multiplier,
        }
    }

    pub fn multiplier_for(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Hard => self.hard_multiplier,
            Difficulty::Easy | Difficulty::Normal => 1.,
        }
    }

    pub fn score(&self, distance_km: f64, multiplier: f64) -> u32 {
        if distance_km.is_nan() {
            return 0;
        }

        let max = f64::from(self.max_score);
        let distance_km = distance_km.max(0.);
        // Without a usable decay only an exact hit scores
        let raw = if self.decay_km > 0. {
            max * f64::exp(-distance_km / self.decay_km)
        } else if distance_km == 0. {
            max
        } else {
            0.
        };
        // NaN multipliers collapse to 0 through f64::max
        let boosted = (raw * multiplier.max(0.)).round();

        if boosted.is_nan() {
            return 0;
        }

        boosted.clamp(0., max) as u32
    }

    pub fn score_for(&self, distance_km: f64, difficulty: Difficulty) -> u32 {
        self.score(distance_km, self.multiplier_for(difficulty))
    }
}

#[test]
fn zero_distance_is_max() {
    let model = ScoreModel::default();
    assert_eq!(model.score(0., 1.), MAX_SCORE_PER_ROUND);
    assert_eq!(model.score_for(0., Difficulty::Hard), MAX_SCORE_PER_ROUND);
}

#[test]
fn five_km_scores_135() {
    let model = ScoreModel::default();
    assert_eq!(model.score(5., 1.), 135);
}

#[test]
fn hard_multiplier_boosts_but_stays_capped() {
    let model = ScoreModel::default();
    assert_eq!(model.score_for(5., Difficulty::Hard), (1000. * f64::exp(-2.) * 1.15).round() as u32);
    assert_eq!(model.score_for(0.1, Difficulty::Hard), MAX_SCORE_PER_ROUND);
    assert_eq!(model.score_for(5., Difficulty::Easy), model.score_for(5., Difficulty::Normal));
}

#[test]
fn score_is_monotonic_and_bounded() {
    let model = ScoreModel::default();
    for multiplier in [0., 0.5, 1., 1.15, 3.] {
        let mut previous = u32::MAX;
        for step in 0..2000 {
            let distance = step as f64 * 0.05;
            let score = model.score(distance, multiplier);
            assert!(score <= MAX_SCORE_PER_ROUND);
            assert!(score <= previous, "score rose at {distance} km");
            previous = score;
        }
    }
}

#[test]
fn degenerate_inputs() {
    let model = ScoreModel::default();
    assert_eq!(model.score(f64::NAN, 1.), 0);
    assert_eq!(model.score(f64::INFINITY, 1.), 0);
    assert_eq!(model.score(-1., 1.), MAX_SCORE_PER_ROUND);
    assert_eq!(model.score(0., f64::NAN), 0);
    assert_eq!(model.score(0., -2.), 0);
}

#[test]
fn other_revision_decay() {
    // Earlier builds scored with a 5 km decay out of 5000
    let model = ScoreModel::new(5000, 5., 1.);
    assert_eq!(model.score(5., 1.), (5000. * f64::exp(-1.)).round() as u32);
}

#[test]
fn unusable_decay() {
    let model = ScoreModel::new(1000, 0., 1.);
    assert_eq!(model.decay_km, DEFAULT_DECAY_KM);
    assert_eq!(model.score(0., 1.), 1000);

    let zero_decay = ScoreModel {
        decay_km: 0.,
        ..ScoreModel::default()
    };
    assert_eq!(zero_decay.score(0., 1.), 1000);
    assert_eq!(zero_decay.score(0.01, 1.), 0);

    let negative_decay = ScoreModel {
        decay_km: -3.,
        ..ScoreModel::default()
    };
    assert_eq!(negative_decay.score(0., 1.), 1000);
    assert_eq!(negative_decay.score(2., 1.), 0);
}

#[test]
fn max_score_is_capped() {
    let model = ScoreModel::new(u32::MAX, DEFAULT_DECAY_KM, 1.);
    assert_eq!(model.max_score, MAX_SCORE_LIMIT);
    assert_eq!(model.score(0., 1.), MAX_SCORE_LIMIT);
}
