use std::time::Instant;

use landmark_guess_lib::{
    coordinate::Coordinate, distance::distance_km, landmark::Landmark, results::RoundResult, score::ScoreModel,
};
use serde::Serialize;

use crate::timer::RoundTimer;

pub const PERFECT_KM: f64 = 0.5;
pub const GOOD_KM: f64 = 3.0;

/// Celebration intensity for a close guess. Advisory only, it never changes the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Perfect,
    Good,
}

impl Feedback {
    pub fn for_distance(distance_km: f64) -> Option<Self> {
        if distance_km < PERFECT_KM {
            Some(Feedback::Perfect)
        } else if distance_km < GOOD_KM {
            Some(Feedback::Good)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Feedback::Perfect => "perfect",
            Feedback::Good => "good",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Guessed {
        guess: Coordinate,
        distance_km: f64,
        score: u32,
    },
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundState {
    AwaitingGuess,
    Resolved(Resolution),
}

/// What a stimulus did to a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundEvent {
    Ignored,
    Guessed {
        distance_km: f64,
        score: u32,
        feedback: Option<Feedback>,
    },
    TimedOut,
}

impl RoundEvent {
    pub fn is_ignored(&self) -> bool {
        matches!(self, RoundEvent::Ignored)
    }
}

/// One guess-and-score cycle against a landmark. The timer lives with the session and is
/// lent to the round for each stimulus.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    landmark: Landmark,
    state: RoundState,
}

impl Round {
    pub fn new(landmark: Landmark) -> Self {
        Self {
            landmark,
            state: RoundState::AwaitingGuess,
        }
    }

    pub fn landmark(&self) -> &Landmark {
        &self.landmark
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, RoundState::Resolved(_))
    }

    pub fn guess(&self) -> Option<Coordinate> {
        match self.state {
            RoundState::Resolved(Resolution::Guessed { guess, .. }) => Some(guess),
            _ => None,
        }
    }

    pub fn distance_km(&self) -> Option<f64> {
        match self.state {
            RoundState::Resolved(Resolution::Guessed { distance_km, .. }) => Some(distance_km),
            _ => None,
        }
    }

    /// Some once resolved; a timed out round scores 0.
    pub fn score(&self) -> Option<u32> {
        match self.state {
            RoundState::Resolved(Resolution::Guessed { score, .. }) => Some(score),
            RoundState::Resolved(Resolution::TimedOut) => Some(0),
            RoundState::AwaitingGuess => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.state == RoundState::Resolved(Resolution::TimedOut)
    }

    pub fn result(&self) -> Option<RoundResult> {
        let score = self.score()?;
        Some(RoundResult {
            landmark_id: self.landmark.id,
            landmark_name: self.landmark.name.clone(),
            guess: self.guess(),
            distance_km: self.distance_km(),
            score,
            timed_out: self.timed_out(),
        })
    }

    pub fn submit_guess(
        &mut self,
        timer: &mut RoundTimer,
        guess: Coordinate,
        scoring: &ScoreModel,
        multiplier: f64,
        now: Instant,
    ) -> RoundEvent {
        if self.state != RoundState::AwaitingGuess {
            return RoundEvent::Ignored;
        }

        // A guess observed at or past the deadline loses to the expiration
        if timer.tick(now) {
            return self.expire_round(timer);
        }

        if !guess.is_valid() {
            tracing::debug!("Ignoring out of range guess {:?}", guess);
            return RoundEvent::Ignored;
        }

        if !timer.stop(now) {
            return RoundEvent::Ignored;
        }

        let distance_km = distance_km(guess, self.landmark.position);
        let score = scoring.score(distance_km, multiplier);
        self.state = RoundState::Resolved(Resolution::Guessed {
            guess,
            distance_km,
            score,
        });

        tracing::debug!("Guess for {} was {:.3} km off, {} points", self.landmark.name, distance_km, score);

        RoundEvent::Guessed {
            distance_km,
            score,
            feedback: Feedback::for_distance(distance_km),
        }
    }

    pub fn tick(&mut self, timer: &mut RoundTimer, now: Instant) -> RoundEvent {
        if timer.tick(now) {
            self.expire_round(timer)
        } else {
            RoundEvent::Ignored
        }
    }

    /// Expiration handler. Duplicate or late signals are ignored.
    pub fn expire_round(&mut self, timer: &mut RoundTimer) -> RoundEvent {
        if self.state != RoundState::AwaitingGuess {
            return RoundEvent::Ignored;
        }

        timer.expire();
        self.state = RoundState::Resolved(Resolution::TimedOut);
        tracing::debug!("Round for {} timed out", self.landmark.name);

        RoundEvent::TimedOut
    }
}

#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
fn castle_round(now: Instant) -> (Round, RoundTimer) {
    let landmark = Landmark::new(200, "Royal Castle", Coordinate::new(52.247, 21.015));
    let mut timer = RoundTimer::from_secs(30);
    timer.start(now);
    (Round::new(landmark), timer)
}

#[test]
fn exact_guess_is_perfect() {
    let t0 = Instant::now();
    let (mut round, mut timer) = castle_round(t0);

    let event = round.submit_guess(&mut timer, Coordinate::new(52.247, 21.015), &ScoreModel::default(), 1., t0);

    assert_eq!(
        event,
        RoundEvent::Guessed {
            distance_km: 0.,
            score: 1000,
            feedback: Some(Feedback::Perfect)
        }
    );
    assert!(round.is_resolved());
    assert!(!timer.is_running());
    assert_eq!(round.score(), Some(1000));
}

#[test]
fn second_guess_is_ignored() {
    let t0 = Instant::now();
    let (mut round, mut timer) = castle_round(t0);
    let scoring = ScoreModel::default();

    round.submit_guess(&mut timer, Coordinate::new(52.25, 21.02), &scoring, 1., t0);
    let before = round.clone();

    let event = round.submit_guess(&mut timer, Coordinate::new(52.247, 21.015), &scoring, 1., t0 + Duration::from_secs(1));
    assert_eq!(event, RoundEvent::Ignored);
    assert_eq!(round, before);

    assert_eq!(round.expire_round(&mut timer), RoundEvent::Ignored);
    assert_eq!(round, before);
}

#[test]
fn timeout_scores_zero() {
    let t0 = Instant::now();
    let (mut round, mut timer) = castle_round(t0);

    assert_eq!(round.tick(&mut timer, t0 + Duration::from_secs(29)), RoundEvent::Ignored);
    assert_eq!(round.tick(&mut timer, t0 + Duration::from_secs(30)), RoundEvent::TimedOut);
    assert_eq!(round.tick(&mut timer, t0 + Duration::from_secs(31)), RoundEvent::Ignored);

    assert!(round.timed_out());
    assert_eq!(round.guess(), None);
    assert_eq!(round.distance_km(), None);
    assert_eq!(round.score(), Some(0));
}

#[test]
fn guess_after_deadline_times_out() {
    let t0 = Instant::now();
    let (mut round, mut timer) = castle_round(t0);

    let event = round.submit_guess(
        &mut timer,
        Coordinate::new(52.247, 21.015),
        &ScoreModel::default(),
        1.,
        t0 + Duration::from_secs(30),
    );

    assert_eq!(event, RoundEvent::TimedOut);
    assert!(round.timed_out());
}

#[test]
fn invalid_guess_keeps_round_open() {
    let t0 = Instant::now();
    let (mut round, mut timer) = castle_round(t0);

    let event = round.submit_guess(&mut timer, Coordinate::new(123., 21.), &ScoreModel::default(), 1., t0);
    assert_eq!(event, RoundEvent::Ignored);
    assert_eq!(round.state(), RoundState::AwaitingGuess);
    assert!(timer.is_running());
}

#[test]
fn forced_expiration_stops_the_timer() {
    let t0 = Instant::now();
    let (mut round, mut timer) = castle_round(t0);

    assert_eq!(round.expire_round(&mut timer), RoundEvent::TimedOut);
    assert!(timer.is_expired());
    assert_eq!(round.expire_round(&mut timer), RoundEvent::Ignored);
}

#[test]
fn feedback_thresholds() {
    assert_eq!(Feedback::for_distance(0.), Some(Feedback::Perfect));
    assert_eq!(Feedback::for_distance(0.49), Some(Feedback::Perfect));
    assert_eq!(Feedback::for_distance(0.5), Some(Feedback::Good));
    assert_eq!(Feedback::for_distance(2.99), Some(Feedback::Good));
    assert_eq!(Feedback::for_distance(3.), None);
}

#[test]
fn result_carries_resolution() {
    let t0 = Instant::now();
    let (mut round, mut timer) = castle_round(t0);
    assert_eq!(round.result(), None);

    round.submit_guess(&mut timer, Coordinate::new(52.2497, 21.0122), &ScoreModel::default(), 1., t0);
    let result = round.result().unwrap();
    assert_eq!(result.landmark_id, 200);
    assert_eq!(result.guess, Some(Coordinate::new(52.2497, 21.0122)));
    assert!(!result.timed_out);
    assert_eq!(Some(result.score), round.score());
}
