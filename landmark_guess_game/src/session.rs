use std::time::{Duration, Instant};

use chrono::Utc;
use landmark_guess_lib::{
    coordinate::Coordinate,
    difficulty::Difficulty,
    landmark::Landmark,
    results::{GameResult, RoundResult},
    score::ScoreModel,
};
use rand::Rng;
use serde::Serialize;

use crate::{
    catalog::LandmarkCatalog,
    config::{DEFAULT_ROUNDS, DEFAULT_ROUND_SECONDS, clamp_round_seconds},
    reveal::{facts_for, flavor},
    round::{Feedback, Round, RoundEvent},
    timer::RoundTimer,
    GameError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub rounds: usize,
    pub difficulty: Difficulty,
    pub seconds_per_round: u32,
    pub scoring: ScoreModel,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            difficulty: Difficulty::default(),
            seconds_per_round: DEFAULT_ROUND_SECONDS,
            scoring: ScoreModel::default(),
        }
    }
}

/// Collaborators the session calls into. All of them are fire-and-forget.
pub trait GameHooks: Send {
    fn render(&mut self, _view: &RoundView) {}

    fn celebrate(&mut self, _feedback: Feedback) {}

    fn completed(&mut self, _result: &GameResult) {}
}

pub struct NoHooks;

impl GameHooks for NoHooks {}

/// Snapshot for the presentation layer. The true position stays hidden until the round resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub round_number: usize,
    pub round_count: usize,
    pub landmark_id: i64,
    pub landmark_name: String,
    pub true_position: Option<Coordinate>,
    pub guess_position: Option<Coordinate>,
    pub solution_visible: bool,
    pub timed_out: bool,
    pub distance_km: Option<f64>,
    pub round_score: Option<u32>,
    pub total_score: u32,
    pub remaining_ms: u64,
    pub countdown: String,
    pub flavor: Option<&'static str>,
    pub facts: &'static [&'static str],
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    NextRound(usize),
    Completed(GameResult),
}

pub struct GameSession {
    landmarks: Vec<Landmark>,
    rounds: Vec<Round>,
    current_index: usize,
    total_score: u32,
    difficulty: Difficulty,
    round_duration: Duration,
    scoring: ScoreModel,
    timer: RoundTimer,
    result: Option<GameResult>,
    hooks: Box<dyn GameHooks>,
}

impl GameSession {
    /// Samples the landmarks and starts round 0. Round length is clamped to 5-60 s.
    pub fn start<R: Rng + ?Sized>(
        catalog: &LandmarkCatalog,
        options: &SessionOptions,
        rng: &mut R,
        now: Instant,
    ) -> Result<Self, GameError> {
        Self::start_with_hooks(catalog, options, rng, now, NoHooks)
    }

    /// Like [`GameSession::start`], and renders round 0 through `hooks`.
    pub fn start_with_hooks<R: Rng + ?Sized>(
        catalog: &LandmarkCatalog,
        options: &SessionOptions,
        rng: &mut R,
        now: Instant,
        hooks: impl GameHooks + 'static,
    ) -> Result<Self, GameError> {
        if options.rounds == 0 {
            return Err(GameError::Config("a session needs at least one round".to_string()));
        }

        let landmarks = catalog.sample(options.rounds, rng)?;
        let seconds_per_round = clamp_round_seconds(options.seconds_per_round.into());
        if seconds_per_round != options.seconds_per_round {
            tracing::warn!("Round length {}s out of range, using {}s", options.seconds_per_round, seconds_per_round);
        }
        let round_duration = Duration::from_secs(seconds_per_round.into());

        let mut timer = RoundTimer::new(round_duration);
        timer.start(now);

        tracing::info!(
            "Starting session: {} rounds, {} difficulty, {}s per round",
            options.rounds,
            options.difficulty,
            seconds_per_round
        );

        let mut session = Self {
            rounds: vec![Round::new(landmarks[0].clone())],
            landmarks,
            current_index: 0,
            total_score: 0,
            difficulty: options.difficulty,
            round_duration,
            scoring: options.scoring,
            timer,
            result: None,
            hooks: Box::new(hooks),
        };

        let view = session.view(now);
        session.hooks.render(&view);

        Ok(session)
    }

    /// Swaps the hooks of a running session. Nothing is rendered until the next transition.
    pub fn with_hooks(mut self, hooks: impl GameHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn round_count(&self) -> usize {
        self.landmarks.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_round(&self) -> &Round {
        &self.rounds[self.current_index]
    }

    /// Rounds started so far, in order.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn timer(&self) -> &RoundTimer {
        &self.timer
    }

    /// When the current round expires, if its countdown is running.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn submit_guess(&mut self, guess: Coordinate, now: Instant) -> RoundEvent {
        if self.is_finished() {
            return RoundEvent::Ignored;
        }

        let multiplier = self.scoring.multiplier_for(self.difficulty);
        let event = self.rounds[self.current_index].submit_guess(&mut self.timer, guess, &self.scoring, multiplier, now);
        self.apply(event, now);
        event
    }

    /// Delivers the timer's expiration if the deadline has passed.
    pub fn tick(&mut self, now: Instant) -> RoundEvent {
        if self.is_finished() {
            return RoundEvent::Ignored;
        }

        let event = self.rounds[self.current_index].tick(&mut self.timer, now);
        self.apply(event, now);
        event
    }

    /// Moves past a resolved round: either starts the next one or completes the session.
    pub fn advance(&mut self, now: Instant) -> Result<Advance, GameError> {
        if self.is_finished() {
            return Err(GameError::SessionFinished);
        }

        if !self.current_round().is_resolved() || self.timer.is_running() {
            return Err(GameError::RoundInProgress);
        }

        if self.current_index + 1 == self.landmarks.len() {
            let result = GameResult {
                total_score: self.total_score,
                difficulty: self.difficulty,
                rounds: self.rounds.iter().filter_map(Round::result).collect::<Vec<RoundResult>>(),
                finished_at: Utc::now(),
            };

            tracing::info!("Session complete with {} points", result.total_score);
            self.hooks.completed(&result);
            self.result = Some(result.clone());
            return Ok(Advance::Completed(result));
        }

        self.current_index += 1;
        self.rounds.push(Round::new(self.landmarks[self.current_index].clone()));
        self.timer.reset(self.round_duration);
        self.timer.start(now);

        tracing::debug!("Round {} of {} started", self.current_index + 1, self.landmarks.len());
        let view = self.view(now);
        self.hooks.render(&view);

        Ok(Advance::NextRound(self.current_index))
    }

    pub fn view(&self, now: Instant) -> RoundView {
        let round = self.current_round();
        let landmark = round.landmark();
        let solution_visible = round.is_resolved();
        let remaining = self.timer.remaining(now);

        RoundView {
            round_number: self.current_index + 1,
            round_count: self.landmarks.len(),
            landmark_id: landmark.id,
            landmark_name: landmark.name.clone(),
            true_position: solution_visible.then_some(landmark.position),
            guess_position: round.guess(),
            solution_visible,
            timed_out: round.timed_out(),
            distance_km: round.distance_km(),
            round_score: round.score(),
            total_score: self.total_score,
            remaining_ms: remaining.as_millis() as u64,
            countdown: self.timer.format_remaining(now),
            flavor: round.distance_km().map(flavor),
            facts: if solution_visible { facts_for(landmark.id) } else { &[] },
            finished: self.is_finished(),
        }
    }

    fn apply(&mut self, event: RoundEvent, now: Instant) {
        match event {
            RoundEvent::Ignored => return,
            RoundEvent::Guessed { score, feedback, .. } => {
                self.total_score = self.total_score.saturating_add(score);
                if let Some(feedback) = feedback {
                    self.hooks.celebrate(feedback);
                }
            }
            RoundEvent::TimedOut => {}
        }

        debug_assert_eq!(
            self.total_score,
            self.rounds
                .iter()
                .filter_map(Round::score)
                .fold(0u32, |total, score| total.saturating_add(score))
        );

        let view = self.view(now);
        self.hooks.render(&view);
    }
}

#[cfg(test)]
use rand::{rngs::StdRng, SeedableRng};
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
#[derive(Default, Clone)]
struct Recorder {
    renders: Arc<Mutex<Vec<RoundView>>>,
    celebrations: Arc<Mutex<Vec<Feedback>>>,
    completed: Arc<Mutex<Option<u32>>>,
}

#[cfg(test)]
impl GameHooks for Recorder {
    fn render(&mut self, view: &RoundView) {
        self.renders.lock().unwrap().push(view.clone());
    }

    fn celebrate(&mut self, feedback: Feedback) {
        self.celebrations.lock().unwrap().push(feedback);
    }

    fn completed(&mut self, result: &GameResult) {
        *self.completed.lock().unwrap() = Some(result.total_score);
    }
}

#[cfg(test)]
fn start_session(rounds: usize, now: Instant) -> GameSession {
    let options = SessionOptions {
        rounds,
        ..SessionOptions::default()
    };
    GameSession::start(&LandmarkCatalog::warsaw(), &options, &mut StdRng::seed_from_u64(3), now).unwrap()
}

#[test]
fn view_hides_solution_until_resolved() {
    let t0 = Instant::now();
    let mut session = start_session(3, t0);

    let view = session.view(t0);
    assert_eq!(view.round_number, 1);
    assert_eq!(view.round_count, 3);
    assert_eq!(view.true_position, None);
    assert!(!view.solution_visible);
    assert_eq!(view.countdown, "00:30");
    assert!(view.facts.is_empty());

    let target = session.current_round().landmark().position;
    session.submit_guess(target, t0);

    let view = session.view(t0);
    assert!(view.solution_visible);
    assert_eq!(view.true_position, Some(target));
    assert_eq!(view.guess_position, Some(target));
    assert_eq!(view.round_score, Some(1000));
    assert_eq!(view.flavor, Some("You could smell the zapiekanka from here."));
}

#[test]
fn advance_requires_resolution() {
    let t0 = Instant::now();
    let mut session = start_session(2, t0);

    assert!(matches!(session.advance(t0), Err(GameError::RoundInProgress)));
    assert_eq!(session.current_index(), 0);

    session.tick(t0 + Duration::from_secs(30));
    assert!(matches!(session.advance(t0 + Duration::from_secs(31)), Ok(Advance::NextRound(1))));
    assert_eq!(session.rounds().len(), 2);
    assert!(session.timer().is_running());
    assert_eq!(session.deadline(), Some(t0 + Duration::from_secs(61)));
}

#[test]
fn completion_hands_off_result() {
    let t0 = Instant::now();
    let recorder = Recorder::default();
    let mut session = start_session(2, t0).with_hooks(recorder.clone());

    let target = session.current_round().landmark().position;
    session.submit_guess(target, t0);
    session.advance(t0).unwrap();
    session.tick(t0 + Duration::from_secs(60));

    let Ok(Advance::Completed(result)) = session.advance(t0 + Duration::from_secs(61)) else {
        panic!("expected the session to complete");
    };

    assert_eq!(result.total_score, 1000);
    assert_eq!(result.rounds.len(), 2);
    assert_eq!(result.timed_out_rounds(), 1);
    assert_eq!(*recorder.completed.lock().unwrap(), Some(1000));
    assert_eq!(*recorder.celebrations.lock().unwrap(), vec![Feedback::Perfect]);
    assert!(session.is_finished());

    assert!(matches!(session.advance(t0 + Duration::from_secs(62)), Err(GameError::SessionFinished)));
    assert_eq!(session.submit_guess(target, t0 + Duration::from_secs(62)), RoundEvent::Ignored);
    assert_eq!(session.total_score(), 1000);
}

#[test]
fn hooks_render_each_transition() {
    let t0 = Instant::now();
    let recorder = Recorder::default();
    let mut session = start_session(2, t0).with_hooks(recorder.clone());

    session.tick(t0 + Duration::from_secs(1));
    assert!(recorder.renders.lock().unwrap().is_empty());

    session.tick(t0 + Duration::from_secs(30));
    session.advance(t0 + Duration::from_secs(30)).unwrap();

    let renders = recorder.renders.lock().unwrap();
    assert_eq!(renders.len(), 2);
    assert!(renders[0].timed_out);
    assert_eq!(renders[1].round_number, 2);
    assert!(recorder.celebrations.lock().unwrap().is_empty());
}

#[test]
fn zero_rounds_is_rejected() {
    let options = SessionOptions {
        rounds: 0,
        ..SessionOptions::default()
    };
    let result = GameSession::start(&LandmarkCatalog::warsaw(), &options, &mut StdRng::seed_from_u64(1), Instant::now());
    assert!(matches!(result, Err(GameError::Config(_))));
}

#[test]
fn round_length_is_clamped() {
    let t0 = Instant::now();
    let catalog = LandmarkCatalog::warsaw();

    let instant = SessionOptions {
        seconds_per_round: 0,
        ..SessionOptions::default()
    };
    let mut session = GameSession::start(&catalog, &instant, &mut StdRng::seed_from_u64(2), t0).unwrap();
    assert_eq!(session.deadline(), Some(t0 + Duration::from_secs(5)));

    let target = session.current_round().landmark().position;
    assert!(matches!(session.submit_guess(target, t0), RoundEvent::Guessed { score: 1000, .. }));

    let endless = SessionOptions {
        seconds_per_round: 3600,
        ..SessionOptions::default()
    };
    let session = GameSession::start(&catalog, &endless, &mut StdRng::seed_from_u64(2), t0).unwrap();
    assert_eq!(session.deadline(), Some(t0 + Duration::from_secs(60)));
    assert_eq!(session.view(t0).countdown, "01:00");
}

#[test]
fn huge_scores_saturate_the_total() {
    let t0 = Instant::now();
    let options = SessionOptions {
        rounds: 2,
        scoring: ScoreModel {
            max_score: u32::MAX,
            ..ScoreModel::default()
        },
        ..SessionOptions::default()
    };
    let mut session = GameSession::start(&LandmarkCatalog::warsaw(), &options, &mut StdRng::seed_from_u64(4), t0).unwrap();

    let target = session.current_round().landmark().position;
    session.submit_guess(target, t0);
    session.advance(t0).unwrap();
    let target = session.current_round().landmark().position;
    session.submit_guess(target, t0);

    assert_eq!(session.total_score(), u32::MAX);
    let Ok(Advance::Completed(result)) = session.advance(t0) else {
        panic!("expected the session to complete");
    };
    assert_eq!(result.total_score, u32::MAX);
}

#[test]
fn start_with_hooks_renders_first_round() {
    let t0 = Instant::now();
    let recorder = Recorder::default();
    let options = SessionOptions {
        rounds: 2,
        ..SessionOptions::default()
    };

    let session =
        GameSession::start_with_hooks(&LandmarkCatalog::warsaw(), &options, &mut StdRng::seed_from_u64(6), t0, recorder.clone())
            .unwrap();

    let renders = recorder.renders.lock().unwrap();
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0], session.view(t0));
    assert_eq!(renders[0].round_number, 1);
    assert!(!renders[0].solution_visible);
}
