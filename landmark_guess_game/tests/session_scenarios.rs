use std::time::{Duration, Instant};

use landmark_guess_game::{
    catalog::LandmarkCatalog, round::RoundEvent, Advance, GameError, GameSession, SessionOptions,
};
use landmark_guess_lib::{
    coordinate::Coordinate, difficulty::Difficulty, distance::distance_km, landmark::Landmark, score::ScoreModel,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn options(rounds: usize, difficulty: Difficulty) -> SessionOptions {
    SessionOptions {
        rounds,
        difficulty,
        seconds_per_round: 30,
        scoring: ScoreModel::default(),
    }
}

fn resolved_sum(session: &GameSession) -> u32 {
    session.rounds().iter().filter_map(|round| round.score()).sum()
}

#[test]
fn exact_guess_scores_maximum() {
    let old_town = Landmark::new(100, "Old Town Market Square", Coordinate::new(52.2497, 21.0122));
    let catalog = LandmarkCatalog::new(vec![old_town]);
    let t0 = Instant::now();

    let mut session = GameSession::start(&catalog, &options(1, Difficulty::Normal), &mut StdRng::seed_from_u64(0), t0).unwrap();
    let event = session.submit_guess(Coordinate::new(52.2497, 21.0122), t0 + Duration::from_secs(3));

    let RoundEvent::Guessed { distance_km, score, .. } = event else {
        panic!("expected a guessed round, got {event:?}");
    };
    assert_eq!(distance_km, 0.);
    assert_eq!(score, 1000);
}

#[test]
fn five_km_off_scores_135() {
    let target = Coordinate::new(52.2497, 21.0122);
    // Roughly 5 km due north, then scored from the exact distance
    let guess = Coordinate::new(52.2497 + 5. / 111.195, 21.0122);
    let distance = distance_km(guess, target);
    assert!((distance - 5.).abs() < 0.001);

    let catalog = LandmarkCatalog::new(vec![Landmark::new(100, "Old Town Market Square", target)]);
    let t0 = Instant::now();
    let mut session = GameSession::start(&catalog, &options(1, Difficulty::Normal), &mut StdRng::seed_from_u64(0), t0).unwrap();

    session.submit_guess(guess, t0);
    assert_eq!(session.total_score(), 135);
}

#[test]
fn all_rounds_timing_out_scores_zero() {
    let catalog = LandmarkCatalog::warsaw();
    let mut now = Instant::now();
    let mut session = GameSession::start(&catalog, &options(10, Difficulty::Hard), &mut StdRng::seed_from_u64(10), now).unwrap();

    let result = loop {
        now += Duration::from_secs(31);
        assert_eq!(session.tick(now), RoundEvent::TimedOut);
        assert_eq!(session.total_score(), 0);

        match session.advance(now).unwrap() {
            Advance::NextRound(_) => continue,
            Advance::Completed(result) => break result,
        }
    };

    assert_eq!(result.total_score, 0);
    assert_eq!(result.rounds.len(), 10);
    assert!(result.rounds.iter().all(|round| round.timed_out && round.guess.is_none()));
}

#[test]
fn sixty_of_five_hundred_ten() {
    let catalog = LandmarkCatalog::warsaw();
    assert_eq!(catalog.len(), 510);

    let t0 = Instant::now();
    let session = GameSession::start(&catalog, &options(60, Difficulty::Normal), &mut StdRng::seed_from_u64(60), t0).unwrap();
    assert_eq!(session.round_count(), 60);

    let too_many = GameSession::start(&catalog, &options(511, Difficulty::Normal), &mut StdRng::seed_from_u64(60), t0);
    assert!(matches!(too_many, Err(GameError::InsufficientData { requested: 511, available: 510 })));
}

#[test]
fn guess_one_millisecond_before_deadline_counts() {
    let catalog = LandmarkCatalog::warsaw();
    let t0 = Instant::now();
    let mut session = GameSession::start(&catalog, &options(2, Difficulty::Normal), &mut StdRng::seed_from_u64(5), t0).unwrap();

    let deadline = session.deadline().unwrap();
    let target = session.current_round().landmark().position;
    let event = session.submit_guess(target, deadline - Duration::from_millis(1));

    assert!(matches!(event, RoundEvent::Guessed { .. }));
    assert!(!session.current_round().timed_out());
    // The expiration can no longer fire for this round
    assert_eq!(session.tick(deadline + Duration::from_secs(5)), RoundEvent::Ignored);
    assert_eq!(session.total_score(), 1000);
}

#[test]
fn guess_after_expiration_is_ignored() {
    let catalog = LandmarkCatalog::warsaw();
    let t0 = Instant::now();
    let mut session = GameSession::start(&catalog, &options(2, Difficulty::Normal), &mut StdRng::seed_from_u64(5), t0).unwrap();

    let deadline = session.deadline().unwrap();
    let target = session.current_round().landmark().position;

    assert_eq!(session.tick(deadline), RoundEvent::TimedOut);
    assert_eq!(session.submit_guess(target, deadline + Duration::from_millis(1)), RoundEvent::Ignored);
    assert!(session.current_round().timed_out());
    assert_eq!(session.total_score(), 0);
}

#[test]
fn late_guess_without_tick_resolves_as_timeout() {
    let catalog = LandmarkCatalog::warsaw();
    let t0 = Instant::now();
    let mut session = GameSession::start(&catalog, &options(1, Difficulty::Normal), &mut StdRng::seed_from_u64(8), t0).unwrap();

    let target = session.current_round().landmark().position;
    assert_eq!(session.submit_guess(target, t0 + Duration::from_secs(45)), RoundEvent::TimedOut);
    assert_eq!(session.total_score(), 0);
}

#[test]
fn total_matches_resolved_rounds_for_any_interleaving() {
    let catalog = LandmarkCatalog::warsaw();

    for seed in 0..25 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut now = Instant::now();
        let difficulty = Difficulty::ALL[seed as usize % 3];
        let mut session = GameSession::start(&catalog, &options(8, difficulty), &mut rng, now).unwrap();

        loop {
            assert_eq!(session.total_score(), resolved_sum(&session));

            // Random mix of guesses, timeouts, duplicate stimuli and premature advances
            for _ in 0..rng.random_range(1..5) {
                now += Duration::from_millis(rng.random_range(0..20_000));
                if rng.random_bool(0.6) {
                    let guess = Coordinate::new(rng.random_range(52.0..52.5), rng.random_range(20.7..21.3));
                    session.submit_guess(guess, now);
                } else {
                    session.tick(now);
                }
                assert_eq!(session.total_score(), resolved_sum(&session));
            }

            match session.advance(now) {
                Ok(Advance::NextRound(_)) => {}
                Ok(Advance::Completed(result)) => {
                    assert_eq!(result.total_score, resolved_sum(&session));
                    assert_eq!(result.total_score, result.rounds.iter().map(|round| round.score).sum::<u32>());
                    break;
                }
                Err(GameError::RoundInProgress) => {
                    assert!(!session.current_round().is_resolved());
                }
                Err(err) => panic!("unexpected error {err}"),
            }
        }
    }
}

#[test]
fn hard_difficulty_applies_bonus() {
    let target = Coordinate::new(52.2497, 21.0122);
    let guess = Coordinate::new(52.2497 + 5. / 111.195, 21.0122);
    let catalog = LandmarkCatalog::new(vec![Landmark::new(100, "Old Town Market Square", target)]);
    let t0 = Instant::now();

    let mut hard = GameSession::start(&catalog, &options(1, Difficulty::Hard), &mut StdRng::seed_from_u64(0), t0).unwrap();
    hard.submit_guess(guess, t0);

    let expected = ScoreModel::default().score(distance_km(guess, target), 1.15);
    assert_eq!(hard.total_score(), expected);
    assert!(hard.total_score() > 135);
}
