use std::{sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use landmark_guess_game::{
    Advance, GameError, RoundView, SessionOptions,
    config::clamp_round_seconds,
    route::RevealPath,
};
use landmark_guess_lib::{coordinate::Coordinate, difficulty::Difficulty, results::GameResult};
use serde::{Deserialize, Serialize};

use crate::server_state::{HostedGame, ServerState};

pub type ApiError = (StatusCode, String);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRequest {
    pub rounds: Option<usize>,
    pub difficulty: Option<Difficulty>,
    pub seconds_per_round: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGame {
    pub game_id: i64,
    pub view: GameView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    #[serde(flatten)]
    pub round: RoundView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathView>,
}

/// Line drawn between guess and truth once a guess is in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathView {
    pub routed: bool,
    pub points: Vec<Coordinate>,
    pub distance_km: f64,
}

impl From<RevealPath> for PathView {
    fn from(path: RevealPath) -> Self {
        Self {
            routed: path.is_route(),
            points: path.points(),
            distance_km: path.distance_km(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum NextResponse {
    Round(GameView),
    Completed { result: GameResult },
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{game_id}", get(get_game).delete(delete_game))
        .route("/games/{game_id}/guess", post(submit_guess))
        .route("/games/{game_id}/next", post(next_round))
        .with_state(state)
}

pub fn error_status(err: &GameError) -> StatusCode {
    match err {
        GameError::InsufficientData { .. } | GameError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GameError::RoundInProgress | GameError::SessionFinished => StatusCode::CONFLICT,
        GameError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: GameError) -> ApiError {
    (error_status(&err), err.to_string())
}

fn not_found(game_id: i64) -> ApiError {
    (StatusCode::NOT_FOUND, format!("No game with id {game_id}"))
}

fn game_view(game: &mut HostedGame, now: Instant) -> GameView {
    let round = game.session.view(now);

    let path = match (&mut game.route, round.guess_position, round.true_position) {
        (Some(pending), _, _) => Some(pending.reveal().into()),
        (None, Some(guess), Some(truth)) => Some(RevealPath::direct(guess, truth).into()),
        _ => None,
    };

    GameView { round, path }
}

pub async fn create_game(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<NewGameRequest>,
) -> Result<Json<CreatedGame>, ApiError> {
    let defaults = state.config.session_options();
    let options = SessionOptions {
        rounds: request.rounds.unwrap_or(defaults.rounds),
        difficulty: request.difficulty.unwrap_or(defaults.difficulty),
        seconds_per_round: request
            .seconds_per_round
            .map(clamp_round_seconds)
            .unwrap_or(defaults.seconds_per_round),
        scoring: defaults.scoring,
    };

    let now = Instant::now();
    let (game_id, round) = state.create_game(&options, now).await.map_err(|err| {
        tracing::warn!("Failed to create game: {err}");
        api_error(err)
    })?;

    Ok(Json(CreatedGame {
        game_id,
        view: GameView { round, path: None },
    }))
}

pub async fn get_game(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<i64>,
) -> Result<Json<GameView>, ApiError> {
    let now = Instant::now();
    let mut games = state.games.lock().await;
    let game = games.get_mut(&game_id).ok_or_else(|| not_found(game_id))?;

    game.touch(now);
    Ok(Json(game_view(game, now)))
}

pub async fn submit_guess(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<i64>,
    Json(guess): Json<Coordinate>,
) -> Result<Json<GameView>, ApiError> {
    let now = Instant::now();
    let mut games = state.games.lock().await;
    let game = games.get_mut(&game_id).ok_or_else(|| not_found(game_id))?;

    game.last_seen = now;
    let event = game.session.submit_guess(guess, now);

    if event.is_ignored() {
        tracing::debug!("Game {}: guess {:?} ignored", game_id, guess);
    } else if let Some(guess) = game.session.current_round().guess() {
        let truth = game.session.current_round().landmark().position;
        game.route = Some(state.routes.spawn(guess, truth));
    }

    Ok(Json(game_view(game, now)))
}

pub async fn next_round(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<i64>,
) -> Result<Json<NextResponse>, ApiError> {
    let now = Instant::now();
    let mut games = state.games.lock().await;
    let game = games.get_mut(&game_id).ok_or_else(|| not_found(game_id))?;

    game.touch(now);
    match game.session.advance(now).map_err(api_error)? {
        Advance::NextRound(_) => {
            // Dropping the lookup aborts it
            game.route = None;
            Ok(Json(NextResponse::Round(game_view(game, now))))
        }
        Advance::Completed(result) => {
            games.remove(&game_id);
            tracing::info!("Game {} finished with {} points", game_id, result.total_score);
            Ok(Json(NextResponse::Completed { result }))
        }
    }
}

pub async fn delete_game(State(state): State<Arc<ServerState>>, Path(game_id): Path<i64>) -> StatusCode {
    if state.remove_game(game_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[cfg(test)]
fn test_state() -> Arc<ServerState> {
    let mut config = landmark_guess_game::config::GameConfig::default();
    config.seed = Some(5);
    config.rounds = 2;
    config.route_base_url = "http://127.0.0.1:9".to_string();
    config.route_timeout = std::time::Duration::from_millis(100);
    Arc::new(ServerState::new(config))
}

#[cfg(test)]
async fn landmark_position(state: &ServerState, game_id: i64) -> Coordinate {
    state.games.lock().await[&game_id].session.current_round().landmark().position
}

#[tokio::test]
async fn full_game_over_the_api() {
    let state = test_state();

    let Json(created) = create_game(State(state.clone()), Json(NewGameRequest::default())).await.unwrap();
    let game_id = created.game_id;
    assert_eq!(created.view.round.round_count, 2);
    assert!(created.view.path.is_none());

    for round in 1..=2 {
        let truth = landmark_position(&state, game_id).await;
        let Json(view) = submit_guess(State(state.clone()), Path(game_id), Json(truth)).await.unwrap();

        assert_eq!(view.round.round_number, round);
        assert!(view.round.solution_visible);
        assert_eq!(view.round.round_score, Some(1000));
        assert_eq!(view.round.true_position, Some(truth));
        let path = view.path.unwrap();
        assert!(!path.routed);
        assert_eq!(path.points, vec![truth, truth]);

        let Json(next) = next_round(State(state.clone()), Path(game_id)).await.unwrap();
        match next {
            NextResponse::Round(view) => {
                assert_eq!(round, 1);
                assert_eq!(view.round.round_number, 2);
                assert!(view.path.is_none());
            }
            NextResponse::Completed { result } => {
                assert_eq!(round, 2);
                assert_eq!(result.total_score, 2000);
                assert_eq!(result.rounds.len(), 2);
            }
        }
    }

    let missing = get_game(State(state.clone()), Path(game_id)).await.unwrap_err();
    assert_eq!(missing.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn next_before_guess_conflicts() {
    let state = test_state();
    let Json(created) = create_game(State(state.clone()), Json(NewGameRequest::default())).await.unwrap();

    let err = next_round(State(state.clone()), Path(created.game_id)).await.unwrap_err();
    assert_eq!(err.0, StatusCode::CONFLICT);

    let Json(view) = get_game(State(state.clone()), Path(created.game_id)).await.unwrap();
    assert!(!view.round.solution_visible);
    assert!(view.round.true_position.is_none());
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let state = test_state();

    let request = NewGameRequest {
        rounds: Some(600),
        ..NewGameRequest::default()
    };
    let err = create_game(State(state.clone()), Json(request)).await.unwrap_err();
    assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);

    let request = NewGameRequest {
        rounds: Some(0),
        ..NewGameRequest::default()
    };
    let err = create_game(State(state.clone()), Json(request)).await.unwrap_err();
    assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);

    let err = submit_guess(State(state.clone()), Path(42), Json(Coordinate::new(52.2, 21.0)))
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
    assert_eq!(delete_game(State(state.clone()), Path(42)).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn round_seconds_are_clamped() {
    let state = test_state();
    let request = NewGameRequest {
        seconds_per_round: Some(500.),
        difficulty: Some(Difficulty::Hard),
        ..NewGameRequest::default()
    };

    let Json(created) = create_game(State(state.clone()), Json(request)).await.unwrap();
    assert!(created.view.round.remaining_ms <= 60_000);
    assert!(created.view.round.remaining_ms > 55_000);

    let games = state.games.lock().await;
    assert_eq!(games[&created.game_id].session.difficulty(), Difficulty::Hard);
}

#[tokio::test]
async fn invalid_guess_is_ignored_and_delete_discards() {
    let state = test_state();
    let Json(created) = create_game(State(state.clone()), Json(NewGameRequest::default())).await.unwrap();

    let Json(view) = submit_guess(State(state.clone()), Path(created.game_id), Json(Coordinate::new(120., 21.)))
        .await
        .unwrap();
    assert!(!view.round.solution_visible);
    assert!(view.path.is_none());

    assert_eq!(delete_game(State(state.clone()), Path(created.game_id)).await, StatusCode::NO_CONTENT);
    assert!(state.games.lock().await.is_empty());
}

#[test]
fn next_response_shapes() {
    let result = GameResult {
        total_score: 135,
        difficulty: Difficulty::Normal,
        rounds: Vec::new(),
        finished_at: chrono::DateTime::from_timestamp(0, 0).unwrap(),
    };

    let json = serde_json::to_value(NextResponse::Completed { result }).unwrap();
    assert_eq!(json["result"]["totalScore"], 135);
    assert_eq!(json["result"]["difficulty"], "normal");
}
