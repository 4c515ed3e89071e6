use std::{
    collections::HashMap,
    sync::atomic::{AtomicI64, Ordering},
    time::{Duration, Instant},
};

use landmark_guess_game::{
    GameError, GameSession, RoundView, SessionOptions, catalog::LandmarkCatalog, config::GameConfig,
    route::{PendingRoute, RouteClient},
};
use rand::rngs::StdRng;
use tokio::sync::Mutex;

/// Games nobody has touched for this long are dropped by the sweeper.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub struct HostedGame {
    pub session: GameSession,
    // Route lookup for the current round, if the player guessed
    pub route: Option<PendingRoute>,
    pub last_seen: Instant,
}

impl HostedGame {
    pub fn new(session: GameSession, now: Instant) -> Self {
        Self {
            session,
            route: None,
            last_seen: now,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
        self.session.tick(now);
    }
}

pub struct ServerState {
    pub games: Mutex<HashMap<i64, HostedGame>>,
    pub catalog: LandmarkCatalog,
    pub config: GameConfig,
    pub routes: RouteClient,
    next_game_id: AtomicI64,
    rng: Mutex<StdRng>,
}

impl ServerState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            catalog: LandmarkCatalog::warsaw(),
            routes: RouteClient::new(config.route_base_url.clone(), config.route_timeout),
            next_game_id: AtomicI64::new(1),
            rng: Mutex::new(config.rng()),
            config,
        }
    }

    pub async fn create_game(&self, options: &SessionOptions, now: Instant) -> Result<(i64, RoundView), GameError> {
        let session = {
            let mut rng = self.rng.lock().await;
            GameSession::start(&self.catalog, options, &mut *rng, now)?
        };

        let game_id = self.next_game_id.fetch_add(1, Ordering::Relaxed);
        let view = session.view(now);

        self.games.lock().await.insert(game_id, HostedGame::new(session, now));
        tracing::info!("Created game {}", game_id);

        Ok((game_id, view))
    }

    pub async fn remove_game(&self, game_id: i64) -> bool {
        self.games.lock().await.remove(&game_id).is_some()
    }

    /// Resolves expired rounds and drops idle games.
    pub async fn sweep(&self, now: Instant) {
        let mut games = self.games.lock().await;

        for game in games.values_mut() {
            game.session.tick(now);
        }

        let before = games.len();
        games.retain(|_, game| now.saturating_duration_since(game.last_seen) < IDLE_TIMEOUT);

        let dropped = before - games.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} idle games", dropped);
        }
    }
}

pub async fn sweep_loop(state: std::sync::Arc<ServerState>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        state.sweep(Instant::now()).await;
    }
}

#[cfg(test)]
fn test_state() -> ServerState {
    let mut config = GameConfig::default();
    config.seed = Some(11);
    config.route_base_url = "http://127.0.0.1:9".to_string();
    config.route_timeout = Duration::from_millis(100);
    ServerState::new(config)
}

#[tokio::test]
async fn create_and_remove_game() {
    let state = test_state();
    let now = Instant::now();

    let (first, view) = state.create_game(&SessionOptions::default(), now).await.unwrap();
    let (second, _) = state.create_game(&SessionOptions::default(), now).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(view.round_number, 1);
    assert_eq!(view.round_count, 10);
    assert!(view.true_position.is_none());

    assert!(state.remove_game(first).await);
    assert!(!state.remove_game(first).await);
    assert_eq!(state.games.lock().await.len(), 1);
}

#[tokio::test]
async fn create_game_rejects_oversized_sessions() {
    let state = test_state();
    let options = SessionOptions {
        rounds: 511,
        ..SessionOptions::default()
    };

    let result = state.create_game(&options, Instant::now()).await;
    assert!(matches!(result, Err(GameError::InsufficientData { requested: 511, available: 510 })));
    assert!(state.games.lock().await.is_empty());
}

#[tokio::test]
async fn sweep_expires_rounds_and_drops_idle_games() {
    let state = test_state();
    let start = Instant::now();
    let options = SessionOptions {
        seconds_per_round: 5,
        ..SessionOptions::default()
    };

    let (stale, _) = state.create_game(&options, start).await.unwrap();
    let (fresh, _) = state.create_game(&options, start).await.unwrap();

    let later = start + Duration::from_secs(6);
    state.sweep(later).await;
    {
        let games = state.games.lock().await;
        assert!(games[&stale].session.current_round().timed_out());
        assert!(games[&fresh].session.current_round().timed_out());
    }

    let much_later = start + IDLE_TIMEOUT + Duration::from_secs(1);
    state.games.lock().await.get_mut(&fresh).unwrap().touch(much_later);
    state.sweep(much_later).await;

    let games = state.games.lock().await;
    assert!(!games.contains_key(&stale));
    assert!(games.contains_key(&fresh));
}
