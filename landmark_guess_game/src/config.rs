use std::{path::Path, time::Duration};

use landmark_guess_lib::{
    difficulty::Difficulty,
    score::{MAX_SCORE_LIMIT, ScoreModel},
};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    route::{DEFAULT_ROUTE_BASE_URL, DEFAULT_ROUTE_TIMEOUT},
    GameError, SessionOptions,
};

pub const CONFIG_PATH_ENV: &str = "LANDMARK_GUESS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "landmark_guess.conf";
pub const ENV_PREFIX: &str = "LANDMARK_GUESS_";

pub const DEFAULT_ROUNDS: usize = 10;
pub const DEFAULT_ROUND_SECONDS: u32 = 30;
pub const MIN_ROUND_SECONDS: u32 = 5;
pub const MAX_ROUND_SECONDS: u32 = 60;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub rounds: usize,
    pub seconds_per_round: u32,
    pub difficulty: Difficulty,
    pub scoring: ScoreModel,
    pub route_base_url: String,
    pub route_timeout: Duration,
    pub seed: Option<u64>,
    pub port: u16,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            seconds_per_round: DEFAULT_ROUND_SECONDS,
            difficulty: Difficulty::default(),
            scoring: ScoreModel::default(),
            route_base_url: DEFAULT_ROUTE_BASE_URL.to_string(),
            route_timeout: DEFAULT_ROUTE_TIMEOUT,
            seed: None,
            port: DEFAULT_PORT,
        }
    }
}

impl GameConfig {
    /// Defaults overlaid with `key = value` lines. Bad lines are logged and skipped.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        config.apply(text);
        config
    }

    pub fn apply(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!("Ignoring config line without `=`: {}", line);
                continue;
            };

            self.set(key.trim(), value.trim());
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "rounds" => match value.parse::<usize>() {
                Ok(rounds) if rounds > 0 => self.rounds = rounds,
                _ => tracing::warn!("Invalid rounds `{}`, keeping {}", value, self.rounds),
            },
            "seconds_per_round" => self.seconds_per_round = parse_round_seconds(value),
            "difficulty" => match value.parse() {
                Ok(difficulty) => self.difficulty = difficulty,
                Err(err) => tracing::warn!("{err}, keeping {}", self.difficulty),
            },
            "decay_km" => match value.parse::<f64>() {
                Ok(decay) if decay.is_finite() && decay > 0. => self.scoring.decay_km = decay,
                _ => tracing::warn!("Invalid decay_km `{}`, keeping {}", value, self.scoring.decay_km),
            },
            "max_score" => match value.parse::<u32>() {
                Ok(max_score) if max_score <= MAX_SCORE_LIMIT => self.scoring.max_score = max_score,
                _ => tracing::warn!("Invalid max_score `{}`, keeping {}", value, self.scoring.max_score),
            },
            "hard_multiplier" => match value.parse::<f64>() {
                Ok(multiplier) if multiplier.is_finite() && multiplier >= 0. => self.scoring.hard_multiplier = multiplier,
                _ => tracing::warn!("Invalid hard_multiplier `{}`, keeping {}", value, self.scoring.hard_multiplier),
            },
            "route_base_url" => self.route_base_url = value.to_string(),
            "route_timeout_ms" => match value.parse::<u64>() {
                Ok(ms) => self.route_timeout = Duration::from_millis(ms),
                Err(_) => tracing::warn!("Invalid route_timeout_ms `{}`", value),
            },
            "seed" => match value.parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => tracing::warn!("Invalid seed `{}`", value),
            },
            "port" => match value.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Invalid port `{}`, keeping {}", value, self.port),
            },
            _ => tracing::warn!("Unknown config key: {}", key),
        }
    }

    /// Reads a config file. A missing file is not an error, it just means defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(Self::parse(&text))
    }

    /// `LANDMARK_GUESS_<KEY>` variables, applied on top of the current values.
    pub fn apply_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if name == CONFIG_PATH_ENV {
                continue;
            }
            self.set(&key.to_ascii_lowercase(), value.trim());
        }
    }

    /// Defaults, then the config file, then the environment.
    pub fn from_env() -> Result<Self, GameError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(path)?;
        config.apply_env(std::env::vars());
        Ok(config)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            rounds: self.rounds,
            difficulty: self.difficulty,
            seconds_per_round: self.seconds_per_round,
            scoring: self.scoring,
        }
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

pub fn clamp_round_seconds(seconds: f64) -> u32 {
    if seconds.is_nan() {
        return DEFAULT_ROUND_SECONDS;
    }
    seconds.round().clamp(MIN_ROUND_SECONDS.into(), MAX_ROUND_SECONDS.into()) as u32
}

/// Round duration from user text, clamped into range. Unreadable input falls back to the default.
pub fn parse_round_seconds(value: &str) -> u32 {
    match value.trim().parse::<f64>() {
        Ok(seconds) if !seconds.is_nan() => clamp_round_seconds(seconds),
        _ => {
            tracing::warn!("Invalid round duration `{}`, using {}s", value, DEFAULT_ROUND_SECONDS);
            DEFAULT_ROUND_SECONDS
        }
    }
}

#[test]
fn parse_config_file() {
    let config = GameConfig::parse(
        "
        # Warsaw evening league
        rounds = 5
        seconds_per_round = 20
        difficulty = hard
        decay_km = 5
        max_score = 5000
        route_timeout_ms = 1500
        seed = 99
        port = 8080
        ",
    );

    assert_eq!(config.rounds, 5);
    assert_eq!(config.seconds_per_round, 20);
    assert_eq!(config.difficulty, Difficulty::Hard);
    assert_eq!(config.scoring.decay_km, 5.);
    assert_eq!(config.scoring.max_score, 5000);
    assert_eq!(config.scoring.hard_multiplier, 1.15);
    assert_eq!(config.route_timeout, Duration::from_millis(1500));
    assert_eq!(config.seed, Some(99));
    assert_eq!(config.port, 8080);
}

#[test]
fn bad_lines_keep_defaults() {
    let config = GameConfig::parse(
        "
        rounds = 0
        difficulty = impossible
        decay_km = -1
        no equals sign here
        colour = blue
        ",
    );

    assert_eq!(config, GameConfig::default());
}

#[test]
fn round_seconds_are_clamped() {
    assert_eq!(parse_round_seconds("12"), 12);
    assert_eq!(parse_round_seconds("2"), MIN_ROUND_SECONDS);
    assert_eq!(parse_round_seconds("-40"), MIN_ROUND_SECONDS);
    assert_eq!(parse_round_seconds("600"), MAX_ROUND_SECONDS);
    assert_eq!(parse_round_seconds("17.6"), 18);
    assert_eq!(parse_round_seconds("inf"), MAX_ROUND_SECONDS);
    assert_eq!(parse_round_seconds("soon"), DEFAULT_ROUND_SECONDS);
    assert_eq!(parse_round_seconds(""), DEFAULT_ROUND_SECONDS);
    assert_eq!(clamp_round_seconds(f64::NAN), DEFAULT_ROUND_SECONDS);
}

#[test]
fn environment_overrides() {
    let mut config = GameConfig::default();
    config.apply_env([
        ("LANDMARK_GUESS_ROUNDS".to_string(), "3".to_string()),
        ("LANDMARK_GUESS_DIFFICULTY".to_string(), "easy".to_string()),
        ("LANDMARK_GUESS_CONFIG".to_string(), "elsewhere.conf".to_string()),
        ("PATH".to_string(), "/usr/bin".to_string()),
    ]);

    assert_eq!(config.rounds, 3);
    assert_eq!(config.difficulty, Difficulty::Easy);
}

#[test]
fn missing_file_is_default() {
    let config = GameConfig::load("definitely/not/here.conf").unwrap();
    assert_eq!(config, GameConfig::default());
}

#[test]
fn seeded_rng_is_deterministic() {
    use rand::Rng;

    let config = GameConfig {
        seed: Some(5),
        ..GameConfig::default()
    };
    assert_eq!(config.rng().random::<u64>(), config.rng().random::<u64>());
}

#[test]
fn oversized_max_score_is_rejected() {
    let config = GameConfig::parse("max_score = 4000000000\nrounds = 2");
    assert_eq!(config.scoring.max_score, ScoreModel::default().max_score);
    assert_eq!(config.rounds, 2);

    let config = GameConfig::parse(&format!("max_score = {MAX_SCORE_LIMIT}"));
    assert_eq!(config.scoring.max_score, MAX_SCORE_LIMIT);
}
