use thiserror::Error;

pub mod catalog;
pub mod config;
pub mod reveal;
pub mod round;
pub mod route;
mod session;
pub mod timer;

pub use session::*;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("requested {requested} landmarks, but only {available} are available")]
    InsufficientData { requested: usize, available: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("the current round has not been resolved yet")]
    RoundInProgress,

    #[error("the session has already finished")]
    SessionFinished,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
