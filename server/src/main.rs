use std::{fs::OpenOptions, net::SocketAddr, sync::Arc};

use landmark_guess_game::config::GameConfig;
use server::{
    game_endpoint,
    server_state::{self, ServerState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::fs::create_dir_all("server/log")?;
    let log_file = "server/log/server.log";

    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace,landmark_guess_game=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    tracing::info!("Starting server...");

    let config = GameConfig::from_env()?;
    let port = config.port;
    let server_state = Arc::new(ServerState::new(config));

    let state_clone = server_state.clone();
    tokio::spawn(async move {
        server_state::sweep_loop(state_clone).await;
    });

    let app = game_endpoint::router(server_state);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
