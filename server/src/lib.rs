pub mod game_endpoint;
pub mod server_state;
