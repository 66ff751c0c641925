//! Billiards server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod config;
pub mod lobby;
pub mod room;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use config::ServerConfig;
use lobby::Lobby;
use ws::AppState;

/// Build the axum router: one lobby socket plus one socket route per room.
pub fn app(config: ServerConfig) -> Router {
    let app_state = AppState { lobby: Lobby::new(config) };
    Router::new()
        .route("/ws", get(ws::lobby_handler))
        .route("/rooms/{id}", get(ws::room_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
