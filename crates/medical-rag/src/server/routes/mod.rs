//! Routes for the chat server

pub mod chat;

use axum::{routing::get, Router};

use crate::server::state::AppState;

/// Chat page and chat endpoint
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(chat::index))
        .route("/chat", get(chat::chat_query).post(chat::chat_form))
}
