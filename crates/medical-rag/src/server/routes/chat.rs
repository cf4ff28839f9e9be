//! Chat page and chat endpoint

use axum::{
    extract::{rejection::FormRejection, Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::Result;
use crate::server::state::AppState;

/// Static chat page
const CHAT_PAGE: &str = include_str!("../../../templates/chat.html");

/// Reply for a request without a usable message
const EMPTY_MESSAGE_REPLY: &str = "Please type a question first.";

/// Chat request, from a form body or the query string
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// User message
    #[serde(default)]
    pub msg: String,
}

/// GET / - the chat page
pub async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// POST /chat - answer a form-encoded `msg`
///
/// A body that is not a form is treated like a missing message.
pub async fn chat_form(
    State(state): State<AppState>,
    request: std::result::Result<Form<ChatRequest>, FormRejection>,
) -> Result<Response> {
    match request {
        Ok(Form(request)) => answer(&state, &request.msg).await,
        Err(rejection) => {
            tracing::debug!("Unreadable chat form: {}", rejection);
            Ok((StatusCode::BAD_REQUEST, EMPTY_MESSAGE_REPLY).into_response())
        }
    }
}

/// GET /chat?msg= - answer a query-string `msg`
pub async fn chat_query(State(state): State<AppState>, Query(request): Query<ChatRequest>) -> Result<Response> {
    answer(&state, &request.msg).await
}

async fn answer(state: &AppState, msg: &str) -> Result<Response> {
    let msg = msg.trim();
    if msg.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, EMPTY_MESSAGE_REPLY).into_response());
    }

    tracing::info!("Chat message: \"{}\"", msg);

    let answer = state.chain().answer(msg).await?;

    let sources: Vec<String> = answer.context.iter().map(|record| record.source_ref()).collect();
    tracing::info!(
        "Response ({} ms, sources {:?}): {}",
        answer.processing_time_ms,
        sources,
        answer.answer
    );

    Ok(answer.answer.into_response())
}
