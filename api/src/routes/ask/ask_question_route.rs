//! POST /ask: forwards the question to the relay process.

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::{error, info};

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    routes::ask::ask_request::{AskRequest, AskResponse},
};

/// Handler: POST /ask
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:3001/ask \
///   -H 'content-type: application/json' \
///   -d '{"question":"What is my dog'\''s name?"}'
/// ```
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> AppResult<Json<AskResponse>> {
    let Json(body) = payload?;
    info!(question_len = body.question.len(), "ask received");

    let answer = state.relay.ask(&body.question).await.map_err(|e| {
        error!(error = %e, "relay failed");
        e
    })?;

    Ok(Json(AskResponse { answer }))
}
