//! Assistant routes.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireSuperAdmin;
use crate::services::{AssistantContext, greeting};
use crate::state::AppState;

/// Build the assistant router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/assistant", get(open).post(ask))
}

#[derive(Debug, Serialize)]
pub struct GreetingResponse {
    pub greeting: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Opening line, sized to the cached collection.
async fn open(
    RequireSuperAdmin(_session): RequireSuperAdmin,
    State(state): State<AppState>,
) -> Json<GreetingResponse> {
    let users = state.sync().users().await;
    Json(GreetingResponse {
        greeting: greeting(users.len()),
    })
}

/// Answer a question about the current dashboard.
///
/// Generator failures come back as the fallback answer, not as an error.
#[instrument(skip_all)]
async fn ask(
    RequireSuperAdmin(_session): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest("Question is required".to_string()));
    }

    let users = state.sync().users().await;
    let snapshot = state.metrics().snapshot(&users);
    let context = AssistantContext::new(&snapshot.metrics, &users);

    let answer = state.assistant().ask(question, &context).await;
    Ok(Json(AskResponse { answer }))
}
