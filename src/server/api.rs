use crate::agent::PostAgent;
use crate::auth::{ AuthUser, IdentityVerifier };
use crate::error::{ ApiError, ApiResult };
use crate::models::chat::{ ChatMessage, ConversationSummary };
use crate::models::generate::{ GenerateRequest, GenerateResponse };
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ FromRef, Path, State },
    extract::rejection::JsonRejection,
};
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

pub const HEALTH_MESSAGE: &str = "Social post generator API is running";

/// Process-wide collaborator handles, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub agent: Arc<PostAgent>,
}

impl AppState {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, agent: Arc<PostAgent>) -> Self {
        Self { verifier, agent }
    }
}

impl FromRef<AppState> for Arc<dyn IdentityVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_handler))
        .route("/history", get(history_handler))
        .route("/chat/{chat_id}", get(chat_handler))
        .route("/generate", post(generate_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    HEALTH_MESSAGE
}

async fn history_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let chats = state.agent.history(&user.uid).await.map_err(|e| {
        error!("Error fetching history for {}: {}", user.uid, e);
        ApiError::Fetch("chat history")
    })?;
    info!("Listed {} conversations for {}", chats.len(), user.uid);
    Ok(Json(chats))
}

async fn chat_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let messages = state.agent.messages(&user.uid, &chat_id).await.map_err(|e| {
        error!("Error fetching messages of {} for {}: {}", chat_id, user.uid, e);
        ApiError::Fetch("chat messages")
    })?;
    Ok(Json(messages))
}

async fn generate_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let brief = body
        .ok()
        .and_then(|Json(req)| req.into_brief())
        .ok_or_else(|| {
            warn!("Rejected generate request from {}: missing fields", user.uid);
            ApiError::Validation
        })?;

    info!("Generating {} post for {}", brief.platform, user.uid);
    let generated = state.agent.generate(&user.uid, &brief).await.map_err(|e| {
        error!("Error generating content for {}: {}", user.uid, e);
        ApiError::Generation(e.to_string())
    })?;
    Ok(Json(generated))
}
