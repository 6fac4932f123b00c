//! HTTP surface for the messaging transport and the web dashboard.
//!
//! * `POST /webhook` `{from, text, message_id?}` → `{reply}`
//! * `POST /chat` `{number, message}` → `{response}`
//! * `POST /otp/verify` `{number, code}` → `{valid, user_id}`
//! * `GET /health` → `{status}`

use super::{BotData, InboundMessage, respond};
use crate::{
    core::otp::{self, VerifyResult},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

type AppState = Arc<BotData>;

#[derive(Serialize)]
struct WebhookResponse {
    reply: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    number: String,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct VerifyRequest {
    number: String,
    code: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    valid: bool,
    user_id: Option<i64>,
}

async fn webhook(
    State(state): State<AppState>,
    Json(message): Json<InboundMessage>,
) -> Json<WebhookResponse> {
    let reply = respond(&state, &message, chrono::Utc::now()).await;
    Json(WebhookResponse { reply })
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    let message = InboundMessage {
        from: req.number,
        text: req.message,
        message_id: None,
    };
    let response = respond(&state, &message, chrono::Utc::now()).await;
    Json(ChatResponse { response })
}

async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> impl IntoResponse {
    match otp::verify_for_number(&state.database, &req.number, &req.code, chrono::Utc::now()).await
    {
        Ok(VerifyResult::Valid(user_id)) => (
            StatusCode::OK,
            Json(json!(VerifyResponse {
                valid: true,
                user_id: Some(user_id),
            })),
        ),
        Ok(VerifyResult::Invalid) => (
            StatusCode::OK,
            Json(json!(VerifyResponse {
                valid: false,
                user_id: None,
            })),
        ),
        Err(e) => {
            error!("Code verification failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"description": "Internal server error."})),
            )
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/chat", post(chat))
        .route("/otp/verify", post(verify_code))
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves the router on an already bound listener.
pub async fn serve_listener(listener: TcpListener, state: AppState) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Binds `bind_address` and serves until the process stops.
pub async fn start_http_server(state: AppState) -> Result<()> {
    let listener = TcpListener::bind(&state.settings.bind_address).await?;
    serve_listener(listener, state).await
}
