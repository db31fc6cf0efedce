//! HTTP gateway for the voice assistant.
//!
//! The caller is identified by the `x-user-id` header, set by whatever
//! authenticates requests in front of this service. When a bearer token is
//! configured every `/api` request must carry it.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::assistant::{ErrorBody, VoiceAssistant, VoiceResponse};
use crate::config::ServerConfig;
use crate::error::TaskError;

/// Header naming the authenticated user.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
struct GatewayState {
    assistant: Arc<VoiceAssistant>,
    bearer_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoiceCommandBody {
    #[serde(default)]
    command: String,
}

/// Build the gateway router.
pub fn router(assistant: Arc<VoiceAssistant>, bearer_token: Option<String>) -> Router {
    let state = GatewayState {
        assistant,
        bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
    };
    Router::new()
        .route("/health", get(health))
        .route("/api/voice/command", post(voice_command))
        .route("/api/tasks", get(list_tasks))
        .route("/api/tasks/report", post(send_report))
        .with_state(state)
}

/// Bind `config.host:config.port` and serve until `cancel` fires.
///
/// # Errors
///
/// Bind or serve failures.
pub async fn serve(
    config: &ServerConfig,
    assistant: Arc<VoiceAssistant>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    let bearer = Some(config.bearer_token.clone());
    serve_on(listener, router(assistant, bearer), cancel).await
}

/// Serve `app` on an already-bound listener until `cancel` fires.
///
/// # Errors
///
/// Serve failures.
pub async fn serve_on(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!("gateway listening on http://{local_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    tracing::info!("gateway stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

fn bearer_is_valid(headers: &HeaderMap, expected: &Option<String>) -> bool {
    let Some(expected_token) = expected else {
        return true;
    };
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let candidate = header_value
        .strip_prefix("Bearer ")
        .unwrap_or_default()
        .trim();
    !expected_token.is_empty() && candidate == expected_token
}

fn error_json(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": {"code": code, "message": message},
        })),
    )
        .into_response()
}

fn task_error_response(err: &TaskError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "response": err.spoken_fallback(),
            "error": ErrorBody::from(err),
        })),
    )
        .into_response()
}

/// Check the bearer token and extract the user id.
fn authorize(state: &GatewayState, headers: &HeaderMap) -> Result<String, Response> {
    if !bearer_is_valid(headers, &state.bearer_token) {
        return Err(error_json(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "missing or invalid bearer token",
        ));
    }
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            error_json(
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "missing x-user-id header",
            )
        })
}

/// Voice replies are always 200 with something to speak.
async fn voice_command(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Result<Json<VoiceCommandBody>, JsonRejection>,
) -> Response {
    let user_id = match authorize(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let reply = match body {
        Ok(Json(body)) => state.assistant.handle_command(&user_id, &body.command).await,
        Err(rejection) => {
            tracing::warn!(user = %user_id, "unreadable voice command body: {}", rejection.body_text());
            VoiceResponse::failure(&TaskError::Validation(
                "the request did not contain a readable command".to_owned(),
            ))
        }
    };
    (StatusCode::OK, Json(reply)).into_response()
}

async fn list_tasks(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let user_id = match authorize(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.assistant.tasks(&user_id).await {
        Ok(tasks) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "tasks": tasks})),
        )
            .into_response(),
        Err(e) => task_error_response(&e),
    }
}

async fn send_report(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let user_id = match authorize(&state, &headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.assistant.send_report(&user_id).await {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "response": result.response_text,
                "taskCount": result.tasks.len(),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(user = %user_id, code = e.code(), "report request failed: {e}");
            task_error_response(&e)
        }
    }
}
