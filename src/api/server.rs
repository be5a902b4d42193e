//! axum router, auth middleware and handlers.

use super::ApiError;
use crate::auth::{Claims, bearer_token, verify_token};
use crate::error::LedgerResult;
use crate::rewards::RewardEngine;
use crate::types::UserId;
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, Request, State, rejection::JsonRejection},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server state shared across handlers.
#[derive(Clone)]
pub struct ApiServer {
    engine: Arc<RewardEngine>,
    jwt_secret: Arc<[u8]>,
}

impl ApiServer {
    pub fn new(engine: Arc<RewardEngine>, jwt_secret: &str) -> Self {
        Self {
            engine,
            jwt_secret: Arc::from(jwt_secret.as_bytes()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteTaskRequest {
    #[serde(default)]
    task: String,
}

#[derive(Debug, Deserialize)]
struct SetReferrerRequest {
    #[serde(default)]
    referrer_id: UserId,
}

/// Run a blocking ledger call off the async executor.
async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> LedgerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("bad user id".to_string()))
}

/// Reject requests without a valid bearer token; stash the claims otherwise.
async fn require_bearer(
    State(state): State<ApiServer>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let verified = bearer_token(header).and_then(|token| verify_token(&state.jwt_secret, token));
    let claims = match verified {
        Ok(claims) => claims,
        Err(err) => return ApiError::from(err).into_response(),
    };

    request.extensions_mut().insert(claims);
    next.run(request).await
}

async fn health() -> &'static str {
    "ok"
}

async fn leaderboard(
    State(state): State<ApiServer>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Value>, ApiError> {
    // Garbage limits fall back to the default instead of failing
    let limit = query.limit.as_deref().and_then(|v| v.parse::<i64>().ok());
    let engine = Arc::clone(&state.engine);
    let entries = blocking(move || engine.leaderboard(limit)).await?;
    Ok(Json(json!({ "leaderboard": entries })))
}

async fn user_status(
    State(state): State<ApiServer>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id = parse_user_id(&id)?;
    claims.authorize(user_id)?;

    let engine = Arc::clone(&state.engine);
    let status = blocking(move || engine.status(user_id)).await?;
    Ok(Json(json!(status)))
}

async fn complete_task(
    State(state): State<ApiServer>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<CompleteTaskRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let user_id = parse_user_id(&id)?;
    claims.authorize(user_id)?;

    let task_code = match payload {
        Ok(Json(req)) if !req.task.trim().is_empty() => req.task,
        _ => return Err(ApiError::BadRequest("invalid body".to_string())),
    };

    let engine = Arc::clone(&state.engine);
    let outcome = blocking(move || engine.complete_task(user_id, &task_code)).await?;

    let status = if outcome.already_completed {
        "already_completed"
    } else {
        "ok"
    };
    Ok(Json(json!({ "status": status, "awarded": outcome.awarded })))
}

async fn set_referrer(
    State(state): State<ApiServer>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<SetReferrerRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let user_id = parse_user_id(&id)?;
    claims.authorize(user_id)?;

    let referrer_id = match payload {
        Ok(Json(req)) if req.referrer_id != 0 => req.referrer_id,
        _ => return Err(ApiError::BadRequest("invalid body".to_string())),
    };

    let engine = Arc::clone(&state.engine);
    let outcome = blocking(move || engine.set_referrer(user_id, referrer_id)).await?;

    Ok(Json(json!({
        "status": "ok",
        "bonus_to_referred": outcome.bonus_to_referred,
        "bonus_to_referrer": outcome.bonus_to_referrer,
    })))
}

/// Build the application router.
pub fn build_router(state: ApiServer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/users/leaderboard", get(leaderboard))
        .route("/users/{id}/status", get(user_status))
        .route("/users/{id}/task/complete", post(complete_task))
        .route("/users/{id}/referrer", post(set_referrer))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// A running server.
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

/// Bind `addr` and serve in the background.
///
/// Port 0 binds an ephemeral port; the handle reports the bound address.
pub async fn start_server(state: ApiServer, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Points ledger listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Points ledger shutting down");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr: bound_addr,
        shutdown_tx,
        task,
    })
}
