// 🌐 HTTP API - axum router over the prediction, reminder and account services
//
// Every ServiceError is turned into a JSON response here; nothing escapes
// the request boundary as a crash.

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::accounts::AccountService;
use crate::config::ServerConfig;
use crate::db::Database;
use crate::entities::{NewAccount, UpdateAccount};
use crate::error::{ServiceError, ServiceResult};
use crate::prediction::PredictionService;
use crate::reminders::ReminderService;
use crate::scoring::{load_scorer, Scorer};

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// Services shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub predictions: PredictionService,
    pub reminders: ReminderService,
    pub accounts: AccountService,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(db: Database, scorer: Arc<dyn Scorer>, request_timeout: Duration) -> Self {
        let db = db.with_write_timeout(request_timeout);
        AppState {
            predictions: PredictionService::new(db.clone(), scorer),
            reminders: ReminderService::new(db.clone()),
            accounts: AccountService::new(db),
            request_timeout,
        }
    }

    /// Load the scoring artifact and open the store
    ///
    /// A missing artifact is fatal: the server must not start without a model.
    pub fn initialize(config: &ServerConfig) -> Result<Self> {
        let scorer = load_scorer(&config.model_path)
            .with_context(|| format!("Cannot start without a scoring model ({:?})", config.model_path))?;

        let db = Database::open(&config.store.database_url)?;

        Ok(AppState::new(db, scorer, config.request_timeout()))
    }
}

fn join_failed(join_error: tokio::task::JoinError) -> ServiceError {
    ServiceError::unexpected(format!("store worker failed: {}", join_error))
}

/// Run a blocking store read off the async runtime, bounded by `timeout`
async fn run_read<T, F>(timeout: Duration, f: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(join_failed(join_error)),
        Err(_) => Err(ServiceError::unexpected(format!(
            "store call timed out after {:?}",
            timeout
        ))),
    }
}

/// Run a blocking store write off the async runtime and wait for its outcome
///
/// The deadline is enforced by `Database::write` before the write starts, so
/// an error response always means nothing was committed.
async fn run_write<T, F>(f: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(join_failed)?
}

// ============================================================================
// ERROR RESPONSES
// ============================================================================

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match &self {
            ServiceError::Validation(message) => {
                warn!(error = %message, "rejected request");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ServiceError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ServiceError::Storage(source) => {
                error!(error = %source, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Database error.", "details": source.to_string() })),
                )
                    .into_response()
            }
            ServiceError::Unexpected(details) => {
                error!(error = %details, "unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Unexpected error.", "details": details })),
                )
                    .into_response()
            }
        }
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ServiceResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServiceError::validation(rejection.body_text()))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "Server is running!" }))
}

/// POST /accounts/:account_id/predict_payment
async fn predict_payment(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let body = json_body(body)
        .map_err(|_| ServiceError::validation("Fields \"valor\" and \"due_date\" are required."))?;

    let service = state.predictions.clone();
    let result = run_write(move || service.predict_json(&account_id, &body)).await?;

    Ok(Json(result))
}

/// GET /reminders
async fn list_reminders(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let service = state.reminders.clone();
    let reminders = run_read(state.request_timeout, move || service.list_reminders()).await?;

    Ok(Json(json!({ "reminders": reminders })))
}

/// GET /reminders/:account_id
async fn get_reminder(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let service = state.reminders.clone();
    let reminder =
        run_read(state.request_timeout, move || service.get_reminder(&account_id)).await?;

    Ok(Json(reminder))
}

/// POST /accounts
async fn create_account(
    State(state): State<AppState>,
    body: Result<Json<NewAccount>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let payload = json_body(body)?;

    let service = state.accounts.clone();
    let account = run_write(move || service.create_account(payload)).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /accounts
async fn list_accounts(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let service = state.accounts.clone();
    let accounts = run_read(state.request_timeout, move || service.list_accounts()).await?;

    Ok(Json(json!({ "accounts": accounts })))
}

/// GET /accounts/:account_id
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let service = state.accounts.clone();
    let account =
        run_read(state.request_timeout, move || service.get_account(&account_id)).await?;

    Ok(Json(account))
}

/// PATCH /accounts/:account_id
async fn update_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    body: Result<Json<UpdateAccount>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let changes = json_body(body)?;

    let service = state.accounts.clone();
    let account = run_write(move || service.update(&account_id, &changes)).await?;

    Ok(Json(account))
}

/// DELETE /accounts/:account_id
async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let service = state.accounts.clone();
    run_write(move || service.delete(&account_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /accounts/:account_id/predictions
async fn list_predictions(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let service = state.accounts.clone();
    let predictions =
        run_read(state.request_timeout, move || service.predictions(&account_id)).await?;

    Ok(Json(json!({ "predictions": predictions })))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:account_id",
            get(get_account).patch(update_account).delete(delete_account),
        )
        .route("/accounts/:account_id/predict_payment", post(predict_payment))
        .route("/accounts/:account_id/predictions", get(list_predictions))
        .route("/reminders", get(list_reminders))
        .route("/reminders/:account_id", get(get_reminder))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
