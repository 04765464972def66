// Personal Vault - HTTP surface
// JSON endpoints for the three record services, the gold quote, and the
// aggregate summary, plus the embedded dashboard page.

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::cash::{self, CashEntry, NewCash};
use crate::gold::{self, GoldEntry, NewGold};
use crate::gold_price::{GoldPriceClient, PriceQuote};
use crate::loans::{self, LoanEntry, NewLoan, ToggleLoan};
use crate::summary::{self, VaultSummary};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub gold_price: Arc<GoldPriceClient>,
}

impl AppState {
    pub fn new(conn: Connection, gold_price: GoldPriceClient) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            gold_price: Arc::new(gold_price),
        }
    }
}

/// Errors surfaced by the JSON handlers.
pub enum ApiError {
    /// Missing or malformed input. Reported to the client, never logged
    /// as a failure.
    BadRequest(String),
    /// Storage failure inside a handler.
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(err) => {
                error!("request failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

/// Body shared by the delete endpoints.
#[derive(Debug, Deserialize)]
struct DeleteRequest {
    id: Option<i64>,
}

/// Unwrap a JSON body, turning extractor rejections (bad syntax, wrong
/// field types, missing content type) into 400s.
fn require_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
    }
}

fn require_id(id: Option<i64>) -> Result<i64, ApiError> {
    id.ok_or_else(|| ApiError::BadRequest("ID is required".to_string()))
}

// ============================================================================
// Cash
// ============================================================================

async fn get_cash(State(state): State<AppState>) -> Result<Json<Vec<CashEntry>>, ApiError> {
    let conn = state.db.lock().unwrap();
    Ok(Json(cash::list_cash(&conn)?))
}

async fn create_cash(
    State(state): State<AppState>,
    body: Result<Json<NewCash>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let new = require_body(body)?;
    let amount = new.validate().map_err(|msg| ApiError::BadRequest(msg.to_string()))?;

    let conn = state.db.lock().unwrap();
    let id = cash::insert_cash(&conn, amount, new.currency.as_deref(), new.note.as_deref())?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn delete_cash(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = require_id(require_body(body)?.id)?;

    let conn = state.db.lock().unwrap();
    cash::delete_cash(&conn, id)?;
    Ok(Json(json!({ "ok": true })))
}

// ============================================================================
// Gold
// ============================================================================

async fn get_gold(State(state): State<AppState>) -> Result<Json<Vec<GoldEntry>>, ApiError> {
    let conn = state.db.lock().unwrap();
    Ok(Json(gold::list_gold(&conn)?))
}

async fn create_gold(
    State(state): State<AppState>,
    body: Result<Json<NewGold>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let new = require_body(body)?;
    let grams = new.validate().map_err(|msg| ApiError::BadRequest(msg.to_string()))?;

    let conn = state.db.lock().unwrap();
    let id = gold::insert_gold(&conn, grams, new.note.as_deref())?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn delete_gold(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = require_id(require_body(body)?.id)?;

    let conn = state.db.lock().unwrap();
    gold::delete_gold(&conn, id)?;
    Ok(Json(json!({ "ok": true })))
}

// ============================================================================
// Loans
// ============================================================================

async fn get_loans(State(state): State<AppState>) -> Result<Json<Vec<LoanEntry>>, ApiError> {
    let conn = state.db.lock().unwrap();
    Ok(Json(loans::list_loans(&conn)?))
}

async fn create_loan(
    State(state): State<AppState>,
    body: Result<Json<NewLoan>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let new = require_body(body)?;
    let (borrower_name, amount) = new
        .validate()
        .map_err(|msg| ApiError::BadRequest(msg.to_string()))?;

    let conn = state.db.lock().unwrap();
    let id = loans::insert_loan(&conn, borrower_name, amount, new.currency.as_deref())?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn toggle_loan(
    State(state): State<AppState>,
    body: Result<Json<ToggleLoan>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let toggle = require_body(body)?;
    let id = require_id(toggle.id)?;
    let returned = toggle.is_returned.unwrap_or(false);

    let conn = state.db.lock().unwrap();
    loans::set_loan_returned(&conn, id, returned)?;
    Ok(Json(json!({ "ok": true })))
}

async fn delete_loan(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = require_id(require_body(body)?.id)?;

    let conn = state.db.lock().unwrap();
    loans::delete_loan(&conn, id)?;
    Ok(Json(json!({ "ok": true })))
}

// ============================================================================
// Gold price & summary
// ============================================================================

/// GET /api/gold-price - current quote, cached or refreshed.
///
/// A hard failure (refresh failed, cold cache) answers 503 with a null
/// price so the client can fall back to manual entry.
async fn get_gold_price(State(state): State<AppState>) -> Response {
    match state.gold_price.current_price().await {
        Ok(quote) => Json(quote).into_response(),
        Err(err) => {
            warn!("gold price unavailable: {err:#}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Unable to fetch gold price. Enter manually.",
                    "price_per_gram": null,
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    #[serde(flatten)]
    totals: VaultSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<PriceQuote>,
}

/// GET /api/summary - totals over all three record sets plus the quote.
///
/// The price fetch runs concurrently with the table reads. A storage
/// error fails the whole request; an unavailable price only zeroes the
/// gold valuation.
async fn get_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiError> {
    let price_client = state.gold_price.clone();
    let price_task = tokio::spawn(async move { price_client.current_price().await });

    let (cash_entries, gold_entries, loan_entries) = {
        let conn = state.db.lock().unwrap();
        (
            cash::list_cash(&conn)?,
            gold::list_gold(&conn)?,
            loans::list_loans(&conn)?,
        )
    };

    let price = match price_task.await {
        Ok(Ok(quote)) => Some(quote),
        Ok(Err(err)) => {
            warn!("summary computed without a gold price: {err:#}");
            None
        }
        Err(err) => {
            error!("gold price task failed: {err}");
            None
        }
    };

    let totals = summary::summarize(
        &cash_entries,
        &gold_entries,
        &loan_entries,
        price.as_ref().map(|quote| quote.price_per_gram),
    );

    Ok(Json(SummaryResponse { totals, price }))
}

// ============================================================================
// Router
// ============================================================================

/// GET / - the embedded single-page dashboard.
async fn dashboard() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/cash",
            get(get_cash).post(create_cash).delete(delete_cash),
        )
        .route(
            "/gold",
            get(get_gold).post(create_gold).delete(delete_gold),
        )
        .route(
            "/loans",
            get(get_loans)
                .post(create_loan)
                .patch(toggle_loan)
                .delete(delete_loan),
        )
        .route("/gold-price", get(get_gold_price))
        .route("/summary", get(get_summary))
        .with_state(state);

    Router::new()
        .route("/", get(dashboard))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
}
