//! Axum router and all HTTP handlers.
//!
//! `build_router` is the single entry point; `main.rs` attaches the tracing
//! layer so tests can drive the bare router.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};

use super::api_types::{
    AccountStatusResponse, AdjustmentQuery, Envelope, ErrorBody, HealthResponse, PositionsQuery,
    SequenceRequest,
};
use super::state::AppState;
use crate::adjustment::{AdjustOptions, AdjustmentRequest};
use crate::allocation::{find_minimum_error, AllocationProblem};
use crate::common::errors::GatewayError;
use crate::ordering::{sort_orders, OrderAttribute};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/v1/positions", get(positions))
        .route("/v1/quotes", post(quotes))
        .route("/v1/quotes/:symbol", get(quote))
        .route("/v1/account/status", get(account_status))
        .route("/v1/adjustments", post(adjustments))
        .route("/v1/allocations", post(allocations))
        .route("/v1/orders/sequence", post(sequence_orders))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error response rendered as `{ "detail": ... }`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::InvalidRequest(_)
            | GatewayError::UnknownAttribute { .. }
            | GatewayError::JsonParse(_) => StatusCode::BAD_REQUEST,
            GatewayError::ReadOnly => StatusCode::FORBIDDEN,
            GatewayError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Configuration(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_GATEWAY,
        };
        let detail = match err {
            GatewayError::InvalidRequest(detail) => detail,
            other => other.to_string(),
        };
        Self { status, detail }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), detail = %self.detail, "Request failed");
        }
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub(crate) async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

// ---------------------------------------------------------------------------
// GET /v1/positions
// ---------------------------------------------------------------------------

pub(crate) async fn positions(
    State(st): State<Arc<AppState>>,
    Query(query): Query<PositionsQuery>,
) -> ApiResult<impl IntoResponse> {
    let symbols = query.symbol_list();
    let positions = st
        .brokerage
        .fetch_positions(st.brokerage.default_account(), symbols.as_deref())
        .await?;
    Ok(Json(Envelope::new("PositionsList", positions)))
}

// ---------------------------------------------------------------------------
// GET /v1/quotes/:symbol  POST /v1/quotes
// ---------------------------------------------------------------------------

pub(crate) async fn quote(
    State(st): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let symbol = symbol.to_ascii_uppercase();
    let quote = st
        .brokerage
        .fetch_quotes(st.brokerage.default_account(), std::slice::from_ref(&symbol))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("No quote for {}", symbol)))?;
    Ok(Json(Envelope::new("Quote", quote)))
}

pub(crate) async fn quotes(
    State(st): State<Arc<AppState>>,
    body: Result<Json<Vec<String>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(symbols) = body?;
    let symbols: Vec<String> = symbols.iter().map(|s| s.to_ascii_uppercase()).collect();
    let quotes = st
        .brokerage
        .fetch_quotes(st.brokerage.default_account(), &symbols)
        .await?;
    Ok(Json(Envelope::new("QuotesList", quotes)))
}

// ---------------------------------------------------------------------------
// GET /v1/account/status
// ---------------------------------------------------------------------------

pub(crate) async fn account_status(State(st): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let details = st.status.status(st.brokerage.default_account()).await?;
    Ok(Json(Envelope::new(
        "AccountStatus",
        AccountStatusResponse {
            brokerage: st.brokerage.brokerage_name().to_string(),
            read_only: st.read_only,
            details,
        },
    )))
}

// ---------------------------------------------------------------------------
// POST /v1/adjustments
// ---------------------------------------------------------------------------

/// Apply (or preview) a batch of fractional adjustments.
///
/// 201 when every symbol succeeded or previewed, 207 otherwise. Read-only
/// mode refuses anything but a preview with 403.
pub(crate) async fn adjustments(
    State(st): State<Arc<AppState>>,
    Query(query): Query<AdjustmentQuery>,
    body: Result<Json<Vec<AdjustmentRequest>>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(requests) = body?;
    if requests.is_empty() {
        return Err(ApiError::bad_request("At least one adjustment is required."));
    }
    for request in &requests {
        request.validate()?;
    }
    if st.read_only && !query.preview {
        return Err(GatewayError::ReadOnly.into());
    }

    let options = AdjustOptions {
        preview: query.preview,
        round_down: query.round_down,
    };
    let outcome = st
        .engine
        .adjust_batch(st.brokerage.default_account(), &requests, options, &st.limits)
        .await;

    let status = StatusCode::from_u16(outcome.http_status()).unwrap_or(StatusCode::MULTI_STATUS);
    info!(
        count = outcome.len(),
        preview = query.preview,
        status = status.as_u16(),
        "Adjustments handled"
    );
    Ok((status, Json(Envelope::new("AdjustmentOrder", outcome))).into_response())
}

// ---------------------------------------------------------------------------
// POST /v1/allocations
// ---------------------------------------------------------------------------

pub(crate) async fn allocations(
    body: Result<Json<AllocationProblem>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(problem) = body?;
    let solution = find_minimum_error(&problem);
    Ok(Json(Envelope::new("Allocation", solution)))
}

// ---------------------------------------------------------------------------
// POST /v1/orders/sequence
// ---------------------------------------------------------------------------

pub(crate) async fn sequence_orders(
    body: Result<Json<SequenceRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let attribute: OrderAttribute = request
        .attribute
        .as_deref()
        .unwrap_or("instruction")
        .parse()?;
    let priority = match request.priority {
        Some(priority) => priority,
        None => attribute.default_priority().ok_or_else(|| {
            ApiError::bad_request("A priority list is required for this attribute.")
        })?,
    };
    let orders = sort_orders(request.orders, attribute, &priority)?;
    Ok(Json(Envelope::new("SequencedOrdersList", orders)))
}
