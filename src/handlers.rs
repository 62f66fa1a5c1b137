// HTTP handlers

use crate::address::Address;
use crate::app_state::{SharedState, SubmitError};
use crate::devnet::DevAccountInfo;
use crate::engine::{JournalEntry, MarketSnapshot, Position};
use crate::error::{EngineError, ErrorKind};
use crate::market::{now, MarketId, MarketView};
use crate::rpc::{RequestError, SignedRequest};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Submit(SubmitError),
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        ApiError::Submit(e)
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Submit(SubmitError::Engine(e))
    }
}

fn engine_status(e: &EngineError) -> StatusCode {
    match e {
        EngineError::MarketNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::AlreadyExists(_)
        | EngineError::AlreadySettled(_)
        | EngineError::MarketSettled(_)
        | EngineError::MarketNotSettled(_) => StatusCode::CONFLICT,
        _ => match e.kind() {
            ErrorKind::Integrity => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Precondition | ErrorKind::Insufficient => StatusCode::BAD_REQUEST,
        },
    }
}

fn request_status(e: &RequestError) -> StatusCode {
    match e {
        RequestError::NonceReused { .. } => StatusCode::CONFLICT,
        RequestError::Serialization(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::UNAUTHORIZED,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::Submit(SubmitError::Engine(e)) => {
                let kind = match e.kind() {
                    ErrorKind::Precondition => "precondition",
                    ErrorKind::Insufficient => "insufficient",
                    ErrorKind::Integrity => "integrity",
                };
                (engine_status(e), kind, e.to_string())
            }
            ApiError::Submit(SubmitError::Request(e)) => (request_status(e), "request", e.to_string()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m.clone()),
        };

        if status.is_server_error() {
            error!(%status, error = %message, "request failed");
        } else {
            warn!(%status, error = %message, "request rejected");
        }

        (status, Json(json!({ "success": false, "kind": kind, "error": message }))).into_response()
    }
}

fn parse_market_id(raw: &str) -> Result<MarketId, ApiError> {
    raw.parse().map_err(|e| ApiError::BadRequest(format!("invalid market id {:?}: {}", raw, e)))
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse().map_err(|e| ApiError::BadRequest(format!("invalid address {:?}: {}", raw, e)))
}

macro_rules! lock {
    ($state:expr) => {
        $state.lock().map_err(|_| ApiError::Internal("state lock poisoned".into()))?
    };
}

// ============================================================================
// SUBMIT
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub nonce_used: u64,
    pub entry: JournalEntry,
}

/// POST /rpc/submit
pub async fn submit_request(
    State(state): State<SharedState>,
    body: Result<Json<SignedRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let mut app_state = lock!(state);
    let entry = app_state.submit(&request, now())?;

    Ok(Json(SubmitResponse { success: true, nonce_used: request.nonce, entry }))
}

// ============================================================================
// READS
// ============================================================================

/// GET /markets
pub async fn list_markets(State(state): State<SharedState>) -> Result<Json<Vec<MarketView>>, ApiError> {
    let app_state = lock!(state);
    let engine = &app_state.engine;
    let views = engine
        .market_ids()
        .iter()
        .map(|id| engine.get_market(id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

/// GET /markets/:id
pub async fn get_market(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MarketView>, ApiError> {
    let market_id = parse_market_id(&id)?;
    let app_state = lock!(state);
    Ok(Json(app_state.engine.get_market(&market_id)?))
}

/// GET /markets/:id/snapshot
pub async fn get_snapshot(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MarketSnapshot>, ApiError> {
    let market_id = parse_market_id(&id)?;
    let app_state = lock!(state);
    Ok(Json(app_state.engine.snapshot(&market_id)?))
}

/// GET /markets/:id/positions/:owner
pub async fn get_position(
    State(state): State<SharedState>,
    Path((id, owner)): Path<(String, String)>,
) -> Result<Json<Position>, ApiError> {
    let market_id = parse_market_id(&id)?;
    let owner = parse_address(&owner)?;
    let app_state = lock!(state);
    Ok(Json(app_state.engine.position(&market_id, &owner)?))
}

/// GET /markets/:id/journal
pub async fn get_journal(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let market_id = parse_market_id(&id)?;
    let app_state = lock!(state);
    Ok(Json(app_state.engine.journal(&market_id)?))
}

/// GET /rpc/nonce/:address
pub async fn get_nonce(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signer = parse_address(&address)?;
    let app_state = lock!(state);
    let last = app_state.nonces.last(&signer);
    Ok(Json(json!({ "address": signer, "last_nonce": last, "next_nonce": last.saturating_add(1) })))
}

/// GET /devnet/accounts
pub async fn get_devnet_accounts(State(state): State<SharedState>) -> Result<Json<Vec<DevAccountInfo>>, ApiError> {
    let app_state = lock!(state);
    match &app_state.devnet {
        Some(devnet) => Ok(Json(devnet.infos())),
        None => Err(ApiError::NotFound("development accounts are disabled".into())),
    }
}

/// GET /health
pub async fn health_check(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    let app_state = lock!(state);
    let stats = app_state.engine.stats();
    Ok(Json(json!({
        "status": "ok",
        "markets": app_state.engine.market_ids().len(),
        "stats": stats,
    })))
}
