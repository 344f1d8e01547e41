//! Control API handlers

use crate::auth::{cleared_cookie, session_cookie, session_token};
use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use pulldeck_types::{
    AddTransferRequest, AddTransferResponse, DirInfo, LoginRequest, MsgResponse, ToggleResponse,
    TransferSnapshot,
};

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = session_token(&headers) {
        if state.sessions.validate(&token) {
            return Ok((None, Json(MsgResponse::new("ok"))));
        }
    }

    if !state.check_password(&req.password) {
        tracing::warn!("Rejected login attempt");
        return Err(ApiError::Unauthorized("incorrect password".to_string()));
    }

    let session = state.sessions.issue();
    tracing::info!("New session issued, valid until {}", session.expires_at);
    Ok((
        Some([(header::SET_COOKIE, session_cookie(&session))]),
        Json(MsgResponse::new("ok")),
    ))
}

/// GET /api/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(&token);
    }
    (
        [(header::SET_COOKIE, cleared_cookie())],
        Json(MsgResponse::new("logged out")),
    )
}

/// GET /api/downloads
pub async fn list_transfers(State(state): State<AppState>) -> Json<Vec<TransferSnapshot>> {
    Json(state.core.list_transfers())
}

/// POST /api/add
pub async fn add_transfer(
    State(state): State<AppState>,
    Json(req): Json<AddTransferRequest>,
) -> Result<(StatusCode, Json<AddTransferResponse>), ApiError> {
    let added = state.core.add_transfer(&req).await?;
    Ok((StatusCode::ACCEPTED, Json(added)))
}

/// GET /api/toggle/:id
pub async fn toggle_transfer(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let outcome = state.core.toggle_transfer(id)?;
    tracing::debug!("Toggled transfer {}: {:?}", id, outcome);
    Ok(Json(ToggleResponse { id, outcome }))
}

/// GET /api/delete/:id
pub async fn delete_transfer(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<MsgResponse>, ApiError> {
    state.core.delete_transfer(id)?;
    tracing::info!("Removed transfer {}", id);
    Ok(Json(MsgResponse::new("removed")))
}

/// GET /api/info
pub async fn dir_info(State(state): State<AppState>) -> Json<DirInfo> {
    Json(state.core.dir_info().await)
}
