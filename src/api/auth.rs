// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Telegram login, token refresh and logout.

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::{
    auth::{middleware::bearer_from_headers, AuthError, LoginWidgetData, TokenKind, TokenPair},
    error::{ApiError, ErrorBody},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TelegramAuthRequest {
    /// Raw `initData` string from `Telegram.WebApp.initData`
    pub init_data: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Issued session.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `bearer`
    pub token_type: String,
    /// Telegram user data, absent on refresh
    #[schema(value_type = Option<Object>)]
    pub user: Option<Value>,
}

impl TokenResponse {
    fn new(pair: TokenPair, user: Option<Value>) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Authenticate with Telegram WebApp `initData`.
#[utoipa::path(
    post,
    path = "/auth/telegram",
    tag = "Auth",
    request_body = TelegramAuthRequest,
    responses(
        (status = 200, description = "Session issued", body = TokenResponse),
        (status = 401, description = "Invalid or stale initData", body = ErrorBody)
    )
)]
pub async fn telegram_auth(
    State(state): State<AppState>,
    Json(request): Json<TelegramAuthRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some(data) = state.signatures.validate_webapp(&request.init_data) else {
        tracing::warn!("Rejected Telegram WebApp login");
        return Err(ApiError::unauthorized("Invalid Telegram initData"));
    };

    let Some(user_id) = data.user_id() else {
        tracing::warn!("Telegram WebApp login without user id");
        return Err(ApiError::unauthorized("User ID not found in initData"));
    };

    let pair = state.tokens.issue_pair(user_id)?;
    tracing::info!(user_id, "Issued session for Telegram WebApp login");

    Ok(Json(TokenResponse::new(pair, data.user)))
}

/// Authenticate with Telegram Login Widget data.
#[utoipa::path(
    post,
    path = "/auth/telegram-widget",
    tag = "Auth",
    request_body = LoginWidgetData,
    responses(
        (status = 200, description = "Session issued", body = TokenResponse),
        (status = 401, description = "Invalid or stale widget data", body = ErrorBody)
    )
)]
pub async fn telegram_widget_auth(
    State(state): State<AppState>,
    Json(request): Json<LoginWidgetData>,
) -> Result<Json<TokenResponse>, ApiError> {
    if !state.signatures.validate_widget(&request.to_fields()) {
        tracing::warn!(user_id = request.id, "Rejected Telegram Login Widget login");
        return Err(ApiError::unauthorized("Invalid Telegram Login Widget data"));
    }

    let pair = state.tokens.issue_pair(request.id)?;
    tracing::info!(user_id = request.id, "Issued session for Telegram Login Widget login");

    let user = json!({
        "id": request.id,
        "first_name": request.first_name,
        "last_name": request.last_name,
        "username": request.username,
    });
    Ok(Json(TokenResponse::new(pair, Some(user))))
}

/// Exchange a refresh token for a new token pair.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New session issued", body = TokenResponse),
        (status = 401, description = "Refresh token expired or invalid", body = ErrorBody)
    )
)]
pub async fn refresh_tokens(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let claims = state
        .tokens
        .verify(&request.refresh_token, Some(TokenKind::Refresh))
        .map_err(refresh_rejection)?;
    let user_id = claims.user_id().map_err(refresh_rejection)?;

    let pair = state.tokens.issue_pair(user_id)?;
    tracing::info!(user_id, "Refreshed session");

    Ok(Json(TokenResponse::new(pair, None)))
}

fn refresh_rejection(err: AuthError) -> ApiError {
    tracing::debug!(error = err.error_code(), "Rejected refresh token");
    match err {
        AuthError::TokenExpired => {
            ApiError::unauthorized("Refresh token has expired. Please log in again.")
        }
        AuthError::InvalidToken(detail) => ApiError::unauthorized(detail),
        AuthError::MissingToken => ApiError::unauthorized("Invalid refresh token"),
    }
}

/// Log out.
///
/// Sessions are stateless, so the client discards its tokens.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse)
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<LogoutResponse> {
    let user_id = bearer_from_headers(&headers)
        .and_then(|token| state.tokens.user_id_from_token(token, TokenKind::Access));
    tracing::info!(?user_id, "Logged out");

    Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    })
}
