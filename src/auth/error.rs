// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors and their HTTP representation.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Per-request authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No usable bearer credential in the request
    #[error("Authorization header is missing or invalid")]
    MissingToken,
    /// Token signature is valid but `exp` is in the past
    #[error("Token has expired")]
    TokenExpired,
    /// Bad signature, disallowed algorithm, malformed structure, kind
    /// mismatch or missing subject
    #[error("{0}")]
    InvalidToken(String),
}

/// Boundary-facing error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FailureRecord {
    /// Always `false`
    pub success: bool,
    /// Machine-readable error tag
    pub error: String,
    /// Human-readable message
    pub message: String,
    /// Additional detail, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuthError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        AuthError::InvalidToken(detail.into())
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidToken(_) => "invalid_token",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::TokenExpired | AuthError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization header is missing or invalid",
            AuthError::TokenExpired => "Access token has expired",
            AuthError::InvalidToken(_) => "Token validation failed",
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            AuthError::MissingToken => {
                Some("Expected format: 'Authorization: Bearer <token>'".to_string())
            }
            AuthError::TokenExpired => {
                Some("Please refresh your token using the refresh endpoint".to_string())
            }
            AuthError::InvalidToken(detail) => Some(detail.clone()),
        }
    }

    pub fn failure_record(&self) -> FailureRecord {
        FailureRecord {
            success: false,
            error: self.error_code().to_string(),
            message: self.message().to_string(),
            detail: self.detail(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self.failure_record())).into_response();
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}
