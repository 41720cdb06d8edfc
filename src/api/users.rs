// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Endpoints for the signed-in user.

use axum::{Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthenticatedIdentity, FailureRecord};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    /// Telegram user id
    pub id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProtectedResponse {
    pub message: String,
    pub user_id: i64,
}

/// Get the current user's profile.
#[utoipa::path(
    get,
    path = "/api/user/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Current user", body = ProfileResponse),
        (status = 401, description = "Not authenticated", body = FailureRecord)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(Auth(identity): Auth) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: UserSummary {
            id: identity.user_id,
        },
    })
}

/// Example resource behind the per-route guard.
#[utoipa::path(
    get,
    path = "/api/protected",
    tag = "Users",
    responses(
        (status = 200, description = "Protected data", body = ProtectedResponse),
        (status = 401, description = "Not authenticated", body = FailureRecord)
    ),
    security(("bearer_auth" = []))
)]
pub async fn protected(
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "This is protected data".to_string(),
        user_id: identity.user_id,
    })
}
