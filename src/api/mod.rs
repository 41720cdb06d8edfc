// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue,
    },
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{auth_middleware, require_auth, FailureRecord, LoginWidgetData},
    error::ErrorBody,
    state::AppState,
};

pub mod auth;
pub mod health;
pub mod users;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/auth/telegram", post(auth::telegram_auth))
        .route("/auth/telegram-widget", post(auth::telegram_widget_auth))
        .route("/auth/refresh", post(auth::refresh_tokens))
        .route("/auth/logout", post(auth::logout))
        .route("/api/user/profile", get(users::get_profile))
        .route(
            "/api/protected",
            get(users::protected).route_layer(from_fn_with_state(state.clone(), require_auth)),
        )
        .with_state(state.clone());

    // Layers run outermost-last: CORS answers preflights before anything else
    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(from_fn_with_state(state, auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
        .layer(cors_layer(cors_origins))
}

/// `*` (or nothing) allows any origin without credentials; an explicit list
/// allows those origins with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .expose_headers([AUTHORIZATION, X_REQUEST_ID])
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root,
        health::health,
        auth::telegram_auth,
        auth::telegram_widget_auth,
        auth::refresh_tokens,
        auth::logout,
        users::get_profile,
        users::protected
    ),
    components(
        schemas(
            health::RootResponse,
            health::HealthResponse,
            auth::TelegramAuthRequest,
            auth::RefreshTokenRequest,
            auth::TokenResponse,
            auth::LogoutResponse,
            LoginWidgetData,
            users::ProfileResponse,
            users::UserSummary,
            users::ProtectedResponse,
            FailureRecord,
            ErrorBody
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "Telegram login and session tokens"),
        (name = "Users", description = "Authenticated user endpoints")
    )
)]
struct ApiDoc;
