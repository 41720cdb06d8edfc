// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! [`auth_middleware`] is applied to the whole router and gates every
//! request whose path is not excluded. [`require_auth`] is the per-route
//! guard for routes that sit under an excluded prefix, or for routers that do
//! not install the global middleware at all.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/api/protected", get(handler))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware))
//!     .with_state(state);
//! ```

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthenticatedIdentity, TokenKind, TokenService};
use crate::state::AppState;

const BEARER_PREFIX: &str = "bearer ";

/// Extract a bearer token from an `Authorization` header value.
///
/// Surrounding whitespace is ignored, the scheme is matched
/// case-insensitively and an empty token is treated as absent.
pub fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    let scheme = header.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    let token = header[BEARER_PREFIX.len()..].trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Bearer token from request headers; a non-UTF-8 header counts as absent.
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok();
    extract_bearer_token(value)
}

/// Authenticate a request from its headers using an access token.
pub fn authenticate(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<AuthenticatedIdentity, AuthError> {
    let token = bearer_from_headers(headers).ok_or(AuthError::MissingToken)?;
    let claims = tokens.verify(token, Some(TokenKind::Access))?;
    AuthenticatedIdentity::from_claims(claims)
}

/// Authentication middleware function.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.settings.is_path_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    // CORS preflight never carries credentials
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    match authenticate(request.headers(), &state.tokens) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(
                path = %request.uri().path(),
                error = e.error_code(),
                "Rejected unauthenticated request"
            );
            e.into_response()
        }
    }
}

/// Per-route guard.
///
/// Passes requests that the global middleware already authenticated and
/// authenticates the rest itself.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<AuthenticatedIdentity>().is_some() {
        return next.run(request).await;
    }

    match authenticate(request.headers(), &state.tokens) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenClaims;
    use crate::config::AuthSettings;
    use axum::{
        body::{to_bytes, Body},
        http::{header::WWW_AUTHENTICATE, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(AuthSettings::for_tests())
    }

    async fn whoami(Extension(identity): Extension<AuthenticatedIdentity>) -> String {
        identity.user_id.to_string()
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/health", get(|| async { "healthy" }))
            .route("/api/x", get(whoami))
            .route(
                "/public/guarded",
                get(whoami).route_layer(from_fn_with_state(state.clone(), require_auth)),
            )
            .layer(from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    fn get_request(uri: &str, authorization: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[test]
    fn extract_bearer_token_cases() {
        assert_eq!(extract_bearer_token(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_bearer_token(Some("bearer   abc123")), Some("abc123"));
        assert_eq!(extract_bearer_token(Some("BEARER abc123")), Some("abc123"));
        assert_eq!(extract_bearer_token(Some("BeArEr abc123")), Some("abc123"));
        assert_eq!(extract_bearer_token(Some("  Bearer abc123  ")), Some("abc123"));
        assert_eq!(extract_bearer_token(Some("Basic abc123")), None);
        assert_eq!(extract_bearer_token(Some("abc123")), None);
        assert_eq!(extract_bearer_token(Some("Bearer ")), None);
        assert_eq!(extract_bearer_token(Some("Bearer")), None);
        assert_eq!(extract_bearer_token(Some("")), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[tokio::test]
    async fn excluded_path_passes_without_token() {
        let response = app(state())
            .oneshot(get_request("/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "healthy");
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let response = app(state())
            .oneshot(get_request("/api/x", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
        assert_eq!(body_json(response).await["error"], "missing_token");
    }

    #[tokio::test]
    async fn wrong_scheme_is_treated_as_missing() {
        let response = app(state())
            .oneshot(get_request("/api/x", Some("Basic abc123")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "missing_token");
    }

    #[test]
    fn non_utf8_header_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            axum::http::HeaderValue::from_bytes(b"Bearer \xff").unwrap(),
        );
        assert_eq!(bearer_from_headers(&headers), None);
    }

    #[tokio::test]
    async fn non_utf8_header_is_rejected_as_missing_token() {
        let request = axum::http::Request::builder()
            .uri("/api/x")
            .header(
                AUTHORIZATION,
                axum::http::HeaderValue::from_bytes(b"Bearer \xff").unwrap(),
            )
            .body(Body::empty())
            .unwrap();
        let response = app(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "missing_token");
    }

    #[tokio::test]
    async fn valid_access_token_attaches_identity() {
        let state = state();
        let token = state.tokens.issue_access_token(42, None).unwrap();
        let response = app(state)
            .oneshot(get_request("/api/x", Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "42");
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let state = state();
        let token = state
            .tokens
            .issue_at(
                42,
                TokenKind::Access,
                Some(Duration::minutes(15)),
                None,
                Utc::now() - Duration::minutes(20),
            )
            .unwrap();
        let response = app(state)
            .oneshot(get_request("/api/x", Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "token_expired");
    }

    #[tokio::test]
    async fn refresh_token_cannot_access_resources() {
        let state = state();
        let token = state.tokens.issue_refresh_token(42).unwrap();
        let response = app(state)
            .oneshot(get_request("/api/x", Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_token");
        assert!(body["detail"].as_str().unwrap().contains("type mismatch"));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let response = app(state())
            .oneshot(get_request("/api/x", Some("Bearer not.a.jwt")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "invalid_token");
    }

    #[tokio::test]
    async fn preflight_is_never_challenged() {
        let request = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/x")
            .body(Body::empty())
            .unwrap();
        let response = app(state()).oneshot(request).await.unwrap();
        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn guard_protects_routes_under_excluded_prefix() {
        let state = state();
        let response = app(state.clone())
            .oneshot(get_request("/public/guarded", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "missing_token");

        let token = state.tokens.issue_access_token(7, None).unwrap();
        let response = app(state)
            .oneshot(get_request("/public/guarded", Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "7");
    }

    #[tokio::test]
    async fn guard_does_not_reject_already_authenticated_request() {
        let state = state();

        async fn preauthenticate(mut request: Request, next: Next) -> Response {
            request.extensions_mut().insert(AuthenticatedIdentity {
                user_id: 99,
                claims: TokenClaims {
                    sub: "99".to_string(),
                    iat: Some(0),
                    exp: 0,
                    kind: TokenKind::Access,
                    extra: Default::default(),
                },
            });
            next.run(request).await
        }

        let app = Router::new()
            .route(
                "/guarded",
                get(whoami).route_layer(from_fn_with_state(state.clone(), require_auth)),
            )
            .layer(axum::middleware::from_fn(preauthenticate))
            .with_state(state);

        let response = app.oneshot(get_request("/guarded", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "99");
    }
}
