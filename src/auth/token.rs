// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token issuance and verification.
//!
//! Tokens are compact HMAC-signed JWTs carrying `sub`, `iat`, `exp` and a
//! `type` claim (`access` or `refresh`). They are stateless: there is no
//! server-side store and no revocation.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::AuthError;
use crate::config::AuthSettings;

/// Claim names owned by the token service.
pub const RESERVED_CLAIMS: &[&str] = &["sub", "iat", "exp", "type"];

/// Token kind carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    pub fn parse(s: &str) -> Option<TokenKind> {
        match s {
            "access" => Some(TokenKind::Access),
            "refresh" => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified token claims.
///
/// The fixed fields are always present; anything a caller added at issue
/// time lives in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenClaims {
    /// Subject: the user id, string encoded
    pub sub: String,
    /// Issued at (unix seconds); always set on tokens issued here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration (unix seconds)
    pub exp: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Parse the subject as a numeric user id.
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::invalid("Token subject is not a valid user id"))
    }
}

/// Claims as found on the wire, before the required ones are checked.
#[derive(Debug, Deserialize)]
struct WireClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    iat: Option<i64>,
    exp: i64,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token issuance failure.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("claim '{0}' is reserved and cannot be overridden")]
    ReservedClaim(String),

    #[error("token lifetime {0} is out of range")]
    TtlOutOfRange(Duration),

    #[error("failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies session tokens with a single configured algorithm.
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl TokenService {
    pub fn new(settings: &AuthSettings) -> Self {
        let secret = settings.secret_key().as_bytes();
        Self {
            algorithm: settings.algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_ttl: settings.access_token_ttl,
            refresh_token_ttl: settings.refresh_token_ttl,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Configured lifetime for a token kind.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_token_ttl,
            TokenKind::Refresh => self.refresh_token_ttl,
        }
    }

    /// Issue a token for `user_id`.
    ///
    /// `ttl` defaults to the configured lifetime for `kind`. Extra claims may
    /// not reuse a reserved claim name.
    pub fn issue(
        &self,
        user_id: i64,
        kind: TokenKind,
        ttl: Option<Duration>,
        extra: Option<Map<String, Value>>,
    ) -> Result<String, TokenError> {
        self.issue_at(user_id, kind, ttl, extra, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: i64,
        kind: TokenKind,
        ttl: Option<Duration>,
        extra: Option<Map<String, Value>>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let extra = extra.unwrap_or_default();
        if let Some(reserved) = extra
            .keys()
            .find(|key| RESERVED_CLAIMS.contains(&key.as_str()))
        {
            return Err(TokenError::ReservedClaim(reserved.clone()));
        }

        let ttl = ttl.unwrap_or_else(|| self.ttl(kind));
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::TtlOutOfRange(ttl))?;
        let claims = TokenClaims {
            sub: user_id.to_string(),
            iat: Some(now.timestamp()),
            exp: expires_at.timestamp(),
            kind,
            extra,
        };

        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }

    pub fn issue_access_token(
        &self,
        user_id: i64,
        extra: Option<Map<String, Value>>,
    ) -> Result<String, TokenError> {
        self.issue(user_id, TokenKind::Access, None, extra)
    }

    pub fn issue_refresh_token(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue(user_id, TokenKind::Refresh, None, None)
    }

    /// Issue a fresh access/refresh pair with default lifetimes.
    pub fn issue_pair(&self, user_id: i64) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user_id, None)?,
            refresh_token: self.issue_refresh_token(user_id)?,
        })
    }

    /// Verify a token and return its claims.
    ///
    /// Only the configured algorithm is accepted. Failures, in priority
    /// order: invalid signature or structure, expiry, kind mismatch (when
    /// `expected` is given), missing subject.
    pub fn verify(&self, token: &str, expected: Option<TokenKind>) -> Result<TokenClaims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::invalid("Token is required"));
        }

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;

        let wire = decode::<WireClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::invalid(format!("Invalid token: {e}")),
                }
            })?
            .claims;

        if let Some(expected) = expected {
            if wire.kind.as_deref() != Some(expected.as_str()) {
                return Err(AuthError::invalid(format!(
                    "Token type mismatch. Expected: {}, got: {}",
                    expected,
                    wire.kind.as_deref().unwrap_or("none")
                )));
            }
        }

        let sub = wire
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| AuthError::invalid("Token missing subject claim"))?;

        let kind = wire
            .kind
            .as_deref()
            .and_then(TokenKind::parse)
            .ok_or_else(|| AuthError::invalid("Token type is missing or unknown"))?;

        Ok(TokenClaims {
            sub,
            iat: wire.iat,
            exp: wire.exp,
            kind,
            extra: wire.extra,
        })
    }

    /// Resolve the user id behind an optional token.
    ///
    /// `Ok(None)` means no token was presented; `Err` means a token was
    /// presented but is not acceptable.
    pub fn resolve_user_id(
        &self,
        token: Option<&str>,
        expected: TokenKind,
    ) -> Result<Option<i64>, AuthError> {
        let Some(token) = token else {
            return Ok(None);
        };
        let claims = self.verify(token, Some(expected))?;
        claims.user_id().map(Some)
    }

    /// Best-effort user id: any authentication failure yields `None`.
    pub fn user_id_from_token(&self, token: &str, expected: TokenKind) -> Option<i64> {
        self.resolve_user_id(Some(token), expected).ok().flatten()
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish_non_exhaustive()
    }
}
