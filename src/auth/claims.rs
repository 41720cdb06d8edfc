// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated identity attached to a request.

use serde::Serialize;

use super::token::TokenClaims;
use super::AuthError;

/// Authenticated user information extracted from a verified access token.
///
/// Inserted into the request extensions by the auth middleware and read by
/// handlers through the [`Auth`](super::Auth) extractor or `Extension`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedIdentity {
    /// Telegram user id (the token `sub` claim)
    pub user_id: i64,
    /// The verified claims
    pub claims: TokenClaims,
}

impl AuthenticatedIdentity {
    /// Build from verified claims; fails if the subject is not numeric.
    pub fn from_claims(claims: TokenClaims) -> Result<Self, AuthError> {
        let user_id = claims.user_id()?;
        Ok(Self { user_id, claims })
    }

    /// Token expiration (unix seconds).
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenKind;

    fn sample_claims(sub: &str) -> TokenClaims {
        TokenClaims {
            sub: sub.to_string(),
            iat: Some(1_700_000_000),
            exp: 1_700_000_900,
            kind: TokenKind::Access,
            extra: Default::default(),
        }
    }

    #[test]
    fn from_claims_extracts_user_id() {
        let identity = AuthenticatedIdentity::from_claims(sample_claims("123456")).unwrap();
        assert_eq!(identity.user_id, 123456);
        assert_eq!(identity.expires_at(), 1_700_000_900);
        assert_eq!(identity.claims.kind, TokenKind::Access);
    }

    #[test]
    fn from_claims_rejects_non_numeric_subject() {
        let result = AuthenticatedIdentity::from_claims(sample_claims("user_123"));
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }
}
