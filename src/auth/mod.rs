// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Telegram-based authentication for the GGenius API.
//!
//! ## Auth Flow
//!
//! 1. The client proves a Telegram identity, either as Mini App `initData`
//!    or as a signed Login Widget payload
//! 2. The server checks the HMAC signature against the bot token and the
//!    `auth_date` freshness window
//! 3. The server issues an access/refresh JWT pair whose `sub` is the
//!    Telegram user id
//! 4. Later requests send `Authorization: Bearer <access token>`; the
//!    middleware verifies it and attaches an [`AuthenticatedIdentity`]
//!
//! ## Security
//!
//! - Signatures and hashes are compared in constant time
//! - Only the configured HMAC algorithm is accepted, `none` never is
//! - Access tokens are rejected where refresh tokens are expected and
//!   vice versa
//! - An empty bot token makes every Telegram check fail

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod signature;
pub mod token;

pub use claims::AuthenticatedIdentity;
pub use error::{AuthError, FailureRecord};
pub use extractor::Auth;
pub use middleware::{auth_middleware, authenticate, extract_bearer_token, require_auth};
pub use signature::{LoginWidgetData, SignatureValidator, WebAppInitData};
pub use token::{TokenClaims, TokenError, TokenKind, TokenPair, TokenService};
