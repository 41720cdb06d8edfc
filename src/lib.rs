// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! GGenius API - Telegram authentication service
//!
//! Verifies Telegram identity proofs (Mini App `initData` and the Login
//! Widget), issues HMAC-signed access/refresh JWTs and guards the API with
//! bearer-token middleware.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Telegram signature validation, session tokens and middleware
//! - `config` - Environment configuration
//! - `telemetry` - Tracing subscriber setup

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;
