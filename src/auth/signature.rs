// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Telegram identity proof verification.
//!
//! Two signing schemes are supported and intentionally kept separate:
//!
//! - **WebApp `initData`**: `secret = HMAC_SHA256(key = "WebAppData", msg = bot_token)`
//! - **Login Widget**: `secret = SHA256(bot_token)`
//!
//! Both then sign the canonical data-check string (fields sorted by key,
//! `key=value` joined by `\n`) with `HMAC_SHA256(secret, ...)` and hex-encode
//! the result. Both reject payloads whose `auth_date` is older than
//! [`AUTH_DATE_MAX_AGE_SECS`].
//!
//! Every failure is reported as `None` / `false`; nothing is propagated.

use std::collections::BTreeMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of `auth_date` (24 hours).
pub const AUTH_DATE_MAX_AGE_SECS: i64 = 86_400;

const WEBAPP_KEY: &[u8] = b"WebAppData";
const HASH_FIELD: &str = "hash";
const AUTH_DATE_FIELD: &str = "auth_date";
const USER_FIELD: &str = "user";

/// Verified WebApp `initData`.
#[derive(Debug, Clone, PartialEq)]
pub struct WebAppInitData {
    /// All signed fields except `hash` and `user`
    pub fields: BTreeMap<String, String>,
    /// Parsed `user` JSON, when present
    pub user: Option<Value>,
}

impl WebAppInitData {
    /// Telegram user id from the `user` object.
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref()?.get("id")?.as_i64()
    }

    pub fn auth_date(&self) -> Option<i64> {
        self.fields.get(AUTH_DATE_FIELD)?.parse().ok()
    }
}

/// Payload posted by the Telegram Login Widget.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginWidgetData {
    pub id: i64,
    pub first_name: String,
    pub auth_date: i64,
    pub hash: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl LoginWidgetData {
    /// Flatten into the string field set the widget signed, omitting absent
    /// optional fields.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), self.id.to_string());
        fields.insert("first_name".to_string(), self.first_name.clone());
        fields.insert(AUTH_DATE_FIELD.to_string(), self.auth_date.to_string());
        fields.insert(HASH_FIELD.to_string(), self.hash.clone());
        for (key, value) in [
            ("last_name", &self.last_name),
            ("username", &self.username),
            ("photo_url", &self.photo_url),
        ] {
            if let Some(value) = value {
                fields.insert(key.to_string(), value.clone());
            }
        }
        fields
    }
}

/// Validator bound to a single bot token.
#[derive(Clone)]
pub struct SignatureValidator {
    bot_token: String,
}

impl SignatureValidator {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty()
    }

    pub fn validate_webapp(&self, init_data: &str) -> Option<WebAppInitData> {
        validate_webapp(init_data, &self.bot_token)
    }

    pub fn validate_widget(&self, fields: &BTreeMap<String, String>) -> bool {
        validate_widget(fields, &self.bot_token)
    }
}

impl std::fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Validate Telegram WebApp `initData` against the current time.
pub fn validate_webapp(init_data: &str, bot_token: &str) -> Option<WebAppInitData> {
    validate_webapp_at(init_data, bot_token, Utc::now().timestamp())
}

/// Validate Telegram WebApp `initData` as of `now` (unix seconds).
pub fn validate_webapp_at(init_data: &str, bot_token: &str, now: i64) -> Option<WebAppInitData> {
    if init_data.is_empty() || bot_token.is_empty() {
        return None;
    }

    let mut fields: BTreeMap<String, String> = url::form_urlencoded::parse(init_data.as_bytes())
        .into_owned()
        .collect();

    let received_hash = fields.remove(HASH_FIELD).filter(|h| !h.is_empty())?;

    let secret = webapp_secret(bot_token)?;
    let computed_hash = sign_fields(&secret, &fields)?;
    if !hashes_match(&computed_hash, &received_hash) {
        tracing::debug!("WebApp initData hash mismatch");
        return None;
    }

    if !auth_date_is_fresh(&fields, now) {
        tracing::debug!("WebApp initData auth_date is stale or malformed");
        return None;
    }

    let user = match fields.get(USER_FIELD) {
        Some(raw) if !raw.is_empty() => {
            let decoded = percent_decode_str(raw).decode_utf8().ok()?;
            let parsed = serde_json::from_str::<Value>(&decoded).ok()?;
            fields.remove(USER_FIELD);
            Some(parsed)
        }
        _ => None,
    };

    Some(WebAppInitData { fields, user })
}

/// Validate Telegram Login Widget fields against the current time.
pub fn validate_widget(fields: &BTreeMap<String, String>, bot_token: &str) -> bool {
    validate_widget_at(fields, bot_token, Utc::now().timestamp())
}

/// Validate Telegram Login Widget fields as of `now` (unix seconds).
pub fn validate_widget_at(fields: &BTreeMap<String, String>, bot_token: &str, now: i64) -> bool {
    if fields.is_empty() || bot_token.is_empty() {
        return false;
    }

    let mut fields = fields.clone();
    let Some(received_hash) = fields.remove(HASH_FIELD).filter(|h| !h.is_empty()) else {
        return false;
    };

    if !auth_date_is_fresh(&fields, now) {
        tracing::debug!("Login Widget auth_date is stale or malformed");
        return false;
    }

    let secret = widget_secret(bot_token);
    match sign_fields(&secret, &fields) {
        Some(computed_hash) => hashes_match(&computed_hash, &received_hash),
        None => false,
    }
}

/// `HMAC_SHA256(key = "WebAppData", msg = bot_token)`
fn webapp_secret(bot_token: &str) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(WEBAPP_KEY).ok()?;
    mac.update(bot_token.as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}

/// `SHA256(bot_token)`
fn widget_secret(bot_token: &str) -> Vec<u8> {
    Sha256::digest(bot_token.as_bytes()).to_vec()
}

/// Sorted `key=value` lines joined by `\n`, no trailing newline.
fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercase hex `HMAC_SHA256(secret, data_check_string)`.
fn sign_fields(secret: &[u8], fields: &BTreeMap<String, String>) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(data_check_string(fields).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn hashes_match(computed: &str, received: &str) -> bool {
    computed.as_bytes().ct_eq(received.as_bytes()).into()
}

/// Absent or empty `auth_date` passes; unparsable or too old fails.
fn auth_date_is_fresh(fields: &BTreeMap<String, String>, now: i64) -> bool {
    match fields.get(AUTH_DATE_FIELD) {
        Some(raw) if !raw.is_empty() => match raw.parse::<i64>() {
            Ok(auth_date) => now.saturating_sub(auth_date) <= AUTH_DATE_MAX_AGE_SECS,
            Err(_) => false,
        },
        _ => true,
    }
}
