// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{SignatureValidator, TokenService};
use crate::config::AuthSettings;

/// Shared, read-only state handed to every handler and middleware.
#[derive(Clone, Debug)]
pub struct AppState {
    pub settings: Arc<AuthSettings>,
    pub tokens: Arc<TokenService>,
    pub signatures: Arc<SignatureValidator>,
}

impl AppState {
    pub fn new(settings: AuthSettings) -> Self {
        let tokens = TokenService::new(&settings);
        let signatures = SignatureValidator::new(settings.bot_token.clone());
        Self {
            settings: Arc::new(settings),
            tokens: Arc::new(tokens),
            signatures: Arc::new(signatures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TEST_BOT_TOKEN;

    #[test]
    fn services_share_one_configuration() {
        let state = AppState::new(AuthSettings::for_tests());
        assert_eq!(state.tokens.algorithm(), state.settings.algorithm);
        assert!(state.signatures.is_configured());
        assert_eq!(state.settings.bot_token, TEST_BOT_TOKEN);
    }

    #[test]
    fn empty_bot_token_leaves_validator_unconfigured() {
        let settings = AuthSettings::new(crate::config::TEST_SECRET_KEY, "").unwrap();
        let state = AppState::new(settings);
        assert!(!state.signatures.is_configured());
    }
}
