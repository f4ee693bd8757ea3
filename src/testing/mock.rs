//! Mock implementations of external services

use crate::line::{IdTokenVerifier, LineUserInfo, LineVerifyError};
use async_trait::async_trait;
use std::collections::HashMap;

/// LINE verifier that accepts a fixed set of ID tokens
#[derive(Debug, Default, Clone)]
pub struct StubVerifier {
    users: HashMap<String, LineUserInfo>,
}

impl StubVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `id_token` as the given LINE user
    #[must_use]
    pub fn with_user(mut self, id_token: &str, line_user_id: &str, display_name: Option<&str>) -> Self {
        self.users.insert(
            id_token.to_string(),
            LineUserInfo {
                line_user_id: line_user_id.to_string(),
                display_name: display_name.map(str::to_string),
            },
        );
        self
    }
}

#[async_trait]
impl IdTokenVerifier for StubVerifier {
    async fn verify(&self, id_token: &str) -> Result<LineUserInfo, LineVerifyError> {
        self.users
            .get(id_token)
            .cloned()
            .ok_or_else(|| LineVerifyError::Rejected("IdToken expired.".to_string()))
    }
}
