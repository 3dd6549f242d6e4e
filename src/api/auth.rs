use crate::error::{ClientError, ClientResult};

/// Source of bearer tokens. Token acquisition itself belongs to the
/// identity provider; this is only the hand-off point.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> ClientResult<String>;
}

/// Token handed over by the UI shell (or the environment) at session start.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        StaticToken(token.filter(|t| !t.trim().is_empty()))
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> ClientResult<String> {
        self.0
            .clone()
            .ok_or_else(|| ClientError::Auth("no access token in session".to_string()))
    }
}
