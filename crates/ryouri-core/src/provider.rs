use async_trait::async_trait;

use crate::error::SendError;
use crate::state::Turn;

/// Everything one remote call needs: the system instruction and the full
/// transcript up to and including the new user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub system: String,
    pub messages: Vec<Turn>,
}

/// The remote model behind a send cycle
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Issue exactly one request and return the assistant's reply text
    async fn complete(&self, request: &SendRequest) -> Result<String, SendError>;

    fn model(&self) -> &str;

    fn display_name(&self) -> &'static str;
}
