pub mod client;
pub mod decode;

pub use client::ApiClient;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{ChatAppRequest, ChatReply, Session, SessionHistory};

/// The network operations the chat view-controller depends on.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: &ChatAppRequest) -> Result<ChatReply, ApiError>;

    /// `Ok(empty)` when the backend reports sessions as unsupported
    async fn sessions(&self) -> Result<Vec<Session>, ApiError>;

    /// `Ok(None)` when the backend has no history for this id
    async fn session_history(&self, session_id: &str) -> Result<Option<SessionHistory>, ApiError>;

    async fn citation_content(&self, citation: &str) -> Result<String, ApiError>;
}
