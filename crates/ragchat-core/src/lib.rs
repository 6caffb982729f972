pub mod answer;
pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod session_api;
pub mod settings;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use answer::{parse_answer, AnswerFragment, ParsedAnswer};
pub use api::{ApiClient, ChatBackend};
pub use config::Config;
pub use controller::{perform, ChatController};
pub use error::ApiError;
pub use models::{
    AnswerPair, ChatAppRequest, ChatAppResponse, ChatReply, HistoryEntry, Session,
    SessionHistory, DEFAULT_SESSION_ID,
};
pub use session_api::SessionApi;
pub use settings::{ChatSettings, SettingsField};
pub use state::{BackendEvent, ChatState, CitationPreview, Effect, EXAMPLE_QUESTIONS};
