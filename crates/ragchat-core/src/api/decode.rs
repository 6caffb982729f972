//! Turning raw backend responses into typed results.
//!
//! Kept free of I/O so every status and content-type combination can be
//! exercised without a server.

use reqwest::StatusCode;

use crate::error::ApiError;
use crate::models::{
    BodyHistoryEnvelope, ChatAppResponse, ChatReply, PathHistoryEnvelope, Session,
    SessionHistory, SessionListEnvelope,
};
use crate::session_api::SessionApi;

/// Whether the chat endpoint answered with an error page instead of JSON.
/// A missing content type counts as text.
fn is_text_body(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => ct.contains("text/html") || ct.contains("text/plain"),
    }
}

pub fn chat_reply(
    status: StatusCode,
    content_type: Option<&str>,
    body: &str,
) -> Result<ChatReply, ApiError> {
    if is_text_body(content_type) {
        return Ok(ChatReply::Rejected(body.to_string()));
    }
    if !status.is_success() {
        return Err(ApiError::status(status));
    }
    if body.trim().is_empty() {
        return Err(ApiError::EmptyBody);
    }
    let response: ChatAppResponse = serde_json::from_str(body)?;
    Ok(ChatReply::Answer(response))
}

pub fn session_list(
    api: SessionApi,
    status: StatusCode,
    body: &str,
) -> Result<Vec<Session>, ApiError> {
    if status == StatusCode::NOT_FOUND && api.tolerates_missing_list() {
        return Ok(Vec::new());
    }
    if !status.is_success() {
        return Err(ApiError::status(status));
    }
    match api {
        SessionApi::PathParams => Ok(serde_json::from_str::<Vec<Session>>(body)?),
        SessionApi::JsonBody => Ok(serde_json::from_str::<SessionListEnvelope>(body)?.sessions),
    }
}

pub fn session_history(
    api: SessionApi,
    status: StatusCode,
    body: &str,
) -> Result<Option<SessionHistory>, ApiError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(ApiError::status(status));
    }
    let entries = match api {
        SessionApi::PathParams => serde_json::from_str::<PathHistoryEnvelope>(body)?.history,
        SessionApi::JsonBody => serde_json::from_str::<BodyHistoryEnvelope>(body)?.chat_history,
    };
    Ok(Some(SessionHistory { entries }))
}
