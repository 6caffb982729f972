//! Wire types exchanged with the chat backend
//!
//! These are shared by every UI and carry no presentation state.

use serde::{Deserialize, Deserializer, Serialize};

/// Session id used before the backend has assigned one
pub const DEFAULT_SESSION_ID: &str = "1234";

/// One outgoing user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAppRequest {
    pub prompt: String,
    pub session_id: String,
}

/// One backend answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAppResponse {
    pub message: String,
    /// Echoed or server-assigned session id, empty when the backend omits it
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
}

/// What came back from `POST /ai` when the backend did answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Answer(ChatAppResponse),
    /// HTML or plain-text body, shown to the user as an error
    Rejected(String),
}

/// A stored conversation as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub title: String,
}

/// One stored turn of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default, deserialize_with = "content_as_text")]
    pub content: String,
}

/// Stored turns are not always strings: null becomes empty, numbers and
/// other scalars keep their JSON text.
fn content_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Prior turns of a session. `None` entries means the payload had no list at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHistory {
    pub entries: Option<Vec<HistoryEntry>>,
}

/// A question and the answer it received
pub type AnswerPair = (String, ChatAppResponse);

// Response envelopes for the two session endpoint families

#[derive(Deserialize)]
pub(crate) struct SessionListEnvelope {
    pub sessions: Vec<Session>,
}

#[derive(Deserialize)]
pub(crate) struct PathHistoryEnvelope {
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
}

#[derive(Deserialize)]
pub(crate) struct BodyHistoryEnvelope {
    #[serde(default)]
    pub chat_history: Option<Vec<HistoryEntry>>,
}

#[derive(Serialize)]
pub(crate) struct SessionLoadRequest<'a> {
    pub session_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_without_session_id() {
        let resp: ChatAppResponse = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(resp.message, "hi");
        assert!(resp.session_id.is_empty());
        assert!(resp.citations.is_none());
    }

    #[test]
    fn test_history_content_coerced_to_text() {
        let entries: Vec<HistoryEntry> = serde_json::from_str(
            r#"[{"role":"user","content":42},{"role":"assistant","content":null},{"role":"user"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].content, "42");
        assert_eq!(entries[1].content, "");
        assert_eq!(entries[2].content, "");
    }

    #[test]
    fn test_session_load_request_body() {
        let value = serde_json::to_value(SessionLoadRequest { session_id: "abc" }).unwrap();
        assert_eq!(value, serde_json::json!({"session_id": "abc"}));
    }

    #[test]
    fn test_request_serializes_only_prompt_and_session() {
        let req = ChatAppRequest {
            prompt: "what is product FR-R92B-58?".to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"prompt": "what is product FR-R92B-58?", "session_id": "1234"})
        );
    }
}
