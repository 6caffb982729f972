//! UI-agnostic chat state
//!
//! `ChatState` is the view-controller behind every front end. Transitions
//! never perform I/O: they return the `Effect`s the caller must run, and the
//! outcomes come back in as `BackendEvent`s.

use crate::error::ApiError;
use crate::models::{
    AnswerPair, ChatAppRequest, ChatReply, Session, SessionHistory, DEFAULT_SESSION_ID,
};
use crate::settings::ChatSettings;
use crate::transcript::pair_history;

/// Questions offered on an empty transcript
pub const EXAMPLE_QUESTIONS: [&str; 3] = [
    "What is product FR-R92B-58?",
    "Which road frames come in a 58cm size?",
    "What does the warranty cover for mountain bikes?",
];

/// Network work requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendChat(ChatAppRequest),
    RefreshSessions,
    LoadHistory(String),
    FetchCitation(String),
}

/// Outcome of an `Effect`
#[derive(Debug)]
pub enum BackendEvent {
    ChatFinished {
        question: String,
        result: Result<ChatReply, ApiError>,
    },
    SessionsLoaded(Result<Vec<Session>, ApiError>),
    HistoryLoaded {
        session_id: String,
        result: Result<Option<SessionHistory>, ApiError>,
    },
    CitationLoaded {
        citation: String,
        result: Result<String, ApiError>,
    },
}

/// The document behind a citation, as shown in the preview panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationPreview {
    pub citation: String,
    /// `None` while the fetch is in flight
    pub content: Option<Result<String, String>>,
}

#[derive(Debug, Clone)]
pub struct ChatState {
    pub answers: Vec<AnswerPair>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub session_id: String,
    pub sessions: Vec<Session>,
    pub has_sessions: bool,
    pub last_question: String,
    pub active_citation: Option<String>,
    pub selected_answer: usize,
    pub citation_preview: Option<CitationPreview>,
    pub settings: ChatSettings,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(ChatSettings::default())
    }
}

impl ChatState {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            answers: Vec::new(),
            is_loading: false,
            error: None,
            session_id: DEFAULT_SESSION_ID.to_string(),
            sessions: Vec::new(),
            has_sessions: false,
            last_question: String::new(),
            active_citation: None,
            selected_answer: 0,
            citation_preview: None,
            settings,
        }
    }

    /// Initial loads: the session list and the active session's history
    pub fn mount(&self) -> Vec<Effect> {
        vec![Effect::RefreshSessions, Effect::LoadHistory(self.session_id.clone())]
    }

    pub fn submit(&mut self, question: &str) -> Vec<Effect> {
        self.last_question = question.to_string();
        self.error = None;
        self.is_loading = true;
        self.active_citation = None;

        vec![Effect::SendChat(ChatAppRequest {
            prompt: question.to_string(),
            session_id: self.session_id.clone(),
        })]
    }

    /// Resubmit the last question, if there is one
    pub fn retry(&mut self) -> Vec<Effect> {
        if self.last_question.is_empty() {
            return Vec::new();
        }
        let question = self.last_question.clone();
        self.submit(&question)
    }

    /// Called when a `LoadHistory` effect is dispatched
    pub fn begin_history_load(&mut self) {
        self.error = None;
        self.is_loading = true;
        self.active_citation = None;
    }

    pub fn clear_chat(&mut self) -> Vec<Effect> {
        self.last_question.clear();
        self.error = None;
        self.active_citation = None;
        self.citation_preview = None;
        self.answers.clear();
        self.selected_answer = 0;
        self.is_loading = false;

        let mut effects = vec![Effect::RefreshSessions];
        if self.set_session_id(DEFAULT_SESSION_ID) {
            effects.push(Effect::LoadHistory(self.session_id.clone()));
        }
        effects
    }

    pub fn can_clear(&self) -> bool {
        !self.last_question.is_empty() && !self.is_loading
    }

    pub fn select_session(&mut self, session_id: &str) -> Vec<Effect> {
        if self.set_session_id(session_id) {
            vec![Effect::LoadHistory(self.session_id.clone())]
        } else {
            Vec::new()
        }
    }

    pub fn show_citation(&mut self, citation: &str, index: usize) -> Vec<Effect> {
        self.active_citation = Some(citation.to_string());
        self.selected_answer = index;
        self.citation_preview = Some(CitationPreview {
            citation: citation.to_string(),
            content: None,
        });
        vec![Effect::FetchCitation(citation.to_string())]
    }

    pub fn close_citation(&mut self) {
        self.citation_preview = None;
    }

    /// Switch the active session id without loading anything. Blank ids are
    /// ignored; returns whether the id changed.
    pub fn set_session_id(&mut self, session_id: &str) -> bool {
        if session_id.trim().is_empty() || session_id == self.session_id {
            return false;
        }
        self.session_id = session_id.to_string();
        true
    }

    pub fn apply(&mut self, event: BackendEvent) -> Vec<Effect> {
        match event {
            BackendEvent::ChatFinished { question, result } => self.apply_chat(question, result),
            BackendEvent::SessionsLoaded(result) => {
                self.apply_sessions(result);
                Vec::new()
            }
            BackendEvent::HistoryLoaded { session_id, result } => {
                self.apply_history(&session_id, result)
            }
            BackendEvent::CitationLoaded { citation, result } => {
                self.apply_citation(&citation, result);
                Vec::new()
            }
        }
    }

    fn apply_chat(&mut self, question: String, result: Result<ChatReply, ApiError>) -> Vec<Effect> {
        self.is_loading = false;

        match result {
            Ok(ChatReply::Answer(response)) => {
                let mut effects = vec![Effect::RefreshSessions];
                if self.set_session_id(&response.session_id) {
                    effects.push(Effect::LoadHistory(self.session_id.clone()));
                }
                self.answers.push((question, response));
                effects
            }
            Ok(ChatReply::Rejected(text)) => {
                tracing::error!("Chat error: {}", text);
                self.error = Some(text);
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Chat error: {}", e);
                self.error = Some(e.to_string());
                Vec::new()
            }
        }
    }

    fn apply_sessions(&mut self, result: Result<Vec<Session>, ApiError>) {
        match result {
            Ok(sessions) => {
                tracing::debug!(count = sessions.len(), "sessions loaded");
                self.sessions = sessions;
                self.has_sessions = true;
            }
            Err(e) => {
                tracing::info!("Failed to load sessions: {}", e);
                self.has_sessions = false;
            }
        }
    }

    fn apply_history(
        &mut self,
        session_id: &str,
        result: Result<Option<SessionHistory>, ApiError>,
    ) -> Vec<Effect> {
        self.is_loading = false;

        if session_id != self.session_id {
            tracing::debug!(
                session_id,
                active = %self.session_id,
                "dropping history for inactive session"
            );
            return Vec::new();
        }

        match result {
            Ok(Some(history)) => {
                let entries = history.entries.unwrap_or_default();
                if let Some(last) = entries.last() {
                    self.last_question = last.content.clone();
                }
                self.answers = pair_history(&entries, session_id);
                self.selected_answer = 0;
                vec![Effect::RefreshSessions]
            }
            Ok(None) => {
                tracing::debug!(session_id, "no stored history");
                Vec::new()
            }
            Err(e) => {
                tracing::debug!(session_id, "session history unavailable: {}", e);
                Vec::new()
            }
        }
    }

    fn apply_citation(&mut self, citation: &str, result: Result<String, ApiError>) {
        match self.citation_preview.as_mut() {
            Some(preview) if preview.citation == citation => {
                preview.content = Some(result.map_err(|e| e.to_string()));
            }
            _ => tracing::debug!(citation, "citation preview closed before content arrived"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatAppResponse, HistoryEntry};
    use reqwest::StatusCode;

    fn answer(message: &str, session_id: &str) -> Result<ChatReply, ApiError> {
        Ok(ChatReply::Answer(ChatAppResponse {
            message: message.to_string(),
            session_id: session_id.to_string(),
            citations: None,
        }))
    }

    fn history(contents: &[&str]) -> SessionHistory {
        SessionHistory {
            entries: Some(
                contents
                    .iter()
                    .enumerate()
                    .map(|(i, c)| HistoryEntry {
                        role: if i % 2 == 0 { "user" } else { "assistant" }.to_string(),
                        content: c.to_string(),
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_mount_loads_sessions_and_history() {
        let state = ChatState::default();
        assert_eq!(
            state.mount(),
            vec![Effect::RefreshSessions, Effect::LoadHistory("1234".into())]
        );
    }

    #[test]
    fn test_blank_session_id_is_ignored() {
        let mut state = ChatState::default();
        assert!(!state.set_session_id(""));
        assert!(!state.set_session_id("   "));
        assert_eq!(state.session_id, DEFAULT_SESSION_ID);
        assert!(state.set_session_id("abc"));
        assert_eq!(state.session_id, "abc");
    }

    #[test]
    fn test_submit_sends_prompt_with_current_session() {
        let mut state = ChatState::default();
        state.error = Some("old".into());
        let effects = state.submit("what is product FR-R92B-58?");
        assert!(state.is_loading);
        assert!(state.error.is_none());
        assert_eq!(
            effects,
            vec![Effect::SendChat(ChatAppRequest {
                prompt: "what is product FR-R92B-58?".into(),
                session_id: "1234".into(),
            })]
        );
    }

    #[test]
    fn test_successful_answer_appends_one_pair() {
        let mut state = ChatState::default();
        state.answers.push(("earlier".into(), ChatAppResponse {
            message: "before".into(),
            session_id: "1234".into(),
            citations: None,
        }));
        state.submit("q");
        let effects = state.apply(BackendEvent::ChatFinished {
            question: "q".into(),
            result: answer("a", ""),
        });
        assert!(!state.is_loading);
        assert_eq!(state.answers.len(), 2);
        assert_eq!(state.answers[1].0, "q");
        assert_eq!(state.answers[0].0, "earlier");
        assert_eq!(state.session_id, "1234");
        assert_eq!(effects, vec![Effect::RefreshSessions]);
    }

    #[test]
    fn test_server_assigned_session_is_adopted() {
        let mut state = ChatState::default();
        state.submit("q");
        let effects = state.apply(BackendEvent::ChatFinished {
            question: "q".into(),
            result: answer("a", "srv-42"),
        });
        assert_eq!(state.session_id, "srv-42");
        assert_eq!(
            effects,
            vec![Effect::RefreshSessions, Effect::LoadHistory("srv-42".into())]
        );
    }

    #[test]
    fn test_text_reply_sets_error_and_keeps_transcript() {
        let mut state = ChatState::default();
        state.submit("q");
        let effects = state.apply(BackendEvent::ChatFinished {
            question: "q".into(),
            result: Ok(ChatReply::Rejected("internal error".into())),
        });
        assert!(effects.is_empty());
        assert_eq!(state.error.as_deref(), Some("internal error"));
        assert!(state.answers.is_empty());
        assert!(!state.is_loading);
    }

    #[test]
    fn test_status_error_is_shown_as_status_text() {
        let mut state = ChatState::default();
        state.submit("q");
        state.apply(BackendEvent::ChatFinished {
            question: "q".into(),
            result: Err(ApiError::status(StatusCode::BAD_GATEWAY)),
        });
        assert_eq!(state.error.as_deref(), Some("Bad Gateway"));
    }

    #[test]
    fn test_error_survives_until_next_submit() {
        let mut state = ChatState::default();
        state.error = Some("boom".into());
        state.apply(BackendEvent::SessionsLoaded(Ok(Vec::new())));
        assert_eq!(state.error.as_deref(), Some("boom"));
        state.submit("again");
        assert!(state.error.is_none());
    }

    #[test]
    fn test_clear_chat_resets_to_sentinel() {
        let mut state = ChatState::default();
        state.session_id = "srv-42".into();
        state.last_question = "q".into();
        state.answers.push(("q".into(), ChatAppResponse {
            message: "a".into(),
            session_id: "srv-42".into(),
            citations: None,
        }));
        state.error = Some("e".into());

        let effects = state.clear_chat();
        assert!(state.answers.is_empty());
        assert_eq!(state.session_id, DEFAULT_SESSION_ID);
        assert!(state.last_question.is_empty());
        assert!(state.error.is_none());
        assert_eq!(
            effects,
            vec![Effect::RefreshSessions, Effect::LoadHistory("1234".into())]
        );
    }

    #[test]
    fn test_can_clear_requires_question_and_idle() {
        let mut state = ChatState::default();
        assert!(!state.can_clear());
        state.submit("q");
        assert!(!state.can_clear());
        state.is_loading = false;
        assert!(state.can_clear());
    }

    #[test]
    fn test_history_rebuilds_transcript() {
        let mut state = ChatState::default();
        state.begin_history_load();
        let effects = state.apply(BackendEvent::HistoryLoaded {
            session_id: "1234".into(),
            result: Ok(Some(history(&["q1", "a1", "q2", "a2", "q3"]))),
        });
        assert!(!state.is_loading);
        assert_eq!(state.answers.len(), 2);
        assert_eq!(state.answers[1].1.message, "a2");
        assert_eq!(state.last_question, "q3");
        assert_eq!(effects, vec![Effect::RefreshSessions]);
    }

    #[test]
    fn test_history_404_changes_nothing() {
        let mut state = ChatState::default();
        state.answers.push(("q".into(), ChatAppResponse {
            message: "a".into(),
            session_id: "1234".into(),
            citations: None,
        }));
        state.begin_history_load();
        let effects = state.apply(BackendEvent::HistoryLoaded {
            session_id: "1234".into(),
            result: Ok(None),
        });
        assert!(effects.is_empty());
        assert_eq!(state.answers.len(), 1);
        assert!(state.error.is_none());
        assert!(!state.is_loading);
    }

    #[test]
    fn test_history_failure_is_swallowed() {
        let mut state = ChatState::default();
        state.begin_history_load();
        state.apply(BackendEvent::HistoryLoaded {
            session_id: "1234".into(),
            result: Err(ApiError::status(StatusCode::INTERNAL_SERVER_ERROR)),
        });
        assert!(state.error.is_none());
    }

    #[test]
    fn test_history_without_list_empties_transcript() {
        let mut state = ChatState::default();
        state.answers.push(("q".into(), ChatAppResponse {
            message: "a".into(),
            session_id: "1234".into(),
            citations: None,
        }));
        state.apply(BackendEvent::HistoryLoaded {
            session_id: "1234".into(),
            result: Ok(Some(SessionHistory { entries: None })),
        });
        assert!(state.answers.is_empty());
    }

    #[test]
    fn test_stale_history_is_dropped() {
        let mut state = ChatState::default();
        state.select_session("b");
        let effects = state.apply(BackendEvent::HistoryLoaded {
            session_id: "a".into(),
            result: Ok(Some(history(&["qa", "aa"]))),
        });
        assert!(effects.is_empty());
        assert!(state.answers.is_empty());
        assert_eq!(state.session_id, "b");
    }

    #[test]
    fn test_session_list_failure_hides_sessions_silently() {
        let mut state = ChatState::default();
        state.apply(BackendEvent::SessionsLoaded(Ok(vec![Session {
            session_id: "a".into(),
            title: "A".into(),
        }])));
        assert!(state.has_sessions);

        state.apply(BackendEvent::SessionsLoaded(Err(ApiError::status(StatusCode::NOT_FOUND))));
        assert!(!state.has_sessions);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_selecting_active_session_is_noop() {
        let mut state = ChatState::default();
        assert!(state.select_session("1234").is_empty());
        assert_eq!(state.select_session("x"), vec![Effect::LoadHistory("x".into())]);
    }

    #[test]
    fn test_retry_resubmits_last_question() {
        let mut state = ChatState::default();
        assert!(state.retry().is_empty());
        state.submit("q");
        state.apply(BackendEvent::ChatFinished {
            question: "q".into(),
            result: Ok(ChatReply::Rejected("nope".into())),
        });
        let effects = state.retry();
        assert!(matches!(&effects[..], [Effect::SendChat(req)] if req.prompt == "q"));
        assert!(state.error.is_none());
    }

    #[test]
    fn test_citation_preview_ignores_other_citations() {
        let mut state = ChatState::default();
        let effects = state.show_citation("a.pdf", 2);
        assert_eq!(effects, vec![Effect::FetchCitation("a.pdf".into())]);
        assert_eq!(state.selected_answer, 2);

        state.apply(BackendEvent::CitationLoaded {
            citation: "b.pdf".into(),
            result: Ok("other".into()),
        });
        assert_eq!(state.citation_preview.as_ref().unwrap().content, None);

        state.apply(BackendEvent::CitationLoaded {
            citation: "a.pdf".into(),
            result: Ok("body".into()),
        });
        assert_eq!(
            state.citation_preview.as_ref().unwrap().content,
            Some(Ok("body".to_string()))
        );
    }
}
