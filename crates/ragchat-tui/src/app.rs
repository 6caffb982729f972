use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use ragchat_core::{
    parse_answer, perform, ApiClient, BackendEvent, ChatSettings, ChatState, Config, Effect,
    ParsedAnswer, SettingsField,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sessions,
    Chat,
    Input,
}

/// A settings text field being edited in the configuration panel
#[derive(Debug, Clone)]
pub struct SettingsEdit {
    pub field: SettingsField,
    pub buffer: String,
    pub cursor: usize,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub chat: ChatState,

    // Question input
    pub query_input: String,
    pub query_cursor: usize, // cursor position in query_input, in chars

    // Transcript view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub citation_idx: Option<usize>, // citation of the selected answer

    // Session list
    pub session_state: ListState,

    // Configuration panel
    pub show_settings: bool,
    pub settings_state: ListState,
    pub settings_edit: Option<SettingsEdit>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sessions_area: Option<Rect>,

    // Backend
    pub client: ApiClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(client: ApiClient, settings: ChatSettings, events: UnboundedSender<AppEvent>) -> Self {
        let mut settings_state = ListState::default();
        settings_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,
            chat: ChatState::new(settings),

            query_input: String::new(),
            query_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            citation_idx: None,

            session_state: ListState::default(),

            show_settings: false,
            settings_state,
            settings_edit: None,

            animation_frame: 0,

            chat_area: None,
            sessions_area: None,

            client,
            events,
        }
    }

    pub fn mount(&mut self) {
        let effects = self.chat.mount();
        self.dispatch(effects);
    }

    /// Run effects on background tasks; results come back as `AppEvent::Backend`.
    pub fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            if matches!(effect, Effect::LoadHistory(_)) {
                self.chat.begin_history_load();
            }
            tracing::debug!(?effect, "dispatching");

            let client = self.client.clone();
            let tx = self.events.clone();
            tokio::spawn(async move {
                let event = perform(&client, effect).await;
                // The receiver only goes away when the app is shutting down
                let _ = tx.send(AppEvent::Backend(event));
            });
        }
    }

    pub fn handle_backend(&mut self, event: BackendEvent) {
        let answered = matches!(event, BackendEvent::ChatFinished { .. });
        let reloaded = matches!(event, BackendEvent::HistoryLoaded { .. });

        let effects = self.chat.apply(event);

        if answered || reloaded {
            self.citation_idx = None;
            if answered && !self.chat.answers.is_empty() {
                self.chat.selected_answer = self.chat.answers.len() - 1;
            }
            self.scroll_chat_to_bottom();
        }
        self.sync_session_selection();
        self.dispatch(effects);
    }

    // Questions

    /// Send the question box contents. Ignored while a request is running.
    pub fn submit_input(&mut self) {
        let question = self.query_input.trim().to_string();
        if question.is_empty() || self.chat.is_loading {
            return;
        }
        self.query_input.clear();
        self.query_cursor = 0;
        self.ask(&question);
    }

    pub fn ask(&mut self, question: &str) {
        let effects = self.chat.submit(question);
        self.citation_idx = None;
        self.scroll_chat_to_bottom();
        self.dispatch(effects);
    }

    pub fn retry(&mut self) {
        if self.chat.error.is_some() {
            let effects = self.chat.retry();
            self.scroll_chat_to_bottom();
            self.dispatch(effects);
        }
    }

    pub fn clear_chat(&mut self) {
        if !self.chat.can_clear() {
            return;
        }
        let effects = self.chat.clear_chat();
        self.chat_scroll = 0;
        self.citation_idx = None;
        self.dispatch(effects);
    }

    /// Number keys: example questions on an empty transcript, follow-ups
    /// under the last answer otherwise.
    pub fn ask_suggestion(&mut self, n: usize) {
        let suggestions = self.suggestions();
        if let Some(question) = n.checked_sub(1).and_then(|i| suggestions.get(i)).cloned() {
            self.ask(&question);
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        if self.chat.last_question.is_empty() {
            return ragchat_core::EXAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect();
        }
        if !self.chat.settings.suggest_followup_questions || self.chat.is_loading {
            return Vec::new();
        }
        self.chat
            .answers
            .last()
            .map(|(_, response)| parse_answer(response).followup_questions)
            .unwrap_or_default()
    }

    // Sessions

    pub fn session_nav_down(&mut self) {
        let len = self.chat.sessions.len();
        if len > 0 {
            let i = self.session_state.selected().map(|i| (i + 1) % len).unwrap_or(0);
            self.session_state.select(Some(i));
        }
    }

    pub fn session_nav_up(&mut self) {
        let len = self.chat.sessions.len();
        if len > 0 {
            let i = self.session_state.selected().map(|i| (i + len - 1) % len).unwrap_or(0);
            self.session_state.select(Some(i));
        }
    }

    pub fn open_selected_session(&mut self) {
        let Some(session_id) = self
            .session_state
            .selected()
            .and_then(|i| self.chat.sessions.get(i))
            .map(|s| s.session_id.clone())
        else {
            return;
        };
        let effects = self.chat.select_session(&session_id);
        if !effects.is_empty() {
            self.chat_scroll = 0;
            self.citation_idx = None;
        }
        self.dispatch(effects);
    }

    /// Keep the list cursor on the active session after the list reloads
    fn sync_session_selection(&mut self) {
        if self.chat.sessions.is_empty() {
            self.session_state.select(None);
            return;
        }
        let active = self
            .chat
            .sessions
            .iter()
            .position(|s| s.session_id == self.chat.session_id);
        match (active, self.session_state.selected()) {
            (Some(i), _) => self.session_state.select(Some(i)),
            (None, Some(i)) if i < self.chat.sessions.len() => {}
            (None, _) => self.session_state.select(Some(0)),
        }
    }

    // Transcript navigation

    pub fn answer_nav_down(&mut self) {
        let len = self.chat.answers.len();
        if len > 0 && self.chat.selected_answer + 1 < len {
            self.chat.selected_answer += 1;
            self.citation_idx = None;
        }
    }

    pub fn answer_nav_up(&mut self) {
        if self.chat.selected_answer > 0 {
            self.chat.selected_answer -= 1;
            self.citation_idx = None;
        }
    }

    pub fn selected_answer(&self) -> Option<ParsedAnswer> {
        self.chat
            .answers
            .get(self.chat.selected_answer)
            .map(|(_, response)| parse_answer(response))
    }

    pub fn citation_next(&mut self) {
        let count = self.selected_answer().map(|a| a.citations.len()).unwrap_or(0);
        if count > 0 {
            self.citation_idx = Some(self.citation_idx.map(|i| (i + 1) % count).unwrap_or(0));
        }
    }

    pub fn citation_prev(&mut self) {
        let count = self.selected_answer().map(|a| a.citations.len()).unwrap_or(0);
        if count > 0 {
            self.citation_idx = Some(self.citation_idx.map(|i| (i + count - 1) % count).unwrap_or(count - 1));
        }
    }

    pub fn selected_citation(&self) -> Option<String> {
        let idx = self.citation_idx?;
        self.selected_answer()?.citations.get(idx).cloned()
    }

    pub fn open_selected_citation(&mut self) {
        if let Some(citation) = self.selected_citation() {
            let index = self.chat.selected_answer;
            let effects = self.chat.show_citation(&citation, index);
            self.dispatch(effects);
        }
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll the transcript so the newest turn is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        // Count in usize; a long answer easily exceeds u16
        let wrapped = |text: &str| -> usize {
            text.lines()
                .map(|line| {
                    // Use character count, not byte length, for proper UTF-8 handling
                    let char_count = line.chars().count();
                    (char_count / wrap_width) + 1
                })
                .sum::<usize>()
                .max(1)
        };

        let mut total_lines: usize = 0;
        for (question, response) in &self.chat.answers {
            total_lines += 2 + wrapped(question); // "You:" + question + blank
            total_lines += 3 + wrapped(&response.message); // "Answer:" + text + citations + blank
        }
        if self.chat.is_loading || self.chat.error.is_some() {
            total_lines += 4 + wrapped(&self.chat.last_question);
        }

        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    // Configuration panel

    pub fn selected_setting(&self) -> Option<SettingsField> {
        self.settings_state
            .selected()
            .and_then(|i| SettingsField::all().get(i).copied())
    }

    pub fn settings_nav_down(&mut self) {
        let len = SettingsField::all().len();
        let i = self.settings_state.selected().map(|i| (i + 1) % len).unwrap_or(0);
        self.settings_state.select(Some(i));
    }

    pub fn settings_nav_up(&mut self) {
        let len = SettingsField::all().len();
        let i = self.settings_state.selected().map(|i| (i + len - 1) % len).unwrap_or(0);
        self.settings_state.select(Some(i));
    }

    /// Toggle the selected setting, or start editing it if it is free text
    pub fn activate_setting(&mut self) {
        let Some(field) = self.selected_setting() else {
            return;
        };
        if field.is_text() {
            let buffer = self.chat.settings.text_value(field).unwrap_or_default();
            let cursor = buffer.chars().count();
            self.settings_edit = Some(SettingsEdit { field, buffer, cursor });
        } else {
            self.chat.settings.toggle(field);
        }
    }

    pub fn commit_settings_edit(&mut self) {
        if let Some(edit) = self.settings_edit.take() {
            self.chat.settings.set_text(edit.field, edit.buffer);
        }
    }

    pub fn close_settings(&mut self) {
        self.settings_edit = None;
        self.show_settings = false;
        if let Err(e) = Config::save_settings(&self.chat.settings) {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::{ChatAppResponse, SessionApi, Session};

    fn test_app() -> App {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let client = ApiClient::new("http://localhost:5000", SessionApi::PathParams);
        App::new(client, ChatSettings::default(), tx)
    }

    fn push_answer(app: &mut App, message: &str) {
        app.chat.answers.push((
            "q".to_string(),
            ChatAppResponse {
                message: message.to_string(),
                session_id: "1234".to_string(),
                citations: None,
            },
        ));
    }

    #[test]
    fn test_empty_transcript_suggests_examples() {
        let app = test_app();
        assert_eq!(app.suggestions().len(), ragchat_core::EXAMPLE_QUESTIONS.len());
    }

    #[test]
    fn test_followups_only_when_enabled() {
        let mut app = test_app();
        app.chat.last_question = "q".into();
        push_answer(&mut app, "Yes. <<How heavy is it?>>");
        assert!(app.suggestions().is_empty());

        app.chat.settings.suggest_followup_questions = true;
        assert_eq!(app.suggestions(), vec!["How heavy is it?".to_string()]);
    }

    #[test]
    fn test_citation_walk_wraps() {
        let mut app = test_app();
        push_answer(&mut app, "See [a.pdf] and [b.pdf].");
        app.citation_next();
        assert_eq!(app.selected_citation().as_deref(), Some("a.pdf"));
        app.citation_next();
        app.citation_next();
        assert_eq!(app.selected_citation().as_deref(), Some("a.pdf"));
        app.citation_prev();
        assert_eq!(app.selected_citation().as_deref(), Some("b.pdf"));
    }

    #[test]
    fn test_session_selection_follows_active_session() {
        let mut app = test_app();
        app.chat.sessions = vec![
            Session { session_id: "x".into(), title: "X".into() },
            Session { session_id: "1234".into(), title: "Current".into() },
        ];
        app.sync_session_selection();
        assert_eq!(app.session_state.selected(), Some(1));
        app.session_nav_down();
        assert_eq!(app.session_state.selected(), Some(0));
    }

    #[test]
    fn test_text_setting_edit_commits() {
        let mut app = test_app();
        app.settings_state.select(Some(0)); // prompt template
        app.activate_setting();
        let edit = app.settings_edit.as_mut().unwrap();
        edit.buffer.push_str("Answer briefly.");
        app.commit_settings_edit();
        assert_eq!(app.chat.settings.prompt_template, "Answer briefly.");
        assert!(app.settings_edit.is_none());
    }

    #[test]
    fn test_scroll_to_bottom_clamps_huge_answers() {
        let mut app = test_app();
        push_answer(&mut app, &"x\n".repeat(70_000));
        app.chat_height = 20;
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 20);
    }

    #[test]
    fn test_scroll_to_bottom_small_transcript() {
        let mut app = test_app();
        push_answer(&mut app, "short");
        app.chat_height = 20;
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, 0);
    }

    #[test]
    fn test_retrieve_count_is_typed_in() {
        let mut app = test_app();
        app.settings_state.select(Some(1)); // retrieve count
        app.activate_setting();
        let edit = app.settings_edit.as_mut().unwrap();
        assert_eq!(edit.buffer, "3");
        edit.buffer = "eight".into();
        app.commit_settings_edit();
        assert_eq!(app.chat.settings.retrieve_count, 3);

        app.activate_setting();
        app.settings_edit.as_mut().unwrap().buffer = "8".into();
        app.commit_settings_edit();
        assert_eq!(app.chat.settings.retrieve_count, 8);
    }

    #[test]
    fn test_submit_ignored_while_loading() {
        let mut app = test_app();
        app.chat.is_loading = true;
        app.query_input = "hello".into();
        app.submit_input();
        assert_eq!(app.query_input, "hello");
    }
}
