use std::collections::VecDeque;

use crate::api::ChatBackend;
use crate::state::{BackendEvent, ChatState, Effect};

/// Run one effect against the backend and report its outcome.
pub async fn perform<B: ChatBackend + ?Sized>(backend: &B, effect: Effect) -> BackendEvent {
    match effect {
        Effect::SendChat(request) => {
            let result = backend.chat(&request).await;
            BackendEvent::ChatFinished {
                question: request.prompt,
                result,
            }
        }
        Effect::RefreshSessions => BackendEvent::SessionsLoaded(backend.sessions().await),
        Effect::LoadHistory(session_id) => {
            let result = backend.session_history(&session_id).await;
            BackendEvent::HistoryLoaded { session_id, result }
        }
        Effect::FetchCitation(citation) => {
            let result = backend.citation_content(&citation).await;
            BackendEvent::CitationLoaded { citation, result }
        }
    }
}

/// Drives a `ChatState` by awaiting each effect in turn.
///
/// Every public method returns once the state has settled, i.e. every
/// follow-up load triggered by the action has completed.
pub struct ChatController<B> {
    state: ChatState,
    backend: B,
}

impl<B: ChatBackend> ChatController<B> {
    pub fn new(backend: B, state: ChatState) -> Self {
        Self { state, backend }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn mount(&mut self) {
        let effects = self.state.mount();
        self.run(effects).await;
    }

    pub async fn ask(&mut self, question: &str) {
        let effects = self.state.submit(question);
        self.run(effects).await;
    }

    pub async fn retry(&mut self) {
        let effects = self.state.retry();
        self.run(effects).await;
    }

    pub async fn clear_chat(&mut self) {
        let effects = self.state.clear_chat();
        self.run(effects).await;
    }

    pub async fn select_session(&mut self, session_id: &str) {
        let effects = self.state.select_session(session_id);
        self.run(effects).await;
    }

    pub async fn show_citation(&mut self, citation: &str, index: usize) {
        let effects = self.state.show_citation(citation, index);
        self.run(effects).await;
    }

    async fn run(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            if matches!(effect, Effect::LoadHistory(_)) {
                self.state.begin_history_load();
            }
            let event = perform(&self.backend, effect).await;
            queue.extend(self.state.apply(event));
        }
    }
}
