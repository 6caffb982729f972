//! Answer-generation settings shown in the configuration panel.
//!
//! Only `suggest_followup_questions` changes what the client displays. The
//! rest are kept and persisted but are not part of the outgoing request.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RETRIEVE_COUNT: u8 = 3;
pub const MIN_RETRIEVE_COUNT: u8 = 1;
pub const MAX_RETRIEVE_COUNT: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    #[default]
    Hybrid,
    Vectors,
    Text,
}

impl RetrievalMode {
    pub fn label(&self) -> &'static str {
        match self {
            RetrievalMode::Hybrid => "Vectors + Text (Hybrid)",
            RetrievalMode::Vectors => "Vectors",
            RetrievalMode::Text => "Text",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            RetrievalMode::Hybrid => RetrievalMode::Vectors,
            RetrievalMode::Vectors => RetrievalMode::Text,
            RetrievalMode::Text => RetrievalMode::Hybrid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VectorField {
    Embedding,
    ImageEmbedding,
}

impl VectorField {
    pub fn label(&self) -> &'static str {
        match self {
            VectorField::Embedding => "Text embeddings",
            VectorField::ImageEmbedding => "Image embeddings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub prompt_template: String,
    pub retrieve_count: u8,
    pub retrieval_mode: RetrievalMode,
    pub use_semantic_ranker: bool,
    pub use_semantic_captions: bool,
    pub exclude_category: String,
    pub suggest_followup_questions: bool,
    pub vector_fields: Vec<VectorField>,
    pub use_oid_security_filter: bool,
    pub use_groups_security_filter: bool,
    pub should_stream: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            prompt_template: String::new(),
            retrieve_count: DEFAULT_RETRIEVE_COUNT,
            retrieval_mode: RetrievalMode::default(),
            use_semantic_ranker: true,
            use_semantic_captions: false,
            exclude_category: String::new(),
            suggest_followup_questions: false,
            vector_fields: vec![VectorField::Embedding],
            use_oid_security_filter: false,
            use_groups_security_filter: false,
            should_stream: true,
        }
    }
}

/// Parse spin-box input, falling back to the default on anything unparsable
pub fn parse_retrieve_count(input: &str) -> u8 {
    input
        .trim()
        .parse::<i64>()
        .map(|n| n.clamp(MIN_RETRIEVE_COUNT as i64, MAX_RETRIEVE_COUNT as i64) as u8)
        .unwrap_or(DEFAULT_RETRIEVE_COUNT)
}

/// Rows of the configuration panel, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    PromptTemplate,
    RetrieveCount,
    ExcludeCategory,
    SemanticRanker,
    SemanticCaptions,
    FollowupQuestions,
    RetrievalMode,
    VectorFields,
    OidSecurityFilter,
    GroupsSecurityFilter,
    Stream,
}

impl SettingsField {
    pub fn all() -> Vec<SettingsField> {
        vec![
            SettingsField::PromptTemplate,
            SettingsField::RetrieveCount,
            SettingsField::ExcludeCategory,
            SettingsField::SemanticRanker,
            SettingsField::SemanticCaptions,
            SettingsField::FollowupQuestions,
            SettingsField::RetrievalMode,
            SettingsField::VectorFields,
            SettingsField::OidSecurityFilter,
            SettingsField::GroupsSecurityFilter,
            SettingsField::Stream,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::PromptTemplate => "Override prompt template",
            SettingsField::RetrieveCount => "Retrieve this many search results",
            SettingsField::ExcludeCategory => "Exclude category",
            SettingsField::SemanticRanker => "Use semantic ranker for retrieval",
            SettingsField::SemanticCaptions => {
                "Use query-contextual summaries instead of whole documents"
            }
            SettingsField::FollowupQuestions => "Suggest follow-up questions",
            SettingsField::RetrievalMode => "Retrieval mode",
            SettingsField::VectorFields => "Vector fields",
            SettingsField::OidSecurityFilter => "Use oid security filter",
            SettingsField::GroupsSecurityFilter => "Use groups security filter",
            SettingsField::Stream => "Stream chat completion responses",
        }
    }

    /// Typed-in fields are edited rather than toggled
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            SettingsField::PromptTemplate
                | SettingsField::RetrieveCount
                | SettingsField::ExcludeCategory
        )
    }
}

impl ChatSettings {
    /// Captions only make sense on top of the semantic ranker
    pub fn captions_enabled(&self) -> bool {
        self.use_semantic_ranker
    }

    pub fn is_enabled(&self, field: SettingsField) -> bool {
        match field {
            SettingsField::SemanticCaptions => self.captions_enabled(),
            _ => true,
        }
    }

    /// Flip a boolean field or step an enumerated one. Returns false when
    /// the field is disabled or is not toggleable.
    pub fn toggle(&mut self, field: SettingsField) -> bool {
        if !self.is_enabled(field) {
            return false;
        }
        match field {
            SettingsField::SemanticRanker => {
                self.use_semantic_ranker = !self.use_semantic_ranker
            }
            SettingsField::SemanticCaptions => {
                self.use_semantic_captions = !self.use_semantic_captions
            }
            SettingsField::FollowupQuestions => {
                self.suggest_followup_questions = !self.suggest_followup_questions
            }
            SettingsField::OidSecurityFilter => {
                self.use_oid_security_filter = !self.use_oid_security_filter
            }
            SettingsField::GroupsSecurityFilter => {
                self.use_groups_security_filter = !self.use_groups_security_filter
            }
            SettingsField::Stream => self.should_stream = !self.should_stream,
            SettingsField::RetrievalMode => self.retrieval_mode = self.retrieval_mode.next(),
            SettingsField::VectorFields => self.cycle_vector_fields(),
            SettingsField::PromptTemplate
            | SettingsField::RetrieveCount
            | SettingsField::ExcludeCategory => return false,
        }
        true
    }

    pub fn step_retrieve_count(&mut self, delta: i8) {
        let next = self.retrieve_count as i16 + delta as i16;
        self.retrieve_count =
            next.clamp(MIN_RETRIEVE_COUNT as i16, MAX_RETRIEVE_COUNT as i16) as u8;
    }

    fn cycle_vector_fields(&mut self) {
        use VectorField::*;
        self.vector_fields = match self.vector_fields.as_slice() {
            [Embedding] => vec![ImageEmbedding],
            [ImageEmbedding] => vec![Embedding, ImageEmbedding],
            _ => vec![Embedding],
        };
    }

    pub fn text_value(&self, field: SettingsField) -> Option<String> {
        match field {
            SettingsField::PromptTemplate => Some(self.prompt_template.clone()),
            SettingsField::RetrieveCount => Some(self.retrieve_count.to_string()),
            SettingsField::ExcludeCategory => Some(self.exclude_category.clone()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, field: SettingsField, value: String) {
        match field {
            SettingsField::PromptTemplate => self.prompt_template = value,
            SettingsField::RetrieveCount => self.retrieve_count = parse_retrieve_count(&value),
            SettingsField::ExcludeCategory => self.exclude_category = value,
            _ => {}
        }
    }

    /// Human readable value for the panel
    pub fn display_value(&self, field: SettingsField) -> String {
        let check = |b: bool| if b { "[x]" } else { "[ ]" }.to_string();
        match field {
            SettingsField::PromptTemplate => self.prompt_template.clone(),
            SettingsField::ExcludeCategory => self.exclude_category.clone(),
            SettingsField::RetrieveCount => self.retrieve_count.to_string(),
            SettingsField::SemanticRanker => check(self.use_semantic_ranker),
            SettingsField::SemanticCaptions => check(self.use_semantic_captions),
            SettingsField::FollowupQuestions => check(self.suggest_followup_questions),
            SettingsField::OidSecurityFilter => check(self.use_oid_security_filter),
            SettingsField::GroupsSecurityFilter => check(self.use_groups_security_filter),
            SettingsField::Stream => check(self.should_stream),
            SettingsField::RetrievalMode => self.retrieval_mode.label().to_string(),
            SettingsField::VectorFields => self
                .vector_fields
                .iter()
                .map(|f| f.label())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ChatSettings::default();
        assert_eq!(s.retrieve_count, 3);
        assert!(s.use_semantic_ranker);
        assert!(!s.use_semantic_captions);
        assert!(s.should_stream);
        assert_eq!(s.vector_fields, vec![VectorField::Embedding]);
    }

    #[test]
    fn test_parse_retrieve_count() {
        assert_eq!(parse_retrieve_count("7"), 7);
        assert_eq!(parse_retrieve_count(""), 3);
        assert_eq!(parse_retrieve_count("lots"), 3);
        assert_eq!(parse_retrieve_count("0"), 1);
        assert_eq!(parse_retrieve_count("500"), 50);
    }

    #[test]
    fn test_step_retrieve_count_clamps() {
        let mut s = ChatSettings::default();
        s.retrieve_count = 50;
        s.step_retrieve_count(1);
        assert_eq!(s.retrieve_count, 50);
        s.retrieve_count = 1;
        s.step_retrieve_count(-1);
        assert_eq!(s.retrieve_count, 1);
    }

    #[test]
    fn test_captions_disabled_without_ranker() {
        let mut s = ChatSettings::default();
        assert!(s.toggle(SettingsField::SemanticRanker));
        assert!(!s.use_semantic_ranker);
        assert!(!s.toggle(SettingsField::SemanticCaptions));
        assert!(!s.use_semantic_captions);
    }

    #[test]
    fn test_text_fields_are_not_toggled() {
        let mut s = ChatSettings::default();
        assert!(!s.toggle(SettingsField::PromptTemplate));
        s.set_text(SettingsField::ExcludeCategory, "internal".into());
        assert_eq!(s.text_value(SettingsField::ExcludeCategory).as_deref(), Some("internal"));
    }

    #[test]
    fn test_typed_retrieve_count_is_parsed() {
        let mut s = ChatSettings::default();
        assert!(SettingsField::RetrieveCount.is_text());
        assert!(!s.toggle(SettingsField::RetrieveCount));

        s.set_text(SettingsField::RetrieveCount, " 12 ".into());
        assert_eq!(s.retrieve_count, 12);
        assert_eq!(s.text_value(SettingsField::RetrieveCount).as_deref(), Some("12"));

        s.set_text(SettingsField::RetrieveCount, "a dozen".into());
        assert_eq!(s.retrieve_count, DEFAULT_RETRIEVE_COUNT);
        s.set_text(SettingsField::RetrieveCount, "999".into());
        assert_eq!(s.retrieve_count, MAX_RETRIEVE_COUNT);
    }

    #[test]
    fn test_vector_fields_cycle_back_to_text() {
        let mut s = ChatSettings::default();
        s.toggle(SettingsField::VectorFields);
        s.toggle(SettingsField::VectorFields);
        assert_eq!(s.vector_fields.len(), 2);
        s.toggle(SettingsField::VectorFields);
        assert_eq!(s.vector_fields, vec![VectorField::Embedding]);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let s: ChatSettings =
            serde_json::from_str(r#"{"suggest_followup_questions":true}"#).unwrap();
        assert!(s.suggest_followup_questions);
        assert_eq!(s.retrieve_count, DEFAULT_RETRIEVE_COUNT);
    }
}
