//! Splitting an answer into text, numbered citations and follow-up questions.
//!
//! Answers mark sources as `[document.pdf]` and suggested follow-ups as
//! `<<question?>>`.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::ChatAppResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerFragment {
    Text(String),
    /// 1-based number of the citation in `ParsedAnswer::citations`
    Citation { name: String, number: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAnswer {
    pub fragments: Vec<AnswerFragment>,
    pub citations: Vec<String>,
    pub followup_questions: Vec<String>,
}

fn followup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<<([^>]+)>>").expect("valid follow-up pattern"))
}

fn citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").expect("valid citation pattern"))
}

pub fn parse_answer(response: &ChatAppResponse) -> ParsedAnswer {
    let mut parsed = ParsedAnswer::default();

    for cap in followup_regex().captures_iter(&response.message) {
        let question = cap[1].trim();
        if !question.is_empty() {
            parsed.followup_questions.push(question.to_string());
        }
    }
    let text = followup_regex().replace_all(&response.message, "");
    let text = text.trim();

    let mut last = 0;
    for cap in citation_regex().captures_iter(text) {
        let whole = cap.get(0).map(|m| m.range()).unwrap_or(0..0);
        if whole.start > last {
            parsed.fragments.push(AnswerFragment::Text(text[last..whole.start].to_string()));
        }
        let name = cap[1].trim().to_string();
        let number = citation_number(&mut parsed.citations, &name);
        parsed.fragments.push(AnswerFragment::Citation { name, number });
        last = whole.end;
    }
    if last < text.len() {
        parsed.fragments.push(AnswerFragment::Text(text[last..].to_string()));
    }

    // Sources the backend listed but the text never referenced
    for name in response.citations.iter().flatten() {
        citation_number(&mut parsed.citations, name);
    }

    parsed
}

fn citation_number(citations: &mut Vec<String>, name: &str) -> usize {
    match citations.iter().position(|c| c == name) {
        Some(i) => i + 1,
        None => {
            citations.push(name.to_string());
            citations.len()
        }
    }
}

impl ParsedAnswer {
    /// Answer text with citations rendered as `[n]`
    pub fn plain_text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| match f {
                AnswerFragment::Text(t) => t.clone(),
                AnswerFragment::Citation { number, .. } => format!("[{}]", number),
            })
            .collect()
    }
}
