use crate::models::{AnswerPair, ChatAppResponse, HistoryEntry};

/// Rebuild a transcript from stored turns.
///
/// Entries pair up as (question, answer) at indices (0,1), (2,3), ...
/// A trailing entry without an answer is dropped.
pub fn pair_history(entries: &[HistoryEntry], session_id: &str) -> Vec<AnswerPair> {
    entries
        .chunks_exact(2)
        .map(|pair| {
            (
                pair[0].content.clone(),
                ChatAppResponse {
                    message: pair[1].content.clone(),
                    session_id: session_id.to_string(),
                    citations: None,
                },
            )
        })
        .collect()
}
