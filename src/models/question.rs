use serde::{Deserialize, Serialize};

/// One multiple-choice question as returned by the analyzer.
/// Immutable once generated; `correct_index` points into `options`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i32,
    pub explanation: String,
}

impl Question {
    pub fn is_correct(&self, chosen: i32) -> bool {
        chosen >= 0 && chosen == self.correct_index
    }
}
