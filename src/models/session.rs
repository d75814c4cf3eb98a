use crate::models::question::Question;
use serde::{Deserialize, Serialize};

pub const UNANSWERED: i32 = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Text,
    Pdf,
    Image,
}

/// One study-and-quiz cycle for one user. Created when analysis completes,
/// enriched with attempt fields when a quiz finishes, then read-only history.
///
/// The JSON shape doubles as the persisted document shape for both vault
/// tiers, so field names stay camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub source_type: SourceType,
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub insights: String,
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_answers: Option<Vec<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_marks: Option<u32>,
    /// Minutes allowed for the attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_allowed: Option<u32>,
    /// Seconds actually spent; never exceeds `time_allowed * 60`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u32>,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl StudySession {
    pub fn has_attempt(&self) -> bool {
        self.score.is_some()
    }
}
