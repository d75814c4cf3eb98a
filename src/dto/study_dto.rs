use crate::models::session::StudySession;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnalyzeRequest {
    pub text: String,
    pub title: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub question_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub session: StudySession,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub sessions: Vec<StudySession>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PracticeStateRequest {
    pub session_id: String,
    pub choices: Vec<i32>,
    pub revealed: Vec<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticeStateResponse {
    pub practice: Option<PracticeStateDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeStateDto {
    pub session: StudySession,
    pub choices: Vec<i32>,
    pub revealed: Vec<bool>,
}

impl From<crate::services::session_service::PracticeState> for PracticeStateDto {
    fn from(state: crate::services::session_service::PracticeState) -> Self {
        Self {
            session: state.session,
            choices: state.choices,
            revealed: state.revealed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    pub kind: ExportKind,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Summary,
    Quiz,
}
