use crate::models::question::Question;
use crate::models::quiz::Direction;
use crate::models::session::StudySession;
use crate::services::quiz_service::AttemptState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartQuizRequest {
    #[validate(range(min = 1, max = 50))]
    pub question_count: Option<usize>,
    #[validate(range(min = 1, max = 180))]
    pub time_limit_minutes: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOptionRequest {
    pub option_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigateRequest {
    pub direction: Direction,
}

/// Running attempt snapshot. Questions are sent without the correct index
/// or explanation so an open devtools panel gives nothing away.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStateResponse {
    pub attempt_id: Uuid,
    pub session_id: String,
    pub current_index: usize,
    pub answers: Vec<i32>,
    pub remaining_seconds: u32,
    pub time_allowed_minutes: u32,
    pub total_questions: usize,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub question: String,
    pub options: Vec<String>,
}

impl From<AttemptState> for AttemptStateResponse {
    fn from(state: AttemptState) -> Self {
        Self {
            attempt_id: state.attempt_id,
            session_id: state.session_id,
            current_index: state.current_index,
            answers: state.answers,
            remaining_seconds: state.remaining_seconds,
            time_allowed_minutes: state.time_allowed_minutes,
            total_questions: state.total_questions,
            questions: state.questions.into_iter().map(PublicQuestion::from).collect(),
        }
    }
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            question: q.question,
            options: q.options,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub record: StudySession,
    pub score: u32,
    pub total_marks: u32,
    pub time_spent: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    pub attempt: Option<AttemptStateResponse>,
}
