use crate::error::Result;
use crate::models::session::{SourceType, StudySession, UNANSWERED};
use crate::services::analyzer_service::AnalyzerService;
use crate::store::repository::SessionRepository;
use chrono::Utc;

/// Notes shorter than this are rejected before any analyzer call is made.
const MIN_MATERIAL_CHARS: usize = 50;
const TITLE_PREVIEW_CHARS: usize = 35;

/// Orchestrates one study cycle: analyze material, build the session record,
/// persist it, serve history. Analysis failures abort before anything is
/// written, so a session is never partially committed.
#[derive(Clone)]
pub struct SessionService {
    analyzer: AnalyzerService,
    repo: SessionRepository,
}

impl SessionService {
    pub fn new(analyzer: AnalyzerService, repo: SessionRepository) -> Self {
        Self { analyzer, repo }
    }

    pub async fn analyze_material(
        &self,
        user_id: &str,
        text: &str,
        title: Option<String>,
        source_type: SourceType,
        question_count: usize,
    ) -> Result<StudySession> {
        let clean = text.trim();
        if source_type == SourceType::Text && clean.len() < MIN_MATERIAL_CHARS {
            return Err(crate::error::Error::BadRequest(format!(
                "Notes too short for high-fidelity analysis (min {} chars).",
                MIN_MATERIAL_CHARS
            )));
        }

        let max = crate::config::get_config().max_quiz_questions;
        if question_count == 0 || question_count > max {
            return Err(crate::error::Error::BadRequest(format!(
                "Question count must be between 1 and {}.",
                max
            )));
        }

        let report = self.analyzer.analyze(clean, question_count).await?;

        let title = match title.filter(|t| !t.trim().is_empty()) {
            Some(t) => t,
            None => preview_title(clean),
        };

        let mut session = StudySession {
            id: None,
            user_id: user_id.to_string(),
            source_type,
            title,
            summary: report.summary,
            key_points: report.key_points,
            insights: report.insights,
            questions: report.questions,
            user_answers: None,
            score: None,
            total_marks: None,
            time_allowed: None,
            time_spent: None,
            created_at: Utc::now().timestamp_millis(),
        };

        let id = self.repo.save(&session).await?;
        session.id = Some(id);
        Ok(session)
    }

    pub async fn history(&self, user_id: &str) -> Result<Vec<StudySession>> {
        self.repo.list(user_id).await
    }

    pub async fn get_session(&self, user_id: &str, id: &str) -> Result<StudySession> {
        self.repo
            .get(user_id, id)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound("Study record not found".to_string()))
    }

    pub async fn delete_session(&self, user_id: &str, id: &str) -> Result<()> {
        self.repo.delete(user_id, id).await
    }

    pub async fn clear_vault(&self, user_id: &str) -> Result<()> {
        self.repo.local().clear(user_id).await
    }

    /// Snapshot the dashboard practice progress for the caller's active
    /// session: per-question choices and which answers have been revealed.
    pub async fn save_practice_state(
        &self,
        user_id: &str,
        session_id: &str,
        choices: &[i32],
        revealed: &[bool],
    ) -> Result<()> {
        let session = self.get_session(user_id, session_id).await?;
        let n = session.questions.len();
        if choices.len() != n || revealed.len() != n {
            return Err(crate::error::Error::BadRequest(
                "Practice state does not match the session's question count".to_string(),
            ));
        }
        self.repo
            .local()
            .save_practice(user_id, session_id, choices, revealed)
            .await
    }

    /// Restore the active practice session after a reload. A snapshot whose
    /// session has since been deleted is discarded, not resurrected.
    pub async fn practice_state(&self, user_id: &str) -> Result<Option<PracticeState>> {
        let Some(row) = self.repo.local().get_practice(user_id).await? else {
            return Ok(None);
        };
        let Some(session) = self.repo.get(user_id, &row.session_id).await? else {
            self.repo.local().clear_practice(user_id).await?;
            return Ok(None);
        };

        let n = session.questions.len();
        let mut choices: Vec<i32> = serde_json::from_str(&row.choices).unwrap_or_default();
        let mut revealed: Vec<bool> = serde_json::from_str(&row.revealed).unwrap_or_default();
        choices.resize(n, UNANSWERED);
        revealed.resize(n, false);

        Ok(Some(PracticeState {
            session,
            choices,
            revealed,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct PracticeState {
    pub session: StudySession,
    pub choices: Vec<i32>,
    pub revealed: Vec<bool>,
}

fn preview_title(text: &str) -> String {
    let truncated: String = text.chars().take(TITLE_PREVIEW_CHARS).collect();
    if text.chars().count() > TITLE_PREVIEW_CHARS {
        format!("{}...", truncated)
    } else {
        truncated
    }
}
