use crate::error::Result;
use crate::models::question::Question;
use crate::models::quiz::{Direction, QuizEngine, QuizResult};
use crate::models::session::StudySession;
use crate::store::repository::SessionRepository;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

struct ActiveAttempt {
    user_id: String,
    session_id: String,
    engine: QuizEngine,
}

#[derive(Debug, Clone)]
pub struct AttemptState {
    pub attempt_id: Uuid,
    pub session_id: String,
    pub current_index: usize,
    pub answers: Vec<i32>,
    pub remaining_seconds: u32,
    pub time_allowed_minutes: u32,
    pub total_questions: usize,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone)]
struct ProgressSnapshot {
    user_id: String,
    session_id: String,
    current_index: usize,
    answers: Vec<i32>,
    remaining_seconds: u32,
    time_allowed: u32,
}

/// Registry of running assessments. HTTP handlers and the background
/// one-second ticker both reach engines through the mutex, which is what
/// keeps the finished latch at-most-once when a manual submit races the
/// countdown hitting zero.
///
/// The lock is never held across an await; persistence happens on data
/// captured while locked.
#[derive(Clone)]
pub struct QuizService {
    attempts: Arc<Mutex<HashMap<Uuid, ActiveAttempt>>>,
    repo: SessionRepository,
}

impl QuizService {
    pub fn new(repo: SessionRepository) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            repo,
        }
    }

    /// Launch an assessment over a subset of the session's questions.
    /// A user runs at most one attempt at a time; starting a new one
    /// abandons (without submitting) anything previously in flight.
    pub async fn start(
        &self,
        user_id: &str,
        session: &StudySession,
        question_count: Option<usize>,
        time_limit_minutes: Option<u32>,
    ) -> Result<AttemptState> {
        let session_id = session
            .id
            .clone()
            .ok_or_else(|| crate::error::Error::Internal("Session has no id".to_string()))?;

        let mut questions = session.questions.clone();
        if let Some(count) = question_count {
            if count == 0 {
                return Err(crate::error::Error::BadRequest(
                    "Question count must be at least 1".to_string(),
                ));
            }
            questions.truncate(count);
        }
        if questions.is_empty() {
            return Err(crate::error::Error::BadRequest(
                "Session has no questions to assess".to_string(),
            ));
        }

        // Default budget: one minute per question.
        let time_limit = time_limit_minutes.unwrap_or(questions.len() as u32).max(1);
        let engine = QuizEngine::new(questions, time_limit);
        let attempt_id = Uuid::new_v4();

        let snapshot = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.retain(|_, a| a.user_id != user_id);
            let snapshot = snapshot_of(user_id, &session_id, &engine);
            attempts.insert(
                attempt_id,
                ActiveAttempt {
                    user_id: user_id.to_string(),
                    session_id: session_id.clone(),
                    engine,
                },
            );
            snapshot
        };
        self.persist_snapshot(&snapshot).await;

        self.state(user_id, attempt_id)
    }

    pub fn state(&self, user_id: &str, attempt_id: Uuid) -> Result<AttemptState> {
        let attempts = self.attempts.lock().unwrap();
        let attempt = attempts
            .get(&attempt_id)
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| crate::error::Error::NotFound("No such attempt".to_string()))?;
        Ok(state_of(attempt_id, attempt))
    }

    pub async fn select_option(
        &self,
        user_id: &str,
        attempt_id: Uuid,
        option_index: usize,
    ) -> Result<AttemptState> {
        let (state, snapshot) = {
            let mut attempts = self.attempts.lock().unwrap();
            let attempt = attempts
                .get_mut(&attempt_id)
                .filter(|a| a.user_id == user_id)
                .ok_or_else(|| crate::error::Error::NotFound("No such attempt".to_string()))?;
            attempt.engine.select_option(option_index)?;
            (
                state_of(attempt_id, attempt),
                snapshot_of(user_id, &attempt.session_id, &attempt.engine),
            )
        };
        self.persist_snapshot(&snapshot).await;
        Ok(state)
    }

    pub async fn navigate(
        &self,
        user_id: &str,
        attempt_id: Uuid,
        direction: Direction,
    ) -> Result<AttemptState> {
        let (state, snapshot) = {
            let mut attempts = self.attempts.lock().unwrap();
            let attempt = attempts
                .get_mut(&attempt_id)
                .filter(|a| a.user_id == user_id)
                .ok_or_else(|| crate::error::Error::NotFound("No such attempt".to_string()))?;
            attempt.engine.navigate(direction);
            (
                state_of(attempt_id, attempt),
                snapshot_of(user_id, &attempt.session_id, &attempt.engine),
            )
        };
        self.persist_snapshot(&snapshot).await;
        Ok(state)
    }

    /// Manual submission. Returns the persisted attempt record; a second
    /// submit (or a timer racing this call) gets a conflict because the
    /// latch already consumed the result.
    ///
    /// The latched attempt stays registered until `finalize` has written the
    /// record and cleared the progress row. Removing it earlier opens a
    /// window where `resume` sees no attempt, reads the still-present
    /// snapshot, and resurrects an engine that is already being persisted.
    pub async fn submit(&self, user_id: &str, attempt_id: Uuid) -> Result<StudySession> {
        let finished = {
            let mut attempts = self.attempts.lock().unwrap();
            let attempt = attempts
                .get_mut(&attempt_id)
                .filter(|a| a.user_id == user_id)
                .ok_or_else(|| crate::error::Error::NotFound("No such attempt".to_string()))?;
            attempt
                .engine
                .submit()
                .map(|result| (attempt.session_id.clone(), result))
        };

        match finished {
            Some((session_id, result)) => {
                let record = self.finalize(user_id, &session_id, result).await;
                self.attempts.lock().unwrap().remove(&attempt_id);
                record
            }
            None => Err(crate::error::Error::Conflict(
                "Assessment already submitted".to_string(),
            )),
        }
    }

    /// One pass of the countdown ticker. Engines that hit zero submit
    /// through the very same scoring path as a manual submit. Timed-out
    /// attempts stay registered (latched) until their record is persisted,
    /// for the same reason `submit` keeps them.
    pub async fn tick_all(&self) {
        let finished: Vec<(Uuid, String, String, QuizResult)> = {
            let mut attempts = self.attempts.lock().unwrap();
            let mut done = Vec::new();
            for (id, attempt) in attempts.iter_mut() {
                if let Some(result) = attempt.engine.tick() {
                    done.push((
                        *id,
                        attempt.user_id.clone(),
                        attempt.session_id.clone(),
                        result,
                    ));
                }
            }
            done
        };

        for (id, user_id, session_id, result) in finished {
            tracing::info!(user = %user_id, session = %session_id, "Assessment timed out, auto-submitting");
            if let Err(e) = self.finalize(&user_id, &session_id, result).await {
                tracing::error!("Failed to persist timed-out attempt: {:?}", e);
            }
            self.attempts.lock().unwrap().remove(&id);
        }
    }

    /// Restore the caller's unfinished attempt after a reload.
    ///
    /// Countdown policy: the snapshot's remaining seconds are corrected by
    /// the wall-clock time since it was saved. A corrected value of zero
    /// finalizes immediately as a timeout.
    pub async fn resume(&self, user_id: &str) -> Result<Option<AttemptState>> {
        {
            let attempts = self.attempts.lock().unwrap();
            if let Some((id, attempt)) = attempts.iter().find(|(_, a)| a.user_id == user_id) {
                // A latched attempt is mid-persist; its snapshot row is stale
                // and must not be resurrected.
                if attempt.engine.is_finished() {
                    return Ok(None);
                }
                return Ok(Some(state_of(*id, attempt)));
            }
        }

        let Some(progress) = self.repo.local().get_progress(user_id).await? else {
            return Ok(None);
        };
        let Some(session) = self.repo.get(user_id, &progress.session_id).await? else {
            self.repo.local().clear_progress(user_id).await?;
            return Ok(None);
        };

        let answers: Vec<i32> = serde_json::from_str(&progress.answers).unwrap_or_default();
        let elapsed = (Utc::now().timestamp() - progress.saved_at).max(0) as u32;
        let remaining = (progress.remaining_seconds as u32).saturating_sub(elapsed);
        let time_allowed = progress.time_allowed as u32;

        let mut questions = session.questions.clone();
        questions.truncate(answers.len().max(1));

        let mut engine = QuizEngine::restore(
            questions,
            progress.current_index as usize,
            answers,
            remaining.max(1),
            time_allowed,
        );

        if remaining == 0 {
            // Clock ran out while the page was away.
            if let Some(mut result) = engine.submit() {
                result.time_spent = time_allowed * 60;
                result.timed_out = true;
                self.finalize(user_id, &progress.session_id, result).await?;
            }
            return Ok(None);
        }

        let attempt_id = Uuid::new_v4();
        let attempt = ActiveAttempt {
            user_id: user_id.to_string(),
            session_id: progress.session_id.clone(),
            engine,
        };
        let state = state_of(attempt_id, &attempt);
        {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.retain(|_, a| a.user_id != user_id);
            attempts.insert(attempt_id, attempt);
        }
        Ok(Some(state))
    }

    /// Merge the attempt result into a full record and persist it. This is
    /// the single exit point for manual, timeout, and resume-expired paths.
    async fn finalize(
        &self,
        user_id: &str,
        session_id: &str,
        result: QuizResult,
    ) -> Result<StudySession> {
        let source = self
            .repo
            .get(user_id, session_id)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound("Source session missing".to_string()))?;

        let mut record = source;
        record.id = None;
        record.questions = result.questions;
        record.user_answers = Some(result.user_answers);
        record.score = Some(result.score);
        record.total_marks = Some(result.total_marks);
        record.time_allowed = Some(result.time_allowed);
        record.time_spent = Some(result.time_spent);
        record.created_at = Utc::now().timestamp_millis();

        let id = self.repo.save(&record).await?;
        record.id = Some(id);

        if let Err(e) = self.repo.local().clear_progress(user_id).await {
            tracing::warn!("Failed to clear quiz progress: {:?}", e);
        }
        Ok(record)
    }

    async fn persist_snapshot(&self, snapshot: &ProgressSnapshot) {
        if let Err(e) = self
            .repo
            .local()
            .save_progress(
                &snapshot.user_id,
                &snapshot.session_id,
                snapshot.current_index,
                &snapshot.answers,
                snapshot.remaining_seconds,
                snapshot.time_allowed,
            )
            .await
        {
            // Snapshot loss only costs resumability, never the running attempt.
            tracing::warn!("Failed to snapshot quiz progress: {:?}", e);
        }
    }
}

fn state_of(attempt_id: Uuid, attempt: &ActiveAttempt) -> AttemptState {
    AttemptState {
        attempt_id,
        session_id: attempt.session_id.clone(),
        current_index: attempt.engine.current_index(),
        answers: attempt.engine.answers().to_vec(),
        remaining_seconds: attempt.engine.remaining_seconds(),
        time_allowed_minutes: attempt.engine.time_allowed_minutes(),
        total_questions: attempt.engine.questions().len(),
        questions: attempt.engine.questions().to_vec(),
    }
}

fn snapshot_of(user_id: &str, session_id: &str, engine: &QuizEngine) -> ProgressSnapshot {
    ProgressSnapshot {
        user_id: user_id.to_string(),
        session_id: session_id.to_string(),
        current_index: engine.current_index(),
        answers: engine.answers().to_vec(),
        remaining_seconds: engine.remaining_seconds(),
        time_allowed: engine.time_allowed_minutes(),
    }
}
