use crate::models::question::Question;
use crate::models::session::UNANSWERED;
use serde::{Deserialize, Serialize};

/// Timed multiple-choice assessment over a fixed question set.
///
/// The engine is a plain state machine: it runs at index 0 with every slot
/// unanswered and `remaining_seconds = time_allowed * 60`, and latches into
/// `Finished` exactly once, whether the countdown hits zero or the caller
/// submits manually. Both paths score through [`QuizEngine::submit`], so there
/// is a single scoring implementation.
///
/// The engine itself is not thread-safe; the registry that shares it between
/// HTTP handlers and the ticker task wraps it in a mutex so the finished
/// latch stays at-most-once.
#[derive(Debug, Clone)]
pub struct QuizEngine {
    questions: Vec<Question>,
    current_index: usize,
    answers: Vec<i32>,
    remaining_seconds: u32,
    time_allowed_minutes: u32,
    finished: bool,
}

/// Final attempt record emitted exactly once per engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub questions: Vec<Question>,
    pub user_answers: Vec<i32>,
    pub score: u32,
    pub total_marks: u32,
    pub time_allowed: u32,
    pub time_spent: u32,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Previous,
    Next,
}

impl QuizEngine {
    pub fn new(questions: Vec<Question>, time_allowed_minutes: u32) -> Self {
        let n = questions.len();
        Self {
            questions,
            current_index: 0,
            answers: vec![UNANSWERED; n],
            remaining_seconds: time_allowed_minutes * 60,
            time_allowed_minutes,
            finished: false,
        }
    }

    /// Rebuild a running engine from a persisted snapshot.
    /// `remaining_seconds` is already wall-clock corrected by the caller.
    pub fn restore(
        questions: Vec<Question>,
        current_index: usize,
        answers: Vec<i32>,
        remaining_seconds: u32,
        time_allowed_minutes: u32,
    ) -> Self {
        let n = questions.len();
        let mut answers = answers;
        answers.resize(n, UNANSWERED);
        Self {
            current_index: current_index.min(n.saturating_sub(1)),
            questions,
            answers,
            remaining_seconds: remaining_seconds.min(time_allowed_minutes * 60),
            time_allowed_minutes,
            finished: false,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn answers(&self) -> &[i32] {
        &self.answers
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn time_allowed_minutes(&self) -> u32 {
        self.time_allowed_minutes
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Record the answer for the current question. Last choice wins;
    /// re-selection is not an error and the index never auto-advances.
    pub fn select_option(&mut self, option_index: usize) -> crate::error::Result<()> {
        if self.finished {
            return Err(crate::error::Error::Conflict(
                "Assessment already submitted".to_string(),
            ));
        }
        let option_count = self.questions[self.current_index].options.len();
        if option_index >= option_count {
            return Err(crate::error::Error::BadRequest(format!(
                "Option index {} out of range (question has {} options)",
                option_index, option_count
            )));
        }
        self.answers[self.current_index] = option_index as i32;
        Ok(())
    }

    /// Move within [0, N-1]; clamped at the boundaries, never errors,
    /// never touches answers.
    pub fn navigate(&mut self, direction: Direction) {
        if self.finished {
            return;
        }
        self.current_index = match direction {
            Direction::Previous => self.current_index.saturating_sub(1),
            Direction::Next => (self.current_index + 1).min(self.questions.len().saturating_sub(1)),
        };
    }

    /// One-second countdown tick. Returns the final result when the clock
    /// reaches zero; the submission that fires here is the same code path as
    /// a manual submit.
    pub fn tick(&mut self) -> Option<QuizResult> {
        if self.finished {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            return self.submit();
        }
        None
    }

    /// Finalize the attempt. Idempotent: the first call latches `finished`
    /// and produces the result, any later call (a timer firing after a manual
    /// click, or vice versa) returns `None`.
    pub fn submit(&mut self) -> Option<QuizResult> {
        if self.finished {
            return None;
        }
        self.finished = true;

        let score = self
            .answers
            .iter()
            .zip(self.questions.iter())
            .filter(|(ans, q)| q.is_correct(**ans))
            .count() as u32;

        let budget = self.time_allowed_minutes * 60;
        Some(QuizResult {
            questions: self.questions.clone(),
            user_answers: self.answers.clone(),
            score,
            total_marks: self.questions.len() as u32,
            time_allowed: self.time_allowed_minutes,
            time_spent: budget.saturating_sub(self.remaining_seconds),
            timed_out: self.remaining_seconds == 0,
        })
    }
}
