use crate::error::Result;
use crate::models::session::StudySession;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// On-device vault tier. Writes here always succeed as long as the process
/// can reach its own database file, which is what makes the repository
/// local-first. Ids minted here carry a `local_` prefix so a later remote
/// id never collides with them.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: String,
    payload: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PracticeRow {
    pub user_id: String,
    pub session_id: String,
    pub choices: String,
    pub revealed: String,
    pub saved_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProgressRow {
    pub user_id: String,
    pub session_id: String,
    pub current_index: i64,
    pub answers: String,
    pub remaining_seconds: i64,
    pub time_allowed: i64,
    pub saved_at: i64,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a session under a freshly minted local id and prune the vault
    /// down to the configured cap (oldest records go first).
    pub async fn save(&self, session: &StudySession) -> Result<String> {
        let id = format!("local_{}", Uuid::new_v4());
        let mut stored = session.clone();
        stored.id = Some(id.clone());
        let payload = serde_json::to_string(&stored)?;

        sqlx::query(
            r#"INSERT INTO study_sessions (id, user_id, created_at, payload)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&id)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        self.prune(&session.user_id).await?;
        Ok(id)
    }

    /// Insert a record that already carries an id (a remote id being
    /// mirrored locally). The vault cap applies here too.
    pub async fn insert_with_id(&self, session: &StudySession) -> Result<()> {
        let id = session
            .id
            .clone()
            .ok_or_else(|| crate::error::Error::Internal("Record has no id".to_string()))?;
        let payload = serde_json::to_string(session)?;

        sqlx::query(
            r#"INSERT OR REPLACE INTO study_sessions (id, user_id, created_at, payload)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&id)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        self.prune(&session.user_id).await
    }

    async fn prune(&self, user_id: &str) -> Result<()> {
        let cap = crate::config::get_config().local_vault_limit as i64;
        sqlx::query(
            r#"DELETE FROM study_sessions
               WHERE user_id = $1 AND id NOT IN (
                   SELECT id FROM study_sessions
                   WHERE user_id = $1
                   ORDER BY created_at DESC
                   LIMIT $2
               )"#,
        )
        .bind(user_id)
        .bind(cap)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<StudySession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            r#"SELECT id, payload FROM study_sessions
               WHERE user_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<StudySession>(&row.payload) {
                Ok(mut s) => {
                    s.id = Some(row.id);
                    sessions.push(s);
                }
                Err(e) => {
                    tracing::warn!(id = %row.id, "Skipping corrupt vault record: {}", e);
                }
            }
        }
        Ok(sessions)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<StudySession>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"SELECT id, payload FROM study_sessions WHERE user_id = $1 AND id = $2"#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut s: StudySession = serde_json::from_str(&row.payload)?;
                s.id = Some(row.id);
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM study_sessions WHERE user_id = $1 AND id = $2"#)
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear(&self, user_id: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM study_sessions WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        sqlx::query(r#"DELETE FROM quiz_progress WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        sqlx::query(r#"DELETE FROM practice_state WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Dashboard practice progress, one row per user: the choice and
    /// revealed flag for each question of the active session.
    pub async fn save_practice(
        &self,
        user_id: &str,
        session_id: &str,
        choices: &[i32],
        revealed: &[bool],
    ) -> Result<()> {
        let choices_json = serde_json::to_string(choices)?;
        let revealed_json = serde_json::to_string(revealed)?;
        sqlx::query(
            r#"INSERT INTO practice_state (user_id, session_id, choices, revealed, saved_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (user_id) DO UPDATE SET
                   session_id = excluded.session_id,
                   choices = excluded.choices,
                   revealed = excluded.revealed,
                   saved_at = excluded.saved_at"#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(&choices_json)
        .bind(&revealed_json)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_practice(&self, user_id: &str) -> Result<Option<PracticeRow>> {
        let row: Option<PracticeRow> = sqlx::query_as(
            r#"SELECT user_id, session_id, choices, revealed, saved_at
               FROM practice_state WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn clear_practice(&self, user_id: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM practice_state WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Snapshot of an in-progress attempt, one per user. `saved_at` is the
    /// wall clock at snapshot time so resume can correct the countdown.
    pub async fn save_progress(
        &self,
        user_id: &str,
        session_id: &str,
        current_index: usize,
        answers: &[i32],
        remaining_seconds: u32,
        time_allowed: u32,
    ) -> Result<()> {
        let answers_json = serde_json::to_string(answers)?;
        sqlx::query(
            r#"INSERT INTO quiz_progress
                   (user_id, session_id, current_index, answers, remaining_seconds, time_allowed, saved_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (user_id) DO UPDATE SET
                   session_id = excluded.session_id,
                   current_index = excluded.current_index,
                   answers = excluded.answers,
                   remaining_seconds = excluded.remaining_seconds,
                   time_allowed = excluded.time_allowed,
                   saved_at = excluded.saved_at"#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(current_index as i64)
        .bind(&answers_json)
        .bind(remaining_seconds as i64)
        .bind(time_allowed as i64)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_progress(&self, user_id: &str) -> Result<Option<ProgressRow>> {
        let row: Option<ProgressRow> = sqlx::query_as(
            r#"SELECT user_id, session_id, current_index, answers, remaining_seconds, time_allowed, saved_at
               FROM quiz_progress WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn clear_progress(&self, user_id: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM quiz_progress WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
