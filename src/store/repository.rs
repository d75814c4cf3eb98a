use crate::error::Result;
use crate::models::session::StudySession;
use crate::store::local_store::LocalStore;
use crate::store::remote_store::RemoteStore;
use std::collections::HashSet;

/// Two-tier session repository: remote is best-effort, local always works.
///
/// Reconciliation rule: merge by id, newest first, capped to the configured
/// history limit. A record that exists in both tiers keeps the copy that
/// sorts first (they carry the same id, so content is identical in practice).
#[derive(Clone)]
pub struct SessionRepository {
    local: LocalStore,
    remote: Option<RemoteStore>,
}

impl SessionRepository {
    pub fn new(local: LocalStore, remote: Option<RemoteStore>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Persist a session. The remote tier is tried first so a cloud id wins
    /// when available; a denied or failed remote write degrades silently to
    /// a `local_` id. Save never fails because the remote is down.
    pub async fn save(&self, session: &StudySession) -> Result<String> {
        if let Some(remote) = &self.remote {
            match remote.save(session).await {
                Ok(id) => {
                    // Mirror into the local vault under the remote id so the
                    // record survives offline reads. Mirror failures are not
                    // user-visible.
                    let mut mirrored = session.clone();
                    mirrored.id = Some(id.clone());
                    if let Err(e) = self.mirror_local(&mirrored).await {
                        tracing::warn!("Local mirror of remote record failed: {}", e);
                    }
                    return Ok(id);
                }
                Err(e) => {
                    tracing::warn!("Cloud sync denied, falling back to local vault: {}", e);
                }
            }
        }
        self.local.save(session).await
    }

    async fn mirror_local(&self, session: &StudySession) -> Result<()> {
        let id = session.id.as_deref().unwrap_or_default();
        // Replace any stale copy under the same id, then insert verbatim.
        self.local.delete(&session.user_id, id).await?;
        self.local.insert_with_id(session).await
    }

    /// Merged history: remote plus local, de-duplicated by id, newest first,
    /// capped. A remote outage silently narrows this to the local tier.
    pub async fn list(&self, user_id: &str) -> Result<Vec<StudySession>> {
        let mut combined: Vec<StudySession> = Vec::new();

        if let Some(remote) = &self.remote {
            match remote.list(user_id).await {
                Ok(sessions) => combined.extend(sessions),
                Err(e) => {
                    tracing::warn!("Remote vault unreachable, serving local history only: {}", e);
                }
            }
        }
        combined.extend(self.local.list(user_id).await?);

        combined.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut seen: HashSet<String> = HashSet::new();
        combined.retain(|s| match &s.id {
            Some(id) => seen.insert(id.clone()),
            None => true,
        });
        combined.truncate(crate::config::get_config().history_limit);
        Ok(combined)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<StudySession>> {
        if let Some(found) = self.local.get(user_id, id).await? {
            return Ok(Some(found));
        }
        if let Some(remote) = &self.remote {
            match remote.list(user_id).await {
                Ok(sessions) => {
                    return Ok(sessions.into_iter().find(|s| s.id.as_deref() == Some(id)))
                }
                Err(e) => {
                    tracing::warn!("Remote vault lookup failed: {}", e);
                }
            }
        }
        Ok(None)
    }

    /// Delete from both tiers. The id must exist in at least one of them;
    /// a remote outage counts as "not removed there" rather than an error.
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        let removed_locally = self.local.delete(user_id, id).await?;
        let mut removed_remotely = false;
        if let Some(remote) = &self.remote {
            match remote.delete(user_id, id).await {
                Ok(removed) => removed_remotely = removed,
                Err(e) => {
                    tracing::warn!("Remote vault delete failed: {}", e);
                }
            }
        }
        if !removed_locally && !removed_remotely {
            return Err(crate::error::Error::NotFound(
                "Study record not found".to_string(),
            ));
        }
        Ok(())
    }
}
