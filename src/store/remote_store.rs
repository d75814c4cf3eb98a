use crate::error::Result;
use crate::models::session::StudySession;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Remote document-vault tier. Every call is a single attempt with no retry;
/// the repository treats any failure here as a cue to fall back to the local
/// tier, never as fatal.
#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    id: String,
}

impl RemoteStore {
    pub fn new(client: Client, base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| crate::error::Error::Config(format!("Invalid REMOTE_VAULT_URL: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .timeout(Duration::from_secs(15));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    fn documents_url(&self) -> Result<Url> {
        self.base_url
            .join("documents")
            .map_err(|e| crate::error::Error::Internal(format!("Bad vault URL: {}", e)))
    }

    pub async fn save(&self, session: &StudySession) -> Result<String> {
        let res = self
            .request(reqwest::Method::POST, self.documents_url()?)
            .json(session)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            return Err(anyhow::anyhow!("Remote vault rejected write: {}", status).into());
        }

        let body: SaveResponse = res.json().await?;
        Ok(body.id)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<StudySession>> {
        let mut url = self.documents_url()?;
        url.query_pairs_mut().append_pair("userId", user_id);

        let res = self.request(reqwest::Method::GET, url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            return Err(anyhow::anyhow!("Remote vault list failed: {}", status).into());
        }

        let sessions: Vec<StudySession> = res.json().await?;
        Ok(sessions)
    }

    /// Returns whether the remote tier actually held the record; a 404 is
    /// not an error, just "nothing to delete here".
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut url = self.documents_url()?;
        url.path_segments_mut()
            .map_err(|_| crate::error::Error::Internal("Bad vault URL".to_string()))?
            .push(id);
        url.query_pairs_mut().append_pair("userId", user_id);

        let res = self.request(reqwest::Method::DELETE, url).send().await?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !res.status().is_success() {
            let status = res.status();
            return Err(anyhow::anyhow!("Remote vault delete failed: {}", status).into());
        }
        Ok(true)
    }
}
