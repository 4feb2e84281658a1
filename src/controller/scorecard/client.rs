use crate::config::ClientConfig;
use crate::controller::scorecard::ScorecardApi;
use crate::error::CoreError;
use crate::model::{Scorecard, ScorecardId, UserId};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

const SCORECARDS_PATH: [&str; 4] = ["api", "request", "scorecards", "user"];

#[derive(Deserialize)]
struct ScorecardsResponse {
    #[serde(rename = "Scorecards", default)]
    scorecards: Vec<Scorecard>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// `ScorecardApi` over the backend's JSON endpoints.
#[derive(Debug, Clone)]
pub struct HttpScorecardClient {
    client: Client,
    base_url: Url,
}

impl HttpScorecardClient {
    /// # Errors
    ///
    /// `Validation` if `base_url` is not an absolute http(s) URL; `Transport`
    /// if the HTTP client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, CoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CoreError::Validation(format!("invalid base url {base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(CoreError::Validation(format!(
                "base url must be http(s), got {base_url}"
            )));
        }
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CoreError::Transport(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// # Errors
    ///
    /// See [`HttpScorecardClient::new`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, CoreError> {
        Self::new(&config.base_url, config.request_timeout)
    }

    fn endpoint(&self, tail: &[&str]) -> Result<Url, CoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CoreError::Validation(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(SCORECARDS_PATH)
            .extend(tail);
        Ok(url)
    }
}

/// Non-2xx responses become `Status`, carrying the server's `message` when it
/// sends one.
async fn check_status(resp: Response) -> Result<Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
    Err(CoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl ScorecardApi for HttpScorecardClient {
    async fn list_scorecards(&self, user_id: &UserId) -> Result<Vec<Scorecard>, CoreError> {
        let url = self.endpoint(&[user_id.as_str()])?;
        log::debug!("GET {url}");
        let resp = self.client.get(url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body: ScorecardsResponse = check_status(resp).await?.json().await?;
        Ok(body.scorecards)
    }

    async fn create_scorecard(
        &self,
        user_id: &UserId,
        scorecard: &Scorecard,
    ) -> Result<Scorecard, CoreError> {
        let url = self.endpoint(&["create", user_id.as_str()])?;
        log::debug!("POST {url}");
        let resp = self.client.post(url).json(scorecard).send().await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn update_scorecard(
        &self,
        id: &ScorecardId,
        scorecard: &Scorecard,
    ) -> Result<(), CoreError> {
        let url = self.endpoint(&["update", id.as_str()])?;
        log::debug!("PUT {url}");
        let resp = self.client.put(url).json(scorecard).send().await?;
        check_status(resp).await?;
        Ok(())
    }
}
