//! MediaWiki REST API content source

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use super::ContentFetcher;
use crate::config::SourceConfig;
use crate::error::{Error, FetchError};
use crate::types::{ArticleContent, ArticleId};

/// Path of the rendered-HTML endpoint, relative to the wiki root
const PAGE_HTML_PATH: &str = "api/rest_v1/page/html";

/// Fetches rendered article HTML from `{site}/api/rest_v1/page/html/{title}`
#[derive(Clone)]
pub struct RestContentFetcher {
    client: reqwest::Client,
    /// Replaces each article's own site when set (mirrors, tests)
    base_url: Option<url::Url>,
}

impl RestContentFetcher {
    /// Build a fetcher from source settings
    pub fn new(config: &SourceConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        let base_url = match &config.rest_base_url {
            Some(base) => Some(url::Url::parse(base).map_err(|e| Error::Config {
                message: format!("rest_base_url is not a valid URL: {}", e),
                key: Some("rest_base_url".to_string()),
            })?),
            None => None,
        };

        Ok(Self { client, base_url })
    }

    /// Endpoint URL for `id`, or `None` if the identifier carries no article title
    pub fn endpoint(&self, id: &ArticleId) -> Option<String> {
        let title = id.path_title()?;
        let base = match &self.base_url {
            Some(base) => base.as_str().trim_end_matches('/').to_string(),
            None => id.site(),
        };
        Some(format!("{}/{}/{}", base, PAGE_HTML_PATH, title))
    }

    async fn request(&self, id: &ArticleId, endpoint: &str) -> Result<ArticleContent, FetchError> {
        let response = self.client.get(endpoint).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::NetworkFailure(format!("timeout fetching '{}'", endpoint))
            } else {
                FetchError::from(e)
            }
        })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::GONE => return Err(FetchError::NotFound),
            status => {
                return Err(FetchError::NetworkFailure(format!(
                    "HTTP {} fetching '{}'",
                    status, endpoint
                )));
            }
        }

        let revision = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_etag_revision);

        let html = response.text().await.map_err(FetchError::from)?;

        Ok(ArticleContent {
            id: id.clone(),
            title: id.title().unwrap_or_default(),
            html,
            revision,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl ContentFetcher for RestContentFetcher {
    async fn fetch(
        &self,
        id: &ArticleId,
        cancel: &CancellationToken,
    ) -> Result<ArticleContent, FetchError> {
        let Some(endpoint) = self.endpoint(id) else {
            return Err(FetchError::Unknown(format!(
                "no article title in identifier '{}'",
                id
            )));
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Canceled),
            result = self.request(id, &endpoint) => result,
        }
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

/// Extract the revision from an ETag such as `W/"1187345612/5f1c…"`
fn parse_etag_revision(etag: &str) -> Option<u64> {
    let value = etag.trim_start_matches("W/").trim_matches('"');
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
