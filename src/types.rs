//! Core types for saved-articles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, FetchError};

/// Path prefix under which article pages live on a wiki site
const WIKI_PATH_PREFIX: &str = "/wiki/";

/// Identifies one article by its canonical URL
///
/// Two identifiers are equal exactly when their normalized URLs are equal. Parsing drops
/// the fragment, so `…/wiki/Rust#History` and `…/wiki/Rust` name the same article.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArticleId(Url);

impl ArticleId {
    /// Parse and normalize an article URL
    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut url = Url::parse(input)
            .map_err(|e| Error::InvalidIdentifier(format!("{}: {}", input, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidIdentifier(format!(
                "{}: unsupported scheme '{}'",
                input,
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(Error::InvalidIdentifier(format!("{}: missing host", input)));
        }

        url.set_fragment(None);
        Ok(Self(url))
    }

    /// Build the identifier of `title` on `site` (e.g. `https://en.wikipedia.org`)
    pub fn from_title(site: &Url, title: &str) -> Result<Self, Error> {
        let normalized = title.trim().replace(' ', "_");
        if normalized.is_empty() {
            return Err(Error::InvalidIdentifier("empty article title".to_string()));
        }
        let path = format!("{}{}", WIKI_PATH_PREFIX, urlencoding::encode(&normalized));
        let url = site
            .join(&path)
            .map_err(|e| Error::InvalidIdentifier(format!("{}: {}", title, e)))?;
        Self::parse(url.as_str())
    }

    /// The underlying URL
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// Scheme and host of the wiki this article lives on
    pub fn site(&self) -> String {
        self.0.origin().ascii_serialization()
    }

    /// Human-readable title, if the URL has the usual `/wiki/<Title>` shape
    pub fn title(&self) -> Option<String> {
        let raw = self.0.path().strip_prefix(WIKI_PATH_PREFIX)?;
        if raw.is_empty() {
            return None;
        }
        let decoded = urlencoding::decode(raw).ok()?;
        Some(decoded.replace('_', " "))
    }

    /// Title as it appears in REST API paths (underscores, percent-encoded)
    pub fn path_title(&self) -> Option<String> {
        self.title()
            .map(|t| urlencoding::encode(&t.replace(' ', "_")).into_owned())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArticleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArticleId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArticleId> for String {
    fn from(id: ArticleId) -> Self {
        id.0.into()
    }
}

/// Fetched article payload, handed from the content source to the local cache
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    /// Which article this is
    pub id: ArticleId,
    /// Display title
    pub title: String,
    /// Rendered article body
    pub html: String,
    /// Revision the body was rendered from, when the source reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    /// When the content was retrieved
    pub fetched_at: DateTime<Utc>,
}

/// Lifecycle state of one fetch task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Admitted, waiting for a free slot
    Pending,
    /// Fetch in progress
    Running,
    /// Content fetched (or already cached)
    Succeeded,
    /// Fetch failed
    Failed,
    /// Fetch canceled
    Canceled,
}

/// How a fetch task ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Content is now available locally
    Succeeded {
        /// True when no network request was needed
        from_cache: bool,
    },
    /// The fetch failed; the article stays eligible for a later run
    Failed {
        /// What went wrong
        error: FetchError,
    },
    /// The fetch was canceled
    Canceled,
}

impl TaskOutcome {
    /// Terminal state corresponding to this outcome
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Succeeded { .. } => TaskState::Succeeded,
            TaskOutcome::Failed { .. } => TaskState::Failed,
            TaskOutcome::Canceled => TaskState::Canceled,
        }
    }
}

/// Whether a batch run is active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    /// No fetches pending or in flight
    #[default]
    Idle,
    /// At least one fetch pending or in flight
    Running,
}

/// Aggregate progress of the current (or last) batch run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Number of fetches admitted to the run
    pub total: usize,
    /// Fetches that reached a terminal state (succeeded + failed + canceled)
    pub completed: usize,
    /// Fetches that succeeded
    pub succeeded: usize,
    /// Fetches that failed
    pub failed: usize,
    /// Fetches that were canceled
    pub canceled: usize,
    /// Completion ratio in `0.0..=1.0`; 1.0 for an empty run
    pub fraction: f64,
    /// Most recent failure (cancellations excluded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<FetchError>,
}

impl BatchProgress {
    /// Returns true when every admitted fetch reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self {
            total: 0,
            completed: 0,
            succeeded: 0,
            failed: 0,
            canceled: 0,
            fraction: 1.0,
            last_error: None,
        }
    }
}

/// Result of [`cancel_all`](crate::SavedArticlesFetcher::cancel_all)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSummary {
    /// Tasks that were signaled (pending and running)
    pub canceled: usize,
    /// Running tasks that did not acknowledge within the timeout and were abandoned
    pub abandoned: usize,
}

/// Event emitted by the fetch pipeline
///
/// Subscribers receive events through [`SavedArticlesFetcher::subscribe`](crate::SavedArticlesFetcher::subscribe).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch run began
    RunStarted {
        /// Fetches admitted when the run began
        total: usize,
    },

    /// Article admitted but waiting for a free slot
    Queued {
        /// Article identifier
        id: ArticleId,
    },

    /// Article fetch dispatched to a worker
    Fetching {
        /// Article identifier
        id: ArticleId,
    },

    /// Article content is available locally
    ItemFetched {
        /// Article identifier
        id: ArticleId,
        /// True when the article was already cached
        from_cache: bool,
        /// Batch completion fraction after this item
        progress: f64,
    },

    /// Article fetch failed
    ItemFailed {
        /// Article identifier
        id: ArticleId,
        /// Batch completion fraction after this item
        progress: f64,
        /// What went wrong
        error: FetchError,
    },

    /// Article fetch canceled
    ItemCanceled {
        /// Article identifier
        id: ArticleId,
    },

    /// Aggregate progress changed
    Progress {
        /// Snapshot after the change
        progress: BatchProgress,
    },

    /// The run returned to idle
    RunFinished {
        /// Final progress of the run
        progress: BatchProgress,
    },

    /// The fetcher shut down
    Shutdown,
}
