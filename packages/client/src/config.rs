use std::time::Duration;

use url::Url;

use crate::error::RemoteError;

/// Environment variable read by [`ClientConfig::from_env`].
pub const BASE_URL_VAR: &str = "ISORESOURCE_BASE_URL";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how remote proxies send requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    /// Sent with every request, after the envelope negotiation headers.
    pub headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            timeout: DEFAULT_TIMEOUT,
            headers: Vec::new(),
        })
    }

    /// Base URL from `ISORESOURCE_BASE_URL`, when set.
    pub fn from_env() -> Option<Result<Self, RemoteError>> {
        std::env::var(BASE_URL_VAR).ok().map(|url| Self::new(&url))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `path` appended to the base URL's path.
    pub fn url_for(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url
    }
}
