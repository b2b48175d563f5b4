use std::time::Duration;
use url::Url;

/// Where the API lives when nobody says otherwise.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// How long a single request may take before we give up on it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings used when constructing an [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Config {
    pub fn new(base_url: Url) -> Self {
        Config {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            user_agent: String::from(crate::DEFAULT_USER_AGENT),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Config { timeout, ..self }
    }
}

impl Default for Config {
    fn default() -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .expect("The default base URL is always valid");

        Config::new(base_url)
    }
}
