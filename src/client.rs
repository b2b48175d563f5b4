use crate::{config::Config, credentials::Credential};
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder};
use std::sync::Arc;
use url::Url;

/// The HTTP client shared by every endpoint.
///
/// Cloning is cheap and every clone sees the same credential. Only the
/// [`crate::SessionManager`] is able to change which credential gets attached,
/// so unrelated call sites can't race with login and logout.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    credential: Arc<RwLock<Option<Credential>>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(ApiClient::with_client(http, config.base_url.clone()))
    }

    /// Wrap an existing [`reqwest::Client`].
    pub fn with_client(http: Client, base_url: Url) -> Self {
        ApiClient {
            http,
            base_url,
            credential: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &Url { &self.base_url }

    /// Will requests made through this client be authenticated?
    pub fn has_credential(&self) -> bool { self.credential.read().is_some() }

    pub(crate) fn set_credential(&self, credential: Option<Credential>) {
        *self.credential.write() = credential;
    }

    /// Start building a request, attaching whatever credential is installed.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let credential = self.credential.read().clone();
        self.request_as(method, path, credential.as_ref())
    }

    /// Start building a request which carries a specific credential instead
    /// of the installed one.
    pub(crate) fn request_as(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
    ) -> RequestBuilder {
        let url = self.url(path);
        log::debug!("Sending a {} request to {}", method, url);

        let builder = self.http.request(method, &url);

        match credential {
            Some(credential) => builder.bearer_auth(credential.secret()),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        // Url::join() would throw away any path prefix on the base URL
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}
