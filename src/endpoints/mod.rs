//! The bookkeeping API's endpoints.

pub mod auth;
pub mod contacts;
pub mod dashboard;

pub use contacts::{Contact, ContactDraft, ContactForm, ContactKind, FormError};
pub use dashboard::DashboardStats;

use crate::identity::text_field;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Everything that can go wrong when talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// We never got a response (connection refused, timeout, etc.). This is
    /// transient and says nothing about whether our credential is valid.
    #[error("Unable to send the request")]
    Network(#[from] reqwest::Error),
    /// The server rejected our credential (HTTP 401).
    #[error("The server rejected our credentials")]
    Authorization { message: Option<String> },
    /// The server didn't like the request (any other 4xx).
    #[error("The request was rejected with {status}")]
    Validation {
        status: StatusCode,
        message: Option<String>,
    },
    /// Something went wrong on the server's end.
    #[error("The server failed with {status}")]
    Server {
        status: StatusCode,
        message: Option<String>,
    },
    /// The server responded successfully but we couldn't understand it.
    #[error("Unable to parse the response")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Interpret an unsuccessful response.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = server_message(body);

        if status == StatusCode::UNAUTHORIZED {
            ApiError::Authorization { message }
        } else if status.is_client_error() {
            ApiError::Validation { status, message }
        } else {
            ApiError::Server { status, message }
        }
    }

    /// The human-readable message the server gave us, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Authorization { message }
            | ApiError::Validation { message, .. }
            | ApiError::Server { message, .. } => message.as_deref(),
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, ApiError::Authorization { .. })
    }

    /// Might trying again later help?
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Server { .. })
    }
}

/// Pull the `error` (or failing that, `message`) field out of an error body.
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    text_field(&value, &["error", "message"]).filter(|msg| !msg.is_empty())
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await?;
    log::trace!("Headers: {:#?}", response.headers());

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::debug!("Request failed with {}: {}", status, body);

    Err(ApiError::from_status(status, &body))
}

async fn read_json<T>(response: Response) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let body = response.text().await?;
    log::trace!("Response: {}", body);

    serde_json::from_str(&body).map_err(ApiError::Decode)
}
