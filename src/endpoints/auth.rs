use super::ApiError;
use crate::{client::ApiClient, credentials::Credential, identity::Identity};
use reqwest::{Method, RequestBuilder};
use serde_derive::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};

const IDENTITY_PATH: &str = "/auth/me";

/// Send the user's credentials to the server.
///
/// A successful response only confirms the credentials were accepted. Call
/// [`me()`] afterwards to find out who we are.
pub async fn login(
    api: &ApiClient,
    email: &str,
    password: &str,
) -> Result<LoginResponse, ApiError> {
    let data = LoginData { email, password };
    log::trace!("Payload: {:?}", data);

    let request = api.request(Method::POST, "/auth/login").json(&data);
    let body = super::send(request).await?.text().await?;

    Ok(LoginResponse::parse(&body))
}

/// Create a new account. This does *not* log you in.
pub async fn register(
    api: &ApiClient,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(), ApiError> {
    let data = RegisterData {
        username: name,
        email,
        password,
    };
    log::trace!("Payload: {:?}", data);

    let request = api.request(Method::POST, "/auth/register").json(&data);
    super::send(request).await?;

    Ok(())
}

/// Ask the server who the currently installed credential belongs to.
pub async fn me(api: &ApiClient) -> Result<Identity, ApiError> {
    identity(api.request(Method::GET, IDENTITY_PATH)).await
}

/// Like [`me()`], but checking a specific credential.
pub async fn me_with(
    api: &ApiClient,
    credential: &Credential,
) -> Result<Identity, ApiError> {
    identity(api.request_as(Method::GET, IDENTITY_PATH, Some(credential)))
        .await
}

async fn identity(request: RequestBuilder) -> Result<Identity, ApiError> {
    let response = super::send(request).await?;
    let identity: Identity = super::read_json(response).await?;
    log::trace!("Parsed identity: {:?}", identity);

    Ok(identity)
}

/// What the server says after a successful login.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoginResponse {
    /// Only present when the server hands out bearer tokens.
    #[serde(default)]
    pub token: Option<Credential>,
}

impl LoginResponse {
    /// The body is only a confirmation, so anything we can't make sense of
    /// is treated as "no token".
    fn parse(body: &str) -> LoginResponse {
        if body.trim().is_empty() {
            return LoginResponse::default();
        }

        let mut response: LoginResponse =
            serde_json::from_str(body).unwrap_or_else(|e| {
                log::debug!("Ignoring an unexpected login response body: {}", e);
                LoginResponse::default()
            });
        // a blank token would only ever be rejected later
        response.token = response
            .token
            .filter(|token| !token.secret().trim().is_empty());

        response
    }
}

#[derive(Serialize)]
struct LoginData<'a> {
    email: &'a str,
    password: &'a str,
}

impl Debug for LoginData<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginData")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct RegisterData<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

impl Debug for RegisterData<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
