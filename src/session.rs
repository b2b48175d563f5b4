//! The authentication lifecycle.
//!
//! A [`SessionManager`] goes `Uninitialized -> Restoring -> {Authenticated,
//! Anonymous}` at startup, after which it only moves between `Authenticated`
//! and `Anonymous` by logging in, logging out, or having the server reject
//! our credential.
//!
//! Every operation which can suspend captures a generation number first and
//! only applies its result if nothing else has bumped the generation in the
//! meantime. That way a slow session restore can never clobber a more recent
//! login or logout. A result which arrives after the caller stopped waiting
//! still settles the session.

use crate::{
    client::ApiClient,
    credentials::{Credential, CredentialStore},
    endpoints::{self, ApiError},
    identity::Identity,
};
use parking_lot::Mutex;
use std::{future::Future, sync::Arc};
use tokio::sync::watch;

/// Shown when a login fails and the server didn't say why.
pub const LOGIN_FAILED: &str = "Login failed";
/// Shown when registration fails and the server didn't say why.
pub const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    /// A restore, login, or registration is in flight.
    Loading,
    Ready,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Restoring,
    Authenticated,
    Anonymous,
}

/// A snapshot of the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    user: Option<Identity>,
    status: Status,
    phase: Phase,
}

impl Session {
    pub fn user(&self) -> Option<&Identity> { self.user.as_ref() }

    pub fn status(&self) -> Status { self.status }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn is_loading(&self) -> bool { self.status == Status::Loading }

    pub fn is_authenticated(&self) -> bool {
        self.phase == Phase::Authenticated
    }

    fn sign_in(&mut self, identity: Identity) {
        self.user = Some(identity);
        self.phase = Phase::Authenticated;
        self.status = Status::Ready;
    }

    fn sign_out(&mut self) {
        self.user = None;
        self.phase = Phase::Anonymous;
        self.status = Status::Ready;
    }
}

impl Default for Session {
    fn default() -> Self {
        Session {
            user: None,
            status: Status::Ready,
            phase: Phase::Uninitialized,
        }
    }
}

/// Why a login or registration didn't work, in words a user can read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    message: String,
}

impl AuthFailure {
    pub fn new<S: Into<String>>(message: S) -> Self {
        AuthFailure {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str { &self.message }

    fn from_api(error: &ApiError, fallback: &str) -> Self {
        AuthFailure::new(error.message().unwrap_or(fallback))
    }
}

/// The outcome of [`SessionManager::login()`] and
/// [`SessionManager::register()`].
pub type AuthResult = Result<(), AuthFailure>;

/// Owns the current [`Session`] and the credential attached to requests made
/// through its [`ApiClient`].
///
/// Create one at startup, share it (e.g. behind an [`Arc`]) with whoever
/// needs to read the session, and call [`SessionManager::initialize()`] once.
///
/// The network half of a restore or login runs on its own task, so dropping
/// the future returned by [`SessionManager::initialize()`] or
/// [`SessionManager::login()`] only throws away the reply. The operation
/// still finishes and settles the session, unless something newer has
/// superseded it.
pub struct SessionManager {
    shared: Arc<Shared>,
}

struct Shared {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
    generation: Mutex<u64>,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(Session::default());

        SessionManager {
            shared: Arc::new(Shared {
                api,
                store,
                state,
                generation: Mutex::new(0),
            }),
        }
    }

    /// The shared client. Requests made through it carry whatever credential
    /// the session currently holds.
    pub fn api(&self) -> &ApiClient { &self.shared.api }

    pub fn session(&self) -> Session { self.shared.state.borrow().clone() }

    pub fn current_user(&self) -> Option<Identity> {
        self.shared.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().is_loading()
    }

    /// Get notified whenever the session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.shared.state.subscribe()
    }

    /// Try to restore a persisted session. Only the first call does
    /// anything.
    pub async fn initialize(&self) {
        let persisted = match self.shared.store.load() {
            Ok(credential) => credential,
            Err(e) => {
                log::warn!("Unable to load the persisted credential: {}", e);
                None
            },
        };

        let has_credential = persisted.is_some();
        let started = self.shared.begin(|session| {
            if session.phase != Phase::Uninitialized || session.is_loading() {
                return false;
            }

            if has_credential {
                session.phase = Phase::Restoring;
                session.status = Status::Loading;
            } else {
                session.sign_out();
            }
            true
        });

        let (generation, credential) = match (started, persisted) {
            (Some(generation), Some(credential)) => (generation, credential),
            (Some(_), None) => {
                log::info!("No persisted credential, starting anonymously");
                return;
            },
            (None, _) => {
                log::debug!("The session was already initialized");
                return;
            },
        };

        log::info!("Restoring the persisted session");
        let shared = Arc::clone(&self.shared);
        let restore =
            tokio::spawn(async move { shared.restore(generation, credential).await });

        if let Err(e) = restore.await {
            log::error!("The session restore task failed: {}", e);
        }
    }

    /// Log in, replacing whatever session we had on success.
    ///
    /// On failure an authenticated or not-yet-initialized session is left as
    /// it was. Otherwise we end up anonymous, even if this login interrupted
    /// a session restore.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult {
        if email.is_empty() || password.is_empty() {
            return Err(AuthFailure::new("Email and password are required"));
        }

        let generation = self.shared.supersede(|session| {
            session.status = Status::Loading;
        });

        let shared = Arc::clone(&self.shared);
        let email = email.to_string();
        let password = password.to_string();
        let login = tokio::spawn(async move {
            shared.login(generation, &email, &password).await
        });

        login.await.unwrap_or_else(|e| {
            log::error!("The login task failed: {}", e);
            Err(AuthFailure::new(LOGIN_FAILED))
        })
    }

    /// Create an account and then log into it.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AuthResult {
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthFailure::new(
                "Name, email and password are required",
            ));
        }

        if let Err(e) =
            endpoints::auth::register(self.api(), name, email, password).await
        {
            log::warn!("Registration failed: {}", e);
            return Err(AuthFailure::from_api(&e, REGISTRATION_FAILED));
        }

        log::info!("Registered {}", email);
        self.login(email, password).await
    }

    /// Forget the current session. Safe to call at any time, as often as
    /// you like.
    pub fn logout(&self) {
        let shared = &self.shared;
        shared.supersede(|session| {
            shared.discard_credential();
            session.sign_out();
        });

        log::info!("Logged out");
    }

    /// Run a request against the shared client. If the server says our
    /// credential is no good, the session is expired just like a
    /// [`SessionManager::logout()`].
    pub async fn authorized<F, Fut, T>(&self, request: F) -> Result<T, ApiError>
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let generation = *self.shared.generation.lock();
        let result = request(self.shared.api.clone()).await;

        if let Err(ref e) = result {
            if e.is_authorization() {
                self.shared.expire(generation);
            }
        }

        result
    }
}

impl Shared {
    async fn restore(&self, generation: u64, credential: Credential) {
        let outcome = endpoints::auth::me_with(&self.api, &credential).await;

        let applied = self.commit(generation, |session| match outcome {
            Ok(identity) => {
                log::info!("Restored the session for {}", identity.email);
                self.api.set_credential(Some(credential));
                session.sign_in(identity);
            },
            Err(e) if e.is_authorization() => {
                log::warn!("The persisted credential was rejected, discarding it");
                self.discard_credential();
                session.sign_out();
            },
            Err(e) => {
                log::warn!(
                    "Unable to restore the session, keeping the credential for next time: {}",
                    e
                );
                session.sign_out();
            },
        });

        if !applied {
            log::debug!("Discarding the result of a superseded session restore");
        }
    }

    async fn login(
        &self,
        generation: u64,
        email: &str,
        password: &str,
    ) -> AuthResult {
        match self.authenticate(email, password).await {
            Ok((identity, token)) => {
                let applied = self.commit(generation, |session| {
                    if let Some(token) = token {
                        self.persist(&token);
                        self.api.set_credential(Some(token));
                    }
                    session.sign_in(identity);
                });

                if applied {
                    log::info!("Logged in as {}", email);
                    Ok(())
                } else {
                    log::info!("A newer session change superseded the login for {}", email);
                    Err(AuthFailure::new("Login was cancelled"))
                }
            },
            Err(e) => {
                log::warn!("Login failed: {}", e);

                self.commit(generation, |session| match session.phase {
                    Phase::Authenticated | Phase::Uninitialized => {
                        session.status = Status::Ready;
                    },
                    // any restore we cut short won't be finishing
                    Phase::Restoring | Phase::Anonymous => session.sign_out(),
                });

                Err(AuthFailure::from_api(&e, LOGIN_FAILED))
            },
        }
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Identity, Option<Credential>), ApiError> {
        let response = endpoints::auth::login(&self.api, email, password).await?;

        let identity = match response.token {
            Some(ref token) => endpoints::auth::me_with(&self.api, token).await?,
            // no token, so the server must be relying on something else
            None => endpoints::auth::me(&self.api).await?,
        };

        Ok((identity, response.token))
    }

    /// Log out because the server rejected a credential we were using
    /// during `generation`.
    fn expire(&self, generation: u64) {
        let mut current = self.generation.lock();

        if *current != generation {
            log::debug!("Ignoring a rejection aimed at an older session");
            return;
        }

        *current += 1;
        self.discard_credential();
        self.state.send_modify(Session::sign_out);
        drop(current);

        log::warn!("The server rejected our credential, logging out");
    }

    /// Start an operation without invalidating anything in flight. Returns
    /// the generation to commit against if `update` accepted it.
    fn begin<F>(&self, update: F) -> Option<u64>
    where
        F: FnOnce(&mut Session) -> bool,
    {
        let generation = self.generation.lock();
        let accepted = self.state.send_if_modified(update);

        if accepted {
            Some(*generation)
        } else {
            None
        }
    }

    /// Invalidate everything in flight and start a new generation.
    fn supersede<F>(&self, update: F) -> u64
    where
        F: FnOnce(&mut Session),
    {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.state.send_modify(update);

        *generation
    }

    /// Apply `update` if nothing has superseded `generation`.
    fn commit<F>(&self, generation: u64, update: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let current = self.generation.lock();

        if *current != generation {
            return false;
        }

        self.state.send_modify(update);
        true
    }

    fn persist(&self, credential: &Credential) {
        if let Err(e) = self.store.save(credential) {
            log::warn!("Unable to persist the credential: {}", e);
        }
    }

    fn discard_credential(&self) {
        self.api.set_credential(None);

        if let Err(e) = self.store.clear() {
            log::warn!("Unable to clear the persisted credential: {}", e);
        }
    }
}
