//! A client for the debtbook bookkeeping API.
//!
//! The interesting part of this crate is the [`SessionManager`], which owns
//! the authentication lifecycle and is the only thing allowed to change the
//! credential attached to requests made through the shared [`ApiClient`].
//! Everything under [`endpoints`] is thin request/response glue.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod client;
mod config;
mod credentials;
pub mod endpoints;
mod guard;
mod identity;
mod session;

pub use client::ApiClient;
pub use config::{Config, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use credentials::{
    Credential, CredentialStore, FileStore, MemoryStore, StoreError,
    CREDENTIAL_KEY,
};
pub use endpoints::ApiError;
pub use guard::{Access, LOGIN_ROUTE};
pub use identity::Identity;
pub use session::{
    AuthFailure, AuthResult, Phase, Session, SessionManager, Status,
    LOGIN_FAILED, REGISTRATION_FAILED,
};

/// The default user agent to use when communicating with the server.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
