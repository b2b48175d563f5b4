use crate::{
    identity::Identity,
    session::{Phase, Session},
};
use tokio::sync::watch;

/// Where anonymous users get sent.
pub const LOGIN_ROUTE: &str = "/auth/login";

/// What a protected screen should do with the current [`Session`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Access<'a> {
    /// We don't know yet, show something like "Loading...".
    Pending,
    Granted(&'a Identity),
    Redirect(&'static str),
}

impl<'a> Access<'a> {
    pub fn of(session: &'a Session) -> Self {
        if session.is_loading() {
            return Access::Pending;
        }

        match (session.phase(), session.user()) {
            (Phase::Uninitialized, _) | (Phase::Restoring, _) => Access::Pending,
            (_, Some(user)) => Access::Granted(user),
            (_, None) => Access::Redirect(LOGIN_ROUTE),
        }
    }

    pub fn is_pending(&self) -> bool { matches!(self, Access::Pending) }

    /// Wait until the session settles, returning the signed-in user (if
    /// any).
    pub async fn settled(
        rx: &mut watch::Receiver<Session>,
    ) -> Result<Option<Identity>, watch::error::RecvError> {
        let session = rx.wait_for(|s| !Access::of(s).is_pending()).await?;

        Ok(session.user().cloned())
    }
}
