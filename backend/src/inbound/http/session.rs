//! Cookie session access for authenticated marketplace endpoints.
//!
//! The session cookie is minted by the marketplace auth provider with the
//! shared key loaded in `session_config`. Handlers only need the signed-in
//! user's id, so [`SessionContext`] exposes exactly that.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Handler-facing view of the Actix session.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store `user_id` in the session cookie.
    ///
    /// The auth provider normally does this; tests and tooling use it to
    /// mint sessions locally.
    pub fn persist_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.0.insert(USER_ID_KEY, user_id.as_ref()).map_err(|err| {
            warn!(error = %err, "failed to write session");
            Error::internal("failed to persist session")
        })
    }

    /// Signed-in user, or `None` for anonymous or unreadable sessions.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        let raw = self.0.get::<String>(USER_ID_KEY).map_err(|err| {
            warn!(error = %err, "failed to read session");
            Error::internal("failed to read session")
        })?;
        Ok(raw.and_then(|raw| match UserId::new(&raw) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "session carries an invalid user id");
                None
            }
        }))
    }

    /// Signed-in user or `401 Unauthorized`.
    pub fn require_user_id(&self) -> Result<UserId, Error> {
        self.user_id()?
            .ok_or_else(|| Error::unauthorized("sign in required"))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
