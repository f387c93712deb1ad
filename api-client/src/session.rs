//! Explicit authentication session.
//!
//! One [`Session`] is shared (cheaply cloned) between the HTTP client and
//! whatever owns the login screen. The client reads the bearer token from it
//! and clears it on HTTP 401; observers learn about every transition through
//! [`Session::subscribe`].

use parking_lot::RwLock;
use secrecy::{ExposeSecret, Secret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Role of the logged-in staff member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Receptionist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Credentials of an authenticated user
pub struct AuthSession {
    token: SecretString,
    refresh_token: Option<SecretString>,
    pub user: SessionUser,
}

impl AuthSession {
    pub fn new(token: impl Into<String>, refresh_token: Option<String>, user: SessionUser) -> Self {
        Self {
            token: Secret::new(token.into()),
            refresh_token: refresh_token.map(Secret::new),
            user,
        }
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }
}

impl Clone for AuthSession {
    fn clone(&self) -> Self {
        Self::new(
            self.token().to_string(),
            self.refresh_token().map(str::to_string),
            self.user.clone(),
        )
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    LoggedOut,
    /// The backend answered 401; the operator must log in again.
    Expired,
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<RwLock<Option<AuthSession>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(RwLock::new(None)),
            events,
        }
    }

    pub fn with_auth(auth: AuthSession) -> Self {
        let session = Self::new();
        *session.inner.write() = Some(auth);
        session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.inner.read().clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.inner.read().as_ref().map(|s| s.user.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.inner.read().as_ref().map(|s| s.user.role)
    }

    pub(crate) fn bearer_token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|s| s.token().to_string())
    }

    pub fn establish(&self, auth: AuthSession) {
        *self.inner.write() = Some(auth);
        self.emit(SessionEvent::LoggedIn);
    }

    /// Replace the tokens while keeping the user.
    pub fn refresh(&self, token: impl Into<String>, refresh_token: Option<String>) {
        let mut guard = self.inner.write();
        if let Some(current) = guard.as_mut() {
            current.token = Secret::new(token.into());
            if let Some(refresh) = refresh_token {
                current.refresh_token = Some(Secret::new(refresh));
            }
            drop(guard);
            self.emit(SessionEvent::Refreshed);
        }
    }

    pub fn logout(&self) {
        if self.inner.write().take().is_some() {
            self.emit(SessionEvent::LoggedOut);
        }
    }

    pub(crate) fn expire(&self) {
        if self.inner.write().take().is_some() {
            tracing::warn!("Session expired, credentials cleared");
            self.emit(SessionEvent::Expired);
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receptionist() -> SessionUser {
        SessionUser {
            id: "u-1".to_string(),
            name: "Front Desk".to_string(),
            email: "desk@lab.example".to_string(),
            role: Role::Receptionist,
        }
    }

    #[test]
    fn test_establish_and_logout_emit_events() {
        let session = Session::new();
        let mut events = session.subscribe();

        session.establish(AuthSession::new("tok", None, receptionist()));
        assert!(session.is_authenticated());
        assert_eq!(session.role(), Some(Role::Receptionist));

        session.logout();
        assert!(!session.is_authenticated());

        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedIn);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[test]
    fn test_refresh_keeps_user() {
        let session = Session::with_auth(AuthSession::new("old", Some("r1".into()), receptionist()));
        session.refresh("new", None);

        let current = session.current().unwrap();
        assert_eq!(current.token(), "new");
        assert_eq!(current.refresh_token(), Some("r1"));
        assert_eq!(current.user, receptionist());
    }

    #[test]
    fn test_expire_only_fires_once() {
        let session = Session::with_auth(AuthSession::new("tok", None, receptionist()));
        let mut events = session.subscribe();
        session.expire();
        session.expire();
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let auth = AuthSession::new("super-secret", None, receptionist());
        assert!(!format!("{auth:?}").contains("super-secret"));
    }
}
