//! Session persistence between invocations.

use api_client::{AuthSession, Session, SessionUser};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const SESSION_FILE: &str = "session.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No configuration directory available on this system")]
    NoConfigDir,

    #[error("Session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: SessionUser,
}

/// Session kept as JSON in the user's config directory, owner-readable only
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// # Errors
    ///
    /// [`StoreError::NoConfigDir`] when the platform has no home directory.
    pub fn default_location() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from("dev", "labdesk", "labdesk").ok_or(StoreError::NoConfigDir)?;
        Ok(Self::at(dirs.config_dir().join(SESSION_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh [`Session`], authenticated when a stored one exists.
    ///
    /// # Errors
    ///
    /// Unreadable or corrupt session file.
    pub fn load(&self) -> Result<Session, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Session::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let stored: StoredSession = serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "Loaded stored session");
        Ok(Session::with_auth(AuthSession::new(
            stored.token,
            stored.refresh_token,
            stored.user,
        )))
    }

    /// Persist the session, or remove the file when logged out.
    ///
    /// # Errors
    ///
    /// Filesystem failures.
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        let Some(auth) = session.current() else {
            return self.clear();
        };
        let stored = StoredSession {
            token: auth.token().to_string(),
            refresh_token: auth.refresh_token().map(str::to_string),
            user: auth.user.clone(),
        };
        let io = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_string_pretty(&stored).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_private(&self.path, json.as_bytes()).map_err(io)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Filesystem failures other than a missing file.
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// New files are created 0600; a file left by an older build is narrowed
/// before the token is written into it.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::Role;

    fn scratch() -> FileSessionStore {
        FileSessionStore::at(std::env::temp_dir().join(format!("labdesk-{}", uuid::Uuid::new_v4())).join(SESSION_FILE))
    }

    #[test]
    fn test_missing_file_is_logged_out() {
        let store = scratch();
        assert!(!store.load().unwrap().is_authenticated());
    }

    #[test]
    fn test_save_load_and_clear() {
        let store = scratch();
        let session = Session::with_auth(AuthSession::new(
            "tok-1",
            Some("ref-1".to_string()),
            SessionUser {
                id: "u-1".to_string(),
                name: "Admin".to_string(),
                email: "admin@lab.example".to_string(),
                role: Role::Admin,
            },
        ));
        store.save(&session).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.role(), Some(Role::Admin));
        assert_eq!(loaded.current().unwrap().refresh_token(), Some("ref-1"));

        session.logout();
        store.save(&session).unwrap();
        assert!(!store.path().exists());
        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let store = scratch();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        // Left behind world-readable by an earlier run
        std::fs::write(store.path(), "{}").unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        let session = Session::with_auth(AuthSession::new(
            "tok-2",
            None,
            SessionUser {
                id: "u-2".to_string(),
                name: "Front Desk".to_string(),
                email: "desk@lab.example".to_string(),
                role: Role::Receptionist,
            },
        ));
        store.save(&session).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::remove_file(store.path()).unwrap();
        store.save(&session).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_reported() {
        let store = scratch();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }
}
