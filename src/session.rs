//! Client-local session: the auth token and a cached user record.
//!
//! The cached user mirrors server state and is only used to know who is
//! signed in. Privileged decisions re-fetch the user from the server.

use crate::error::Result;
use crate::models::User;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key under which the token is persisted.
pub const TOKEN_KEY: &str = "token";
/// Key under which the cached user is persisted.
pub const USER_KEY: &str = "user";

#[derive(Default)]
struct SessionState {
    token: Option<SecretString>,
    user: Option<User>,
}

/// On-disk layout: one JSON object with the two well-known keys.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(rename = "token", default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    user: Option<User>,
}

/// Session store, optionally backed by a JSON file.
pub struct SessionStore {
    path: Option<PathBuf>,
    state: Mutex<SessionState>,
}

/// Default session file: `~/.memecap/session.json`.
pub fn default_session_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memecap")
        .join("session.json")
}

/// A token is usable only if it could be sent as a bearer credential.
pub fn is_well_formed_token(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(|c| c.is_whitespace() || c.is_control())
}

impl SessionStore {
    /// Session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Open a file-backed session. A missing file is an empty session;
    /// an unreadable JSON document is discarded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let persisted = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str::<PersistedSession>(&json).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "discarding corrupt session file");
                PersistedSession::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistedSession::default(),
            Err(e) => return Err(e.into()),
        };

        let state = SessionState {
            token: persisted.token.map(SecretString::from),
            user: persisted.user,
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current token, if one is stored and well formed.
    pub fn token(&self) -> Option<String> {
        let state = self.lock();
        state
            .token
            .as_ref()
            .map(|t| t.expose_secret().to_string())
            .filter(|t| is_well_formed_token(t))
    }

    /// Cached user record.
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        let mut state = self.lock();
        state.token = Some(SecretString::from(token.to_string()));
        self.persist(&state)
    }

    pub fn save_user(&self, user: &User) -> Result<()> {
        let mut state = self.lock();
        state.user = Some(user.clone());
        self.persist(&state)
    }

    /// Store token and user together, as login and verify do.
    pub fn save(&self, token: &str, user: &User) -> Result<()> {
        let mut state = self.lock();
        state.token = Some(SecretString::from(token.to_string()));
        state.user = Some(user.clone());
        self.persist(&state)
    }

    /// Drop token and user together. Memory is cleared before the file
    /// is removed.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        *state = SessionState::default();

        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some() && self.user().is_some()
    }

    fn persist(&self, state: &SessionState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let persisted = PersistedSession {
            token: state.token.as_ref().map(|t| t.expose_secret().to_string()),
            user: state.user.clone(),
        };
        let json = serde_json::to_string_pretty(&persisted)?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let tmp = path.with_extension("json.tmp");
        {
            let mut file = open_private(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        tracing::debug!(path = %path.display(), "session saved");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
