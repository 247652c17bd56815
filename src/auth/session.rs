//! Session state and partition-scoped persistence.
//!
//! The session holds the bearer token and company affiliation for the
//! current login. Token contents are never inspected client-side; the server
//! decides validity through response codes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::CompanyCode;

/// Session file name inside the partition directory.
const SESSION_FILE: &str = "session.json";

/// The client-held record of authentication state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(rename = "isAuthenticated")]
    pub authenticated: bool,
    pub company: Option<CompanyCode>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Persistent store for the session, scoped to one partition directory.
///
/// `set_auth` and `logout` replace the whole session in one step; observers
/// never see a token without the flag or vice versa.
pub struct SessionStore {
    partition_dir: PathBuf,
    session: Session,
}

impl SessionStore {
    pub fn new(partition_dir: PathBuf) -> Self {
        Self {
            partition_dir,
            session: Session::default(),
        }
    }

    /// Load a previously persisted session, if any.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            self.session =
                serde_json::from_str(&contents).context("Failed to parse session file")?;
            return Ok(self.session.is_authenticated());
        }
        Ok(false)
    }

    /// Overwrite the session and persist it.
    pub fn set_auth(
        &mut self,
        token: String,
        authenticated: bool,
        company: Option<CompanyCode>,
    ) -> Result<()> {
        self.session = Session {
            access_token: Some(token),
            authenticated,
            company,
        };
        self.save()
    }

    /// Clear the session and remove the persisted file.
    pub fn logout(&mut self) -> Result<()> {
        self.session = Session::default();
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn token(&self) -> Option<&str> {
        self.session.access_token.as_deref()
    }

    pub fn company(&self) -> Option<CompanyCode> {
        self.session.company
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    fn save(&self) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.session)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.partition_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &std::path::Path) -> SessionStore {
        SessionStore::new(dir.to_path_buf())
    }

    #[test]
    fn test_set_auth_then_read_back() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = store_in(tmp.path());
        store
            .set_auth("tok-123".to_string(), true, Some(CompanyCode::B))
            .expect("Failed to set auth");

        assert!(store.is_authenticated());
        assert_eq!(store.token(), Some("tok-123"));
        assert_eq!(store.company(), Some(CompanyCode::B));

        // A fresh store over the same partition sees the persisted session
        let mut reloaded = store_in(tmp.path());
        assert!(reloaded.load().expect("Failed to load session"));
        assert_eq!(reloaded.token(), Some("tok-123"));
    }

    #[test]
    fn test_logout_clears_everything() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = store_in(tmp.path());
        store
            .set_auth("tok-123".to_string(), true, Some(CompanyCode::A))
            .expect("Failed to set auth");
        store.logout().expect("Failed to logout");

        // No partial state: token, flag and company all gone at once
        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(store.company(), None);

        let mut reloaded = store_in(tmp.path());
        assert!(!reloaded.load().expect("Failed to load session"));
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = store_in(tmp.path());
        store
            .set_auth(String::new(), true, None)
            .expect("Failed to set auth");
        assert!(!store.is_authenticated());
    }
}
