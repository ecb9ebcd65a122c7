//! Bearer token held for the lifetime of a login.
//!
//! The token file is the only local state the client persists.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ClientConfig;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no token file location is configured")]
    NoTokenPath,
    #[error("failed to access token file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("token must not be empty")]
    EmptyToken,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    token_path: Option<PathBuf>,
}

impl Session {
    /// Session with an explicit token and nothing persisted.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            token_path: None,
        }
    }

    /// Token from the environment if set, else from the token file.
    pub fn load(config: &ClientConfig) -> Result<Self, SessionError> {
        let token_path = config.token_path.clone();
        let token = match &config.auth_token {
            Some(token) => Some(token.clone()),
            None => match &token_path {
                Some(path) => read_token(path)?,
                None => None,
            },
        };
        if token.is_none() {
            tracing::debug!("no stored credentials; requests will be unauthenticated");
        }
        Ok(Self { token, token_path })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Store `token` in memory and in the token file.
    pub fn login(&mut self, token: &str) -> Result<(), SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let path = self.token_path.as_ref().ok_or(SessionError::NoTokenPath)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, token).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })?;
        self.token = Some(token.to_string());
        tracing::info!("session token stored");
        Ok(())
    }

    /// Forget the token and delete the token file.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.token = None;
        if let Some(path) = &self.token_path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SessionError::Io {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }
        tracing::info!("session cleared");
        Ok(())
    }
}

fn read_token(path: &Path) -> Result<Option<String>, SessionError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let token = contents.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SessionError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_path(path: PathBuf) -> ClientConfig {
        ClientConfig {
            token_path: Some(path),
            auth_token: None,
            ..ClientConfig::default()
        }
    }

    #[test]
    fn login_persists_and_logout_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token");
        let config = config_with_path(path.clone());

        let mut session = Session::load(&config).unwrap();
        assert!(!session.is_authenticated());

        session.login("  secret-token\n").unwrap();
        assert_eq!(session.token(), Some("secret-token"));

        let reloaded = Session::load(&config).unwrap();
        assert_eq!(reloaded.token(), Some("secret-token"));

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(!path.exists());
        assert!(!Session::load(&config).unwrap().is_authenticated());

        // Logging out twice is fine.
        session.logout().unwrap();
    }

    #[test]
    fn environment_token_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "from-file").unwrap();

        let mut config = config_with_path(path);
        config.auth_token = Some("from-env".to_string());
        assert_eq!(Session::load(&config).unwrap().token(), Some("from-env"));
    }

    #[test]
    fn login_rejects_blank_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::load(&config_with_path(dir.path().join("token"))).unwrap();
        assert!(matches!(session.login("   "), Err(SessionError::EmptyToken)));
    }

    #[test]
    fn login_without_token_path_fails() {
        let mut session = Session::default();
        assert!(matches!(session.login("abc"), Err(SessionError::NoTokenPath)));
    }
}
