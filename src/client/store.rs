//! Session storage
//!
//! Holds the authenticated user in memory and mirrors it to a JSON file so a
//! restarted client picks the session back up. The whole persisted state is
//! one object under the `currentUser` key:
//!
//! ```json
//! { "currentUser": { "id": 1, "username": "admin", "role": "Admin", "token": "eyJ..." } }
//! ```
//!
//! The file is written with 0600 permissions on Unix. Clones share state.

use crate::error::{ApiResult, AppError};
use crate::models::User;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    #[serde(default)]
    current_user: Option<User>,
}

/// Shared handle to the current session
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    /// `None` keeps the session in memory only
    file_path: Option<PathBuf>,
    current: Arc<RwLock<Option<User>>>,
}

impl SessionStore {
    /// A store that never touches the disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store backed by `file_path`, loading any user persisted there
    pub fn with_path(file_path: impl Into<PathBuf>) -> ApiResult<Self> {
        let file_path = file_path.into();
        let user = Self::load_from_disk(&file_path)?;
        Ok(Self {
            file_path: Some(file_path),
            current: Arc::new(RwLock::new(user)),
        })
    }

    fn load_from_disk(path: &Path) -> ApiResult<Option<User>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::Session(format!("Cannot read session file '{}': {}", path.display(), e))
        })?;

        match serde_json::from_str::<SessionFile>(&contents) {
            Ok(file) => Ok(file.current_user),
            Err(e) => {
                // A stale or hand-edited file just means "log in again".
                warn!("Ignoring unreadable session file '{}': {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn save_to_disk(&self, user: Option<&User>) -> ApiResult<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };

        let Some(user) = user else {
            if path.exists() {
                fs::remove_file(path).map_err(|e| {
                    AppError::Session(format!(
                        "Failed to remove session file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
            }
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Session(format!(
                    "Failed to create session directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = SessionFile {
            current_user: Some(user.clone()),
        };
        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| AppError::Session(format!("Failed to serialize session: {}", e)))?;

        fs::write(path, contents).map_err(|e| {
            AppError::Session(format!(
                "Failed to write session file '{}': {}",
                path.display(),
                e
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                AppError::Session(format!(
                    "Failed to set permissions on '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }

    /// The authenticated user, if any
    pub fn current(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Bearer token of the current session
    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|u| u.token.clone())
    }

    /// Replace the session and persist it
    pub fn set(&self, user: User) -> ApiResult<()> {
        self.save_to_disk(Some(&user))?;
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(user);
        Ok(())
    }

    /// Drop the session from memory and disk
    pub fn clear(&self) -> ApiResult<()> {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        self.save_to_disk(None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}
