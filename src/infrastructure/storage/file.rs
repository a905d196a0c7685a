//! File-backed session storage
//!
//! Stores the session record as JSON with secure file permissions.
//!
//! # File Location
//!
//! - Linux: `~/.config/crossing-monitor/session.json`
//! - macOS: `~/Library/Application Support/crossing-monitor/session.json`
//! - Windows: `%APPDATA%\crossing-monitor\session.json`
//!
//! # File Format
//!
//! ```json
//! {"accessToken": "eyJ...", "refreshToken": "eyJ...", "user": {"id": "17", "email": "ops@rail.cl", "role": "ADMIN", "is_active": true}}
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the record,
//! so a crash never leaves half a record behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::application::ports::SessionStorage;
use crate::domain::{ClientError, ClientResult, PersistedSession};

const FILE_NAME: &str = "session.json";

#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    file_path: PathBuf,
}

impl FileSessionStorage {
    /// `<config dir>/crossing-monitor/session.json`, falling back to the
    /// working directory when no config dir is known.
    pub fn default_path() -> PathBuf {
        match dirs_next::config_dir() {
            Some(dir) => dir.join("crossing-monitor").join(FILE_NAME),
            None => PathBuf::from(".crossing-monitor").join(FILE_NAME),
        }
    }

    pub fn new() -> Self {
        Self::with_path(Self::default_path())
    }

    pub fn with_path(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| FILE_NAME.into());
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }

    async fn write_atomically(&self, contents: &[u8]) -> ClientResult<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    ClientError::Storage(format!(
                        "Failed to create session directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let temp = self.temp_path();
        fs::write(&temp, contents).await.map_err(|e| {
            ClientError::Storage(format!(
                "Failed to write session file at '{}': {}",
                temp.display(),
                e
            ))
        })?;

        // Set file permissions to 0600 (owner read/write only) on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| {
                    ClientError::Storage(format!(
                        "Failed to set file permissions for '{}': {}",
                        temp.display(),
                        e
                    ))
                })?;
        }

        fs::rename(&temp, &self.file_path).await.map_err(|e| {
            ClientError::Storage(format!(
                "Failed to replace session file at '{}': {}",
                self.file_path.display(),
                e
            ))
        })
    }
}

impl Default for FileSessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn load(&self) -> ClientResult<Option<PersistedSession>> {
        let contents = match fs::read(&self.file_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "Cannot read session file '{}': {}",
                    self.file_path.display(),
                    e
                )))
            }
        };

        match serde_json::from_slice::<PersistedSession>(&contents) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %self.file_path.display(), error = %e, "Ignoring corrupted session file");
                Ok(None)
            }
        }
    }

    async fn save(&self, record: &PersistedSession) -> ClientResult<()> {
        let contents = serde_json::to_vec(record)
            .map_err(|e| ClientError::Storage(format!("Failed to serialize session: {}", e)))?;
        self.write_atomically(&contents).await?;
        debug!(path = %self.file_path.display(), "Session persisted");
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(format!(
                "Failed to remove session file '{}': {}",
                self.file_path.display(),
                e
            ))),
        }
    }
}
