//! Credential persistence.

use std::path::PathBuf;

use anyhow::Context;
use tokio::sync::Mutex;

use crate::portal::form::Credentials;

/// The flat two-line credential file: SSID on line 1, password on line 2,
/// both written verbatim.
///
/// Writes go through a lock so two connections finishing at once cannot
/// interleave their contents.
#[derive(Debug)]
pub struct CredentialFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Replaces the file with `credentials`.
    pub async fn save(&self, credentials: &Credentials) -> anyhow::Result<()> {
        let mut contents =
            Vec::with_capacity(credentials.ssid.len() + credentials.password.len() + 2);
        contents.extend_from_slice(&credentials.ssid);
        contents.push(b'\n');
        contents.extend_from_slice(&credentials.password);
        contents.push(b'\n');

        let _guard = self.lock.lock().await;
        tokio::fs::write(&self.path, &contents)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;

        tracing::info!(path = %self.path.display(), "WiFi config written");
        Ok(())
    }
}
