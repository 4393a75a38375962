//! Static asset and splash page serving.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

use crate::http::mime::mime_for;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::portal::error::{error_page, ErrorKind};

/// Files under the portal's document root.
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    root: PathBuf,
    splash_page: String,
}

impl DocumentRoot {
    pub fn new(root: impl Into<PathBuf>, splash_page: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            splash_page: splash_page.into(),
        }
    }

    /// Maps a sanitized request path under the root.
    fn resolve(&self, sanitized_path: &str) -> PathBuf {
        self.root.join(sanitized_path.trim_start_matches('/'))
    }

    /// Streams the file at `sanitized_path`. The path must already have been
    /// through [`crate::http::path::simplify`].
    pub async fn serve_static(&self, sanitized_path: &str) -> Response {
        let path = self.resolve(sanitized_path);

        if !is_servable(&path).await {
            tracing::debug!(path = %path.display(), "Static file not found");
            return error_page(ErrorKind::NotFound);
        }

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to open static file");
                return error_page(ErrorKind::ServiceUnavailable);
            }
        };
        let len = match file.metadata().await {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat static file");
                return error_page(ErrorKind::ServiceUnavailable);
            }
        };

        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", mime_for(sanitized_path))
            .file(file, len)
            .build()
    }

    /// Reads the whole splash page into memory and returns it.
    pub async fn serve_splash(&self) -> Response {
        let path = self.root.join(&self.splash_page);

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                tracing::warn!(path = %path.display(), "Splash page missing");
                return error_page(ErrorKind::NotFound);
            }
        }

        match read_bounded(&path).await {
            Ok(contents) => ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", mime_for(&self.splash_page))
                .body(contents)
                .build(),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read splash page");
                error_page(ErrorKind::ServiceUnavailable)
            }
        }
    }
}

/// Regular files are served. Symbolic links are followed, so a link is
/// served only when its target is a regular file.
async fn is_servable(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

/// Reads a file whose size is known up front, reporting an allocation
/// failure as an error instead of aborting.
async fn read_bounded(path: &Path) -> anyhow::Result<Vec<u8>> {
    let mut file = File::open(path).await?;
    let len = usize::try_from(file.metadata().await?.len())?;

    let mut contents = Vec::new();
    contents.try_reserve_exact(len)?;
    file.read_to_end(&mut contents).await?;
    Ok(contents)
}
