//! Request dispatch for the captive portal.
//!
//! Every GET that is not a static asset or the Android connectivity probe gets
//! the splash page, whatever its path. That catch-all is what makes client
//! devices pop up the portal.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::http::mime::extension_of;
use crate::http::path::{simplify, MAX_PATH_LEN};
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::portal::error::{error_page, ErrorKind};
use crate::portal::files::DocumentRoot;
use crate::portal::form::{Completion, FormSubmission};
use crate::portal::persist::CredentialFile;
use crate::server::shutdown::ShutdownSignal;

pub const SAVE_PATH: &str = "/save";
pub const PROBE_PATH: &str = "/generate_204";

/// Extensions served from the document root instead of the splash page.
pub const STATIC_EXTENSIONS: &[&str] =
    &["css", "js", "json", "png", "jpg", "jpeg", "gif", "svg", "ico"];

pub const SUCCESS_BODY: &str = "WiFi configuration saved successfully!";

/// What the connection should do with a request.
#[derive(Debug)]
pub enum Route {
    /// Send this response.
    Respond(Response),
    /// Stream the body into this form, then call [`Router::complete`].
    Form(FormSubmission),
}

pub struct Router {
    files: DocumentRoot,
    redirect_location: String,
    credentials: CredentialFile,
    shutdown: Arc<dyn ShutdownSignal>,
    shutdown_delay: Duration,
}

impl Router {
    pub fn new(
        files: DocumentRoot,
        redirect_location: impl Into<String>,
        credentials: CredentialFile,
        shutdown: Arc<dyn ShutdownSignal>,
        shutdown_delay: Duration,
    ) -> Self {
        Self {
            files,
            redirect_location: redirect_location.into(),
            credentials,
            shutdown,
            shutdown_delay,
        }
    }

    pub fn from_config(cfg: &Config, shutdown: Arc<dyn ShutdownSignal>) -> anyhow::Result<Self> {
        Ok(Self::new(
            DocumentRoot::new(&cfg.portal.document_root, &cfg.portal.splash_page),
            cfg.redirect_location()?,
            CredentialFile::new(&cfg.portal.credentials_path),
            shutdown,
            Duration::from_secs(cfg.portal.shutdown_delay_secs),
        ))
    }

    pub fn redirect_location(&self) -> &str {
        &self.redirect_location
    }

    /// Decides how to answer `request`.
    pub async fn route(&self, request: &Request) -> Route {
        if request.path.len() > MAX_PATH_LEN {
            tracing::warn!(len = request.path.len(), "Request path truncated");
        }
        let path = simplify(&request.path);
        tracing::info!(method = %request.method, path = %path, "Request");

        match request.method {
            Method::POST if path == SAVE_PATH => {
                match FormSubmission::begin(request.header("Content-Type")) {
                    Ok(submission) => Route::Form(submission),
                    Err(e) => {
                        tracing::warn!(error = %e, "Rejecting form submission");
                        Route::Respond(error_page(ErrorKind::BadRequest))
                    }
                }
            }
            Method::POST => {
                tracing::warn!(path = %path, "POST to invalid endpoint");
                Route::Respond(error_page(ErrorKind::NotFound))
            }
            Method::GET => Route::Respond(self.handle_get(&path).await),
            _ => {
                tracing::warn!(method = %request.method, "Unsupported HTTP method");
                Route::Respond(error_page(ErrorKind::ServiceUnavailable))
            }
        }
    }

    async fn handle_get(&self, path: &str) -> Response {
        if extension_of(path).is_some_and(|ext| STATIC_EXTENSIONS.contains(&ext)) {
            return self.files.serve_static(path).await;
        }

        if path == PROBE_PATH {
            return self.probe_redirect();
        }

        self.files.serve_splash().await
    }

    /// 307 to the splash page. Probes follow the header; browsers that stop
    /// at the body get a link.
    fn probe_redirect(&self) -> Response {
        let body = format!(
            "<html><head></head><body><a href='{}'>Click here to continue</a></body></html>",
            self.redirect_location
        );
        ResponseBuilder::new(StatusCode::TemporaryRedirect)
            .header("Location", self.redirect_location.as_str())
            .header("Content-Type", "text/html")
            .body(body)
            .build()
    }

    /// Finalizes a form whose body has been fully received.
    pub async fn complete(&self, submission: FormSubmission) -> Response {
        let credentials = match submission.on_complete() {
            Completion::Complete(credentials) => credentials,
            Completion::Incomplete { missing } => {
                tracing::warn!(missing, "Form submission incomplete, nothing saved");
                return success_page();
            }
        };

        if let Err(e) = self.credentials.save(&credentials).await {
            tracing::error!(error = %format!("{e:#}"), "Failed to write WiFi config file");
            return error_page(ErrorKind::InternalError);
        }
        tracing::info!(ssid = %credentials.ssid_lossy(), "WiFi configuration saved");

        self.shutdown.schedule(self.shutdown_delay);
        success_page()
    }
}

fn success_page() -> Response {
    ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .body(SUCCESS_BODY)
        .build()
}
