//! Captive portal request handling.
//!
//! The router inspects each sanitized request and either answers it from
//! the document root (static assets, the splash page, the probe redirect) or
//! hands the connection a [`form::FormSubmission`] to stream a
//! `POST /save` body into. A complete submission is written to the
//! credential file and arms the deferred shutdown.

pub mod decoder;
pub mod error;
pub mod files;
pub mod form;
pub mod persist;
pub mod router;

pub use error::{error_page, ErrorKind};
pub use router::{Route, Router};
