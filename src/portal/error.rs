//! Fixed error pages.

use crate::http::mime::mime_for;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Classes of failure a request can end in. Each maps to exactly one status
/// code and one static HTML body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Forbidden,
    NotFound,
    InternalError,
    ServiceUnavailable,
}

const PAGE_400: &str = "<html><head><title>Bad Request</title></head>\
                        <body><h1>400 - Bad Request</h1></body></html>";
const PAGE_403: &str = "<html><head><title>Forbidden</title></head>\
                        <body><h1>403 - Forbidden</h1></body></html>";
const PAGE_404: &str = "<html><head><title>Not Found</title></head>\
                        <body><h1>404 - Not Found</h1></body></html>";
const PAGE_500: &str = "<html><head><title>Internal Server Error</title></head>\
                        <body><h1>500 - Internal Server Error</h1></body></html>";
const PAGE_503: &str = "<html><head><title>Service Unavailable</title></head>\
                        <body><h1>503 - Service Unavailable</h1></body></html>";

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BadRequest,
            ErrorKind::Forbidden => StatusCode::Forbidden,
            ErrorKind::NotFound => StatusCode::NotFound,
            ErrorKind::InternalError => StatusCode::InternalServerError,
            ErrorKind::ServiceUnavailable => StatusCode::ServiceUnavailable,
        }
    }

    pub fn page(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => PAGE_400,
            ErrorKind::Forbidden => PAGE_403,
            ErrorKind::NotFound => PAGE_404,
            ErrorKind::InternalError => PAGE_500,
            ErrorKind::ServiceUnavailable => PAGE_503,
        }
    }
}

/// Builds the static error response for `kind`.
pub fn error_page(kind: ErrorKind) -> Response {
    ResponseBuilder::new(kind.status())
        .header("Content-Type", mime_for("error.html"))
        .body(kind.page())
        .build()
}
