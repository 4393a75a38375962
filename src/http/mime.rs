//! MIME type detection based on file extensions.

/// Content type used when the extension is missing or unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Extension to content type table. Lookup is exact and case-sensitive.
const MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("ico", "image/x-icon"),
    ("txt", "text/plain"),
];

/// Returns the text after the last `.` of the final path segment.
///
/// ```
/// # use portal::http::mime::extension_of;
/// assert_eq!(extension_of("/css/site.min.css"), Some("css"));
/// assert_eq!(extension_of("/v1.2/readme"), None);
/// ```
pub fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.').map(|dot| &name[dot + 1..])
}

/// Resolves the content type for `path`, falling back to
/// [`DEFAULT_MIME_TYPE`].
pub fn mime_for(path: &str) -> &'static str {
    let Some(ext) = extension_of(path) else {
        return DEFAULT_MIME_TYPE;
    };

    match MIME_TYPES.iter().find(|(e, _)| *e == ext) {
        Some((_, mime)) => mime,
        None => {
            tracing::info!(extension = ext, "Unknown MIME type for extension");
            DEFAULT_MIME_TYPE
        }
    }
}
