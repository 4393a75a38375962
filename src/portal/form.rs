//! Per-connection WiFi credential form state.
//!
//! A [`FormSubmission`] lives for exactly one `POST /save`: it is created when
//! the request head arrives ([`FormSubmission::begin`]), fed every body chunk
//! ([`FormSubmission::on_chunk`]) and consumed when the body ends
//! ([`FormSubmission::on_complete`]). Dropping it earlier is abandonment: the
//! captured fields are discarded and nothing is persisted.

use std::borrow::Cow;
use std::fmt;

use crate::portal::decoder::{FieldDecoder, FieldSink, FormError};

pub const SSID_FIELD: &str = "ssid";
pub const PASSWORD_FIELD: &str = "password";

/// Longest value kept for either field, in bytes.
pub const MAX_FIELD_LEN: usize = 256;

/// The two captured fields. A field is `None` until the body mentions it.
#[derive(Debug, Default)]
pub struct FormFields {
    pub ssid: Option<Vec<u8>>,
    pub password: Option<Vec<u8>>,
}

impl FieldSink for FormFields {
    fn field_chunk(&mut self, key: &str, data: &[u8], offset: u64) {
        let slot = match key {
            SSID_FIELD => &mut self.ssid,
            PASSWORD_FIELD => &mut self.password,
            _ => return,
        };

        // offset 0 is a new occurrence of the key and replaces the old value
        if offset == 0 {
            *slot = None;
        }
        let value = slot.get_or_insert_with(Vec::new);

        let room = MAX_FIELD_LEN.saturating_sub(value.len());
        if data.len() > room {
            tracing::warn!(
                field = key,
                limit = MAX_FIELD_LEN,
                "Form field too long, truncating"
            );
        }
        value.extend_from_slice(&data[..data.len().min(room)]);
    }
}

/// A finalized `(ssid, password)` pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: Vec<u8>,
    pub password: Vec<u8>,
}

impl Credentials {
    pub fn new(ssid: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// SSID for log output.
    pub fn ssid_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.ssid)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid_lossy())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How a submission ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    Complete(Credentials),
    /// Names the field(s) the body never supplied.
    Incomplete { missing: &'static str },
}

#[derive(Debug)]
pub struct FormSubmission {
    decoder: FieldDecoder,
    fields: FormFields,
    finished: bool,
}

impl FormSubmission {
    /// Sets up form state for a request with the given `Content-Type`.
    pub fn begin(content_type: Option<&str>) -> Result<Self, FormError> {
        let decoder = FieldDecoder::for_content_type(content_type)?;
        Ok(Self {
            decoder,
            fields: FormFields::default(),
            finished: false,
        })
    }

    /// Feeds one piece of request body.
    pub fn on_chunk(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.decoder.feed(data, &mut self.fields);
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    /// Ends the body and releases the decoder, yielding the credentials if
    /// both fields arrived.
    pub fn on_complete(mut self) -> Completion {
        self.decoder.finish(&mut self.fields);
        self.finished = true;

        let fields = std::mem::take(&mut self.fields);
        match (fields.ssid, fields.password) {
            (Some(ssid), Some(password)) => Completion::Complete(Credentials { ssid, password }),
            (None, Some(_)) => Completion::Incomplete { missing: SSID_FIELD },
            (Some(_), None) => Completion::Incomplete { missing: PASSWORD_FIELD },
            (None, None) => Completion::Incomplete { missing: "ssid and password" },
        }
    }
}

impl Drop for FormSubmission {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("Form submission abandoned before the body completed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_key_replaces_value() {
        let mut fields = FormFields::default();
        fields.field_chunk(SSID_FIELD, b"first", 0);
        fields.field_chunk(SSID_FIELD, b"second", 0);
        assert_eq!(fields.ssid.as_deref(), Some(&b"second"[..]));
    }

    #[test]
    fn later_offsets_append() {
        let mut fields = FormFields::default();
        fields.field_chunk(PASSWORD_FIELD, b"abc", 0);
        fields.field_chunk(PASSWORD_FIELD, b"def", 3);
        assert_eq!(fields.password.as_deref(), Some(&b"abcdef"[..]));
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials::new("MyNet", "secret123");
        let shown = format!("{creds:?}");
        assert!(shown.contains("MyNet"));
        assert!(!shown.contains("secret123"));
    }
}
