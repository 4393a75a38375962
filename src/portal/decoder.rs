//! Streaming form-field decoders.
//!
//! A [`FieldDecoder`] is fed raw body bytes in whatever pieces the connection
//! happens to read and reports field content to a [`FieldSink`] as
//! `(key, data, offset)` chunks. Chunks of one field arrive in order with
//! increasing offsets; a field that fits the decode buffer arrives as a
//! single chunk at offset 0.
//!
//! Decoders never fail on malformed input. They simply report fewer fields.

use bytes::{Buf, BytesMut};

/// Decoded bytes held before a partial value is handed to the sink.
pub const DECODE_BUFFER: usize = 1024;

/// Keys longer than this are skipped along with their values.
pub const MAX_KEY_LEN: usize = 64;

/// Largest multipart part-header block accepted.
const MAX_PART_HEADERS: usize = 8 * 1024;

/// Receives decoded field content.
pub trait FieldSink {
    fn field_chunk(&mut self, key: &str, data: &[u8], offset: u64);
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unsupported form encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("multipart body without a boundary")]
    MissingBoundary,
}

#[derive(Debug)]
pub enum FieldDecoder {
    UrlEncoded(UrlEncodedDecoder),
    Multipart(MultipartDecoder),
}

impl FieldDecoder {
    /// Picks a decoder from the request's `Content-Type`. A missing header is
    /// treated as urlencoded.
    pub fn for_content_type(content_type: Option<&str>) -> Result<Self, FormError> {
        let Some(content_type) = content_type else {
            return Ok(FieldDecoder::UrlEncoded(UrlEncodedDecoder::default()));
        };

        let mut params = content_type.split(';');
        let media_type = params.next().unwrap_or_default().trim();

        if media_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            Ok(FieldDecoder::UrlEncoded(UrlEncodedDecoder::default()))
        } else if media_type.eq_ignore_ascii_case("multipart/form-data") {
            let boundary = params
                .filter_map(|p| p.split_once('='))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
                .map(|(_, v)| v.trim().trim_matches('"'))
                .filter(|b| !b.is_empty())
                .ok_or(FormError::MissingBoundary)?;
            Ok(FieldDecoder::Multipart(MultipartDecoder::new(boundary)))
        } else {
            Err(FormError::UnsupportedEncoding(media_type.to_string()))
        }
    }

    pub fn feed<S: FieldSink>(&mut self, data: &[u8], sink: &mut S) {
        match self {
            FieldDecoder::UrlEncoded(d) => d.feed(data, sink),
            FieldDecoder::Multipart(d) => d.feed(data, sink),
        }
    }

    /// Flushes whatever the body ended on.
    pub fn finish<S: FieldSink>(&mut self, sink: &mut S) {
        match self {
            FieldDecoder::UrlEncoded(d) => d.finish(sink),
            FieldDecoder::Multipart(d) => d.finish(),
        }
    }
}

/// `application/x-www-form-urlencoded` bodies: `k=v&k2=v2`.
#[derive(Debug, Default)]
pub struct UrlEncodedDecoder {
    key: Vec<u8>,
    key_too_long: bool,
    in_value: bool,
    value: Vec<u8>,
    offset: u64,
}

impl UrlEncodedDecoder {
    pub fn feed<S: FieldSink>(&mut self, data: &[u8], sink: &mut S) {
        for &b in data {
            if self.in_value {
                if b == b'&' {
                    self.flush(sink, true);
                    self.reset();
                } else {
                    self.value.push(b);
                    if self.value.len() >= DECODE_BUFFER {
                        self.flush(sink, false);
                    }
                }
                continue;
            }

            match b {
                b'=' => self.in_value = true,
                b'&' => {
                    self.flush(sink, true);
                    self.reset();
                }
                _ if self.key.len() < MAX_KEY_LEN => self.key.push(b),
                _ => self.key_too_long = true,
            }
        }
    }

    pub fn finish<S: FieldSink>(&mut self, sink: &mut S) {
        self.flush(sink, true);
        self.reset();
    }

    fn reset(&mut self) {
        self.key.clear();
        self.key_too_long = false;
        self.in_value = false;
        self.value.clear();
        self.offset = 0;
    }

    /// Decodes and hands on the pending value bytes. A partial flush holds
    /// back an escape sequence cut off by the buffer edge.
    fn flush<S: FieldSink>(&mut self, sink: &mut S, last: bool) {
        if self.key.is_empty() && !self.in_value {
            return;
        }

        let keep = if last { 0 } else { split_escape_len(&self.value) };
        let raw: Vec<u8> = self.value.drain(..self.value.len() - keep).collect();
        let decoded = decode_component(&raw);

        if !self.key_too_long && (!decoded.is_empty() || (last && self.offset == 0)) {
            let key = decode_component(&self.key);
            sink.field_chunk(&String::from_utf8_lossy(&key), &decoded, self.offset);
        }
        self.offset += decoded.len() as u64;
    }
}

/// Number of trailing bytes that belong to an unfinished `%XX` escape.
fn split_escape_len(raw: &[u8]) -> usize {
    match raw {
        [.., b'%'] => 1,
        [.., b'%', _] => 2,
        _ => 0,
    }
}

fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    urlencoding::decode_binary(&spaced).into_owned()
}

#[derive(Debug)]
enum PartState {
    Preamble,
    Boundary,
    Headers,
    Body { name: Option<String>, offset: u64 },
    Epilogue,
}

/// `multipart/form-data` bodies.
#[derive(Debug)]
pub struct MultipartDecoder {
    /// `\r\n--<boundary>`
    delimiter: Vec<u8>,
    buf: BytesMut,
    state: PartState,
}

impl MultipartDecoder {
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = b"\r\n--".to_vec();
        delimiter.extend_from_slice(boundary.as_bytes());

        // A body normally opens with the delimiter minus its CRLF
        let mut buf = BytesMut::with_capacity(DECODE_BUFFER);
        buf.extend_from_slice(b"\r\n");

        Self {
            delimiter,
            buf,
            state: PartState::Preamble,
        }
    }

    pub fn feed<S: FieldSink>(&mut self, data: &[u8], sink: &mut S) {
        if matches!(self.state, PartState::Epilogue) {
            return;
        }
        self.buf.extend_from_slice(data);

        let Self { delimiter, buf, state } = self;
        let hold = delimiter.len() - 1;

        loop {
            match state {
                PartState::Preamble => match find(&buf[..], &delimiter[..]) {
                    Some(pos) => {
                        buf.advance(pos + delimiter.len());
                        *state = PartState::Boundary;
                    }
                    None => {
                        let skip = buf.len().saturating_sub(hold);
                        buf.advance(skip);
                        return;
                    }
                },

                PartState::Boundary => {
                    if buf.len() < 2 {
                        return;
                    }
                    if buf.starts_with(b"--") {
                        *state = PartState::Epilogue;
                        buf.clear();
                        return;
                    }
                    // transport padding may sit between boundary and CRLF
                    match find(&buf[..], b"\r\n") {
                        Some(pos) => {
                            buf.advance(pos + 2);
                            *state = PartState::Headers;
                        }
                        None if buf.len() > MAX_PART_HEADERS => {
                            *state = PartState::Epilogue;
                            buf.clear();
                            return;
                        }
                        None => return,
                    }
                }

                PartState::Headers => {
                    if buf.len() < 2 {
                        return;
                    }
                    if buf.starts_with(b"\r\n") {
                        buf.advance(2);
                        *state = PartState::Body { name: None, offset: 0 };
                        continue;
                    }
                    match find(&buf[..], b"\r\n\r\n") {
                        Some(pos) => {
                            let name = part_name(&buf[..pos]);
                            buf.advance(pos + 4);
                            *state = PartState::Body { name, offset: 0 };
                        }
                        None if buf.len() > MAX_PART_HEADERS => {
                            *state = PartState::Epilogue;
                            buf.clear();
                            return;
                        }
                        None => return,
                    }
                }

                PartState::Body { name, offset } => match find(&buf[..], &delimiter[..]) {
                    Some(pos) => {
                        if let Some(name) = name.as_deref() {
                            if pos > 0 || *offset == 0 {
                                sink.field_chunk(name, &buf[..pos], *offset);
                            }
                        }
                        buf.advance(pos + delimiter.len());
                        *state = PartState::Boundary;
                    }
                    None => {
                        let safe = buf.len().saturating_sub(hold);
                        if safe == 0 {
                            return;
                        }
                        if let Some(name) = name.as_deref() {
                            sink.field_chunk(name, &buf[..safe], *offset);
                        }
                        *offset += safe as u64;
                        buf.advance(safe);
                        return;
                    }
                },

                PartState::Epilogue => {
                    buf.clear();
                    return;
                }
            }
        }
    }

    /// A part cut off by the end of the body is dropped.
    pub fn finish(&mut self) {
        self.buf.clear();
        self.state = PartState::Epilogue;
    }
}

/// Extracts `name` from a part's `Content-Disposition: form-data` header.
fn part_name(headers: &[u8]) -> Option<String> {
    let headers = String::from_utf8_lossy(headers);
    headers
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-disposition"))
        .and_then(|(_, v)| {
            v.split(';')
                .filter_map(|p| p.trim().strip_prefix("name="))
                .map(|n| n.trim_matches('"').to_string())
                .next()
        })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
}
