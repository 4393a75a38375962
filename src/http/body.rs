//! Incremental request body framing.
//!
//! A [`BodyReader`] pulls body bytes out of the connection buffer as they
//! arrive and hands them on one chunk at a time. Nothing here buffers a whole
//! body; the caller decides what to keep.

use bytes::{Buf, Bytes, BytesMut};

use crate::http::parser::ParseError;
use crate::http::request::Request;

/// Longest chunk-size or trailer line accepted in a chunked body.
const MAX_LINE_LEN: usize = 1024;

#[derive(Debug)]
pub enum BodyEvent {
    /// Body bytes, in order.
    Data(Bytes),
    /// The buffer is exhausted; read more from the stream.
    NeedMore,
    /// The body is complete.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Size,
    Data { remaining: u64 },
    DataEnd,
    Trailers,
}

#[derive(Debug)]
pub enum BodyReader {
    Length { remaining: u64 },
    Chunked(ChunkState),
    Finished,
}

impl BodyReader {
    /// Chooses the framing announced by the request head.
    pub fn for_request(request: &Request) -> Self {
        if request.is_chunked() {
            BodyReader::Chunked(ChunkState::Size)
        } else {
            match request.content_length() {
                0 => BodyReader::Finished,
                n => BodyReader::Length { remaining: n },
            }
        }
    }

    /// Takes the next piece of body out of `buf`.
    pub fn next_chunk(&mut self, buf: &mut BytesMut) -> Result<BodyEvent, ParseError> {
        loop {
            match self {
                BodyReader::Finished => return Ok(BodyEvent::Done),

                BodyReader::Length { remaining } => {
                    if buf.is_empty() {
                        return Ok(BodyEvent::NeedMore);
                    }
                    let n = take_len(*remaining, buf.len());
                    *remaining -= n as u64;
                    let data = buf.split_to(n).freeze();
                    if *remaining == 0 {
                        *self = BodyReader::Finished;
                    }
                    return Ok(BodyEvent::Data(data));
                }

                BodyReader::Chunked(state) => match *state {
                    ChunkState::Size => {
                        let Some(line) = take_line(buf)? else {
                            return Ok(BodyEvent::NeedMore);
                        };
                        let size = parse_chunk_size(&line)?;
                        *state = if size == 0 {
                            ChunkState::Trailers
                        } else {
                            ChunkState::Data { remaining: size }
                        };
                    }
                    ChunkState::Data { remaining } => {
                        if buf.is_empty() {
                            return Ok(BodyEvent::NeedMore);
                        }
                        let n = take_len(remaining, buf.len());
                        let left = remaining - n as u64;
                        *state = if left == 0 {
                            ChunkState::DataEnd
                        } else {
                            ChunkState::Data { remaining: left }
                        };
                        return Ok(BodyEvent::Data(buf.split_to(n).freeze()));
                    }
                    ChunkState::DataEnd => {
                        if buf.len() < 2 {
                            return Ok(BodyEvent::NeedMore);
                        }
                        if &buf[..2] != b"\r\n" {
                            return Err(ParseError::InvalidChunk);
                        }
                        buf.advance(2);
                        *state = ChunkState::Size;
                    }
                    ChunkState::Trailers => {
                        let Some(line) = take_line(buf)? else {
                            return Ok(BodyEvent::NeedMore);
                        };
                        if line.is_empty() {
                            *self = BodyReader::Finished;
                        }
                    }
                },
            }
        }
    }
}

fn take_len(remaining: u64, available: usize) -> usize {
    usize::try_from(remaining).map_or(available, |r| r.min(available))
}

/// Removes one CRLF-terminated line from `buf`, without the terminator.
fn take_line(buf: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
    match buf.windows(2).position(|w| w == b"\r\n") {
        Some(pos) if pos > MAX_LINE_LEN => Err(ParseError::InvalidChunk),
        Some(pos) => {
            let line = buf.split_to(pos);
            buf.advance(2);
            Ok(Some(line))
        }
        None if buf.len() > MAX_LINE_LEN => Err(ParseError::InvalidChunk),
        None => Ok(None),
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidChunk)?;
    // chunk extensions are ignored
    let size = line.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(size, 16).map_err(|_| ParseError::InvalidChunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(reader: &mut BodyReader, buf: &mut BytesMut) -> (Vec<u8>, bool) {
        let mut out = Vec::new();
        loop {
            match reader.next_chunk(buf).unwrap() {
                BodyEvent::Data(d) => out.extend_from_slice(&d),
                BodyEvent::NeedMore => return (out, false),
                BodyEvent::Done => return (out, true),
            }
        }
    }

    #[test]
    fn length_body_stops_at_content_length() {
        let mut reader = BodyReader::Length { remaining: 5 };
        let mut buf = BytesMut::from(&b"helloGET /"[..]);
        let (body, done) = drain(&mut reader, &mut buf);
        assert_eq!(body, b"hello");
        assert!(done);
        assert_eq!(&buf[..], b"GET /");
    }

    #[test]
    fn chunked_body_across_reads() {
        let mut reader = BodyReader::Chunked(ChunkState::Size);
        let mut buf = BytesMut::from(&b"4\r\nss"[..]);
        let (first, done) = drain(&mut reader, &mut buf);
        assert_eq!(first, b"ss");
        assert!(!done);

        buf.extend_from_slice(b"id\r\n3;ext=1\r\n=ab\r\n0\r\nX-Trailer: 1\r\n\r\n");
        let (rest, done) = drain(&mut reader, &mut buf);
        assert_eq!(rest, b"id=ab");
        assert!(done);
        assert!(buf.is_empty());
    }

    #[test]
    fn chunked_body_rejects_bad_size() {
        let mut reader = BodyReader::Chunked(ChunkState::Size);
        let mut buf = BytesMut::from(&b"zz\r\n"[..]);
        assert_eq!(reader.next_chunk(&mut buf).unwrap_err(), ParseError::InvalidChunk);
    }
}
