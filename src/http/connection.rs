use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::http::body::{BodyEvent, BodyReader};
use crate::http::parser::{parse_request_head, ParseError};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::portal::error::{error_page, ErrorKind};
use crate::portal::form::FormSubmission;
use crate::portal::router::{Route, Router};

const READ_CHUNK: usize = 4096;

pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    router: Arc<Router>,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Receiving(FormSubmission, BodyReader, bool), // bool = keep_alive?
    Writing(ResponseWriter, bool),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, router: Arc<Router>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
            router,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await {
                        Ok(Some(req)) => ConnectionState::Processing(req),
                        Ok(None) => ConnectionState::Closed,
                        Err(e) => {
                            // Malformed request → 400, then hang up
                            tracing::warn!(error = %e, "HTTP parse error");
                            Self::respond(error_page(ErrorKind::BadRequest), false)
                        }
                    };
                }

                ConnectionState::Processing(req) => {
                    let keep_alive = req.keep_alive();
                    let head_only = req.method == Method::HEAD;
                    self.state = match self.router.route(&req).await {
                        Route::Form(submission) => ConnectionState::Receiving(
                            submission,
                            BodyReader::for_request(&req),
                            keep_alive,
                        ),
                        // An unread body would be taken for the next request
                        Route::Respond(response) => {
                            let response = if head_only {
                                response.without_body()
                            } else {
                                response
                            };
                            Self::respond(response, keep_alive && !req.has_body())
                        }
                    };
                }

                ConnectionState::Receiving(mut submission, mut body, keep_alive) => {
                    match self.receive_body(&mut submission, &mut body).await {
                        Ok(true) => {
                            let response = self.router.complete(submission).await;
                            self.state = Self::respond(response, keep_alive);
                        }
                        // Client went away mid-body: submission is dropped unsaved
                        Ok(false) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Malformed request body");
                            drop(submission);
                            self.state = Self::respond(error_page(ErrorKind::BadRequest), false);
                        }
                    }
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    fn respond(mut response: Response, keep_alive: bool) -> ConnectionState {
        if !keep_alive {
            response
                .headers
                .insert("Connection".to_string(), "close".to_string());
        }
        ConnectionState::Writing(ResponseWriter::new(response), keep_alive)
    }

    pub async fn read_request(&mut self) -> Result<Option<Request>, ParseError> {
        loop {
            // Try parsing whatever we already have
            match parse_request_head(&self.buffer) {
                Ok((request, consumed)) => {
                    // Remove consumed bytes
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => return Err(e),
            }

            // Read more data
            if !self.fill_buffer().await {
                // Client closed connection
                return Ok(None);
            }
        }
    }

    /// Feeds the request body into `submission`. Returns `Ok(false)` if the
    /// client disconnected before the body was complete.
    async fn receive_body(
        &mut self,
        submission: &mut FormSubmission,
        body: &mut BodyReader,
    ) -> Result<bool, ParseError> {
        loop {
            match body.next_chunk(&mut self.buffer)? {
                BodyEvent::Data(chunk) => submission.on_chunk(&chunk),
                BodyEvent::Done => return Ok(true),
                BodyEvent::NeedMore => {
                    if !self.fill_buffer().await {
                        tracing::info!("Client disconnected during form upload");
                        return Ok(false);
                    }
                }
            }
        }
    }

    /// Reads once from the stream into the buffer. Returns `false` on EOF or
    /// a read error.
    async fn fill_buffer(&mut self) -> bool {
        let mut temp = [0u8; READ_CHUNK];
        match self.stream.read(&mut temp).await {
            Ok(0) => false,
            Ok(n) => {
                self.buffer.extend_from_slice(&temp[..n]);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Read failed");
                false
            }
        }
    }
}
