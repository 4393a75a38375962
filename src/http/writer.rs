use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{Body, Response};

const HTTP_VERSION: &str = "HTTP/1.1";

fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes one response to a stream: the head and any buffered body in one
/// pass, then a file body (if any) copied straight from disk.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
    file: Option<(tokio::fs::File, u64)>,
}

impl ResponseWriter {
    pub fn new(response: Response) -> Self {
        let mut buffer = serialize_head(&response);
        let file = match response.body {
            Body::Full(bytes) => {
                buffer.extend_from_slice(&bytes);
                None
            }
            Body::File { file, len } => Some((file, len)),
        };

        Self {
            buffer,
            written: 0,
            file,
        }
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream
                .write(&self.buffer[self.written..])
                .await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        if let Some((file, len)) = self.file.take() {
            let copied = tokio::io::copy(&mut file.take(len), stream).await?;
            if copied < len {
                // The file shrank after Content-Length went out; the client
                // cannot frame the rest of this connection.
                return Err(anyhow::anyhow!(
                    "file truncated while streaming ({copied} of {len} bytes)"
                ));
            }
        }

        stream.flush().await?;
        Ok(())
    }
}
