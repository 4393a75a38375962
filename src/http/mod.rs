//! HTTP protocol implementation.
//!
//! This module implements the small HTTP/1.1 engine that hosts the portal,
//! with support for keep-alive connections and streamed request bodies.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection request-response state machine
//! - **`parser`**: Parses request heads from byte buffers
//! - **`body`**: Streams `Content-Length` and chunked request bodies
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes responses, streaming file bodies
//! - **`path`**: Request path canonicalisation against traversal
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a request head
//!        └──────┬──────┘
//!               │ Head received
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route the request
//!        └──────┬───────────┘
//!               │ POST /save            │ anything else
//!               ▼                       │
//!        ┌──────────────────┐           │
//!        │   Receiving      │ ← Feed body chunks to the form
//!        └──────┬───────────┘           │
//!               │ Body complete         │
//!               ▼                       ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod body;
pub mod connection;
pub mod mime;
pub mod parser;
pub mod path;
pub mod request;
pub mod response;
pub mod writer;
