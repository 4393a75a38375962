//! Portal - WiFi setup captive portal
//!
//! Serves a splash page to every client on the setup access point, accepts
//! one WiFi credential submission, writes it out and shuts down.

pub mod config;
pub mod http;
pub mod portal;
pub mod server;
