//! mailgram library entrypoint.
//!
//! Modules:
//! - `app`: startup, configuration, shared state
//! - `http`: Axum router, status route, email webhook
//! - `mail`: MIME decoding of raw inbound email
//! - `render`: HTML sanitation and message rendering
//! - `chunk`: platform-size-bounded message splitting
//! - `deliver`: ordered dispatch of parts and attachments
//! - `transport`: chat transport trait + Telegram implementation
//! - `db`: migrations, alias lookup, delivery log
//! - `models`: typed records used across layers
//! - `error`: pipeline error taxonomy
//! - `util`: tracing setup

pub mod app;
pub mod chunk;
pub mod db;
pub mod deliver;
pub mod error;
pub mod http;
pub mod mail;
pub mod models;
pub mod render;
pub mod transport;
pub mod util;
