//! phonegate Transport Layer
//!
//! The gateway talks to three kinds of peers, all over plain HTTP/1.1:
//!
//! - the worker registry (`GET /workers/healthy`)
//! - worker health endpoints (`GET /healthcheck`)
//! - worker JSON-RPC endpoints (`POST /`)
//!
//! Every exchange opens its own connection and is bounded by a timeout. See
//! [`HttpTransport`].

pub mod http;

pub use http::{HttpReply, HttpTransport};
