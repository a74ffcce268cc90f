//! phonegate Common Types and Transport
//!
//! This crate provides the shared protocol definitions and HTTP transport
//! helpers used by every phonegate component.
//!
//! # Overview
//!
//! phonegate is an API gateway in front of a pool of stateful softphone
//! workers. Each worker owns the live SIP registrations and calls for a subset
//! of identities, so the gateway pins every identity to one worker and forwards
//! the identity's operations there. This crate contains:
//!
//! - **Protocol Layer**: the worker RPC surface ([`WorkerCall`], [`WorkerReply`]),
//!   JSON-RPC 2.0 envelopes and the [`GatewayError`] taxonomy
//! - **Transport Layer**: one-shot HTTP GET/POST helpers with timeouts and
//!   worker address normalization
//!
//! # Example
//!
//! ```
//! use phonegate_common::{WorkerCall, CallActionRequest};
//!
//! let call = WorkerCall::Hold(CallActionRequest::new("call-42"));
//! assert_eq!(call.method(), "hold_call");
//! assert_eq!(call.routing_key(), "call-42");
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
