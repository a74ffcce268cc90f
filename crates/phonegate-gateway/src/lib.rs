//! phonegate Gateway
//!
//! Session-affinity routing in front of a pool of stateful softphone workers.
//!
//! - [`BindingDirectory`]: pins each session (SIP identity or call id) to one
//!   worker and balances new sessions by active-binding count
//! - [`RegistrySource`] / [`HealthSource`]: where candidate workers and health
//!   verdicts come from
//! - [`Dispatcher`]: carries one operation to one worker
//! - [`Gateway`]: select, then dispatch, for every action
//! - [`HttpServer`]: the `/phones/...` HTTP surface

pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod gateway;
pub mod health;
pub mod http_router;
pub mod http_server;
pub mod registry;

pub use config::{GatewayConfig, HealthCacheConfig};
pub use directory::BindingDirectory;
pub use dispatcher::{Dispatcher, HttpDispatcher, InMemoryDispatcher};
pub use gateway::{CallAction, Gateway};
pub use health::{CachedHealth, HealthSource, HttpHealthProber, ScriptedHealth};
pub use http_server::HttpServer;
pub use registry::{HttpRegistryClient, RegistrySource, StaticRegistry};
