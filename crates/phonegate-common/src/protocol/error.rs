use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("no healthy workers available")]
    NoHealthyWorkers,

    #[error("phone not ready (worker {worker} for {session} is unreachable); unregister and register again")]
    StaleBinding { session: String, worker: String },

    #[error("Dispatch to {worker} failed: {reason}")]
    Dispatch { worker: String, reason: String },

    #[error("Worker error: {0}")]
    Remote(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Whether the error came from resolving a session to a worker, as opposed
    /// to talking to the worker once resolved.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            GatewayError::Registry(_)
                | GatewayError::NoHealthyWorkers
                | GatewayError::StaleBinding { .. }
        )
    }

    /// Wraps any failure that happened while invoking `worker`.
    pub fn dispatch(worker: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        GatewayError::Dispatch {
            worker: worker.into(),
            reason: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
