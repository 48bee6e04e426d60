use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format '{0}' (expected text|json|journald)")]
    InvalidFormat(String),
    #[error("journald output requires Linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
    #[error("failed to install tracing subscriber: {0}")]
    InitializationFailed(String),
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidLogLevel { filter: String, reason: String },
}
