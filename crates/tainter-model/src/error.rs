use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid taint '{0}' (expected key=value:Effect)")]
    InvalidTaint(String),
    #[error("unknown taint effect: {0} (expected NoSchedule|PreferNoSchedule|NoExecute)")]
    UnknownEffect(String),
    #[error("invalid policy '{policy}': {reason}")]
    InvalidPolicy { policy: String, reason: String },
}
