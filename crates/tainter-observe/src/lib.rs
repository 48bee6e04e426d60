//! Logging bootstrap for the node tainter.
//!
//! Library crates only emit `tracing` events; the binary installs one subscriber through [`logger_init`].

mod logger;
pub use logger::*;
