//! Outbound notifications for newly marked nodes.

mod slack;
pub use slack::{DRY_RUN_USERNAME, SlackNotifier, USERNAME};
