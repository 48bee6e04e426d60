mod taint;
pub use taint::{Taint, TaintEffect};

mod node;
pub use node::{Labels, NodeState};

mod policy;
pub use policy::{DEFAULT_MAX_AFFECTED_NODE_COUNT, Policy};

mod outcome;
pub use outcome::{PolicyReport, PolicyStatus, ReconciliationOutcome};
