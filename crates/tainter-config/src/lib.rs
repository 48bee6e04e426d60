//! YAML policy files.
//!
//! One policy per file:
//!
//! ```yaml
//! name: disk-pressure            # defaults to the file stem
//! scriptPath:
//!   - /etc/node-tainter/checks/disk.sh
//! maxAffectedNodeCount: 2        # defaults to 1
//! targetNodeLabels:
//!   node-role.kubernetes.io/worker: ""
//! taints:
//!   - key: node.example.com/disk
//!     value: full
//!     effect: NoSchedule
//!   - node.example.com/degraded=:PreferNoSchedule
//! labels:
//!   node.example.com/disk-ok: "false"
//! ```

mod error;
pub use error::ConfigError;

mod policy;
pub use policy::{load_policies, load_policy, parse_policy};
