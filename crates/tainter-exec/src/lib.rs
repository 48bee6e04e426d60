mod proc;
pub use proc::{ProcConfig, ProcessRunner};

mod util;
