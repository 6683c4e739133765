//! Built-in functions

mod copy;
mod exec;

pub use copy::{CopyConfig, CopyFunction};
pub use exec::{ExecConfig, ExecFunction, SourceSpec};
