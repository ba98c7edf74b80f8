//! Execution Adapters
//!
//! Implementations of the `ExecutionAdapter` port.

pub mod paper;

pub use paper::{PaperExecutionAdapter, PaperOrder, PaperOrderState};
