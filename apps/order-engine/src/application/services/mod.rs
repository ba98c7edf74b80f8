//! Application Services
//!
//! The coordinator owns order group state; the background services feed it
//! execution reports, market ticks and the clock.

pub mod adapter_retry;
pub mod coordinator;
pub mod execution_listener;
pub mod expiry_sweeper;
pub mod group_registry;
pub mod tick_pump;
pub mod trigger_evaluator;

pub use adapter_retry::{AdapterRetryPolicy, with_retry};
pub use coordinator::{LegOrderCoordinator, RecoveryReport};
pub use execution_listener::ExecutionListener;
pub use expiry_sweeper::ExpirySweeper;
pub use group_registry::{GroupHandle, GroupRegistry};
pub use tick_pump::TickPump;
pub use trigger_evaluator::TriggerEvaluator;
