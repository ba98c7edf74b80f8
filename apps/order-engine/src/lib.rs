// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::items_after_statements
    )
)]

//! Order Engine - Conditional Order Core
//!
//! Lifecycle engine for multi-leg, trigger-driven orders: bracket and cover
//! orders, spreads, good-till-triggered (single and OCO) orders, trailing
//! stops and icebergs.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `order_group`: OrderGroup aggregate, leg state machine, cascade policy
//!   - `triggers`: Trigger conditions and the per-instrument trigger book
//!   - `iceberg`: Slicing plans
//!   - `admission`: Pre-admission rules
//!
//! - **Application**: Orchestration
//!   - `ports`: Execution adapter, market data, event publisher
//!   - `services`: Leg order coordinator, trigger evaluator, background loops
//!   - `dto`: Snapshots and history returned to callers
//!
//! - **Infrastructure**: Adapters
//!   - `execution`: Paper execution adapter
//!   - `market_data`: Settable price source
//!   - `persistence`: In-memory order store
//!   - `publisher`: Broadcast event fan-out
//!
//! - **Config** / **Observability**: YAML configuration, tracing and
//!   Prometheus metrics

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Coordinator, services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters for the application ports.
pub mod infrastructure;

/// Configuration loading and validation.
pub mod config;

/// Logging and metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::errors::{EngineError, ErrorKind};
pub use application::services::{LegOrderCoordinator, RecoveryReport, TriggerEvaluator};
pub use domain::order_group::{
    CreateGroupCommand, ExecutionReport, GroupKind, GroupParams, GroupStatus, LegRole, LegStatus,
    OrderGroup,
};
pub use domain::triggers::{Tick, TriggerOperator};
