//! Pseudonymization protocol
//!
//! - [`broker`] - Token acquisition
//! - [`engine`] - Identity submission and outcome interpretation
//! - [`resolver`] - One resubmission pass for failed records

pub mod broker;
pub mod engine;
pub mod resolver;

pub use broker::TokenBroker;
pub use engine::{interpret_reply, PseudonymizationEngine, RedemptionReport, TokenAssignment};
pub use resolver::{ConflictResolver, ResolutionOutcome};
