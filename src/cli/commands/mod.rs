//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod depseudonymize;
pub mod init;
pub mod pseudonymize;
pub mod status;
pub mod validate;
