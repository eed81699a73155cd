//! Error types for command execution.
//!
//! A declined precondition is not an error: commands report it by returning
//! `Ok(false)`. [`EditError`] covers hard failures only, discovered after a
//! command may already have mutated the model.

use sysmodel_core::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The model rejected a mutation that had passed its precondition check.
    #[error("model error: {0}")]
    Model(#[from] CoreError),

    /// A command left the model in a state that breaks a domain rule.
    #[error("domain violation: {reason}")]
    DomainViolation { reason: String },

    /// The inverse of a command was requested before the command ran.
    #[error("command has not been run")]
    NotRun,
}
