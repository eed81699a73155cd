//! Core error types for sysmodel-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! all anticipated failure modes in the system model.

use crate::id::{ConnectionId, ContractId, EdgeId, ElementId, PortId, RegionId, StateId, SystemId};
use thiserror::Error;

/// Core errors produced by the sysmodel-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A system ID was not found in the model.
    #[error("system not found: SystemId({id})", id = id.0)]
    SystemNotFound { id: SystemId },

    /// A port ID was not found in the model.
    #[error("port not found: PortId({id})", id = id.0)]
    PortNotFound { id: PortId },

    /// A connection ID was not found in the model.
    #[error("connection not found: ConnectionId({id})", id = id.0)]
    ConnectionNotFound { id: ConnectionId },

    /// A state ID was not found in the model.
    #[error("state not found: StateId({id})", id = id.0)]
    StateNotFound { id: StateId },

    /// An edge ID was not found in the model.
    #[error("edge not found: EdgeId({id})", id = id.0)]
    EdgeNotFound { id: EdgeId },

    /// A region ID was not found in the model.
    #[error("region not found: RegionId({id})", id = id.0)]
    RegionNotFound { id: RegionId },

    /// A contract ID was not found in the model.
    #[error("contract not found: ContractId({id})", id = id.0)]
    ContractNotFound { id: ContractId },

    /// An element cannot be removed while other elements still refer to it.
    #[error("{element} is still referenced by {count} element(s)")]
    StillReferenced { element: ElementId, count: usize },

    /// An element with this ID is already present in the model.
    #[error("{element} is already present")]
    AlreadyPresent { element: ElementId },

    /// The root system can never be removed.
    #[error("the root system cannot be removed")]
    RootRemoval,

    /// Names must not be empty.
    #[error("name must not be empty")]
    EmptyName,

    /// Another element of the model already uses this name.
    #[error("name already in use: {name}")]
    DuplicateName { name: String },

    /// A property value is not acceptable for its element.
    #[error("invalid property: {reason}")]
    InvalidProperty { reason: String },

    /// A connection failed validation.
    #[error("invalid connection: {reason}")]
    InvalidConnection { reason: String },

    /// An edge failed validation.
    #[error("invalid edge: {reason}")]
    InvalidEdge { reason: String },

    /// The system containment hierarchy contains a cycle.
    #[error("system containment cycle through SystemId({id})", id = id.0)]
    ContainmentCycle { id: SystemId },

    /// A model invariant was violated.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}
