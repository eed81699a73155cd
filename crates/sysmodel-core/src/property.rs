//! Field-level property changes.
//!
//! A [`PropertyChange`] names one field of one element and the value to put
//! there. [`SystemModel::apply_property`] writes the value and hands back the
//! change that restores the previous one, so a property edit is its own
//! inverse shape.

use serde::{Deserialize, Serialize};

use crate::element::{EdgeDef, PortDef, SystemDef};
use crate::error::CoreError;
use crate::id::{ContractId, EdgeId, PortId, RegionId, StateId, SystemId};
use crate::model::SystemModel;
use crate::types::{Condition, EdgeKind, Visibility};

/// An element that carries a user-visible name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTarget {
    System(SystemId),
    Port(PortId),
    State(StateId),
    Region(RegionId),
    Contract(ContractId),
}

/// A condition slot on a region or contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionTarget {
    RegionInvariant(RegionId),
    RegionPrecondition(RegionId),
    RegionPostcondition(RegionId),
    ContractPrecondition(ContractId),
    ContractPostcondition(ContractId),
}

/// One field assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "property", rename_all = "snake_case")]
pub enum PropertyChange {
    Name { target: NameTarget, name: String },
    Condition { target: ConditionTarget, condition: Condition },
    SystemCode { system: SystemId, code: String },
    StartState { system: SystemId, state: Option<StateId> },
    PortVisibility { port: PortId, visibility: Visibility },
    PortType { port: PortId, ty: String },
    PortValue { port: PortId, value: Option<String> },
    EdgePriority { edge: EdgeId, priority: i32 },
    EdgeKind { edge: EdgeId, kind: EdgeKind },
    EdgeContract { edge: EdgeId, contract: Option<ContractId> },
}

impl SystemModel {
    /// Reads the current value of the field `change` targets, as a change
    /// that would write that value back.
    pub fn current_property(&self, change: &PropertyChange) -> Result<PropertyChange, CoreError> {
        Ok(match change {
            PropertyChange::Name { target, .. } => PropertyChange::Name {
                target: *target,
                name: self.name_of(*target)?.to_string(),
            },
            PropertyChange::Condition { target, .. } => PropertyChange::Condition {
                target: *target,
                condition: self.condition_of(*target)?.clone(),
            },
            PropertyChange::SystemCode { system, .. } => PropertyChange::SystemCode {
                system: *system,
                code: self.system_ref(*system)?.code.clone(),
            },
            PropertyChange::StartState { system, .. } => PropertyChange::StartState {
                system: *system,
                state: self.system_ref(*system)?.automaton.start_state,
            },
            PropertyChange::PortVisibility { port, .. } => PropertyChange::PortVisibility {
                port: *port,
                visibility: self.port_ref(*port)?.visibility,
            },
            PropertyChange::PortType { port, .. } => PropertyChange::PortType {
                port: *port,
                ty: self.port_ref(*port)?.ty.clone(),
            },
            PropertyChange::PortValue { port, .. } => PropertyChange::PortValue {
                port: *port,
                value: self.port_ref(*port)?.value.clone(),
            },
            PropertyChange::EdgePriority { edge, .. } => PropertyChange::EdgePriority {
                edge: *edge,
                priority: self.edge_ref(*edge)?.priority,
            },
            PropertyChange::EdgeKind { edge, .. } => PropertyChange::EdgeKind {
                edge: *edge,
                kind: self.edge_ref(*edge)?.kind,
            },
            PropertyChange::EdgeContract { edge, .. } => PropertyChange::EdgeContract {
                edge: *edge,
                contract: self.edge_ref(*edge)?.contract,
            },
        })
    }

    /// Validates `change` against the current model without applying it.
    ///
    /// Names must be non-empty and unused anywhere in the model, an edge
    /// contract must belong to the edge's source state, and a start state
    /// must be part of the system's automaton.
    pub fn check_property(&self, change: &PropertyChange) -> Result<(), CoreError> {
        match change {
            PropertyChange::Name { name, .. } => {
                if name.trim().is_empty() {
                    return Err(CoreError::EmptyName);
                }
                if self.is_name_used(name) {
                    return Err(CoreError::DuplicateName { name: name.clone() });
                }
            }
            PropertyChange::StartState { system, state } => {
                let def = self.system_ref(*system)?;
                if let Some(state) = state {
                    if !def.automaton.states.contains(state) {
                        return Err(CoreError::InvalidProperty {
                            reason: format!("state {} is not part of system {}", state, system),
                        });
                    }
                }
            }
            PropertyChange::EdgeContract { edge, contract } => {
                let def = self.edge_ref(*edge)?;
                if let Some(contract) = contract {
                    let source = self
                        .get_state(def.source)
                        .ok_or(CoreError::StateNotFound { id: def.source })?;
                    if !source.contracts.contains(contract) {
                        return Err(CoreError::InvalidProperty {
                            reason: format!(
                                "contract {} does not belong to state {}",
                                contract, def.source
                            ),
                        });
                    }
                }
            }
            other => {
                self.current_property(other)?;
            }
        }
        Ok(())
    }

    /// Applies `change` and returns the change that restores the previous
    /// value, or `None` if the field already held that value.
    pub fn apply_property(
        &mut self,
        change: &PropertyChange,
    ) -> Result<Option<PropertyChange>, CoreError> {
        let previous = self.current_property(change)?;
        if previous == *change {
            return Ok(None);
        }
        self.check_property(change)?;

        match change.clone() {
            PropertyChange::Name { target, name } => self.write_name(target, name)?,
            PropertyChange::Condition { target, condition } => {
                self.write_condition(target, condition)?
            }
            PropertyChange::SystemCode { system, code } => self.system_mut(system)?.code = code,
            PropertyChange::StartState { system, state } => {
                self.system_mut(system)?.automaton.start_state = state
            }
            PropertyChange::PortVisibility { port, visibility } => {
                self.port_mut(port)?.visibility = visibility
            }
            PropertyChange::PortType { port, ty } => self.port_mut(port)?.ty = ty,
            PropertyChange::PortValue { port, value } => self.port_mut(port)?.value = value,
            PropertyChange::EdgePriority { edge, priority } => {
                self.edge_mut(edge)?.priority = priority
            }
            PropertyChange::EdgeKind { edge, kind } => self.edge_mut(edge)?.kind = kind,
            PropertyChange::EdgeContract { edge, contract } => {
                self.edge_mut(edge)?.contract = contract
            }
        }
        Ok(Some(previous))
    }

    // -----------------------------------------------------------------------
    // Field access helpers
    // -----------------------------------------------------------------------

    fn system_ref(&self, id: SystemId) -> Result<&SystemDef, CoreError> {
        self.systems.get(&id).ok_or(CoreError::SystemNotFound { id })
    }

    fn port_ref(&self, id: PortId) -> Result<&PortDef, CoreError> {
        self.ports.get(&id).ok_or(CoreError::PortNotFound { id })
    }

    fn edge_ref(&self, id: EdgeId) -> Result<&EdgeDef, CoreError> {
        self.edges.get(&id).ok_or(CoreError::EdgeNotFound { id })
    }

    fn system_mut(&mut self, id: SystemId) -> Result<&mut SystemDef, CoreError> {
        self.systems.get_mut(&id).ok_or(CoreError::SystemNotFound { id })
    }

    fn port_mut(&mut self, id: PortId) -> Result<&mut PortDef, CoreError> {
        self.ports.get_mut(&id).ok_or(CoreError::PortNotFound { id })
    }

    fn edge_mut(&mut self, id: EdgeId) -> Result<&mut EdgeDef, CoreError> {
        self.edges.get_mut(&id).ok_or(CoreError::EdgeNotFound { id })
    }

    fn name_of(&self, target: NameTarget) -> Result<&str, CoreError> {
        let name = match target {
            NameTarget::System(id) => self.system_ref(id)?.name.as_str(),
            NameTarget::Port(id) => self.port_ref(id)?.name.as_str(),
            NameTarget::State(id) => self
                .states
                .get(&id)
                .ok_or(CoreError::StateNotFound { id })?
                .name
                .as_str(),
            NameTarget::Region(id) => self
                .regions
                .get(&id)
                .ok_or(CoreError::RegionNotFound { id })?
                .name
                .as_str(),
            NameTarget::Contract(id) => self
                .contracts
                .get(&id)
                .ok_or(CoreError::ContractNotFound { id })?
                .name
                .as_str(),
        };
        Ok(name)
    }

    fn write_name(&mut self, target: NameTarget, name: String) -> Result<(), CoreError> {
        match target {
            NameTarget::System(id) => self.system_mut(id)?.name = name,
            NameTarget::Port(id) => self.port_mut(id)?.name = name,
            NameTarget::State(id) => {
                self.states
                    .get_mut(&id)
                    .ok_or(CoreError::StateNotFound { id })?
                    .name = name
            }
            NameTarget::Region(id) => {
                self.regions
                    .get_mut(&id)
                    .ok_or(CoreError::RegionNotFound { id })?
                    .name = name
            }
            NameTarget::Contract(id) => {
                self.contracts
                    .get_mut(&id)
                    .ok_or(CoreError::ContractNotFound { id })?
                    .name = name
            }
        }
        Ok(())
    }

    fn condition_of(&self, target: ConditionTarget) -> Result<&Condition, CoreError> {
        Ok(match target {
            ConditionTarget::RegionInvariant(id)
            | ConditionTarget::RegionPrecondition(id)
            | ConditionTarget::RegionPostcondition(id) => {
                let region = self
                    .regions
                    .get(&id)
                    .ok_or(CoreError::RegionNotFound { id })?;
                match target {
                    ConditionTarget::RegionInvariant(_) => &region.invariant,
                    ConditionTarget::RegionPrecondition(_) => &region.precondition,
                    _ => &region.postcondition,
                }
            }
            ConditionTarget::ContractPrecondition(id) | ConditionTarget::ContractPostcondition(id) => {
                let contract = self
                    .contracts
                    .get(&id)
                    .ok_or(CoreError::ContractNotFound { id })?;
                match target {
                    ConditionTarget::ContractPrecondition(_) => &contract.precondition,
                    _ => &contract.postcondition,
                }
            }
        })
    }

    fn write_condition(
        &mut self,
        target: ConditionTarget,
        condition: Condition,
    ) -> Result<(), CoreError> {
        match target {
            ConditionTarget::RegionInvariant(id)
            | ConditionTarget::RegionPrecondition(id)
            | ConditionTarget::RegionPostcondition(id) => {
                let region = self
                    .regions
                    .get_mut(&id)
                    .ok_or(CoreError::RegionNotFound { id })?;
                match target {
                    ConditionTarget::RegionInvariant(_) => region.invariant = condition,
                    ConditionTarget::RegionPrecondition(_) => region.precondition = condition,
                    _ => region.postcondition = condition,
                }
            }
            ConditionTarget::ContractPrecondition(id) | ConditionTarget::ContractPostcondition(id) => {
                let contract = self
                    .contracts
                    .get_mut(&id)
                    .ok_or(CoreError::ContractNotFound { id })?;
                match target {
                    ConditionTarget::ContractPrecondition(_) => contract.precondition = condition,
                    _ => contract.postcondition = condition,
                }
            }
        }
        Ok(())
    }
}
