pub mod id;
pub mod error;
pub mod types;
pub mod element;
pub mod model;
pub mod detach;
pub mod property;
pub mod fragment;
pub mod integrity;

// Re-export commonly used types
pub use id::{ConnectionId, ContractId, EdgeId, ElementId, PortId, RegionId, StateId, SystemId};
pub use error::CoreError;
pub use types::{Condition, EdgeKind, Visibility};
pub use element::{
    Automaton, ConnectionDef, ContractDef, EdgeDef, PortDef, RegionDef, StateDef, SystemDef,
};
pub use model::SystemModel;
pub use detach::{
    Detached, DetachedConnection, DetachedContract, DetachedEdge, DetachedPort, DetachedRegion,
    DetachedState, DetachedSystem,
};
pub use property::{ConditionTarget, NameTarget, PropertyChange};
pub use fragment::Fragment;
