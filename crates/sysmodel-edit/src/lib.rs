//! Command execution, cascading deletion and undo/redo history for system
//! models.

pub mod command;
pub mod config;
pub mod context;
pub mod editor;
pub mod error;
pub mod history;
pub mod resolver;
pub mod selection;

pub use command::{CompositeCommand, EditCommand};
pub use config::EditorConfig;
pub use context::EditContext;
pub use editor::Editor;
pub use error::EditError;
pub use history::{HistoryManager, Outcome};
pub use resolver::{deletion_command, resolve_closure, Closure};
pub use selection::{Selection, SelectionManager};
