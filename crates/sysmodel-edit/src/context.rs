//! The state a command runs against.

use sysmodel_core::{Fragment, SystemId, SystemModel};

use crate::selection::SelectionManager;

/// Everything a command may read or mutate: the model, the selection, the
/// system currently shown in the editor and the clipboard.
pub struct EditContext<'a> {
    pub model: &'a mut SystemModel,
    pub selection: &'a mut SelectionManager,
    pub view: &'a mut SystemId,
    pub clipboard: &'a mut Option<Fragment>,
}
