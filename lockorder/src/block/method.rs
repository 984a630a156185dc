use once_cell::sync::OnceCell;

use crate::VariableTable;

/// Data carried by `Method` and `ThreadEntry` blocks.
///
/// Both fields are derived from the finished tree the first time a walk
/// needs them and cached afterwards. `OnceCell` keeps the first computation
/// race-free, so independent walks may share a program across threads.
#[derive(Debug, Clone, Default)]
pub struct MethodBlock {
    variables: OnceCell<VariableTable>,
    own_code: OnceCell<String>,
}

impl MethodBlock {
    pub(crate) fn variables_or_init(&self, init: impl FnOnce() -> VariableTable) -> &VariableTable {
        self.variables.get_or_init(init)
    }

    pub(crate) fn own_code_or_init(&self, init: impl FnOnce() -> String) -> &str {
        self.own_code.get_or_init(init)
    }

    /// True once both the variable table and own code have been computed.
    pub fn is_derived(&self) -> bool {
        self.variables.get().is_some() && self.own_code.get().is_some()
    }
}
