use once_cell::sync::OnceCell;

use crate::VariableTable;

/// Data carried by `Class` blocks.
#[derive(Debug, Clone, Default)]
pub struct ClassBlock {
    fields: OnceCell<VariableTable>,
}

impl ClassBlock {
    /// Declared field name → declared type, computed on first use.
    pub(crate) fn fields_or_init(&self, init: impl FnOnce() -> VariableTable) -> &VariableTable {
        self.fields.get_or_init(init)
    }
}
