pub mod binder;
pub mod block;
pub mod parser;
pub mod program;
pub mod scan;

pub use block::{Block, BlockDetail, BlockId, BlockKind};
pub use parser::{ParseError, Parser};
pub use program::{Program, SourceFile};
pub use scan::{Scan, ScanError, scan_path};

/// Declared variable name → declared type name.
pub type VariableTable = std::collections::HashMap<String, String>;
