pub mod class;
pub mod method;

use std::fmt;
use std::ops::Range;

use serde::Serialize;

pub use class::ClassBlock;
pub use method::MethodBlock;

/// Index of a block inside a [`Program`](crate::Program) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a brace-delimited region of source represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockKind {
    Class,
    Method,
    Synchronized,
    /// An independent point of execution: a submitted task, an inline task
    /// body, a `run()` override on a task object, or a program entry point.
    ThreadEntry,
    /// Loops, try/catch/finally, conditionals and any other generic braces.
    CodeBlock,
}

impl BlockKind {
    /// Kinds whose body is executed on its own rather than inline with the
    /// enclosing code.
    pub fn is_method_like(self) -> bool {
        matches!(self, BlockKind::Method | BlockKind::ThreadEntry)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BlockKind::Class => "class",
            BlockKind::Method => "method",
            BlockKind::Synchronized => "synchronized",
            BlockKind::ThreadEntry => "thread entry",
            BlockKind::CodeBlock => "code block",
        };
        f.write_str(label)
    }
}

/// A brace-delimited block recovered from a source file.
/// Blocks are built once by the parser and never change afterwards, apart
/// from the compute-once fields held in [`BlockDetail`].
#[derive(Debug, Clone)]
pub struct Block {
    /// Trimmed text between the previous statement terminator and `{`.
    pub header: String,
    /// Text between the braces, exclusive.
    pub body: String,
    pub kind: BlockKind,
    /// Byte span from the header start to one past the closing brace.
    pub span: Range<usize>,
    /// Byte offset of the opening brace.
    pub open: usize,
    pub name: Option<String>,
    /// Nested blocks in source order.
    pub children: Vec<BlockId>,
    /// Enclosing block; `None` for top-level blocks.
    pub parent: Option<BlockId>,
    pub file_id: usize,
    pub detail: BlockDetail,
}

/// Kind-specific data attached to a block.
#[derive(Debug, Clone)]
pub enum BlockDetail {
    Class(ClassBlock),
    Method(MethodBlock),
    Plain,
}

impl BlockDetail {
    pub(crate) fn for_kind(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Class => BlockDetail::Class(ClassBlock::default()),
            BlockKind::Method | BlockKind::ThreadEntry => BlockDetail::Method(MethodBlock::default()),
            BlockKind::Synchronized | BlockKind::CodeBlock => BlockDetail::Plain,
        }
    }
}

impl Block {
    /// Byte offset of the closing brace.
    pub fn close(&self) -> usize {
        self.span.end - 1
    }

    pub fn as_class(&self) -> Option<&ClassBlock> {
        match &self.detail {
            BlockDetail::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodBlock> {
        match &self.detail {
            BlockDetail::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }
}
