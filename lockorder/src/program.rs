use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::VariableTable;
use crate::binder;
use crate::block::{Block, BlockId, BlockKind};
use crate::parser::{self, ParseError, preprocess};

static ASSIGNED_TO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s*=(?:[^=]|$)").unwrap_or_else(|e| panic!("regex: {e}")));

/// A source file registered with a [`Program`].
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    /// Text as read.
    pub source: String,
    /// Text with comments and literal contents blanked; same length as
    /// `source`, and the text every block offset refers to.
    pub text: String,
}

/// Arena of every block parsed from a set of source files.
#[derive(Debug, Default)]
pub struct Program {
    files: Vec<SourceFile>,
    blocks: Vec<Block>,
    /// All class blocks: per file outer-before-inner, files in insertion order.
    classes: Vec<BlockId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and parse one file, returning its file id.
    ///
    /// The file stays registered when parsing fails (so the error's file id
    /// can be rendered), but none of its blocks are kept.
    pub fn add_file(&mut self, name: impl Into<String>, source: String) -> Result<usize, ParseError> {
        let file_id = self.files.len();
        let text = preprocess::strip_noise(&source);
        let parsed = parser::parse_blocks(&text, file_id, self.blocks.len());
        self.files.push(SourceFile {
            name: name.into(),
            source,
            text,
        });
        let parsed = parsed?;

        debug!(
            file = %self.files[file_id].name,
            blocks = parsed.blocks.len(),
            classes = parsed.classes.len(),
            "parsed file"
        );
        self.blocks.extend(parsed.blocks);
        self.classes.extend(parsed.classes);
        Ok(file_id)
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, file_id: usize) -> Option<&SourceFile> {
        self.files.get(file_id)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, block)| (BlockId(i), block))
    }

    /// Every class block, outer classes ahead of the classes nested in them.
    pub fn classes(&self) -> &[BlockId] {
        &self.classes
    }

    /// The class list of a single file.
    pub fn classes_in(&self, file_id: usize) -> impl Iterator<Item = BlockId> + '_ {
        self.classes
            .iter()
            .copied()
            .filter(move |id| self.block(*id).file_id == file_id)
    }

    /// Top-level blocks of a file in source order.
    pub fn roots_in(&self, file_id: usize) -> Vec<BlockId> {
        let mut roots: Vec<BlockId> = self
            .blocks()
            .filter(|(_, block)| block.file_id == file_id && block.parent.is_none())
            .map(|(id, _)| id)
            .collect();
        roots.sort_by_key(|id| self.block(*id).span.start);
        roots
    }

    /// Thread entries ordered by file, then position.
    pub fn thread_entries(&self) -> Vec<BlockId> {
        let mut entries: Vec<BlockId> = self
            .blocks()
            .filter(|(_, block)| block.kind == BlockKind::ThreadEntry)
            .map(|(id, _)| id)
            .collect();
        entries.sort_by_key(|id| {
            let block = self.block(*id);
            (block.file_id, block.span.start)
        });
        entries
    }

    /// Parent, grandparent, ... up to the top-level block.
    pub fn ancestors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(self.block(id).parent, move |parent| self.block(*parent).parent)
    }

    /// The nearest class among the block's ancestors.
    pub fn enclosing_class(&self, id: BlockId) -> Option<BlockId> {
        self.ancestors(id)
            .find(|ancestor| self.block(*ancestor).kind == BlockKind::Class)
    }

    /// The top-level block containing `id` (or `id` itself), if it is a class.
    pub fn outermost_class(&self, id: BlockId) -> Option<BlockId> {
        let top = self.ancestors(id).last().unwrap_or(id);
        (self.block(top).kind == BlockKind::Class).then_some(top)
    }

    /// Field table of a class block.
    pub fn class_fields(&self, id: BlockId) -> Option<&VariableTable> {
        let class = self.block(id).as_class()?;
        Some(class.fields_or_init(|| {
            let own_text = self.excised_text(id, &|_| true);
            binder::bind_declarations(&own_text)
        }))
    }

    /// Variable table of a method or thread entry: parameters, then locals
    /// declared anywhere in its body, then fields of each enclosing class
    /// from the nearest outwards. Earlier sources win on name collisions.
    pub fn variables(&self, id: BlockId) -> Option<&VariableTable> {
        let block = self.block(id);
        let method = block.as_method()?;
        Some(method.variables_or_init(|| {
            let mut table = binder::bind_parameters(&block.header);
            binder::merge_under(&mut table, &binder::bind_declarations(&block.body));
            for ancestor in self.ancestors(id) {
                if let Some(fields) = self.class_fields(ancestor) {
                    binder::merge_under(&mut table, fields);
                }
            }
            table
        }))
    }

    /// The body of a method or thread entry with the bodies of nested
    /// methods, thread entries and classes cut out, leaving exactly what
    /// runs when the method itself runs.
    pub fn own_code(&self, id: BlockId) -> Option<&str> {
        let method = self.block(id).as_method()?;
        Some(method.own_code_or_init(|| {
            self.excised_text(id, &|child| {
                child.kind.is_method_like() || child.kind == BlockKind::Class
            })
        }))
    }

    /// Display label of a thread entry: the variable it is assigned to,
    /// else its name, else `anonymous`.
    pub fn entry_label(&self, id: BlockId) -> String {
        let block = self.block(id);
        let assigned = |block: &Block| {
            ASSIGNED_TO
                .captures(&block.header)
                .map(|caps| caps[1].to_string())
        };
        if let Some(variable) = assigned(block) {
            return variable;
        }
        // `Thread t = new Thread() { public void run() { ... } }`
        let task_object = block
            .parent
            .map(|parent| self.block(parent))
            .filter(|parent| parent.kind != BlockKind::Class);
        if let Some(variable) = task_object.and_then(assigned) {
            return variable;
        }
        block.name.clone().unwrap_or_else(|| "anonymous".to_string())
    }

    /// `Class.label` for thread entries and methods.
    pub fn qualified_label(&self, id: BlockId) -> String {
        let class = self
            .enclosing_class(id)
            .map(|class| self.block(class).name_or("?"))
            .unwrap_or("?");
        format!("{}.{}", class, self.entry_label(id))
    }

    /// 1-based line of the block's header.
    pub fn line_of(&self, id: BlockId) -> usize {
        let block = self.block(id);
        self.files[block.file_id].text[..block.span.start]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1
    }

    /// `file:line` of the block's header.
    pub fn location(&self, id: BlockId) -> String {
        let block = self.block(id);
        format!("{}:{}", self.files[block.file_id].name, self.line_of(id))
    }

    fn excised_text(&self, id: BlockId, excise: &dyn Fn(&Block) -> bool) -> String {
        let mut out = String::new();
        self.collect_text(id, excise, &mut out);
        out
    }

    // Copies the block's body, keeping each child's header and braces but
    // dropping the body of any child `excise` accepts.
    fn collect_text(&self, id: BlockId, excise: &dyn Fn(&Block) -> bool, out: &mut String) {
        let block = self.block(id);
        let text = &self.files[block.file_id].text;
        let mut cursor = block.open + 1;
        for &child_id in &block.children {
            let child = self.block(child_id);
            out.push_str(&text[cursor..=child.open]);
            if !excise(child) {
                self.collect_text(child_id, excise, out);
            }
            cursor = child.close();
        }
        out.push_str(&text[cursor..block.close()]);
    }
}
