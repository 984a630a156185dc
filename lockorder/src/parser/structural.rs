use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::block::{Block, BlockDetail, BlockId, BlockKind};
use crate::parser::classify::{self, HeaderContext};
use crate::parser::error::ParseError;

static SPLIT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:for|try)\s*\(").unwrap_or_else(|e| panic!("regex: {e}")));

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Blocks recovered from one file, ready to be appended to a program arena.
pub(crate) struct ParsedFile {
    pub blocks: Vec<Block>,
    /// Every class in the file, each one ahead of the classes nested in it.
    pub classes: Vec<BlockId>,
}

/// Split cleaned source text into a tree of blocks by brace matching.
///
/// `base` is the arena index the first block built here will receive.
pub(crate) fn parse_blocks(text: &str, file_id: usize, base: usize) -> Result<ParsedFile, ParseError> {
    let mut state = ParseState::new(text, file_id, base);

    let mut cursor = 0;
    while cursor < text.len() {
        match state.find_block(cursor)? {
            Some(id) => cursor = state.block(id).span.end,
            None => break,
        }
    }

    Ok(ParsedFile {
        blocks: state.blocks,
        classes: state.classes,
    })
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState<'a> {
    text: &'a str,
    file_id: usize,
    base: usize,
    /// Finished blocks; children always precede their parent.
    blocks: Vec<Block>,
    classes: Vec<BlockId>,
}

impl<'a> ParseState<'a> {
    fn new(text: &'a str, file_id: usize, base: usize) -> Self {
        ParseState {
            text,
            file_id,
            base,
            blocks: Vec::new(),
            classes: Vec::new(),
        }
    }

    fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 - self.base]
    }

    fn find(&self, delimiter: char, from: usize) -> Option<usize> {
        self.text.get(from..)?.find(delimiter).map(|pos| pos + from)
    }

    /// Parse the next block at or after `cursor`, including everything nested
    /// in it. Returns `None` once no opening brace precedes the next closing
    /// brace.
    fn find_block(&mut self, cursor: usize) -> Result<Option<BlockId>, ParseError> {
        // Classes register at the slot they would have had when this block
        // started, which keeps outer classes ahead of the inner ones they
        // finish after.
        let classes_at_start = self.classes.len();

        let (Some(open), Some(first_close)) = (self.find('{', cursor), self.find('}', cursor)) else {
            return Ok(None);
        };
        if first_close < open {
            return Ok(None);
        }

        let (header_start, header) = self.locate_header(cursor, open);

        // A self-contained block drops straight out of this loop because its
        // closing brace comes before any other opening brace.
        let mut children = Vec::new();
        let mut inner = open + 1;
        while let Some(child) = self.find_block(inner)? {
            inner = self.block(child).span.end;
            children.push(child);
        }
        let close = self
            .find('}', inner)
            .ok_or_else(|| ParseError::unterminated(open..open + 1, self.file_id))?;

        let ctx = HeaderContext {
            header,
            start: header_start,
            text: self.text,
        };
        let kind = classify::classify(&ctx).ok_or_else(|| {
            let span = if header.is_empty() {
                open..open + 1
            } else {
                header_start..header_start + header.len()
            };
            ParseError::unknown_block(header, span, self.file_id)
        })?;
        let name = classify::block_name(kind, header);
        trace!(?kind, ?name, header, "block");

        let id = BlockId(self.base + self.blocks.len());
        for child in &children {
            self.blocks[child.0 - self.base].parent = Some(id);
        }
        self.blocks.push(Block {
            header: header.to_string(),
            body: self.text[open + 1..close].to_string(),
            kind,
            span: header_start..close + 1,
            open,
            name,
            children,
            parent: None,
            file_id: self.file_id,
            detail: BlockDetail::for_kind(kind),
        });

        if kind == BlockKind::Class {
            self.classes.insert(classes_at_start, id);
        }
        Ok(Some(id))
    }

    /// Recover the header in front of the brace at `open`: the text after the
    /// nearest `;`, `{` or `}`. Returns the trimmed header and its start.
    fn locate_header(&self, cursor: usize, open: usize) -> (usize, &'a str) {
        let start = self.text[..open]
            .rfind([';', '{', '}'])
            .map_or(0, |pos| pos + 1);

        // `for (init; cond; step)` and `try (A a = ..; B b = ..)` are cut
        // down to their last clause by the scan above.
        let truncated = &self.text[start..open];
        if truncated.matches(')').count() > truncated.matches('(').count() {
            if let Some(recovered) = self.recover_split_header(cursor, start, open) {
                return self.trimmed(recovered, open);
            }
        }

        self.trimmed(start, open)
    }

    /// Start of the last `for (` or `try (` between `cursor` and `start` whose
    /// parenthesis closes right before the brace at `open`.
    fn recover_split_header(&self, cursor: usize, start: usize, open: usize) -> Option<usize> {
        let found = SPLIT_HEADER.find_iter(self.text.get(cursor..start)?).last()?;
        let recovered = cursor + found.start();
        let candidate = self.text[recovered..open].trim_end();
        (candidate.ends_with(')') && parens_balanced(candidate)).then_some(recovered)
    }

    fn trimmed(&self, start: usize, end: usize) -> (usize, &'a str) {
        let raw = &self.text[start..end];
        let header = raw.trim();
        if header.is_empty() {
            return (end, header);
        }
        let leading = raw.len() - raw.trim_start().len();
        (start + leading, header)
    }
}

// Never closes more than it opened, and ends with everything closed.
fn parens_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(next) => depth = next,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}
