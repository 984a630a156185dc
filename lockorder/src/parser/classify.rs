//! Header classification.
//!
//! The rules below are tried strictly in table order and the first match
//! decides the block kind. Reordering the table changes results: a `while`
//! header looks like a method signature, a `synchronized(...)` header looks
//! like a call, and so on.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::BlockKind;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("regex: {e}"))
}

static TYPE_DECLARATION: Lazy<Regex> = Lazy::new(|| regex(r"(?:^|\s)(?:class|interface|enum)\s+(\w+)"));
static SYNCHRONIZED_BLOCK: Lazy<Regex> = Lazy::new(|| regex(r"\bsynchronized\s*\("));
static FUTURE_SUBMISSION: Lazy<Regex> = Lazy::new(|| regex(r"Future\s*<.*>.*\bsubmit\s*\("));
static INLINE_THREAD: Lazy<Regex> = Lazy::new(|| regex(r"=\s*new\s+Thread\s*\(\s*\(\s*\)\s*->"));
// Lambda handed straight to a thread or executor, e.g. `new Thread(() -> {`
// or `pool.execute(() -> {` with nothing assigned.
static TASK_LAMBDA: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?:\bnew\s+Thread|\.\s*(?:submit|execute|runAsync|supplyAsync))\s*\(\s*\(\s*\)\s*->$")
});
static RUN_OVERRIDE: Lazy<Regex> = Lazy::new(|| regex(r"public\s+void\s+run\s*\(\s*\)"));
static BARE_THREAD_CREATION: Lazy<Regex> = Lazy::new(|| regex(r"new\s+Thread\s*\(\s*\)$"));
static MAIN_METHOD: Lazy<Regex> =
    Lazy::new(|| regex(r"public\s+static\s+void\s+main\s*\(\s*String\s*(?:\[\s*\]|\.\.\.).+\)"));

static FOR_LOOP: Lazy<Regex> = Lazy::new(|| regex(r"(?s)\bfor\s*\(.*;.*;.*\)\s*$"));
static CONTROL: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bfor\s*\(.*:.*\)",
        r"\bwhile\s*\(",
        r"^do$",
        r"^try$",
        r"^try\s*\(",
        r"^catch\s*\(",
        r"^finally$",
        r"^if\s*\(",
        r"^else\b",
        r"^switch\s*\(",
        r"^static$",
        r"(?:=|\[\s*\])$",
        r"->$",
    ]
    .into_iter()
    .map(regex)
    .collect()
});

static METHOD_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?:public|private|protected)?\s*(?:static)?\s*\w*\s+(\w+)\s*\([\w\[\]<>\s,.@?]*\)")
});

/// A header together with where it sits in the cleaned file text.
#[derive(Debug, Clone, Copy)]
pub struct HeaderContext<'a> {
    /// Trimmed header text.
    pub header: &'a str,
    /// Byte offset of the header's first character.
    pub start: usize,
    /// The whole cleaned file.
    pub text: &'a str,
}

/// One row of the classification table.
pub struct Rule {
    pub name: &'static str,
    pub kind: BlockKind,
    test: fn(&HeaderContext<'_>) -> bool,
}

impl Rule {
    pub fn matches(&self, ctx: &HeaderContext<'_>) -> bool {
        (self.test)(ctx)
    }
}

pub static RULES: &[Rule] = &[
    Rule {
        name: "type declaration",
        kind: BlockKind::Class,
        test: is_type_declaration,
    },
    Rule {
        name: "synchronized block",
        kind: BlockKind::Synchronized,
        test: is_synchronized_block,
    },
    Rule {
        name: "truncated for-loop header",
        kind: BlockKind::CodeBlock,
        test: is_truncated_loop_header,
    },
    Rule {
        name: "submitted or inline task",
        kind: BlockKind::ThreadEntry,
        test: is_task_body,
    },
    Rule {
        name: "run() on a new task object",
        kind: BlockKind::ThreadEntry,
        test: is_task_object_run,
    },
    Rule {
        name: "program entry point",
        kind: BlockKind::ThreadEntry,
        test: is_main_method,
    },
    Rule {
        name: "control block",
        kind: BlockKind::CodeBlock,
        test: is_control_block,
    },
    Rule {
        name: "method signature",
        kind: BlockKind::Method,
        test: is_method_signature,
    },
];

/// Classify a block header. `None` means no rule matched.
pub fn classify(ctx: &HeaderContext<'_>) -> Option<BlockKind> {
    matching_rule(ctx).map(|rule| rule.kind)
}

/// The first rule in table order that accepts the header.
pub fn matching_rule(ctx: &HeaderContext<'_>) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.matches(ctx))
}

/// Name of a classified block: the declared type for classes, the signature
/// name for methods and thread entries.
pub fn block_name(kind: BlockKind, header: &str) -> Option<String> {
    let captures = match kind {
        BlockKind::Class => TYPE_DECLARATION.captures(header),
        BlockKind::Method | BlockKind::ThreadEntry => METHOD_SIGNATURE.captures(header),
        BlockKind::Synchronized | BlockKind::CodeBlock => None,
    }?;
    Some(captures[1].to_string())
}

fn is_type_declaration(ctx: &HeaderContext<'_>) -> bool {
    TYPE_DECLARATION.is_match(ctx.header)
}

fn is_synchronized_block(ctx: &HeaderContext<'_>) -> bool {
    SYNCHRONIZED_BLOCK.is_match(ctx.header)
}

// Header recovery stops at the last `;`, so a for-loop that could not be
// recovered whole arrives here as just `i++)`.
fn is_truncated_loop_header(ctx: &HeaderContext<'_>) -> bool {
    ctx.header.contains(')') && !ctx.header.contains('(')
}

fn is_task_body(ctx: &HeaderContext<'_>) -> bool {
    FUTURE_SUBMISSION.is_match(ctx.header)
        || INLINE_THREAD.is_match(ctx.header)
        || TASK_LAMBDA.is_match(ctx.header)
}

fn is_task_object_run(ctx: &HeaderContext<'_>) -> bool {
    if !RUN_OVERRIDE.is_match(ctx.header) || ctx.start < 2 {
        return false;
    }
    let Some(before) = ctx.text.get(..ctx.start) else {
        return false;
    };
    let before = before.trim_end();
    let before = before.strip_suffix('{').unwrap_or(before).trim_end();
    BARE_THREAD_CREATION.is_match(before)
}

fn is_main_method(ctx: &HeaderContext<'_>) -> bool {
    MAIN_METHOD.is_match(ctx.header)
}

fn is_control_block(ctx: &HeaderContext<'_>) -> bool {
    ctx.header.is_empty()
        || FOR_LOOP.is_match(ctx.header)
        || CONTROL.iter().any(|pattern| pattern.is_match(ctx.header))
}

fn is_method_signature(ctx: &HeaderContext<'_>) -> bool {
    METHOD_SIGNATURE.is_match(ctx.header)
}
