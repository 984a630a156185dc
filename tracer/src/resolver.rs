//! Best-effort resolution of a statement's call to a method block.
//!
//! Only the first call shape found in a fragment is followed, and overloads
//! are not told apart: the first method with a matching name wins.

use lockorder::{BlockId, BlockKind, Program};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::detector::MethodScope;

static MEMBER_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\.(\w+)\s*\(").unwrap_or_else(|e| panic!("regex: {e}")));
static NEW_THEN_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"new\s+(\w+)\s*\([\s\w]*\)\s*\.\s*(\w+)\s*\(").unwrap_or_else(|e| panic!("regex: {e}"))
});
static BARE_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s*\(").unwrap_or_else(|e| panic!("regex: {e}")));
static NEW_BEFORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnew\s+$").unwrap_or_else(|e| panic!("regex: {e}")));

/// Words followed by `(` that are not calls.
const KEYWORDS: &[&str] = &[
    "if", "while", "for", "switch", "catch", "synchronized", "return", "throw", "assert", "super", "this",
    "try", "else", "do", "case",
];

/// A call resolved to a class name and a member name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub class: String,
    pub member: String,
}

/// Resolve the call in a statement fragment, if it has one.
pub fn resolve_call(statement: &str, scope: &MethodScope<'_>) -> Option<CallTarget> {
    if let Some(caps) = MEMBER_CALL.captures(statement) {
        return Some(CallTarget {
            class: scope.resolve_type(&caps[1]),
            member: caps[2].to_string(),
        });
    }

    if let Some(caps) = NEW_THEN_CALL.captures(statement) {
        return Some(CallTarget {
            class: caps[1].to_string(),
            member: caps[2].to_string(),
        });
    }

    let caps = BARE_CALL
        .captures_iter(statement)
        .find(|caps| !KEYWORDS.contains(&&caps[1]))?;
    let name = caps.get(1)?;
    let before = &statement[..name.start()];
    let class = if NEW_BEFORE.is_match(before) {
        name.as_str().to_string()
    } else {
        scope.outer_class_name.to_string()
    };
    Some(CallTarget {
        class,
        member: name.as_str().to_string(),
    })
}

/// The first `Method` child named `target.member` of any class named
/// `target.class`.
pub fn find_method(program: &Program, target: &CallTarget) -> Option<BlockId> {
    program
        .classes()
        .iter()
        .map(|id| program.block(*id))
        .filter(|class| class.name.as_deref() == Some(target.class.as_str()))
        .flat_map(|class| class.children.iter().copied())
        .find(|child| {
            let block = program.block(*child);
            block.kind == BlockKind::Method && block.name.as_deref() == Some(target.member.as_str())
        })
}
