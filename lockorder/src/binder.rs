//! Declared-type lookups for fields, locals and parameters.
//!
//! These tables are what lets a call like `worker.run()` or a lock subject
//! like `synchronized (cache)` be tied back to a type name. Only declarations
//! of the simple `Type name` / `Type name = ...` shapes are recognised.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::VariableTable;

const MODIFIERS: &str = r"(?:(?:public|private|protected|static|final|volatile|transient)\s+)*";
const TYPE: &str = r"([\w.]+(?:\s*<[^=;]*>)?(?:\s*\[\s*\])*)";

static DECLARE_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{MODIFIERS}{TYPE}\s+(\w+)\s*=(?:[^=]|$)"))
        .unwrap_or_else(|e| panic!("regex: {e}"))
});
static DECLARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{MODIFIERS}{TYPE}\s+(\w+)$")).unwrap_or_else(|e| panic!("regex: {e}"))
});
static PARAMETER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?:final\s+)?{TYPE}(?:\.\.\.)?\s+(\w+)$")).unwrap_or_else(|e| panic!("regex: {e}"))
});
static PARAMETER_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w\s*\(([^()]*)\)").unwrap_or_else(|e| panic!("regex: {e}")));
static ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\w+(?:\([^)]*\))?\s*").unwrap_or_else(|e| panic!("regex: {e}")));
static GENERICS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*>").unwrap_or_else(|e| panic!("regex: {e}")));

/// Words that can open a statement shaped like `word name ...` without it
/// being a declaration.
const NOT_A_TYPE: &[&str] = &[
    "return", "else", "new", "throw", "case", "yield", "package", "import", "assert", "goto",
];

/// Scan statements for variable declarations. The first declaration of a
/// name wins.
pub fn bind_declarations(code: &str) -> VariableTable {
    let mut table = VariableTable::new();
    for statement in code.split([';', '{', '}']) {
        let statement = statement.trim();
        if statement.starts_with("return") {
            continue;
        }
        // Each shape binds from its own captures.
        let declared = if let Some(caps) = DECLARE_ASSIGN.captures(statement) {
            Some((caps[1].to_string(), caps[2].to_string()))
        } else {
            DECLARE
                .captures(statement)
                .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        };
        if let Some((ty, name)) = declared {
            if NOT_A_TYPE.contains(&ty.as_str()) {
                continue;
            }
            table.entry(name).or_insert(ty);
        }
    }
    table
}

/// Bind the parameters of a method header such as
/// `public void send(Channel out, final List<Item> items)`.
pub fn bind_parameters(header: &str) -> VariableTable {
    let mut table = VariableTable::new();
    // The last group wins so that leading annotation arguments are skipped.
    let Some(caps) = PARAMETER_LIST.captures_iter(header).last() else {
        return table;
    };
    for parameter in split_top_level(&caps[1]) {
        let parameter = ANNOTATION.replace_all(parameter.trim(), "");
        if let Some(caps) = PARAMETER.captures(parameter.trim()) {
            table.entry(caps[2].to_string()).or_insert_with(|| caps[1].to_string());
        }
    }
    table
}

/// Layer `outer` under `inner`: names already bound in `inner` keep their
/// type.
pub fn merge_under(inner: &mut VariableTable, outer: &VariableTable) {
    for (name, ty) in outer {
        inner.entry(name.clone()).or_insert_with(|| ty.clone());
    }
}

/// Drop generic arguments: `Map<K, V>` becomes `Map`.
pub fn strip_generics(ty: &str) -> String {
    GENERICS.replace_all(ty, "").trim().to_string()
}

// Commas nested inside `<...>` belong to a type, not the parameter list.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !list[start..].trim().is_empty() {
        parts.push(&list[start..]);
    }
    parts
}
