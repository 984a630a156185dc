use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use lockorder::Parser;
use tracer::{ThreadTrace, TraceConfig, trace_thread_entries};

const TEST_SUFFIX: &str = ".test.java";
const FRONTMATTER_OPEN: &str = "/*---";
const FRONTMATTER_CLOSE: &str = "\n---*/";

#[derive(Debug, Deserialize)]
pub struct ExpectedTrace {
    /// Thread entry label, `Class.label`.
    pub entry: String,

    /// Events in order, `+subject` for an acquire and `-subject` for a release.
    pub trace: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// If true, the test expects parsing to fail.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// Traces to compare. Entries not listed here are not checked.
    #[serde(default)]
    pub expect: Vec<ExpectedTrace>,
}

/// Read the TOML held in the leading `/*--- ... ---*/` comment.
///
/// The comment stays in the source handed to the parser, which blanks it, so
/// line numbers in diagnostics match the file.
fn parse_test_file(content: &str) -> Result<TestConfig, String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    let after_open = content
        .strip_prefix(FRONTMATTER_OPEN)
        .ok_or("missing opening /*--- frontmatter delimiter")?;

    let close_pos = after_open
        .find(FRONTMATTER_CLOSE)
        .ok_or("missing closing ---*/ frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path, trace_config: &TraceConfig) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let config = match parse_test_file(&content) {
        Ok(config) => config,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let parse_result = Parser::new(path.display().to_string(), content.clone()).parse();

    if config.expect_parse_error {
        return TestResult {
            path: path.to_path_buf(),
            description,
            outcome: match parse_result {
                Err(_) => TestOutcome::Pass,
                Ok(_) => TestOutcome::Fail("expected parse error, but parsing succeeded".into()),
            },
        };
    }

    let program = match parse_result {
        Ok(p) => p,
        Err(err) => {
            let line = byte_offset_to_line(&content, err.span.start);
            return fail(description, format!("unexpected parse error on line {}: {}", line, err));
        }
    };

    let traces = match trace_thread_entries(&program, trace_config) {
        Ok(traces) => traces,
        Err(e) => return fail(description, format!("trace error: {}", e)),
    };

    if let Some(reason) = check_traces(&traces, &config.expect) {
        return fail(description, reason);
    }

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Pass,
    }
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Compare actual traces to expectations. Returns `Some(reason)` on mismatch.
fn check_traces(traces: &[ThreadTrace], expected: &[ExpectedTrace]) -> Option<String> {
    for expected in expected {
        let Some(actual) = traces.iter().find(|t| t.label == expected.entry) else {
            let found: Vec<&str> = traces.iter().map(|t| t.label.as_str()).collect();
            return Some(format!(
                "no thread entry \"{}\"\n  found: {}",
                expected.entry,
                if found.is_empty() {
                    "(none)".to_string()
                } else {
                    found.join(", ")
                }
            ));
        };

        let actual_trace = actual.notation();
        if actual_trace != expected.trace {
            return Some(format!(
                "trace mismatch for {}\n  expected: [{}]\n  actual:   [{}]",
                expected.entry,
                expected.trace.join(", "),
                actual_trace.join(", ")
            ));
        }
    }
    None
}

/// Discover `.test.java` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(TEST_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn ok_label(no_color: bool) -> &'static str {
    if no_color { "ok" } else { "\x1b[32mok\x1b[0m" }
}

fn failed_label(no_color: bool) -> &'static str {
    if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn result_label<'a>(result: &'a TestResult, file: &'a Path) -> &'a str {
    result
        .description
        .as_deref()
        .unwrap_or_else(|| file.file_stem().and_then(|s| s.to_str()).unwrap_or("?"))
}

fn print_failures(failures: &[TestResult]) {
    eprintln!();
    eprintln!("failures:");
    for f in failures {
        eprintln!();
        eprintln!("  --- {} ---", f.path.display());
        if let TestOutcome::Fail(reason) = &f.outcome {
            for line in reason.lines() {
                eprintln!("  {}", line);
            }
        }
    }
}

/// Run all `.test.java` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String], trace_config: &TraceConfig) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        // Single file mode ignores categories.
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
            return 1;
        }
        select_categories(all_categories, categories)
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", bold(header, no_color));
        }

        for file in files {
            let result = run_single_test(file, trace_config);
            let label = result_label(&result, file).to_string();
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        print_failures(&failures);
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", ok_label(no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            failed_label(no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

/// Keep the requested categories and their subcategories.
fn select_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all_categories;
    }
    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in &all_categories {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all_categories
                    .keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures");

    #[test]
    fn frontmatter_is_read_from_leading_comment() {
        let config = parse_test_file(
            "/*---\ndescription = \"d\"\n\n[[expect]]\nentry = \"A.main\"\ntrace = [\"+x\", \"-x\"]\n---*/\nclass A {}\n",
        )
        .unwrap();
        assert_eq!(config.description.as_deref(), Some("d"));
        assert!(!config.expect_parse_error);
        assert_eq!(config.expect.len(), 1);
        assert_eq!(config.expect[0].trace, vec!["+x", "-x"]);
    }

    #[test]
    fn missing_frontmatter_is_reported() {
        assert!(parse_test_file("class A {}\n").is_err());
        assert!(parse_test_file("/*---\ndescription = \"d\"\n").is_err());
    }

    #[test]
    fn bundled_fixtures_pass() {
        let root = Path::new(FIXTURES);
        let categories = discover_categorized(root);
        assert!(categories.contains_key("deadlock"));
        assert!(categories.contains_key("ordering"));
        for files in categories.values() {
            for file in files {
                let result = run_single_test(file, &TraceConfig::default());
                if let TestOutcome::Fail(reason) = &result.outcome {
                    panic!("{}: {}", file.display(), reason);
                }
            }
        }
    }

    #[test]
    fn wrong_expectation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrong.test.java");
        std::fs::write(
            &path,
            "/*---\n[[expect]]\nentry = \"W.main\"\ntrace = [\"+b\", \"-b\"]\n---*/\nclass W {\n    private final Object a = new Object();\n    public static void main(String[] args) {\n        synchronized (a) {\n        }\n    }\n}\n",
        )
        .unwrap();
        let result = run_single_test(&path, &TraceConfig::default());
        match result.outcome {
            TestOutcome::Fail(reason) => assert!(reason.contains("trace mismatch"), "{reason}"),
            TestOutcome::Pass => panic!("expected failure"),
        }
    }

    #[test]
    fn category_filter_includes_subcategories() {
        let mut all = BTreeMap::new();
        all.insert("ordering".to_string(), vec![PathBuf::from("a")]);
        all.insert("ordering/nested".to_string(), vec![PathBuf::from("b")]);
        all.insert("deadlock".to_string(), vec![PathBuf::from("c")]);
        let selected = select_categories(all, &["ordering/".to_string()]);
        assert_eq!(selected.keys().collect::<Vec<_>>(), vec!["ordering", "ordering/nested"]);
    }
}
