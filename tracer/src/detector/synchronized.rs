use once_cell::sync::Lazy;
use regex::Regex;

use super::{LockDetector, MethodScope};
use crate::lock::LockInfo;

static SYNCHRONIZED_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bsynchronized\s*\((.*)\)\s*\{\s*$").unwrap_or_else(|e| panic!("regex: {e}")));

/// Detects `synchronized (subject) { ... }` blocks.
///
/// Acquires are emitted on the header fragment. Brace depth is tracked across
/// fragments so that the release is emitted on the block's own closing brace.
#[derive(Debug, Default)]
pub struct SynchronizedDetector {
    depth: usize,
    /// Open synchronized blocks and the depth each was opened at.
    held: Vec<(usize, LockInfo)>,
}

impl LockDetector for SynchronizedDetector {
    fn check_statement(&mut self, statement: &str, scope: &MethodScope<'_>, log: &mut Vec<LockInfo>) {
        let fragment = statement.trim_end();
        if fragment.ends_with('{') {
            if let Some(caps) = SYNCHRONIZED_HEADER.captures(fragment) {
                let subject = caps[1].trim();
                let acquire = LockInfo::acquire(subject, scope.resolve_type(subject), scope.method);
                log.push(acquire.clone());
                self.held.push((self.depth, acquire));
            }
            self.depth += 1;
        } else if fragment.ends_with('}') {
            self.depth = self.depth.saturating_sub(1);
            if self.held.last().is_some_and(|(depth, _)| *depth == self.depth) {
                if let Some((_, acquire)) = self.held.pop() {
                    log.push(acquire.released());
                }
            }
        }
    }
}
