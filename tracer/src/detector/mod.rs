//! Statement-level lock detection.
//!
//! The walker hands every statement fragment of a method's own code to each
//! configured [`LockDetector`] in order. Detectors are built fresh for every
//! method frame, so any state they keep (such as brace depth) is local to
//! one method body.

pub mod synchronized;

use lockorder::binder::strip_generics;
use lockorder::{BlockId, Program, VariableTable};
use serde::{Deserialize, Serialize};

use crate::lock::LockInfo;

pub use synchronized::SynchronizedDetector;

/// A recogniser for one locking idiom.
pub trait LockDetector {
    /// Inspect one statement fragment (text up to and including its `;`, `{`
    /// or `}`) and append any events it implies.
    fn check_statement(&mut self, statement: &str, scope: &MethodScope<'_>, log: &mut Vec<LockInfo>);
}

/// What a detector can see about the method being walked.
pub struct MethodScope<'a> {
    pub program: &'a Program,
    pub method: BlockId,
    /// Name of the nearest enclosing class.
    pub class_name: &'a str,
    /// Name of the top-level class containing the method.
    pub outer_class_name: &'a str,
    pub variables: &'a VariableTable,
}

impl MethodScope<'_> {
    /// Map an expression to a type name: `this` is the enclosing class, a
    /// known variable is its declared type without generic arguments, and
    /// anything else is taken literally.
    pub fn resolve_type(&self, expr: &str) -> String {
        if expr == "this" {
            return self.class_name.to_string();
        }
        match self.variables.get(expr) {
            Some(ty) => strip_generics(ty),
            None => expr.to_string(),
        }
    }
}

/// Built-in detectors selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Synchronized,
}

impl DetectorKind {
    pub fn build(self) -> Box<dyn LockDetector> {
        match self {
            DetectorKind::Synchronized => Box::new(SynchronizedDetector::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Detectors run on every statement; empty disables statement-level
    /// detection (synchronized methods are still traced).
    pub detectors: Vec<DetectorKind>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            detectors: vec![DetectorKind::Synchronized],
        }
    }
}
