use std::collections::HashSet;

use lockorder::{BlockId, Program};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::detector::{LockDetector, MethodScope, TraceConfig};
use crate::error::TraceError;
use crate::lock::LockInfo;
use crate::resolver;

static SYNCHRONIZED_MODIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)synchronized\s").unwrap_or_else(|e| panic!("regex: {e}")));

type DetectorFactory = Box<dyn Fn() -> Vec<Box<dyn LockDetector>>>;

/// Symbolic executor that follows calls from a method and records every lock
/// event reachable from it.
pub struct Walker<'p> {
    program: &'p Program,
    detectors: DetectorFactory,
    /// Methods with a frame currently on the walk stack.
    active: HashSet<BlockId>,
}

impl<'p> Walker<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self::with_config(program, &TraceConfig::default())
    }

    pub fn with_config(program: &'p Program, config: &TraceConfig) -> Self {
        let kinds = config.detectors.clone();
        Self::with_detectors(program, move || kinds.iter().map(|kind| kind.build()).collect())
    }

    /// Use a custom detector set; `factory` is called once per method frame.
    pub fn with_detectors(
        program: &'p Program,
        factory: impl Fn() -> Vec<Box<dyn LockDetector>> + 'static,
    ) -> Self {
        Walker {
            program,
            detectors: Box::new(factory),
            active: HashSet::new(),
        }
    }

    /// Walk a method or thread entry, appending its lock events to `log`.
    ///
    /// A method that is already being walked further up the stack is skipped,
    /// so recursive call cycles are traced once.
    pub fn walk(&mut self, method: BlockId, log: &mut Vec<LockInfo>) -> Result<(), TraceError> {
        let program = self.program;
        let block = program.block(method);
        if !block.kind.is_method_like() {
            return Err(TraceError::NotWalkable {
                kind: block.kind,
                location: program.location(method),
            });
        }
        if !self.active.insert(method) {
            trace!(method = %program.qualified_label(method), "already on the walk stack");
            return Ok(());
        }
        let result = self.walk_frame(method, log);
        self.active.remove(&method);
        result
    }

    fn walk_frame(&mut self, method: BlockId, log: &mut Vec<LockInfo>) -> Result<(), TraceError> {
        let program = self.program;
        let block = program.block(method);
        let class = program
            .enclosing_class(method)
            .ok_or_else(|| TraceError::MissingClass {
                label: program.entry_label(method),
                location: program.location(method),
            })?;
        let outer = program.outermost_class(method).unwrap_or(class);
        let not_walkable = || TraceError::NotWalkable {
            kind: block.kind,
            location: program.location(method),
        };
        let variables = program.variables(method).ok_or_else(not_walkable)?;
        let code = program.own_code(method).ok_or_else(not_walkable)?;

        let scope = MethodScope {
            program,
            method,
            class_name: program.block(class).name_or("?"),
            outer_class_name: program.block(outer).name_or("?"),
            variables,
        };
        debug!(method = %program.qualified_label(method), depth = self.active.len(), "walking");

        let monitor = SYNCHRONIZED_MODIFIER
            .is_match(&block.header)
            .then(|| LockInfo::acquire("this", scope.class_name, method));
        if let Some(acquire) = &monitor {
            log.push(acquire.clone());
        }

        let mut detectors = (self.detectors)();
        for statement in split_statements(code) {
            for detector in detectors.iter_mut() {
                detector.check_statement(statement, &scope, log);
            }
            let Some(target) = resolver::resolve_call(statement, &scope) else {
                continue;
            };
            match resolver::find_method(program, &target) {
                Some(callee) => self.walk(callee, log)?,
                None => trace!(class = %target.class, member = %target.member, "unresolved call"),
            }
        }

        if let Some(acquire) = monitor {
            log.push(acquire.released());
        }
        Ok(())
    }
}

/// Break code after every `;`, `{` and `}`, keeping the delimiter.
pub fn split_statements(code: &str) -> impl Iterator<Item = &str> {
    code.split_inclusive([';', '{', '}'])
}

/// The lock events of one thread entry.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadTrace {
    pub entry: BlockId,
    /// `Class.label` of the entry.
    pub label: String,
    /// `file:line` of the entry's header.
    pub location: String,
    pub events: Vec<LockInfo>,
}

impl ThreadTrace {
    /// Events in `+subject` / `-subject` form.
    pub fn notation(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }
}

/// Walk every thread entry of the program in source order.
pub fn trace_thread_entries(program: &Program, config: &TraceConfig) -> Result<Vec<ThreadTrace>, TraceError> {
    let mut walker = Walker::with_config(program, config);
    let mut traces = Vec::new();
    for entry in program.thread_entries() {
        let mut events = Vec::new();
        walker.walk(entry, &mut events)?;
        traces.push(ThreadTrace {
            entry,
            label: program.qualified_label(entry),
            location: program.location(entry),
            events,
        });
    }
    Ok(traces)
}
