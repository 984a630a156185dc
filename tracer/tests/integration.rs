use lockorder::{BlockId, BlockKind, Parser, Program};
use tracer::{
    DetectorKind, LockDetector, LockInfo, MethodScope, TraceConfig, TraceError, Walker, trace_thread_entries,
};

const DEADLOCK: &str = include_str!("../../fixtures/deadlock/synchronized_deadlock.test.java");

fn parse(source: &str) -> Program {
    Parser::new("Test.java", source.to_string())
        .parse()
        .expect("parse failed")
}

fn method(program: &Program, name: &str) -> BlockId {
    program
        .blocks()
        .find(|(_, block)| block.kind.is_method_like() && block.name.as_deref() == Some(name))
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no method named {name}"))
}

fn walk(program: &Program, id: BlockId) -> Vec<String> {
    let mut log = Vec::new();
    Walker::new(program).walk(id, &mut log).expect("walk failed");
    log.iter().map(ToString::to_string).collect()
}

fn traces(source: &str) -> Vec<(String, Vec<String>)> {
    let program = parse(source);
    trace_thread_entries(&program, &TraceConfig::default())
        .expect("trace failed")
        .into_iter()
        .map(|trace| {
            let notation = trace.notation();
            (trace.label, notation)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

fn expected(label: &str, events: &[&str]) -> (String, Vec<String>) {
    (label.to_string(), events.iter().map(|event| event.to_string()).collect())
}

#[test]
fn nested_blocks_in_opposite_orders() {
    assert_eq!(
        traces(DEADLOCK),
        vec![
            expected(
                "SynchronizedDeadlock.thread1",
                &["+string1", "+string2", "-string2", "-string1"]
            ),
            expected(
                "SynchronizedDeadlock.thread2",
                &["+string2", "+string1", "-string1", "-string2"]
            ),
            // Sequential use: the two locks are never held together.
            expected(
                "SynchronizedDeadlock.thread3",
                &["+string2", "-string2", "+string1", "-string1"]
            ),
        ]
    );
}

#[test]
fn lock_subjects_resolve_to_declared_types() {
    let program = parse(DEADLOCK);
    let traces = trace_thread_entries(&program, &TraceConfig::default()).unwrap();
    let first = &traces[0].events[0];
    assert_eq!(first.subject, "string1");
    assert_eq!(first.lock_type, "String");
    assert!(first.is_acquire());

    // thread2's events come from the method that takes the locks.
    let lock_in_other_order = method(&program, "lockInOtherOrder");
    assert!(traces[1].events.iter().all(|event| event.block == lock_in_other_order));
}

#[test]
fn events_serialize_for_reports() {
    let program = parse(DEADLOCK);
    let traces = trace_thread_entries(&program, &TraceConfig::default()).unwrap();
    let json = serde_json::to_value(&traces[0].events[1]).unwrap();
    assert_eq!(json["subject"], "string2");
    assert_eq!(json["lock_type"], "String");
    assert_eq!(json["action"], "acquire");
    assert!(json["block"].is_u64());
}

// ---------------------------------------------------------------------------
// Synchronized methods
// ---------------------------------------------------------------------------

const MONITORS: &str = "class Monitors {
    private final Object ledger = new Object();

    synchronized void implicit() {
        synchronized (ledger) {
            touch();
        }
    }

    void explicit() {
        synchronized (this) {
            synchronized (ledger) {
                touch();
            }
        }
    }

    void touch() {
    }
}
";

#[test]
fn synchronized_method_matches_explicit_this_block() {
    let program = parse(MONITORS);
    let implicit = walk(&program, method(&program, "implicit"));
    let explicit = walk(&program, method(&program, "explicit"));
    assert_eq!(implicit, vec!["+this", "+ledger", "-ledger", "-this"]);
    assert_eq!(implicit, explicit);

    let mut log = Vec::new();
    Walker::new(&program)
        .walk(method(&program, "implicit"), &mut log)
        .unwrap();
    assert_eq!(log[0].lock_type, "Monitors");
    assert_eq!(log[3], log[0].released());
}

#[test]
fn synchronized_method_is_traced_without_detectors() {
    let program = parse(MONITORS);
    let config = TraceConfig { detectors: vec![] };
    let mut log = Vec::new();
    Walker::with_config(&program, &config)
        .walk(method(&program, "implicit"), &mut log)
        .unwrap();
    let notation: Vec<String> = log.iter().map(ToString::to_string).collect();
    assert_eq!(notation, vec!["+this", "-this"]);
}

// ---------------------------------------------------------------------------
// Call resolution
// ---------------------------------------------------------------------------

#[test]
fn mutual_recursion_is_traced_once() {
    let program = parse(
        "class Loop {
    private final Object a = new Object();
    private final Object b = new Object();

    public static void main(String[] args) {
        new Loop().ping();
    }

    void ping() { synchronized (a) { pong(); } }

    void pong() { synchronized (b) { ping(); } }
}
",
    );
    let main = method(&program, "main");
    assert_eq!(walk(&program, main), vec!["+a", "+b", "-b", "-a"]);
    // A second walk of the same program starts from a clean stack.
    assert_eq!(walk(&program, main), vec!["+a", "+b", "-b", "-a"]);
}

#[test]
fn repeated_calls_are_each_traced() {
    let program = parse(
        "class Twice {
    private final Object a = new Object();

    void run() {
        once();
        once();
    }

    void once() {
        synchronized (a) {
        }
    }
}
",
    );
    assert_eq!(walk(&program, method(&program, "run")), vec!["+a", "-a", "+a", "-a"]);
}

#[test]
fn unresolved_calls_are_skipped() {
    let program = parse(
        "class Lonely {
    private final Object a = new Object();

    void run() {
        missing.call();
        Nowhere.go();
        helper();
        new Stranger().visit();
        synchronized (a) {}
    }
}
",
    );
    assert_eq!(walk(&program, method(&program, "run")), vec!["+a", "-a"]);
}

#[test]
fn calls_follow_variable_types_and_keywords() {
    let program = parse(
        "class Caller {
    private Holder<String> holder;

    void run(Store store) {
        holder.take();
        if (ready()) {
            store.put();
        }
    }

    boolean ready() {
        synchronized (this) {
            return true;
        }
    }
}

class Holder<T> {
    private final Object slot = new Object();

    void take() {
        synchronized (slot) {
        }
    }
}

class Store {
    synchronized void put() {
    }
}
",
    );
    let mut log = Vec::new();
    Walker::new(&program)
        .walk(method(&program, "run"), &mut log)
        .unwrap();
    let notation: Vec<String> = log.iter().map(ToString::to_string).collect();
    assert_eq!(notation, vec!["+slot", "-slot", "+this", "-this", "+this", "-this"]);
    assert_eq!(log[2].lock_type, "Caller");
    assert_eq!(log[4].lock_type, "Store");
}

#[test]
fn nested_class_calls_resolve_against_the_outer_class() {
    let program = parse(
        "class Outer {
    private final Object guard = new Object();

    class Worker {
        void work() {
            guarded();
        }
    }

    void guarded() {
        synchronized (guard) {
        }
    }
}
",
    );
    assert_eq!(walk(&program, method(&program, "work")), vec!["+guard", "-guard"]);
}

#[test]
fn spawned_lambda_runs_on_its_own_thread() {
    let traces = traces(
        "class P {
    private final Object a = new Object();
    private final Object b = new Object();

    public static void main(String[] args) {
        synchronized (a) {
            new Thread(() -> {
                synchronized (b) {
                }
            }).start();
        }
    }
}
",
    );
    assert_eq!(
        traces,
        vec![
            expected("P.main", &["+a", "-a"]),
            expected("P.anonymous", &["+b", "-b"]),
        ]
    );
}

#[test]
fn locks_inside_multi_resource_try_are_traced() {
    let program = parse(
        "class R {
    private final Object a = new Object();

    public static void main(String[] args) {
        try (In x = open(); In y = open()) {
            synchronized (a) {
            }
        }
    }
}
",
    );
    assert_eq!(walk(&program, method(&program, "main")), vec!["+a", "-a"]);
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

/// Recognises `name.lock()` / `name.unlock()` pairs.
struct ExplicitLocks;

impl LockDetector for ExplicitLocks {
    fn check_statement(&mut self, statement: &str, scope: &MethodScope<'_>, log: &mut Vec<LockInfo>) {
        let statement = statement.trim();
        if let Some(subject) = statement.strip_suffix(".lock();") {
            log.push(LockInfo::acquire(subject, scope.resolve_type(subject), scope.method));
        } else if let Some(subject) = statement.strip_suffix(".unlock();") {
            log.push(LockInfo::acquire(subject, scope.resolve_type(subject), scope.method).released());
        }
    }
}

#[test]
fn custom_detectors_plug_into_the_walk() {
    let program = parse(
        "class Bank {
    private final ReentrantLock mutex = new ReentrantLock();

    void transfer() {
        mutex.lock();
        try {
            audit();
        } finally {
            mutex.unlock();
        }
    }

    void audit() {
        synchronized (this) {
        }
    }
}
",
    );
    let transfer = method(&program, "transfer");

    let mut log = Vec::new();
    Walker::with_detectors(&program, || {
        vec![
            Box::new(ExplicitLocks) as Box<dyn LockDetector>,
            DetectorKind::Synchronized.build(),
        ]
    })
    .walk(transfer, &mut log)
    .unwrap();
    let notation: Vec<String> = log.iter().map(ToString::to_string).collect();
    assert_eq!(notation, vec!["+mutex", "+this", "-this", "-mutex"]);
    assert_eq!(log[0].lock_type, "ReentrantLock");

    // The default set only knows synchronized blocks.
    assert_eq!(walk(&program, transfer), vec!["+this", "-this"]);
}

#[test]
fn trace_config_reads_detector_names() {
    let config: TraceConfig = serde_json::from_str(r#"{"detectors": ["synchronized"]}"#).unwrap();
    assert_eq!(config.detectors, vec![DetectorKind::Synchronized]);

    let config: TraceConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, TraceConfig::default());

    let config: TraceConfig = serde_json::from_str(r#"{"detectors": []}"#).unwrap();
    let program = parse(DEADLOCK);
    let traces = trace_thread_entries(&program, &config).unwrap();
    assert_eq!(traces.len(), 3);
    assert!(traces.iter().all(|trace| trace.events.is_empty()));
}

// ---------------------------------------------------------------------------
// Errors and caching
// ---------------------------------------------------------------------------

#[test]
fn method_outside_any_class_is_an_error() {
    let program = parse("void orphan() {\n    work();\n}\n");
    let mut log = Vec::new();
    let err = Walker::new(&program)
        .walk(method(&program, "orphan"), &mut log)
        .unwrap_err();
    assert!(matches!(err, TraceError::MissingClass { .. }));
    assert!(err.to_string().contains("Test.java:1"));
}

#[test]
fn only_methods_can_be_walked() {
    let program = parse(DEADLOCK);
    let class = program.classes()[0];
    let mut log = Vec::new();
    let err = Walker::new(&program).walk(class, &mut log).unwrap_err();
    assert!(matches!(err, TraceError::NotWalkable { kind: BlockKind::Class, .. }));
}

#[test]
fn walking_caches_derived_method_data() {
    let program = parse(DEADLOCK);
    let target = method(&program, "lockInOtherOrder");
    assert!(!program.block(target).as_method().unwrap().is_derived());
    trace_thread_entries(&program, &TraceConfig::default()).unwrap();
    assert!(program.block(target).as_method().unwrap().is_derived());
}
