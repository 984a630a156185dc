pub mod detector;
pub mod error;
pub mod lock;
pub mod resolver;
pub mod walker;

pub use detector::{DetectorKind, LockDetector, MethodScope, TraceConfig};
pub use error::TraceError;
pub use lock::{LockAction, LockInfo};
pub use walker::{ThreadTrace, Walker, trace_thread_entries};
