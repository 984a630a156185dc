use std::fmt;

use lockorder::BlockId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockAction {
    Acquire,
    Release,
}

/// One acquire or release recorded during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockInfo {
    /// The lock expression as written, e.g. `string1` or `this`.
    pub subject: String,
    /// Declared type of the subject when it is a known variable, the class
    /// name for `this`, otherwise the subject itself.
    pub lock_type: String,
    /// The method or thread entry whose code produced the event.
    pub block: BlockId,
    pub action: LockAction,
}

impl LockInfo {
    pub fn acquire(subject: impl Into<String>, lock_type: impl Into<String>, block: BlockId) -> Self {
        LockInfo {
            subject: subject.into(),
            lock_type: lock_type.into(),
            block,
            action: LockAction::Acquire,
        }
    }

    /// The matching release for this event.
    pub fn released(&self) -> Self {
        LockInfo {
            action: LockAction::Release,
            ..self.clone()
        }
    }

    pub fn is_acquire(&self) -> bool {
        self.action == LockAction::Acquire
    }
}

/// `+subject` for an acquire, `-subject` for a release.
impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.action {
            LockAction::Acquire => '+',
            LockAction::Release => '-',
        };
        write!(f, "{}{}", sign, self.subject)
    }
}
