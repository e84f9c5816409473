//! Error taxonomy for trace parsing and tree assembly
//!
//! Every variant is fatal: the reconstructed tree is only correct if every
//! event in the log is consistent, so the parser fails fast with a diagnostic
//! identifying the pid and/or offending line instead of emitting a partial
//! tree. Unfinished or restarted spawn syscalls are not errors and never
//! reach this module.

use crate::process::Pid;
use thiserror::Error;

/// Result alias used throughout the reconstruction core.
pub type Result<T> = std::result::Result<T, TraceError>;

/// Fatal conditions raised while scanning a trace or assembling the tree.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A time-of-day field could not be split into its numeric components.
    #[error("malformed timestamp {text:?}: expected HH:MM:SS.ffffff")]
    MalformedTimestamp { text: String },

    /// An `exit_group` was seen with no matching open syscall.
    #[error("unbalanced exit for pid {pid}: {line}")]
    UnbalancedExit { pid: Pid, line: String },

    /// The same child pid was claimed by two different spawning processes.
    #[error("child pid {child} claimed by pid {claimed}, already spawned by pid {existing}")]
    AmbiguousParent {
        child: Pid,
        existing: Pid,
        claimed: Pid,
    },

    /// A non-root pid was never recorded as any process's child.
    #[error("pid {pid} was never spawned by any traced process")]
    OrphanProcess { pid: Pid },

    /// The stream ended while a process still had an open syscall, or a pid
    /// produced events but never an `execve`.
    #[error("truncated trace: pid {pid} has no completed syscall record")]
    TruncatedTrace { pid: Pid },

    /// An event timestamp preceded the trace's zero point or its own call
    /// start. The log format carries time of day only, so a trace crossing
    /// midnight surfaces here.
    #[error("timestamp went backwards (single-day traces only): {line}")]
    NonMonotonicTimestamp { line: String },

    /// The stream contained no events at all.
    #[error("trace stream contained no events")]
    EmptyTrace,

    /// The underlying reader failed.
    #[error("failed to read trace stream")]
    Io(#[from] std::io::Error),
}
