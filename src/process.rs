//! Per-process state and the final process records
//!
//! During the scan every pid owns a mutable [`ProcessState`]: a stack of
//! syscall records (top = currently open) plus the list of children it
//! spawned. Once the stream is exhausted each state is finalized into an
//! immutable [`Process`] carrying derived start/end/duration and the semantic
//! role of the invoked command.

use crate::error::{Result, TraceError};
use crate::event::EXECVE_RESUMED;
use serde::Serialize;

/// Process identifier as printed by strace.
pub type Pid = u32;

/// Synthetic pid of the master build process. strace never prints the master
/// process's own pid (only bracketed child pids), so the root keeps this
/// sentinel, which doubles as the `parent` value of the root itself.
pub const ROOT_PID: Pid = 0;

/// Timing and metadata for one `execve` invocation and its completion.
///
/// `end` and `duration` stay unset while the call is open. A record left open
/// because the same process exec'd again (a shell replacing its image) keeps
/// them unset in the output; the process-level span covers it regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyscallRecord {
    /// Full invocation text, verbatim from the log.
    #[serde(rename = "cmd")]
    pub command: String,
    /// Start offset in ms from the trace's zero point.
    pub start: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Child pids spawned while this call was the pid's newest record.
    pub children: Vec<Pid>,
}

impl SyscallRecord {
    fn open(start: i64, command: String) -> Self {
        Self {
            command,
            start,
            end: None,
            duration: None,
            children: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Semantic role of a process, derived from its invoked command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    /// make / gmake
    Make,
    /// C++ compiler driver or cc1plus
    Cpp,
    /// C compiler driver or cc1
    Cc,
    /// Shell
    Sh,
    Unknown,
}

/// Mutable per-pid state, alive for the duration of one scan.
///
/// Invariant: at most one record is open at any time, except when a process
/// replaces its own image with a further `execve` before exiting; the earlier
/// record then stays open and only the newest one is ever closed.
#[derive(Debug)]
pub struct ProcessState {
    pid: Pid,
    calls: Vec<SyscallRecord>,
    spawned_children: Vec<Pid>,
}

impl ProcessState {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            calls: Vec::new(),
            spawned_children: Vec::new(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn calls(&self) -> &[SyscallRecord] {
        &self.calls
    }

    pub fn spawned_children(&self) -> &[Pid] {
        &self.spawned_children
    }

    /// A new `execve` starts: push an open record.
    pub fn begin_call(&mut self, start: i64, command: String) {
        self.calls.push(SyscallRecord::open(start, command));
    }

    /// `exit_group` seen: close the newest record.
    pub fn finish_call(&mut self, end: i64, line: &str) -> Result<()> {
        let call = match self.calls.last_mut() {
            Some(call) if call.is_open() => call,
            _ => {
                return Err(TraceError::UnbalancedExit {
                    pid: self.pid,
                    line: line.to_string(),
                })
            }
        };
        if end < call.start {
            return Err(TraceError::NonMonotonicTimestamp {
                line: line.to_string(),
            });
        }
        call.end = Some(end);
        call.duration = Some(end - call.start);
        Ok(())
    }

    /// A completed `vfork`/`clone` returned `child`: remember the edge and
    /// annotate the newest record, open or not.
    pub fn record_child(&mut self, child: Pid) {
        self.spawned_children.push(child);
        if let Some(call) = self.calls.last_mut() {
            call.children.push(child);
        }
    }

    /// Fold the scanned state into a final [`Process`].
    ///
    /// The process span runs from the first record's start to the last
    /// record's end; a record still open at end of stream means the log was
    /// cut short.
    pub fn finalize(self, parent: Pid) -> Result<Process> {
        let start = match self.calls.first() {
            Some(call) => call.start,
            None => return Err(TraceError::TruncatedTrace { pid: self.pid }),
        };
        let end = self
            .calls
            .last()
            .and_then(|call| call.end)
            .ok_or(TraceError::TruncatedTrace { pid: self.pid })?;
        let kind = classify_kind(&self.calls);
        Ok(Process {
            pid: self.pid,
            parent,
            kind,
            start,
            end,
            duration: end - start,
            children: self.spawned_children,
            syscalls: self.calls,
        })
    }
}

/// Final, immutable record for one traced process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pub pid: Pid,
    /// Spawning pid; [`ROOT_PID`] for the root itself.
    pub parent: Pid,
    #[serde(rename = "type")]
    pub kind: ProcessKind,
    pub start: i64,
    pub end: i64,
    pub duration: i64,
    /// Pids this process spawned, in spawn order.
    pub children: Vec<Pid>,
    pub syscalls: Vec<SyscallRecord>,
}

/// Classify a process's role from its last completed invocation.
///
/// Walks backward past any `<... execve resumed>` continuation text to reach
/// the record actually carrying the argument vector, slices the executable
/// path out of `execve("<path>", [...]`, and matches substrings in fixed
/// priority order: a C++ compiler path may also contain "cc", so order
/// matters.
pub fn classify_kind(calls: &[SyscallRecord]) -> ProcessKind {
    let mut iter = calls.iter().rev();
    let mut call = match iter.next() {
        Some(call) => call,
        None => return ProcessKind::Unknown,
    };
    for earlier in iter {
        if !call.command.starts_with(EXECVE_RESUMED) {
            break;
        }
        call = earlier;
    }

    let command = &call.command;
    let path = match command
        .strip_prefix("execve(\"")
        .and_then(|stripped| stripped.find("\", [").map(|end| &stripped[..end]))
    {
        Some(path) => path,
        None => command.as_str(),
    };

    if path.contains("/make") || path.contains("/gmake") {
        ProcessKind::Make
    } else if path.contains("/g++") || path.contains("/c++") || path.contains("/cc1plus") {
        ProcessKind::Cpp
    } else if path.contains("/gcc") || path.contains("/cc1") {
        ProcessKind::Cc
    } else if path.contains("/sh") {
        ProcessKind::Sh
    } else {
        ProcessKind::Unknown
    }
}
