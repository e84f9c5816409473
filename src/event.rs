//! Line classification for filtered strace logs
//!
//! Each input line is classified into a closed [`Event`] variant before any
//! state is touched, so the assembler's state machine dispatches over a tagged
//! enum instead of re-inspecting raw text at every transition.
//!
//! Two physical line shapes exist: a bracketed-pid form (`[pid 1234] ...` or
//! `[1234] ...`) and an implicit-pid form that always belongs to the root
//! process, since strace never prints the master process's own pid.

use crate::error::{Result, TraceError};
use crate::process::{Pid, ROOT_PID};
use crate::timestamp;
use tracing::debug;

/// Marker strace prints when a syscall's completion was logged separately.
pub const EXECVE_RESUMED: &str = "<... execve resumed>";

/// One classified trace event. Produced per line and consumed immediately.
///
/// Times are raw milliseconds since midnight; the assembler rebases them
/// against the stream's zero point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `execve(...)`: a process image starts. The invocation text is kept
    /// verbatim for later role classification.
    Start {
        pid: Pid,
        time: i64,
        command: String,
    },
    /// `<... execve resumed> ...`: continuation of an interrupted start.
    /// Carries no timing or argv beyond what the original start recorded.
    StartResumed { pid: Pid, time: i64 },
    /// `exit_group(...)`: closes the pid's open syscall record.
    Exit { pid: Pid, time: i64 },
    /// `vfork`/`clone` that completed and returned a child pid.
    Spawn { pid: Pid, time: i64, child: Pid },
    /// `vfork`/`clone` that did not actually complete (unfinished call or
    /// kernel restart after a signal). Expected and frequent; never an error.
    SpawnUnfinished { pid: Pid },
    /// Status lines, call-return continuations, and unrelated syscalls.
    Ignorable,
}

/// Classify one raw log line.
///
/// Fails only on an unparsable timestamp; everything unrecognized is
/// [`Event::Ignorable`].
pub fn classify(line: &str) -> Result<Event> {
    // exit_group calls are followed by a "Process <pid> ..." status line,
    // vfork calls by a line carrying just the closing parenthesis and return
    // value. Neither is an event.
    if line.starts_with("Process ") || line.starts_with(") ") {
        return Ok(Event::Ignorable);
    }

    let (pid, rest) = match split_pid(line) {
        Some(split) => split,
        None => {
            debug!(line, "unparsable pid field, skipping line");
            return Ok(Event::Ignorable);
        }
    };

    let Some((time_text, command)) = rest.trim_start().split_once(char::is_whitespace) else {
        return Ok(Event::Ignorable);
    };
    let time = timestamp::decode(time_text)?;
    let command = command.trim();

    if command.starts_with("execve") {
        return Ok(Event::Start {
            pid,
            time,
            command: command.to_string(),
        });
    }
    if command.starts_with(EXECVE_RESUMED) {
        return Ok(Event::StartResumed { pid, time });
    }
    if command.starts_with("exit_group") {
        return Ok(Event::Exit { pid, time });
    }
    if is_spawn_call(command) {
        return Ok(classify_spawn(pid, time, command));
    }

    Ok(Event::Ignorable)
}

/// Split off the bracketed pid, if any. Implicit-pid lines belong to the
/// root process.
fn split_pid(line: &str) -> Option<(Pid, &str)> {
    let Some(bracketed) = line.strip_prefix('[') else {
        return Some((ROOT_PID, line));
    };
    let (field, rest) = bracketed.split_once(']')?;
    // Both "[pid 1234]" and "[1234]" occur in the wild.
    let pid = field
        .split_whitespace()
        .last()
        .and_then(|p| p.parse().ok())?;
    Some((pid, rest))
}

fn is_spawn_call(command: &str) -> bool {
    command.starts_with("vfork")
        || command.starts_with("clone")
        || command.starts_with("<... vfork resumed>")
        || command.starts_with("<... clone resumed>")
}

/// Parse the `= <child_pid>` return value of a completed spawn call.
///
/// Unfinished calls and restart-after-signal returns (`= ? ERESTART...`) mean
/// the call never actually produced a child and must be silently absorbed.
fn classify_spawn(pid: Pid, time: i64, command: &str) -> Event {
    if command.contains("<unfinished") || command.contains("ERESTART") {
        return Event::SpawnUnfinished { pid };
    }
    let child = command
        .rfind(") = ")
        .map(|pos| &command[pos + 4..])
        .and_then(|ret| ret.split_whitespace().next())
        .and_then(|ret| ret.parse::<Pid>().ok());
    match child {
        Some(child) => Event::Spawn { pid, time, child },
        // No return value on this line, or a failed fork (negative errno
        // return): either way there is no child edge to record.
        None => Event::SpawnUnfinished { pid },
    }
}
