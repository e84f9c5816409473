//! Single-pass reconstruction of the process tree from a trace stream
//!
//! The assembler drives the line classifier over a forward-only stream, one
//! logical event per line, with no lookahead and no buffering beyond the
//! per-pid record stacks. Memory is proportional to the number of traced
//! processes, never to log size.
//!
//! The zero point of the timeline is the timestamp of the very first event,
//! which the log format guarantees belongs to the root process; every later
//! timestamp is stored as a millisecond offset from it. Spawn order across
//! pids is not strictly nested in the log, so no process can be considered
//! finished mid-stream; all states are folded into the tree only after the
//! stream ends.

use crate::error::{Result, TraceError};
use crate::event::{self, Event};
use crate::process::{Pid, ProcessState, ROOT_PID};
use crate::tree::ProcessTree;
use std::collections::HashMap;
use std::io::BufRead;
use tracing::{debug, trace};

/// Streaming scanner over a filtered strace log.
///
/// Owns all mutable scan state: the per-pid process states and the global
/// child-to-parent map. Nothing else mutates them for the lifetime of one
/// parse.
#[derive(Debug, Default)]
pub struct TreeAssembler {
    states: HashMap<Pid, ProcessState>,
    /// child pid -> spawning pid, first writer wins.
    parents: HashMap<Pid, Pid>,
    zero_time: Option<i64>,
    lines_seen: u64,
}

impl TreeAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a whole stream and assemble the tree in one call.
    pub fn reconstruct<R: BufRead>(reader: R) -> Result<ProcessTree> {
        let mut assembler = Self::new();
        assembler.scan(reader)?;
        assembler.assemble()
    }

    /// Consume the stream line by line. May be called repeatedly to feed a
    /// log split across readers.
    pub fn scan<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            self.consume_line(&line)?;
        }
        debug!(
            lines = self.lines_seen,
            pids = self.states.len(),
            "scan finished"
        );
        Ok(())
    }

    /// Classify and apply a single log line.
    pub fn consume_line(&mut self, line: &str) -> Result<()> {
        self.lines_seen += 1;
        if line.trim().is_empty() {
            return Ok(());
        }
        match event::classify(line)? {
            Event::Ignorable => {
                trace!(line, "ignorable line");
                Ok(())
            }
            Event::SpawnUnfinished { pid } => {
                // Unfinished or restarted vfork/clone: the call never
                // completed, so there is no edge to record.
                trace!(pid, line, "unfinished spawn");
                Ok(())
            }
            Event::Start { pid, time, command } => {
                let offset = self.offset(time, line)?;
                self.state(pid).begin_call(offset, command);
                Ok(())
            }
            Event::StartResumed { pid, time } => {
                // Continuation of an interrupted execve. The original start
                // line already carries timing and argv; creating a second
                // record here would double-count the call.
                self.offset(time, line)?;
                trace!(pid, "execve resumed");
                Ok(())
            }
            Event::Exit { pid, time } => {
                let offset = self.offset(time, line)?;
                self.state(pid).finish_call(offset, line)
            }
            Event::Spawn { pid, time, child } => {
                self.offset(time, line)?;
                self.record_spawn(pid, child)
            }
        }
    }

    fn record_spawn(&mut self, pid: Pid, child: Pid) -> Result<()> {
        match self.parents.get(&child) {
            Some(&existing) if existing != pid => Err(TraceError::AmbiguousParent {
                child,
                existing,
                claimed: pid,
            }),
            // The same parent can report one fork twice when the call and
            // its resumed return value are logged on separate lines.
            Some(_) => Ok(()),
            None => {
                self.parents.insert(child, pid);
                self.state(pid).record_child(child);
                Ok(())
            }
        }
    }

    /// Rebase a time-of-day value against the stream's zero point, pinning
    /// the zero point on first use.
    fn offset(&mut self, time_of_day: i64, line: &str) -> Result<i64> {
        let zero = *self.zero_time.get_or_insert(time_of_day);
        let offset = time_of_day - zero;
        if offset < 0 {
            return Err(TraceError::NonMonotonicTimestamp {
                line: line.to_string(),
            });
        }
        Ok(offset)
    }

    fn state(&mut self, pid: Pid) -> &mut ProcessState {
        self.states
            .entry(pid)
            .or_insert_with(|| ProcessState::new(pid))
    }

    /// Fold all per-pid states into the final tree.
    ///
    /// The root is the one pid with no entry in the parent map; every other
    /// pid must have been spawned by somebody, or the log is inconsistent.
    pub fn assemble(self) -> Result<ProcessTree> {
        let Self {
            states, parents, ..
        } = self;
        if states.is_empty() {
            return Err(TraceError::EmptyTrace);
        }

        let mut processes = HashMap::with_capacity(states.len());
        for (pid, state) in states {
            let parent = match parents.get(&pid) {
                Some(&parent) => parent,
                None if pid == ROOT_PID => ROOT_PID,
                None => return Err(TraceError::OrphanProcess { pid }),
            };
            processes.insert(pid, state.finalize(parent)?);
        }

        Ok(ProcessTree::new(ROOT_PID, processes))
    }
}
