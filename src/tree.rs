//! Assembled process tree and the duration threshold filter
//!
//! This is the logical output shape handed to the serializer/visualizer:
//! a version tag, the root pid, the pid-indexed process map, and a timeline
//! of pids sorted by start time for the waterfall renderer.

use crate::process::{Pid, Process};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Output format version, carried over from the original analysis format.
pub const FORMAT_VERSION: u32 = 100;

/// Filter settings echoed into the output for the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeProperties {
    /// Minimal process duration kept, in milliseconds.
    pub threshold_ms: i64,
}

/// The reconstructed process tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessTree {
    pub version: u32,
    pub root: Pid,
    pub processes: HashMap<Pid, Process>,
    /// Pids ordered by process start time (pid breaks ties, for determinism).
    pub timeline: Vec<Pid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<TreeProperties>,
}

impl ProcessTree {
    pub fn new(root: Pid, processes: HashMap<Pid, Process>) -> Self {
        let timeline = build_timeline(&processes);
        Self {
            version: FORMAT_VERSION,
            root,
            processes,
            timeline,
            properties: None,
        }
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Drop every process shorter than `min_duration_ms`, except the root,
    /// which is always retained.
    ///
    /// Children of a dropped process are left attached to their now-absent
    /// parent pid on purpose: the reference viewer tolerates dangling
    /// parents, and reparenting to the nearest surviving ancestor would
    /// change what the waterfall shows. Changing this needs consumer
    /// sign-off.
    pub fn apply_threshold(&mut self, min_duration_ms: i64) {
        let root = self.root;
        let before = self.processes.len();
        self.processes
            .retain(|&pid, process| pid == root || process.duration >= min_duration_ms);
        self.timeline = build_timeline(&self.processes);
        self.properties = Some(TreeProperties {
            threshold_ms: min_duration_ms,
        });
        debug!(
            dropped = before - self.processes.len(),
            kept = self.processes.len(),
            min_duration_ms,
            "threshold filter applied"
        );
    }

    /// Serialize the tree to compact JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize the tree to human-readable JSON.
    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn build_timeline(processes: &HashMap<Pid, Process>) -> Vec<Pid> {
    let mut timeline: Vec<Pid> = processes.keys().copied().collect();
    timeline.sort_by_key(|pid| (processes[pid].start, *pid));
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ProcessKind, ROOT_PID};

    fn process(pid: Pid, parent: Pid, start: i64, end: i64) -> Process {
        Process {
            pid,
            parent,
            kind: ProcessKind::Unknown,
            start,
            end,
            duration: end - start,
            children: Vec::new(),
            syscalls: Vec::new(),
        }
    }

    fn sample_tree() -> ProcessTree {
        let mut processes = HashMap::new();
        processes.insert(ROOT_PID, process(ROOT_PID, ROOT_PID, 0, 40));
        processes.insert(101, process(101, ROOT_PID, 10, 60));
        processes.insert(102, process(102, ROOT_PID, 5, 500));
        ProcessTree::new(ROOT_PID, processes)
    }

    #[test]
    fn test_timeline_sorted_by_start() {
        let tree = sample_tree();
        assert_eq!(tree.timeline, vec![ROOT_PID, 102, 101]);
    }

    #[test]
    fn test_timeline_tie_break_is_deterministic() {
        let mut processes = HashMap::new();
        processes.insert(ROOT_PID, process(ROOT_PID, ROOT_PID, 0, 100));
        processes.insert(7, process(7, ROOT_PID, 0, 100));
        processes.insert(3, process(3, ROOT_PID, 0, 100));
        let tree = ProcessTree::new(ROOT_PID, processes);
        assert_eq!(tree.timeline, vec![ROOT_PID, 3, 7]);
    }

    #[test]
    fn test_threshold_drops_short_processes() {
        let mut tree = sample_tree();
        tree.apply_threshold(100);

        // pid 101 (50 ms) is below the cutoff, and so is the 40 ms root, but
        // the root survives regardless.
        assert!(tree.get(101).is_none());
        assert!(tree.get(102).is_some());
        assert!(tree.get(ROOT_PID).is_some());
        assert_eq!(tree.timeline, vec![ROOT_PID, 102]);
        assert_eq!(tree.properties, Some(TreeProperties { threshold_ms: 100 }));
    }

    #[test]
    fn test_threshold_zero_keeps_everything() {
        let mut tree = sample_tree();
        tree.apply_threshold(0);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_threshold_does_not_reparent() {
        let mut processes = HashMap::new();
        let mut root = process(ROOT_PID, ROOT_PID, 0, 1000);
        root.children.push(101);
        processes.insert(ROOT_PID, root);
        let mut shell = process(101, ROOT_PID, 10, 30);
        shell.children.push(102);
        processes.insert(101, shell);
        processes.insert(102, process(102, 101, 15, 900));

        let mut tree = ProcessTree::new(ROOT_PID, processes);
        tree.apply_threshold(100);

        // The grandchild survives but still names the dropped shell as its
        // parent; the consumer has to tolerate the dangling edge.
        assert!(tree.get(101).is_none());
        assert_eq!(tree.get(102).unwrap().parent, 101);
    }

    #[test]
    fn test_json_shape() {
        let json = sample_tree().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 100);
        assert_eq!(value["root"], 0);
        assert!(value["processes"]["101"].is_object());
        assert_eq!(value["processes"]["101"]["type"], "unknown");
        assert_eq!(value["processes"]["101"]["duration"], 50);
        // No filter applied, so no properties block.
        assert!(value.get("properties").is_none());
    }

    #[test]
    fn test_json_omits_open_record_end() {
        let mut tree = sample_tree();
        tree.processes
            .get_mut(&101)
            .unwrap()
            .syscalls
            .push(crate::process::SyscallRecord {
                command: "execve(\"/bin/sh\", ...".to_string(),
                start: 10,
                end: None,
                duration: None,
                children: vec![102],
            });
        let json = tree.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let record = &value["processes"]["101"]["syscalls"][0];
        assert_eq!(record["cmd"], "execve(\"/bin/sh\", ...");
        assert!(record.get("end").is_none());
        assert!(record.get("duration").is_none());
    }
}
