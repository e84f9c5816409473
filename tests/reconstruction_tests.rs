//! End-to-end reconstruction tests over a realistic filtered strace log
//!
//! The fixture covers the notations that show up in real `strace -ftts` logs
//! of a parallel make: interleaved pids, unfinished/resumed vfork and execve,
//! a restarted vfork, and the status lines following exits.

use buildtrace::assembler::TreeAssembler;
use buildtrace::process::{ProcessKind, ROOT_PID};
use buildtrace::tree::ProcessTree;
use std::fs::File;
use std::io::BufReader;

fn fixture_tree() -> ProcessTree {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/make.log");
    let file = File::open(path).expect("fixture log");
    TreeAssembler::reconstruct(BufReader::new(file)).expect("fixture log is consistent")
}

#[test]
fn test_fixture_process_count_and_root() {
    let tree = fixture_tree();
    assert_eq!(tree.len(), 5);
    assert_eq!(tree.root, ROOT_PID);
    assert_eq!(tree.version, 100);
}

#[test]
fn test_fixture_parent_edges() {
    let tree = fixture_tree();
    assert_eq!(tree.get(ROOT_PID).unwrap().children, vec![101, 102]);
    assert_eq!(tree.get(101).unwrap().children, vec![103]);
    // The restarted vfork on pid 102 contributes no edge; only pid 104 does.
    assert_eq!(tree.get(102).unwrap().children, vec![104]);
    assert_eq!(tree.get(103).unwrap().parent, 101);
    assert_eq!(tree.get(104).unwrap().parent, 102);
}

#[test]
fn test_fixture_durations_and_kinds() {
    let tree = fixture_tree();

    let root = tree.get(ROOT_PID).unwrap();
    assert_eq!(root.kind, ProcessKind::Make);
    assert_eq!((root.start, root.end, root.duration), (0, 900, 900));

    let shell = tree.get(101).unwrap();
    assert_eq!(shell.kind, ProcessKind::Sh);
    assert_eq!(shell.duration, 430);

    let gcc = tree.get(103).unwrap();
    assert_eq!(gcc.kind, ProcessKind::Cc);
    assert_eq!((gcc.start, gcc.end, gcc.duration), (130, 480, 350));
    // The interrupted execve plus its resumed line yield exactly one record.
    assert_eq!(gcc.syscalls.len(), 1);

    let gpp = tree.get(104).unwrap();
    assert_eq!(gpp.kind, ProcessKind::Cpp);
    assert_eq!(gpp.duration, 450);
}

#[test]
fn test_fixture_invariants_hold() {
    let tree = fixture_tree();
    for process in tree.processes.values() {
        assert!(process.duration >= 0);
        assert_eq!(process.duration, process.end - process.start);
        assert!(process.start <= process.end);
        if process.pid != tree.root {
            let parent = tree.get(process.parent).expect("parent present");
            assert!(parent.children.contains(&process.pid));
        }
    }
    let roots = tree
        .processes
        .values()
        .filter(|p| p.pid == p.parent)
        .count();
    assert_eq!(roots, 1);
}

#[test]
fn test_fixture_timeline_sorted_by_start() {
    let tree = fixture_tree();
    assert_eq!(tree.timeline, vec![ROOT_PID, 101, 102, 103, 104]);
    let starts: Vec<i64> = tree
        .timeline
        .iter()
        .map(|pid| tree.get(*pid).unwrap().start)
        .collect();
    let mut sorted = starts.clone();
    sorted.sort_unstable();
    assert_eq!(starts, sorted);
}

#[test]
fn test_fixture_threshold_filtering() {
    let mut tree = fixture_tree();
    tree.apply_threshold(500);

    // Only pid 102 (560 ms) clears the bar; the root is kept regardless.
    assert!(tree.get(ROOT_PID).is_some());
    assert!(tree.get(102).is_some());
    assert!(tree.get(101).is_none());
    assert!(tree.get(103).is_none());
    assert!(tree.get(104).is_none());
    assert_eq!(tree.timeline, vec![ROOT_PID, 102]);
}

#[test]
fn test_fixture_root_kept_below_threshold() {
    let mut tree = fixture_tree();
    tree.apply_threshold(10_000);
    assert_eq!(tree.len(), 1);
    assert!(tree.get(ROOT_PID).is_some());
}

#[test]
fn test_fixture_reconstruction_is_idempotent() {
    assert_eq!(fixture_tree(), fixture_tree());
}

#[test]
fn test_fixture_json_round_trip_shape() {
    let tree = fixture_tree();
    let value: serde_json::Value = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
    assert_eq!(value["version"], 100);
    assert_eq!(value["root"], 0);
    assert_eq!(value["processes"]["103"]["type"], "cc");
    assert_eq!(value["processes"]["103"]["parent"], 101);
    assert_eq!(value["processes"]["0"]["type"], "make");
    assert_eq!(value["timeline"].as_array().unwrap().len(), 5);
}
