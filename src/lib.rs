//! Buildtrace - reconstructs a build's process tree from a kernel-syscall trace
//!
//! Feed it a filtered strace log of a parallel build
//! (`strace -ftts 1024 make -Bsj12 2>&1 | egrep 'exit_group|vfork|execve'`)
//! and it produces a process tree with start/end/duration, parent/child
//! edges, and a semantic role per process, ready for a waterfall visualizer.
//!
//! The core is a single-pass streaming parser: [`assembler::TreeAssembler`]
//! classifies each line into an [`event::Event`], mutates the per-pid
//! [`process::ProcessState`], and folds everything into a
//! [`tree::ProcessTree`] once the stream ends.

pub mod assembler;
pub mod cli;
pub mod error;
pub mod event;
pub mod process;
pub mod timestamp;
pub mod tree;
