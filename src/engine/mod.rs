//! engine
//!
//! The atomic commit engine.
//!
//! # Architecture
//!
//! The engine is the only component that writes to the content repository.
//! It turns a set of files into exactly one commit on a branch, or into
//! nothing at all:
//!
//! 1. **Resolve**: read the branch tip and its root tree
//! 2. **Upload**: create every blob, concurrently
//! 3. **Assemble**: create a tree over the old root, then a commit
//! 4. **Publish**: move the branch with compare-and-swap semantics
//!
//! Steps 1-3 only add unreachable, content-addressed objects. Step 4 is the
//! single mutation and either applies completely or reports a conflict.

pub mod commit;

pub use commit::{CommitEngine, CommitError, CommitOutcome, FileSet};
