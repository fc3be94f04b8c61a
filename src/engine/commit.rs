//! engine::commit
//!
//! Atomic multi-file commits on top of a remote branch.
//!
//! # Protocol
//!
//! ```text
//! get_ref -> get_commit -> create_blob x N (concurrent) -> create_tree
//!         -> create_commit -> update_ref(expected = tip read in step 1)
//! ```
//!
//! # Invariants
//!
//! - The new commit has exactly one parent: the tip read in step 1
//! - Nothing but content-addressed objects is written before the ref update,
//!   so a failure in any earlier step leaves the branch where it was
//! - A tip that moved in the meantime is a [`CommitError::Conflict`], never a
//!   silent rebase
//! - No retries
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use micropub_git::core::types::BranchName;
//! use micropub_git::engine::{CommitEngine, FileSet};
//! use micropub_git::store::mock::MockStore;
//!
//! # tokio_test::block_on(async {
//! let branch = BranchName::new("master").unwrap();
//! let store = MockStore::with_branch(&branch);
//! let engine = CommitEngine::new(Arc::new(store.clone()));
//!
//! let mut files = FileSet::new();
//! files.insert("content/hello.md", b"hello".to_vec());
//! let outcome = engine.commit(&files, "new post", &branch).await.unwrap();
//!
//! assert_eq!(store.tip(&branch), Some(outcome.commit));
//! assert_eq!(store.read_file(&branch, "content/hello.md"), Some(b"hello".to_vec()));
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{BranchName, Oid};
use crate::store::{ObjectStore, StoreError, TreeEntry};

/// Errors from a commit attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    /// The branch moved between reading the tip and updating it.
    #[error("branch '{branch}' moved away from {expected}: {detail}")]
    Conflict {
        branch: BranchName,
        expected: Oid,
        detail: String,
    },

    /// A remote call failed.
    #[error("remote store error: {0}")]
    Remote(#[from] StoreError),

    /// The file set was empty.
    #[error("nothing to commit")]
    NothingToCommit,
}

/// Files to write, keyed by repository path.
///
/// Later inserts for the same path replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file, returning the previous contents.
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) -> Option<Vec<u8>> {
        self.files.insert(path.into(), bytes)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(p, b)| (p.as_str(), b.as_slice()))
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The new branch tip.
    pub commit: Oid,
    /// The tip it was built on.
    pub parent: Oid,
    pub tree: Oid,
}

/// Writes file sets to a branch through an [`ObjectStore`].
#[derive(Clone)]
pub struct CommitEngine {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for CommitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitEngine")
            .field("store", &self.store.name())
            .finish()
    }
}

impl CommitEngine {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Commit `files` on top of `branch` as one commit.
    ///
    /// # Errors
    ///
    /// - [`CommitError::NothingToCommit`] for an empty set; the store is not
    ///   contacted
    /// - [`CommitError::Conflict`] if the branch moved
    /// - [`CommitError::Remote`] for any other store failure
    #[instrument(skip_all, fields(branch = %branch, files = files.len()))]
    pub async fn commit(
        &self,
        files: &FileSet,
        message: &str,
        branch: &BranchName,
    ) -> Result<CommitOutcome, CommitError> {
        if files.is_empty() {
            return Err(CommitError::NothingToCommit);
        }

        let parent = self.store.get_ref(branch).await?;
        let base = self.store.get_commit(&parent).await?;
        debug!(tip = %parent.short(7), tree = %base.tree.short(7), "resolved branch tip");

        // All uploads must land before anything references them.
        let blobs = try_join_all(files.iter().map(|(_, bytes)| self.store.create_blob(bytes))).await?;

        let entries: Vec<TreeEntry> = files
            .iter()
            .zip(blobs)
            .map(|((path, _), blob)| TreeEntry::file(path, blob))
            .collect();
        let tree = self.store.create_tree(&base.tree, &entries).await?;
        let commit = self.store.create_commit(message, &tree, &parent).await?;

        match self.store.update_ref(branch, &commit, &parent).await {
            Ok(()) => {}
            Err(StoreError::Conflict(detail)) => {
                warn!(expected = %parent.short(7), %detail, "branch moved, commit not applied");
                return Err(CommitError::Conflict {
                    branch: branch.clone(),
                    expected: parent,
                    detail,
                });
            }
            Err(other) => return Err(CommitError::Remote(other)),
        }

        info!(commit = %commit.short(7), parent = %parent.short(7), "branch updated");
        Ok(CommitOutcome {
            commit,
            parent,
            tree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::{FailOn, MockOperation, MockStore, CONCURRENT_MESSAGE};

    fn master() -> BranchName {
        BranchName::new("master").unwrap()
    }

    fn three_files() -> FileSet {
        let mut files = FileSet::new();
        files.insert("a.md", b"a".to_vec());
        files.insert("b.md", b"b".to_vec());
        files.insert("c.md", b"c".to_vec());
        files
    }

    fn engine(store: &MockStore) -> CommitEngine {
        CommitEngine::new(Arc::new(store.clone()))
    }

    mod success {
        use super::*;

        #[tokio::test]
        async fn commit_has_observed_tip_as_sole_parent() {
            let store = MockStore::with_files(&master(), &[("old.md", b"old".as_slice())]);
            let before = store.tip(&master()).unwrap();

            let outcome = engine(&store)
                .commit(&three_files(), "three files", &master())
                .await
                .unwrap();

            assert_eq!(outcome.parent, before);
            assert_eq!(store.tip(&master()), Some(outcome.commit.clone()));
            let (parents, message) = store.commit_info(&outcome.commit).unwrap();
            assert_eq!(parents, vec![before]);
            assert_eq!(message, "three files");
        }

        #[tokio::test]
        async fn base_tree_is_preserved() {
            let store = MockStore::with_files(&master(), &[("old.md", b"old".as_slice())]);
            engine(&store)
                .commit(&three_files(), "m", &master())
                .await
                .unwrap();
            assert_eq!(store.read_file(&master(), "old.md"), Some(b"old".to_vec()));
            assert_eq!(store.read_file(&master(), "b.md"), Some(b"b".to_vec()));
        }

        #[tokio::test]
        async fn protocol_order() {
            let store = MockStore::with_branch(&master());
            engine(&store)
                .commit(&three_files(), "m", &master())
                .await
                .unwrap();

            let ops = store.operations();
            assert!(matches!(ops[0], MockOperation::GetRef { .. }));
            assert!(matches!(ops[1], MockOperation::GetCommit { .. }));
            assert!(ops[2..5]
                .iter()
                .all(|op| matches!(op, MockOperation::CreateBlob { .. })));
            assert!(matches!(ops[5], MockOperation::CreateTree { .. }));
            assert!(matches!(ops[6], MockOperation::CreateCommit { .. }));
            assert!(matches!(ops[7], MockOperation::UpdateRef { .. }));
            assert_eq!(ops.len(), 8);
        }

        #[tokio::test]
        async fn ref_update_expects_observed_tip() {
            let store = MockStore::with_branch(&master());
            let before = store.tip(&master()).unwrap();
            engine(&store)
                .commit(&three_files(), "m", &master())
                .await
                .unwrap();
            let expected = store.operations().into_iter().find_map(|op| match op {
                MockOperation::UpdateRef { expected, .. } => Some(expected),
                _ => None,
            });
            assert_eq!(expected, Some(before));
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn empty_set_touches_nothing() {
            let store = MockStore::with_branch(&master());
            let err = engine(&store)
                .commit(&FileSet::new(), "m", &master())
                .await
                .unwrap_err();
            assert_eq!(err, CommitError::NothingToCommit);
            assert!(store.operations().is_empty());
        }

        #[tokio::test]
        async fn concurrent_writer_is_a_conflict() {
            let store = MockStore::with_branch(&master()).race_next_update();
            let before = store.tip(&master()).unwrap();

            let err = engine(&store)
                .commit(&three_files(), "m", &master())
                .await
                .unwrap_err();
            assert!(matches!(err, CommitError::Conflict { ref expected, .. } if *expected == before));

            let tip = store.tip(&master()).unwrap();
            assert_eq!(store.commit_info(&tip).unwrap().1, CONCURRENT_MESSAGE);
        }

        #[tokio::test]
        async fn second_blob_failure_leaves_branch_untouched() {
            let store = MockStore::with_branch(&master()).fail_on(FailOn::CreateBlob {
                nth: 2,
                error: StoreError::Api {
                    status: 500,
                    message: "boom".into(),
                },
            });
            let before = store.tip(&master()).unwrap();

            let err = engine(&store)
                .commit(&three_files(), "m", &master())
                .await
                .unwrap_err();
            assert!(matches!(err, CommitError::Remote(StoreError::Api { status: 500, .. })));
            assert_eq!(store.tip(&master()), Some(before));
            assert!(!store.operations().iter().any(MockOperation::is_graph_mutation));
        }

        #[tokio::test]
        async fn commit_failure_is_remote() {
            let store = MockStore::with_branch(&master())
                .fail_on(FailOn::CreateCommit(StoreError::Timeout));
            let before = store.tip(&master()).unwrap();
            let err = engine(&store)
                .commit(&three_files(), "m", &master())
                .await
                .unwrap_err();
            assert_eq!(err, CommitError::Remote(StoreError::Timeout));
            assert_eq!(store.tip(&master()), Some(before));
        }

        #[tokio::test]
        async fn missing_branch_is_remote_not_found() {
            let store = MockStore::new();
            let err = engine(&store)
                .commit(&three_files(), "m", &master())
                .await
                .unwrap_err();
            assert!(matches!(err, CommitError::Remote(StoreError::NotFound(_))));
        }
    }

    mod file_set {
        use super::*;

        #[test]
        fn later_insert_replaces() {
            let mut files = FileSet::new();
            assert!(files.insert("a", b"1".to_vec()).is_none());
            assert_eq!(files.insert("a", b"2".to_vec()), Some(b"1".to_vec()));
            assert_eq!(files.len(), 1);
            assert_eq!(files.get("a"), Some(b"2".as_slice()));
        }

        #[test]
        fn iterates_in_path_order() {
            let mut files = FileSet::new();
            files.insert("z", vec![]);
            files.insert("a", vec![]);
            let paths: Vec<_> = files.iter().map(|(p, _)| p).collect();
            assert_eq!(paths, vec!["a", "z"]);
        }
    }
}
