//! store::mock
//!
//! In-memory object store for deterministic testing.
//!
//! # Design
//!
//! Objects are content-addressed with [`Oid::hash_object`], so identical
//! content yields identical ids. Trees are flat maps from full path to
//! entry; that is enough to observe what a commit contains without
//! modelling nested directories.
//!
//! `update_ref` is a true compare-and-swap against the expected tip.
//! Failures can be injected per operation, and a concurrent writer can be
//! scheduled to move the branch just before the next ref update.
//!
//! # Example
//!
//! ```
//! use micropub_git::core::types::BranchName;
//! use micropub_git::store::mock::{FailOn, MockStore};
//! use micropub_git::store::{ObjectStore, StoreError};
//!
//! # tokio_test::block_on(async {
//! let branch = BranchName::new("master").unwrap();
//! let store = MockStore::with_branch(&branch)
//!     .fail_on(FailOn::CreateBlob { nth: 1, error: StoreError::Timeout });
//!
//! assert_eq!(store.create_blob(b"x").await, Err(StoreError::Timeout));
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{CommitObject, ObjectStore, StoreError, TreeEntry};
use crate::core::types::{BranchName, Oid};

/// Message of the commit made by a simulated concurrent writer.
pub const CONCURRENT_MESSAGE: &str = "concurrent write";

/// Mock object store for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

#[derive(Debug, Clone)]
enum Object {
    Blob(Vec<u8>),
    Tree(BTreeMap<String, TreeEntry>),
    Commit {
        tree: Oid,
        parents: Vec<Oid>,
        message: String,
    },
}

#[derive(Debug, Default)]
struct MockStoreInner {
    objects: HashMap<Oid, Object>,
    /// Branch name to tip commit.
    refs: HashMap<String, Oid>,
    fail_on: Option<FailOn>,
    /// Number of `create_blob` calls so far.
    blob_calls: usize,
    /// Move the branch before the next `update_ref`.
    race_next_update: bool,
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetRef(StoreError),
    GetCommit(StoreError),
    /// Fail the `nth` (1-based) `create_blob` call.
    CreateBlob { nth: usize, error: StoreError },
    CreateTree(StoreError),
    CreateCommit(StoreError),
    UpdateRef(StoreError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRef { branch: String },
    GetCommit { sha: Oid },
    GetTree { sha: Oid },
    CreateBlob { len: usize },
    CreateTree { base: Oid, paths: Vec<String> },
    CreateCommit { tree: Oid, parent: Oid },
    UpdateRef { branch: String, new: Oid, expected: Oid },
}

impl MockOperation {
    /// Whether this operation creates a tree or commit, or moves a ref.
    pub fn is_graph_mutation(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateTree { .. }
                | MockOperation::CreateCommit { .. }
                | MockOperation::UpdateRef { .. }
        )
    }
}

impl MockStoreInner {
    fn insert(&mut self, object: Object) -> Oid {
        let oid = match &object {
            Object::Blob(bytes) => Oid::hash_object("blob", bytes),
            Object::Tree(entries) => {
                let mut payload = Vec::new();
                for entry in entries.values() {
                    payload.extend_from_slice(
                        format!("{} {}\0{}\n", entry.mode, entry.path, entry.blob).as_bytes(),
                    );
                }
                Oid::hash_object("tree", &payload)
            }
            Object::Commit {
                tree,
                parents,
                message,
            } => {
                let mut payload = format!("tree {}\n", tree);
                for parent in parents {
                    payload.push_str(&format!("parent {}\n", parent));
                }
                payload.push('\n');
                payload.push_str(message);
                Oid::hash_object("commit", payload.as_bytes())
            }
        };
        self.objects.insert(oid.clone(), object);
        oid
    }

    fn commit_on(&mut self, branch: &str, files: &[(&str, &[u8])], message: &str) -> Oid {
        let parent = self.refs.get(branch).cloned();
        let mut entries = match parent.as_ref().and_then(|p| self.tree_of(p)) {
            Some(entries) => entries.clone(),
            None => BTreeMap::new(),
        };
        for (path, bytes) in files {
            let blob = self.insert(Object::Blob(bytes.to_vec()));
            entries.insert(path.to_string(), TreeEntry::file(*path, blob));
        }
        let tree = self.insert(Object::Tree(entries));
        let commit = self.insert(Object::Commit {
            tree,
            parents: parent.into_iter().collect(),
            message: message.to_string(),
        });
        self.refs.insert(branch.to_string(), commit.clone());
        commit
    }

    fn tree_of(&self, commit: &Oid) -> Option<&BTreeMap<String, TreeEntry>> {
        match self.objects.get(commit)? {
            Object::Commit { tree, .. } => match self.objects.get(tree)? {
                Object::Tree(entries) => Some(entries),
                _ => None,
            },
            _ => None,
        }
    }
}

impl MockStore {
    /// Create an empty store with no branches.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockStoreInner::default())),
        }
    }

    /// Create a store whose `branch` points at an initial empty commit.
    pub fn with_branch(branch: &BranchName) -> Self {
        Self::with_files(branch, &[])
    }

    /// Create a store whose `branch` has one commit holding `files`.
    pub fn with_files(branch: &BranchName, files: &[(&str, &[u8])]) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap();
            inner.commit_on(branch.as_str(), files, "initial");
        }
        store
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Have a concurrent writer commit to the branch right before the next
    /// `update_ref`, which then sees a moved tip.
    pub fn race_next_update(self) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.race_next_update = true;
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Current tip of `branch` (for test verification).
    pub fn tip(&self, branch: &BranchName) -> Option<Oid> {
        let inner = self.inner.lock().unwrap();
        inner.refs.get(branch.as_str()).cloned()
    }

    /// Contents of `path` in the tip of `branch`.
    pub fn read_file(&self, branch: &BranchName, path: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        let tip = inner.refs.get(branch.as_str())?;
        let entry = inner.tree_of(tip)?.get(path)?;
        match inner.objects.get(&entry.blob)? {
            Object::Blob(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Parents and message of a commit.
    pub fn commit_info(&self, sha: &Oid) -> Option<(Vec<Oid>, String)> {
        let inner = self.inner.lock().unwrap();
        match inner.objects.get(sha)? {
            Object::Commit {
                parents, message, ..
            } => Some((parents.clone(), message.clone())),
            _ => None,
        }
    }

    /// Number of stored objects of every kind.
    pub fn object_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.objects.len()
    }

    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if expected == "create_blob" {
            inner.blob_calls += 1;
        }
        let blob_calls = inner.blob_calls;
        match &inner.fail_on {
            Some(FailOn::GetRef(e)) if expected == "get_ref" => Err(e.clone()),
            Some(FailOn::GetCommit(e)) if expected == "get_commit" => Err(e.clone()),
            Some(FailOn::CreateBlob { nth, error })
                if expected == "create_blob" && *nth == blob_calls =>
            {
                Err(error.clone())
            }
            Some(FailOn::CreateTree(e)) if expected == "create_tree" => Err(e.clone()),
            Some(FailOn::CreateCommit(e)) if expected == "create_commit" => Err(e.clone()),
            Some(FailOn::UpdateRef(e)) if expected == "update_ref" => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_ref(&self, branch: &BranchName) -> Result<Oid, StoreError> {
        self.record(MockOperation::GetRef {
            branch: branch.to_string(),
        });
        self.check_fail("get_ref")?;

        let inner = self.inner.lock().unwrap();
        inner
            .refs
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("branch {}", branch)))
    }

    async fn get_commit(&self, sha: &Oid) -> Result<CommitObject, StoreError> {
        self.record(MockOperation::GetCommit { sha: sha.clone() });
        self.check_fail("get_commit")?;

        let inner = self.inner.lock().unwrap();
        match inner.objects.get(sha) {
            Some(Object::Commit { tree, .. }) => Ok(CommitObject {
                sha: sha.clone(),
                tree: tree.clone(),
            }),
            _ => Err(StoreError::NotFound(format!("commit {}", sha))),
        }
    }

    async fn get_tree(&self, sha: &Oid) -> Result<Vec<TreeEntry>, StoreError> {
        self.record(MockOperation::GetTree { sha: sha.clone() });

        let inner = self.inner.lock().unwrap();
        match inner.objects.get(sha) {
            Some(Object::Tree(entries)) => Ok(entries.values().cloned().collect()),
            _ => Err(StoreError::NotFound(format!("tree {}", sha))),
        }
    }

    async fn create_blob(&self, content: &[u8]) -> Result<Oid, StoreError> {
        self.record(MockOperation::CreateBlob {
            len: content.len(),
        });
        self.check_fail("create_blob")?;

        let mut inner = self.inner.lock().unwrap();
        Ok(inner.insert(Object::Blob(content.to_vec())))
    }

    async fn create_tree(&self, base: &Oid, entries: &[TreeEntry]) -> Result<Oid, StoreError> {
        self.record(MockOperation::CreateTree {
            base: base.clone(),
            paths: entries.iter().map(|e| e.path.clone()).collect(),
        });
        self.check_fail("create_tree")?;

        let mut inner = self.inner.lock().unwrap();
        let mut merged = match inner.objects.get(base) {
            Some(Object::Tree(existing)) => existing.clone(),
            _ => return Err(StoreError::NotFound(format!("tree {}", base))),
        };
        for entry in entries {
            if !matches!(inner.objects.get(&entry.blob), Some(Object::Blob(_))) {
                return Err(StoreError::Api {
                    status: 422,
                    message: format!("blob {} does not exist", entry.blob),
                });
            }
            merged.insert(entry.path.clone(), entry.clone());
        }
        Ok(inner.insert(Object::Tree(merged)))
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &Oid,
        parent: &Oid,
    ) -> Result<Oid, StoreError> {
        self.record(MockOperation::CreateCommit {
            tree: tree.clone(),
            parent: parent.clone(),
        });
        self.check_fail("create_commit")?;

        let mut inner = self.inner.lock().unwrap();
        if !matches!(inner.objects.get(tree), Some(Object::Tree(_))) {
            return Err(StoreError::NotFound(format!("tree {}", tree)));
        }
        if !matches!(inner.objects.get(parent), Some(Object::Commit { .. })) {
            return Err(StoreError::NotFound(format!("commit {}", parent)));
        }
        Ok(inner.insert(Object::Commit {
            tree: tree.clone(),
            parents: vec![parent.clone()],
            message: message.to_string(),
        }))
    }

    async fn update_ref(
        &self,
        branch: &BranchName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<(), StoreError> {
        self.record(MockOperation::UpdateRef {
            branch: branch.to_string(),
            new: new.clone(),
            expected: expected.clone(),
        });
        self.check_fail("update_ref")?;

        let mut inner = self.inner.lock().unwrap();
        if std::mem::take(&mut inner.race_next_update) {
            let path = format!("concurrent-{}.md", inner.operations.len());
            inner.commit_on(
                branch.as_str(),
                &[(path.as_str(), b"interloper".as_slice())],
                CONCURRENT_MESSAGE,
            );
        }

        let current = inner.refs.get(branch.as_str()).cloned();
        match current {
            Some(current) if &current == expected => {
                inner.refs.insert(branch.to_string(), new.clone());
                Ok(())
            }
            Some(current) => Err(StoreError::Conflict(format!(
                "{} is at {}, expected {}",
                branch,
                current.short(7),
                expected.short(7)
            ))),
            None => Err(StoreError::NotFound(format!("branch {}", branch))),
        }
    }
}
