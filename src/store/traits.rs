//! store::traits
//!
//! The object store trait: the five git-data primitives the commit engine
//! needs, plus tree reads for inspection.
//!
//! # Design
//!
//! The trait is async because every call is a network round-trip. Store
//! coordinates (repository, credentials, API base) are bound at
//! construction; callers only name branches and object ids.
//!
//! Nothing is cached across calls. A store never retries on its own.
//!
//! # Example
//!
//! ```
//! use micropub_git::core::types::BranchName;
//! use micropub_git::store::mock::MockStore;
//! use micropub_git::store::ObjectStore;
//!
//! # tokio_test::block_on(async {
//! let branch = BranchName::new("master").unwrap();
//! let store = MockStore::with_branch(&branch);
//!
//! let tip = store.get_ref(&branch).await.unwrap();
//! let commit = store.get_commit(&tip).await.unwrap();
//! assert!(store.get_tree(&commit.tree).await.unwrap().is_empty());
//! # });
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, Oid};

/// File mode of a regular, non-executable blob.
pub const BLOB_MODE: &str = "100644";

/// Errors from object store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Credentials were rejected or lack permission.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The branch or object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The ref moved since it was read; the update was not applied.
    #[error("ref update rejected: {0}")]
    Conflict(String),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,
}

/// The parts of a commit the engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitObject {
    pub sha: Oid,
    pub tree: Oid,
}

/// One entry of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    /// Object the entry points at.
    pub blob: Oid,
}

impl TreeEntry {
    /// A regular file entry.
    pub fn file(path: impl Into<String>, blob: Oid) -> Self {
        Self {
            path: path.into(),
            mode: BLOB_MODE.to_string(),
            blob,
        }
    }
}

/// Content-addressed object store with a mutable branch table.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine issues blob uploads
/// concurrently against one store.
///
/// # Error Handling
///
/// `update_ref` reports a moved branch as [`StoreError::Conflict`]. Every
/// other failure is reported as-is and is never retried here.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Tip commit of `branch`.
    async fn get_ref(&self, branch: &BranchName) -> Result<Oid, StoreError>;

    /// Read a commit.
    async fn get_commit(&self, sha: &Oid) -> Result<CommitObject, StoreError>;

    /// Read the top-level entries of a tree.
    async fn get_tree(&self, sha: &Oid) -> Result<Vec<TreeEntry>, StoreError>;

    /// Store `content` as a blob.
    async fn create_blob(&self, content: &[u8]) -> Result<Oid, StoreError>;

    /// Create a tree equal to `base` with `entries` added or replaced.
    async fn create_tree(&self, base: &Oid, entries: &[TreeEntry]) -> Result<Oid, StoreError>;

    /// Create a commit with a single parent.
    async fn create_commit(
        &self,
        message: &str,
        tree: &Oid,
        parent: &Oid,
    ) -> Result<Oid, StoreError>;

    /// Move `branch` from `expected` to `new` without forcing.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if the branch no longer points at `expected`.
    async fn update_ref(
        &self,
        branch: &BranchName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<(), StoreError>;
}
