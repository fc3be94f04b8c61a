//! store
//!
//! Remote object store abstraction.
//!
//! # Modules
//!
//! - [`traits`] - The `ObjectStore` trait and its types
//! - [`github`] - GitHub git data API implementation
//! - [`mock`] - In-memory implementation for tests
//!
//! Store coordinates and credentials are bound into each implementation at
//! construction; the commit engine only sees the trait.

pub mod github;
pub mod mock;
pub mod traits;

pub use github::{Credentials, GitHubStore};
pub use traits::{CommitObject, ObjectStore, StoreError, TreeEntry, BLOB_MODE};
