//! micropub-git - A Micropub endpoint that publishes to a GitHub repository
//!
//! Create requests (micro-format JSON or form-encoded) are normalized into a
//! canonical document, rendered as a front-matter file, and committed to a
//! branch of a static site's repository through GitHub's git data API. Every
//! publish is exactly one commit or no change at all.
//!
//! # Architecture
//!
//! - [`mf2`] - Request validation and normalization into a [`mf2::Document`]
//! - [`post`] - Path and permalink resolution, front-matter formatting
//! - [`engine`] - Atomic multi-file commits with compare-and-swap ref updates
//! - [`store`] - Remote object store: GitHub adapter and in-memory mock
//! - [`preview`] - Optional link preview enrichment
//! - [`publisher`] - The pipeline from request to commit
//! - [`server`] - axum HTTP surface and authorization
//! - [`core`] - Strong types and configuration
//! - [`cli`] - Command-line interface
//!
//! # Correctness Invariants
//!
//! 1. A new commit's only parent is the tip observed before writing
//! 2. Nothing reachable changes until the single ref update
//! 3. A moved branch is reported as a conflict, never rebased over
//! 4. Normalization is idempotent for documents that carry `published`

pub mod cli;
pub mod core;
pub mod engine;
pub mod mf2;
pub mod post;
pub mod preview;
pub mod publisher;
pub mod server;
pub mod store;
