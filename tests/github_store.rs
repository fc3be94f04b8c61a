//! GitHub adapter tests against a local HTTP double.
//!
//! These pin the git data API request shapes, the status mapping, and the
//! conflict and timeout behavior of the ref update.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use micropub_git::core::types::{BranchName, Oid, RepoId};
use micropub_git::engine::{CommitEngine, CommitError, FileSet};
use micropub_git::store::{Credentials, GitHubStore, ObjectStore, StoreError};

const TIP: &str = "1111111111111111111111111111111111111111";
const BASE_TREE: &str = "2222222222222222222222222222222222222222";
const BLOB: &str = "3333333333333333333333333333333333333333";
const NEW_TREE: &str = "4444444444444444444444444444444444444444";
const NEW_COMMIT: &str = "5555555555555555555555555555555555555555";

const REPO_PATH: &str = "/repos/octocat/blog/git";

fn master() -> BranchName {
    BranchName::new("master").unwrap()
}

fn oid(s: &str) -> Oid {
    Oid::new(s).unwrap()
}

fn store_with(server: &MockServer, credentials: Credentials, timeout: Duration) -> GitHubStore {
    GitHubStore::new(
        RepoId::parse("octocat/blog").unwrap(),
        credentials,
        server.uri(),
        timeout,
    )
    .unwrap()
}

fn store(server: &MockServer) -> GitHubStore {
    store_with(
        server,
        Credentials::Bearer("ghp_test".into()),
        Duration::from_secs(5),
    )
}

/// Mount the read half of the protocol: ref and commit lookups.
async fn mount_reads(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{REPO_PATH}/ref/heads/master")))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ref": "refs/heads/master",
            "object": { "sha": TIP, "type": "commit" }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{REPO_PATH}/commits/{TIP}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": TIP,
            "tree": { "sha": BASE_TREE },
            "parents": []
        })))
        .mount(server)
        .await;
}

/// Mount blob, tree and commit creation.
async fn mount_writes(server: &MockServer, blobs: u64) {
    Mock::given(method("POST"))
        .and(path(format!("{REPO_PATH}/blobs")))
        .and(body_partial_json(json!({ "encoding": "base64" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": BLOB })))
        .expect(blobs)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{REPO_PATH}/trees")))
        .and(body_partial_json(json!({ "base_tree": BASE_TREE })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW_TREE })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{REPO_PATH}/commits")))
        .and(body_json(json!({
            "message": "new post",
            "tree": NEW_TREE,
            "parents": [TIP]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW_COMMIT })))
        .expect(1)
        .mount(server)
        .await;
}

fn two_files() -> FileSet {
    let mut files = FileSet::new();
    files.insert("content/a.md", b"---\ntitle: a\n---\n".to_vec());
    files.insert("previews/a.json", b"{}".to_vec());
    files
}

mod protocol {
    use super::*;

    #[tokio::test]
    async fn full_commit_sequence() {
        let server = MockServer::start().await;
        mount_reads(&server).await;
        mount_writes(&server, 2).await;

        Mock::given(method("PATCH"))
            .and(path(format!("{REPO_PATH}/refs/heads/master")))
            .and(body_json(json!({ "sha": NEW_COMMIT, "force": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/master",
                "object": { "sha": NEW_COMMIT }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = CommitEngine::new(Arc::new(store(&server)));
        let outcome = engine
            .commit(&two_files(), "new post", &master())
            .await
            .unwrap();

        assert_eq!(outcome.commit, oid(NEW_COMMIT));
        assert_eq!(outcome.parent, oid(TIP));
        assert_eq!(outcome.tree, oid(NEW_TREE));
    }

    #[tokio::test]
    async fn blob_content_is_base64() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{REPO_PATH}/blobs")))
            .and(body_json(json!({ "content": "aGVsbG8=", "encoding": "base64" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": BLOB })))
            .expect(1)
            .mount(&server)
            .await;

        let sha = store(&server).create_blob(b"hello").await.unwrap();
        assert_eq!(sha, oid(BLOB));
    }

    #[tokio::test]
    async fn tree_entries_are_regular_files() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{REPO_PATH}/trees")))
            .and(body_json(json!({
                "base_tree": BASE_TREE,
                "tree": [
                    { "path": "content/a.md", "mode": "100644", "type": "blob", "sha": BLOB }
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW_TREE })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = [micropub_git::store::TreeEntry::file("content/a.md", oid(BLOB))];
        let sha = store(&server)
            .create_tree(&oid(BASE_TREE), &entries)
            .await
            .unwrap();
        assert_eq!(sha, oid(NEW_TREE));
    }

    #[tokio::test]
    async fn tree_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{REPO_PATH}/trees/{BASE_TREE}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": BASE_TREE,
                "tree": [
                    { "path": "index.md", "mode": "100644", "type": "blob", "sha": BLOB, "size": 3 }
                ],
                "truncated": false
            })))
            .mount(&server)
            .await;

        let entries = store(&server).get_tree(&oid(BASE_TREE)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "index.md");
        assert_eq!(entries[0].blob, oid(BLOB));
    }

    #[tokio::test]
    async fn basic_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{REPO_PATH}/ref/heads/master")))
            .and(header("authorization", "Basic YWxpY2U6cHc="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": TIP }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_with(
            &server,
            Credentials::Basic {
                username: "alice".into(),
                password: "pw".into(),
            },
            Duration::from_secs(5),
        );
        assert_eq!(store.get_ref(&master()).await.unwrap(), oid(TIP));
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn unprocessable_ref_update_is_conflict() {
        let server = MockServer::start().await;
        mount_reads(&server).await;
        mount_writes(&server, 2).await;

        Mock::given(method("PATCH"))
            .and(path(format!("{REPO_PATH}/refs/heads/master")))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Update is not a fast forward"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = CommitEngine::new(Arc::new(store(&server)));
        let err = engine
            .commit(&two_files(), "new post", &master())
            .await
            .unwrap_err();

        match err {
            CommitError::Conflict {
                expected, detail, ..
            } => {
                assert_eq!(expected, oid(TIP));
                assert!(detail.contains("fast forward"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deleted_branch_is_not_a_conflict() {
        let server = MockServer::start().await;
        mount_reads(&server).await;
        mount_writes(&server, 2).await;

        Mock::given(method("PATCH"))
            .and(path(format!("{REPO_PATH}/refs/heads/master")))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Reference does not exist"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = CommitEngine::new(Arc::new(store(&server)));
        let err = engine
            .commit(&two_files(), "new post", &master())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommitError::Remote(StoreError::NotFound("Reference does not exist".into()))
        );
    }

    #[tokio::test]
    async fn blob_failure_stops_before_tree() {
        let server = MockServer::start().await;
        mount_reads(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("{REPO_PATH}/blobs")))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{REPO_PATH}/trees")))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW_TREE })))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let engine = CommitEngine::new(Arc::new(store(&server)));
        let err = engine
            .commit(&two_files(), "new post", &master())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommitError::Remote(StoreError::Api { status: 500, .. })
        ));
    }

    async fn get_ref_with_status(status: u16) -> StoreError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "message": "nope" })),
            )
            .mount(&server)
            .await;
        store(&server).get_ref(&master()).await.unwrap_err()
    }

    #[tokio::test]
    async fn status_mapping() {
        assert!(matches!(
            get_ref_with_status(401).await,
            StoreError::AuthFailed(_)
        ));
        assert!(matches!(
            get_ref_with_status(403).await,
            StoreError::AuthFailed(_)
        ));
        assert_eq!(
            get_ref_with_status(404).await,
            StoreError::NotFound("nope".into())
        );
        assert!(matches!(
            get_ref_with_status(502).await,
            StoreError::Api { status: 502, .. }
        ));
        assert_eq!(
            get_ref_with_status(409).await,
            StoreError::Api {
                status: 409,
                message: "nope".into()
            }
        );
    }

    #[tokio::test]
    async fn slow_remote_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "object": { "sha": TIP } }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let store = store_with(
            &server,
            Credentials::Bearer("ghp_test".into()),
            Duration::from_millis(200),
        );
        assert_eq!(
            store.get_ref(&master()).await.unwrap_err(),
            StoreError::Timeout
        );
    }
}
