//! store::github
//!
//! GitHub object store over the git data REST API.
//!
//! # Endpoints
//!
//! | Operation       | Request                                    |
//! |-----------------|--------------------------------------------|
//! | `get_ref`       | `GET  /repos/{o}/{r}/git/ref/heads/{b}`    |
//! | `get_commit`    | `GET  /repos/{o}/{r}/git/commits/{sha}`    |
//! | `get_tree`      | `GET  /repos/{o}/{r}/git/trees/{sha}`      |
//! | `create_blob`   | `POST /repos/{o}/{r}/git/blobs` (base64)   |
//! | `create_tree`   | `POST /repos/{o}/{r}/git/trees`            |
//! | `create_commit` | `POST /repos/{o}/{r}/git/commits`          |
//! | `update_ref`    | `PATCH /repos/{o}/{r}/git/refs/heads/{b}`  |
//!
//! # Conflicts
//!
//! GitHub has no compare-and-swap on ref updates. `update_ref` sends
//! `force: false`, so GitHub only accepts a fast-forward; since the new
//! commit's parent is the tip that was read, any intervening move makes the
//! update a non-fast-forward and GitHub answers 422, reported as
//! [`StoreError::Conflict`]. A 422 for a branch deleted in the meantime
//! ("Reference does not exist") is [`StoreError::NotFound`].
//!
//! # Timeouts
//!
//! Every request is bounded by the client timeout given at construction.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CommitObject, ObjectStore, StoreError, TreeEntry};
use crate::core::types::{BranchName, Oid, RepoId};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("micropub-git/", env!("CARGO_PKG_VERSION"));

/// How requests authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal access or app token.
    Bearer(String),
    /// Username and password (or token as password).
    Basic { username: String, password: String },
}

// Custom Debug to keep secrets out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// GitHub-backed [`ObjectStore`].
pub struct GitHubStore {
    /// HTTP client (carries the timeout)
    client: Client,
    credentials: Credentials,
    repo: RepoId,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

impl std::fmt::Debug for GitHubStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStore")
            .field("credentials", &self.credentials)
            .field("repo", &self.repo.to_string())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubStore {
    /// Create a store for `repo`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Network` if the HTTP client cannot be built.
    pub fn new(
        repo: RepoId,
        credentials: Credentials,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
            repo,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// The repository this store writes to.
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            self.repo.owner(),
            self.repo.name(),
            path
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        self.authorize(request).send().await.map_err(map_transport)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let response = self.send(self.client.get(self.repo_url(path))).await?;
        handle_response(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let response = self
            .send(self.client.post(self.repo_url(path)).json(body))
            .await?;
        handle_response(response).await
    }
}

fn map_transport(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Network(err.to_string())
    }
}

/// Handle API response, mapping errors appropriately.
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();

    if status.is_success() {
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout
            } else {
                StoreError::Api {
                    status: status.as_u16(),
                    message: format!("Failed to parse response: {}", e),
                }
            }
        })
    } else {
        Err(error_from_response(response, status).await)
    }
}

/// Map an error response from the API.
async fn error_from_response(response: Response, status: StatusCode) -> StoreError {
    let message = match response.json::<GitHubErrorResponse>().await {
        Ok(err) => err.message,
        Err(_) => "Unknown error".to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED => StoreError::AuthFailed("Invalid or expired credentials".into()),
        StatusCode::FORBIDDEN => StoreError::AuthFailed(format!("Permission denied: {}", message)),
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        _ if status.is_server_error() => StoreError::Api {
            status: status.as_u16(),
            message: format!("GitHub server error: {}", message),
        },
        _ => StoreError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl ObjectStore for GitHubStore {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_ref(&self, branch: &BranchName) -> Result<Oid, StoreError> {
        let reference: GitHubRef = self.get_json(&format!("git/ref/heads/{}", branch)).await?;
        Ok(reference.object.sha)
    }

    async fn get_commit(&self, sha: &Oid) -> Result<CommitObject, StoreError> {
        let commit: GitHubCommit = self.get_json(&format!("git/commits/{}", sha)).await?;
        Ok(CommitObject {
            sha: commit.sha,
            tree: commit.tree.sha,
        })
    }

    async fn get_tree(&self, sha: &Oid) -> Result<Vec<TreeEntry>, StoreError> {
        let tree: GitHubTree = self.get_json(&format!("git/trees/{}", sha)).await?;
        Ok(tree
            .tree
            .into_iter()
            .map(|e| TreeEntry {
                path: e.path,
                mode: e.mode,
                blob: e.sha,
            })
            .collect())
    }

    async fn create_blob(&self, content: &[u8]) -> Result<Oid, StoreError> {
        let body = CreateBlobBody {
            content: BASE64.encode(content),
            encoding: "base64",
        };
        let created: GitHubSha = self.post_json("git/blobs", &body).await?;
        debug!(sha = %created.sha.short(7), bytes = content.len(), "created blob");
        Ok(created.sha)
    }

    async fn create_tree(&self, base: &Oid, entries: &[TreeEntry]) -> Result<Oid, StoreError> {
        let body = CreateTreeBody {
            base_tree: base,
            tree: entries
                .iter()
                .map(|e| CreateTreeEntry {
                    path: &e.path,
                    mode: &e.mode,
                    kind: "blob",
                    sha: &e.blob,
                })
                .collect(),
        };
        let created: GitHubSha = self.post_json("git/trees", &body).await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &Oid,
        parent: &Oid,
    ) -> Result<Oid, StoreError> {
        let body = CreateCommitBody {
            message,
            tree,
            parents: [parent],
        };
        let created: GitHubSha = self.post_json("git/commits", &body).await?;
        Ok(created.sha)
    }

    async fn update_ref(
        &self,
        branch: &BranchName,
        new: &Oid,
        expected: &Oid,
    ) -> Result<(), StoreError> {
        debug!(%branch, new = %new.short(7), expected = %expected.short(7), "updating ref");
        let body = UpdateRefBody {
            sha: new,
            force: false,
        };
        let response = self
            .send(
                self.client
                    .patch(self.repo_url(&format!("git/refs/heads/{}", branch)))
                    .json(&body),
            )
            .await?;

        match handle_response::<serde_json::Value>(response).await {
            Ok(_) => Ok(()),
            Err(StoreError::Api {
                status: 422,
                message,
            }) => Err(classify_rejected_update(message)),
            Err(other) => Err(other),
        }
    }
}

/// Split a 422 on the ref update into a moved branch and everything else.
fn classify_rejected_update(message: String) -> StoreError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("fast forward") || lower.contains("fast-forward") {
        StoreError::Conflict(message)
    } else if lower.contains("reference does not exist") {
        StoreError::NotFound(message)
    } else {
        StoreError::Api {
            status: 422,
            message,
        }
    }
}

// ============================================================================
// GitHub API request/response types
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateBlobBody {
    content: String,
    encoding: &'static str,
}

#[derive(Debug, Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a Oid,
    tree: Vec<CreateTreeEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct CreateTreeEntry<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: &'a Oid,
}

#[derive(Debug, Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a Oid,
    parents: [&'a Oid; 1],
}

#[derive(Debug, Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a Oid,
    force: bool,
}

#[derive(Debug, Deserialize)]
struct GitHubSha {
    sha: Oid,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    object: GitHubSha,
}

#[derive(Debug, Deserialize)]
struct GitHubCommit {
    sha: Oid,
    tree: GitHubSha,
}

#[derive(Debug, Deserialize)]
struct GitHubTree {
    tree: Vec<GitHubTreeEntry>,
}

#[derive(Debug, Deserialize)]
struct GitHubTreeEntry {
    path: String,
    mode: String,
    sha: Oid,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_base: &str) -> GitHubStore {
        GitHubStore::new(
            RepoId::parse("octocat/blog").unwrap(),
            Credentials::Bearer("ghp_secret".into()),
            api_base,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    mod construction {
        use super::*;

        #[test]
        fn repo_url_format() {
            let s = store(DEFAULT_API_BASE);
            assert_eq!(
                s.repo_url("git/blobs"),
                "https://api.github.com/repos/octocat/blog/git/blobs"
            );
        }

        #[test]
        fn trailing_slash_trimmed_from_api_base() {
            let s = store("https://ghe.example.com/api/v3/");
            assert_eq!(
                s.repo_url("git/trees"),
                "https://ghe.example.com/api/v3/repos/octocat/blog/git/trees"
            );
        }
    }

    mod redaction {
        use super::*;

        #[test]
        fn debug_redacts_bearer_token() {
            let debug = format!("{:?}", store(DEFAULT_API_BASE));
            assert!(!debug.contains("ghp_secret"));
            assert!(debug.contains("REDACTED"));
            assert!(debug.contains("octocat/blog"));
        }

        #[test]
        fn debug_redacts_password_but_keeps_username() {
            let creds = Credentials::Basic {
                username: "alice".into(),
                password: "hunter2".into(),
            };
            let debug = format!("{creds:?}");
            assert!(debug.contains("alice"));
            assert!(!debug.contains("hunter2"));
        }
    }

    mod bodies {
        use super::*;

        #[test]
        fn tree_entries_serialize_with_type() {
            let sha = Oid::hash_object("blob", b"x");
            let base = Oid::hash_object("tree", b"");
            let body = CreateTreeBody {
                base_tree: &base,
                tree: vec![CreateTreeEntry {
                    path: "a.md",
                    mode: "100644",
                    kind: "blob",
                    sha: &sha,
                }],
            };
            let json = serde_json::to_value(&body).unwrap();
            assert_eq!(json["base_tree"], base.as_str());
            assert_eq!(json["tree"][0]["type"], "blob");
            assert_eq!(json["tree"][0]["sha"], sha.as_str());
        }

        #[test]
        fn rejected_updates() {
            assert_eq!(
                classify_rejected_update("Update is not a fast forward".into()),
                StoreError::Conflict("Update is not a fast forward".into())
            );
            assert_eq!(
                classify_rejected_update("Reference does not exist".into()),
                StoreError::NotFound("Reference does not exist".into())
            );
            assert!(matches!(
                classify_rejected_update("Object does not exist".into()),
                StoreError::Api { status: 422, .. }
            ));
        }

        #[test]
        fn ref_update_never_forces() {
            let sha = Oid::hash_object("commit", b"x");
            let json = serde_json::to_value(UpdateRefBody {
                sha: &sha,
                force: false,
            })
            .unwrap();
            assert_eq!(json["force"], false);
        }
    }
}
