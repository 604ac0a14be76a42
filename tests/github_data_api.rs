//! Integration tests for the GitHub Git Data API adapter.
//!
//! A wiremock server stands in for api.github.com. Live API tests are
//! behind the `live_github_tests` feature flag.

use std::sync::Arc;
use std::time::Duration;

use quarto_press::auth::StaticTokenProvider;
use quarto_press::core::types::{BranchName, Oid};
use quarto_press::forge::github::GitHubDataApi;
use quarto_press::forge::{CommitAuthor, ForgeError, GitDataApi};
use quarto_press::publish::{PublishFile, PublishStep, Publisher};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "ghp_test_token_0123456789";
const REPO: &str = "/repos/group/icr";

fn sha(n: u8) -> String {
    format!("{:040x}", n)
}

fn api(server: &MockServer) -> GitHubDataApi {
    GitHubDataApi::with_options(
        Arc::new(StaticTokenProvider::new(TOKEN)),
        "group",
        "icr",
        server.uri(),
        Duration::from_secs(5),
    )
    .unwrap()
}

async fn mount_head(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{}/branches/main", REPO)))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "main",
            "commit": { "sha": sha(1) }
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/git/commits/{}", REPO, sha(1))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": sha(1),
            "tree": { "sha": sha(2) }
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_blob_and_tree(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{}/git/blobs", REPO)))
        .and(body_partial_json(json!({ "content": "hello\n", "encoding": "utf-8" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": sha(3) })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/git/trees", REPO)))
        .and(body_partial_json(json!({
            "base_tree": sha(2),
            "tree": [{ "path": "posts/hello/index.qmd", "mode": "100644", "type": "blob", "sha": sha(3) }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": sha(4) })))
        .expect(1)
        .mount(server)
        .await;
}

fn local_file(dir: &TempDir) -> PublishFile {
    let local = dir.path().join("index.qmd");
    std::fs::write(&local, "hello\n").unwrap();
    PublishFile::new(local, "posts/hello/index.qmd")
}

fn publisher(server: &MockServer) -> Publisher {
    Publisher::new(
        Arc::new(api(server)),
        BranchName::main(),
        CommitAuthor {
            name: "Site Publisher".into(),
            email: "publisher@example.org".into(),
        },
    )
}

#[tokio::test]
async fn full_publish_sends_the_documented_requests() {
    let server = MockServer::start().await;
    mount_head(&server).await;
    mount_blob_and_tree(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{}/git/commits", REPO)))
        .and(body_partial_json(json!({
            "message": "Add new files at posts/hello",
            "author": { "name": "Site Publisher", "email": "publisher@example.org" },
            "parents": [sha(1)],
            "tree": sha(4)
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": sha(5) })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/git/refs/heads/main", REPO)))
        .and(body_partial_json(json!({
            "ref": "refs/heads/main",
            "sha": sha(5),
            "force": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ref": "refs/heads/main",
            "object": { "sha": sha(5) }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let receipt = publisher(&server)
        .publish(&[local_file(&dir)], "Add new files at posts/hello")
        .await
        .unwrap();

    assert_eq!(receipt.parent, Oid::new(sha(1)).unwrap());
    assert_eq!(receipt.base_tree, Oid::new(sha(2)).unwrap());
    assert_eq!(receipt.tree, Oid::new(sha(4)).unwrap());
    assert_eq!(receipt.commit, Oid::new(sha(5)).unwrap());
}

#[tokio::test]
async fn tree_rejection_stops_the_sequence() {
    let server = MockServer::start().await;
    mount_head(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{}/git/blobs", REPO)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": sha(3) })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/git/trees", REPO)))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "tree.sha is invalid" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/git/commits", REPO)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": sha(5) })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/git/refs/heads/main", REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = local_file(&dir);
    let err = publisher(&server)
        .publish(&[file.clone()], "msg")
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(PublishStep::CreateTree));
    assert_eq!(std::fs::read_to_string(&file.local_path).unwrap(), "hello\n");
}

#[tokio::test]
async fn non_fast_forward_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/git/refs/heads/main", REPO)))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Update is not a fast forward" })),
        )
        .mount(&server)
        .await;

    let reference = quarto_press::core::types::RefName::for_branch(&BranchName::main());
    let err = api(&server)
        .update_ref(&reference, &Oid::new(sha(9)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::NotFastForward(_)));
}

#[tokio::test]
async fn status_codes_map_to_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/branches/main", REPO)))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/branches/gone", REPO)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Branch not found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/branches/busy", REPO)))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let api = api(&server);
    assert!(matches!(
        api.branch_head(&BranchName::main()).await,
        Err(ForgeError::AuthFailed(_))
    ));
    assert!(matches!(
        api.branch_head(&BranchName::new("gone").unwrap()).await,
        Err(ForgeError::NotFound(_))
    ));
    assert!(matches!(
        api.branch_head(&BranchName::new("busy").unwrap()).await,
        Err(ForgeError::ApiError { status: 503, .. })
    ));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/branches/main", REPO)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "commit": { "sha": sha(1) } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let api = GitHubDataApi::with_options(
        Arc::new(StaticTokenProvider::new(TOKEN)),
        "group",
        "icr",
        server.uri(),
        Duration::from_millis(200),
    )
    .unwrap();
    assert!(matches!(
        api.branch_head(&BranchName::main()).await,
        Err(ForgeError::NetworkError(_))
    ));
}

#[cfg(feature = "live_github_tests")]
mod live_tests {
    use super::*;

    fn get_test_repo() -> Option<(String, String, String)> {
        let token = std::env::var("GH_TOKEN").ok()?;
        let owner = std::env::var("QPRESS_TEST_OWNER").ok()?;
        let repo = std::env::var("QPRESS_TEST_REPO").ok()?;
        Some((token, owner, repo))
    }

    #[tokio::test]
    async fn live_resolve_head_and_tree() {
        let Some((token, owner, repo)) = get_test_repo() else {
            eprintln!("Skipping: GH_TOKEN/QPRESS_TEST_OWNER/QPRESS_TEST_REPO not set");
            return;
        };

        let api = GitHubDataApi::new(Arc::new(StaticTokenProvider::new(token)), owner, repo).unwrap();
        let head = api.branch_head(&BranchName::main()).await.unwrap();
        let tree = api.commit_tree(&head).await.unwrap();
        assert_eq!(tree.as_str().len(), 40);
    }
}
