//! Integration tests for the Git Data API publish sequence.
//!
//! These run the formatter, the materializer and the publisher together
//! against `MockGitData`, which records every call in order.

use std::sync::Arc;

use quarto_press::content::records::{Author, Publication};
use quarto_press::content::Formatter;
use quarto_press::core::types::{BranchName, UtcTimestamp};
use quarto_press::forge::mock::{FailOn, MockCall, MockGitData};
use quarto_press::forge::{CommitAuthor, ForgeError};
use quarto_press::materialize::Materializer;
use quarto_press::publish::{default_commit_message, PublishFile, PublishStep, Publisher};
use tempfile::TempDir;

fn publisher(mock: &MockGitData) -> Publisher {
    Publisher::new(
        Arc::new(mock.clone()),
        BranchName::main(),
        CommitAuthor {
            name: "Site Publisher".into(),
            email: "publisher@example.org".into(),
        },
    )
}

fn paper() -> Publication {
    Publication {
        name: "My Great Paper!".into(),
        overview: "We did things.".into(),
        authors: vec![Author::new("Ada Lovelace", Some("https://ada.example".into()))],
        research_areas: vec![],
        thumbnail: None,
        citation: None,
        pdf: Some("https://example.org/paper.pdf".into()),
        supplement: None,
        slides: None,
        poster: None,
        code: None,
        updated_at: UtcTimestamp::now(),
    }
}

/// Materialize the publication page and return it as a publish file.
fn materialized(dir: &TempDir) -> (PublishFile, String) {
    let content = Formatter::publication(&paper()).unwrap();
    let written = Materializer::new(dir.path()).write(&content).unwrap();
    assert_eq!(written.relative_path, "content/my-great-paper/index.qmd");
    let text = std::fs::read_to_string(&written.absolute_path).unwrap();
    (
        PublishFile::new(written.absolute_path, written.relative_path),
        text,
    )
}

#[tokio::test]
async fn single_file_publish_makes_exactly_six_calls_in_order() {
    let dir = TempDir::new().unwrap();
    let mock = MockGitData::new();
    let head = mock.head_of("main").unwrap();
    let head_tree = mock.commit(&head).unwrap().tree;
    let (file, text) = materialized(&dir);

    let receipt = publisher(&mock)
        .publish(&[file], &default_commit_message("content/my-great-paper"))
        .await
        .unwrap();

    assert_eq!(
        mock.call_kinds(),
        vec![
            "branch_head",
            "commit_tree",
            "create_blob",
            "create_tree",
            "create_commit",
            "update_ref",
        ]
    );

    let calls = mock.calls();
    assert_eq!(calls[0], MockCall::BranchHead { branch: "main".into() });
    assert_eq!(calls[1], MockCall::CommitTree { commit: head.clone() });
    assert_eq!(calls[2], MockCall::CreateBlob { content: text.clone() });
    match &calls[3] {
        MockCall::CreateTree { base_tree, paths } => {
            assert_eq!(base_tree, &head_tree);
            assert_eq!(paths, &vec!["content/my-great-paper/index.qmd".to_string()]);
        }
        other => panic!("expected create_tree, got {:?}", other),
    }
    match &calls[4] {
        MockCall::CreateCommit { message, parents, tree } => {
            assert_eq!(message, "Add new files at content/my-great-paper");
            assert_eq!(parents, &vec![head.clone()]);
            assert_eq!(tree, &receipt.tree);
        }
        other => panic!("expected create_commit, got {:?}", other),
    }
    assert_eq!(
        calls[5],
        MockCall::UpdateRef {
            reference: "refs/heads/main".into(),
            sha: receipt.commit.clone(),
        }
    );

    assert_eq!(mock.head_of("main"), Some(receipt.commit.clone()));
    assert_eq!(receipt.base_tree, head_tree);
    assert_eq!(mock.blob(&receipt.blobs[0]).as_deref(), Some(text.as_str()));
}

#[tokio::test]
async fn tree_failure_leaves_local_file_and_branch_alone() {
    let dir = TempDir::new().unwrap();
    let mock = MockGitData::new().fail_on(FailOn::CreateTree(ForgeError::ApiError {
        status: 422,
        message: "bad tree".into(),
    }));
    let head = mock.head_of("main").unwrap();
    let (file, text) = materialized(&dir);
    let local = file.local_path.clone();

    let err = publisher(&mock)
        .publish(&[file], "Add new files at content/my-great-paper")
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(PublishStep::CreateTree));
    assert!(!mock.call_kinds().contains(&"create_commit"));
    assert!(!mock.call_kinds().contains(&"update_ref"));
    assert_eq!(mock.head_of("main"), Some(head));
    assert_eq!(std::fs::read_to_string(&local).unwrap(), text);
}

#[tokio::test]
async fn blob_failure_stops_before_the_tree() {
    let dir = TempDir::new().unwrap();
    let mock = MockGitData::new().fail_on(FailOn::CreateBlob {
        nth: 1,
        error: ForgeError::NetworkError("connection reset".into()),
    });
    let (first, _) = materialized(&dir);
    let second_path = dir.path().join("input.csv");
    std::fs::write(&second_path, "publication,authors\n").unwrap();
    let second = PublishFile::new(second_path, "input.csv");

    let err = publisher(&mock)
        .publish(&[first, second], "two files")
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(PublishStep::CreateBlob));
    assert_eq!(
        mock.call_kinds(),
        vec!["branch_head", "commit_tree", "create_blob", "create_blob"]
    );
}

#[tokio::test]
async fn concurrent_push_is_rejected_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let mock = MockGitData::new();
    let (file, _) = materialized(&dir);
    let publisher = publisher(&mock);

    // First publish succeeds.
    publisher.publish(&[file.clone()], "first").await.unwrap();
    let ours = mock.head_of("main").unwrap();

    // Someone else moves the branch between our commit and ref update.
    let _ = mock.clone().fail_on(FailOn::UpdateRef(ForgeError::NotFastForward(
        "refs/heads/main".into(),
    )));
    let err = publisher.publish(&[file], "second").await.unwrap_err();
    assert_eq!(err.step(), Some(PublishStep::UpdateRef));
    assert_eq!(mock.head_of("main"), Some(ours));
}

#[tokio::test]
async fn publishing_twice_creates_two_commits() {
    let dir = TempDir::new().unwrap();
    let mock = MockGitData::new();
    let (file, _) = materialized(&dir);
    let publisher = publisher(&mock);

    let first = publisher.publish(&[file.clone()], "again").await.unwrap();
    let second = publisher.publish(&[file], "again").await.unwrap();

    assert_ne!(first.commit, second.commit);
    assert_eq!(second.parent, first.commit);
}
