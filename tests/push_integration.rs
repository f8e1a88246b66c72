//! Integration tests for push and the pre-push state gate.

mod common;

use common::Origin;
use repoflow::core::types::{PullStatus, PullType, PushStatus, RepositoryState};

#[test]
fn push_new_commit() {
    let origin = Origin::new();
    let local = origin.clone_as("local");
    local.commit_file("local.xml", "<local/>\n", "Local commit");

    let orchestrator = local.orchestrator();
    let response = orchestrator.push().wait().unwrap();

    assert_eq!(response.status, PushStatus::Ok);
    assert_eq!(origin.main_tip(), local.head());
}

#[test]
fn push_with_nothing_new_is_up_to_date() {
    let origin = Origin::new();
    let local = origin.clone_as("local");
    let tip = origin.main_tip();

    let orchestrator = local.orchestrator();
    let response = orchestrator.push().wait().unwrap();

    assert_eq!(response.status, PushStatus::UpToDate);
    assert_eq!(origin.main_tip(), tip);
}

#[test]
fn push_behind_remote_is_non_fast_forward() {
    let origin = Origin::new();
    let local = origin.clone_as("local");
    let remote = origin.clone_as("remote");
    remote.publish("other.xml", "<other/>\n", "Remote commit");
    local.commit_file("local.xml", "<local/>\n", "Local commit");
    let tip = origin.main_tip();

    let orchestrator = local.orchestrator();
    let response = orchestrator.push().wait().unwrap();

    assert_eq!(response.status, PushStatus::RejectedNonFastForward);
    assert!(response.is_rejected());
    assert_eq!(origin.main_tip(), tip);
}

#[test]
fn push_refused_during_unresolved_merge() {
    let origin = Origin::new();
    let local = origin.clone_as("local");
    let remote = origin.clone_as("remote");
    local.commit_file("shared.xml", "<root>\n  <mine/>\n</root>\n", "Local edit");
    remote.publish("shared.xml", "<root>\n  <theirs/>\n</root>\n", "Remote edit");
    let tip = origin.main_tip();

    let orchestrator = local.orchestrator();
    let pulled = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();
    assert_eq!(pulled.status, PullStatus::Conflicts);
    assert_eq!(
        orchestrator.repository_state().unwrap(),
        RepositoryState::Merging
    );

    let response = orchestrator.push().wait().unwrap();
    assert_eq!(response.status, PushStatus::RejectedOtherReason);
    assert_eq!(response.message.as_deref(), Some("resolve conflicts first"));
    assert_eq!(origin.main_tip(), tip);
}

#[test]
fn push_refused_during_rebase() {
    let origin = Origin::new();
    let local = origin.clone_as("local");
    let remote = origin.clone_as("remote");
    local.commit_file("shared.xml", "<root>\n  <mine/>\n</root>\n", "Local edit");
    remote.publish("shared.xml", "<root>\n  <theirs/>\n</root>\n", "Remote edit");

    let orchestrator = local.orchestrator();
    orchestrator.pull(Some(PullType::Rebase)).wait().unwrap();

    let response = orchestrator.push().wait().unwrap();
    assert_eq!(response.status, PushStatus::RejectedOtherReason);
}

#[test]
fn push_after_pull_succeeds() {
    let origin = Origin::new();
    let local = origin.clone_as("local");
    let remote = origin.clone_as("remote");
    remote.publish("other.xml", "<other/>\n", "Remote commit");
    local.commit_file("local.xml", "<local/>\n", "Local commit");

    let orchestrator = local.orchestrator();
    let rejected = orchestrator.push().wait().unwrap();
    assert_eq!(rejected.status, PushStatus::RejectedNonFastForward);

    let pulled = orchestrator.pull(Some(PullType::Rebase)).wait().unwrap();
    assert_eq!(pulled.status, PullStatus::Ok);

    let pushed = orchestrator.push().wait().unwrap();
    assert_eq!(pushed.status, PushStatus::Ok);
    assert_eq!(origin.main_tip(), local.head());
}

#[test]
fn tag_is_created_and_pushed() {
    let origin = Origin::new();
    let local = origin.clone_as("local");
    let orchestrator = local.orchestrator();

    orchestrator
        .create_tag("v1.0", None, Some("First release".into()))
        .wait()
        .unwrap();
    assert_eq!(orchestrator.tags().unwrap(), vec!["v1.0"]);

    let response = orchestrator.push_tag("v1.0").wait().unwrap();
    assert_eq!(response.status, PushStatus::Ok);
    assert!(origin.has_ref("refs/tags/v1.0"));

    orchestrator.delete_tag("v1.0").wait().unwrap();
    assert!(orchestrator.tags().unwrap().is_empty());
}
