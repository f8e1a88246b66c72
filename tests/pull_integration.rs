//! Integration tests for pull.
//!
//! Every test works on two clones of one bare origin: `local` is the
//! working copy under test, `remote` publishes the upstream changes.

mod common;

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use common::Origin;
use repoflow::core::messages::MessageKey;
use repoflow::core::types::{
    AheadBehind, BranchName, OperationStatus, PullStatus, PullType, RepositoryState,
};
use repoflow::engine::{CancellationToken, OrchestratorError, ProgressMonitor, ScheduleOptions};

const MINE: &str = "<root>\n  <mine/>\n</root>\n";
const THEIRS: &str = "<root>\n  <theirs/>\n</root>\n";

fn diverged(origin: &Origin) -> (common::WorkingCopy, common::WorkingCopy) {
    let local = origin.clone_as("local");
    let remote = origin.clone_as("remote");
    local.commit_file("shared.xml", MINE, "Local edit");
    remote.publish("shared.xml", THEIRS, "Remote edit");
    (local, remote)
}

mod integration {
    use super::*;

    #[test]
    fn up_to_date_when_nothing_new() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let orchestrator = local.orchestrator();

        let response = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();
        assert_eq!(response.status, PullStatus::UpToDate);
        assert!(response.conflicting_paths.is_empty());
    }

    #[test]
    fn local_commits_only_is_up_to_date() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        local.commit_file("local.xml", "<local/>\n", "Local only");
        let orchestrator = local.orchestrator();

        let response = orchestrator.pull(Some(PullType::Rebase)).wait().unwrap();
        assert_eq!(response.status, PullStatus::UpToDate);
        assert_eq!(
            orchestrator.ahead_behind().unwrap(),
            Some(AheadBehind { ahead: 1, behind: 0 })
        );
    }

    #[test]
    fn fast_forward_merge() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        remote.publish("shared.xml", THEIRS, "Remote edit");

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();

        assert_eq!(response.status, PullStatus::Ok);
        assert_eq!(local.read("shared.xml"), THEIRS);
        assert_eq!(local.head(), origin.main_tip());
        assert_eq!(local.head_parent_count(), 1);
        assert_eq!(orchestrator.repository_state().unwrap(), RepositoryState::Safe);
        assert_eq!(
            orchestrator.ahead_behind().unwrap(),
            Some(AheadBehind::default())
        );
    }

    #[test]
    fn clean_rebase_replays_local_commit() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        local.commit_file("local.xml", "<local/>\n", "Local commit");
        remote.publish("other.xml", "<other/>\n", "Remote commit");

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(Some(PullType::Rebase)).wait().unwrap();
        assert_eq!(response.status, PullStatus::Ok);

        let history = orchestrator.history(3).unwrap();
        let summaries: Vec<_> = history.iter().map(|c| c.summary.as_str()).collect();
        assert_eq!(summaries, ["Local commit", "Remote commit", "Initial commit"]);
        assert!(local.exists("other.xml"));
        assert_eq!(
            orchestrator.current_branch().unwrap(),
            Some(BranchName::new("main").unwrap())
        );
    }

    #[test]
    fn clean_merge_records_merge_commit() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        local.commit_file("local.xml", "<local/>\n", "Local commit");
        remote.publish("other.xml", "<other/>\n", "Remote commit");

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();

        assert_eq!(response.status, PullStatus::Ok);
        assert_eq!(local.head_parent_count(), 2);
        assert_eq!(orchestrator.repository_state().unwrap(), RepositoryState::Safe);
        assert_eq!(
            orchestrator.ahead_behind().unwrap(),
            Some(AheadBehind { ahead: 2, behind: 0 })
        );
    }

    #[test]
    fn merge_conflict_then_resolve_and_commit() {
        let origin = Origin::new();
        let (local, _remote) = diverged(&origin);
        let orchestrator = local.orchestrator();

        let response = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();
        assert_eq!(response.status, PullStatus::Conflicts);
        assert_eq!(response.message, Some(MessageKey::PullWithConflicts));
        assert_eq!(response.conflicting_paths, vec!["shared.xml"]);
        assert_eq!(
            orchestrator.repository_state().unwrap(),
            RepositoryState::Merging
        );

        let resolved = orchestrator
            .resolve_using_mine(vec!["shared.xml".into()])
            .wait()
            .unwrap();
        assert_eq!(resolved.status, OperationStatus::Completed);
        assert_eq!(resolved.state, RepositoryState::MergingResolved);
        assert_eq!(local.read("shared.xml"), MINE);

        orchestrator.commit("Merge origin/main").wait().unwrap();
        assert_eq!(orchestrator.repository_state().unwrap(), RepositoryState::Safe);
        assert_eq!(local.head_parent_count(), 2);
    }

    #[test]
    fn pull_refused_while_merge_is_unresolved() {
        let origin = Origin::new();
        let (local, _remote) = diverged(&origin);
        let orchestrator = local.orchestrator();
        orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();

        let again = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();
        assert_eq!(again.status, PullStatus::Rejected);
        assert_eq!(again.message, Some(MessageKey::ResolveConflictsFirst));
        assert_eq!(again.conflicting_paths, vec!["shared.xml"]);
    }

    #[test]
    fn rebase_conflict_resolved_with_theirs_keeps_local_commit() {
        let origin = Origin::new();
        let (local, _remote) = diverged(&origin);
        let orchestrator = local.orchestrator();

        let response = orchestrator.pull(Some(PullType::Rebase)).wait().unwrap();
        assert_eq!(response.status, PullStatus::Conflicts);
        assert_eq!(response.conflicting_paths, vec!["shared.xml"]);
        assert_eq!(
            orchestrator.repository_state().unwrap(),
            RepositoryState::RebasingMerge
        );

        // While rebasing, "theirs" is the local commit being replayed.
        let resolved = orchestrator
            .resolve_using_theirs(vec!["shared.xml".into()])
            .wait()
            .unwrap();
        assert_eq!(resolved.status, OperationStatus::Completed);
        assert_eq!(local.read("shared.xml"), MINE);

        let continued = orchestrator.continue_rebase().wait().unwrap();
        assert_eq!(continued.status, OperationStatus::Completed);
        assert_eq!(continued.state, RepositoryState::Safe);

        let summaries: Vec<_> = orchestrator
            .history(2)
            .unwrap()
            .into_iter()
            .map(|c| c.summary)
            .collect();
        assert_eq!(summaries, ["Local edit", "Remote edit"]);
        assert_eq!(
            orchestrator.ahead_behind().unwrap(),
            Some(AheadBehind { ahead: 1, behind: 0 })
        );
    }

    #[test]
    fn rebase_conflict_resolved_with_mine_drops_empty_step() {
        let origin = Origin::new();
        let (local, _remote) = diverged(&origin);
        let orchestrator = local.orchestrator();
        orchestrator.pull(Some(PullType::Rebase)).wait().unwrap();

        // While rebasing, "mine" is the upstream being rebased onto.
        orchestrator
            .resolve_using_mine(vec!["shared.xml".into()])
            .wait()
            .unwrap();
        assert_eq!(local.read("shared.xml"), THEIRS);

        let continued = orchestrator.continue_rebase().wait().unwrap();
        assert_eq!(continued.state, RepositoryState::Safe);
        assert_eq!(local.head(), origin.main_tip());
        assert_eq!(
            orchestrator.ahead_behind().unwrap(),
            Some(AheadBehind::default())
        );
    }

    #[test]
    fn abort_rebase_restores_and_is_idempotent() {
        let origin = Origin::new();
        let (local, _remote) = diverged(&origin);
        let before = local.head();
        let orchestrator = local.orchestrator();
        orchestrator.pull(Some(PullType::Rebase)).wait().unwrap();

        let aborted = orchestrator.abort_rebase().wait().unwrap();
        assert_eq!(aborted.state, RepositoryState::Safe);
        assert_eq!(local.head(), before);
        assert_eq!(local.read("shared.xml"), MINE);

        let again = orchestrator.abort_rebase().wait().unwrap();
        assert_eq!(again.status, OperationStatus::Completed);
        assert_eq!(again.state, RepositoryState::Safe);
        assert_eq!(
            orchestrator.ahead_behind().unwrap(),
            Some(AheadBehind { ahead: 1, behind: 1 })
        );
    }

    #[test]
    fn abort_merge_restores_and_is_idempotent() {
        let origin = Origin::new();
        let (local, _remote) = diverged(&origin);
        let before = local.head();
        let orchestrator = local.orchestrator();
        orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();

        let aborted = orchestrator.abort_merge().wait().unwrap();
        assert_eq!(aborted.state, RepositoryState::Safe);
        assert_eq!(local.head(), before);
        assert_eq!(local.read("shared.xml"), MINE);

        let again = orchestrator.abort_merge().wait().unwrap();
        assert_eq!(again.state, RepositoryState::Safe);
    }

    #[test]
    fn incoming_change_to_edited_file_is_refused_untouched() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        remote.publish("shared.xml", THEIRS, "Remote edit");
        local.write("shared.xml", MINE);
        let before = local.head();

        let orchestrator = local.orchestrator();
        for pull_type in [PullType::MergeFf, PullType::Rebase] {
            let response = orchestrator.pull(Some(pull_type)).wait().unwrap();
            assert_eq!(response.status, PullStatus::Conflicts);
            assert_eq!(
                response.message,
                Some(MessageKey::PullWouldOverwriteUncommittedChanges)
            );
            assert_eq!(response.conflicting_paths, vec!["shared.xml"]);
        }

        assert_eq!(local.head(), before);
        assert_eq!(local.read("shared.xml"), MINE);
        assert_eq!(orchestrator.repository_state().unwrap(), RepositoryState::Safe);
    }

    #[test]
    fn untracked_file_shadowing_incoming_file_is_refused() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        remote.publish("new.xml", "<remote/>\n", "Add new.xml");
        local.write("new.xml", "<local/>\n");

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();

        assert_eq!(response.status, PullStatus::Rejected);
        assert_eq!(
            response.message,
            Some(MessageKey::PullRebaseFailedBecauseConflictingPaths)
        );
        assert_eq!(response.conflicting_paths, vec!["new.xml"]);
        assert_eq!(local.read("new.xml"), "<local/>\n");
    }

    #[test]
    fn rebase_with_uncommitted_changes_is_refused() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        remote.publish("other.xml", "<other/>\n", "Remote commit");
        local.write("README.md", "# Edited\n");

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(Some(PullType::Rebase)).wait().unwrap();

        assert_eq!(response.status, PullStatus::Rejected);
        assert_eq!(
            response.message,
            Some(MessageKey::PullRebaseFailedBecauseUncommitted)
        );
        assert_eq!(response.conflicting_paths, vec!["README.md"]);
        assert!(!local.exists("other.xml"));
    }

    #[test]
    fn non_fast_forward_merge_with_staged_changes_is_refused() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        local.commit_file("local.xml", "<local/>\n", "Local commit");
        local.write("notes.xml", "<notes/>\n");
        local.git(&["add", "notes.xml"]);
        remote.publish("other.xml", "<other/>\n", "Remote commit");

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();

        assert_eq!(response.status, PullStatus::Rejected);
        assert_eq!(
            response.message,
            Some(MessageKey::PullMergeFailedBecauseStagedChanges)
        );
        assert_eq!(response.conflicting_paths, vec!["notes.xml"]);
    }

    #[test]
    fn configured_pull_type_is_used_by_default() {
        let origin = Origin::new();
        let (local, _remote) = diverged(&origin);
        local.write(".git/repoflow/config.toml", "pull_type = \"rebase\"\n");

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(None).wait().unwrap();
        assert_eq!(response.status, PullStatus::Conflicts);
        assert_eq!(
            orchestrator.repository_state().unwrap(),
            RepositoryState::RebasingMerge
        );
    }

    #[test]
    fn pull_without_upstream_fails() {
        let (_dir, repo) = common::standalone_repo();
        let orchestrator = repo.orchestrator();

        let result = orchestrator.pull(None).wait();
        assert!(matches!(result, Err(OrchestratorError::NoUpstream)));
    }
}

mod cancellation {
    use super::*;

    /// Cancels the running pull when a unit of work whose label starts
    /// with `prefix` begins. Blocks until the test hands over the token.
    struct CancelAt {
        prefix: &'static str,
        token: Mutex<Receiver<CancellationToken>>,
    }

    impl ProgressMonitor for CancelAt {
        fn begin(&self, task: &str, _total: Option<usize>) {
            if task.starts_with(self.prefix) {
                if let Ok(token) = self.token.lock().unwrap().recv() {
                    token.cancel();
                }
            }
        }
    }

    fn pull_cancelled_at(
        local: &common::WorkingCopy,
        prefix: &'static str,
    ) -> Result<repoflow::core::types::PullResponse, OrchestratorError> {
        let (tx, rx) = mpsc::channel();
        let monitor = Arc::new(CancelAt {
            prefix,
            token: Mutex::new(rx),
        });
        let orchestrator = local.orchestrator();
        let handle = orchestrator.pull_with(
            Some(PullType::MergeFf),
            ScheduleOptions::default().with_monitor(monitor),
        );
        tx.send(handle.token().clone()).unwrap();
        handle.wait()
    }

    #[test]
    fn cancelled_during_fetch_changes_nothing() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        remote.publish("other.xml", "<other/>\n", "Remote commit");
        let head = local.head();

        let result = pull_cancelled_at(&local, "fetch");

        assert!(matches!(result, Err(OrchestratorError::Cancelled)));
        assert_eq!(local.head(), head);
        assert!(!local.exists("other.xml"));
    }

    #[test]
    fn cancelled_before_integration_keeps_fetched_refs() {
        let origin = Origin::new();
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        remote.publish("other.xml", "<other/>\n", "Remote commit");
        let head = local.head();

        let result = pull_cancelled_at(&local, "integrate");

        assert!(matches!(result, Err(OrchestratorError::Cancelled)));
        assert_eq!(local.head(), head);
        assert!(!local.exists("other.xml"));
        assert_eq!(local.git(&["rev-parse", "origin/main"]), origin.main_tip());
        let orchestrator = local.orchestrator();
        assert_eq!(
            orchestrator.ahead_behind().unwrap(),
            Some(AheadBehind { ahead: 0, behind: 1 })
        );
    }
}

mod submodules {
    use super::*;

    /// `remote` publishes a commit adding submodule `lib` (holding
    /// `lib.xml`); `local` has not pulled it yet.
    fn with_published_submodule(origin: &Origin) -> common::WorkingCopy {
        let local = origin.clone_as("local");
        let remote = origin.clone_as("remote");
        let lib = origin.sibling("lib", "lib.xml", "<lib/>\n");
        let lib_url = lib.to_string_lossy().into_owned();

        remote.git(&[
            "-c",
            "protocol.file.allow=always",
            "submodule",
            "add",
            "-q",
            &lib_url,
            "lib",
        ]);
        remote.git(&["commit", "-q", "-m", "Add lib submodule"]);
        remote.git(&["push", "-q", "origin", "main"]);
        local
    }

    #[test]
    fn pull_updates_submodules_when_configured() {
        let origin = Origin::new();
        let local = with_published_submodule(&origin);
        local.write(
            ".git/repoflow/config.toml",
            "update_submodules_on_pull = true\n",
        );

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();

        assert_eq!(response.status, PullStatus::Ok);
        assert!(local.exists(".gitmodules"));
        assert_eq!(local.read("lib/lib.xml"), "<lib/>\n");
    }

    #[test]
    fn pull_leaves_submodules_alone_by_default() {
        let origin = Origin::new();
        let local = with_published_submodule(&origin);

        let orchestrator = local.orchestrator();
        let response = orchestrator.pull(Some(PullType::MergeFf)).wait().unwrap();

        assert_eq!(response.status, PullStatus::Ok);
        assert!(local.exists(".gitmodules"));
        assert!(!local.exists("lib/lib.xml"));

        let updated = orchestrator.update_submodules().wait().unwrap();
        assert_eq!(updated, 1);
        assert_eq!(local.read("lib/lib.xml"), "<lib/>\n");
    }
}
