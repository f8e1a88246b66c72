//! Integration tests for conflict resolution and merge/rebase control.

mod common;

use common::{Origin, WorkingCopy};
use repoflow::core::types::{BranchName, Oid, OperationStatus, PullType, RepositoryState};
use repoflow::engine::{Orchestrator, OrchestratorError};

const MINE: &str = "<root>\n  <mine/>\n</root>\n";
const THEIRS: &str = "<root>\n  <theirs/>\n</root>\n";

/// A local clone stopped on a conflict in `shared.xml`.
fn conflicted(pull_type: PullType) -> (Origin, WorkingCopy, Orchestrator) {
    let origin = Origin::new();
    let local = origin.clone_as("local");
    let remote = origin.clone_as("remote");
    local.commit_file("shared.xml", MINE, "Local edit");
    remote.publish("shared.xml", THEIRS, "Remote edit");

    let orchestrator = local.orchestrator();
    let response = orchestrator.pull(Some(pull_type)).wait().unwrap();
    assert_eq!(response.conflicting_paths, vec!["shared.xml"]);
    (origin, local, orchestrator)
}

fn resolve(orchestrator: &Orchestrator, mine: bool) {
    let paths = vec!["shared.xml".to_string()];
    let handle = if mine {
        orchestrator.resolve_using_mine(paths)
    } else {
        orchestrator.resolve_using_theirs(paths)
    };
    assert_eq!(handle.wait().unwrap().status, OperationStatus::Completed);
}

mod sides {
    use super::*;

    // | state    | mine    | theirs  |
    // | merging  | local   | remote  |
    // | rebasing | remote  | local   |

    #[test]
    fn merge_mine_is_local() {
        let (_origin, local, orchestrator) = conflicted(PullType::MergeFf);
        resolve(&orchestrator, true);
        assert_eq!(local.read("shared.xml"), MINE);
    }

    #[test]
    fn merge_theirs_is_remote() {
        let (_origin, local, orchestrator) = conflicted(PullType::MergeFf);
        resolve(&orchestrator, false);
        assert_eq!(local.read("shared.xml"), THEIRS);
    }

    #[test]
    fn rebase_mine_is_remote() {
        let (_origin, local, orchestrator) = conflicted(PullType::Rebase);
        resolve(&orchestrator, true);
        assert_eq!(local.read("shared.xml"), THEIRS);
    }

    #[test]
    fn rebase_theirs_is_local() {
        let (_origin, local, orchestrator) = conflicted(PullType::Rebase);
        resolve(&orchestrator, false);
        assert_eq!(local.read("shared.xml"), MINE);
    }

    #[test]
    fn resolution_is_staged() {
        let (_origin, _local, orchestrator) = conflicted(PullType::MergeFf);
        resolve(&orchestrator, false);

        assert!(orchestrator.conflicting_paths().unwrap().is_empty());
        let status = orchestrator.status().unwrap();
        assert!(status.staged_files.iter().any(|f| f.path == "shared.xml"));
    }
}

mod errors {
    use super::*;

    #[test]
    fn resolving_unconflicted_path_fails_without_changes() {
        let (_origin, local, orchestrator) = conflicted(PullType::MergeFf);
        let before = local.read("shared.xml");

        let result = orchestrator
            .resolve_using_mine(vec!["shared.xml".into(), "README.md".into()])
            .wait();
        match result {
            Err(OrchestratorError::NotConflicted { path }) => assert_eq!(path, "README.md"),
            other => panic!("expected NotConflicted, got {:?}", other),
        }
        assert_eq!(local.read("shared.xml"), before);
        assert_eq!(orchestrator.conflicting_paths().unwrap(), vec!["shared.xml"]);
    }

    #[test]
    fn resolve_outside_merge_or_rebase_fails() {
        let (_dir, repo) = common::standalone_repo();
        let orchestrator = repo.orchestrator();

        let result = orchestrator
            .resolve_using_theirs(vec!["README.md".into()])
            .wait();
        assert!(matches!(result, Err(OrchestratorError::NoConflictInProgress)));
    }

    #[test]
    fn continue_outside_rebase_fails() {
        let (_dir, repo) = common::standalone_repo();
        let orchestrator = repo.orchestrator();

        let result = orchestrator.continue_rebase().wait();
        assert!(matches!(result, Err(OrchestratorError::NoConflictInProgress)));
    }

    #[test]
    fn continue_with_unresolved_conflicts_reports_them() {
        let (_origin, _local, orchestrator) = conflicted(PullType::Rebase);

        let response = orchestrator.continue_rebase().wait().unwrap();
        assert_eq!(response.status, OperationStatus::Conflicts);
        assert_eq!(response.state, RepositoryState::RebasingMerge);
        assert_eq!(response.conflicting_paths, vec!["shared.xml"]);
    }

    #[test]
    fn commit_is_refused_while_rebasing() {
        let (_origin, _local, orchestrator) = conflicted(PullType::Rebase);
        resolve(&orchestrator, false);

        let result = orchestrator.commit("sneaky").wait();
        assert!(matches!(
            result,
            Err(OrchestratorError::BlockingState {
                state: RepositoryState::RebasingMerge
            })
        ));
    }

    #[test]
    fn new_branch_is_refused_while_merging() {
        let (_origin, _local, orchestrator) = conflicted(PullType::MergeFf);

        let name = BranchName::new("escape").unwrap();
        let result = orchestrator.checkout_new_branch(name, None).wait();
        assert!(matches!(
            result,
            Err(OrchestratorError::BlockingState {
                state: RepositoryState::Merging
            })
        ));
    }
}

mod restart {
    use super::*;

    #[test]
    fn restart_merge_recreates_conflicts() {
        let (_origin, local, orchestrator) = conflicted(PullType::MergeFf);
        resolve(&orchestrator, true);
        assert_eq!(
            orchestrator.repository_state().unwrap(),
            RepositoryState::MergingResolved
        );

        let response = orchestrator.restart_merge().wait().unwrap();
        assert_eq!(response.status, OperationStatus::Conflicts);
        assert_eq!(response.state, RepositoryState::Merging);
        assert_eq!(response.conflicting_paths, vec!["shared.xml"]);
        assert!(local.read("shared.xml").contains("<<<<<<<"));

        resolve(&orchestrator, false);
        orchestrator.commit("Merge origin/main").wait().unwrap();
        assert_eq!(local.read("shared.xml"), THEIRS);
        assert_eq!(local.head_parent_count(), 2);
    }

    #[test]
    fn restart_rebase_step_recreates_conflicts() {
        let (_origin, local, orchestrator) = conflicted(PullType::Rebase);
        resolve(&orchestrator, true);

        let response = orchestrator.restart_merge().wait().unwrap();
        assert_eq!(response.status, OperationStatus::Conflicts);
        assert_eq!(response.state, RepositoryState::RebasingMerge);
        assert!(local.read("shared.xml").contains("<<<<<<<"));

        resolve(&orchestrator, false);
        let continued = orchestrator.continue_rebase().wait().unwrap();
        assert_eq!(continued.state, RepositoryState::Safe);
        assert_eq!(local.read("shared.xml"), MINE);
        assert_eq!(orchestrator.history(1).unwrap()[0].summary, "Local edit");
    }

    #[test]
    fn restart_outside_merge_or_rebase_fails() {
        let (_dir, repo) = common::standalone_repo();
        let orchestrator = repo.orchestrator();

        let result = orchestrator.restart_merge().wait();
        assert!(matches!(result, Err(OrchestratorError::NoConflictInProgress)));
    }
}

mod leftover {
    use super::*;

    const FIRST: &str = "<a>1</a>\n";
    const SECOND: &str = "<a>2</a>\n";
    const THIRD: &str = "<a>3</a>\n";

    /// A repository whose revert of the middle commit conflicts with HEAD.
    fn reverting() -> (tempfile::TempDir, WorkingCopy, Orchestrator) {
        let (dir, repo) = common::standalone_repo();
        repo.commit_file("a.xml", FIRST, "Add a.xml");
        repo.commit_file("a.xml", SECOND, "Second a.xml");
        let middle = Oid::new(repo.head()).unwrap();
        repo.commit_file("a.xml", THIRD, "Third a.xml");

        let orchestrator = repo.orchestrator();
        let response = orchestrator.revert(middle).wait().unwrap();
        assert_eq!(response.status, OperationStatus::Conflicts);
        assert_eq!(response.state, RepositoryState::Other);
        assert_eq!(response.conflicting_paths, vec!["a.xml"]);
        (dir, repo, orchestrator)
    }

    #[test]
    fn revert_conflict_mine_keeps_head() {
        let (_dir, repo, orchestrator) = reverting();

        let response = orchestrator
            .resolve_using_mine(vec!["a.xml".into()])
            .wait()
            .unwrap();
        assert_eq!(response.status, OperationStatus::Completed);
        assert_eq!(repo.read("a.xml"), THIRD);

        orchestrator.commit("Revert second").wait().unwrap();
        assert_eq!(orchestrator.repository_state().unwrap(), RepositoryState::Safe);
    }

    #[test]
    fn revert_conflict_theirs_takes_reverted_content() {
        let (_dir, repo, orchestrator) = reverting();

        orchestrator
            .resolve_using_theirs(vec!["a.xml".into()])
            .wait()
            .unwrap();
        assert_eq!(repo.read("a.xml"), FIRST);
        assert!(orchestrator.conflicting_paths().unwrap().is_empty());
    }

    #[test]
    fn abort_undoes_conflicted_revert() {
        let (_dir, repo, orchestrator) = reverting();

        let response = orchestrator.abort_merge().wait().unwrap();
        assert_eq!(response.status, OperationStatus::Completed);
        assert_eq!(response.state, RepositoryState::Safe);
        assert!(orchestrator.conflicting_paths().unwrap().is_empty());
        assert_eq!(repo.read("a.xml"), THIRD);
        assert_eq!(orchestrator.history(1).unwrap()[0].summary, "Third a.xml");
    }

    /// A stash whose apply conflicts with a commit made after it.
    fn conflicted_stash() -> (tempfile::TempDir, WorkingCopy, Orchestrator) {
        let (dir, repo) = common::standalone_repo();
        let orchestrator = repo.orchestrator();
        repo.write("README.md", "# Stashed\n");
        orchestrator.stash_save(None).wait().unwrap();
        repo.commit_file("README.md", "# Committed\n", "Edit README");

        let response = orchestrator.stash_apply(0).wait().unwrap();
        assert_eq!(response.conflicting_paths, vec!["README.md"]);
        (dir, repo, orchestrator)
    }

    #[test]
    fn stash_conflict_theirs_takes_stashed_content() {
        let (_dir, repo, orchestrator) = conflicted_stash();

        orchestrator
            .resolve_using_theirs(vec!["README.md".into()])
            .wait()
            .unwrap();
        assert_eq!(repo.read("README.md"), "# Stashed\n");
        assert!(orchestrator.conflicting_paths().unwrap().is_empty());
    }

    #[test]
    fn abort_resets_stash_conflicts_only() {
        let (_dir, repo, orchestrator) = conflicted_stash();
        repo.write("notes.xml", "<notes/>\n");

        let response = orchestrator.abort_merge().wait().unwrap();
        assert_eq!(response.status, OperationStatus::Completed);
        assert!(orchestrator.conflicting_paths().unwrap().is_empty());
        assert_eq!(repo.read("README.md"), "# Committed\n");
        assert!(repo.exists("notes.xml"));
        assert_eq!(orchestrator.stash_list().unwrap().len(), 1);
    }
}
