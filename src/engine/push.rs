//! engine::push
//!
//! Pre-push state gate and push response classification.

use super::error::{OrchestratorError, Result};
use crate::core::config::Config;
use crate::core::messages::MessageKey;
use crate::core::types::{PushResponse, PushStatus};
use crate::git::{Git, PushOutcome};

/// Push the current branch to its upstream.
///
/// A blocking repository state is refused before any transport is opened.
pub(crate) fn push(git: &Git, config: &Config) -> Result<PushResponse> {
    let state = git.state()?;
    if state.is_blocking() {
        log::info!("push refused: repository is {}", state);
        return Ok(PushResponse::new(
            PushStatus::RejectedOtherReason,
            Some(MessageKey::ResolveConflictsFirst.to_string()),
        ));
    }

    let branch = git
        .current_branch()?
        .ok_or(OrchestratorError::NoUpstream)?;
    let upstream = git
        .upstream(config.remote())?
        .ok_or(OrchestratorError::NoUpstream)?;

    let outcome = git
        .push_ref(&upstream.remote, &branch.local_ref(), &upstream.merge_ref)
        .map_err(|e| OrchestratorError::from_remote("push", e))?;
    let response = classify(outcome);
    log::info!(
        "push {} -> {}/{}: {:?}",
        branch,
        upstream.remote,
        upstream.merge_ref,
        response.status
    );
    Ok(response)
}

/// Push one tag to the upstream remote (or the configured remote).
pub(crate) fn push_tag(git: &Git, config: &Config, name: &str) -> Result<PushResponse> {
    let remote = match git.upstream(config.remote())? {
        Some(upstream) => upstream.remote,
        None => config.remote().to_string(),
    };
    let refname = format!("refs/tags/{}", name);

    let outcome = git
        .push_ref(&remote, &refname, &refname)
        .map_err(|e| OrchestratorError::from_remote("push", e))?;
    Ok(classify(outcome))
}

fn classify(outcome: PushOutcome) -> PushResponse {
    match outcome {
        PushOutcome::Pushed => PushResponse::new(PushStatus::Ok, None),
        PushOutcome::UpToDate => PushResponse::new(PushStatus::UpToDate, None),
        PushOutcome::NonFastForward(message) => {
            PushResponse::new(PushStatus::RejectedNonFastForward, Some(message))
        }
        PushOutcome::Rejected(message) => {
            PushResponse::new(PushStatus::RejectedOtherReason, Some(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(classify(PushOutcome::Pushed).status, PushStatus::Ok);
        assert_eq!(classify(PushOutcome::UpToDate).status, PushStatus::UpToDate);

        let nff = classify(PushOutcome::NonFastForward("fetch first".into()));
        assert_eq!(nff.status, PushStatus::RejectedNonFastForward);
        assert_eq!(nff.message.as_deref(), Some("fetch first"));

        let hook = classify(PushOutcome::Rejected("hook declined".into()));
        assert_eq!(hook.status, PushStatus::RejectedOtherReason);
        assert!(hook.is_rejected());
    }
}
