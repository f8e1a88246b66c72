//! git::remote
//!
//! Fetch and push over git2's transports.
//!
//! Both take callbacks instead of engine-specific types so that callers
//! can wire cancellation and progress however they like. A transfer
//! callback returning `false` aborts the transfer with
//! [`GitError::Cancelled`].

use super::error::GitError;
use super::interface::Git;

/// How the remote answered a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote ref was updated.
    Pushed,
    /// The remote ref already pointed at the local commit.
    UpToDate,
    /// The update was refused because it would lose remote commits.
    NonFastForward(String),
    /// The remote refused the update for another reason (hook, policy).
    Rejected(String),
}

impl Git {
    /// Fetch `remote_name` using its configured refspecs.
    ///
    /// `progress` receives `(received_objects, total_objects)`.
    pub fn fetch(
        &self,
        remote_name: &str,
        progress: &mut dyn FnMut(usize, usize) -> bool,
    ) -> Result<(), GitError> {
        let mut remote =
            self.repo
                .find_remote(remote_name)
                .map_err(|_| GitError::RemoteNotFound {
                    name: remote_name.to_string(),
                })?;

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.transfer_progress(|stats| {
            progress(stats.received_objects(), stats.total_objects())
        });

        let mut opts = git2::FetchOptions::new();
        opts.remote_callbacks(callbacks)
            .download_tags(git2::AutotagOption::Auto);

        let refspecs: [&str; 0] = [];
        log::debug!("fetching {}", remote_name);
        remote
            .fetch(&refspecs, Some(&mut opts), Some("repoflow: fetch"))
            .map_err(|e| GitError::from_git2(e, "fetch"))
    }

    /// Push `local_ref` to `remote_ref` on `remote_name`.
    ///
    /// Lists the remote first so an unchanged ref reports
    /// [`PushOutcome::UpToDate`] without sending anything.
    pub fn push_ref(
        &self,
        remote_name: &str,
        local_ref: &str,
        remote_ref: &str,
    ) -> Result<PushOutcome, GitError> {
        let mut remote =
            self.repo
                .find_remote(remote_name)
                .map_err(|_| GitError::RemoteNotFound {
                    name: remote_name.to_string(),
                })?;

        let local = self
            .repo
            .refname_to_id(local_ref)
            .map_err(|e| GitError::from_git2(e, local_ref))?;

        let remote_tip = {
            let connection = remote
                .connect_auth(git2::Direction::Push, None, None)
                .map_err(|e| GitError::from_git2(e, "connect"))?;
            connection
                .list()
                .map_err(|e| GitError::from_git2(e, "ls-remote"))?
                .iter()
                .find(|head| head.name() == remote_ref)
                .map(|head| head.oid())
        };
        if remote_tip == Some(local) {
            return Ok(PushOutcome::UpToDate);
        }

        let mut refusal: Option<String> = None;
        let result = {
            let mut callbacks = git2::RemoteCallbacks::new();
            callbacks.push_update_reference(|_refname, status| {
                if let Some(message) = status {
                    refusal = Some(message.to_string());
                }
                Ok(())
            });
            let mut opts = git2::PushOptions::new();
            opts.remote_callbacks(callbacks);

            let refspec = format!("{}:{}", local_ref, remote_ref);
            log::debug!("pushing {} to {}", refspec, remote_name);
            remote.push(&[refspec.as_str()], Some(&mut opts))
        };

        match result {
            Err(e) if e.code() == git2::ErrorCode::NotFastForward => {
                Ok(PushOutcome::NonFastForward(e.message().to_string()))
            }
            Err(e) => Err(GitError::from_git2(e, "push")),
            Ok(()) => Ok(match refusal {
                None => PushOutcome::Pushed,
                Some(message) if is_non_fast_forward(&message) => {
                    PushOutcome::NonFastForward(message)
                }
                Some(message) => PushOutcome::Rejected(message),
            }),
        }
    }
}

fn is_non_fast_forward(status: &str) -> bool {
    let status = status.to_ascii_lowercase();
    ["non-fast-forward", "fetch first", "not a fast-forward", "nonfastforward"]
        .iter()
        .any(|needle| status.contains(needle))
}
