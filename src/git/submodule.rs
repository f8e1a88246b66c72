//! git::submodule
//!
//! Recursive submodule update.

use super::error::GitError;
use super::interface::Git;

impl Git {
    /// Initialize and update every submodule, then recurse into each.
    ///
    /// `checkpoint` is called with the submodule name before each update;
    /// returning `false` stops with [`GitError::Cancelled`]. Returns the
    /// number of submodules updated, nested ones included.
    pub fn update_submodules(
        &self,
        checkpoint: &mut dyn FnMut(&str) -> bool,
    ) -> Result<usize, GitError> {
        let submodules = self
            .repo
            .submodules()
            .map_err(|e| GitError::from_git2(e, "submodules"))?;

        let mut updated = 0;
        for mut submodule in submodules {
            let name = submodule.name().unwrap_or("<non-utf8>").to_string();
            if !checkpoint(&name) {
                return Err(GitError::Cancelled);
            }

            log::debug!("updating submodule {}", name);
            let mut opts = git2::SubmoduleUpdateOptions::new();
            submodule
                .update(true, Some(&mut opts))
                .map_err(|e| GitError::from_git2(e, &format!("submodule {}", name)))?;
            updated += 1;

            match submodule.open() {
                Ok(repo) => updated += Git { repo }.update_submodules(&mut *checkpoint)?,
                Err(e) => log::warn!("cannot open submodule {}: {}", name, e.message()),
            }
        }

        Ok(updated)
    }
}
