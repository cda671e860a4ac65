//! Ephemeral staging repository with guaranteed teardown.
//!
//! One `Workspace` is created per publish invocation and owned by it
//! exclusively for its entire lifetime. It is never pooled or reused, and
//! the directory is removed on every exit path: `close()` surfaces
//! removal errors on the happy path, `Drop` is the backstop for early
//! returns and panics.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use git2::{PushOptions, RemoteCallbacks, Repository, Signature};
use uuid::Uuid;

use crate::errors::PublishError;

const GIT_AUTHOR_NAME: &str = "gitship";
const GIT_AUTHOR_EMAIL: &str = "gitship@localhost";

pub struct Workspace {
    root: PathBuf,
    repo: Repository,
    removed: bool,
}

impl Workspace {
    /// Create a uniquely named directory under the system temp dir and
    /// initialize it as an empty git repository.
    ///
    /// The name combines a millisecond timestamp with a random UUID, so
    /// collisions between concurrent invocations are not a concern.
    pub fn create() -> Result<Self, PublishError> {
        let name = format!(
            "gitship-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let root = std::env::temp_dir().join(name);
        fs::create_dir_all(&root)?;

        let repo = match Repository::init(&root) {
            Ok(repo) => repo,
            Err(err) => {
                // Init failed after the directory was made; do not leak it.
                remove_tree_logged(&root);
                return Err(err.into());
            }
        };

        tracing::debug!(path = %root.display(), "workspace created");
        Ok(Self {
            root,
            repo,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `contents` to `file_name` inside the workspace, stage it,
    /// and commit it as the repository's initial commit.
    pub fn commit_file(
        &self,
        file_name: &str,
        contents: &str,
        message: &str,
    ) -> Result<(), PublishError> {
        fs::write(self.root.join(file_name), contents)?;

        let mut index = self.repo.index()?;
        index.add_path(Path::new(file_name))?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = Signature::now(GIT_AUTHOR_NAME, GIT_AUTHOR_EMAIL)?;

        // Fresh repository, unborn HEAD: the commit has no parents.
        self.repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[])?;
        Ok(())
    }

    /// Register `remote_url` as `origin`, point `branch` at the current
    /// HEAD commit, and force-push it.
    ///
    /// The leading `+` in the refspec makes the push forced: the remote
    /// branch is treated as fully owned by this publish, not as a history
    /// to merge into.
    pub fn push_branch(
        &self,
        remote_url: &str,
        token: &str,
        branch: &str,
    ) -> Result<(), PublishError> {
        let mut remote = self.repo.remote("origin", remote_url)?;

        let head = self.repo.head()?.peel_to_commit()?;
        self.repo.branch(branch, &head, true)?;
        self.repo.set_head(&format!("refs/heads/{branch}"))?;

        let token = token.to_string();
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, _allowed| {
            git2::Cred::userpass_plaintext(username_from_url.unwrap_or("x-access-token"), &token)
        });
        let mut opts = PushOptions::new();
        opts.remote_callbacks(callbacks);

        let refspec = format!("+refs/heads/{branch}:refs/heads/{branch}");
        remote.push(&[refspec.as_str()], Some(&mut opts))?;
        Ok(())
    }

    /// Remove the workspace tree, surfacing filesystem errors. Prefer
    /// this on the success path; `Drop` covers everything else.
    pub fn close(mut self) -> Result<(), PublishError> {
        self.removed = true;
        fs::remove_dir_all(&self.root)?;
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        remove_tree_logged(&self.root);
    }
}

/// Remove a workspace tree, logging rather than panicking on failure.
/// Shared by `Drop` and the init-failure path in `create` so no
/// teardown error is ever silently swallowed.
fn remove_tree_logged(root: &Path) {
    if let Err(err) = fs::remove_dir_all(root) {
        tracing::warn!(
            path = %root.display(),
            error = %err,
            "failed to remove workspace"
        );
    }
}
