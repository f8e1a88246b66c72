//! Shared fixtures: a bare "origin" and working clones of it.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use repoflow::engine::{ConfigSource, Orchestrator};
use tempfile::TempDir;

/// A bare repository on disk with `main` seeded by one commit.
pub struct Origin {
    root: TempDir,
    bare: PathBuf,
}

impl Origin {
    /// Create the bare repository and push an initial commit to `main`.
    ///
    /// The seed commit contains `README.md` and `shared.xml`.
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let bare = root.path().join("origin.git");
        run_git(root.path(), &["init", "-q", "--bare", "origin.git"]);
        run_git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let origin = Self { root, bare };
        let seed = origin.clone_as("seed");
        seed.write("README.md", "# Test Repo\n");
        seed.write("shared.xml", "<root>\n  <base/>\n</root>\n");
        seed.git(&["add", "README.md", "shared.xml"]);
        seed.git(&["commit", "-q", "-m", "Initial commit"]);
        seed.git(&["push", "-q", "-u", "origin", "main"]);
        origin
    }

    pub fn path(&self) -> &Path {
        &self.bare
    }

    /// Clone into a sibling directory named `name`.
    pub fn clone_as(&self, name: &str) -> WorkingCopy {
        let path = self.root.path().join(name);
        let bare = self.bare.to_string_lossy().into_owned();
        let target = path.to_string_lossy().into_owned();
        run_git(self.root.path(), &["clone", "-q", &bare, &target]);

        let copy = WorkingCopy { path };
        copy.git(&["config", "user.email", "test@example.com"]);
        copy.git(&["config", "user.name", "Test User"]);
        copy.git(&["config", "commit.gpgsign", "false"]);
        copy.git(&["config", "core.editor", "true"]);
        // An empty origin leaves the clone on the default branch name.
        copy.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        copy
    }

    /// Create another bare repository next to this one, `main` holding a
    /// single commit with `file`. Returns its path.
    pub fn sibling(&self, name: &str, file: &str, content: &str) -> PathBuf {
        let bare = self.root.path().join(format!("{}.git", name));
        let bare_arg = bare.to_string_lossy().into_owned();
        run_git(self.root.path(), &["init", "-q", "--bare", &bare_arg]);
        run_git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let seed = self.root.path().join(format!("{}-seed", name));
        let seed_arg = seed.to_string_lossy().into_owned();
        run_git(self.root.path(), &["clone", "-q", &bare_arg, &seed_arg]);
        let copy = WorkingCopy { path: seed };
        copy.git(&["config", "user.email", "test@example.com"]);
        copy.git(&["config", "user.name", "Test User"]);
        copy.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        copy.commit_file(file, content, "Initial commit");
        copy.git(&["push", "-q", "-u", "origin", "main"]);
        bare
    }

    /// Commit id of `main` in the bare repository.
    pub fn main_tip(&self) -> String {
        git_output(&self.bare, &["rev-parse", "refs/heads/main"])
    }

    pub fn has_ref(&self, refname: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "-q", refname])
            .current_dir(&self.bare)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// A non-bare clone.
pub struct WorkingCopy {
    path: PathBuf,
}

impl WorkingCopy {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_dir(&self) -> PathBuf {
        self.path.join(".git")
    }

    pub fn write(&self, file: &str, content: &str) {
        let full = self.path.join(file);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    pub fn read(&self, file: &str) -> String {
        fs::read_to_string(self.path.join(file)).unwrap()
    }

    pub fn exists(&self, file: &str) -> bool {
        self.path.join(file).exists()
    }

    /// Write, stage and commit one file.
    pub fn commit_file(&self, file: &str, content: &str, message: &str) {
        self.write(file, content);
        self.git(&["add", file]);
        self.git(&["commit", "-q", "-m", message]);
    }

    /// Commit one file and push it to origin.
    pub fn publish(&self, file: &str, content: &str, message: &str) {
        self.commit_file(file, content, message);
        self.git(&["push", "-q", "origin", "main"]);
    }

    pub fn git(&self, args: &[&str]) -> String {
        git_output(&self.path, args)
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    /// Number of parents of HEAD.
    pub fn head_parent_count(&self) -> usize {
        self.git(&["rev-list", "--parents", "-n", "1", "HEAD"])
            .split_whitespace()
            .count()
            - 1
    }

    /// An orchestrator with this working copy open and default configuration.
    pub fn orchestrator(&self) -> Orchestrator {
        let orchestrator = Orchestrator::with_config_source(ConfigSource::Defaults);
        orchestrator
            .open_working_copy(&self.path)
            .wait()
            .expect("failed to open working copy");
        orchestrator
    }
}

/// A standalone repository with one commit and no remote.
pub fn standalone_repo() -> (TempDir, WorkingCopy) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().to_path_buf();
    run_git(&path, &["init", "-q"]);
    run_git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    let copy = WorkingCopy { path };
    copy.git(&["config", "user.email", "test@example.com"]);
    copy.git(&["config", "user.name", "Test User"]);
    copy.git(&["config", "commit.gpgsign", "false"]);
    copy.commit_file("README.md", "# Test Repo\n", "Initial commit");
    (dir, copy)
}

/// Run a git command in the given directory, panicking on failure.
pub fn run_git(dir: &Path, args: &[&str]) {
    git_output(dir, args);
}

fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
