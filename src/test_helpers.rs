//! Common test helper functions shared across test modules.
use std::{fs, path::Path};
use tempfile::TempDir;

use crate::generator::types::{EditAction, FileEdit};

/// Writes `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Reads `root/relative` into a string.
pub fn read_file(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

/// Creates a git repository holding `files` in a single commit. Returns the
/// directory and the name of the checked out branch.
pub fn init_git_repo(files: &[(&str, &str)]) -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let repo = git2::Repository::init(tmp.path()).unwrap();

    for (path, content) in files {
        write_file(tmp.path(), path, content);
    }

    let mut index = repo.index().unwrap();
    index
        .add_all(["."], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = git2::Signature::now("test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
        .unwrap();

    let branch = repo.head().unwrap().shorthand().unwrap().to_string();

    drop(tree);
    drop(repo);

    (tmp, branch)
}

/// Shorthand for building a [`FileEdit`] in tests.
pub fn edit(
    path: &str,
    action: EditAction,
    content: &str,
    anchor: Option<&str>,
) -> FileEdit {
    FileEdit {
        path: path.into(),
        action,
        content: content.into(),
        anchor: anchor.map(String::from),
    }
}
