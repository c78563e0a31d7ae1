//! Directory traversal that prunes dependency, build and VCS directories.
use log::*;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

use crate::Result;

/// Directory names that are never descended into.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "vendor",
    "third_party",
    "node_modules",
    "bower_components",
    "__pycache__",
    "venv",
    ".venv",
    ".tox",
    "target",
    "build",
    "dist",
    ".gradle",
    ".mvn",
    "bin",
    "obj",
];

/// Walks a checkout in a stable (file name sorted) order.
#[derive(Debug, Clone)]
pub struct SourceWalker {
    root: PathBuf,
    skip_dirs: BTreeSet<String>,
}

impl SourceWalker {
    pub fn new(root: &Path, extra_skip_dirs: &[String]) -> Self {
        let mut skip_dirs: BTreeSet<String> =
            SKIP_DIRS.iter().map(|d| d.to_string()).collect();
        skip_dirs.extend(extra_skip_dirs.iter().cloned());

        Self {
            root: root.to_path_buf(),
            skip_dirs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn keep(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        !self.skip_dirs.contains(name.as_ref())
    }

    fn walker(&self) -> impl Iterator<Item = walkdir::Result<DirEntry>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.keep(e))
    }

    /// All regular files matching `filter`. Any unreadable entry aborts the
    /// walk with an error.
    pub fn files<F>(&self, filter: F) -> Result<Vec<PathBuf>>
    where
        F: Fn(&Path) -> bool,
    {
        let mut files = vec![];

        for entry in self.walker() {
            let entry = entry?;
            if entry.file_type().is_file() && filter(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Like [`SourceWalker::files`] but skips entries that cannot be read.
    pub fn files_lenient<F>(&self, filter: F) -> Vec<PathBuf>
    where
        F: Fn(&Path) -> bool,
    {
        self.walker()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("skipping unreadable entry: {err}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && filter(e.path()))
            .map(DirEntry::into_path)
            .collect()
    }

    /// Source files with one of the given extensions (without the dot).
    pub fn files_with_extensions(
        &self,
        extensions: &[&str],
    ) -> Result<Vec<PathBuf>> {
        self.files(|p| has_extension(p, extensions))
    }

    /// First file anywhere in the tree whose name is exactly `name`.
    pub fn find_named(&self, name: &str) -> Option<PathBuf> {
        self.files_lenient(|p| {
            p.file_name().map(|n| n == name).unwrap_or(false)
        })
        .into_iter()
        .next()
    }

    /// Whether a file with one of `names` exists anywhere in the tree.
    pub fn any_named(&self, names: &[&str]) -> bool {
        !self
            .files_lenient(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| names.contains(&n))
                    .unwrap_or(false)
            })
            .is_empty()
    }
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e))
        .unwrap_or(false)
}
