use std::{borrow::Cow, path::Path};

/// Normalizes a path by replacing backslashes with forward slashes and removing
/// all "./" sequences. Uses Cow to avoid allocation when path is already
/// normalized.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.contains('\\') || path.contains("./") {
        Cow::Owned(path.replace("\\", "/").replace("./", ""))
    } else {
        Cow::Borrowed(path)
    }
}

/// Returns `path` relative to `root` with forward slashes, the form used for
/// every file reported by the scanner.
pub fn repo_relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    normalize_path(&relative.display().to_string()).into_owned()
}

/// Directory portion of a repo-relative path, empty for files at the root.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Joins a repo-relative directory and a file name.
pub fn join_relative(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}
