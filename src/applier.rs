//! Applies an [`InstrumentationPlan`] to a working tree.
//!
//! Edits run in plan order. Anchored edits insert their content after the
//! first line containing the anchor and fall back to appending when no line
//! matches. Merge edits add missing keys to a JSON document and rewrite it
//! pretty-printed. An edit whose content is already in place is skipped, so
//! applying the same plan twice leaves the tree unchanged.
//!
//! A failed edit aborts the run; earlier edits stay on disk and the caller
//! should discard the tree.
use log::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{collections::HashSet, fs, path::Path};

use crate::{
    CopilotError, Result,
    generator::types::{EditAction, FileEdit, InstrumentationPlan},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    Created,
    Appended,
    /// Inserted after the anchor line.
    Inserted,
    /// Anchor missing; content appended at end of file.
    AnchorFallback,
    /// Missing JSON keys added.
    Merged,
    Prepended,
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedEdit {
    pub path: String,
    pub action: EditAction,
    pub outcome: EditOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub edits: Vec<AppliedEdit>,
}

impl ApplyReport {
    /// True when at least one file changed on disk.
    pub fn changed(&self) -> bool {
        self.edits
            .iter()
            .any(|e| e.outcome != EditOutcome::AlreadyPresent)
    }

    pub fn count(&self, outcome: EditOutcome) -> usize {
        self.edits.iter().filter(|e| e.outcome == outcome).count()
    }
}

/// Applies every edit of `plan` below `root`.
pub fn apply(root: &Path, plan: &InstrumentationPlan) -> Result<ApplyReport> {
    if !root.is_dir() {
        return Err(CopilotError::InvalidArgs(format!(
            "working tree is not a directory: {}",
            root.display()
        )));
    }

    info!(
        "applying {} edits for {} ({})",
        plan.edits.len(),
        plan.service,
        plan.mode
    );

    let mut touched: HashSet<&str> = HashSet::new();
    let mut report = ApplyReport::default();

    for edit in plan.edits.iter() {
        check_path(edit)?;

        if edit.action == EditAction::Create
            && touched.contains(edit.path.as_str())
        {
            return Err(CopilotError::apply(
                &edit.path,
                "create after an earlier edit of the same file in this plan",
            ));
        }

        let outcome = apply_edit(root, edit)?;
        debug!("{} {}: {:?}", edit.action, edit.path, outcome);

        touched.insert(edit.path.as_str());
        report.edits.push(AppliedEdit {
            path: edit.path.clone(),
            action: edit.action,
            outcome,
        });
    }

    Ok(report)
}

fn check_path(edit: &FileEdit) -> Result<()> {
    let escapes = edit.path.starts_with('/')
        || edit.path.split(['/', '\\']).any(|c| c == "..");

    if edit.path.trim().is_empty() || escapes {
        return Err(CopilotError::apply(
            &edit.path,
            "path must be relative to the working tree",
        ));
    }

    Ok(())
}

fn apply_edit(root: &Path, edit: &FileEdit) -> Result<EditOutcome> {
    let path = root.join(&edit.path);

    match (edit.action, edit.anchor.as_deref()) {
        (EditAction::Create, _) => create(&path, edit),
        (EditAction::Merge, _) => merge(&path, edit),
        (EditAction::Prepend, _) => prepend(&path, edit),
        (_, Some(anchor)) => insert_after_anchor(&path, edit, anchor),
        (EditAction::Append, None) => append(&path, edit),
        (EditAction::Modify, None) => Err(CopilotError::apply(
            &edit.path,
            "modify requires an anchor",
        )),
    }
}

fn create(path: &Path, edit: &FileEdit) -> Result<EditOutcome> {
    if path.exists() {
        let existing = read(path, edit)?;
        if existing == edit.content {
            return Ok(EditOutcome::AlreadyPresent);
        }
        return Err(CopilotError::apply(
            &edit.path,
            "file already exists with different content",
        ));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CopilotError::apply(&edit.path, e.to_string()))?;
    }

    write(path, edit, &edit.content)?;
    Ok(EditOutcome::Created)
}

fn append(path: &Path, edit: &FileEdit) -> Result<EditOutcome> {
    let existing = read_existing(path, edit)?;

    if already_present(&existing, &edit.content) {
        return Ok(EditOutcome::AlreadyPresent);
    }

    write(path, edit, &appended(existing, &edit.content))?;
    Ok(EditOutcome::Appended)
}

fn insert_after_anchor(
    path: &Path,
    edit: &FileEdit,
    anchor: &str,
) -> Result<EditOutcome> {
    let existing = read_existing(path, edit)?;

    if already_present(&existing, &edit.content) {
        return Ok(EditOutcome::AlreadyPresent);
    }

    let Some(offset) = line_end_after(&existing, anchor) else {
        let missing = CopilotError::AnchorNotFound {
            path: edit.path.clone(),
            anchor: anchor.to_string(),
        };
        warn!("{missing}: appending at end of file");
        write(path, edit, &appended(existing, &edit.content))?;
        return Ok(EditOutcome::AnchorFallback);
    };

    let mut updated = String::with_capacity(existing.len() + edit.content.len() + 1);
    updated.push_str(&existing[..offset]);
    if !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&as_lines(&edit.content));
    updated.push_str(&existing[offset..]);

    write(path, edit, &updated)?;
    Ok(EditOutcome::Inserted)
}

fn prepend(path: &Path, edit: &FileEdit) -> Result<EditOutcome> {
    let existing = read_existing(path, edit)?;

    if already_present(&existing, &edit.content) {
        return Ok(EditOutcome::AlreadyPresent);
    }

    let offset = preamble_end(&existing);
    let mut updated = String::with_capacity(existing.len() + edit.content.len() + 1);
    updated.push_str(&existing[..offset]);
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&as_lines(&edit.content));
    updated.push_str(&existing[offset..]);

    write(path, edit, &updated)?;
    Ok(EditOutcome::Prepended)
}

/// Byte offset past a leading shebang and `use strict` directive, which
/// must stay first in their file.
fn preamble_end(content: &str) -> usize {
    let mut offset = 0;

    for (index, line) in content.split_inclusive('\n').enumerate() {
        let shebang = index == 0 && line.starts_with("#!");
        let strict = matches!(
            line.trim().trim_end_matches(';'),
            "'use strict'" | "\"use strict\""
        );
        if !shebang && !strict {
            break;
        }
        offset += line.len();
    }

    offset
}

fn merge(path: &Path, edit: &FileEdit) -> Result<EditOutcome> {
    let existing = read_existing(path, edit)?;

    let mut document: Value = serde_json::from_str(&existing).map_err(|e| {
        CopilotError::apply(&edit.path, format!("not valid JSON: {e}"))
    })?;
    let additions: Value = serde_json::from_str(&edit.content).map_err(|e| {
        CopilotError::apply(&edit.path, format!("merge content: {e}"))
    })?;

    let (Some(target), Some(additions)) =
        (document.as_object_mut(), additions.as_object())
    else {
        return Err(CopilotError::apply(
            &edit.path,
            "merge requires a JSON object on both sides",
        ));
    };

    let changed = merge_missing(target, additions)
        .map_err(|reason| CopilotError::apply(&edit.path, reason))?;

    if !changed {
        return Ok(EditOutcome::AlreadyPresent);
    }

    let mut updated = serde_json::to_string_pretty(&document)?;
    updated.push('\n');

    write(path, edit, &updated)?;
    Ok(EditOutcome::Merged)
}

/// Adds every key of `additions` that `target` lacks, descending into
/// objects present on both sides. Existing values are never replaced.
fn merge_missing(
    target: &mut Map<String, Value>,
    additions: &Map<String, Value>,
) -> std::result::Result<bool, String> {
    let mut changed = false;

    for (key, value) in additions {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
            changed = true;
            continue;
        }

        match (target.get_mut(key), value) {
            (Some(Value::Object(nested)), Value::Object(value)) => {
                changed |= merge_missing(nested, value)?;
            }
            (Some(_), Value::Object(_)) => {
                return Err(format!("`{key}` exists but is not an object"));
            }
            _ => {}
        }
    }

    Ok(changed)
}

/// Byte offset just past the first line containing `anchor`.
fn line_end_after(content: &str, anchor: &str) -> Option<usize> {
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        offset += line.len();
        if line.contains(anchor) {
            return Some(offset);
        }
    }

    None
}

fn appended(mut existing: String, content: &str) -> String {
    if !existing.is_empty() && !existing.ends_with('\n') {
        existing.push('\n');
    }
    existing.push_str(&as_lines(content));
    existing
}

/// Content terminated by a newline so it occupies whole lines.
fn as_lines(content: &str) -> String {
    if content.ends_with('\n') {
        content.to_string()
    } else {
        format!("{content}\n")
    }
}

fn already_present(existing: &str, content: &str) -> bool {
    let needle = content.trim();
    !needle.is_empty() && existing.contains(needle)
}

fn read_existing(path: &Path, edit: &FileEdit) -> Result<String> {
    if !path.is_file() {
        return Err(CopilotError::apply(&edit.path, "file does not exist"));
    }
    read(path, edit)
}

fn read(path: &Path, edit: &FileEdit) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| CopilotError::apply(&edit.path, e.to_string()))
}

fn write(path: &Path, edit: &FileEdit, content: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| CopilotError::apply(&edit.path, e.to_string()))
}
