//! Plan value types and the validating plan builder.
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashSet, fmt, str::FromStr};

use crate::{CopilotError, Result, scanner::Language};

/// Target telemetry state requested by the user.
///
/// Ordered by richness: `none < metrics|traces < both`, with `metrics` and
/// `traces` incomparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryMode {
    Metrics,
    Traces,
    Both,
    None,
}

impl TelemetryMode {
    pub fn includes_metrics(&self) -> bool {
        matches!(self, TelemetryMode::Metrics | TelemetryMode::Both)
    }

    pub fn includes_traces(&self) -> bool {
        matches!(self, TelemetryMode::Traces | TelemetryMode::Both)
    }

    fn richness(&self) -> u8 {
        match self {
            TelemetryMode::None => 0,
            TelemetryMode::Metrics | TelemetryMode::Traces => 1,
            TelemetryMode::Both => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryMode::Metrics => "metrics",
            TelemetryMode::Traces => "traces",
            TelemetryMode::Both => "both",
            TelemetryMode::None => "none",
        }
    }
}

impl PartialOrd for TelemetryMode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }

        match self.richness().cmp(&other.richness()) {
            // metrics vs traces
            Ordering::Equal => None,
            ordering => Some(ordering),
        }
    }
}

impl fmt::Display for TelemetryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TelemetryMode {
    type Err = CopilotError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metrics" => Ok(TelemetryMode::Metrics),
            "traces" | "tracing" | "otel" => Ok(TelemetryMode::Traces),
            "both" => Ok(TelemetryMode::Both),
            "none" => Ok(TelemetryMode::None),
            other => Err(CopilotError::InvalidArgs(format!(
                "unknown telemetry mode: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    /// Add content to an existing file, after the anchor when one is given.
    Append,
    /// Write a new file.
    Create,
    /// Insert content after an anchor line.
    Modify,
    /// Merge a JSON object into an existing JSON document, adding only the
    /// keys it lacks.
    Merge,
    /// Insert content at the start of an existing file, after any shebang.
    Prepend,
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditAction::Append => f.write_str("append"),
            EditAction::Create => f.write_str("create"),
            EditAction::Modify => f.write_str("modify"),
            EditAction::Merge => f.write_str("merge"),
            EditAction::Prepend => f.write_str("prepend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdit {
    /// Repo-relative path.
    pub path: String,
    pub action: EditAction,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationPlan {
    pub language: Language,
    pub service: String,
    pub mode: TelemetryMode,
    pub edits: Vec<FileEdit>,
    pub description: String,
    /// Steps the edits cannot perform and the user must finish by hand.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Accumulates edits in order and rejects plans the applier could not
/// execute deterministically.
#[derive(Debug)]
pub struct PlanBuilder {
    language: Language,
    service: String,
    mode: TelemetryMode,
    edits: Vec<FileEdit>,
    notes: Vec<String>,
}

impl PlanBuilder {
    pub fn new(language: Language, service: &str, mode: TelemetryMode) -> Self {
        Self {
            language,
            service: service.to_string(),
            mode,
            edits: vec![],
            notes: vec![],
        }
    }

    pub fn append(&mut self, path: &str, content: String) -> &mut Self {
        self.push(path, EditAction::Append, content, None)
    }

    pub fn append_after(
        &mut self,
        path: &str,
        anchor: &str,
        content: String,
    ) -> &mut Self {
        self.push(path, EditAction::Append, content, Some(anchor))
    }

    pub fn create(&mut self, path: &str, content: String) -> &mut Self {
        self.push(path, EditAction::Create, content, None)
    }

    pub fn modify(
        &mut self,
        path: &str,
        anchor: &str,
        content: String,
    ) -> &mut Self {
        self.push(path, EditAction::Modify, content, Some(anchor))
    }

    /// `content` must be a JSON object; nested objects merge key by key.
    pub fn merge(&mut self, path: &str, content: String) -> &mut Self {
        self.push(path, EditAction::Merge, content, None)
    }

    pub fn prepend(&mut self, path: &str, content: String) -> &mut Self {
        self.push(path, EditAction::Prepend, content, None)
    }

    pub fn note(&mut self, note: String) -> &mut Self {
        self.notes.push(note);
        self
    }

    fn push(
        &mut self,
        path: &str,
        action: EditAction,
        content: String,
        anchor: Option<&str>,
    ) -> &mut Self {
        self.edits.push(FileEdit {
            path: path.to_string(),
            action,
            content,
            anchor: anchor.map(String::from),
        });
        self
    }

    pub fn build(self, description: String) -> Result<InstrumentationPlan> {
        validate_edits(&self.edits)?;

        Ok(InstrumentationPlan {
            language: self.language,
            service: self.service,
            mode: self.mode,
            edits: self.edits,
            description,
            notes: self.notes,
        })
    }
}

/// Checks the invariants every plan must satisfy before it is applied.
pub fn validate_edits(edits: &[FileEdit]) -> Result<()> {
    let mut touched: HashSet<&str> = HashSet::new();

    for edit in edits {
        if edit.path.trim().is_empty() {
            return Err(CopilotError::invalid_plan("edit with empty path"));
        }

        if edit.path.starts_with('/') || edit.path.split('/').any(|c| c == "..")
        {
            return Err(CopilotError::invalid_plan(format!(
                "{}: path must be relative to the repository root",
                edit.path
            )));
        }

        let anchor_missing = edit
            .anchor
            .as_deref()
            .map(|a| a.trim().is_empty())
            .unwrap_or(true);

        match edit.action {
            EditAction::Modify if anchor_missing => {
                return Err(CopilotError::invalid_plan(format!(
                    "{}: modify requires a non-empty anchor",
                    edit.path
                )));
            }
            EditAction::Append
                if edit.anchor.is_some() && anchor_missing =>
            {
                return Err(CopilotError::invalid_plan(format!(
                    "{}: anchored append requires a non-empty anchor",
                    edit.path
                )));
            }
            EditAction::Merge | EditAction::Prepend if edit.anchor.is_some() => {
                return Err(CopilotError::invalid_plan(format!(
                    "{}: {} does not take an anchor",
                    edit.path, edit.action
                )));
            }
            EditAction::Merge
                if !serde_json::from_str::<serde_json::Value>(&edit.content)
                    .is_ok_and(|v| v.is_object()) =>
            {
                return Err(CopilotError::invalid_plan(format!(
                    "{}: merge content must be a JSON object",
                    edit.path
                )));
            }
            EditAction::Create if touched.contains(edit.path.as_str()) => {
                return Err(CopilotError::invalid_plan(format!(
                    "{}: create after an earlier edit of the same file",
                    edit.path
                )));
            }
            _ => {}
        }

        touched.insert(edit.path.as_str());
    }

    Ok(())
}
