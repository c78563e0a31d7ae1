//! Value types produced by the detection phase.
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::error::CopilotError;

/// Languages the scanner knows how to classify.
///
/// Declaration order is the order detections are reported in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum Language {
    Go,
    Python,
    Java,
    #[serde(rename = "Node.js")]
    Node,
    #[serde(rename = ".NET")]
    Dotnet,
    Rust,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Go,
        Language::Python,
        Language::Java,
        Language::Node,
        Language::Dotnet,
        Language::Rust,
    ];

    /// Human readable label, also the default framework label.
    pub fn label(&self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::Python => "Python",
            Language::Java => "Java",
            Language::Node => "Node.js",
            Language::Dotnet => ".NET",
            Language::Rust => "Rust",
        }
    }

    /// Service name used when the caller does not supply one.
    pub fn default_service_name(&self) -> &'static str {
        match self {
            Language::Go => "go-service",
            Language::Python => "python-service",
            Language::Java => "java-service",
            Language::Node => "nodejs-service",
            Language::Dotnet => "dotnet-service",
            Language::Rust => "rust-service",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Language {
    type Err = CopilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "go" | "golang" => Ok(Language::Go),
            "python" | "py" => Ok(Language::Python),
            "java" | "kotlin" => Ok(Language::Java),
            "node" | "nodejs" | "node.js" | "javascript" | "typescript" => {
                Ok(Language::Node)
            }
            "dotnet" | ".net" | "csharp" | "c#" => Ok(Language::Dotnet),
            "rust" => Ok(Language::Rust),
            _ => Err(CopilotError::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// The two instrumentation families the classifiers look for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    Metrics,
    Tracing,
}

impl TelemetryKind {
    pub fn other(&self) -> TelemetryKind {
        match self {
            TelemetryKind::Metrics => TelemetryKind::Tracing,
            TelemetryKind::Tracing => TelemetryKind::Metrics,
        }
    }
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryKind::Metrics => f.write_str("metrics"),
            TelemetryKind::Tracing => f.write_str("tracing"),
        }
    }
}

/// Files in which genuine usage (not just an import) of one instrumentation
/// family was found for a language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    pub language: Language,
    pub framework: String,
    pub kind: TelemetryKind,
    /// Allowlist entries that matched, sorted and de-duplicated.
    pub patterns: Vec<String>,
    /// Repo-relative, `/`-separated paths.
    pub files: BTreeSet<String>,
    pub service_name: String,
}

impl DetectionCandidate {
    pub fn first_file(&self) -> Option<&str> {
        self.files.iter().next().map(String::as_str)
    }
}

/// Per-language summary of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkDetection {
    pub language: Language,
    pub framework: String,
    pub has_metrics: bool,
    pub has_tracing: bool,
    pub service_name: String,
}

/// Root output of the detection phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub frameworks: Vec<FrameworkDetection>,
    pub candidates: Vec<DetectionCandidate>,
}

impl ScanResult {
    pub fn detection(&self, language: Language) -> Option<&FrameworkDetection> {
        self.frameworks.iter().find(|f| f.language == language)
    }

    pub fn candidates_for(&self, language: Language) -> Vec<DetectionCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.language == language)
            .cloned()
            .collect()
    }
}

/// What a classifier reports for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub metrics: KindMatches,
    pub tracing: KindMatches,
}

impl Classification {
    pub fn kind_mut(&mut self, kind: TelemetryKind) -> &mut KindMatches {
        match kind {
            TelemetryKind::Metrics => &mut self.metrics,
            TelemetryKind::Tracing => &mut self.tracing,
        }
    }

    pub fn kind(&self, kind: TelemetryKind) -> &KindMatches {
        match kind {
            TelemetryKind::Metrics => &self.metrics,
            TelemetryKind::Tracing => &self.tracing,
        }
    }
}

/// Matched files and allowlist entries for a single kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindMatches {
    pub files: BTreeSet<String>,
    pub patterns: BTreeSet<String>,
}

impl KindMatches {
    pub fn record<I, S>(&mut self, file: &str, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.insert(file.to_string());
        self.patterns.extend(patterns.into_iter().map(Into::into));
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_aliases() {
        assert_eq!("go".parse::<Language>().unwrap(), Language::Go);
        assert_eq!("NodeJS".parse::<Language>().unwrap(), Language::Node);
        assert_eq!("Node.js".parse::<Language>().unwrap(), Language::Node);
        assert_eq!("dotnet".parse::<Language>().unwrap(), Language::Dotnet);
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(CopilotError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn serializes_language_labels() {
        let json = serde_json::to_string(&Language::Node).unwrap();
        assert_eq!(json, "\"Node.js\"");
        let json = serde_json::to_string(&Language::Dotnet).unwrap();
        assert_eq!(json, "\".NET\"");
        let parsed: Language = serde_json::from_str("\"Go\"").unwrap();
        assert_eq!(parsed, Language::Go);
    }

    #[test]
    fn kind_matches_collects_sorted_patterns() {
        let mut matches = KindMatches::default();
        matches.record("b.go", ["prometheus.NewCounterVec"]);
        matches.record("a.go", ["prometheus.MustRegister", "prometheus.NewCounterVec"]);

        let files: Vec<_> = matches.files.iter().cloned().collect();
        assert_eq!(files, vec!["a.go", "b.go"]);
        let patterns: Vec<_> = matches.patterns.iter().cloned().collect();
        assert_eq!(
            patterns,
            vec!["prometheus.MustRegister", "prometheus.NewCounterVec"]
        );
    }
}
