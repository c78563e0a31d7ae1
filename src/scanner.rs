//! Detection of languages, frameworks and existing metrics/tracing usage.
//!
//! Each language has a classifier that walks the checkout and decides, per
//! file, whether the instrumentation library is genuinely used rather than
//! only imported. Results are merged by the [`DetectionAggregator`].
//! Detection is heuristic: matches are evidence, not proof.
use log::*;
use std::path::Path;

pub mod aggregator;
pub mod dotnet;
pub mod go;
pub mod java;
pub mod node;
pub mod patterns;
pub mod python;
pub mod rust;
pub mod text;
pub mod traits;
pub mod types;
pub mod walker;

pub use aggregator::DetectionAggregator;
pub use traits::LanguageClassifier;
pub use types::{
    DetectionCandidate, FrameworkDetection, Language, ScanResult, TelemetryKind,
};
pub use walker::SourceWalker;

use crate::{
    CopilotError, Result,
    repo::{Checkout, CheckoutRequest},
};

impl Language {
    /// Dispatch table from language to its classifier.
    pub fn classifier(&self) -> Box<dyn LanguageClassifier> {
        match self {
            Language::Go => Box::new(go::GoClassifier::new()),
            Language::Python => Box::new(python::PythonClassifier::new()),
            Language::Java => Box::new(java::JavaClassifier::new()),
            Language::Node => Box::new(node::NodeClassifier::new()),
            Language::Dotnet => Box::new(dotnet::DotnetClassifier::new()),
            Language::Rust => Box::new(rust::RustClassifier::new()),
        }
    }
}

/// Options applied to every scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Extra directory names never descended into.
    pub skip_dirs: Vec<String>,
}

pub struct Scanner {
    aggregator: DetectionAggregator,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            aggregator: DetectionAggregator::default(),
            options,
        }
    }

    pub fn with_aggregator(
        aggregator: DetectionAggregator,
        options: ScanOptions,
    ) -> Self {
        Self {
            aggregator,
            options,
        }
    }

    /// Materializes the requested ref, scans it and removes the checkout.
    pub async fn scan(&self, request: CheckoutRequest) -> Result<ScanResult> {
        let id = request.id.clone();
        let checkout = Checkout::materialize(request).await?;
        let result = self.scan_path(checkout.path());
        drop(checkout);
        debug!("removed checkout for {id}");
        result
    }

    /// Scans an existing working tree.
    pub fn scan_path(&self, root: &Path) -> Result<ScanResult> {
        if !root.is_dir() {
            return Err(CopilotError::InvalidArgs(format!(
                "scan path is not a directory: {}",
                root.display()
            )));
        }

        let walker = SourceWalker::new(root, &self.options.skip_dirs);
        let result = self.aggregator.aggregate(&walker);

        info!(
            "scan complete: frameworks={} candidates={}",
            result.frameworks.len(),
            result.candidates.len()
        );

        Ok(result)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}
