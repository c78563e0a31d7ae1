//! Rust classifier (text rules) with Cargo.toml framework inference.
use log::*;

use crate::{
    Result,
    scanner::{
        patterns::{RUST_RULES, classify_with_rules, read_source},
        traits::LanguageClassifier,
        types::{Classification, Language},
        walker::SourceWalker,
    },
};

/// Framework labels keyed by crate name, checked in order.
const FRAMEWORKS: &[(&str, &str)] = &[
    ("axum", "Axum"),
    ("actix-web", "Actix Web"),
    ("rocket", "Rocket"),
    ("warp", "Warp"),
];

#[derive(Debug, Default)]
pub struct RustClassifier {}

impl RustClassifier {
    pub fn new() -> Self {
        Self {}
    }
}

impl LanguageClassifier for RustClassifier {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn is_present(&self, walker: &SourceWalker) -> bool {
        walker.root().join("Cargo.toml").is_file()
    }

    fn framework(&self, walker: &SourceWalker) -> String {
        let manifest = read_source(&walker.root().join("Cargo.toml"))
            .ok()
            .and_then(|content| match toml::from_str::<toml::Table>(&content) {
                Ok(table) => Some(table),
                Err(err) => {
                    warn!("failed to parse Cargo.toml: {err}");
                    None
                }
            });

        let Some(manifest) = manifest else {
            return Language::Rust.label().into();
        };

        let declared = |name: &str| {
            ["dependencies", "dev-dependencies"].iter().any(|section| {
                manifest
                    .get(*section)
                    .and_then(|deps| deps.get(name))
                    .is_some()
            }) || manifest
                .get("workspace")
                .and_then(|w| w.get("dependencies"))
                .and_then(|deps| deps.get(name))
                .is_some()
        };

        FRAMEWORKS
            .iter()
            .find(|(name, _)| declared(*name))
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| Language::Rust.label().into())
    }

    fn classify(&self, walker: &SourceWalker) -> Result<Classification> {
        classify_with_rules(walker, &RUST_RULES)
    }
}
