//! Node.js classifier (text rules) with package.json framework inference.
use log::*;
use serde_json::Value;

use crate::{
    Result,
    scanner::{
        patterns::{NODE_RULES, classify_with_rules, read_source},
        traits::LanguageClassifier,
        types::{Classification, Language},
        walker::SourceWalker,
    },
};

/// Framework labels keyed by npm package name, checked in order.
const FRAMEWORKS: &[(&str, &str)] = &[
    ("@nestjs/core", "NestJS"),
    ("express", "Express"),
    ("fastify", "Fastify"),
    ("koa", "Koa"),
];

#[derive(Debug, Default)]
pub struct NodeClassifier {}

impl NodeClassifier {
    pub fn new() -> Self {
        Self {}
    }
}

impl LanguageClassifier for NodeClassifier {
    fn language(&self) -> Language {
        Language::Node
    }

    fn is_present(&self, walker: &SourceWalker) -> bool {
        walker.root().join("package.json").is_file()
    }

    fn framework(&self, walker: &SourceWalker) -> String {
        let path = walker.root().join("package.json");

        let manifest = read_source(&path)
            .ok()
            .and_then(|content| match serde_json::from_str::<Value>(&content) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("failed to parse package.json: {err}");
                    None
                }
            });

        manifest
            .and_then(|m| framework_from_manifest(&m))
            .unwrap_or_else(|| Language::Node.label().into())
    }

    fn classify(&self, walker: &SourceWalker) -> Result<Classification> {
        classify_with_rules(walker, &NODE_RULES)
    }
}

fn framework_from_manifest(manifest: &Value) -> Option<String> {
    let declared = |name: &str| {
        ["dependencies", "devDependencies"].iter().any(|section| {
            manifest
                .get(section)
                .and_then(|deps| deps.get(name))
                .is_some()
        })
    };

    FRAMEWORKS
        .iter()
        .find(|(package, _)| declared(*package))
        .map(|(_, label)| label.to_string())
}
