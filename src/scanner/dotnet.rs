//! .NET classifier (text rules); presence and framework come from the
//! project file at the repository root.
use std::fs;

use crate::{
    Result,
    scanner::{
        patterns::{DOTNET_RULES, classify_with_rules, read_source},
        traits::LanguageClassifier,
        types::{Classification, Language},
        walker::{SourceWalker, has_extension},
    },
};

const WEB_SDK: &str = "Microsoft.NET.Sdk.Web";

#[derive(Debug, Default)]
pub struct DotnetClassifier {}

impl DotnetClassifier {
    pub fn new() -> Self {
        Self {}
    }

    fn project_files(&self, walker: &SourceWalker) -> Vec<std::path::PathBuf> {
        let Ok(entries) = fs::read_dir(walker.root()) else {
            return vec![];
        };

        let mut projects: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && has_extension(p, &["csproj"]))
            .collect();
        projects.sort();
        projects
    }
}

impl LanguageClassifier for DotnetClassifier {
    fn language(&self) -> Language {
        Language::Dotnet
    }

    fn is_present(&self, walker: &SourceWalker) -> bool {
        !self.project_files(walker).is_empty()
    }

    fn framework(&self, walker: &SourceWalker) -> String {
        let web = self
            .project_files(walker)
            .iter()
            .filter_map(|p| read_source(p).ok())
            .any(|content| content.contains(WEB_SDK));

        if web {
            "ASP.NET Core".into()
        } else {
            Language::Dotnet.label().into()
        }
    }

    fn classify(&self, walker: &SourceWalker) -> Result<Classification> {
        classify_with_rules(walker, &DOTNET_RULES)
    }
}
