//! Static dispatch generator enum.

use crate::{
    CopilotError, Result,
    generator::{
        GenerationContext, go::GoGenerator, java::JavaGenerator,
        node::NodeGenerator, python::PythonGenerator,
        traits::InstrumentationGenerator, types::PlanBuilder,
    },
    scanner::Language,
};

/// Language-specific generator with static dispatch.
pub enum Generator {
    /// go.mod, package main helpers, Gin or plain `main()` wiring
    Go(GoGenerator),
    /// requirements.txt, config modules, Flask/FastAPI/`__main__` wiring
    Python(PythonGenerator),
    /// pom.xml, Spring components, application.properties
    Java(JavaGenerator),
    /// package.json, CommonJS modules, Express wiring
    Node(NodeGenerator),
}

impl Generator {
    /// Generator for `language`, or `UnsupportedLanguage`.
    pub fn for_language(language: Language) -> Result<Self> {
        match language {
            Language::Go => Ok(Generator::Go(GoGenerator::new())),
            Language::Python => Ok(Generator::Python(PythonGenerator::new())),
            Language::Java => Ok(Generator::Java(JavaGenerator::new())),
            Language::Node => Ok(Generator::Node(NodeGenerator::new())),
            Language::Dotnet | Language::Rust => Err(
                CopilotError::UnsupportedLanguage(format!(
                    "no instrumentation generator for {language}"
                )),
            ),
        }
    }

    pub fn metrics_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        match self {
            Generator::Go(generator) => generator.metrics_edits(context, plan),
            Generator::Python(generator) => {
                generator.metrics_edits(context, plan)
            }
            Generator::Java(generator) => generator.metrics_edits(context, plan),
            Generator::Node(generator) => generator.metrics_edits(context, plan),
        }
    }

    pub fn tracing_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        match self {
            Generator::Go(generator) => generator.tracing_edits(context, plan),
            Generator::Python(generator) => {
                generator.tracing_edits(context, plan)
            }
            Generator::Java(generator) => generator.tracing_edits(context, plan),
            Generator::Node(generator) => generator.tracing_edits(context, plan),
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generator::Go(_) => write!(f, "Generator::Go"),
            Generator::Python(_) => write!(f, "Generator::Python"),
            Generator::Java(_) => write!(f, "Generator::Java"),
            Generator::Node(_) => write!(f, "Generator::Node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_generator_for_each_supported_language() {
        let expected = [
            (Language::Go, "Generator::Go"),
            (Language::Python, "Generator::Python"),
            (Language::Java, "Generator::Java"),
            (Language::Node, "Generator::Node"),
        ];

        for (language, name) in expected {
            let generator = Generator::for_language(language).unwrap();
            assert_eq!(format!("{generator:?}"), name);
        }
    }

    #[test]
    fn rejects_languages_without_generator() {
        assert!(matches!(
            Generator::for_language(Language::Dotnet),
            Err(CopilotError::UnsupportedLanguage(_))
        ));
        assert!(matches!(
            Generator::for_language(Language::Rust),
            Err(CopilotError::UnsupportedLanguage(_))
        ));
    }
}
