//! Java/Kotlin classifier (text rules) with Maven/Gradle framework inference.
use log::*;
use quick_xml::{Reader, events::Event};

use crate::{
    Result,
    scanner::{
        patterns::{JAVA_RULES, classify_with_rules, read_source},
        traits::LanguageClassifier,
        types::{Classification, Language},
        walker::SourceWalker,
    },
};

const MANIFESTS: &[&str] = &["pom.xml", "build.gradle", "build.gradle.kts"];

/// Framework labels keyed by a coordinate fragment.
const FRAMEWORKS: &[(&str, &str)] = &[
    ("spring-boot", "Spring Boot"),
    ("org.springframework.boot", "Spring Boot"),
    ("io.quarkus", "Quarkus"),
    ("io.micronaut", "Micronaut"),
];

#[derive(Debug, Default)]
pub struct JavaClassifier {}

impl JavaClassifier {
    pub fn new() -> Self {
        Self {}
    }
}

impl LanguageClassifier for JavaClassifier {
    fn language(&self) -> Language {
        Language::Java
    }

    fn is_present(&self, walker: &SourceWalker) -> bool {
        MANIFESTS.iter().any(|m| walker.root().join(m).is_file())
    }

    fn framework(&self, walker: &SourceWalker) -> String {
        let root = walker.root();

        if let Ok(content) = read_source(&root.join("pom.xml")) {
            match pom_coordinates(&content) {
                Ok(coordinates) => {
                    if let Some(framework) = match_framework(coordinates.iter())
                    {
                        return framework;
                    }
                }
                Err(err) => warn!("failed to parse pom.xml: {err}"),
            }
        }

        for gradle in ["build.gradle", "build.gradle.kts"] {
            if let Ok(content) = read_source(&root.join(gradle))
                && let Some(framework) = match_framework(content.lines())
            {
                return framework;
            }
        }

        Language::Java.label().into()
    }

    fn classify(&self, walker: &SourceWalker) -> Result<Classification> {
        classify_with_rules(walker, &JAVA_RULES)
    }
}

/// Text of every `groupId` / `artifactId` element in a pom.
fn pom_coordinates(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(content.as_bytes());
    let mut coordinates = vec![];
    let mut in_coordinate = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                in_coordinate = matches!(
                    name.as_ref(),
                    b"groupId" | b"artifactId"
                );
            }
            Ok(Event::End(_)) => in_coordinate = false,
            Ok(Event::Text(ref e)) if in_coordinate => {
                coordinates.push(String::from_utf8_lossy(e).trim().to_string());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(coordinates)
}

fn match_framework<I, S>(items: I) -> Option<String>
where
    I: Iterator<Item = S> + Clone,
    S: AsRef<str>,
{
    FRAMEWORKS
        .iter()
        .find(|(fragment, _)| {
            items.clone().any(|item| item.as_ref().contains(fragment))
        })
        .map(|(_, label)| label.to_string())
}
