//! Merges per-language classifications into a [`ScanResult`].
use log::*;

use crate::{
    CopilotError,
    scanner::{
        patterns::fallback_classify,
        traits::LanguageClassifier,
        types::{
            Classification, DetectionCandidate, FrameworkDetection, Language,
            ScanResult, TelemetryKind,
        },
        walker::SourceWalker,
    },
};

pub struct DetectionAggregator {
    classifiers: Vec<Box<dyn LanguageClassifier>>,
}

impl Default for DetectionAggregator {
    fn default() -> Self {
        Self::new(Language::ALL.iter().map(|l| l.classifier()).collect())
    }
}

impl DetectionAggregator {
    pub fn new(classifiers: Vec<Box<dyn LanguageClassifier>>) -> Self {
        Self { classifiers }
    }

    /// Runs every classifier whose language is present in the tree.
    ///
    /// A classifier that fails is replaced by the single-pass fallback search
    /// for its language; sibling languages are unaffected.
    pub fn aggregate(&self, walker: &SourceWalker) -> ScanResult {
        let mut result = ScanResult::default();

        for classifier in self.classifiers.iter() {
            let language = classifier.language();

            if !classifier.is_present(walker) {
                debug!("{language}: no manifest found, skipping");
                continue;
            }

            let framework = classifier.framework(walker);
            info!("detected {language} (framework: {framework})");

            let classification = match classifier.classify(walker) {
                Ok(classification) => classification,
                Err(err) => {
                    let degraded = CopilotError::ClassificationDegraded {
                        language: language.label().into(),
                        reason: err.to_string(),
                    };
                    warn!("{degraded}: falling back to substring search");
                    fallback_classify(walker, language)
                }
            };

            let (detection, candidates) =
                summarize(language, &framework, classification);

            info!(
                "{language}: has_metrics={} has_tracing={}",
                detection.has_metrics, detection.has_tracing
            );

            result.frameworks.push(detection);
            result.candidates.extend(candidates);
        }

        result
    }
}

fn summarize(
    language: Language,
    framework: &str,
    classification: Classification,
) -> (FrameworkDetection, Vec<DetectionCandidate>) {
    let service_name = language.default_service_name().to_string();

    let candidates: Vec<_> = [TelemetryKind::Metrics, TelemetryKind::Tracing]
        .into_iter()
        .filter(|kind| !classification.kind(*kind).is_empty())
        .map(|kind| {
            let matches = classification.kind(kind);
            DetectionCandidate {
                language,
                framework: framework.to_string(),
                kind,
                patterns: matches.patterns.iter().cloned().collect(),
                files: matches.files.clone(),
                service_name: service_name.clone(),
            }
        })
        .collect();

    let has = |kind: TelemetryKind| candidates.iter().any(|c| c.kind == kind);

    let detection = FrameworkDetection {
        language,
        framework: framework.to_string(),
        has_metrics: has(TelemetryKind::Metrics),
        has_tracing: has(TelemetryKind::Tracing),
        service_name,
    };

    (detection, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        scanner::{traits::MockLanguageClassifier, types::KindMatches},
        test_helpers::write_file,
    };
    use tempfile::TempDir;

    fn mock(
        language: Language,
        present: bool,
        outcome: fn() -> crate::Result<Classification>,
    ) -> Box<dyn LanguageClassifier> {
        let mut classifier = MockLanguageClassifier::new();
        classifier.expect_language().return_const(language);
        classifier.expect_is_present().return_const(present);
        classifier
            .expect_framework()
            .returning(move |_| language.label().to_string());
        classifier.expect_classify().returning(move |_| outcome());
        Box::new(classifier)
    }

    #[test_log::test]
    fn failed_classifier_degrades_to_fallback() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "app.py",
            "from prometheus_client import start_http_server\nstart_http_server(8000)\n",
        );
        write_file(tmp.path(), "main.go", "package main\n");

        let aggregator = DetectionAggregator::new(vec![
            mock(Language::Python, true, || {
                Err(CopilotError::ClassificationDegraded {
                    language: "Python".into(),
                    reason: "boom".into(),
                })
            }),
            mock(Language::Go, true, || Ok(Classification::default())),
        ]);

        let walker = SourceWalker::new(tmp.path(), &[]);
        let result = aggregator.aggregate(&walker);

        assert_eq!(result.frameworks.len(), 2);
        let python = result.detection(Language::Python).unwrap();
        assert!(python.has_metrics);
        assert!(!python.has_tracing);

        let go = result.detection(Language::Go).unwrap();
        assert!(!go.has_metrics);
        assert!(!go.has_tracing);

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(
            result.candidates[0].files.iter().next().unwrap(),
            "app.py"
        );
    }

    #[test]
    fn absent_languages_are_not_reported() {
        let tmp = TempDir::new().unwrap();
        let aggregator = DetectionAggregator::new(vec![mock(
            Language::Java,
            false,
            || Ok(Classification::default()),
        )]);

        let walker = SourceWalker::new(tmp.path(), &[]);
        assert!(aggregator.aggregate(&walker).frameworks.is_empty());
    }

    #[test]
    fn flags_follow_candidates() {
        let mut classification = Classification::default();
        classification.tracing = KindMatches::default();
        classification.metrics.record("server.js", ["Counter("]);

        let (detection, candidates) =
            summarize(Language::Node, "Express", classification);

        assert!(detection.has_metrics);
        assert!(!detection.has_tracing);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, TelemetryKind::Metrics);
        assert_eq!(candidates[0].framework, "Express");
        assert_eq!(candidates[0].service_name, "nodejs-service");
        assert_eq!(candidates[0].patterns, vec!["Counter(".to_string()]);
    }
}
