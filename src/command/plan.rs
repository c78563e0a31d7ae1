//! Generates an instrumentation plan.
use log::*;
use std::path::PathBuf;

use crate::{
    Result,
    command::common,
    config::Config,
    generator::{
        self, GeneratorOptions, InstrumentationPlan, TelemetryMode,
        resolve_mode,
    },
    scanner::{Language, ScanResult},
};

pub async fn execute(
    config: &Config,
    language: Language,
    service: String,
    mode: TelemetryMode,
    scan: Option<PathBuf>,
    out_file: Option<String>,
) -> Result<()> {
    let scan = match scan {
        Some(path) => Some(common::read_json::<ScanResult>(&path).await?),
        None => None,
    };

    let plan = build_plan(config, language, &service, mode, scan.as_ref())?;
    common::write_json(&plan, out_file).await
}

/// Generates a plan, narrowing `mode` and taking the framework and
/// candidates from `scan` when one is available.
pub fn build_plan(
    config: &Config,
    language: Language,
    service: &str,
    mode: TelemetryMode,
    scan: Option<&ScanResult>,
) -> Result<InstrumentationPlan> {
    let options = GeneratorOptions::from(&config.generate);

    let Some(scan) = scan else {
        return generator::generate(language, service, mode, None, &[], &options);
    };

    let detection = scan.detection(language);
    let mode = match detection {
        Some(detection) => resolve_mode(
            service,
            mode,
            detection.has_metrics,
            detection.has_tracing,
        )?,
        None => {
            debug!("{language} not detected in scan; using requested mode");
            mode
        }
    };

    let framework = detection.map(|d| d.framework.as_str());
    let candidates = scan.candidates_for(language);
    generator::generate(language, service, mode, framework, &candidates, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CopilotError,
        scanner::{DetectionCandidate, FrameworkDetection, TelemetryKind},
    };
    use std::collections::BTreeSet;

    fn scan_with_metrics() -> ScanResult {
        ScanResult {
            frameworks: vec![FrameworkDetection {
                language: Language::Go,
                framework: "Gin".into(),
                has_metrics: true,
                has_tracing: false,
                service_name: "go-service".into(),
            }],
            candidates: vec![DetectionCandidate {
                language: Language::Go,
                framework: "Gin".into(),
                kind: TelemetryKind::Metrics,
                patterns: vec!["prometheus.NewCounterVec".into()],
                files: BTreeSet::from(["cmd/api/main.go".to_string()]),
                service_name: "go-service".into(),
            }],
        }
    }

    #[test]
    fn plan_without_scan_uses_requested_mode() {
        let plan = build_plan(
            &Config::default(),
            Language::Go,
            "orders",
            TelemetryMode::Both,
            None,
        )
        .unwrap();

        assert_eq!(plan.mode, TelemetryMode::Both);
        assert!(plan.edits.iter().any(|e| e.path == "go.mod"));
    }

    #[test]
    fn scan_narrows_mode_and_supplies_candidates() {
        let scan = scan_with_metrics();

        let plan = build_plan(
            &Config::default(),
            Language::Go,
            "orders",
            TelemetryMode::Both,
            Some(&scan),
        )
        .unwrap();

        assert_eq!(plan.mode, TelemetryMode::Traces);
        assert!(
            plan.edits
                .iter()
                .any(|e| e.path == "cmd/api/telemetry_tracing.go")
        );
    }

    #[test]
    fn detected_framework_applies_without_candidates() {
        let scan = ScanResult {
            frameworks: vec![FrameworkDetection {
                language: Language::Python,
                framework: "Flask".into(),
                has_metrics: false,
                has_tracing: false,
                service_name: "python-service".into(),
            }],
            candidates: vec![],
        };

        let plan = build_plan(
            &Config::default(),
            Language::Python,
            "orders",
            TelemetryMode::Metrics,
            Some(&scan),
        )
        .unwrap();

        assert!(plan.description.contains("Flask"));
        assert!(
            plan.edits
                .iter()
                .any(|e| e.path == "app.py"
                    && e.anchor.as_deref() == Some("app = Flask(__name__)"))
        );
    }

    #[test]
    fn satisfied_request_is_rejected() {
        let scan = scan_with_metrics();

        let result = build_plan(
            &Config::default(),
            Language::Go,
            "orders",
            TelemetryMode::Metrics,
            Some(&scan),
        );

        assert!(matches!(result, Err(CopilotError::AlreadySatisfied { .. })));
    }
}
