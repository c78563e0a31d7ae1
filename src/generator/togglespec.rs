//! Per-environment telemetry configuration text.
//!
//! The orchestration layer persists one [`ServiceRecord`] per detected
//! service and one [`EnvironmentToggle`] per environment. The spec text is
//! rendered from the service name and mode alone.
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    generator::types::TelemetryMode,
    scanner::{FrameworkDetection, Language},
};

const TOGGLE_SPEC: &str = r#"# ToggleSpec for {{ service }}
telemetry_mode: {{ mode }}
metrics:
  enabled: {{ metrics }}
tracing:
  enabled: {{ tracing }}
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service: String,
    pub language: Language,
    pub framework: String,
    pub has_metrics: bool,
    pub has_tracing: bool,
}

impl From<&FrameworkDetection> for ServiceRecord {
    fn from(detection: &FrameworkDetection) -> Self {
        Self {
            service: detection.service_name.clone(),
            language: detection.language,
            framework: detection.framework.clone(),
            has_metrics: detection.has_metrics,
            has_tracing: detection.has_tracing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentToggle {
    pub environment: String,
    pub telemetry_mode: TelemetryMode,
    pub spec: String,
}

impl EnvironmentToggle {
    /// Toggle for `environment` reflecting what `record` already has.
    pub fn for_record(environment: &str, record: &ServiceRecord) -> Result<Self> {
        let mode = mode_for_detection(record.has_metrics, record.has_tracing);
        Self::new(environment, &record.service, mode)
    }

    pub fn new(environment: &str, service: &str, mode: TelemetryMode) -> Result<Self> {
        Ok(Self {
            environment: environment.to_string(),
            telemetry_mode: mode,
            spec: render_toggle_spec(service, mode)?,
        })
    }
}

/// Mode that describes the instrumentation a service already carries.
pub fn mode_for_detection(has_metrics: bool, has_tracing: bool) -> TelemetryMode {
    match (has_metrics, has_tracing) {
        (true, true) => TelemetryMode::Both,
        (true, false) => TelemetryMode::Metrics,
        (false, true) => TelemetryMode::Traces,
        (false, false) => TelemetryMode::None,
    }
}

#[derive(Debug, Serialize)]
struct ToggleValues<'a> {
    service: &'a str,
    mode: TelemetryMode,
    metrics: bool,
    tracing: bool,
}

pub fn render_toggle_spec(service: &str, mode: TelemetryMode) -> Result<String> {
    let values = ToggleValues {
        service,
        mode,
        metrics: mode.includes_metrics(),
        tracing: mode.includes_traces(),
    };
    let context = tera::Context::from_serialize(&values)?;
    Ok(tera::Tera::one_off(TOGGLE_SPEC, &context, false)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_each_mode() {
        let expected = [
            (TelemetryMode::Both, "both", "true", "true"),
            (TelemetryMode::Metrics, "metrics", "true", "false"),
            (TelemetryMode::Traces, "traces", "false", "true"),
            (TelemetryMode::None, "none", "false", "false"),
        ];

        for (mode, label, metrics, tracing) in expected {
            let spec = render_toggle_spec("orders-api", mode).unwrap();
            assert_eq!(
                spec,
                format!(
                    "# ToggleSpec for orders-api\ntelemetry_mode: {label}\nmetrics:\n  enabled: {metrics}\ntracing:\n  enabled: {tracing}\n"
                )
            );
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let first = render_toggle_spec("svc", TelemetryMode::Traces).unwrap();
        let second = render_toggle_spec("svc", TelemetryMode::Traces).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn toggle_follows_detection() {
        let record = ServiceRecord {
            service: "go-service".into(),
            language: Language::Go,
            framework: "Gin".into(),
            has_metrics: true,
            has_tracing: false,
        };

        let toggle = EnvironmentToggle::for_record("staging", &record).unwrap();
        assert_eq!(toggle.telemetry_mode, TelemetryMode::Metrics);
        assert!(toggle.spec.contains("telemetry_mode: metrics"));
        assert_eq!(mode_for_detection(false, false), TelemetryMode::None);
    }
}
