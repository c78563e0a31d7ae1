//! Turns a detected state and a requested telemetry mode into an ordered
//! list of anchored file edits.
//!
//! Generation is pure: the same language, service, mode, framework,
//! candidates and options always produce the same plan. Nothing here touches the working
//! tree; see [`crate::applier`] for that.
use log::*;
use serde::Serialize;

pub mod dispatch;
pub mod go;
pub mod java;
pub mod node;
pub mod python;
pub mod request;
pub mod togglespec;
pub mod traits;
pub mod types;

pub use dispatch::Generator;
pub use request::resolve_mode;
pub use togglespec::{mode_for_detection, render_toggle_spec};
pub use types::{
    EditAction, FileEdit, InstrumentationPlan, PlanBuilder, TelemetryMode,
};

use crate::{
    CopilotError, Result,
    config::{DEFAULT_COLLECTOR_ENDPOINT, DEFAULT_METRICS_PORT, GenerateConfig},
    scanner::{DetectionCandidate, Language, TelemetryKind},
};

/// Settings threaded through every generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// OTLP gRPC endpoint (`host:port`) for generated tracer providers.
    pub collector_endpoint: String,
    /// Port for stand-alone metrics exposition servers.
    pub metrics_port: u16,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            collector_endpoint: DEFAULT_COLLECTOR_ENDPOINT.into(),
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl From<&GenerateConfig> for GeneratorOptions {
    fn from(config: &GenerateConfig) -> Self {
        Self {
            collector_endpoint: config.collector_endpoint.clone(),
            metrics_port: config.metrics_port,
        }
    }
}

/// Inputs shared by the language generators for a single request.
#[derive(Debug)]
pub struct GenerationContext<'a> {
    pub language: Language,
    pub service: &'a str,
    /// Detected framework, else that of the first candidate, else the
    /// language label.
    pub framework: String,
    candidates: Vec<&'a DetectionCandidate>,
    pub options: &'a GeneratorOptions,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        language: Language,
        service: &'a str,
        framework: Option<&str>,
        candidates: &'a [DetectionCandidate],
        options: &'a GeneratorOptions,
    ) -> Self {
        let candidates: Vec<_> = candidates
            .iter()
            .filter(|c| c.language == language)
            .collect();

        let framework = framework
            .filter(|f| !f.trim().is_empty())
            .or_else(|| candidates.first().map(|c| c.framework.as_str()))
            .unwrap_or(language.label())
            .to_string();

        Self {
            language,
            service,
            framework,
            candidates,
            options,
        }
    }

    /// First file of the candidate of `kind`, else of the other kind.
    pub fn entry_point(&self, kind: TelemetryKind) -> Option<&'a str> {
        self.first_file(kind)
            .or_else(|| self.first_file(kind.other()))
    }

    fn first_file(&self, kind: TelemetryKind) -> Option<&'a str> {
        self.candidates
            .iter()
            .copied()
            .find(|c| c.kind == kind)
            .and_then(DetectionCandidate::first_file)
    }

    /// Service name usable as a metric name prefix.
    pub fn metric_prefix(&self) -> String {
        sanitize_metric_prefix(self.service)
    }

    /// Renders a fixed template against this request.
    pub fn render(&self, template: &str) -> Result<String> {
        let values = TemplateValues {
            service: self.service,
            framework: &self.framework,
            metric_prefix: self.metric_prefix(),
            collector_endpoint: &self.options.collector_endpoint,
            metrics_port: self.options.metrics_port,
        };
        let context = tera::Context::from_serialize(&values)?;
        Ok(tera::Tera::one_off(template, &context, false)?)
    }
}

#[derive(Debug, Serialize)]
struct TemplateValues<'a> {
    service: &'a str,
    framework: &'a str,
    metric_prefix: String,
    collector_endpoint: &'a str,
    metrics_port: u16,
}

/// Replaces every character a Prometheus metric name cannot hold with `_`.
pub fn sanitize_metric_prefix(service: &str) -> String {
    let mut prefix: String = service
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if prefix.starts_with(|c: char| c.is_ascii_digit()) {
        prefix.insert(0, '_');
    }

    prefix
}

/// Builds the plan for `language`.
///
/// `framework` is the label the scan inferred from build manifests. It picks
/// entry points and anchors even when no file uses telemetry yet. Metrics
/// edits always precede tracing edits. Mode `none` yields an empty, valid
/// plan.
pub fn generate(
    language: Language,
    service: &str,
    mode: TelemetryMode,
    framework: Option<&str>,
    candidates: &[DetectionCandidate],
    options: &GeneratorOptions,
) -> Result<InstrumentationPlan> {
    let generator = Generator::for_language(language)?;

    if service.trim().is_empty() {
        return Err(CopilotError::InvalidArgs(
            "service name must not be empty".into(),
        ));
    }

    let mut builder = PlanBuilder::new(language, service, mode);

    if mode == TelemetryMode::None {
        debug!("{language}: mode none requested, emitting empty plan");
        return builder.build(format!(
            "No instrumentation changes for {service} (mode: none)"
        ));
    }

    let context =
        GenerationContext::new(language, service, framework, candidates, options);
    debug!(
        "{language}: generating {mode} plan for {service} (framework: {})",
        context.framework
    );

    if mode.includes_metrics() {
        generator.metrics_edits(&context, &mut builder)?;
    }

    if mode.includes_traces() {
        generator.tracing_edits(&context, &mut builder)?;
    }

    builder.build(format!(
        "Add {} instrumentation for {service} ({language}, {})",
        describe_mode(mode),
        context.framework
    ))
}

fn describe_mode(mode: TelemetryMode) -> &'static str {
    match mode {
        TelemetryMode::Metrics => "Prometheus metrics",
        TelemetryMode::Traces => "OpenTelemetry tracing",
        TelemetryMode::Both => "Prometheus metrics and OpenTelemetry tracing",
        TelemetryMode::None => "no",
    }
}
