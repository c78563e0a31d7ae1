//! Import markers and usage allowlists for the text-based classifiers, plus
//! the single-pass fallback tables used when a classifier fails.
use log::*;
use std::path::Path;

use crate::{
    Result,
    path_helpers::repo_relative,
    scanner::{
        text,
        types::{Classification, Language, TelemetryKind},
        walker::{SourceWalker, has_extension},
    },
};

/// Import markers and usage allowlist for one telemetry kind.
#[derive(Debug)]
pub struct KindRules {
    pub imports: &'static [&'static str],
    pub usages: &'static [&'static str],
}

/// Two-pass text rules for one language.
#[derive(Debug)]
pub struct TextRules {
    pub extensions: &'static [&'static str],
    pub metrics: KindRules,
    pub tracing: KindRules,
}

impl TextRules {
    pub fn kind(&self, kind: TelemetryKind) -> &KindRules {
        match kind {
            TelemetryKind::Metrics => &self.metrics,
            TelemetryKind::Tracing => &self.tracing,
        }
    }
}

pub static JAVA_RULES: TextRules = TextRules {
    extensions: &["java", "kt"],
    metrics: KindRules {
        imports: &["import io.micrometer", "import io.prometheus"],
        usages: &[
            "Counter.builder(",
            "Timer.builder(",
            "Gauge.builder(",
            "DistributionSummary.builder(",
            "registry.counter(",
            "registry.timer(",
            "Registry.counter(",
            "Registry.timer(",
            "new PrometheusMeterRegistry(",
            "Counter.build(",
            "Histogram.build(",
            "Gauge.build(",
            "new HTTPServer(",
            ".increment(",
            "@Timed",
            "@Counted",
        ],
    },
    tracing: KindRules {
        imports: &["import io.opentelemetry"],
        usages: &[
            "spanBuilder(",
            "OtlpGrpcSpanExporter",
            "SdkTracerProvider.builder(",
            "BatchSpanProcessor.builder(",
            "OpenTelemetrySdk.builder(",
            "getTracer(",
            ".startSpan(",
            "@WithSpan",
        ],
    },
};

pub static NODE_RULES: TextRules = TextRules {
    extensions: &["js", "ts", "mjs", "cjs", "jsx", "tsx"],
    metrics: KindRules {
        imports: &["prom-client", "express-prom-bundle"],
        usages: &[
            "Counter(",
            "Histogram(",
            "Gauge(",
            "Summary(",
            "collectDefaultMetrics(",
            "register.metrics(",
            "promBundle(",
            ".inc(",
            ".observe(",
            ".startTimer(",
        ],
    },
    tracing: KindRules {
        imports: &["@opentelemetry/"],
        usages: &[
            "new NodeTracerProvider(",
            "new NodeSDK(",
            "new OTLPTraceExporter(",
            "new BatchSpanProcessor(",
            "registerInstrumentations(",
            "trace.getTracer(",
            ".startSpan(",
            ".startActiveSpan(",
        ],
    },
};

pub static DOTNET_RULES: TextRules = TextRules {
    extensions: &["cs"],
    metrics: KindRules {
        imports: &[
            "using Prometheus",
            "using OpenTelemetry.Metrics",
            "using System.Diagnostics.Metrics",
        ],
        usages: &[
            "UseHttpMetrics(",
            "MapMetrics(",
            "UseMetricServer(",
            "UsePrometheusServer",
            "Metrics.CreateCounter(",
            "Metrics.CreateHistogram(",
            "Metrics.CreateGauge(",
            "CreateCounter<",
            "CreateHistogram<",
            "AddPrometheusExporter(",
            "WithMetrics(",
            ".Inc(",
            ".Observe(",
        ],
    },
    tracing: KindRules {
        imports: &["using OpenTelemetry", "using System.Diagnostics"],
        usages: &[
            "new ActivitySource(",
            ".StartActivity(",
            "AddOpenTelemetry(",
            "WithTracing(",
            "AddOtlpExporter(",
            "Sdk.CreateTracerProviderBuilder(",
        ],
    },
};

pub static RUST_RULES: TextRules = TextRules {
    extensions: &["rs"],
    metrics: KindRules {
        imports: &[
            "use prometheus",
            "prometheus::",
            "use metrics",
            "metrics::",
            "metrics_exporter_prometheus",
        ],
        usages: &[
            "register_counter!",
            "register_int_counter!",
            "register_histogram!",
            "register_gauge!",
            "IntCounter::new(",
            "Counter::new(",
            "Histogram::with_opts(",
            "Registry::new(",
            "TextEncoder::new(",
            "PrometheusBuilder::new(",
            "counter!(",
            "histogram!(",
            "gauge!(",
            ".inc()",
            ".observe(",
        ],
    },
    tracing: KindRules {
        imports: &[
            "use opentelemetry",
            "opentelemetry::",
            "opentelemetry_sdk",
            "opentelemetry_otlp",
            "tracing_opentelemetry",
        ],
        usages: &[
            "SdkTracerProvider::builder(",
            "TracerProvider::builder(",
            "SpanExporter::builder(",
            "global::set_tracer_provider(",
            "global::tracer(",
            "tracing_opentelemetry::layer(",
            "with_batch_exporter(",
            "tracer.start(",
        ],
    },
};

/// Two-pass classification of every file matching `rules.extensions`.
///
/// A file counts for a kind only when it carries an import marker and at
/// least one allowlisted usage.
pub fn classify_with_rules(
    walker: &SourceWalker,
    rules: &TextRules,
) -> Result<Classification> {
    let mut classification = Classification::default();

    for path in walker.files_with_extensions(rules.extensions)? {
        let content = read_source(&path)?;
        let relative = repo_relative(walker.root(), &path);

        for kind in [TelemetryKind::Metrics, TelemetryKind::Tracing] {
            let kind_rules = rules.kind(kind);

            if !text::contains_any(&content, kind_rules.imports) {
                continue;
            }

            let used = text::matching_patterns(&content, kind_rules.usages);
            if used.is_empty() {
                debug!("{relative}: {kind} library imported but not used");
                continue;
            }

            classification.kind_mut(kind).record(&relative, used);
        }
    }

    Ok(classification)
}

/// Reads a source file, replacing invalid UTF-8 rather than failing.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extensions searched by the degraded single-pass fallback.
pub const FALLBACK_EXTENSIONS: &[&str] = &[
    "go", "py", "java", "js", "ts", "cs", "rs", "kt", "scala", "php",
];

/// Single-pass patterns used when a language's classifier fails.
pub fn fallback_patterns(
    language: Language,
    kind: TelemetryKind,
) -> &'static [&'static str] {
    match (language, kind) {
        (Language::Python, TelemetryKind::Metrics) => {
            &["start_http_server(", "generate_latest(", "prometheus_client"]
        }
        (Language::Python, TelemetryKind::Tracing) => {
            &["tracer.start_as_current_span(", "OTLPSpanExporter("]
        }
        (Language::Go, TelemetryKind::Metrics) => &[
            "http.Handle(\"/metrics\"",
            "promhttp.Handler()",
            "prometheus.MustRegister(",
        ],
        (Language::Go, TelemetryKind::Tracing) => {
            &["tracer.Start(", "sdktrace.NewTracerProvider(", "otlptrace"]
        }
        (Language::Java, TelemetryKind::Metrics) => {
            &["MeterRegistry", "PrometheusMeterRegistry"]
        }
        (Language::Java, TelemetryKind::Tracing) => {
            &["tracer.spanBuilder(", "OtlpGrpcSpanExporter"]
        }
        (Language::Dotnet, TelemetryKind::Metrics) => &["UsePrometheusServer"],
        (Language::Dotnet, TelemetryKind::Tracing) => &["ActivitySource"],
        (Language::Node, TelemetryKind::Metrics) => {
            &["register.metrics()", "prom-client"]
        }
        (Language::Node, TelemetryKind::Tracing) => {
            &["tracer.startSpan(", "@opentelemetry/sdk-trace"]
        }
        (Language::Rust, TelemetryKind::Metrics) => &["prometheus::register"],
        (Language::Rust, TelemetryKind::Tracing) => &["opentelemetry::"],
    }
}

/// Degraded single-pass search: any file containing a fallback pattern is a
/// candidate. Unreadable entries are skipped.
pub fn fallback_classify(
    walker: &SourceWalker,
    language: Language,
) -> Classification {
    let mut classification = Classification::default();
    let files =
        walker.files_lenient(|p| has_extension(p, FALLBACK_EXTENSIONS));

    for path in files {
        let Ok(content) = read_source(&path) else {
            debug!("fallback: skipping unreadable file {}", path.display());
            continue;
        };
        let relative = repo_relative(walker.root(), &path);

        for kind in [TelemetryKind::Metrics, TelemetryKind::Tracing] {
            let matched = text::matching_patterns(
                &content,
                fallback_patterns(language, kind),
            );
            if !matched.is_empty() {
                classification.kind_mut(kind).record(&relative, matched);
            }
        }
    }

    classification
}
