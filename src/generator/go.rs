//! Go instrumentation: client_golang metrics and the OpenTelemetry SDK.
use crate::{
    Result,
    generator::{
        GenerationContext, traits::InstrumentationGenerator, types::PlanBuilder,
    },
    path_helpers::{join_relative, parent_dir},
    scanner::TelemetryKind,
};

const MANIFEST: &str = "go.mod";
const DEFAULT_ENTRY_POINT: &str = "main.go";
const GIN_ANCHOR: &str = "router := gin.Default()";
const MAIN_ANCHOR: &str = "func main() {";

const METRICS_REQUIRE: &str = r#"
require (
	github.com/prometheus/client_golang v1.19.1
)
"#;

const TRACING_REQUIRE: &str = r#"
require (
	go.opentelemetry.io/otel v1.24.0
	go.opentelemetry.io/otel/sdk v1.24.0
	go.opentelemetry.io/otel/exporters/otlp/otlptrace/otlptracegrpc v1.24.0
{%- if framework == "Gin" %}
	go.opentelemetry.io/contrib/instrumentation/github.com/gin-gonic/gin/otelgin v0.49.0
{%- else %}
	go.opentelemetry.io/contrib/instrumentation/net/http/otelhttp v0.49.0
{%- endif %}
)
"#;

const METRICS_FILE: &str = r#"package main

import (
{%- if framework == "Gin" %}
	"strconv"
	"time"

	"github.com/gin-gonic/gin"
{%- else %}
	"log"
	"net/http"
	"strconv"
	"time"
{% endif %}
	"github.com/prometheus/client_golang/prometheus"
	"github.com/prometheus/client_golang/prometheus/promhttp"
)

var (
	httpRequestsTotal = prometheus.NewCounterVec(
		prometheus.CounterOpts{
			Name: "{{ metric_prefix }}_http_requests_total",
			Help: "Total number of HTTP requests",
		},
		[]string{"method", "endpoint", "status"},
	)

	httpRequestDuration = prometheus.NewHistogramVec(
		prometheus.HistogramOpts{
			Name:    "{{ metric_prefix }}_http_request_duration_seconds",
			Help:    "HTTP request duration in seconds",
			Buckets: prometheus.DefBuckets,
		},
		[]string{"method", "endpoint", "status"},
	)
)

func init() {
	prometheus.MustRegister(httpRequestsTotal, httpRequestDuration)
}
{% if framework == "Gin" %}
// registerMetricsRoutes records every request and serves /metrics.
func registerMetricsRoutes(router *gin.Engine) {
	router.Use(func(c *gin.Context) {
		start := time.Now()
		c.Next()

		endpoint := c.FullPath()
		if endpoint == "" {
			endpoint = "unknown"
		}
		status := strconv.Itoa(c.Writer.Status())

		httpRequestsTotal.WithLabelValues(c.Request.Method, endpoint, status).Inc()
		httpRequestDuration.WithLabelValues(c.Request.Method, endpoint, status).Observe(time.Since(start).Seconds())
	})

	router.GET("/metrics", gin.WrapH(promhttp.Handler()))
}
{% else %}
type statusRecorder struct {
	http.ResponseWriter
	status int
}

func (r *statusRecorder) WriteHeader(status int) {
	r.status = status
	r.ResponseWriter.WriteHeader(status)
}

// instrumentHandler records request count and duration for next.
func instrumentHandler(endpoint string, next http.Handler) http.Handler {
	return http.HandlerFunc(func(w http.ResponseWriter, req *http.Request) {
		start := time.Now()
		recorder := &statusRecorder{ResponseWriter: w, status: http.StatusOK}
		next.ServeHTTP(recorder, req)

		status := strconv.Itoa(recorder.status)
		httpRequestsTotal.WithLabelValues(req.Method, endpoint, status).Inc()
		httpRequestDuration.WithLabelValues(req.Method, endpoint, status).Observe(time.Since(start).Seconds())
	})
}

// startMetricsServer serves /metrics on a dedicated port.
func startMetricsServer() {
	mux := http.NewServeMux()
	mux.Handle("/metrics", promhttp.Handler())

	go func() {
		if err := http.ListenAndServe(":{{ metrics_port }}", mux); err != nil {
			log.Printf("metrics server stopped: %v", err)
		}
	}()
}
{% endif -%}
"#;

const TRACING_FILE: &str = r#"package main

import (
	"context"
	"log"
{% if framework == "Gin" %}
	"github.com/gin-gonic/gin"
	"go.opentelemetry.io/contrib/instrumentation/github.com/gin-gonic/gin/otelgin"
{%- else %}
	"net/http"

	"go.opentelemetry.io/contrib/instrumentation/net/http/otelhttp"
{%- endif %}
	"go.opentelemetry.io/otel"
	"go.opentelemetry.io/otel/exporters/otlp/otlptrace/otlptracegrpc"
	"go.opentelemetry.io/otel/propagation"
	"go.opentelemetry.io/otel/sdk/resource"
	sdktrace "go.opentelemetry.io/otel/sdk/trace"
	semconv "go.opentelemetry.io/otel/semconv/v1.21.0"
)

const tracingServiceName = "{{ service }}"

// initTracer installs a batching OTLP tracer provider globally.
func initTracer(ctx context.Context) (*sdktrace.TracerProvider, error) {
	exporter, err := otlptracegrpc.New(ctx,
		otlptracegrpc.WithEndpoint("{{ collector_endpoint }}"),
		otlptracegrpc.WithInsecure(),
	)
	if err != nil {
		return nil, err
	}

	tp := sdktrace.NewTracerProvider(
		sdktrace.WithBatcher(exporter),
		sdktrace.WithResource(resource.NewWithAttributes(
			semconv.SchemaURL,
			semconv.ServiceNameKey.String(tracingServiceName),
		)),
	)

	otel.SetTracerProvider(tp)
	otel.SetTextMapPropagator(propagation.TraceContext{})
	return tp, nil
}

// mustInitTracer initializes tracing and returns its shutdown function.
func mustInitTracer() func() {
	tp, err := initTracer(context.Background())
	if err != nil {
		log.Fatalf("failed to initialize tracer: %v", err)
	}

	return func() {
		if err := tp.Shutdown(context.Background()); err != nil {
			log.Printf("error shutting down tracer: %v", err)
		}
	}
}
{% if framework == "Gin" %}
// tracingMiddleware starts a server span for every request.
func tracingMiddleware() gin.HandlerFunc {
	return otelgin.Middleware(tracingServiceName)
}
{% else %}
// traceHandler wraps next in a server span named operation.
func traceHandler(operation string, next http.Handler) http.Handler {
	return otelhttp.NewHandler(next, operation)
}
{% endif -%}
"#;

#[derive(Debug, Default)]
pub struct GoGenerator {}

impl GoGenerator {
    pub fn new() -> Self {
        Self {}
    }
}

fn is_gin(context: &GenerationContext) -> bool {
    context.framework == "Gin"
}

fn entry_point<'a>(context: &GenerationContext<'a>, kind: TelemetryKind) -> &'a str {
    context.entry_point(kind).unwrap_or(DEFAULT_ENTRY_POINT)
}

impl InstrumentationGenerator for GoGenerator {
    fn metrics_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        let entry = entry_point(context, TelemetryKind::Metrics);
        let module = join_relative(parent_dir(entry), "telemetry_metrics.go");

        plan.append(MANIFEST, context.render(METRICS_REQUIRE)?)
            .create(&module, context.render(METRICS_FILE)?);

        if is_gin(context) {
            plan.modify(entry, GIN_ANCHOR, "\tregisterMetricsRoutes(router)\n".into());
        } else {
            // net/http routes are registered on a mux the plan cannot see
            plan.modify(entry, MAIN_ANCHOR, "\tstartMetricsServer()\n".into())
                .note(format!(
                    "Wrap the HTTP handlers in {entry} with \
                     instrumentHandler(\"<endpoint>\", handler) to record \
                     request counts and durations."
                ));
        }

        Ok(())
    }

    fn tracing_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        let entry = entry_point(context, TelemetryKind::Tracing);
        let module = join_relative(parent_dir(entry), "telemetry_tracing.go");

        plan.append(MANIFEST, context.render(TRACING_REQUIRE)?)
            .create(&module, context.render(TRACING_FILE)?);

        if is_gin(context) {
            plan.modify(
                entry,
                GIN_ANCHOR,
                "\tdefer mustInitTracer()()\n\trouter.Use(tracingMiddleware())\n"
                    .into(),
            );
        } else {
            plan.modify(entry, MAIN_ANCHOR, "\tdefer mustInitTracer()()\n".into())
                .note(format!(
                    "Wrap the root http.Handler in {entry} with \
                     traceHandler(\"<operation>\", handler) to start a span \
                     per request."
                ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        generator::{
            GeneratorOptions, generate,
            types::{EditAction, TelemetryMode},
        },
        scanner::{DetectionCandidate, Language},
    };

    fn gin_candidate(file: &str) -> DetectionCandidate {
        DetectionCandidate {
            language: Language::Go,
            framework: "Gin".into(),
            kind: TelemetryKind::Tracing,
            patterns: vec!["otel.Tracer".into()],
            files: [file.to_string()].into(),
            service_name: "go-service".into(),
        }
    }

    #[test]
    fn both_mode_orders_metrics_before_tracing() {
        let plan = generate(
            Language::Go,
            "orders-api",
            TelemetryMode::Both,
            None,
            &[],
            &GeneratorOptions::default(),
        )
        .unwrap();

        let summary: Vec<_> = plan
            .edits
            .iter()
            .map(|e| (e.path.as_str(), e.action, e.anchor.as_deref()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("go.mod", EditAction::Append, None),
                ("telemetry_metrics.go", EditAction::Create, None),
                ("main.go", EditAction::Modify, Some(MAIN_ANCHOR)),
                ("go.mod", EditAction::Append, None),
                ("telemetry_tracing.go", EditAction::Create, None),
                ("main.go", EditAction::Modify, Some(MAIN_ANCHOR)),
            ]
        );
    }

    #[test]
    fn metrics_module_uses_prefixed_names_and_port() {
        let options = GeneratorOptions {
            collector_endpoint: "collector:4317".into(),
            metrics_port: 9100,
        };
        let plan = generate(Language::Go, "orders-api", TelemetryMode::Metrics, None, &[], &options)
            .unwrap();

        let module = &plan.edits[1].content;
        assert!(module.starts_with("package main\n"));
        assert!(module.contains("orders_api_http_requests_total"));
        assert!(module.contains("orders_api_http_request_duration_seconds"));
        assert!(module.contains("\":9100\""));
        assert!(module.contains("\"log\""));
        assert!(!module.contains("gin"));
        assert!(!module.contains("{%"));
    }

    #[test]
    fn gin_candidates_drive_anchor_and_location() {
        let candidates = vec![gin_candidate("cmd/api/main.go")];
        let plan = generate(
            Language::Go,
            "orders-api",
            TelemetryMode::Both,
            None,
            &candidates,
            &GeneratorOptions::default(),
        )
        .unwrap();

        assert_eq!(plan.edits[1].path, "cmd/api/telemetry_metrics.go");
        assert_eq!(plan.edits[2].path, "cmd/api/main.go");
        assert_eq!(plan.edits[2].anchor.as_deref(), Some(GIN_ANCHOR));
        assert!(plan.edits[2].content.contains("registerMetricsRoutes(router)"));
        assert!(plan.edits[1].content.contains("\"github.com/gin-gonic/gin\""));

        let tracing = &plan.edits[4].content;
        assert!(tracing.contains("otelgin.Middleware(tracingServiceName)"));
        assert!(tracing.contains("const tracingServiceName = \"orders-api\""));
        assert!(plan.edits[3].content.contains("otelgin"));
        assert!(plan.edits[5].content.contains("router.Use(tracingMiddleware())"));
    }

    #[test]
    fn tracing_module_targets_collector() {
        let plan = generate(
            Language::Go,
            "svc",
            TelemetryMode::Traces,
            None,
            &[],
            &GeneratorOptions::default(),
        )
        .unwrap();

        assert_eq!(plan.edits.len(), 3);
        let module = &plan.edits[1].content;
        assert!(module.contains(
            "otlptracegrpc.WithEndpoint(\"otel-collector.observability.svc.cluster.local:4317\")"
        ));
        assert!(module.contains("otelhttp.NewHandler(next, operation)"));
        assert!(plan.edits[0].content.contains("otelhttp"));
    }

    #[test]
    fn net_http_helpers_come_with_wiring_notes() {
        let plan = generate(
            Language::Go,
            "svc",
            TelemetryMode::Both,
            None,
            &[],
            &GeneratorOptions::default(),
        )
        .unwrap();

        assert_eq!(plan.notes.len(), 2);
        assert!(plan.edits[1].content.contains("func instrumentHandler("));
        assert!(plan.notes[0].contains("instrumentHandler(\"<endpoint>\", handler)"));
        assert!(plan.notes[0].contains("main.go"));
        assert!(plan.edits[4].content.contains("func traceHandler("));
        assert!(plan.notes[1].contains("traceHandler(\"<operation>\", handler)"));
    }

    #[test]
    fn gin_detection_without_candidates_wires_router() {
        let plan = generate(
            Language::Go,
            "orders-api",
            TelemetryMode::Both,
            Some("Gin"),
            &[],
            &GeneratorOptions::default(),
        )
        .unwrap();

        assert!(plan.notes.is_empty());
        assert_eq!(plan.edits[2].path, DEFAULT_ENTRY_POINT);
        assert_eq!(plan.edits[2].anchor.as_deref(), Some(GIN_ANCHOR));
        assert_eq!(plan.edits[5].anchor.as_deref(), Some(GIN_ANCHOR));
        assert!(plan.edits[1].content.contains("func registerMetricsRoutes("));
        assert!(!plan.edits[1].content.contains("instrumentHandler"));
    }
}
