//! Python instrumentation: prometheus_client and the OpenTelemetry SDK.
use crate::{
    Result,
    generator::{
        GenerationContext, traits::InstrumentationGenerator, types::PlanBuilder,
    },
    path_helpers::{join_relative, parent_dir},
    scanner::TelemetryKind,
};

const MANIFEST: &str = "requirements.txt";
const MAIN_GUARD_ANCHOR: &str = r#"if __name__ == "__main__":"#;

const METRICS_REQUIREMENTS: &str = "prometheus-client>=0.19.0\n";

const TRACING_REQUIREMENTS: &str = r#"opentelemetry-api>=1.20.0
opentelemetry-sdk>=1.20.0
opentelemetry-exporter-otlp-proto-grpc>=1.20.0
{%- if framework == "Flask" %}
opentelemetry-instrumentation-flask>=0.41b0
{%- elif framework == "FastAPI" %}
opentelemetry-instrumentation-fastapi>=0.41b0
{%- endif %}
"#;

const METRICS_MODULE: &str = r#""""Prometheus metrics for {{ service }}."""
import time

from prometheus_client import Counter, Histogram
{%- if framework == "Flask" %}
from prometheus_client import CONTENT_TYPE_LATEST, generate_latest
from flask import Response, g, request
{%- elif framework == "FastAPI" %}
from prometheus_client import make_asgi_app
{%- else %}
from prometheus_client import start_http_server
{%- endif %}

HTTP_REQUESTS_TOTAL = Counter(
    "{{ metric_prefix }}_http_requests_total",
    "Total number of HTTP requests",
    ["method", "endpoint", "status"],
)

HTTP_REQUEST_DURATION = Histogram(
    "{{ metric_prefix }}_http_request_duration_seconds",
    "HTTP request duration in seconds",
    ["method", "endpoint", "status"],
)


def record_request(method, endpoint, status, duration):
    labels = {"method": method, "endpoint": endpoint, "status": status}
    HTTP_REQUESTS_TOTAL.labels(**labels).inc()
    HTTP_REQUEST_DURATION.labels(**labels).observe(duration)

{% if framework == "Flask" %}
def setup_metrics(app):
    """Record request metrics and serve /metrics on a Flask app."""

    @app.before_request
    def _start_timer():
        g.metrics_start = time.perf_counter()

    @app.after_request
    def _record(response):
        start = g.pop("metrics_start", None)
        if start is not None:
            endpoint = request.url_rule.rule if request.url_rule else "unknown"
            record_request(
                request.method,
                endpoint,
                str(response.status_code),
                time.perf_counter() - start,
            )
        return response

    @app.route("/metrics")
    def metrics():
        return Response(generate_latest(), mimetype=CONTENT_TYPE_LATEST)

    return app
{% elif framework == "FastAPI" %}
def setup_metrics(app):
    """Record request metrics and mount /metrics on a FastAPI app."""

    @app.middleware("http")
    async def _record(request, call_next):
        start = time.perf_counter()
        response = await call_next(request)
        route = request.scope.get("route")
        endpoint = getattr(route, "path", request.url.path)
        record_request(
            request.method,
            endpoint,
            str(response.status_code),
            time.perf_counter() - start,
        )
        return response

    app.mount("/metrics", make_asgi_app())
    return app
{% else %}
def start_metrics_server(port={{ metrics_port }}):
    """Serve /metrics on a dedicated port."""
    start_http_server(port)
{% endif -%}
"#;

const TRACING_MODULE: &str = r#""""OpenTelemetry tracing for {{ service }}."""
from opentelemetry import trace
from opentelemetry.exporter.otlp.proto.grpc.trace_exporter import OTLPSpanExporter
from opentelemetry.sdk.resources import SERVICE_NAME, Resource
from opentelemetry.sdk.trace import TracerProvider
from opentelemetry.sdk.trace.export import BatchSpanProcessor
{%- if framework == "Flask" %}
from opentelemetry.instrumentation.flask import FlaskInstrumentor
{%- elif framework == "FastAPI" %}
from opentelemetry.instrumentation.fastapi import FastAPIInstrumentor
{%- endif %}


def init_tracer(app=None):
    """Install a batching OTLP tracer provider."""
    resource = Resource.create({SERVICE_NAME: "{{ service }}"})
    provider = TracerProvider(resource=resource)
    exporter = OTLPSpanExporter(endpoint="{{ collector_endpoint }}", insecure=True)
    provider.add_span_processor(BatchSpanProcessor(exporter))
    trace.set_tracer_provider(provider)
{%- if framework == "Flask" %}

    if app is not None:
        FlaskInstrumentor().instrument_app(app)
{%- elif framework == "FastAPI" %}

    if app is not None:
        FastAPIInstrumentor.instrument_app(app)
{%- endif %}

    return provider
"#;

#[derive(Debug, Default)]
pub struct PythonGenerator {}

impl PythonGenerator {
    pub fn new() -> Self {
        Self {}
    }
}

/// Anchor line and the code wired in after it.
struct Wiring {
    anchor: &'static str,
    metrics: &'static str,
    tracing: &'static str,
}

fn wiring(framework: &str) -> Wiring {
    match framework {
        "Flask" => Wiring {
            anchor: "app = Flask(__name__)",
            metrics: "from metrics_config import setup_metrics\nsetup_metrics(app)\n",
            tracing: "from otel_config import init_tracer\ninit_tracer(app)\n",
        },
        "FastAPI" => Wiring {
            anchor: "app = FastAPI()",
            metrics: "from metrics_config import setup_metrics\nsetup_metrics(app)\n",
            tracing: "from otel_config import init_tracer\ninit_tracer(app)\n",
        },
        _ => Wiring {
            anchor: MAIN_GUARD_ANCHOR,
            metrics: "    from metrics_config import start_metrics_server\n    start_metrics_server()\n",
            tracing: "    from otel_config import init_tracer\n    init_tracer()\n",
        },
    }
}

fn default_entry_point(framework: &str) -> &'static str {
    match framework {
        "Flask" | "FastAPI" => "app.py",
        "Django" => "manage.py",
        _ => "main.py",
    }
}

fn entry_point<'a>(context: &GenerationContext<'a>, kind: TelemetryKind) -> &'a str {
    context
        .entry_point(kind)
        .unwrap_or_else(|| default_entry_point(&context.framework))
}

impl InstrumentationGenerator for PythonGenerator {
    fn metrics_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        let entry = entry_point(context, TelemetryKind::Metrics);
        let module = join_relative(parent_dir(entry), "metrics_config.py");
        let wiring = wiring(&context.framework);

        plan.append(MANIFEST, METRICS_REQUIREMENTS.into())
            .create(&module, context.render(METRICS_MODULE)?)
            .modify(entry, wiring.anchor, wiring.metrics.into());

        Ok(())
    }

    fn tracing_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        let entry = entry_point(context, TelemetryKind::Tracing);
        let module = join_relative(parent_dir(entry), "otel_config.py");
        let wiring = wiring(&context.framework);

        plan.append(MANIFEST, context.render(TRACING_REQUIREMENTS)?)
            .create(&module, context.render(TRACING_MODULE)?)
            .modify(entry, wiring.anchor, wiring.tracing.into());

        Ok(())
    }
}
