//! Node.js instrumentation: prom-client and the OpenTelemetry Node SDK.
use serde_json::json;

use crate::{
    Result,
    generator::{
        GenerationContext, traits::InstrumentationGenerator, types::PlanBuilder,
    },
    path_helpers::{join_relative, parent_dir},
    scanner::TelemetryKind,
};

const MANIFEST: &str = "package.json";
const DEFAULT_ENTRY_POINT: &str = "index.js";
const EXPRESS_ANCHOR: &str = "const app = express()";

const METRICS_DEPENDENCIES: &[(&str, &str)] = &[("prom-client", "^15.1.0")];

const TRACING_DEPENDENCIES: &[(&str, &str)] = &[
    ("@opentelemetry/api", "^1.8.0"),
    ("@opentelemetry/sdk-node", "^0.49.1"),
    ("@opentelemetry/resources", "^1.22.0"),
    ("@opentelemetry/exporter-trace-otlp-grpc", "^0.49.1"),
    ("@opentelemetry/auto-instrumentations-node", "^0.43.0"),
];

const METRICS_MODULE: &str = r#"'use strict';

const http = require('http');
const client = require('prom-client');

const register = new client.Registry();
client.collectDefaultMetrics({ register });

const httpRequestsTotal = new client.Counter({
  name: '{{ metric_prefix }}_http_requests_total',
  help: 'Total number of HTTP requests',
  labelNames: ['method', 'endpoint', 'status'],
  registers: [register],
});

const httpRequestDuration = new client.Histogram({
  name: '{{ metric_prefix }}_http_request_duration_seconds',
  help: 'HTTP request duration in seconds',
  labelNames: ['method', 'endpoint', 'status'],
  registers: [register],
});

function middleware(req, res, next) {
  const end = httpRequestDuration.startTimer();
  res.on('finish', () => {
    const labels = {
      method: req.method,
      endpoint: req.route ? req.route.path : req.path,
      status: String(res.statusCode),
    };
    httpRequestsTotal.inc(labels);
    end(labels);
  });
  next();
}

async function handler(req, res) {
  res.setHeader('Content-Type', register.contentType);
  res.end(await register.metrics());
}

function startMetricsServer(port = {{ metrics_port }}) {
  return http
    .createServer((req, res) => {
      if (req.url === '/metrics') {
        handler(req, res);
        return;
      }
      res.statusCode = 404;
      res.end();
    })
    .listen(port);
}

module.exports = { register, middleware, handler, startMetricsServer };
"#;

const TRACING_MODULE: &str = r#"'use strict';

const { NodeSDK } = require('@opentelemetry/sdk-node');
const { Resource } = require('@opentelemetry/resources');
const { OTLPTraceExporter } = require('@opentelemetry/exporter-trace-otlp-grpc');
const { getNodeAutoInstrumentations } = require('@opentelemetry/auto-instrumentations-node');

const exporter = new OTLPTraceExporter({
  url: 'http://{{ collector_endpoint }}',
});

const sdk = new NodeSDK({
  resource: new Resource({ 'service.name': '{{ service }}' }),
  traceExporter: exporter,
  instrumentations: [getNodeAutoInstrumentations()],
});

sdk.start();

process.on('SIGTERM', () => {
  sdk.shutdown().finally(() => process.exit(0));
});

module.exports = sdk;
"#;

const EXPRESS_METRICS_WIRING: &str = "const metrics = require('./metrics');\napp.use(metrics.middleware);\napp.get('/metrics', metrics.handler);\n";
const SERVER_METRICS_WIRING: &str = "require('./metrics').startMetricsServer();\n";
const TRACING_WIRING: &str = "require('./tracing');\n";

#[derive(Debug, Default)]
pub struct NodeGenerator {}

impl NodeGenerator {
    pub fn new() -> Self {
        Self {}
    }
}

/// Merge document adding `packages` under `dependencies`.
fn dependencies(packages: &[(&str, &str)]) -> String {
    let packages: serde_json::Map<_, _> = packages
        .iter()
        .map(|(name, version)| (name.to_string(), json!(version)))
        .collect();

    json!({ "dependencies": packages }).to_string()
}

fn entry_point<'a>(context: &GenerationContext<'a>, kind: TelemetryKind) -> &'a str {
    context.entry_point(kind).unwrap_or(DEFAULT_ENTRY_POINT)
}

impl InstrumentationGenerator for NodeGenerator {
    fn metrics_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        let entry = entry_point(context, TelemetryKind::Metrics);
        let module = join_relative(parent_dir(entry), "metrics.js");

        plan.merge(MANIFEST, dependencies(METRICS_DEPENDENCIES))
            .create(&module, context.render(METRICS_MODULE)?);

        if context.framework == "Express" {
            plan.modify(entry, EXPRESS_ANCHOR, EXPRESS_METRICS_WIRING.into());
        } else {
            plan.append(entry, SERVER_METRICS_WIRING.into());
        }

        Ok(())
    }

    fn tracing_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        let entry = entry_point(context, TelemetryKind::Tracing);
        let module = join_relative(parent_dir(entry), "tracing.js");

        // the SDK must load before the modules it patches
        plan.merge(MANIFEST, dependencies(TRACING_DEPENDENCIES))
            .create(&module, context.render(TRACING_MODULE)?)
            .prepend(entry, TRACING_WIRING.into());

        Ok(())
    }
}
