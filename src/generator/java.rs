//! Java instrumentation: Micrometer Prometheus registry and the
//! OpenTelemetry SDK, wired through Spring.
use crate::{
    Result,
    generator::{
        GenerationContext, traits::InstrumentationGenerator, types::PlanBuilder,
    },
};

const MANIFEST: &str = "pom.xml";
const DEPENDENCIES_ANCHOR: &str = "<dependencies>";
const METRICS_PROPERTIES_FILE: &str =
    "src/main/resources/telemetry/metrics.properties";
const TRACING_PROPERTIES_FILE: &str =
    "src/main/resources/telemetry/tracing.properties";
const METRICS_FILTER: &str = "src/main/java/telemetry/HttpMetricsFilter.java";
const TRACING_CONFIGURATION: &str =
    "src/main/java/telemetry/TracingConfiguration.java";

const METRICS_DEPENDENCIES: &str = r#"        <dependency>
            <groupId>io.micrometer</groupId>
            <artifactId>micrometer-registry-prometheus</artifactId>
        </dependency>
        <dependency>
            <groupId>org.springframework.boot</groupId>
            <artifactId>spring-boot-starter-actuator</artifactId>
        </dependency>
"#;

const TRACING_DEPENDENCIES: &str = r#"        <dependency>
            <groupId>io.opentelemetry</groupId>
            <artifactId>opentelemetry-api</artifactId>
            <version>1.32.0</version>
        </dependency>
        <dependency>
            <groupId>io.opentelemetry</groupId>
            <artifactId>opentelemetry-sdk</artifactId>
            <version>1.32.0</version>
        </dependency>
        <dependency>
            <groupId>io.opentelemetry</groupId>
            <artifactId>opentelemetry-exporter-otlp</artifactId>
            <version>1.32.0</version>
        </dependency>
"#;

const METRICS_PROPERTIES: &str = r#"management.endpoints.web.exposure.include=health,prometheus,metrics
management.endpoint.prometheus.enabled=true
management.metrics.tags.application={{ service }}
"#;

const TRACING_PROPERTIES: &str = r#"otel.service.name={{ service }}
otel.traces.exporter=otlp
otel.exporter.otlp.endpoint=http://{{ collector_endpoint }}
"#;

const METRICS_FILTER_SOURCE: &str = r#"package telemetry;

import io.micrometer.core.instrument.Counter;
import io.micrometer.core.instrument.MeterRegistry;
import io.micrometer.core.instrument.Timer;
import jakarta.servlet.FilterChain;
import jakarta.servlet.ServletException;
import jakarta.servlet.http.HttpServletRequest;
import jakarta.servlet.http.HttpServletResponse;
import java.io.IOException;
import org.springframework.context.annotation.PropertySource;
import org.springframework.stereotype.Component;
import org.springframework.web.filter.OncePerRequestFilter;

/** Records request count and duration for {{ service }}. */
@Component
@PropertySource("classpath:telemetry/metrics.properties")
public class HttpMetricsFilter extends OncePerRequestFilter {

    private final MeterRegistry registry;

    public HttpMetricsFilter(MeterRegistry registry) {
        this.registry = registry;
    }

    @Override
    protected void doFilterInternal(
            HttpServletRequest request,
            HttpServletResponse response,
            FilterChain chain) throws ServletException, IOException {
        Timer.Sample sample = Timer.start(registry);
        try {
            chain.doFilter(request, response);
        } finally {
            String method = request.getMethod();
            String endpoint = request.getRequestURI();
            String status = String.valueOf(response.getStatus());

            Counter.builder("{{ metric_prefix }}_http_requests_total")
                    .description("Total number of HTTP requests")
                    .tags("method", method, "endpoint", endpoint, "status", status)
                    .register(registry)
                    .increment();

            sample.stop(Timer.builder("{{ metric_prefix }}_http_request_duration_seconds")
                    .description("HTTP request duration in seconds")
                    .tags("method", method, "endpoint", endpoint, "status", status)
                    .register(registry));
        }
    }
}
"#;

const TRACING_CONFIGURATION_SOURCE: &str = r#"package telemetry;

import io.opentelemetry.api.OpenTelemetry;
import io.opentelemetry.api.common.AttributeKey;
import io.opentelemetry.api.common.Attributes;
import io.opentelemetry.api.trace.Tracer;
import io.opentelemetry.exporter.otlp.trace.OtlpGrpcSpanExporter;
import io.opentelemetry.sdk.OpenTelemetrySdk;
import io.opentelemetry.sdk.resources.Resource;
import io.opentelemetry.sdk.trace.SdkTracerProvider;
import io.opentelemetry.sdk.trace.export.BatchSpanProcessor;
import org.springframework.context.annotation.Bean;
import org.springframework.context.annotation.Configuration;
import org.springframework.context.annotation.PropertySource;

/** Exports spans for {{ service }} to the OTLP collector. */
@Configuration
@PropertySource("classpath:telemetry/tracing.properties")
public class TracingConfiguration {

    private static final String SERVICE_NAME = "{{ service }}";

    @Bean(destroyMethod = "close")
    public OpenTelemetrySdk openTelemetry() {
        Resource resource = Resource.getDefault().merge(
                Resource.create(Attributes.of(AttributeKey.stringKey("service.name"), SERVICE_NAME)));

        OtlpGrpcSpanExporter exporter = OtlpGrpcSpanExporter.builder()
                .setEndpoint("http://{{ collector_endpoint }}")
                .build();

        SdkTracerProvider tracerProvider = SdkTracerProvider.builder()
                .setResource(resource)
                .addSpanProcessor(BatchSpanProcessor.builder(exporter).build())
                .build();

        return OpenTelemetrySdk.builder()
                .setTracerProvider(tracerProvider)
                .buildAndRegisterGlobal();
    }

    @Bean
    public Tracer tracer(OpenTelemetry openTelemetry) {
        return openTelemetry.getTracer(SERVICE_NAME);
    }
}
"#;

/// Java wiring does not depend on candidate files: Spring picks up the
/// generated components by package, and each component loads its own
/// properties file. Values in the project's `application.properties` or
/// `application.yml` take precedence over them.
#[derive(Debug, Default)]
pub struct JavaGenerator {}

impl JavaGenerator {
    pub fn new() -> Self {
        Self {}
    }
}

impl InstrumentationGenerator for JavaGenerator {
    fn metrics_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        plan.modify(MANIFEST, DEPENDENCIES_ANCHOR, METRICS_DEPENDENCIES.into())
            .create(METRICS_FILTER, context.render(METRICS_FILTER_SOURCE)?)
            .create(METRICS_PROPERTIES_FILE, context.render(METRICS_PROPERTIES)?);

        Ok(())
    }

    fn tracing_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()> {
        plan.modify(MANIFEST, DEPENDENCIES_ANCHOR, TRACING_DEPENDENCIES.into())
            .create(
                TRACING_CONFIGURATION,
                context.render(TRACING_CONFIGURATION_SOURCE)?,
            )
            .create(TRACING_PROPERTIES_FILE, context.render(TRACING_PROPERTIES)?);

        Ok(())
    }
}
