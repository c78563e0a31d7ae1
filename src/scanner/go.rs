//! Go classifier built on the tree-sitter Go grammar.
//!
//! Usage is detected from call expressions: selector chains are flattened
//! (`prometheus.DefaultRegisterer.MustRegister` becomes
//! `[prometheus, DefaultRegisterer, MustRegister]`) and the root is resolved
//! through the file's import table so renamed imports are still recognized.
use log::*;
use std::collections::{BTreeSet, HashMap};
use tree_sitter::{Node, Parser};

use crate::{
    CopilotError, Result,
    path_helpers::repo_relative,
    scanner::{
        patterns::read_source,
        traits::LanguageClassifier,
        types::{Classification, Language, TelemetryKind},
        walker::SourceWalker,
    },
};

const PROMETHEUS_MODULE: &str = "github.com/prometheus/client_golang";
const OTEL_MODULE: &str = "go.opentelemetry.io";

/// Package level functions that count as metrics usage.
const METRICS_FUNCS: &[&str] = &[
    "MustRegister",
    "Register",
    "NewRegistry",
    "NewCounter",
    "NewCounterVec",
    "NewGauge",
    "NewGaugeVec",
    "NewHistogram",
    "NewHistogramVec",
    "NewSummary",
    "NewSummaryVec",
    "Handler",
    "HandlerFor",
    "InstrumentHandlerCounter",
    "InstrumentHandlerDuration",
];

/// Package level functions that count as tracing usage.
const TRACING_FUNCS: &[&str] = &[
    "NewTracerProvider",
    "SetTracerProvider",
    "GetTracerProvider",
    "Tracer",
    "SetTextMapPropagator",
    "Middleware",
    "NewHandler",
    "NewTransport",
    "New",
];

/// Methods on metric values, counted when the receiver is not a package.
/// `Add` and `Set` are left out: `sync.WaitGroup` and `http.Header` share
/// those names.
const METRICS_METHODS: &[&str] = &["Inc", "Dec", "Observe"];

/// Methods on tracers, counted when the receiver is not a package.
const TRACING_METHODS: &[&str] = &["Start"];

const FRAMEWORKS: &[(&str, &str)] = &[
    ("github.com/gin-gonic/gin", "Gin"),
    ("github.com/labstack/echo", "Echo"),
    ("github.com/go-chi/chi", "Chi"),
    ("github.com/gorilla/mux", "Gorilla Mux"),
    ("github.com/gofiber/fiber", "Fiber"),
];

#[derive(Debug, Default)]
pub struct GoClassifier {}

impl GoClassifier {
    pub fn new() -> Self {
        Self {}
    }
}

impl LanguageClassifier for GoClassifier {
    fn language(&self) -> Language {
        Language::Go
    }

    fn is_present(&self, walker: &SourceWalker) -> bool {
        walker.find_named("go.mod").is_some()
    }

    fn framework(&self, walker: &SourceWalker) -> String {
        let Some(go_mod) = walker.find_named("go.mod") else {
            return Language::Go.label().into();
        };

        let content = read_source(&go_mod).unwrap_or_default();

        FRAMEWORKS
            .iter()
            .find(|(module, _)| content.contains(module))
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| Language::Go.label().into())
    }

    fn classify(&self, walker: &SourceWalker) -> Result<Classification> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;

        let mut classification = Classification::default();

        for path in walker.files_with_extensions(&["go"])? {
            let content = read_source(&path)?;
            let relative = repo_relative(walker.root(), &path);

            let tree = parser.parse(&content, None).ok_or_else(|| {
                CopilotError::ClassificationDegraded {
                    language: Language::Go.label().into(),
                    reason: format!("failed to parse {relative}"),
                }
            })?;

            let usage = analyze_file(tree.root_node(), content.as_bytes());

            for kind in [TelemetryKind::Metrics, TelemetryKind::Tracing] {
                let patterns = usage.patterns(kind);
                if !patterns.is_empty() {
                    classification
                        .kind_mut(kind)
                        .record(&relative, patterns.iter().cloned());
                } else if usage.imports(kind) {
                    debug!("{relative}: {kind} package imported but not used");
                }
            }
        }

        Ok(classification)
    }
}

/// Per-file result of the import and usage passes.
#[derive(Debug, Default)]
struct FileUsage {
    imports_prometheus: bool,
    imports_otel: bool,
    metrics: BTreeSet<String>,
    tracing: BTreeSet<String>,
}

impl FileUsage {
    fn imports(&self, kind: TelemetryKind) -> bool {
        match kind {
            TelemetryKind::Metrics => self.imports_prometheus,
            TelemetryKind::Tracing => self.imports_otel,
        }
    }

    fn patterns(&self, kind: TelemetryKind) -> &BTreeSet<String> {
        match kind {
            TelemetryKind::Metrics => &self.metrics,
            TelemetryKind::Tracing => &self.tracing,
        }
    }
}

/// Import table of a Go file.
#[derive(Debug, Default)]
struct Imports {
    /// Local package name -> import path.
    aliases: HashMap<String, String>,
    /// Paths imported with `.`.
    dot_imports: Vec<String>,
    /// Every imported path, including blank imports.
    paths: Vec<String>,
}

impl Imports {
    fn any_path(&self, module: &str) -> bool {
        self.paths.iter().any(|p| p.contains(module))
    }
}

fn analyze_file(root: Node, source: &[u8]) -> FileUsage {
    let imports = collect_imports(root, source);

    let mut usage = FileUsage {
        imports_prometheus: imports.any_path(PROMETHEUS_MODULE),
        imports_otel: imports.any_path(OTEL_MODULE),
        ..Default::default()
    };

    // No import, no usage: skip the call walk entirely.
    if !usage.imports_prometheus && !usage.imports_otel {
        return usage;
    }

    walk_tree(root, &mut |node| {
        if node.kind() != "call_expression" {
            return;
        }

        let Some(function) = node.child_by_field_name("function") else {
            return;
        };

        match function.kind() {
            "selector_expression" => {
                let chain = selector_chain(function, source);
                classify_chain(&chain, &imports, &mut usage);
            }
            "identifier" => {
                let name = node_text(function, source);
                classify_dot_call(&name, &imports, &mut usage);
            }
            _ => {}
        }
    });

    usage
}

fn collect_imports(root: Node, source: &[u8]) -> Imports {
    let mut imports = Imports::default();

    walk_tree(root, &mut |node| {
        if node.kind() != "import_spec" {
            return;
        }

        let Some(path_node) = node.child_by_field_name("path") else {
            return;
        };
        let path = node_text(path_node, source)
            .trim_matches(|c| c == '"' || c == '`')
            .to_string();

        if path.is_empty() {
            return;
        }

        imports.paths.push(path.clone());

        match node.child_by_field_name("name") {
            Some(name) => match name.kind() {
                "blank_identifier" => {}
                "dot" => imports.dot_imports.push(path),
                _ => {
                    imports.aliases.insert(node_text(name, source), path);
                }
            },
            None => {
                imports.aliases.insert(default_package_name(&path), path);
            }
        }
    });

    imports
}

/// Package name implied by an import path: the last element, skipping a
/// trailing major version (`github.com/go-chi/chi/v5` -> `chi`).
fn default_package_name(path: &str) -> String {
    let mut elements = path.rsplit('/');
    let last = elements.next().unwrap_or(path);

    if is_major_version(last)
        && let Some(previous) = elements.next()
    {
        return previous.to_string();
    }

    last.to_string()
}

fn is_major_version(element: &str) -> bool {
    element.len() > 1
        && element.starts_with('v')
        && element[1..].chars().all(|c| c.is_ascii_digit())
}

/// Flattens a selector chain into its identifiers. A root that is not a plain
/// identifier (a call, index or literal) is represented by an empty string.
fn selector_chain(node: Node, source: &[u8]) -> Vec<String> {
    match node.kind() {
        "selector_expression" => {
            let mut chain = match node.child_by_field_name("operand") {
                Some(operand) => selector_chain(operand, source),
                None => vec![String::new()],
            };
            if let Some(field) = node.child_by_field_name("field") {
                chain.push(node_text(field, source));
            }
            chain
        }
        "identifier" | "package_identifier" => vec![node_text(node, source)],
        _ => vec![String::new()],
    }
}

fn classify_chain(chain: &[String], imports: &Imports, usage: &mut FileUsage) {
    let (Some(root), Some(func)) = (chain.first(), chain.last()) else {
        return;
    };
    if chain.len() < 2 {
        return;
    }

    if let Some(path) = imports.aliases.get(root) {
        let package = default_package_name(path);

        if path.contains(PROMETHEUS_MODULE) && METRICS_FUNCS.contains(&func.as_str())
        {
            usage.metrics.insert(format!("{package}.{func}"));
        }

        if path.contains(OTEL_MODULE) && TRACING_FUNCS.contains(&func.as_str()) {
            usage.tracing.insert(format!("{package}.{func}"));
        }

        return;
    }

    // Receiver methods: the root is a variable, field or call result.
    if usage.imports_prometheus && METRICS_METHODS.contains(&func.as_str()) {
        usage.metrics.insert(format!(".{func}"));
    }

    if usage.imports_otel && TRACING_METHODS.contains(&func.as_str()) {
        usage.tracing.insert(format!(".{func}"));
    }
}

/// Bare calls resolved through dot imports.
fn classify_dot_call(name: &str, imports: &Imports, usage: &mut FileUsage) {
    for path in &imports.dot_imports {
        if path.contains(PROMETHEUS_MODULE) && METRICS_FUNCS.contains(&name) {
            usage.metrics.insert(format!("{}.{name}", default_package_name(path)));
        }
        if path.contains(OTEL_MODULE) && TRACING_FUNCS.contains(&name) {
            usage.tracing.insert(format!("{}.{name}", default_package_name(path)));
        }
    }
}

fn walk_tree<F>(node: Node, callback: &mut F)
where
    F: FnMut(Node),
{
    callback(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_tree(child, callback);
    }
}

fn node_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_file;
    use tempfile::TempDir;

    fn classify(files: &[(&str, &str)]) -> Classification {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "go.mod", "module example.com/svc\n");
        for (path, content) in files {
            write_file(tmp.path(), path, content);
        }
        let walker = SourceWalker::new(tmp.path(), &[]);
        GoClassifier::new().classify(&walker).unwrap()
    }

    #[test]
    fn detects_direct_prometheus_usage() {
        let result = classify(&[(
            "main.go",
            r#"package main

import (
	"net/http"

	"github.com/prometheus/client_golang/prometheus/promhttp"
)

func main() {
	http.Handle("/metrics", promhttp.Handler())
}
"#,
        )]);

        assert!(result.metrics.files.contains("main.go"));
        assert!(result.metrics.patterns.contains("promhttp.Handler"));
        assert!(result.tracing.is_empty());
    }

    #[test]
    fn resolves_renamed_imports() {
        let result = classify(&[(
            "metrics.go",
            r#"package main

import prom "github.com/prometheus/client_golang/prometheus"

var requests = prom.NewCounterVec(prom.CounterOpts{Name: "requests_total"}, []string{"code"})
"#,
        )]);

        assert!(result.metrics.files.contains("metrics.go"));
        assert!(result.metrics.patterns.contains("prometheus.NewCounterVec"));
    }

    #[test]
    fn follows_nested_selector_chains() {
        let result = classify(&[(
            "register.go",
            r#"package main

import "github.com/prometheus/client_golang/prometheus"

func init() {
	prometheus.DefaultRegisterer.MustRegister(requests)
}
"#,
        )]);

        assert!(result.metrics.patterns.contains("prometheus.MustRegister"));
    }

    #[test]
    fn import_only_is_not_usage() {
        let result = classify(&[(
            "main.go",
            r#"package main

import (
	"fmt"

	_ "github.com/prometheus/client_golang/prometheus"
	"go.opentelemetry.io/otel"
)

var _ = otel.Version

func main() {
	fmt.Println("hello")
}
"#,
        )]);

        assert!(result.metrics.is_empty());
        assert!(result.tracing.is_empty());
    }

    #[test]
    fn counts_increment_calls_on_metric_values() {
        let result = classify(&[(
            "handler.go",
            r#"package main

import "github.com/prometheus/client_golang/prometheus"

var hits prometheus.Counter

func handle() {
	hits.Inc()
}
"#,
        )]);

        assert!(result.metrics.files.contains("handler.go"));
        assert!(result.metrics.patterns.contains(".Inc"));
    }

    #[test]
    fn header_and_waitgroup_methods_are_not_metrics_usage() {
        let result = classify(&[(
            "handler.go",
            r#"package main

import (
	"net/http"
	"sync"

	"github.com/prometheus/client_golang/prometheus"
)

var hits prometheus.Counter

func handle(w http.ResponseWriter, r *http.Request) {
	var wg sync.WaitGroup
	wg.Add(1)
	w.Header().Set("Content-Type", "text/plain")
	wg.Done()
}
"#,
        )]);

        assert!(result.metrics.is_empty());
    }

    #[test]
    fn detects_tracing_with_versioned_and_aliased_paths() {
        let result = classify(&[(
            "tracing.go",
            r#"package main

import (
	"context"

	"go.opentelemetry.io/otel"
	sdktrace "go.opentelemetry.io/otel/sdk/trace"
)

func setup(ctx context.Context) {
	tp := sdktrace.NewTracerProvider()
	otel.SetTracerProvider(tp)
	_, span := otel.Tracer("svc").Start(ctx, "op")
	span.End()
}
"#,
        )]);

        let patterns: Vec<_> = result.tracing.patterns.iter().cloned().collect();
        assert_eq!(
            patterns,
            vec![
                ".Start".to_string(),
                "otel.SetTracerProvider".to_string(),
                "otel.Tracer".to_string(),
                "trace.NewTracerProvider".to_string(),
            ]
        );
    }

    #[test]
    fn ignores_unrelated_packages_with_same_function_names() {
        let result = classify(&[(
            "server.go",
            r#"package main

import (
	"net/http"

	"github.com/prometheus/client_golang/prometheus"
)

var _ prometheus.Collector

func main() {
	http.Handle("/", http.NotFoundHandler())
	mux := http.NewServeMux()
	_ = mux
}
"#,
        )]);

        assert!(result.metrics.is_empty());
    }

    #[test]
    fn default_package_name_skips_major_versions() {
        assert_eq!(default_package_name("github.com/go-chi/chi/v5"), "chi");
        assert_eq!(
            default_package_name("github.com/prometheus/client_golang/prometheus"),
            "prometheus"
        );
        assert_eq!(default_package_name("fmt"), "fmt");
    }

    #[test]
    fn infers_framework_from_go_mod() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "go.mod",
            "module x\n\nrequire github.com/gin-gonic/gin v1.9.1\n",
        );
        let walker = SourceWalker::new(tmp.path(), &[]);
        let classifier = GoClassifier::new();
        assert!(classifier.is_present(&walker));
        assert_eq!(classifier.framework(&walker), "Gin");
    }
}
