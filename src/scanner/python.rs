//! Python classifier built on the tree-sitter Python grammar.
//!
//! Imports populate a local-name to qualified-name table, which is then used
//! to resolve the callee of every call expression.
use log::*;
use regex::Regex;
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

const METRICS_MODULES: &[&str] = &["prometheus_client", "prometheus_flask_exporter"];
const TRACING_MODULES: &[&str] = &["opentelemetry"];

const METRICS_FUNCS: &[&str] = &[
    "Counter",
    "Gauge",
    "Histogram",
    "Summary",
    "Info",
    "Enum",
    "start_http_server",
    "start_wsgi_server",
    "make_wsgi_app",
    "make_asgi_app",
    "generate_latest",
    "push_to_gateway",
    "PrometheusMetrics",
];

const TRACING_FUNCS: &[&str] = &[
    "TracerProvider",
    "BatchSpanProcessor",
    "SimpleSpanProcessor",
    "OTLPSpanExporter",
    "set_tracer_provider",
    "get_tracer",
    "FlaskInstrumentor",
    "FastAPIInstrumentor",
    "DjangoInstrumentor",
    "RequestsInstrumentor",
];

const METRICS_METHODS: &[&str] = &["inc", "dec", "observe", "set"];

const TRACING_METHODS: &[&str] = &[
    "start_as_current_span",
    "start_span",
    "instrument",
    "instrument_app",
    "add_span_processor",
];

const MANIFESTS: &[&str] =
    &["requirements.txt", "pyproject.toml", "setup.py", "Pipfile"];

/// Framework labels keyed by distribution name.
const FRAMEWORKS: &[(&str, &str)] =
    &[("flask", "Flask"), ("django", "Django"), ("fastapi", "FastAPI")];

#[derive(Debug, Default)]
pub struct PythonClassifier {}

impl PythonClassifier {
    pub fn new() -> Self {
        Self {}
    }

    fn framework_from_requirements(&self, content: &str) -> Option<String> {
        let names = requirement_names(content.lines()).unwrap_or_default();
        framework_from_names(&names)
    }

    fn framework_from_pyproject(&self, content: &str) -> Option<String> {
        let doc: toml::Table = toml::from_str(content).ok()?;

        let mut specs: Vec<String> = vec![];

        if let Some(deps) = doc
            .get("project")
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_array())
        {
            specs.extend(deps.iter().filter_map(|d| d.as_str()).map(String::from));
        }

        if let Some(deps) = doc
            .get("tool")
            .and_then(|t| t.get("poetry"))
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_table())
        {
            specs.extend(deps.keys().cloned());
        }

        let names =
            requirement_names(specs.iter().map(String::as_str)).unwrap_or_default();
        framework_from_names(&names)
    }

    fn framework_from_sources(&self, walker: &SourceWalker) -> Option<String> {
        let files = walker.files_lenient(|p| {
            p.extension().map(|e| e == "py").unwrap_or(false)
        });

        for file in files {
            let Ok(content) = read_source(&file) else {
                continue;
            };

            let imports_flask = content.contains("from flask import")
                || content.contains("import flask");
            if imports_flask && content.contains("Flask(") {
                return Some("Flask".into());
            }

            let imports_fastapi = content.contains("from fastapi import")
                || content.contains("import fastapi");
            if imports_fastapi && content.contains("FastAPI(") {
                return Some("FastAPI".into());
            }

            if content.contains("django.core.management") {
                return Some("Django".into());
            }
        }

        None
    }
}

impl LanguageClassifier for PythonClassifier {
    fn language(&self) -> Language {
        Language::Python
    }

    fn is_present(&self, walker: &SourceWalker) -> bool {
        walker.any_named(MANIFESTS)
            || !walker
                .files_lenient(|p| p.extension().map(|e| e == "py").unwrap_or(false))
                .is_empty()
    }

    fn framework(&self, walker: &SourceWalker) -> String {
        let root = walker.root();

        if let Ok(content) = read_source(&root.join("requirements.txt"))
            && let Some(framework) = self.framework_from_requirements(&content)
        {
            return framework;
        }

        if let Ok(content) = read_source(&root.join("pyproject.toml"))
            && let Some(framework) = self.framework_from_pyproject(&content)
        {
            return framework;
        }

        let nested = walker.files_lenient(|p| {
            p.file_name().map(|n| n == "requirements.txt").unwrap_or(false)
        });
        for file in nested {
            if let Ok(content) = read_source(&file)
                && let Some(framework) = self.framework_from_requirements(&content)
            {
                return framework;
            }
        }

        self.framework_from_sources(walker)
            .unwrap_or_else(|| Language::Python.label().into())
    }

    fn classify(&self, walker: &SourceWalker) -> Result<Classification> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;

        let mut classification = Classification::default();

        for path in walker.files_with_extensions(&["py"])? {
            let content = read_source(&path)?;
            let relative = repo_relative(walker.root(), &path);

            let tree = parser.parse(&content, None).ok_or_else(|| {
                CopilotError::ClassificationDegraded {
                    language: Language::Python.label().into(),
                    reason: format!("failed to parse {relative}"),
                }
            })?;

            let usage = analyze_module(tree.root_node(), content.as_bytes());

            for (kind, patterns, imported) in [
                (TelemetryKind::Metrics, &usage.metrics, usage.imports_metrics),
                (TelemetryKind::Tracing, &usage.tracing, usage.imports_tracing),
            ] {
                if !patterns.is_empty() {
                    classification
                        .kind_mut(kind)
                        .record(&relative, patterns.iter().cloned());
                } else if imported {
                    debug!("{relative}: {kind} library imported but not used");
                }
            }
        }

        Ok(classification)
    }
}

#[derive(Debug, Default)]
struct ModuleUsage {
    imports_metrics: bool,
    imports_tracing: bool,
    metrics: BTreeSet<String>,
    tracing: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Bindings {
    /// Local name -> fully qualified dotted name.
    names: HashMap<String, String>,
    /// Modules imported with `from x import *`.
    wildcards: Vec<String>,
}

impl Bindings {
    fn imports_any(&self, modules: &[&str]) -> bool {
        self.names
            .values()
            .chain(self.wildcards.iter())
            .any(|q| in_modules(q, modules))
    }

    /// Resolves a callee chain to a qualified name.
    fn resolve(&self, chain: &[String]) -> Option<String> {
        let (root, rest) = chain.split_first()?;

        if let Some(qualified) = self.names.get(root) {
            let mut parts = vec![qualified.clone()];
            parts.extend(rest.iter().cloned());
            return Some(parts.join("."));
        }

        // A bare name may come from a wildcard import.
        if rest.is_empty() {
            return self
                .wildcards
                .iter()
                .find(|m| {
                    (in_modules(m, METRICS_MODULES)
                        && METRICS_FUNCS.contains(&root.as_str()))
                        || (in_modules(m, TRACING_MODULES)
                            && TRACING_FUNCS.contains(&root.as_str()))
                })
                .map(|m| format!("{m}.{root}"));
        }

        None
    }
}

fn in_modules(qualified: &str, modules: &[&str]) -> bool {
    modules.iter().any(|m| {
        qualified == *m || qualified.starts_with(&format!("{m}."))
    })
}

fn analyze_module(root: Node, source: &[u8]) -> ModuleUsage {
    let bindings = collect_bindings(root, source);

    let mut usage = ModuleUsage {
        imports_metrics: bindings.imports_any(METRICS_MODULES),
        imports_tracing: bindings.imports_any(TRACING_MODULES),
        ..Default::default()
    };

    if !usage.imports_metrics && !usage.imports_tracing {
        return usage;
    }

    walk_tree(root, &mut |node| {
        if node.kind() != "call" {
            return;
        }
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };

        let chain = callee_chain(function, source);
        let Some(func) = chain.last() else {
            return;
        };

        if let Some(qualified) = bindings.resolve(&chain)
            && (in_modules(&qualified, METRICS_MODULES)
                || in_modules(&qualified, TRACING_MODULES))
        {
            let library = qualified.split('.').next().unwrap_or_default();

            if in_modules(&qualified, METRICS_MODULES)
                && METRICS_FUNCS.contains(&func.as_str())
            {
                usage.metrics.insert(format!("{library}.{func}"));
            }
            if in_modules(&qualified, TRACING_MODULES)
                && TRACING_FUNCS.contains(&func.as_str())
            {
                usage.tracing.insert(format!("{library}.{func}"));
            }
            return;
        }

        if chain.len() < 2 {
            return;
        }

        if usage.imports_metrics && METRICS_METHODS.contains(&func.as_str()) {
            usage.metrics.insert(format!(".{func}"));
        }
        if usage.imports_tracing && TRACING_METHODS.contains(&func.as_str()) {
            usage.tracing.insert(format!(".{func}"));
        }
    });

    usage
}

fn collect_bindings(root: Node, source: &[u8]) -> Bindings {
    let mut bindings = Bindings::default();

    walk_tree(root, &mut |node| match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                match name.kind() {
                    "aliased_import" => {
                        let module = name
                            .child_by_field_name("name")
                            .map(|n| node_text(n, source));
                        let alias = name
                            .child_by_field_name("alias")
                            .map(|n| node_text(n, source));
                        if let (Some(module), Some(alias)) = (module, alias) {
                            bindings.names.insert(alias, module);
                        }
                    }
                    _ => {
                        // `import a.b.c` binds `a`.
                        let dotted = node_text(name, source);
                        let root = dotted.split('.').next().unwrap_or_default();
                        bindings.names.insert(root.to_string(), root.to_string());
                    }
                }
            }
        }
        "import_from_statement" => {
            let Some(module) = node
                .child_by_field_name("module_name")
                .map(|n| node_text(n, source))
            else {
                return;
            };

            let mut cursor = node.walk();
            let mut bound_any = false;
            for name in node.children_by_field_name("name", &mut cursor) {
                bound_any = true;
                match name.kind() {
                    "aliased_import" => {
                        let imported = name
                            .child_by_field_name("name")
                            .map(|n| node_text(n, source));
                        let alias = name
                            .child_by_field_name("alias")
                            .map(|n| node_text(n, source));
                        if let (Some(imported), Some(alias)) = (imported, alias) {
                            bindings.names.insert(alias, format!("{module}.{imported}"));
                        }
                    }
                    _ => {
                        let imported = node_text(name, source);
                        bindings
                            .names
                            .insert(imported.clone(), format!("{module}.{imported}"));
                    }
                }
            }

            if !bound_any {
                bindings.wildcards.push(module);
            }
        }
        _ => {}
    });

    bindings
}

/// Identifiers of a callee: `a.b.c` -> `[a, b, c]`. A root that is not a
/// plain name (a call or subscript) becomes an empty string.
fn callee_chain(node: Node, source: &[u8]) -> Vec<String> {
    match node.kind() {
        "identifier" => vec![node_text(node, source)],
        "attribute" => {
            let mut chain = match node.child_by_field_name("object") {
                Some(object) => callee_chain(object, source),
                None => vec![String::new()],
            };
            if let Some(attribute) = node.child_by_field_name("attribute") {
                chain.push(node_text(attribute, source));
            }
            chain
        }
        _ => vec![String::new()],
    }
}

/// Distribution names from requirement specifiers, lowercased.
fn requirement_names<'a, I>(lines: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let re = Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._\-]*)")?;

    Ok(lines
        .into_iter()
        .filter(|l| !l.trim_start().starts_with('#') && !l.trim_start().starts_with('-'))
        .filter_map(|l| re.captures(l))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase().replace('_', "-"))
        .collect())
}

fn framework_from_names(names: &[String]) -> Option<String> {
    FRAMEWORKS
        .iter()
        .find(|(dist, _)| {
            names
                .iter()
                .any(|n| n == dist || n.starts_with(&format!("{dist}-")))
        })
        .map(|(_, label)| label.to_string())
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
