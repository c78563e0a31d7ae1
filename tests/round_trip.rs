//! Generate, apply, re-scan: generated instrumentation must be detected by
//! the same classifiers that decided it was missing.
use std::{fs, path::Path};

use observability_copilot::{
    applier::{self, EditOutcome},
    generator::{GeneratorOptions, InstrumentationPlan, TelemetryMode, generate},
    scanner::{Language, ScanResult, Scanner},
};
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn repo(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (path, content) in files {
        write_file(tmp.path(), path, content);
    }
    tmp
}

fn scan(root: &Path) -> ScanResult {
    Scanner::default().scan_path(root).unwrap()
}

fn plan_for(
    root: &Path,
    language: Language,
    mode: TelemetryMode,
) -> InstrumentationPlan {
    let result = scan(root);
    generate(
        language,
        "orders",
        mode,
        result.detection(language).map(|d| d.framework.as_str()),
        &result.candidates_for(language),
        &GeneratorOptions::default(),
    )
    .unwrap()
}

fn assert_round_trip(root: &Path, language: Language) {
    let before = scan(root);
    let detection = before.detection(language).unwrap();
    assert!(!detection.has_metrics, "{language} already has metrics");
    assert!(!detection.has_tracing, "{language} already has tracing");

    let plan = plan_for(root, language, TelemetryMode::Both);
    let report = applier::apply(root, &plan).unwrap();
    assert!(report.changed());

    let after = scan(root);
    let detection = after.detection(language).unwrap();
    assert!(detection.has_metrics, "{language} metrics not detected");
    assert!(detection.has_tracing, "{language} tracing not detected");
}

const GO_MOD: &str = "module example.com/orders\n\ngo 1.22\n";

const GO_MAIN: &str = r#"package main

import (
	"log"
	"net/http"
)

func main() {
	http.HandleFunc("/", func(w http.ResponseWriter, r *http.Request) {
		w.Write([]byte("ok"))
	})
	log.Fatal(http.ListenAndServe(":8080", nil))
}
"#;

const PY_MAIN: &str = r#"def run():
    print("processing")


if __name__ == "__main__":
    run()
"#;

const PACKAGE_JSON: &str = r#"{
  "name": "orders",
  "version": "1.0.0",
  "dependencies": {
    "lodash": "^4.17.21"
  }
}
"#;

const NODE_INDEX: &str = r#"const http = require('http');

http.createServer((req, res) => res.end('ok')).listen(8080);
"#;

const GIN_GO_MOD: &str = r#"module example.com/orders

go 1.22

require github.com/gin-gonic/gin v1.9.1
"#;

const GIN_MAIN: &str = r#"package main

import "github.com/gin-gonic/gin"

func main() {
	router := gin.Default()
	router.GET("/", func(c *gin.Context) {
		c.String(200, "ok")
	})
	router.Run(":8080")
}
"#;

const FLASK_APP: &str = r#"from flask import Flask

app = Flask(__name__)


@app.route("/")
def index():
    return "ok"
"#;

const POM: &str = r#"<project>
    <groupId>com.acme</groupId>
    <artifactId>orders</artifactId>
    <dependencies>
        <dependency>
            <groupId>org.springframework.boot</groupId>
            <artifactId>spring-boot-starter-web</artifactId>
        </dependency>
    </dependencies>
</project>
"#;

#[test]
fn go_round_trip() {
    let tmp = repo(&[("go.mod", GO_MOD), ("main.go", GO_MAIN)]);
    assert_round_trip(tmp.path(), Language::Go);
}

#[test]
fn gin_round_trip_without_candidates() {
    let tmp = repo(&[("go.mod", GIN_GO_MOD), ("main.go", GIN_MAIN)]);
    assert_eq!(scan(tmp.path()).detection(Language::Go).unwrap().framework, "Gin");

    assert_round_trip(tmp.path(), Language::Go);

    let main_go = fs::read_to_string(tmp.path().join("main.go")).unwrap();
    assert!(main_go.contains(
        "router := gin.Default()\n\tdefer mustInitTracer()()\n\trouter.Use(tracingMiddleware())\n\tregisterMetricsRoutes(router)\n"
    ));
}

#[test]
fn python_round_trip() {
    let tmp = repo(&[("requirements.txt", "requests\n"), ("main.py", PY_MAIN)]);
    assert_round_trip(tmp.path(), Language::Python);
}

#[test]
fn flask_round_trip_without_candidates() {
    let tmp = repo(&[("requirements.txt", "flask\n"), ("app.py", FLASK_APP)]);

    let plan = plan_for(tmp.path(), Language::Python, TelemetryMode::Both);
    assert!(plan.edits.iter().all(|e| e.path != "main.py"));

    assert_round_trip(tmp.path(), Language::Python);

    assert!(!tmp.path().join("main.py").exists());
    let app = fs::read_to_string(tmp.path().join("app.py")).unwrap();
    assert!(app.len() > FLASK_APP.len());
    assert!(app.ends_with("def index():\n    return \"ok\"\n"));
}

#[test]
fn node_round_trip() {
    let tmp = repo(&[("package.json", PACKAGE_JSON), ("index.js", NODE_INDEX)]);
    assert_round_trip(tmp.path(), Language::Node);

    let manifest = fs::read_to_string(tmp.path().join("package.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert!(parsed["dependencies"]["prom-client"].is_string());
    assert!(parsed["dependencies"]["@opentelemetry/sdk-node"].is_string());
    assert_eq!(parsed["dependencies"]["lodash"], "^4.17.21");

    let index = fs::read_to_string(tmp.path().join("index.js")).unwrap();
    assert!(index.starts_with("require('./tracing');\nconst http = require('http');\n"));
}

#[test]
fn node_round_trip_with_empty_dependencies() {
    let tmp = repo(&[
        ("package.json", "{\n  \"name\": \"orders\",\n  \"dependencies\": {}\n}\n"),
        ("index.js", NODE_INDEX),
    ]);
    assert_round_trip(tmp.path(), Language::Node);

    let manifest = fs::read_to_string(tmp.path().join("package.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(parsed["dependencies"]["prom-client"], "^15.1.0");
    assert_eq!(parsed["name"], "orders");
}

#[test]
fn node_round_trip_without_dependencies_key() {
    let tmp = repo(&[
        ("package.json", r#"{"name": "orders", "version": "1.0.0"}"#),
        ("index.js", NODE_INDEX),
    ]);
    assert_round_trip(tmp.path(), Language::Node);

    let manifest = fs::read_to_string(tmp.path().join("package.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert!(parsed["dependencies"]["prom-client"].is_string());
    assert!(parsed["dependencies"]["@opentelemetry/api"].is_string());
}

#[test]
fn java_round_trip() {
    let tmp = repo(&[
        ("pom.xml", POM),
        (
            "src/main/resources/application.properties",
            "spring.application.name=orders\n",
        ),
    ]);
    assert_round_trip(tmp.path(), Language::Java);

    assert_eq!(
        fs::read_to_string(tmp.path().join("src/main/resources/application.properties"))
            .unwrap(),
        "spring.application.name=orders\n"
    );
}

#[test]
fn java_round_trip_without_properties_file() {
    let tmp = repo(&[("pom.xml", POM)]);
    assert_round_trip(tmp.path(), Language::Java);

    let resources = tmp.path().join("src/main/resources");
    assert!(!resources.join("application.properties").exists());
    let tracing = fs::read_to_string(resources.join("telemetry/tracing.properties")).unwrap();
    assert!(tracing.contains("otel.service.name=orders"));
}

#[test]
fn java_round_trip_with_yaml_configuration() {
    let yaml = "spring:\n  application:\n    name: orders\n";
    let tmp = repo(&[
        ("pom.xml", POM),
        ("src/main/resources/application.yml", yaml),
    ]);
    assert_round_trip(tmp.path(), Language::Java);

    assert_eq!(
        fs::read_to_string(tmp.path().join("src/main/resources/application.yml")).unwrap(),
        yaml
    );
    assert!(
        tmp.path()
            .join("src/main/resources/telemetry/metrics.properties")
            .is_file()
    );
}

#[test]
fn reapplying_a_plan_changes_nothing() {
    let tmp = repo(&[("go.mod", GO_MOD), ("main.go", GO_MAIN)]);
    let plan = plan_for(tmp.path(), Language::Go, TelemetryMode::Both);

    applier::apply(tmp.path(), &plan).unwrap();
    let main_go = fs::read_to_string(tmp.path().join("main.go")).unwrap();
    let go_mod = fs::read_to_string(tmp.path().join("go.mod")).unwrap();

    let report = applier::apply(tmp.path(), &plan).unwrap();

    assert!(!report.changed());
    assert_eq!(report.count(EditOutcome::AlreadyPresent), plan.edits.len());
    assert_eq!(
        fs::read_to_string(tmp.path().join("main.go")).unwrap(),
        main_go
    );
    assert_eq!(fs::read_to_string(tmp.path().join("go.mod")).unwrap(), go_mod);
}

#[test]
fn generation_is_deterministic() {
    let tmp = repo(&[
        ("requirements.txt", "flask\n"),
        ("app.py", "from flask import Flask\n\napp = Flask(__name__)\n"),
    ]);

    let first = plan_for(tmp.path(), Language::Python, TelemetryMode::Both);
    let second = plan_for(tmp.path(), Language::Python, TelemetryMode::Both);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn none_mode_leaves_tree_untouched() {
    let tmp = repo(&[("go.mod", GO_MOD), ("main.go", GO_MAIN)]);
    let plan = plan_for(tmp.path(), Language::Go, TelemetryMode::None);

    assert!(plan.edits.is_empty());

    let report = applier::apply(tmp.path(), &plan).unwrap();
    assert!(!report.changed());
    assert_eq!(
        fs::read_to_string(tmp.path().join("main.go")).unwrap(),
        GO_MAIN
    );
}

#[test]
fn missing_anchor_falls_back_to_append() {
    let tmp = repo(&[
        ("requirements.txt", "requests\n"),
        ("main.py", "print('no main guard')\n"),
    ]);
    let plan = plan_for(tmp.path(), Language::Python, TelemetryMode::Metrics);

    let report = applier::apply(tmp.path(), &plan).unwrap();

    assert_eq!(report.count(EditOutcome::AnchorFallback), 1);
    let main = fs::read_to_string(tmp.path().join("main.py")).unwrap();
    assert!(main.starts_with("print('no main guard')\n"));
    assert!(main.contains("start_metrics_server()"));

    let after = scan(tmp.path());
    assert!(after.detection(Language::Python).unwrap().has_metrics);
}

#[test]
fn polyglot_repository_reports_each_language() {
    let tmp = repo(&[
        ("go.mod", GO_MOD),
        ("main.go", GO_MAIN),
        ("package.json", PACKAGE_JSON),
        ("index.js", NODE_INDEX),
    ]);

    let result = scan(tmp.path());

    assert_eq!(result.frameworks.len(), 2);
    assert!(result.detection(Language::Go).is_some());
    assert!(result.detection(Language::Node).is_some());
}

#[test]
fn import_only_files_are_not_candidates() {
    let tmp = repo(&[
        ("requirements.txt", "prometheus-client\n"),
        (
            "app.py",
            "import prometheus_client\nfrom opentelemetry import trace\n\nprint('hello')\n",
        ),
        (
            "package.json",
            r#"{"dependencies": {"prom-client": "^15.1.0"}}"#,
        ),
        ("index.js", "const client = require('prom-client');\n"),
    ]);

    let result = scan(tmp.path());

    assert!(result.candidates.is_empty());
    let python = result.detection(Language::Python).unwrap();
    assert!(!python.has_metrics);
    assert!(!python.has_tracing);
    assert!(!result.detection(Language::Node).unwrap().has_metrics);
}

#[test]
fn increment_only_usage_is_detected() {
    let tmp = repo(&[
        ("requirements.txt", "prometheus-client\n"),
        (
            "worker.py",
            "from prometheus_client import Counter\nfrom metrics_registry import JOBS\n\ndef run():\n    JOBS.inc()\n",
        ),
    ]);

    let result = scan(tmp.path());
    let candidates = result.candidates_for(Language::Python);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].first_file(), Some("worker.py"));
}
