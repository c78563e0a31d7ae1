//! Branch names, commit messages and pull request bodies for generated
//! instrumentation.
use crate::{
    applier::{ApplyReport, EditOutcome},
    generator::types::{InstrumentationPlan, TelemetryMode},
};

/// Branch the instrumentation commit is pushed to.
pub fn branch_name(mode: TelemetryMode) -> &'static str {
    match mode {
        TelemetryMode::Metrics => "feat/add-prometheus-metrics",
        TelemetryMode::Traces => "feat/add-opentelemetry-traces",
        TelemetryMode::Both | TelemetryMode::None => "feat/add-observability",
    }
}

/// Commit subject, also used as the pull request title.
pub fn commit_message(mode: TelemetryMode) -> &'static str {
    match mode {
        TelemetryMode::Metrics => "feat: Add Prometheus metrics instrumentation",
        TelemetryMode::Traces => "feat: Add OpenTelemetry distributed tracing",
        TelemetryMode::Both => {
            "feat: Add observability with Prometheus and OpenTelemetry"
        }
        TelemetryMode::None => "feat: Add observability instrumentation",
    }
}

pub fn pr_title(plan: &InstrumentationPlan) -> String {
    format!("{} ({})", commit_message(plan.mode), plan.service)
}

/// Markdown body listing every edit of `plan` and what happened to it.
pub fn pr_body(plan: &InstrumentationPlan, report: &ApplyReport) -> String {
    let mut body = String::new();

    body.push_str("## Observability Instrumentation\n\n");
    body.push_str(&format!(
        "This PR adds **{}** instrumentation to `{}` ({}).\n\n",
        plan.mode, plan.service, plan.language
    ));
    body.push_str(&format!("{}\n\n", plan.description));

    body.push_str("### Changes Made\n\n");
    for applied in report.edits.iter() {
        let note = match applied.outcome {
            EditOutcome::Created => "created",
            EditOutcome::Appended => "appended",
            EditOutcome::Inserted => "inserted after anchor",
            EditOutcome::Merged => "merged missing entries",
            EditOutcome::Prepended => "inserted at start of file",
            EditOutcome::AnchorFallback => {
                "anchor not found, appended at end of file (please review)"
            }
            EditOutcome::AlreadyPresent => "already present, unchanged",
        };
        body.push_str(&format!(
            "- `{}` ({}): {}\n",
            applied.path, applied.action, note
        ));
    }

    if !plan.notes.is_empty() {
        body.push_str("\n### Manual Steps\n\n");
        for note in plan.notes.iter() {
            body.push_str(&format!("- {note}\n"));
        }
    }

    body.push_str("\n### What's Included\n\n");
    if plan.mode.includes_metrics() {
        body.push_str("- Prometheus metrics endpoint (`/metrics`)\n");
        body.push_str("- HTTP request counters and duration histograms\n");
    }
    if plan.mode.includes_traces() {
        body.push_str("- OpenTelemetry tracer provider exporting over OTLP\n");
        body.push_str("- Automatic spans for incoming HTTP requests\n");
    }

    body.push_str(
        "\n> Detection and insertion points are heuristic. Review the \
         changes before merging.\n",
    );

    body
}
