//! Narrows a requested telemetry mode against what a service already has.
use log::*;

use crate::{CopilotError, Result, generator::types::TelemetryMode};

/// Returns the mode that actually needs generating for `service`.
///
/// `both` narrows to the missing half. A request whose every half is already
/// present is rejected with `AlreadySatisfied` rather than turned into an
/// empty plan; `none` always passes through.
pub fn resolve_mode(
    service: &str,
    requested: TelemetryMode,
    has_metrics: bool,
    has_tracing: bool,
) -> Result<TelemetryMode> {
    let satisfied = || CopilotError::AlreadySatisfied {
        service: service.to_string(),
        mode: requested.to_string(),
    };

    let resolved = match requested {
        TelemetryMode::None => TelemetryMode::None,
        TelemetryMode::Metrics if has_metrics => return Err(satisfied()),
        TelemetryMode::Traces if has_tracing => return Err(satisfied()),
        TelemetryMode::Metrics | TelemetryMode::Traces => requested,
        TelemetryMode::Both => match (has_metrics, has_tracing) {
            (true, true) => return Err(satisfied()),
            (true, false) => TelemetryMode::Traces,
            (false, true) => TelemetryMode::Metrics,
            (false, false) => TelemetryMode::Both,
        },
    };

    if resolved != requested {
        info!("{service}: narrowed requested mode {requested} to {resolved}");
    }

    Ok(resolved)
}
