//! Renders the deployment toggle spec for a service.
use crate::{
    Result,
    generator::{TelemetryMode, render_toggle_spec},
};

pub fn execute(service: &str, mode: TelemetryMode) -> Result<()> {
    let spec = render_toggle_spec(service, mode)?;
    print!("{spec}");
    Ok(())
}
