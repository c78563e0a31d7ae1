//! Applies a plan JSON file to a working tree.
use log::*;
use std::path::{Path, PathBuf};

use crate::{
    Result,
    applier::{self, EditOutcome},
    command::common,
    generator::InstrumentationPlan,
};

pub async fn execute(path: PathBuf, plan: PathBuf) -> Result<()> {
    let plan: InstrumentationPlan = common::read_json(&plan).await?;
    let report = applier::apply(Path::new(&path), &plan)?;

    let fallbacks = report.count(EditOutcome::AnchorFallback);
    if fallbacks > 0 {
        warn!("{fallbacks} edits were appended because their anchor was missing");
    }

    if !report.changed() {
        info!("plan already applied: nothing changed");
    }

    common::write_json(&report, None).await
}
