use crate::{
    Result,
    generator::{GenerationContext, types::PlanBuilder},
};

/// Language-specific edit producer.
///
/// Each method appends its whole group (dependency addition, new module,
/// entry point wiring) to `plan`, in that order.
pub trait InstrumentationGenerator {
    fn metrics_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()>;

    fn tracing_edits(
        &self,
        context: &GenerationContext,
        plan: &mut PlanBuilder,
    ) -> Result<()>;
}
