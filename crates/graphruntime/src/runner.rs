use graphcore::{PartialUpdate, Step, StepContext, StepError};
use std::sync::Arc;

/// Runs one step invocation against the snapshot in its context.
///
/// Cancellation is observed cooperatively: when the context's token
/// fires before the step finishes, the runner stops waiting and
/// reports `Cancelled`. The underlying future is dropped, not
/// interrupted mid-I/O, which is the strongest guarantee available
/// without step cooperation.
pub async fn run_step(step: Arc<dyn Step>, ctx: StepContext) -> Result<PartialUpdate, StepError> {
    let token = ctx.cancellation.clone();
    tokio::select! {
        _ = token.cancelled() => Err(StepError::Cancelled),
        result = step.run(ctx) => result,
    }
}
