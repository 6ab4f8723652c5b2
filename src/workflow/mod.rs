pub mod cancellation;
pub mod post_processor;
pub mod router;
pub mod submission_ctx;

pub use cancellation::{CancellationSignal, PipelineStage};
pub use post_processor::{AudioFeedback, FeedbackPostProcessor, PostProcessOutcome, PostProcessRequest};
pub use router::SubmissionRouter;
pub use submission_ctx::SubmissionCtx;
