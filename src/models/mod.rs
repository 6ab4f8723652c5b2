pub mod audio;
pub mod capability;
pub mod evaluation;
pub mod loaders;
pub mod subject;
pub mod submission;

pub use audio::{AudioArtifact, Emotion, SynthesisRequest, TranscriptionTask, VoiceProfile};
pub use capability::{CapabilityKind, ServiceHealth};
pub use evaluation::{
    normalize_confidence, normalize_score, CodeSnippet, EvaluationResult, RecognitionProvenance,
    RecognitionResult, StructuredExplanation, RECOGNITION_CONFIDENCE_METRIC,
};
pub use loaders::{load_submission_manifest, ManifestEntry, SubmissionManifest};
pub use subject::Subject;
pub use submission::{Payload, Submission, SubmissionKind, SubmissionOptions};
