mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use grading_orchestrator::models::{Emotion, VoiceProfile};
use grading_orchestrator::{
    AppError, CancellationSignal, FeedbackPostProcessor, PipelineStage, PostProcessRequest,
};
use support::{FakeAudio, FakeText, Fakes};
use tokio_test::{assert_err, assert_ok};

fn post_processor(fakes: &Fakes) -> FeedbackPostProcessor {
    FeedbackPostProcessor::new(fakes.registry())
}

#[tokio::test]
async fn test_source_language_is_identity() {
    let fakes = Fakes::default();

    let outcome = assert_ok!(
        post_processor(&fakes)
            .process(
                PostProcessRequest::new("Good work", "EN"),
                &CancellationSignal::new()
            )
            .await
    );

    assert_eq!(outcome.translated_text, "Good work");
    assert_eq!(outcome.language, "en");
    assert!(outcome.audio.is_none());
    assert_eq!(fakes.text.translate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hindi_translates_then_synthesizes_translation() {
    let fakes = Fakes::default();
    let request = PostProcessRequest::new("Good work", "hi")
        .with_audio("teacher")
        .with_emotion(Some(Emotion::Encouraging));

    let outcome = assert_ok!(
        post_processor(&fakes)
            .process(request, &CancellationSignal::new())
            .await
    );

    assert_eq!(outcome.translated_text, "[hi] Good work");
    assert!(outcome.audio.is_some());
    assert!(outcome.synthesis_error.is_none());
    assert_eq!(fakes.audio.synthesized_texts(), vec!["[hi] Good work"]);

    let synthesized = fakes.audio.synthesized.lock().unwrap();
    assert_eq!(synthesized[0].profile, VoiceProfile::Teacher);
    assert_eq!(synthesized[0].language, "hi");
    assert_eq!(synthesized[0].emotion, Some(Emotion::Encouraging));
}

#[tokio::test]
async fn test_unsupported_language_produces_no_audio() {
    let fakes = Fakes::default();

    let err = assert_err!(
        post_processor(&fakes)
            .process(
                PostProcessRequest::new("Good work", "xx").with_audio("neutral"),
                &CancellationSignal::new()
            )
            .await
    );

    assert!(matches!(err, AppError::UnsupportedLanguage { ref language } if language == "xx"));
    assert!(fakes.audio.synthesized_texts().is_empty());
}

#[tokio::test]
async fn test_translation_failure_is_fatal() {
    let fakes = Fakes {
        text: Arc::new(FakeText {
            fail_translate: true,
            ..Default::default()
        }),
        ..Default::default()
    };

    let err = assert_err!(
        post_processor(&fakes)
            .process(
                PostProcessRequest::new("Good work", "ta").with_audio("friendly"),
                &CancellationSignal::new()
            )
            .await
    );

    assert!(matches!(err, AppError::TranslationFailed { ref language, .. } if language == "ta"));
    assert!(fakes.audio.synthesized_texts().is_empty());
}

#[tokio::test]
async fn test_synthesis_failure_keeps_translation() {
    let fakes = Fakes {
        audio: Arc::new(FakeAudio {
            fail_synthesize: true,
            ..Default::default()
        }),
        ..Default::default()
    };

    let outcome = assert_ok!(
        post_processor(&fakes)
            .process(
                PostProcessRequest::new("Good work", "te").with_audio("teacher"),
                &CancellationSignal::new()
            )
            .await
    );

    assert_eq!(outcome.translated_text, "[te] Good work");
    assert!(outcome.audio.is_none());
    assert!(matches!(
        outcome.synthesis_error,
        Some(AppError::SynthesisFailed { .. })
    ));
}

#[tokio::test]
async fn test_unknown_voice_profile_falls_back_to_neutral() {
    let fakes = Fakes::default();

    assert_ok!(
        post_processor(&fakes)
            .process(
                PostProcessRequest::new("Good work", "en").with_audio("pirate"),
                &CancellationSignal::new()
            )
            .await
    );

    let synthesized = fakes.audio.synthesized.lock().unwrap();
    assert_eq!(synthesized.len(), 1);
    assert_eq!(synthesized[0].profile, VoiceProfile::Neutral);
}

#[tokio::test]
async fn test_cancellation_is_checked_before_translation() {
    let fakes = Fakes::default();
    let cancel = CancellationSignal::new();
    cancel.cancel();

    let err = assert_err!(
        post_processor(&fakes)
            .process(PostProcessRequest::new("Good work", "hi").with_audio("neutral"), &cancel)
            .await
    );

    assert!(matches!(
        err,
        AppError::Cancelled {
            stage: PipelineStage::Translation
        }
    ));
    assert_eq!(fakes.total_calls(), 0);
}

#[tokio::test]
async fn test_cancellation_is_checked_before_synthesis() {
    let fakes = Fakes::default();
    let cancel = CancellationSignal::new();
    cancel.cancel();

    let err = assert_err!(
        post_processor(&fakes)
            .process(PostProcessRequest::new("Good work", "en").with_audio("neutral"), &cancel)
            .await
    );

    assert!(matches!(
        err,
        AppError::Cancelled {
            stage: PipelineStage::Synthesis
        }
    ));
    assert!(fakes.audio.synthesized_texts().is_empty());
}

#[tokio::test]
async fn test_generate_audio_feedback_defaults() {
    let fakes = Fakes::default();

    let feedback = assert_ok!(
        post_processor(&fakes)
            .generate_audio_feedback("Nice job", None, None)
            .await
    );

    assert_eq!(feedback.duration_seconds, 1.5);
    assert!(feedback.audio_path.ends_with("feedback_neutral.mp3"));
    let synthesized = fakes.audio.synthesized.lock().unwrap();
    assert_eq!(synthesized[0].language, "en");
    assert_eq!(synthesized[0].profile, VoiceProfile::Neutral);
}

#[tokio::test]
async fn test_generate_audio_feedback_surfaces_synthesis_failure() {
    let fakes = Fakes {
        audio: Arc::new(FakeAudio {
            fail_synthesize: true,
            ..Default::default()
        }),
        ..Default::default()
    };

    let err = assert_err!(
        post_processor(&fakes)
            .generate_audio_feedback("Nice job", Some("hi"), Some("friendly"))
            .await
    );

    assert!(matches!(err, AppError::SynthesisFailed { .. }));
    assert_eq!(fakes.text.translate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fakes.audio.synthesized_texts(), vec!["[hi] Nice job"]);
}

#[tokio::test]
async fn test_generate_audio_feedback_voices_the_translation() {
    let fakes = Fakes::default();

    let feedback = assert_ok!(
        post_processor(&fakes)
            .generate_audio_feedback("Nice job", Some("HI"), Some("teacher"))
            .await
    );

    assert!(feedback.audio_path.ends_with("feedback_teacher.mp3"));
    assert_eq!(fakes.text.translate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fakes.audio.synthesized_texts(), vec!["[hi] Nice job"]);
    assert_eq!(fakes.audio.synthesized.lock().unwrap()[0].language, "hi");
}

#[tokio::test]
async fn test_generate_audio_feedback_unsupported_language_has_no_audio() {
    let fakes = Fakes::default();

    let err = assert_err!(
        post_processor(&fakes)
            .generate_audio_feedback("Nice job", Some("xx"), None)
            .await
    );

    assert!(matches!(err, AppError::UnsupportedLanguage { ref language } if language == "xx"));
    assert!(fakes.audio.synthesized_texts().is_empty());
}

#[tokio::test]
async fn test_generate_audio_feedback_translation_failure_has_no_audio() {
    let fakes = Fakes {
        text: Arc::new(FakeText {
            fail_translate: true,
            ..Default::default()
        }),
        ..Default::default()
    };

    let err = assert_err!(
        post_processor(&fakes)
            .generate_audio_feedback("Nice job", Some("te"), None)
            .await
    );

    assert!(matches!(err, AppError::TranslationFailed { ref language, .. } if language == "te"));
    assert!(fakes.audio.synthesized_texts().is_empty());
}

#[tokio::test]
async fn test_generate_audio_feedback_source_language_skips_translation() {
    let fakes = Fakes::default();

    assert_ok!(
        post_processor(&fakes)
            .generate_audio_feedback("Nice job", Some("en"), Some("friendly"))
            .await
    );

    assert_eq!(fakes.text.translate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fakes.audio.synthesized_texts(), vec!["Nice job"]);
}
