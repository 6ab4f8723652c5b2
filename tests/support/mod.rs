//! 集成测试用的假 provider
//!
//! 每个假实现都记录调用次数，并可以配置为失败

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use grading_orchestrator::models::{SynthesisRequest, TranscriptionTask};
use grading_orchestrator::{
    AudioArtifact, CancellationSignal, AudioProcessing, CapabilityKind, CodeEvaluation, EvaluationResult,
    HandwritingRecognition, Provider, ProviderError, ProviderResult, RecognitionResult,
    ServiceRegistry, StructuredExplanation, TextEvaluation,
};

fn backend_error(what: &str) -> ProviderError {
    ProviderError::Backend {
        backend: "fake".to_string(),
        message: format!("{} 失败", what),
    }
}

// ========== 文本 ==========

pub struct FakeText {
    pub score: f64,
    pub fail_evaluate: bool,
    pub fail_translate: bool,
    pub fail_probe: bool,
    /// 预置的 metrics，用于验证识别置信度不会覆盖评估器的值
    pub preset_metrics: BTreeMap<String, f64>,
    pub evaluate_calls: AtomicUsize,
    pub translate_calls: AtomicUsize,
    pub explain_calls: AtomicUsize,
    pub evaluated_texts: Mutex<Vec<String>>,
}

impl Default for FakeText {
    fn default() -> Self {
        Self {
            score: 80.0,
            fail_evaluate: false,
            fail_translate: false,
            fail_probe: false,
            preset_metrics: BTreeMap::new(),
            evaluate_calls: AtomicUsize::new(0),
            translate_calls: AtomicUsize::new(0),
            explain_calls: AtomicUsize::new(0),
            evaluated_texts: Mutex::new(Vec::new()),
        }
    }
}

impl FakeText {
    pub fn calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
            + self.translate_calls.load(Ordering::SeqCst)
            + self.explain_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextEvaluation for FakeText {
    async fn evaluate(&self, text: &str, _subject: Option<&str>) -> ProviderResult<EvaluationResult> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        self.evaluated_texts.lock().unwrap().push(text.to_string());
        if self.fail_evaluate {
            return Err(backend_error("evaluate"));
        }

        // 直接写字段，绕过构造函数里的截断
        Ok(EvaluationResult {
            score: self.score,
            narrative: format!("Feedback for: {}", text),
            metrics: self.preset_metrics.clone(),
            ..Default::default()
        })
    }

    async fn translate(&self, text: &str, target_language: &str) -> ProviderResult<String> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        if !["ta", "hi", "te"].contains(&target_language) {
            return Err(ProviderError::unsupported_language(target_language));
        }
        if self.fail_translate {
            return Err(backend_error("translate"));
        }
        Ok(format!("[{}] {}", target_language, text))
    }

    async fn explain(&self, text: &str, _feedback: &str) -> Option<StructuredExplanation> {
        self.explain_calls.fetch_add(1, Ordering::SeqCst);
        Some(StructuredExplanation {
            important_phrases: vec![text.split_whitespace().next()?.to_string()],
            impact_scores: vec![0.5],
            code_snippets: Vec::new(),
        })
    }

    fn supports_language(&self, language: &str) -> bool {
        ["en", "ta", "hi", "te"].contains(&language)
    }

    async fn probe(&self) -> ProviderResult<()> {
        if self.fail_probe {
            return Err(ProviderError::Unavailable("probe 失败".to_string()));
        }
        Ok(())
    }
}

// ========== 代码 ==========

pub struct FakeCode {
    pub score: f64,
    pub fail_evaluate: bool,
    pub evaluate_calls: AtomicUsize,
}

impl Default for FakeCode {
    fn default() -> Self {
        Self {
            score: 74.0,
            fail_evaluate: false,
            evaluate_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeCode {
    pub fn calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeEvaluation for FakeCode {
    async fn evaluate(&self, code: &str, _language: Option<&str>) -> ProviderResult<EvaluationResult> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_evaluate {
            return Err(backend_error("code evaluate"));
        }
        Ok(EvaluationResult::new(self.score, format!("{} lines", code.lines().count()))
            .with_metric("complexity", 0.8))
    }

    async fn explain(&self, _feedback: &str, _language: Option<&str>) -> Option<StructuredExplanation> {
        None
    }

    fn supports_language(&self, language: &str) -> bool {
        !language.trim().is_empty()
    }

    async fn probe(&self) -> ProviderResult<()> {
        Ok(())
    }
}

// ========== 手写 ==========

pub struct FakeHandwriting {
    pub text: String,
    pub confidence: f64,
    pub fail_recognize: bool,
    /// 识别进行中触发取消
    pub cancel_on_recognize: Option<CancellationSignal>,
    pub recognize_calls: AtomicUsize,
}

impl Default for FakeHandwriting {
    fn default() -> Self {
        Self {
            text: "2 × 3 = 6".to_string(),
            confidence: 0.87,
            fail_recognize: false,
            cancel_on_recognize: None,
            recognize_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeHandwriting {
    pub fn calls(&self) -> usize {
        self.recognize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HandwritingRecognition for FakeHandwriting {
    async fn recognize(&self, _image: &[u8], _subject: Option<&str>) -> ProviderResult<RecognitionResult> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(cancel) = &self.cancel_on_recognize {
            cancel.cancel();
        }
        if self.fail_recognize {
            return Err(ProviderError::InvalidInput("无法解码图片".to_string()));
        }
        Ok(RecognitionResult::new(self.text.clone(), self.confidence))
    }

    async fn probe(&self) -> ProviderResult<()> {
        Ok(())
    }
}

// ========== 语音 ==========

pub struct FakeAudio {
    pub transcript: String,
    pub confidence: f64,
    pub fail_transcribe: bool,
    pub fail_synthesize: bool,
    pub panic_in_probe: bool,
    pub transcribe_calls: AtomicUsize,
    pub last_task: Mutex<Option<TranscriptionTask>>,
    pub synthesized: Mutex<Vec<SynthesisRequest>>,
}

impl Default for FakeAudio {
    fn default() -> Self {
        Self {
            transcript: "photosynthesis makes sugar".to_string(),
            confidence: 0.92,
            fail_transcribe: false,
            fail_synthesize: false,
            panic_in_probe: false,
            transcribe_calls: AtomicUsize::new(0),
            last_task: Mutex::new(None),
            synthesized: Mutex::new(Vec::new()),
        }
    }
}

impl FakeAudio {
    pub fn calls(&self) -> usize {
        self.transcribe_calls.load(Ordering::SeqCst) + self.synthesized.lock().unwrap().len()
    }

    pub fn synthesized_texts(&self) -> Vec<String> {
        self.synthesized
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }
}

#[async_trait]
impl AudioProcessing for FakeAudio {
    async fn transcribe(
        &self,
        _audio: &[u8],
        task: Option<TranscriptionTask>,
    ) -> ProviderResult<RecognitionResult> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_task.lock().unwrap() = task;
        if self.fail_transcribe {
            return Err(backend_error("transcribe"));
        }
        Ok(RecognitionResult::new(self.transcript.clone(), self.confidence)
            .with_auxiliary("language", "en"))
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> ProviderResult<AudioArtifact> {
        self.synthesized.lock().unwrap().push(request.clone());
        if self.fail_synthesize {
            return Err(backend_error("synthesize"));
        }
        Ok(AudioArtifact {
            locator_path: format!("audio_cache/feedback_{}.mp3", request.profile),
            duration_seconds: 1.5,
            voice_id: format!("voice-{}", request.profile),
            metadata: BTreeMap::new(),
        })
    }

    async fn probe(&self) -> ProviderResult<()> {
        if self.panic_in_probe {
            panic!("音频后端崩溃");
        }
        Ok(())
    }
}

// ========== 注册表 ==========

/// 一组可检查的假 provider
#[derive(Default, Clone)]
pub struct Fakes {
    pub text: Arc<FakeText>,
    pub code: Arc<FakeCode>,
    pub handwriting: Arc<FakeHandwriting>,
    pub audio: Arc<FakeAudio>,
}

impl Fakes {
    pub fn registry(&self) -> Arc<ServiceRegistry> {
        let text = self.text.clone();
        let code = self.code.clone();
        let handwriting = self.handwriting.clone();
        let audio = self.audio.clone();

        let registry = ServiceRegistry::builder()
            .register(CapabilityKind::Text, move || Ok(Provider::Text(text)))
            .register(CapabilityKind::Code, move || Ok(Provider::Code(code)))
            .register(CapabilityKind::Handwriting, move || {
                Ok(Provider::Handwriting(handwriting))
            })
            .register(CapabilityKind::Audio, move || Ok(Provider::Audio(audio)))
            .build()
            .expect("假 provider 注册表构建失败");

        Arc::new(registry)
    }

    /// 所有 provider 的调用总数
    pub fn total_calls(&self) -> usize {
        self.text.calls() + self.code.calls() + self.handwriting.calls() + self.audio.calls()
    }
}
