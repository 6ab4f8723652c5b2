//! 反馈后处理 - 流程层
//!
//! 把评估得到的反馈翻译成目标语言，并可选地合成为语音。
//!
//! - 目标语言与源语言相同：原样返回，不调用翻译
//! - 翻译失败是致命的
//! - 合成失败不影响已经得到的译文，错误随结果一起返回

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::ServiceRegistry;
use crate::models::{AudioArtifact, Emotion, SynthesisRequest, VoiceProfile};
use crate::workflow::cancellation::{CancellationSignal, PipelineStage};

/// 后处理请求
#[derive(Debug, Clone)]
pub struct PostProcessRequest {
    pub feedback_text: String,
    pub target_language: String,
    /// 未知音色静默回退到 neutral
    pub voice_profile: String,
    pub synthesize_audio: bool,
    pub emotion: Option<Emotion>,
}

impl PostProcessRequest {
    pub fn new(feedback_text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            feedback_text: feedback_text.into(),
            target_language: target_language.into(),
            voice_profile: VoiceProfile::Neutral.as_str().to_string(),
            synthesize_audio: false,
            emotion: None,
        }
    }

    pub fn with_audio(mut self, voice_profile: impl Into<String>) -> Self {
        self.voice_profile = voice_profile.into();
        self.synthesize_audio = true;
        self
    }

    pub fn with_emotion(mut self, emotion: Option<Emotion>) -> Self {
        self.emotion = emotion;
        self
    }
}

/// 后处理结果
#[derive(Debug)]
pub struct PostProcessOutcome {
    pub translated_text: String,
    pub language: String,
    pub audio: Option<AudioArtifact>,
    /// 合成失败时的错误（译文仍然有效）
    pub synthesis_error: Option<AppError>,
}

/// 单独生成语音反馈的结果
#[derive(Debug, Clone)]
pub struct AudioFeedback {
    pub audio_path: String,
    pub duration_seconds: f64,
    pub metadata: BTreeMap<String, JsonValue>,
}

impl From<AudioArtifact> for AudioFeedback {
    fn from(artifact: AudioArtifact) -> Self {
        Self {
            audio_path: artifact.locator_path,
            duration_seconds: artifact.duration_seconds,
            metadata: artifact.metadata,
        }
    }
}

/// 反馈后处理器
pub struct FeedbackPostProcessor {
    registry: Arc<ServiceRegistry>,
    source_language: String,
}

impl FeedbackPostProcessor {
    /// 源语言默认为 "en"
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self::with_source_language(registry, "en")
    }

    pub fn with_config(registry: Arc<ServiceRegistry>, config: &Config) -> Self {
        Self::with_source_language(registry, &config.source_language)
    }

    pub fn with_source_language(registry: Arc<ServiceRegistry>, source_language: &str) -> Self {
        Self {
            registry,
            source_language: source_language.trim().to_ascii_lowercase(),
        }
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    /// 翻译反馈并按需合成语音
    pub async fn process(
        &self,
        request: PostProcessRequest,
        cancel: &CancellationSignal,
    ) -> AppResult<PostProcessOutcome> {
        let language = request.target_language.trim().to_ascii_lowercase();

        // ========== 阶段 1: 翻译 ==========
        if language != self.source_language {
            cancel.check(PipelineStage::Translation)?;
        }
        let translated_text = self.translate(request.feedback_text, &language).await?;

        if !request.synthesize_audio {
            return Ok(PostProcessOutcome {
                translated_text,
                language,
                audio: None,
                synthesis_error: None,
            });
        }

        // ========== 阶段 2: 语音合成（尽力而为） ==========
        cancel.check(PipelineStage::Synthesis)?;

        let synthesis = SynthesisRequest::new(
            translated_text.clone(),
            VoiceProfile::parse_or_neutral(&request.voice_profile),
            language.clone(),
        )
        .with_emotion(request.emotion);

        let (audio, synthesis_error) = match self.synthesize(&synthesis).await {
            Ok(artifact) => (Some(artifact), None),
            Err(e) => {
                warn!("⚠️ 语音合成失败，仅返回文字反馈: {}", e);
                (None, Some(e))
            }
        };

        Ok(PostProcessOutcome {
            translated_text,
            language,
            audio,
            synthesis_error,
        })
    }

    /// 把反馈翻译到目标语言后合成为语音
    ///
    /// 语言默认 "en"，音色默认 neutral；翻译失败或不支持的语言直接返回错误，不生成音频
    pub async fn generate_audio_feedback(
        &self,
        text: &str,
        language: Option<&str>,
        voice_profile: Option<&str>,
    ) -> AppResult<AudioFeedback> {
        let language = language.unwrap_or("en").trim().to_ascii_lowercase();
        let translated_text = self.translate(text.to_string(), &language).await?;

        let request = SynthesisRequest::new(
            translated_text,
            voice_profile
                .map(VoiceProfile::parse_or_neutral)
                .unwrap_or_default(),
            language,
        );

        self.synthesize(&request).await.map(AudioFeedback::from)
    }

    /// 目标语言与源语言相同时原样返回
    async fn translate(&self, text: String, language: &str) -> AppResult<String> {
        if language == self.source_language {
            return Ok(text);
        }

        info!("🌐 正在翻译反馈到 {}...", language);
        self.registry
            .text()?
            .translate(&text, language)
            .await
            .map_err(|source| {
                warn!("⚠️ 翻译到 {} 失败: {}", language, source);
                AppError::translation_failed(language, source)
            })
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> AppResult<AudioArtifact> {
        let artifact = self
            .registry
            .audio()?
            .synthesize(request)
            .await
            .map_err(|source| AppError::SynthesisFailed { source })?;

        info!(
            "🔊 语音反馈已生成: {} ({:.1} 秒, 音色 {})",
            artifact.locator_path, artifact.duration_seconds, request.profile
        );
        Ok(artifact)
    }
}
