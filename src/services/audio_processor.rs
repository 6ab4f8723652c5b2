//! 语音服务 - 业务能力层
//!
//! 转写走 Whisper 兼容接口，合成走 ElevenLabs；合成结果写入 [`AudioCache`]。

use async_trait::async_trait;
use chrono::Local;
use serde_json::json;
use tracing::{debug, info};

use crate::clients::{speech_client::TTS_BITRATE_BPS, SpeechClient, TranscriptionResponse, VoiceInfo};
use crate::config::Config;
use crate::error::ProviderError;
use crate::models::{
    normalize_confidence, AudioArtifact, Emotion, RecognitionResult, SynthesisRequest,
    TranscriptionTask, VoiceProfile,
};
use crate::providers::{AudioProcessing, ProviderResult};
use crate::services::audio_cache::AudioCache;

const TRANSCRIPTION_BACKEND: &str = "speech-to-text";
const SYNTHESIS_BACKEND: &str = "text-to-speech";

/// 没有片段概率时使用的转写置信度
const DEFAULT_TRANSCRIPTION_CONFIDENCE: f64 = 0.5;

/// 音色档案对应的 ElevenLabs 音色
pub fn voice_id_for(profile: VoiceProfile) -> &'static str {
    match profile {
        // Antoni
        VoiceProfile::Teacher => "ErXwobaYiN019PkySvjV",
        // Bella
        VoiceProfile::Friendly => "EXAVITQu4vr4xnSDxMaL",
        // Sam
        VoiceProfile::Neutral => "yoZ06aMxZJJ28mfd3POQ",
    }
}

/// 生成实际送去合成的文本
///
/// 先加语气标记，再加语言标记，因此语言标记在最前面
pub fn prepare_text_for_tts(
    text: &str,
    language: &str,
    emotion: Option<Emotion>,
    source_language: &str,
) -> String {
    let mut prepared = text.trim().to_string();

    if let Some(emotion) = emotion {
        prepared = format!("{}{}", emotion.marker(), prepared);
    }

    if !language.eq_ignore_ascii_case(source_language) {
        prepared = format!("[{}] {}", language.to_ascii_uppercase(), prepared);
    }

    prepared
}

/// 由片段平均对数概率估计转写置信度
fn transcription_confidence(response: &TranscriptionResponse) -> f64 {
    let probabilities: Vec<f64> = response
        .segments
        .iter()
        .filter_map(|s| s.avg_logprob)
        .map(f64::exp)
        .collect();

    if probabilities.is_empty() {
        return DEFAULT_TRANSCRIPTION_CONFIDENCE;
    }

    normalize_confidence(probabilities.iter().sum::<f64>() / probabilities.len() as f64)
}

/// 语音服务
pub struct AudioProcessor {
    speech: SpeechClient,
    cache: AudioCache,
    source_language: String,
}

impl AudioProcessor {
    /// 创建语音服务
    ///
    /// 转写和合成任一 key 缺失，或缓存目录无法创建，都视为初始化失败
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        if config.speech_api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable("未配置 SPEECH_API_KEY".to_string()));
        }
        if config.tts_api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable(
                "未配置 ELEVEN_LABS_API_KEY".to_string(),
            ));
        }

        let speech = SpeechClient::new(config)
            .map_err(|e| ProviderError::Unavailable(format!("{:#}", e)))?;
        let cache = AudioCache::new(&config.audio_cache_dir)
            .map_err(|e| ProviderError::Unavailable(format!("{:#}", e)))?;

        Ok(Self {
            speech,
            cache,
            source_language: config.source_language.to_ascii_lowercase(),
        })
    }

    /// 列出后端可用音色
    pub async fn available_voices(&self) -> ProviderResult<Vec<VoiceInfo>> {
        self.speech
            .list_voices()
            .await
            .map_err(|e| ProviderError::backend(SYNTHESIS_BACKEND, e))
    }

    /// 清理过期的合成音频，返回删除数量
    pub async fn clean_cache(&self, max_age_hours: u64) -> anyhow::Result<usize> {
        let removed = self.cache.clean(max_age_hours).await?;
        if removed > 0 {
            info!("🧹 清理了 {} 个过期音频文件", removed);
        }
        Ok(removed)
    }
}

#[async_trait]
impl AudioProcessing for AudioProcessor {
    async fn transcribe(
        &self,
        audio: &[u8],
        task: Option<TranscriptionTask>,
    ) -> ProviderResult<RecognitionResult> {
        if audio.is_empty() {
            return Err(ProviderError::InvalidInput("音频为空".to_string()));
        }

        let task = task.unwrap_or_default();
        let response = self
            .speech
            .transcribe(audio, task)
            .await
            .map_err(|e| ProviderError::backend(TRANSCRIPTION_BACKEND, e))?;

        let confidence = transcription_confidence(&response);
        let mut result = RecognitionResult::new(response.text.trim(), confidence)
            .with_auxiliary("task", task.as_str())
            .with_auxiliary("segment_count", response.segments.len());
        if let Some(language) = &response.language {
            result = result.with_auxiliary("language", language.as_str());
        }
        if let Some(duration) = response.duration {
            result = result.with_auxiliary("duration", duration);
        }

        debug!("转写完成，置信度 {:.2}", result.confidence);
        Ok(result)
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> ProviderResult<AudioArtifact> {
        if request.text.trim().is_empty() {
            return Err(ProviderError::InvalidInput("合成文本为空".to_string()));
        }

        let prepared = prepare_text_for_tts(
            &request.text,
            &request.language,
            request.emotion,
            &self.source_language,
        );
        let voice_id = voice_id_for(request.profile);

        let audio = self
            .speech
            .synthesize(voice_id, &prepared)
            .await
            .map_err(|e| ProviderError::backend(SYNTHESIS_BACKEND, e))?;

        let path = self
            .cache
            .store(&prepared, request.profile, &audio)
            .await
            .map_err(|e| ProviderError::backend(SYNTHESIS_BACKEND, e))?;

        let duration_seconds = audio.len() as f64 * 8.0 / TTS_BITRATE_BPS;

        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("language".to_string(), json!(request.language));
        metadata.insert("voice_type".to_string(), json!(request.profile.as_str()));
        metadata.insert(
            "emotion".to_string(),
            json!(request.emotion.map(Emotion::as_str)),
        );
        metadata.insert("text_length".to_string(), json!(request.text.chars().count()));
        metadata.insert("timestamp".to_string(), json!(Local::now().to_rfc3339()));

        Ok(AudioArtifact {
            locator_path: path.to_string_lossy().into_owned(),
            duration_seconds,
            voice_id: voice_id.to_string(),
            metadata,
        })
    }

    async fn probe(&self) -> ProviderResult<()> {
        self.available_voices().await.map(|_| ())
    }
}
