//! 语音 API 客户端
//!
//! - 语音转写：兼容 OpenAI `/audio/transcriptions` 的 Whisper 服务
//! - 语音合成：ElevenLabs `text-to-speech` 接口

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::models::TranscriptionTask;

/// 合成音频的输出格式（MP3 44.1kHz 128kbps）
pub const TTS_OUTPUT_FORMAT: &str = "mp3_44100_128";
/// 与 `TTS_OUTPUT_FORMAT` 对应的码率（bit/s）
pub const TTS_BITRATE_BPS: f64 = 128_000.0;

/// Whisper verbose_json 响应
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
    /// 后端自动检测到的语言
    pub language: Option<String>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
}

/// 转写片段
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSegment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    /// 片段平均对数概率
    pub avg_logprob: Option<f64>,
    pub no_speech_prob: Option<f64>,
}

/// 可用音色
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceInfo {
    pub voice_id: String,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceInfo>,
}

/// 语音客户端
#[derive(Clone)]
pub struct SpeechClient {
    http: reqwest::Client,
    speech_api_key: String,
    speech_api_base_url: String,
    transcription_model: String,
    tts_api_key: String,
    tts_api_base_url: String,
    tts_model: String,
}

impl SpeechClient {
    /// 创建新的语音客户端
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self {
            http,
            speech_api_key: config.speech_api_key.clone(),
            speech_api_base_url: config.speech_api_base_url.trim_end_matches('/').to_string(),
            transcription_model: config.transcription_model.clone(),
            tts_api_key: config.tts_api_key.clone(),
            tts_api_base_url: config.tts_api_base_url.trim_end_matches('/').to_string(),
            tts_model: config.tts_model.clone(),
        })
    }

    /// 转写音频
    ///
    /// 不指定语言，由后端自动检测
    pub async fn transcribe(
        &self,
        audio: &[u8],
        task: TranscriptionTask,
    ) -> Result<TranscriptionResponse> {
        let endpoint = match task {
            TranscriptionTask::Transcribe => "audio/transcriptions",
            TranscriptionTask::Translate => "audio/translations",
        };
        let url = format!("{}/{}", self.speech_api_base_url, endpoint);
        let (file_name, mime) = sniff_audio_format(audio);

        debug!(
            "调用转写 API: {} ({} 字节, {})",
            url,
            audio.len(),
            mime
        );

        let part = Part::bytes(audio.to_vec())
            .file_name(file_name)
            .mime_str(mime)?;
        let form = Form::new()
            .text("model", self.transcription_model.clone())
            .text("response_format", "verbose_json")
            .part("file", part);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.speech_api_key)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("转写请求失败: {}", url))?
            .error_for_status()
            .with_context(|| format!("转写 API 返回错误: {}", url))?;

        let transcription = response
            .json::<TranscriptionResponse>()
            .await
            .context("无法解析转写响应")?;

        debug!(
            "转写完成: {} 个片段, 语言: {:?}",
            transcription.segments.len(),
            transcription.language
        );

        Ok(transcription)
    }

    /// 合成语音，返回 MP3 字节
    pub async fn synthesize(&self, voice_id: &str, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/text-to-speech/{}?output_format={}",
            self.tts_api_base_url, voice_id, TTS_OUTPUT_FORMAT
        );

        debug!("调用合成 API: 音色 {}, 文本长度 {}", voice_id, text.len());

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.tts_api_key)
            .json(&json!({
                "text": text,
                "model_id": self.tts_model,
            }))
            .send()
            .await
            .with_context(|| format!("合成请求失败: 音色 {}", voice_id))?
            .error_for_status()
            .with_context(|| format!("合成 API 返回错误: 音色 {}", voice_id))?;

        let bytes = response.bytes().await.context("无法读取合成音频")?;
        if bytes.is_empty() {
            anyhow::bail!("合成 API 返回空音频");
        }

        Ok(bytes.to_vec())
    }

    /// 列出可用音色
    pub async fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        let url = format!("{}/voices", self.tts_api_base_url);

        let response = self
            .http
            .get(&url)
            .header("xi-api-key", &self.tts_api_key)
            .send()
            .await
            .context("获取音色列表失败")?
            .error_for_status()
            .context("音色列表 API 返回错误")?;

        let voices = response
            .json::<VoicesResponse>()
            .await
            .context("无法解析音色列表")?;

        Ok(voices.voices)
    }
}

/// 根据文件头猜测音频格式，返回 (文件名, MIME)
pub fn sniff_audio_format(bytes: &[u8]) -> (&'static str, &'static str) {
    if bytes.starts_with(b"RIFF") {
        ("audio.wav", "audio/wav")
    } else if bytes.starts_with(b"ID3") || bytes.starts_with(&[0xFF, 0xFB]) {
        ("audio.mp3", "audio/mpeg")
    } else if bytes.starts_with(b"OggS") {
        ("audio.ogg", "audio/ogg")
    } else if bytes.starts_with(b"fLaC") {
        ("audio.flac", "audio/flac")
    } else {
        ("audio.wav", "audio/wav")
    }
}
