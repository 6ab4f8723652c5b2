//! 语音相关类型：音色、语气、合成请求和音频产物

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 音色档案（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceProfile {
    /// 专业、权威
    Teacher,
    /// 温暖、鼓励
    Friendly,
    /// 清晰、中性
    #[default]
    Neutral,
}

impl VoiceProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            VoiceProfile::Teacher => "teacher",
            VoiceProfile::Friendly => "friendly",
            VoiceProfile::Neutral => "neutral",
        }
    }

    /// 解析音色，未知值静默回退到 neutral
    pub fn parse_or_neutral(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "teacher" => VoiceProfile::Teacher,
            "friendly" => VoiceProfile::Friendly,
            _ => VoiceProfile::Neutral,
        }
    }
}

impl fmt::Display for VoiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 合成语气
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Encouraging,
    Professional,
    Friendly,
    Concerned,
}

impl Emotion {
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Encouraging => "encouraging",
            Emotion::Professional => "professional",
            Emotion::Friendly => "friendly",
            Emotion::Concerned => "concerned",
        }
    }

    /// 前置到合成文本中的语气标记
    pub fn marker(self) -> &'static str {
        match self {
            Emotion::Encouraging => "[Encouraging tone] ",
            Emotion::Professional => "[Professional tone] ",
            Emotion::Friendly => "[Friendly tone] ",
            Emotion::Concerned => "[Concerned tone] ",
        }
    }

    /// 未知语气返回 None（不加标记）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "encouraging" => Some(Emotion::Encouraging),
            "professional" => Some(Emotion::Professional),
            "friendly" => Some(Emotion::Friendly),
            "concerned" => Some(Emotion::Concerned),
            _ => None,
        }
    }
}

/// 转写任务
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionTask {
    /// 原语言转写
    #[default]
    Transcribe,
    /// 转写并翻译为英文
    Translate,
}

impl TranscriptionTask {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptionTask::Transcribe => "transcribe",
            TranscriptionTask::Translate => "translate",
        }
    }
}

/// 语音合成请求
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub profile: VoiceProfile,
    pub language: String,
    pub emotion: Option<Emotion>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, profile: VoiceProfile, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            profile,
            language: language.into(),
            emotion: None,
        }
    }

    pub fn with_emotion(mut self, emotion: Option<Emotion>) -> Self {
        self.emotion = emotion;
        self
    }
}

/// 合成得到的音频产物（路由不会再消费它）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub locator_path: String,
    pub duration_seconds: f64,
    pub voice_id: String,
    pub metadata: BTreeMap<String, JsonValue>,
}
