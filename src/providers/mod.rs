//! 能力提供方契约
//!
//! 四种能力各自一个 trait，具体实现位于 `services/`。
//! 所有实现都必须 `Send + Sync`，注册表通过 `Arc` 在并发请求之间共享它们；
//! 单次调用之间不保留状态（构造时获得的客户端句柄除外）。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{
    AudioArtifact, CapabilityKind, EvaluationResult, RecognitionResult, StructuredExplanation,
    SynthesisRequest, TranscriptionTask,
};

/// provider 边界上的结果类型
pub type ProviderResult<T> = Result<T, ProviderError>;

/// 文本评估（含翻译和解释）
#[async_trait]
pub trait TextEvaluation: Send + Sync {
    /// 评估一段文本作答
    async fn evaluate(&self, text: &str, subject: Option<&str>) -> ProviderResult<EvaluationResult>;

    /// 翻译反馈，目标语言不在支持列表时返回 `UnsupportedLanguage`
    async fn translate(&self, text: &str, target_language: &str) -> ProviderResult<String>;

    /// 尽力而为的解释，内部失败返回 None
    async fn explain(&self, text: &str, feedback: &str) -> Option<StructuredExplanation>;

    /// 是否支持该自然语言
    fn supports_language(&self, language: &str) -> bool;

    /// 轻量存活探测
    async fn probe(&self) -> ProviderResult<()>;
}

/// 代码评估
#[async_trait]
pub trait CodeEvaluation: Send + Sync {
    async fn evaluate(&self, code: &str, language: Option<&str>) -> ProviderResult<EvaluationResult>;

    /// 根据反馈生成示例代码片段，失败返回 None
    async fn explain(&self, feedback: &str, language: Option<&str>) -> Option<StructuredExplanation>;

    /// 是否支持该编程语言
    fn supports_language(&self, language: &str) -> bool;

    async fn probe(&self) -> ProviderResult<()>;
}

/// 手写识别
#[async_trait]
pub trait HandwritingRecognition: Send + Sync {
    async fn recognize(&self, image: &[u8], subject: Option<&str>) -> ProviderResult<RecognitionResult>;

    async fn probe(&self) -> ProviderResult<()>;
}

/// 语音转写与合成
#[async_trait]
pub trait AudioProcessing: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        task: Option<TranscriptionTask>,
    ) -> ProviderResult<RecognitionResult>;

    async fn synthesize(&self, request: &SynthesisRequest) -> ProviderResult<AudioArtifact>;

    async fn probe(&self) -> ProviderResult<()>;
}

/// 注册表中的 provider 句柄（封闭集合）
#[derive(Clone)]
pub enum Provider {
    Text(Arc<dyn TextEvaluation>),
    Code(Arc<dyn CodeEvaluation>),
    Handwriting(Arc<dyn HandwritingRecognition>),
    Audio(Arc<dyn AudioProcessing>),
}

impl Provider {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Provider::Text(_) => CapabilityKind::Text,
            Provider::Code(_) => CapabilityKind::Code,
            Provider::Handwriting(_) => CapabilityKind::Handwriting,
            Provider::Audio(_) => CapabilityKind::Audio,
        }
    }

    pub async fn probe(&self) -> ProviderResult<()> {
        match self {
            Provider::Text(p) => p.probe().await,
            Provider::Code(p) => p.probe().await,
            Provider::Handwriting(p) => p.probe().await,
            Provider::Audio(p) => p.probe().await,
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Provider({})", self.kind())
    }
}
