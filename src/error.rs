use std::fmt;

use thiserror::Error;

use crate::models::{CapabilityKind, SubmissionKind};
use crate::workflow::PipelineStage;

/// 编排核心错误类型
///
/// 调用方只会拿到一个结构化错误，它指明失败的阶段和能力。
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求了未注册的能力
    #[error("未知的能力类型: {name}")]
    UnknownCapability { name: String },

    /// 注册表初始化失败（列出所有失败的能力）
    #[error("服务初始化失败: {}", InitializationFailure::join(.failures))]
    InitializationError { failures: Vec<InitializationFailure> },

    /// 不支持的提交类型
    #[error("不支持的提交类型: {kind}")]
    UnsupportedSubmissionKind { kind: String },

    /// 识别阶段失败（OCR / 语音转写）
    #[error("识别失败 ({kind}): {source}")]
    RecognitionFailed {
        kind: SubmissionKind,
        #[source]
        source: ProviderError,
    },

    /// 评估阶段失败
    #[error("评估失败 ({kind}): {source}")]
    EvaluationFailed {
        kind: SubmissionKind,
        #[source]
        source: ProviderError,
    },

    /// 不支持的语言
    #[error("不支持的语言: {language}")]
    UnsupportedLanguage { language: String },

    /// 翻译失败
    #[error("翻译到 {language} 失败: {source}")]
    TranslationFailed {
        language: String,
        #[source]
        source: ProviderError,
    },

    /// 语音合成失败（不影响文字反馈）
    #[error("语音合成失败: {source}")]
    SynthesisFailed {
        #[source]
        source: ProviderError,
    },

    /// 流程在阶段边界被取消
    #[error("流程已取消 (阶段: {stage})")]
    Cancelled { stage: PipelineStage },
}

/// 单个能力的初始化失败信息
#[derive(Debug)]
pub struct InitializationFailure {
    pub kind: CapabilityKind,
    pub cause: ProviderError,
}

impl InitializationFailure {
    fn join(failures: &[InitializationFailure]) -> String {
        failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for InitializationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.cause)
    }
}

/// 能力提供方边界上的错误
///
/// 后端异常（模型加载失败、返回格式错误等）在 provider 边界统一转换为此类型，
/// 不会把原始后端错误泄露给路由层。
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// 后端调用失败
    #[error("后端 {backend} 调用失败: {message}")]
    Backend { backend: String, message: String },

    /// 后端返回内容无法解析
    #[error("后端 {backend} 返回格式错误: {detail}")]
    MalformedResponse { backend: String, detail: String },

    /// provider 不支持该语言
    #[error("不支持的语言: {language}")]
    UnsupportedLanguage { language: String },

    /// 输入不合法
    #[error("输入不合法: {0}")]
    InvalidInput(String),

    /// provider 不可用（初始化失败、未配置等）
    #[error("服务不可用: {0}")]
    Unavailable(String),
}

// ========== 便捷构造函数 ==========

impl ProviderError {
    /// 从 anyhow 错误创建后端调用错误（保留完整错误链）
    pub fn backend(backend: impl Into<String>, err: anyhow::Error) -> Self {
        ProviderError::Backend {
            backend: backend.into(),
            message: format!("{:#}", err),
        }
    }

    /// 创建返回格式错误
    pub fn malformed(backend: impl Into<String>, detail: impl Into<String>) -> Self {
        ProviderError::MalformedResponse {
            backend: backend.into(),
            detail: detail.into(),
        }
    }

    /// 创建不支持语言错误
    pub fn unsupported_language(language: impl Into<String>) -> Self {
        ProviderError::UnsupportedLanguage {
            language: language.into(),
        }
    }
}

impl AppError {
    /// 创建未知能力错误
    pub fn unknown_capability(name: impl Into<String>) -> Self {
        AppError::UnknownCapability { name: name.into() }
    }

    /// 创建不支持的提交类型错误
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        AppError::UnsupportedSubmissionKind { kind: kind.into() }
    }

    /// 创建不支持的语言错误
    pub fn unsupported_language(language: impl Into<String>) -> Self {
        AppError::UnsupportedLanguage {
            language: language.into(),
        }
    }

    /// 包装评估阶段错误
    ///
    /// provider 报告的语言不支持会直接提升为 `UnsupportedLanguage`
    pub fn evaluation_failed(kind: SubmissionKind, source: ProviderError) -> Self {
        match source {
            ProviderError::UnsupportedLanguage { language } => {
                AppError::UnsupportedLanguage { language }
            }
            source => AppError::EvaluationFailed { kind, source },
        }
    }

    /// 包装翻译阶段错误
    pub fn translation_failed(language: impl Into<String>, source: ProviderError) -> Self {
        match source {
            ProviderError::UnsupportedLanguage { language } => {
                AppError::UnsupportedLanguage { language }
            }
            source => AppError::TranslationFailed {
                language: language.into(),
                source,
            },
        }
    }

    /// 失败所在的阶段（用于日志）
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            AppError::UnsupportedSubmissionKind { .. } => Some(PipelineStage::Validation),
            AppError::RecognitionFailed { .. } => Some(PipelineStage::Recognition),
            AppError::EvaluationFailed { .. } => Some(PipelineStage::Evaluation),
            AppError::TranslationFailed { .. } => Some(PipelineStage::Translation),
            AppError::SynthesisFailed { .. } => Some(PipelineStage::Synthesis),
            AppError::Cancelled { stage } => Some(*stage),
            AppError::UnknownCapability { .. }
            | AppError::InitializationError { .. }
            | AppError::UnsupportedLanguage { .. } => None,
        }
    }
}

// ========== Result 类型别名 ==========

/// 编排核心结果类型
pub type AppResult<T> = Result<T, AppError>;
