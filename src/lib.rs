//! # Grading Orchestrator
//!
//! 多模态作业评估编排：把文本、代码、手写图片、语音录音路由到对应的识别 / 评估能力，
//! 并可选地把反馈翻译成目标语言、合成为语音。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有全部能力提供方，只暴露查找和健康检查
//! - `ServiceRegistry` - 构建是原子的，构建后只读
//!
//! ### ② 业务能力层（Providers + Services）
//! - `providers/` - 四种能力的 trait 契约和 `Provider` 句柄
//! - `services/` - 具体实现：`TextEvaluator` / `CodeEvaluator` /
//!   `HandwritingRecognizer` / `AudioProcessor`
//! - `clients/` - LLM 与语音 API 的 HTTP 客户端
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次提交"的完整处理流程
//! - `SubmissionRouter` - 校验 → 识别 → 评估 → 附加置信度
//! - `FeedbackPostProcessor` - 翻译 → 语音合成（尽力而为）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 读取提交清单，管理并发和统计
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, InitializationFailure, ProviderError};
pub use infrastructure::{ServiceRegistry, ServiceRegistryBuilder};
pub use models::{
    AudioArtifact, CapabilityKind, EvaluationResult, Payload, RecognitionResult, ServiceHealth,
    StructuredExplanation, Submission, SubmissionKind, SubmissionOptions, VoiceProfile,
};
pub use orchestrator::App;
pub use providers::{
    AudioProcessing, CodeEvaluation, HandwritingRecognition, Provider, ProviderResult,
    TextEvaluation,
};
pub use workflow::{
    AudioFeedback, CancellationSignal, FeedbackPostProcessor, PipelineStage, PostProcessOutcome,
    PostProcessRequest, SubmissionRouter,
};
