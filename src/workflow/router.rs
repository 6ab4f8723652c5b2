//! 提交路由 - 流程层
//!
//! 核心职责：定义"一次提交"的完整处理流程
//!
//! 流程顺序：
//! 1. 校验提交类型（以及同时给出科目和语言时的语言支持）
//! 2. 手写 / 语音：识别（OCR / 转写）
//! 3. 评估：代码走代码评估器，其余走文本评估器
//! 4. 附加识别置信度
//!
//! 任何阶段都不重试。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ProviderError};
use crate::infrastructure::ServiceRegistry;
use crate::models::{
    normalize_score, CapabilityKind, EvaluationResult, Payload, RecognitionResult,
    StructuredExplanation, Submission, SubmissionKind, SubmissionOptions, TranscriptionTask,
};
use crate::utils::truncate_text;
use crate::workflow::cancellation::{CancellationSignal, PipelineStage};
use crate::workflow::submission_ctx::SubmissionCtx;

/// 语音提交的可选转写任务，放在 `SubmissionOptions::extra` 中
pub const TRANSCRIPTION_TASK_OPTION: &str = "task";

/// 提交路由
///
/// - 编排单次提交的完整流程
/// - 决定先识别还是直接评估
/// - 不持有 provider，只通过注册表取用
pub struct SubmissionRouter {
    registry: Arc<ServiceRegistry>,
    next_request_id: AtomicU64,
    verbose_logging: bool,
}

impl SubmissionRouter {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self {
            registry,
            next_request_id: AtomicU64::new(1),
            verbose_logging: false,
        }
    }

    pub fn with_config(registry: Arc<ServiceRegistry>, config: &Config) -> Self {
        Self {
            verbose_logging: config.verbose_logging,
            ..Self::new(registry)
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// 对外入口：以字符串给出提交类型
    ///
    /// 未知类型在触达任何 provider 之前返回 `UnsupportedSubmissionKind`
    pub async fn dispatch_raw(
        &self,
        kind: &str,
        content: impl Into<Payload>,
        options: SubmissionOptions,
    ) -> AppResult<EvaluationResult> {
        let submission = Submission::parse(kind, content, options).map_err(|e| {
            warn!("⚠️ 拒绝提交: {}", e);
            e
        })?;
        self.dispatch(&submission).await
    }

    pub async fn dispatch(&self, submission: &Submission) -> AppResult<EvaluationResult> {
        self.dispatch_with_cancel(submission, &CancellationSignal::new())
            .await
    }

    /// 处理一次提交，在每个阶段边界检查取消信号
    pub async fn dispatch_with_cancel(
        &self,
        submission: &Submission,
        cancel: &CancellationSignal,
    ) -> AppResult<EvaluationResult> {
        let ctx = SubmissionCtx::new(
            self.next_request_id.fetch_add(1, Ordering::Relaxed),
            submission.kind(),
        );
        info!("{} 📥 收到提交 ({} 字节)", ctx, submission.payload().len());

        self.check_language(submission, &ctx)?;

        // ========== 阶段 1: 识别 ==========
        let recognition = match submission.kind().recognition_capability() {
            Some(capability) => {
                cancel.check(PipelineStage::Recognition)?;
                let recognized = self.recognize(submission, capability, &ctx).await?;
                Some((capability, recognized))
            }
            None => None,
        };

        // ========== 阶段 2: 评估 ==========
        cancel.check(PipelineStage::Evaluation)?;

        let text = match &recognition {
            Some((_, recognized)) => recognized.text.clone(),
            None => submission
                .payload()
                .as_text()
                .map(|t| t.into_owned())
                .ok_or_else(|| {
                    AppError::evaluation_failed(
                        submission.kind(),
                        ProviderError::InvalidInput("内容不是有效的 UTF-8 文本".to_string()),
                    )
                })?,
        };

        if self.verbose_logging {
            debug!("{} 待评估内容: {}", ctx, truncate_text(&text, 80));
        }

        let mut result = self.evaluate(submission, &text, &ctx).await?;
        result.score = normalize_score(result.score);

        // ========== 阶段 3: 附加识别信息 ==========
        if let Some((capability, recognized)) = recognition {
            if !result.attach_recognition(capability, recognized) {
                debug!("{} 评估器已提供 recognition.confidence，保留原值", ctx);
            }
        }

        info!("{} ✓ 评估完成，得分 {:.2}", ctx, result.score);
        Ok(result)
    }

    /// 为已有反馈生成结构化解释
    ///
    /// 代码提交返回示例代码片段，其余返回短语影响度；解释缺失不算错误
    pub async fn explain_feedback(
        &self,
        kind: SubmissionKind,
        original_content: &str,
        feedback: &str,
        language: Option<&str>,
    ) -> AppResult<Option<StructuredExplanation>> {
        let explanation = match kind {
            SubmissionKind::Code => self.registry.code()?.explain(feedback, language).await,
            SubmissionKind::Text | SubmissionKind::Handwritten | SubmissionKind::Voice => {
                self.registry.text()?.explain(original_content, feedback).await
            }
        };

        if explanation.is_none() {
            warn!("⚠️ {} 提交的反馈解释不可用", kind);
        }
        Ok(explanation)
    }

    /// 同时给出科目和语言时，评估器必须支持该语言
    fn check_language(&self, submission: &Submission, ctx: &SubmissionCtx) -> AppResult<()> {
        let (Some(_), Some(language)) = (submission.subject(), submission.language()) else {
            return Ok(());
        };

        let supported = match submission.kind().evaluation_capability() {
            CapabilityKind::Code => self.registry.code()?.supports_language(language),
            _ => self.registry.text()?.supports_language(language),
        };

        if !supported {
            warn!("{} ⚠️ 评估器不支持语言 {}", ctx, language);
            return Err(AppError::unsupported_language(language));
        }
        Ok(())
    }

    async fn recognize(
        &self,
        submission: &Submission,
        capability: CapabilityKind,
        ctx: &SubmissionCtx,
    ) -> AppResult<RecognitionResult> {
        let kind = submission.kind();
        let payload = submission.payload().as_bytes();

        let outcome = match capability {
            CapabilityKind::Handwriting => {
                info!("{} ✍️ 正在识别手写内容...", ctx);
                self.registry
                    .handwriting()?
                    .recognize(payload, submission.subject())
                    .await
            }
            CapabilityKind::Audio => {
                info!("{} 🎙️ 正在转写语音...", ctx);
                let task = submission
                    .options()
                    .extra
                    .get(TRANSCRIPTION_TASK_OPTION)
                    .map(|t| match t.trim().to_ascii_lowercase().as_str() {
                        "translate" => TranscriptionTask::Translate,
                        _ => TranscriptionTask::Transcribe,
                    });
                self.registry.audio()?.transcribe(payload, task).await
            }
            CapabilityKind::Text | CapabilityKind::Code => {
                return Err(AppError::unknown_capability(capability.as_str()));
            }
        };

        match outcome {
            Ok(recognized) => {
                info!(
                    "{} ✓ 识别完成，置信度 {:.2}",
                    ctx, recognized.confidence
                );
                Ok(recognized)
            }
            Err(source) => {
                error!("{} ❌ 识别失败: {}", ctx, source);
                Err(AppError::RecognitionFailed { kind, source })
            }
        }
    }

    async fn evaluate(
        &self,
        submission: &Submission,
        text: &str,
        ctx: &SubmissionCtx,
    ) -> AppResult<EvaluationResult> {
        let kind = submission.kind();

        let outcome = match kind.evaluation_capability() {
            CapabilityKind::Code => {
                info!("{} 💻 正在评估代码...", ctx);
                self.registry
                    .code()?
                    .evaluate(text, submission.language())
                    .await
            }
            _ => {
                info!("{} 📝 正在评估文本...", ctx);
                self.registry
                    .text()?
                    .evaluate(text, submission.subject())
                    .await
            }
        };

        outcome.map_err(|source| {
            error!("{} ❌ 评估失败: {}", ctx, source);
            AppError::evaluation_failed(kind, source)
        })
    }
}
