//! 流程阶段与取消信号

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AppError, AppResult};

/// 单次请求流程中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// 校验提交类型 / 语言
    Validation,
    /// OCR 或语音转写
    Recognition,
    /// 文本 / 代码评估
    Evaluation,
    /// 反馈翻译
    Translation,
    /// 语音合成
    Synthesis,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Validation => "validation",
            PipelineStage::Recognition => "recognition",
            PipelineStage::Evaluation => "evaluation",
            PipelineStage::Translation => "translation",
            PipelineStage::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 取消信号
///
/// 克隆后共享同一个标志；流程只在阶段边界检查它，正在进行的 provider 调用不会被打断
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 进入 `stage` 之前调用，已取消时返回 `Cancelled`
    pub fn check(&self, stage: PipelineStage) -> AppResult<()> {
        if self.is_cancelled() {
            return Err(AppError::Cancelled { stage });
        }
        Ok(())
    }
}
