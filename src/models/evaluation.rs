//! 识别结果与评估结果

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::CapabilityKind;

/// 识别结果中置信度在 metrics 里的命名空间键
pub const RECOGNITION_CONFIDENCE_METRIC: &str = "recognition.confidence";

/// 把任意数值限制到 [0, 1]，NaN 视为 0
pub fn normalize_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// 把任意分数限制到 [0, 100]，NaN 视为 0
pub fn normalize_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// OCR / 语音转写的输出，只在路由内部传给下一阶段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub text: String,
    /// 始终在 [0, 1]
    pub confidence: f64,
    pub auxiliary: BTreeMap<String, JsonValue>,
}

impl RecognitionResult {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence: normalize_confidence(confidence),
            auxiliary: BTreeMap::new(),
        }
    }

    pub fn with_auxiliary(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.auxiliary.insert(key.into(), value.into());
        self
    }
}

/// 示例代码片段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub title: String,
    pub description: Option<String>,
    pub code: Option<String>,
}

/// 结构化解释
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredExplanation {
    /// 对评分影响最大的短语
    pub important_phrases: Vec<String>,
    /// 与 `important_phrases` 一一对应的影响分数
    pub impact_scores: Vec<f64>,
    /// 代码类提交的示例片段
    pub code_snippets: Vec<CodeSnippet>,
}

impl StructuredExplanation {
    pub fn is_empty(&self) -> bool {
        self.important_phrases.is_empty() && self.code_snippets.is_empty()
    }
}

/// 多阶段流程中识别阶段的来源信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionProvenance {
    pub capability: CapabilityKind,
    pub confidence: f64,
    pub text: String,
    pub auxiliary: BTreeMap<String, JsonValue>,
}

/// 评估结果（核心输出单元）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// 0-100
    pub score: f64,
    pub narrative: String,
    pub metrics: BTreeMap<String, f64>,
    pub suggestions: Vec<String>,
    pub explanation: Option<StructuredExplanation>,
    /// 仅手写 / 语音提交存在
    pub recognition: Option<RecognitionProvenance>,
    /// 尽力而为阶段的降级说明
    pub warnings: Vec<String>,
}

impl EvaluationResult {
    pub fn new(score: f64, narrative: impl Into<String>) -> Self {
        Self {
            score: normalize_score(score),
            narrative: narrative.into(),
            ..Default::default()
        }
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    pub fn recognition_confidence(&self) -> Option<f64> {
        self.recognition.as_ref().map(|r| r.confidence)
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// 附加识别阶段信息
    ///
    /// 置信度写入 `recognition.confidence`，已有同名指标时保留评估器的值。
    /// 返回是否写入了 metrics。
    pub fn attach_recognition(
        &mut self,
        capability: CapabilityKind,
        recognition: RecognitionResult,
    ) -> bool {
        let confidence = normalize_confidence(recognition.confidence);
        let inserted = match self.metrics.entry(RECOGNITION_CONFIDENCE_METRIC.to_string()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(confidence);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        };
        self.recognition = Some(RecognitionProvenance {
            capability,
            confidence,
            text: recognition.text,
            auxiliary: recognition.auxiliary,
        });
        inserted
    }
}
