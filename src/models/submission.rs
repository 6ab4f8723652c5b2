//! 学生提交数据
//!
//! 提交一旦创建即不可变：字段私有，只通过 getter 读取。

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::CapabilityKind;

/// 提交类型（封闭集合，新增类型会在所有 match 处产生编译错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    /// 文本作答
    Text,
    /// 代码作答
    Code,
    /// 手写图片
    Handwritten,
    /// 语音录音
    Voice,
}

impl SubmissionKind {
    pub const ALL: [SubmissionKind; 4] = [
        SubmissionKind::Text,
        SubmissionKind::Code,
        SubmissionKind::Handwritten,
        SubmissionKind::Voice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionKind::Text => "text",
            SubmissionKind::Code => "code",
            SubmissionKind::Handwritten => "handwritten",
            SubmissionKind::Voice => "voice",
        }
    }

    /// 需要先经过识别阶段的能力（手写 → OCR，语音 → 转写）
    pub fn recognition_capability(self) -> Option<CapabilityKind> {
        match self {
            SubmissionKind::Handwritten => Some(CapabilityKind::Handwriting),
            SubmissionKind::Voice => Some(CapabilityKind::Audio),
            SubmissionKind::Text | SubmissionKind::Code => None,
        }
    }

    /// 负责评估的能力
    ///
    /// 手写和语音提交始终使用文本评估器
    pub fn evaluation_capability(self) -> CapabilityKind {
        match self {
            SubmissionKind::Code => CapabilityKind::Code,
            SubmissionKind::Text | SubmissionKind::Handwritten | SubmissionKind::Voice => {
                CapabilityKind::Text
            }
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(SubmissionKind::Text),
            "code" => Ok(SubmissionKind::Code),
            "handwritten" => Ok(SubmissionKind::Handwritten),
            "voice" => Ok(SubmissionKind::Voice),
            _ => Err(AppError::unsupported_kind(s)),
        }
    }
}

/// 提交内容：文本或原始字节（图片 / 音频）
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    /// 以文本形式读取，非 UTF-8 字节返回 None
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Payload::Text(text) => Some(Cow::Borrowed(text.as_str())),
            Payload::Bytes(bytes) => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

/// 提交选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOptions {
    /// 科目提示（例如 "mathematics"）
    pub subject: Option<String>,
    /// 语言提示：代码提交为编程语言，其他为自然语言
    pub language: Option<String>,
    /// 其他透传选项
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl SubmissionOptions {
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// 一次提交
#[derive(Debug, Clone)]
pub struct Submission {
    kind: SubmissionKind,
    payload: Payload,
    options: SubmissionOptions,
}

impl Submission {
    pub fn new(kind: SubmissionKind, payload: impl Into<Payload>, options: SubmissionOptions) -> Self {
        Self {
            kind,
            payload: payload.into(),
            options,
        }
    }

    /// 从字符串类型创建提交，未知类型返回 `UnsupportedSubmissionKind`
    pub fn parse(
        kind: &str,
        payload: impl Into<Payload>,
        options: SubmissionOptions,
    ) -> Result<Self, AppError> {
        Ok(Self::new(kind.parse()?, payload, options))
    }

    pub fn kind(&self) -> SubmissionKind {
        self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn options(&self) -> &SubmissionOptions {
        &self.options
    }

    pub fn subject(&self) -> Option<&str> {
        self.options.subject.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.options.language.as_deref()
    }
}
