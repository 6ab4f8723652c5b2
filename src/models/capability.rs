//! 能力类型与健康状态

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 能力类型（固定的四种）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// 文本评估 + 翻译
    Text,
    /// 代码评估
    Code,
    /// 手写识别
    Handwriting,
    /// 语音转写 / 合成
    Audio,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 4] = [
        CapabilityKind::Text,
        CapabilityKind::Code,
        CapabilityKind::Handwriting,
        CapabilityKind::Audio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::Text => "text",
            CapabilityKind::Code => "code",
            CapabilityKind::Handwriting => "handwriting",
            CapabilityKind::Audio => "audio",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(CapabilityKind::Text),
            "code" => Ok(CapabilityKind::Code),
            "handwriting" => Ok(CapabilityKind::Handwriting),
            "audio" => Ok(CapabilityKind::Audio),
            _ => Err(AppError::unknown_capability(s)),
        }
    }
}

/// 单个能力的健康状态（按需重新计算）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceHealth {
    pub kind: CapabilityKind,
    pub healthy: bool,
    pub last_error: Option<String>,
}

impl ServiceHealth {
    pub fn healthy(kind: CapabilityKind) -> Self {
        Self {
            kind,
            healthy: true,
            last_error: None,
        }
    }

    pub fn unhealthy(kind: CapabilityKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            healthy: false,
            last_error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capability_kind() {
        assert_eq!("Text".parse::<CapabilityKind>().unwrap(), CapabilityKind::Text);
        assert_eq!(
            " handwriting ".parse::<CapabilityKind>().unwrap(),
            CapabilityKind::Handwriting
        );
        assert!(matches!(
            "video".parse::<CapabilityKind>(),
            Err(AppError::UnknownCapability { .. })
        ));
    }
}
