use crate::models::{Payload, SubmissionOptions};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 批量提交清单（TOML）
///
/// ```toml
/// [[submissions]]
/// id = "alice-essay"
/// kind = "text"
/// content = "The French Revolution began in 1789..."
/// subject = "history"
/// feedback_language = "hi"
/// audio_feedback = true
///
/// [[submissions]]
/// id = "bob-worksheet"
/// kind = "handwritten"
/// file = "scans/bob.png"
/// subject = "mathematics"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionManifest {
    #[serde(default)]
    pub submissions: Vec<ManifestEntry>,

    /// 清单所在目录，用于解析相对路径
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// 清单中的一条提交
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    /// 保留原始字符串，未知类型在分发时报错
    pub kind: String,
    /// 内联文本内容
    pub content: Option<String>,
    /// 图片 / 音频 / 源码文件路径（相对清单目录）
    pub file: Option<PathBuf>,
    pub subject: Option<String>,
    pub language: Option<String>,
    /// 反馈目标语言，缺省为源语言
    pub feedback_language: Option<String>,
    pub voice_profile: Option<String>,
    pub emotion: Option<String>,
    #[serde(default)]
    pub audio_feedback: bool,
}

impl ManifestEntry {
    pub fn options(&self) -> SubmissionOptions {
        SubmissionOptions {
            subject: self.subject.clone(),
            language: self.language.clone(),
            ..Default::default()
        }
    }

    /// 读取提交内容：内联文本或文件字节，二者必须恰好提供一个
    pub async fn load_payload(&self, base_dir: &Path) -> Result<Payload> {
        match (&self.content, &self.file) {
            (Some(content), None) => Ok(Payload::Text(content.clone())),
            (None, Some(file)) => {
                let path = if file.is_absolute() {
                    file.clone()
                } else {
                    base_dir.join(file)
                };
                let bytes = fs::read(&path)
                    .await
                    .with_context(|| format!("无法读取提交文件: {}", path.display()))?;
                Ok(Payload::Bytes(bytes))
            }
            (Some(_), Some(_)) => anyhow::bail!("提交 {} 同时指定了 content 和 file", self.id),
            (None, None) => anyhow::bail!("提交 {} 缺少 content 或 file", self.id),
        }
    }
}

/// 从 TOML 文件加载提交清单
pub async fn load_submission_manifest(manifest_path: &Path) -> Result<SubmissionManifest> {
    if !manifest_path.exists() {
        anyhow::bail!("清单文件不存在: {}", manifest_path.display());
    }

    let content = fs::read_to_string(manifest_path)
        .await
        .with_context(|| format!("无法读取清单文件: {}", manifest_path.display()))?;

    let mut manifest: SubmissionManifest = toml::from_str(&content)
        .with_context(|| format!("无法解析清单文件: {}", manifest_path.display()))?;

    manifest.base_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    tracing::info!(
        "成功加载 {} 个提交: {}",
        manifest.submissions.len(),
        manifest_path.display()
    );

    Ok(manifest)
}
