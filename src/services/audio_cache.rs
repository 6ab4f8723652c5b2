//! 合成音频缓存目录
//!
//! 文件名由合成文本和音色的哈希决定，同样的内容总是落到同一个文件。

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::models::VoiceProfile;

/// 音频缓存
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
}

impl AudioCache {
    /// 打开（必要时创建）缓存目录
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("无法创建音频缓存目录: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 由合成文本和音色生成确定的文件名
    pub fn file_name_for(prepared_text: &str, profile: VoiceProfile) -> String {
        let digest = Sha256::digest(prepared_text.as_bytes());
        let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        format!("feedback_{}_{}.mp3", hex, profile.as_str())
    }

    /// 写入音频，已有同名文件时覆盖
    pub async fn store(&self, prepared_text: &str, profile: VoiceProfile, audio: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(Self::file_name_for(prepared_text, profile));
        tokio::fs::write(&path, audio)
            .await
            .with_context(|| format!("无法写入音频文件: {}", path.display()))?;
        debug!("音频已写入: {}", path.display());
        Ok(path)
    }

    /// 删除超过 `max_age_hours` 的 mp3 文件，返回删除数量
    pub async fn clean(&self, max_age_hours: u64) -> Result<usize> {
        let max_age = Duration::from_secs(max_age_hours * 3600);
        let now = SystemTime::now();
        let mut removed = 0;

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("无法读取音频缓存目录: {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mp3") {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("无法读取文件时间 {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("无法删除过期音频 {}: {}", path.display(), e),
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_is_deterministic() {
        let a = AudioCache::file_name_for("Good work", VoiceProfile::Teacher);
        let b = AudioCache::file_name_for("Good work", VoiceProfile::Teacher);
        let c = AudioCache::file_name_for("Good work", VoiceProfile::Friendly);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("feedback_"));
        assert!(a.ends_with("_teacher.mp3"));
    }

    #[tokio::test]
    async fn test_store_overwrites_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path().join("audio")).unwrap();

        let first = cache.store("hello", VoiceProfile::Neutral, b"one").await.unwrap();
        let second = cache.store("hello", VoiceProfile::Neutral, b"two").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_clean_keeps_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path()).unwrap();
        cache.store("fresh", VoiceProfile::Neutral, b"mp3").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        assert_eq!(cache.clean(24).await.unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_clean_with_zero_age_removes_only_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path()).unwrap();
        cache.store("old", VoiceProfile::Neutral, b"mp3").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.clean(0).await.unwrap(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }
}
