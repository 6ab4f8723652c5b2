//! 批量评估处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量提交的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：日志文件、构建服务注册表、清理过期音频、健康检查
//! 2. **批量加载**：读取 TOML 提交清单
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **全局统计**：汇总所有提交的处理结果

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::ServiceRegistry;
use crate::models::{load_submission_manifest, Emotion, ManifestEntry, SubmissionManifest};
use crate::services::AudioCache;
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_startup, log_submissions_loaded,
    print_final_stats,
};
use crate::utils::truncate_text;
use crate::workflow::{CancellationSignal, FeedbackPostProcessor, PostProcessRequest, SubmissionRouter};

/// 应用主结构
pub struct App {
    config: Config,
    router: Arc<SubmissionRouter>,
    post_processor: Arc<FeedbackPostProcessor>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(config.max_concurrent_submissions);

        let registry = Arc::new(ServiceRegistry::with_defaults(&config)?);
        info!("✓ 服务注册表初始化完成: {:?}", registry.kinds());

        let cache = AudioCache::new(&config.audio_cache_dir)?;
        match cache.clean(config.audio_cache_max_age_hours).await {
            Ok(0) => {}
            Ok(removed) => info!("🧹 清理了 {} 个过期音频文件", removed),
            Err(e) => warn!("⚠️ 清理音频缓存失败: {:#}", e),
        }

        for health in registry.log_health_report().await.values() {
            if let Some(err) = &health.last_error {
                warn!("⚠️ {} 暂不可用: {}", health.kind, err);
            }
        }

        let router = Arc::new(SubmissionRouter::with_config(registry.clone(), &config));
        let post_processor = Arc::new(FeedbackPostProcessor::with_config(registry, &config));

        Ok(Self {
            config,
            router,
            post_processor,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在读取提交清单: {}", self.config.submissions_file);
        let manifest = load_submission_manifest(Path::new(&self.config.submissions_file)).await?;

        if manifest.submissions.is_empty() {
            warn!("⚠️ 清单中没有提交，程序结束");
            return Ok(());
        }

        let total = manifest.submissions.len();
        let max_concurrent = self.config.max_concurrent_submissions.max(1);
        log_submissions_loaded(total, max_concurrent);

        let stats = self.process_all(manifest, max_concurrent).await?;

        print_final_stats(
            stats.success,
            stats.failed,
            total,
            &self.config.output_log_file,
        );
        Ok(())
    }

    /// 分批处理所有提交
    async fn process_all(
        &self,
        manifest: SubmissionManifest,
        max_concurrent: usize,
    ) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = manifest.submissions.len();
        let total_batches = total.div_ceil(max_concurrent);
        let mut stats = ProcessingStats::default();

        for (batch_idx, batch) in manifest.submissions.chunks(max_concurrent).enumerate() {
            let batch_start = batch_idx * max_concurrent;
            let batch_num = batch_idx + 1;
            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let mut handles = Vec::new();
            for (offset, entry) in batch.iter().enumerate() {
                let index = batch_start + offset + 1;
                let permit = semaphore.clone().acquire_owned().await?;
                let router = self.router.clone();
                let post_processor = self.post_processor.clone();
                let entry = entry.clone();
                let base_dir = manifest.base_dir.clone();

                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    process_entry(&router, &post_processor, &entry, &base_dir, index).await
                });
                handles.push((index, handle));
            }

            let mut success = 0;
            for (index, handle) in handles {
                match handle.await {
                    Ok(Ok(())) => success += 1,
                    Ok(Err(e)) => {
                        error!("[提交 {}] ❌ 处理失败: {:#}", index, e);
                        stats.failed += 1;
                    }
                    Err(e) => {
                        error!("[提交 {}] 任务执行失败: {}", index, e);
                        stats.failed += 1;
                    }
                }
            }

            stats.success += success;
            log_batch_complete(batch_num, success, batch.len());
        }

        Ok(stats)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
}

/// 处理清单中的一条提交：评估，然后按需翻译 / 合成语音
async fn process_entry(
    router: &SubmissionRouter,
    post_processor: &FeedbackPostProcessor,
    entry: &ManifestEntry,
    base_dir: &Path,
    index: usize,
) -> Result<()> {
    info!("[提交 {}] ▶ {} ({})", index, entry.id, entry.kind);

    let payload = entry.load_payload(base_dir).await?;
    let result = router
        .dispatch_raw(&entry.kind, payload, entry.options())
        .await?;

    info!(
        "[提交 {}] ✓ {} 得分 {:.2}: {}",
        index,
        entry.id,
        result.score,
        truncate_text(&result.narrative, 60)
    );
    if let Some(confidence) = result.recognition_confidence() {
        info!("[提交 {}] 识别置信度 {:.2}", index, confidence);
    }
    for warning in &result.warnings {
        warn!("[提交 {}] ⚠️ {}", index, warning);
    }

    let target_language = entry
        .feedback_language
        .clone()
        .unwrap_or_else(|| post_processor.source_language().to_string());
    if target_language.eq_ignore_ascii_case(post_processor.source_language()) && !entry.audio_feedback {
        return Ok(());
    }

    let mut request = PostProcessRequest::new(result.narrative.clone(), target_language)
        .with_emotion(entry.emotion.as_deref().and_then(Emotion::parse));
    if entry.audio_feedback {
        request = request.with_audio(entry.voice_profile.clone().unwrap_or_default());
    }

    let outcome = post_processor
        .process(request, &CancellationSignal::new())
        .await?;

    info!(
        "[提交 {}] 🌐 反馈 ({}): {}",
        index,
        outcome.language,
        truncate_text(&outcome.translated_text, 60)
    );
    if let Some(audio) = &outcome.audio {
        info!("[提交 {}] 🔊 语音反馈: {}", index, audio.locator_path);
    }
    if let Some(e) = &outcome.synthesis_error {
        warn!("[提交 {}] ⚠️ 语音反馈不可用: {}", index, e);
    }

    Ok(())
}
