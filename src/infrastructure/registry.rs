//! 服务注册表 - 基础设施层
//!
//! 持有全部能力提供方，只暴露"按能力取 provider"和"健康检查"
//!
//! - 构建是原子的：所有工厂都会执行，任一失败则整体失败，并列出每个失败的能力
//! - 构建完成后只读，可以通过 `Arc` 在并发请求之间共享

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, InitializationFailure, ProviderError};
use crate::models::{CapabilityKind, ServiceHealth};
use crate::providers::{
    AudioProcessing, CodeEvaluation, HandwritingRecognition, Provider, TextEvaluation,
};
use crate::services::{AudioProcessor, CodeEvaluator, HandwritingRecognizer, TextEvaluator};

/// provider 工厂
pub type ProviderFactory = Box<dyn FnOnce() -> Result<Provider, ProviderError> + Send>;

/// 注册表构建器
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    factories: Vec<(CapabilityKind, ProviderFactory)>,
}

impl ServiceRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一种能力的工厂，同一能力重复注册时后者覆盖前者
    pub fn register<F>(mut self, kind: CapabilityKind, factory: F) -> Self
    where
        F: FnOnce() -> Result<Provider, ProviderError> + Send + 'static,
    {
        self.factories.retain(|(k, _)| *k != kind);
        self.factories.push((kind, Box::new(factory)));
        self
    }

    /// 执行所有工厂
    ///
    /// 工厂返回的 provider 类型与注册的能力不一致时，同样视为该能力初始化失败
    pub fn build(self) -> AppResult<ServiceRegistry> {
        let mut providers = BTreeMap::new();
        let mut failures = Vec::new();

        for (kind, factory) in self.factories {
            match factory() {
                Ok(provider) if provider.kind() == kind => {
                    debug!("✓ 能力 {} 初始化完成", kind);
                    providers.insert(kind, provider);
                }
                Ok(provider) => {
                    error!("❌ 能力 {} 的工厂返回了 {} provider", kind, provider.kind());
                    failures.push(InitializationFailure {
                        kind,
                        cause: ProviderError::InvalidInput(format!(
                            "工厂返回了 {} provider",
                            provider.kind()
                        )),
                    });
                }
                Err(cause) => {
                    error!("❌ 能力 {} 初始化失败: {}", kind, cause);
                    failures.push(InitializationFailure { kind, cause });
                }
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|f| f.kind);
            return Err(AppError::InitializationError { failures });
        }

        Ok(ServiceRegistry { providers })
    }
}

/// 服务注册表
///
/// 职责：
/// - 持有每种能力唯一的 provider
/// - 按能力类型查找
/// - 健康检查
/// - 不认识提交 / 流程
#[derive(Debug)]
pub struct ServiceRegistry {
    providers: BTreeMap<CapabilityKind, Provider>,
}

impl ServiceRegistry {
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }

    /// 使用默认 provider 构建注册表
    pub fn with_defaults(config: &Config) -> AppResult<Self> {
        let text_config = config.clone();
        let code_config = config.clone();
        let handwriting_config = config.clone();
        let audio_config = config.clone();

        Self::builder()
            .register(CapabilityKind::Text, move || {
                let provider: Arc<dyn TextEvaluation> = Arc::new(TextEvaluator::new(&text_config)?);
                Ok(Provider::Text(provider))
            })
            .register(CapabilityKind::Code, move || {
                let provider: Arc<dyn CodeEvaluation> = Arc::new(CodeEvaluator::new(&code_config)?);
                Ok(Provider::Code(provider))
            })
            .register(CapabilityKind::Handwriting, move || {
                let provider: Arc<dyn HandwritingRecognition> =
                    Arc::new(HandwritingRecognizer::new(&handwriting_config)?);
                Ok(Provider::Handwriting(provider))
            })
            .register(CapabilityKind::Audio, move || {
                let provider: Arc<dyn AudioProcessing> =
                    Arc::new(AudioProcessor::new(&audio_config)?);
                Ok(Provider::Audio(provider))
            })
            .build()
    }

    /// 按能力取 provider，未注册时返回 `UnknownCapability`
    pub fn get(&self, kind: CapabilityKind) -> AppResult<&Provider> {
        self.providers
            .get(&kind)
            .ok_or_else(|| AppError::unknown_capability(kind.as_str()))
    }

    pub fn text(&self) -> AppResult<Arc<dyn TextEvaluation>> {
        match self.get(CapabilityKind::Text)? {
            Provider::Text(p) => Ok(p.clone()),
            _ => Err(AppError::unknown_capability(CapabilityKind::Text.as_str())),
        }
    }

    pub fn code(&self) -> AppResult<Arc<dyn CodeEvaluation>> {
        match self.get(CapabilityKind::Code)? {
            Provider::Code(p) => Ok(p.clone()),
            _ => Err(AppError::unknown_capability(CapabilityKind::Code.as_str())),
        }
    }

    pub fn handwriting(&self) -> AppResult<Arc<dyn HandwritingRecognition>> {
        match self.get(CapabilityKind::Handwriting)? {
            Provider::Handwriting(p) => Ok(p.clone()),
            _ => Err(AppError::unknown_capability(
                CapabilityKind::Handwriting.as_str(),
            )),
        }
    }

    pub fn audio(&self) -> AppResult<Arc<dyn AudioProcessing>> {
        match self.get(CapabilityKind::Audio)? {
            Provider::Audio(p) => Ok(p.clone()),
            _ => Err(AppError::unknown_capability(CapabilityKind::Audio.as_str())),
        }
    }

    /// 已注册的能力（有序）
    pub fn kinds(&self) -> Vec<CapabilityKind> {
        self.providers.keys().copied().collect()
    }

    /// 探测所有 provider
    ///
    /// 每个探测在独立任务中运行，返回错误或 panic 只影响对应能力；
    /// 每个已注册能力恰好一条结果
    pub async fn health_check(&self) -> BTreeMap<CapabilityKind, ServiceHealth> {
        let probes = self.providers.iter().map(|(kind, provider)| {
            let kind = *kind;
            let provider = provider.clone();
            let handle = tokio::spawn(async move { provider.probe().await });
            async move { (kind, handle.await) }
        });

        join_all(probes)
            .await
            .into_iter()
            .map(|(kind, outcome)| {
                let health = match outcome {
                    Ok(Ok(())) => ServiceHealth::healthy(kind),
                    Ok(Err(e)) => {
                        warn!("⚠️ 能力 {} 健康检查失败: {}", kind, e);
                        ServiceHealth::unhealthy(kind, e.to_string())
                    }
                    Err(join_error) => {
                        error!("❌ 能力 {} 健康检查异常退出: {}", kind, join_error);
                        ServiceHealth::unhealthy(kind, format!("探测异常退出: {}", join_error))
                    }
                };
                (kind, health)
            })
            .collect()
    }

    /// 对外健康状态：能力名 → 是否健康，从不失败
    pub async fn health_status(&self) -> BTreeMap<String, bool> {
        self.health_check()
            .await
            .into_iter()
            .map(|(kind, health)| (kind.to_string(), health.healthy))
            .collect()
    }

    /// 在日志中输出健康报告
    pub async fn log_health_report(&self) -> BTreeMap<CapabilityKind, ServiceHealth> {
        let report = self.health_check().await;
        let healthy = report.values().filter(|h| h.healthy).count();
        info!("🩺 健康检查: {}/{} 个能力可用", healthy, report.len());
        report
    }
}
