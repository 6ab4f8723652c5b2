//! 代码评估服务 - 业务能力层
//!
//! 四个子指标（复杂度、可维护性、效率、风格）各在 [0, 1]，
//! 按固定权重合成 0-100 的总分。

use async_trait::async_trait;
use phf::phf_map;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clients::LlmClient;
use crate::config::Config;
use crate::error::ProviderError;
use crate::models::{EvaluationResult, StructuredExplanation};
use crate::providers::{CodeEvaluation, ProviderResult};
use crate::services::response_parser::{
    parse_code_snippets, parse_first_number, parse_json_response, split_list_items,
};

const BACKEND: &str = "code-llm";

/// 各语言对应的风格指南
static STYLE_GUIDES: phf::Map<&'static str, &'static str> = phf_map! {
    "python" => "PEP 8",
    "javascript" => "Airbnb Style Guide",
    "java" => "Google Java Style Guide",
    "cpp" => "Google C++ Style Guide",
};

const DEFAULT_STYLE_GUIDE: &str = "standard conventions";

/// 风格打分失败时的默认值
const DEFAULT_STYLE_SCORE: f64 = 0.5;

pub const COMPLEXITY_WEIGHT: f64 = 0.2;
pub const MAINTAINABILITY_WEIGHT: f64 = 0.3;
pub const EFFICIENCY_WEIGHT: f64 = 0.25;
pub const STYLE_WEIGHT: f64 = 0.25;

/// 代码子指标，均在 [0, 1]，越高越好
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeMetrics {
    pub complexity: f64,
    pub maintainability: f64,
    pub efficiency: f64,
    pub style_score: f64,
}

impl CodeMetrics {
    pub fn new(complexity: f64, maintainability: f64, efficiency: f64, style_score: f64) -> Self {
        let unit = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            complexity: unit(complexity),
            maintainability: unit(maintainability),
            efficiency: unit(efficiency),
            style_score: unit(style_score),
        }
    }

    /// 加权总分，保留两位小数
    pub fn overall_score(&self) -> f64 {
        let weighted = self.complexity * COMPLEXITY_WEIGHT
            + self.maintainability * MAINTAINABILITY_WEIGHT
            + self.efficiency * EFFICIENCY_WEIGHT
            + self.style_score * STYLE_WEIGHT;
        (weighted * 100.0 * 100.0).round() / 100.0
    }
}

#[derive(Debug, Deserialize)]
struct LlmCodeMetrics {
    complexity: f64,
    maintainability: f64,
    efficiency: f64,
}

/// 代码评估服务
pub struct CodeEvaluator {
    llm: LlmClient,
}

impl CodeEvaluator {
    /// 创建代码评估服务，缺少 API key 时初始化失败
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        if config.llm_api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable(
                "未配置 OPENAI_API_KEY".to_string(),
            ));
        }

        Ok(Self {
            llm: LlmClient::new(config),
        })
    }

    /// 语言对应的风格指南
    pub fn style_guide(language: Option<&str>) -> &'static str {
        language
            .map(|l| l.trim().to_ascii_lowercase())
            .and_then(|l| STYLE_GUIDES.get(l.as_str()).copied())
            .unwrap_or(DEFAULT_STYLE_GUIDE)
    }

    /// 任何非空语言都可评估，没有专门风格指南的按通用规范打分
    pub fn is_gradable_language(language: &str) -> bool {
        !language.trim().is_empty()
    }

    async fn analyze_metrics(&self, code: &str, language: &str) -> ProviderResult<(f64, f64, f64)> {
        let prompt = format!(
            r#"Analyze this {language} code and rate it on three axes, each between 0 and 1 where 1 is best:
- complexity (1 = simple, easy to follow)
- maintainability
- efficiency

Respond only with JSON: {{"complexity": 0.0, "maintainability": 0.0, "efficiency": 0.0}}

```{language}
{code}
```"#
        );

        let response = self
            .llm
            .chat(&prompt, Some("You are a static code analyzer."), 0.0)
            .await
            .map_err(|e| ProviderError::backend(BACKEND, e))?;

        let metrics: LlmCodeMetrics = parse_json_response(&response)
            .ok_or_else(|| ProviderError::malformed(BACKEND, format!("无法解析代码指标: {}", response)))?;

        Ok((metrics.complexity, metrics.maintainability, metrics.efficiency))
    }

    /// 风格打分，失败时返回 0.5
    pub async fn check_code_style(&self, code: &str, language: Option<&str>) -> f64 {
        match self.try_style_score(code, language).await {
            Ok(score) => score,
            Err(e) => {
                warn!("风格打分失败，使用默认值 {}: {}", DEFAULT_STYLE_SCORE, e);
                DEFAULT_STYLE_SCORE
            }
        }
    }

    async fn try_style_score(&self, code: &str, language: Option<&str>) -> ProviderResult<f64> {
        let language_name = language.unwrap_or("source");
        let prompt = format!(
            "Rate this {} code's style compliance with {}.\nReturn only a score between 0 and 1.\n\n```{}\n{}\n```",
            language_name,
            Self::style_guide(language),
            language_name,
            code
        );

        let response = self
            .llm
            .chat(
                &prompt,
                Some("You are a code style analyzer. Respond only with a score between 0 and 1."),
                0.0,
            )
            .await
            .map_err(|e| ProviderError::backend(BACKEND, e))?;

        parse_first_number(&response)
            .map(|score| score.clamp(0.0, 1.0))
            .ok_or_else(|| ProviderError::malformed(BACKEND, format!("无法解析风格分数: {}", response)))
    }

    async fn generate_feedback(
        &self,
        code: &str,
        language: Option<&str>,
        metrics: &CodeMetrics,
    ) -> ProviderResult<String> {
        let language_name = language.unwrap_or("software");
        let prompt = format!(
            r#"As an expert {} developer, review this code and provide detailed feedback.
Consider the following metrics:
- Complexity: {:.2}
- Maintainability: {:.2}
- Efficiency: {:.2}
- Style Score: {:.2}

Code:
```
{}
```

Provide feedback on:
1. Code structure and organization
2. Algorithm efficiency
3. Best practices and patterns
4. Style guide compliance ({})
5. Potential improvements"#,
            language_name,
            metrics.complexity,
            metrics.maintainability,
            metrics.efficiency,
            metrics.style_score,
            code,
            Self::style_guide(language)
        );

        let feedback = self
            .llm
            .chat(
                &prompt,
                Some("You are an expert code reviewer providing detailed feedback."),
                0.7,
            )
            .await
            .map_err(|e| ProviderError::backend(BACKEND, e))?;

        if feedback.is_empty() {
            return Err(ProviderError::malformed(BACKEND, "反馈为空"));
        }
        Ok(feedback)
    }

    async fn generate_suggestions(
        &self,
        code: &str,
        language: Option<&str>,
        metrics: &CodeMetrics,
    ) -> anyhow::Result<Vec<String>> {
        let language_name = language.unwrap_or("source");
        let prompt = format!(
            "Based on these metrics:\n- Complexity: {:.2}\n- Maintainability: {:.2}\n- Efficiency: {:.2}\n- Style Score: {:.2}\n\n\
             Provide 3-5 specific suggestions to improve this {} code, one per line:\n```\n{}\n```",
            metrics.complexity,
            metrics.maintainability,
            metrics.efficiency,
            metrics.style_score,
            language_name,
            code
        );

        let response = self
            .llm
            .chat(
                &prompt,
                Some("You are a code improvement advisor. Provide specific, actionable suggestions."),
                0.7,
            )
            .await?;

        Ok(split_list_items(&response))
    }
}

#[async_trait]
impl CodeEvaluation for CodeEvaluator {
    async fn evaluate(&self, code: &str, language: Option<&str>) -> ProviderResult<EvaluationResult> {
        if code.trim().is_empty() {
            return Err(ProviderError::InvalidInput("代码为空".to_string()));
        }

        let (complexity, maintainability, efficiency) =
            self.analyze_metrics(code, language.unwrap_or("source")).await?;
        let style_score = self.check_code_style(code, language).await;
        let metrics = CodeMetrics::new(complexity, maintainability, efficiency, style_score);

        let feedback = self.generate_feedback(code, language, &metrics).await?;

        let mut result = EvaluationResult::new(metrics.overall_score(), feedback)
            .with_metric("complexity", metrics.complexity)
            .with_metric("maintainability", metrics.maintainability)
            .with_metric("efficiency", metrics.efficiency)
            .with_metric("style", metrics.style_score);

        match self.generate_suggestions(code, language, &metrics).await {
            Ok(suggestions) => result.suggestions = suggestions,
            Err(e) => {
                warn!("生成改进建议失败: {:#}", e);
                result.push_warning("suggestions unavailable");
            }
        }

        result.explanation = self.explain(&result.narrative, language).await;
        if result.explanation.is_none() {
            result.push_warning("code snippets unavailable");
        }

        debug!("代码评估完成，得分: {:.2}", result.score);
        Ok(result)
    }

    async fn explain(&self, feedback: &str, language: Option<&str>) -> Option<StructuredExplanation> {
        let prompt = format!(
            "Based on this feedback:\n{}\n\n\
             Generate 2-3 example code snippets in {} that demonstrate best practices and improvements.\n\
             Format each snippet as:\nTitle: ...\nDescription: ...\n```\ncode\n```",
            feedback,
            language.unwrap_or("the same language")
        );

        let response = match self
            .llm
            .chat(
                &prompt,
                Some("You are a code example generator. Provide educational code snippets."),
                0.7,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("生成示例代码失败: {:#}", e);
                return None;
            }
        };

        let snippets = parse_code_snippets(&response);
        if snippets.is_empty() {
            warn!("示例代码响应中没有可解析的片段");
            return None;
        }

        Some(StructuredExplanation {
            code_snippets: snippets,
            ..Default::default()
        })
    }

    fn supports_language(&self, language: &str) -> bool {
        Self::is_gradable_language(language)
    }

    async fn probe(&self) -> ProviderResult<()> {
        self.try_style_score("print(\"test\")", Some("python"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_weights_sum_to_one() {
        let sum = COMPLEXITY_WEIGHT + MAINTAINABILITY_WEIGHT + EFFICIENCY_WEIGHT + STYLE_WEIGHT;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[rstest]
    #[case(1.0, 1.0, 1.0, 1.0, 100.0)]
    #[case(0.0, 0.0, 0.0, 0.0, 0.0)]
    #[case(0.5, 0.5, 0.5, 0.5, 50.0)]
    #[case(0.8, 0.6, 0.7, 0.9, 74.0)]
    #[case(0.123, 0.456, 0.789, 0.321, 43.89)]
    fn test_overall_score(
        #[case] complexity: f64,
        #[case] maintainability: f64,
        #[case] efficiency: f64,
        #[case] style: f64,
        #[case] expected: f64,
    ) {
        let metrics = CodeMetrics::new(complexity, maintainability, efficiency, style);
        assert!((metrics.overall_score() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_are_clamped() {
        let metrics = CodeMetrics::new(1.7, -0.2, f64::NAN, 0.5);
        assert_eq!(metrics.complexity, 1.0);
        assert_eq!(metrics.maintainability, 0.0);
        assert_eq!(metrics.efficiency, 0.0);
        assert_eq!(metrics.overall_score(), 32.5);
    }

    #[rstest]
    #[case(Some("python"), "PEP 8")]
    #[case(Some("JavaScript"), "Airbnb Style Guide")]
    #[case(Some("cpp"), "Google C++ Style Guide")]
    #[case(Some("haskell"), "standard conventions")]
    #[case(None, "standard conventions")]
    fn test_style_guide(#[case] language: Option<&str>, #[case] expected: &str) {
        assert_eq!(CodeEvaluator::style_guide(language), expected);
    }

    #[rstest]
    #[case("python", true)]
    #[case("Rust", true)]
    #[case("haskell", true)]
    #[case("   ", false)]
    fn test_gradable_language_matches_style_fallback(#[case] language: &str, #[case] expected: bool) {
        assert_eq!(CodeEvaluator::is_gradable_language(language), expected);
    }
}
