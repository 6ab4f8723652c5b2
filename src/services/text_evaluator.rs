//! 文本评估服务 - 业务能力层
//!
//! 只负责"评估一段文字 / 翻译反馈 / 解释反馈"能力，不关心流程
//!
//! - 评估与解释基于生成式 LLM（`LlmClient`）
//! - 翻译只支持固定的语言集合（泰米尔语、印地语、泰卢固语）

use async_trait::async_trait;
use phf::phf_map;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clients::LlmClient;
use crate::config::Config;
use crate::error::ProviderError;
use crate::models::{EvaluationResult, StructuredExplanation};
use crate::providers::{ProviderResult, TextEvaluation};
use crate::services::response_parser::{parse_first_number, parse_json_response};

const BACKEND: &str = "text-llm";

/// 支持的翻译目标语言
static TRANSLATION_LANGUAGES: phf::Map<&'static str, &'static str> = phf_map! {
    "ta" => "Tamil",
    "hi" => "Hindi",
    "te" => "Telugu",
};

/// 源语言代码对应的提示词名称，未收录的直接使用代码本身
fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        other => TRANSLATION_LANGUAGES.get(other).copied().unwrap_or(other),
    }
}

fn translation_prompt(source_language: &str, target_name: &str, text: &str) -> String {
    format!(
        "Translate the following teacher feedback from {} to {}. \
         Return only the translation.\n\n{}",
        language_name(source_language),
        target_name,
        text
    )
}

/// 解释中最多保留的短语数量
const MAX_EXPLANATION_PHRASES: usize = 6;

/// 置信度打分失败时的默认值
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// LLM 评估输出
#[derive(Debug, Deserialize)]
struct LlmEvaluation {
    score: f64,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LlmExplanation {
    #[serde(default)]
    phrases: Vec<LlmPhraseImpact>,
}

#[derive(Debug, Deserialize)]
struct LlmPhraseImpact {
    phrase: String,
    impact: f64,
}

/// 文本评估服务
pub struct TextEvaluator {
    llm: LlmClient,
    source_language: String,
}

impl TextEvaluator {
    /// 创建文本评估服务，缺少 API key 时初始化失败
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        if config.llm_api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable(
                "未配置 OPENAI_API_KEY".to_string(),
            ));
        }

        Ok(Self {
            llm: LlmClient::new(config),
            source_language: config.source_language.trim().to_ascii_lowercase(),
        })
    }

    /// 支持的翻译目标语言代码
    pub fn translation_languages() -> impl Iterator<Item = &'static str> {
        TRANSLATION_LANGUAGES.keys().copied()
    }

    /// 计算反馈的置信度（0-1），失败时返回 0.5
    pub async fn confidence_score(&self, feedback: &str) -> f64 {
        match self.try_confidence_score(feedback).await {
            Ok(score) => score,
            Err(e) => {
                warn!("置信度打分失败，使用默认值 {}: {}", DEFAULT_CONFIDENCE, e);
                DEFAULT_CONFIDENCE
            }
        }
    }

    async fn try_confidence_score(&self, feedback: &str) -> ProviderResult<f64> {
        let response = self
            .llm
            .chat(
                feedback,
                Some(
                    "Rate the confidence level of this feedback on a scale of 0-1. \
                     Consider factors like specificity, relevance, and actionability. \
                     Return only the number.",
                ),
                0.0,
            )
            .await
            .map_err(|e| ProviderError::backend(BACKEND, e))?;

        parse_first_number(&response)
            .map(|score| score.clamp(0.0, 1.0))
            .ok_or_else(|| ProviderError::malformed(BACKEND, format!("无法解析置信度: {}", response)))
    }
}

#[async_trait]
impl TextEvaluation for TextEvaluator {
    async fn evaluate(&self, text: &str, subject: Option<&str>) -> ProviderResult<EvaluationResult> {
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidInput("作答内容为空".to_string()));
        }

        let prompt = build_evaluation_prompt(text, subject);
        let response = self
            .llm
            .chat(
                &prompt,
                Some("You are an expert teacher providing detailed feedback."),
                0.7,
            )
            .await
            .map_err(|e| ProviderError::backend(BACKEND, e))?;

        let mut result = parse_evaluation(&response)?;

        // 解释是尽力而为的
        result.explanation = self.explain(text, &result.narrative).await;
        if result.explanation.is_none() {
            result.push_warning("explanation unavailable");
        }

        let confidence = self.confidence_score(&result.narrative).await;
        result.metrics.insert("feedback_confidence".to_string(), confidence);

        debug!("文本评估完成，得分: {:.2}", result.score);
        Ok(result)
    }

    async fn translate(&self, text: &str, target_language: &str) -> ProviderResult<String> {
        let code = target_language.trim().to_ascii_lowercase();
        let target_name = TRANSLATION_LANGUAGES
            .get(code.as_str())
            .ok_or_else(|| ProviderError::unsupported_language(target_language))?;

        let prompt = translation_prompt(&self.source_language, target_name, text);

        let translated = self
            .llm
            .chat(&prompt, Some("You are a professional translator."), 0.0)
            .await
            .map_err(|e| ProviderError::backend(BACKEND, e))?;

        if translated.is_empty() {
            return Err(ProviderError::malformed(BACKEND, "翻译结果为空"));
        }

        Ok(translated)
    }

    async fn explain(&self, text: &str, feedback: &str) -> Option<StructuredExplanation> {
        let prompt = format!(
            "Student response:\n{}\n\nTeacher feedback:\n{}\n\n\
             List up to {} short phrases from the student response that most influenced the feedback. \
             For each give an impact between -1 (hurt the grade) and 1 (helped the grade). \
             Respond only with JSON: {{\"phrases\": [{{\"phrase\": \"...\", \"impact\": 0.0}}]}}",
            text, feedback, MAX_EXPLANATION_PHRASES
        );

        let response = match self
            .llm
            .chat(&prompt, Some("You explain grading decisions."), 0.0)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("生成解释失败: {:#}", e);
                return None;
            }
        };

        let parsed: LlmExplanation = match parse_json_response(&response) {
            Some(parsed) => parsed,
            None => {
                warn!("无法解析解释响应");
                return None;
            }
        };

        Some(explanation_from_phrases(parsed.phrases))
    }

    fn supports_language(&self, language: &str) -> bool {
        let code = language.trim().to_ascii_lowercase();
        code == self.source_language || TRANSLATION_LANGUAGES.contains_key(code.as_str())
    }

    async fn probe(&self) -> ProviderResult<()> {
        self.try_confidence_score("Test").await.map(|_| ())
    }
}

fn build_evaluation_prompt(text: &str, subject: Option<&str>) -> String {
    format!(
        r#"As an expert {} teacher, evaluate the following student response.
Provide a detailed assessment including:
1. Score (0-100)
2. Strengths
3. Areas for improvement
4. Specific suggestions

Respond only with JSON of the form:
{{"score": 0, "feedback": "...", "strengths": ["..."], "improvements": ["..."], "suggestions": ["..."]}}

Student's response:
{}"#,
        subject.unwrap_or("general"),
        text
    )
}

/// 解析评估响应
///
/// 优先解析 JSON；后端没有按格式返回时，退而从 "Score: NN" 中取分数，整段文字作为叙述
fn parse_evaluation(response: &str) -> ProviderResult<EvaluationResult> {
    if let Some(parsed) = parse_json_response::<LlmEvaluation>(response) {
        let mut result = EvaluationResult::new(parsed.score, parsed.feedback);
        result.suggestions = if parsed.suggestions.is_empty() {
            parsed.improvements.clone()
        } else {
            parsed.suggestions
        };
        result
            .metrics
            .insert("strength_count".to_string(), parsed.strengths.len() as f64);
        result
            .metrics
            .insert("improvement_count".to_string(), parsed.improvements.len() as f64);
        return Ok(result);
    }

    let score = response
        .lines()
        .find(|line| line.to_ascii_lowercase().contains("score"))
        .and_then(parse_first_number)
        .ok_or_else(|| ProviderError::malformed(BACKEND, "评估响应中没有分数"))?;

    Ok(EvaluationResult::new(score, response))
}

fn explanation_from_phrases(phrases: Vec<LlmPhraseImpact>) -> StructuredExplanation {
    let mut explanation = StructuredExplanation::default();
    for item in phrases.into_iter().take(MAX_EXPLANATION_PHRASES) {
        explanation.important_phrases.push(item.phrase);
        explanation.impact_scores.push(item.impact.clamp(-1.0, 1.0));
    }
    explanation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluation_json() {
        let response = r#"```json
{"score": 82, "feedback": "Clear argument.", "strengths": ["structure"], "improvements": ["cite sources"], "suggestions": []}
```"#;
        let result = parse_evaluation(response).unwrap();
        assert_eq!(result.score, 82.0);
        assert_eq!(result.narrative, "Clear argument.");
        assert_eq!(result.suggestions, vec!["cite sources"]);
        assert_eq!(result.metrics["strength_count"], 1.0);
    }

    #[test]
    fn test_parse_evaluation_clamps_score() {
        let result = parse_evaluation(r#"{"score": 140, "feedback": "?"}"#).unwrap();
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn test_parse_evaluation_free_text_fallback() {
        let response = "Score: 75\nStrengths: good flow";
        let result = parse_evaluation(response).unwrap();
        assert_eq!(result.score, 75.0);
        assert_eq!(result.narrative, response);
    }

    #[test]
    fn test_parse_evaluation_without_score_is_malformed() {
        assert!(matches!(
            parse_evaluation("Nice work!"),
            Err(ProviderError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_explanation_is_truncated_and_clamped() {
        let phrases = (0..10)
            .map(|i| LlmPhraseImpact {
                phrase: format!("p{}", i),
                impact: 2.0,
            })
            .collect();
        let explanation = explanation_from_phrases(phrases);
        assert_eq!(explanation.important_phrases.len(), MAX_EXPLANATION_PHRASES);
        assert!(explanation.impact_scores.iter().all(|s| *s == 1.0));
    }

    #[test]
    fn test_translation_prompt_names_source_language() {
        let prompt = translation_prompt("en", "Hindi", "Good work");
        assert!(prompt.starts_with("Translate the following teacher feedback from English to Hindi."));

        let prompt = translation_prompt("ta", "Telugu", "Nalla");
        assert!(prompt.contains("from Tamil to Telugu"));

        let prompt = translation_prompt("fr", "Hindi", "Bon travail");
        assert!(prompt.contains("from fr to Hindi"));
        assert!(prompt.ends_with("Bon travail"));
    }

    #[test]
    fn test_translation_languages() {
        let mut languages: Vec<_> = TextEvaluator::translation_languages().collect();
        languages.sort();
        assert_eq!(languages, vec!["hi", "ta", "te"]);
    }

    #[test]
    fn test_missing_api_key_fails_initialization() {
        let config = Config::default();
        assert!(matches!(
            TextEvaluator::new(&config),
            Err(ProviderError::Unavailable(_))
        ));
    }
}
