//! 手写识别服务 - 业务能力层
//!
//! 图片先经过 [`image_preprocess`](super::image_preprocess) 二值化，再交给视觉模型转写，
//! 最后按科目做符号纠正。

use async_trait::async_trait;
use image::{GrayImage, Luma};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::clients::{image_data_url, LlmClient};
use crate::config::Config;
use crate::error::ProviderError;
use crate::models::{normalize_confidence, RecognitionResult, Subject};
use crate::providers::{HandwritingRecognition, ProviderResult};
use crate::services::image_preprocess::{self, preprocess_gray};
use crate::services::response_parser::parse_json_response;

const BACKEND: &str = "vision-ocr";

const OCR_SYSTEM_PROMPT: &str = "You transcribe handwritten student work exactly as written. \
Do not correct mistakes. Respond only with JSON: {\"text\": \"...\", \"confidence\": 0-100}";

#[derive(Debug, Deserialize)]
struct OcrResponse {
    text: String,
    /// 0-100
    #[serde(default)]
    confidence: f64,
}

/// 手写识别服务
pub struct HandwritingRecognizer {
    llm: LlmClient,
}

impl HandwritingRecognizer {
    /// 创建手写识别服务，缺少 API key 时初始化失败
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        if config.llm_api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable(
                "未配置 OPENAI_API_KEY".to_string(),
            ));
        }

        Ok(Self {
            llm: LlmClient::with_model(config, config.vision_model_name.clone()),
        })
    }
}

#[async_trait]
impl HandwritingRecognition for HandwritingRecognizer {
    async fn recognize(&self, image: &[u8], subject: Option<&str>) -> ProviderResult<RecognitionResult> {
        let preprocessed = image_preprocess::preprocess(image)?;
        let png = preprocessed.to_png()?;

        debug!(
            "手写图片预处理完成: {}x{}, 阈值邻域 {}",
            preprocessed.image.width(),
            preprocessed.image.height(),
            preprocessed.params.threshold_block_size
        );

        let response = self
            .llm
            .chat_with_images(
                "Transcribe the handwriting in this image.",
                Some(OCR_SYSTEM_PROMPT),
                &[image_data_url(&png, "image/png")],
                0.0,
            )
            .await
            .map_err(|e| ProviderError::backend(BACKEND, e))?;

        let ocr: OcrResponse = parse_json_response(&response)
            .ok_or_else(|| ProviderError::malformed(BACKEND, format!("无法解析识别结果: {}", response)))?;

        let text = match subject.and_then(Subject::from_str) {
            Some(subject) => subject.post_process(&ocr.text),
            None => ocr.text.split_whitespace().collect::<Vec<_>>().join(" "),
        };

        let mut result = RecognitionResult::new(text, normalize_confidence(ocr.confidence / 100.0))
            .with_auxiliary("raw_confidence", ocr.confidence)
            .with_auxiliary("preprocessing", json!(preprocessed.debug_info));
        if let Some(subject) = subject {
            result = result.with_auxiliary("subject", subject.to_string());
        }

        Ok(result)
    }

    /// 本地预处理一张合成图片，不访问网络
    async fn probe(&self) -> ProviderResult<()> {
        let sample = GrayImage::from_fn(16, 16, |x, _| {
            if x % 4 == 0 {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        preprocess_gray(sample).to_png().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        Config {
            llm_api_key: "test-key".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_missing_api_key_fails_initialization() {
        assert!(matches!(
            HandwritingRecognizer::new(&Config::default()),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_runs_locally() {
        let recognizer = HandwritingRecognizer::new(&configured()).unwrap();
        assert!(recognizer.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_undecodable_image_is_invalid_input() {
        let recognizer = HandwritingRecognizer::new(&configured()).unwrap();
        let result = recognizer.recognize(b"not an image", Some("mathematics")).await;
        assert!(matches!(result, Err(ProviderError::InvalidInput(_))));
    }

    #[test]
    fn test_ocr_response_parsing() {
        let parsed: OcrResponse =
            parse_json_response(r#"{"text": "2 x 3 = 6", "confidence": 87}"#).unwrap();
        assert_eq!(parsed.confidence, 87.0);
        assert_eq!(Subject::Mathematics.post_process(&parsed.text), "2 × 3 = 6");
    }
}
