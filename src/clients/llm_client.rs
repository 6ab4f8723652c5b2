//! LLM API 客户端
//!
//! 封装所有与生成式文本后端的交互
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use base64::Engine;
use tracing::{debug, warn};

use crate::config::Config;

/// LLM 客户端
///
/// 内部的 `Client` 可以在多个并发请求之间共享
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_tokens: u32,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        Self::with_model(config, config.llm_model_name.clone())
    }

    /// 创建使用指定模型的 LLM 客户端
    pub fn with_model(config: &Config, model_name: impl Into<String>) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: model_name.into(),
            max_tokens: 1024,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 发送纯文本聊天请求
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `temperature`: 采样温度，打分类请求使用 0
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（已 trim）
    pub async fn chat(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        temperature: f32,
    ) -> Result<String> {
        self.send(user_message, system_message, &[], temperature).await
    }

    /// 发送带图片的聊天请求（Vision API）
    ///
    /// `image_urls` 可以是 http(s) URL，也可以是 [`image_data_url`] 生成的 data URL
    pub async fn chat_with_images(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        image_urls: &[String],
        temperature: f32,
    ) -> Result<String> {
        self.send(user_message, system_message, image_urls, temperature)
            .await
    }

    async fn send(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        image_urls: &[String],
        temperature: f32,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        // 构建消息列表
        let mut messages = Vec::new();

        // 添加系统消息（如果提供）
        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        // 构建用户消息内容（支持图片）
        let user_msg = if image_urls.is_empty() {
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()?
        } else {
            let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                Vec::new();

            content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: user_message.to_string(),
                },
            ));

            for url in image_urls {
                content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: url.clone(),
                            detail: Some(ImageDetail::High),
                        },
                    },
                ));
            }

            debug!("使用 Vision API，包含 {} 张图片", image_urls.len());

            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(
                    content_parts,
                ))
                .build()?
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(temperature)
            .max_tokens(self.max_tokens)
            .build()?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

/// 把图片字节编码为 data URL，供 Vision API 使用
pub fn image_data_url(bytes: &[u8], mime: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
