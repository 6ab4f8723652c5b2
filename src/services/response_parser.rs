//! LLM 响应解析
//!
//! 生成式后端的返回并不总是规范的 JSON：可能包在 ```json 代码块里，
//! 可能带前后说明文字。这里集中处理这些情况。

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::CodeSnippet;

fn json_object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("JSON 对象正则非法"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("数字正则非法"))
}

fn list_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s*").expect("列表标记正则非法"))
}

/// 从响应中取出第一个 `{` 到最后一个 `}` 之间的内容
pub fn extract_json_object(response: &str) -> Option<&str> {
    json_object_regex().find(response).map(|m| m.as_str())
}

/// 把响应解析为指定类型的 JSON 对象
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Option<T> {
    let candidate = extract_json_object(response)?;
    match serde_json::from_str(candidate) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("JSON 解析失败: {} (响应: {})", e, candidate);
            None
        }
    }
}

/// 提取响应中的第一个数字
pub fn parse_first_number(response: &str) -> Option<f64> {
    number_regex()
        .find(response.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// 把多行文本拆成条目，去掉列表标记和空行
pub fn split_list_items(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| list_marker_regex().replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// 解析示例代码片段
///
/// 约定格式：
/// ```text
/// Title: ...
/// Description: ...
/// ```python
/// ...
/// ```
/// ```
pub fn parse_code_snippets(response: &str) -> Vec<CodeSnippet> {
    let mut snippets = Vec::new();
    let mut current: Option<CodeSnippet> = None;
    let mut code_lines: Option<Vec<&str>> = None;

    for line in response.lines() {
        let trimmed = line.trim();

        if let Some(lines) = code_lines.as_mut() {
            if trimmed.starts_with("```") {
                let code = lines.join("\n");
                if let Some(snippet) = current.as_mut() {
                    snippet.code = Some(code);
                }
                code_lines = None;
            } else {
                lines.push(line);
            }
            continue;
        }

        if let Some(title) = trimmed.strip_prefix("Title:") {
            if let Some(done) = current.take() {
                snippets.push(done);
            }
            current = Some(CodeSnippet {
                title: title.trim().to_string(),
                ..Default::default()
            });
        } else if let Some(description) = trimmed.strip_prefix("Description:") {
            if let Some(snippet) = current.as_mut() {
                snippet.description = Some(description.trim().to_string());
            }
        } else if trimmed.starts_with("```") {
            code_lines = Some(Vec::new());
        }
    }

    if let Some(done) = current {
        snippets.push(done);
    }

    snippets
}
