//! 提交处理上下文
//!
//! 封装"我正在处理第几个请求、什么类型"这一信息

use std::fmt::Display;

use crate::models::SubmissionKind;

/// 提交处理上下文（仅用于日志）
#[derive(Debug, Clone, Copy)]
pub struct SubmissionCtx {
    /// 路由器内递增的请求编号
    pub request_id: u64,

    pub kind: SubmissionKind,
}

impl SubmissionCtx {
    pub fn new(request_id: u64, kind: SubmissionKind) -> Self {
        Self { request_id, kind }
    }
}

impl Display for SubmissionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[提交 #{} {}]", self.request_id, self.kind.as_str())
    }
}
