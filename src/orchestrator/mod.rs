//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ### `batch_processor` - 批量评估处理器
//! - 管理应用生命周期（初始化、运行）
//! - 读取提交清单（`SubmissionManifest`）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<ManifestEntry>)
//!     ↓
//! workflow::SubmissionRouter / FeedbackPostProcessor (处理单个提交)
//!     ↓
//! providers + services (能力层：文本 / 代码 / 手写 / 语音)
//!     ↓
//! infrastructure (基础设施：ServiceRegistry)
//! ```

pub mod batch_processor;

pub use batch_processor::App;
