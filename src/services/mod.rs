//! 业务能力层
//!
//! 四种能力的具体实现，外加它们共用的响应解析、图片预处理和音频缓存。

pub mod audio_cache;
pub mod audio_processor;
pub mod code_evaluator;
pub mod handwriting_recognizer;
pub mod image_preprocess;
pub mod response_parser;
pub mod text_evaluator;

pub use audio_cache::AudioCache;
pub use audio_processor::{prepare_text_for_tts, voice_id_for, AudioProcessor};
pub use code_evaluator::{CodeEvaluator, CodeMetrics};
pub use handwriting_recognizer::HandwritingRecognizer;
pub use image_preprocess::{PreprocessParams, PreprocessedImage};
pub use text_evaluator::TextEvaluator;
