/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的提交数量
    pub max_concurrent_submissions: usize,
    /// 批量提交清单路径
    pub submissions_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 反馈的源语言
    pub source_language: String,
    // --- LLM 配置（文本评估 / 翻译 / 代码评估 / 手写 OCR） ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 手写 OCR 使用的视觉模型
    pub vision_model_name: String,
    // --- 语音转写配置 ---
    pub speech_api_key: String,
    pub speech_api_base_url: String,
    pub transcription_model: String,
    // --- 语音合成配置 ---
    pub tts_api_key: String,
    pub tts_api_base_url: String,
    pub tts_model: String,
    // --- 音频缓存 ---
    pub audio_cache_dir: String,
    pub audio_cache_max_age_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_submissions: 8,
            submissions_file: "submissions.toml".to_string(),
            verbose_logging: false,
            output_log_file: "grading_log.txt".to_string(),
            source_language: "en".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4".to_string(),
            vision_model_name: "gpt-4o".to_string(),
            speech_api_key: String::new(),
            speech_api_base_url: "https://api.openai.com/v1".to_string(),
            transcription_model: "whisper-1".to_string(),
            tts_api_key: String::new(),
            tts_api_base_url: "https://api.elevenlabs.io/v1".to_string(),
            tts_model: "eleven_monolingual_v1".to_string(),
            audio_cache_dir: "audio_cache".to_string(),
            audio_cache_max_age_hours: 24,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        let llm_api_key = std::env::var("OPENAI_API_KEY").unwrap_or(default.llm_api_key);
        Self {
            max_concurrent_submissions: std::env::var("MAX_CONCURRENT_SUBMISSIONS").ok().and_then(|v| v.parse().ok()).filter(|n| *n > 0).unwrap_or(default.max_concurrent_submissions),
            submissions_file: std::env::var("SUBMISSIONS_FILE").unwrap_or(default.submissions_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            source_language: std::env::var("SOURCE_LANGUAGE").unwrap_or(default.source_language),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            vision_model_name: std::env::var("VISION_MODEL_NAME").unwrap_or(default.vision_model_name),
            // 语音转写默认复用 OpenAI 凭证
            speech_api_key: std::env::var("SPEECH_API_KEY").unwrap_or_else(|_| llm_api_key.clone()),
            speech_api_base_url: std::env::var("SPEECH_API_BASE_URL").unwrap_or(default.speech_api_base_url),
            transcription_model: std::env::var("TRANSCRIPTION_MODEL").unwrap_or(default.transcription_model),
            tts_api_key: std::env::var("ELEVEN_LABS_API_KEY").unwrap_or(default.tts_api_key),
            tts_api_base_url: std::env::var("TTS_API_BASE_URL").unwrap_or(default.tts_api_base_url),
            tts_model: std::env::var("TTS_MODEL").unwrap_or(default.tts_model),
            audio_cache_dir: std::env::var("AUDIO_CACHE_DIR").unwrap_or(default.audio_cache_dir),
            audio_cache_max_age_hours: std::env::var("AUDIO_CACHE_MAX_AGE_HOURS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.audio_cache_max_age_hours),
            llm_api_key,
        }
    }
}
