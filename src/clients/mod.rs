pub mod llm_client;
pub mod speech_client;

pub use llm_client::{image_data_url, LlmClient};
pub use speech_client::{SpeechClient, TranscriptionResponse, VoiceInfo};
