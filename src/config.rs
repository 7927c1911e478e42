//! Configuration management for Pixel core

/// Default wake word
pub const DEFAULT_WAKE_WORD: &str = "pixel";

/// Default city for weather queries without an "in <city>" phrase
pub const DEFAULT_CITY: &str = "Berlin";

/// Default Groq chat model
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default Groq Whisper model
pub const DEFAULT_STT_MODEL: &str = "whisper-large-v3-turbo";

/// Pixel core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Wake word that opens a conversational turn
    pub wake_word: String,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys for external services
    pub api_keys: ApiKeys,

    /// Fallback city for weather queries
    pub default_city: String,

    /// Camera subsystem configuration (absent = camera intents disabled)
    pub camera: Option<CameraConfig>,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone capture
    pub enabled: bool,

    /// STT model (Groq Whisper)
    pub stt_model: String,

    /// Spoken language passed to STT
    pub language: String,

    /// TTS model
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_model: DEFAULT_STT_MODEL.to_string(),
            language: "de".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "onyx".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Groq API key (Whisper STT and chat completions)
    pub groq: Option<String>,

    /// `OpenWeather` API key
    pub openweather: Option<String>,

    /// `OpenAI` API key (TTS)
    pub openai: Option<String>,
}

/// Camera subsystem configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Snapshot URL of the capture device (e.g. an IP camera)
    pub source_url: String,

    /// Object detection inference endpoint
    pub inference_url: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Missing API keys are not an error here; the affected intent handlers
    /// answer with a specific sentence instead.
    #[must_use]
    pub fn from_env() -> Self {
        let api_keys = ApiKeys {
            groq: env_nonempty("GROQ_API_KEY"),
            openweather: env_nonempty("OPENWEATHER_API_KEY"),
            openai: env_nonempty("OPENAI_API_KEY"),
        };

        let mut voice = VoiceConfig::default();
        if let Some(model) = env_nonempty("PIXEL_STT_MODEL") {
            voice.stt_model = model;
        }
        if let Some(model) = env_nonempty("PIXEL_TTS_MODEL") {
            voice.tts_model = model;
        }
        if let Some(v) = env_nonempty("PIXEL_TTS_VOICE") {
            voice.tts_voice = v;
        }
        if let Some(speed) = env_nonempty("PIXEL_TTS_SPEED").and_then(|s| s.parse().ok()) {
            voice.tts_speed = speed;
        }

        // Camera intents need both a frame source and an inference endpoint
        let camera = match (
            env_nonempty("PIXEL_CAMERA_URL"),
            env_nonempty("PIXEL_DETECT_URL"),
        ) {
            (Some(source_url), Some(inference_url)) => Some(CameraConfig {
                source_url,
                inference_url,
            }),
            _ => None,
        };

        Self {
            wake_word: env_nonempty("PIXEL_WAKE_WORD")
                .unwrap_or_else(|| DEFAULT_WAKE_WORD.to_string())
                .to_lowercase(),
            voice,
            api_keys,
            default_city: env_nonempty("DEFAULT_CITY")
                .unwrap_or_else(|| DEFAULT_CITY.to_string()),
            camera,
        }
    }
}

/// Read an environment variable, treating empty values as absent
fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
