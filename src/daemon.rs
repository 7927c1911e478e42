//! Daemon orchestration
//!
//! Wires configuration into the assistant, speaker, skills, and server,
//! then drives the microphone capture loop until shutdown.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::assistant::Assistant;
use crate::config::{Config, DEFAULT_CHAT_MODEL};
use crate::router::IntentRouter;
use crate::server::{ApiServer, ClientRegistry, ServerState};
use crate::services::{
    ChatService, DuckDuckGoSearch, GroqChat, OpenWeather, SearchService, WeatherService,
};
use crate::skills::{CameraManager, HttpDetector, HttpFrameSource, TimerScheduler};
use crate::voice::{
    AudioPlayback, AudioSink, CaptureFeed, GroqWhisper, NullSink, OpenAiSpeech, Speaker,
    Synthesizer, Transcriber,
};
use crate::{Error, Result};

/// Greeting spoken once the daemon is fully wired
const READY_PHRASE: &str = "Pixel ist bereit.";

/// The assistant daemon
pub struct Daemon {
    config: Config,
    port: u16,
}

impl Daemon {
    #[must_use]
    pub fn new(config: Config, port: u16) -> Self {
        Self { config, port }
    }

    /// Run the daemon until Ctrl+C
    ///
    /// The capture loop runs on the calling task; audio streams cannot move
    /// between threads, so everything else is spawned around it.
    ///
    /// # Errors
    ///
    /// Returns error if the server port cannot be bound or the capture loop
    /// fails irrecoverably.
    pub async fn run(self) -> Result<()> {
        let registry = Arc::new(ClientRegistry::new());

        // Speakers are optional hardware; a headless box still serves clients
        let sink: Arc<dyn AudioSink> = match AudioPlayback::new() {
            Ok(playback) => Arc::new(playback),
            Err(e) => {
                tracing::warn!(error = %e, "no audio output, responses will be silent");
                Arc::new(NullSink)
            }
        };

        let synthesizer: Option<Arc<dyn Synthesizer>> = match &self.config.api_keys.openai {
            Some(key) => Some(Arc::new(OpenAiSpeech::new(
                key.clone(),
                self.config.voice.tts_model.clone(),
                self.config.voice.tts_voice.clone(),
                self.config.voice.tts_speed,
            )?)),
            None => {
                tracing::warn!("OPENAI_API_KEY missing, speech synthesis disabled");
                None
            }
        };

        let speaker = Arc::new(Speaker::new(
            synthesizer,
            Arc::clone(&sink),
            Arc::clone(&registry),
        ));
        let timer = Arc::new(TimerScheduler::new(Arc::clone(&speaker)));

        let camera = match &self.config.camera {
            Some(cfg) => {
                let source = Arc::new(HttpFrameSource::new(cfg.source_url.clone())?);
                let detector = Arc::new(HttpDetector::new(cfg.inference_url.clone())?);
                Some(Arc::new(CameraManager::new(source, detector)))
            }
            None => None,
        };

        let chat: Option<Arc<dyn ChatService>> = match &self.config.api_keys.groq {
            Some(key) => Some(Arc::new(GroqChat::new(
                key.clone(),
                DEFAULT_CHAT_MODEL.to_string(),
            )?)),
            None => None,
        };

        let weather: Option<Arc<dyn WeatherService>> = match &self.config.api_keys.openweather {
            Some(key) => Some(Arc::new(OpenWeather::new(
                key.clone(),
                self.config.voice.language.clone(),
            )?)),
            None => None,
        };

        let search: Option<Arc<dyn SearchService>> = Some(Arc::new(DuckDuckGoSearch::new()?));

        let router = IntentRouter::new(
            Arc::clone(&timer),
            Arc::clone(&registry),
            camera.clone(),
            chat,
            weather,
            search,
            self.config.default_city.clone(),
        );

        let assistant = Arc::new(Assistant::new(
            router,
            Arc::clone(&speaker),
            Arc::clone(&registry),
            self.config.wake_word.clone(),
        ));

        let state = Arc::new(ServerState {
            registry: Arc::clone(&registry),
            assistant: Arc::clone(&assistant),
            camera,
        });
        let server_handle = ApiServer::new(self.port, state).spawn();

        // Shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        drop(speaker.speak(READY_PHRASE));

        if self.config.voice.enabled {
            match self.build_capture_feed(&assistant) {
                Ok(feed) => {
                    feed.run(&mut shutdown_rx).await?;
                }
                Err(Error::Config(msg)) => {
                    // Missing credential is not fatal; a dead capture device is
                    tracing::warn!(%msg, "voice capture disabled, serving clients only");
                    shutdown_rx.recv().await;
                }
                Err(e) => return Err(e),
            }
        } else {
            tracing::info!("voice disabled, serving clients only");
            shutdown_rx.recv().await;
        }

        server_handle.abort();
        tracing::info!("daemon stopped");
        Ok(())
    }

    /// Wire the microphone feed, requiring a transcription credential
    fn build_capture_feed(&self, assistant: &Arc<Assistant>) -> Result<CaptureFeed> {
        let key = self
            .config
            .api_keys
            .groq
            .as_ref()
            .ok_or_else(|| Error::Config("GROQ_API_KEY required for transcription".to_string()))?;

        let transcriber: Arc<dyn Transcriber> = Arc::new(GroqWhisper::new(
            key.clone(),
            self.config.voice.stt_model.clone(),
            self.config.voice.language.clone(),
        )?);

        CaptureFeed::new(transcriber, Arc::clone(assistant))
    }
}
