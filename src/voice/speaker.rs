//! Serialized speech output
//!
//! Any task may request speech; at most one utterance is synthesized and
//! played at a time. Callers never block.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::server::{ClientRegistry, StatusState};
use crate::voice::{AudioSink, Synthesizer};

/// Speech output serializer
///
/// Holds the single output gate: `speaking`/`idle` status broadcasts and the
/// synthesize-then-play sequence all happen inside it, so status events from
/// concurrent callers can never interleave.
pub struct Speaker {
    gate: Mutex<()>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    sink: Arc<dyn AudioSink>,
    registry: Arc<ClientRegistry>,
}

impl Speaker {
    /// Create a new speaker
    ///
    /// Without a synthesizer (no TTS credential) speech requests still
    /// broadcast status transitions but produce no audio.
    #[must_use]
    pub fn new(
        synthesizer: Option<Arc<dyn Synthesizer>>,
        sink: Arc<dyn AudioSink>,
        registry: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            gate: Mutex::new(()),
            synthesizer,
            sink,
            registry,
        }
    }

    /// Queue text to be spoken; returns immediately
    ///
    /// Concurrent requests queue behind the output gate. The returned handle
    /// may be awaited (tests) or dropped (fire-and-forget).
    pub fn speak(self: &Arc<Self>, text: impl Into<String>) -> JoinHandle<()> {
        let speaker = Arc::clone(self);
        let text = text.into();

        tokio::spawn(async move {
            let _guard = speaker.gate.lock().await;

            speaker
                .registry
                .broadcast_status(StatusState::Speaking, &text)
                .await;

            if let Err(e) = speaker.say(&text).await {
                tracing::error!(error = %e, "speech output failed");
            }

            // Idle must go out even when synthesis or playback failed
            speaker
                .registry
                .broadcast_status(StatusState::Idle, "")
                .await;
        })
    }

    /// Synthesize and play one utterance to completion
    async fn say(&self, text: &str) -> crate::Result<()> {
        let Some(synthesizer) = &self.synthesizer else {
            tracing::debug!(text, "no synthesizer configured, skipping audio");
            return Ok(());
        };

        // The MP3 buffer is the only transient artifact; it is dropped when
        // this scope ends, on the failure path included.
        let audio = synthesizer.synthesize(text).await?;

        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.play(&audio))
            .await
            .map_err(|e| crate::Error::Audio(format!("playback task failed: {e}")))??;

        Ok(())
    }
}
