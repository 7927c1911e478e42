//! Continuous capture feed
//!
//! Owns the microphone lifecycle: calibrates once, then hands each finalized
//! utterance to the assistant. Transcription failures are dropped, never
//! fatal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::assistant::Assistant;
use crate::voice::{AudioCapture, SAMPLE_RATE, Transcriber, UtteranceSegmenter, samples_to_wav};
use crate::Result;

/// Poll cadence for draining the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ambient-noise calibration window at startup
const CALIBRATION_WINDOW: Duration = Duration::from_secs(1);

/// A finalized recognized utterance
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Recognized text
    pub text: String,
    /// Arrival timestamp
    pub heard_at: chrono::DateTime<chrono::Utc>,
}

impl Utterance {
    /// Create an utterance stamped with the current time
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            heard_at: chrono::Utc::now(),
        }
    }
}

/// Continuous microphone capture and transcription driver
pub struct CaptureFeed {
    capture: AudioCapture,
    segmenter: UtteranceSegmenter,
    transcriber: Arc<dyn Transcriber>,
    assistant: Arc<Assistant>,
}

impl CaptureFeed {
    /// Create a new capture feed
    ///
    /// # Errors
    ///
    /// Returns error if the capture device cannot be opened; this is the
    /// startup-time fatal class.
    pub fn new(transcriber: Arc<dyn Transcriber>, assistant: Arc<Assistant>) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::new()?,
            segmenter: UtteranceSegmenter::new(),
            transcriber,
            assistant,
        })
    }

    /// Run the capture loop until a shutdown signal arrives
    ///
    /// Runs on the caller's task: cpal streams are not Send. One utterance is
    /// transcribed and routed at a time; the capture callback keeps
    /// accumulating audio meanwhile.
    ///
    /// # Errors
    ///
    /// Returns error only if the capture stream fails to start.
    #[allow(clippy::future_not_send)]
    pub async fn run(mut self, shutdown_rx: &mut mpsc::Receiver<()>) -> Result<()> {
        self.capture.start()?;

        // One-time ambient noise calibration
        tokio::time::sleep(CALIBRATION_WINDOW).await;
        let ambient = self.capture.take_buffer();
        self.segmenter.calibrate(&ambient);

        tracing::info!("microphone active, listening");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("capture feed shutdown requested");
                    break;
                }
                () = tokio::time::sleep(POLL_INTERVAL) => {
                    self.drain_and_route().await;
                }
            }
        }

        self.capture.stop();
        Ok(())
    }

    /// Drain captured samples and route any finalized utterance
    async fn drain_and_route(&mut self) {
        let samples = self.capture.take_buffer();
        if samples.is_empty() {
            return;
        }

        let Some(segment) = self.segmenter.push(&samples) else {
            return;
        };

        let wav = match samples_to_wav(&segment, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "WAV encoding failed, dropping segment");
                return;
            }
        };

        match self.transcriber.transcribe(&wav).await {
            Ok(text) if !text.is_empty() => {
                self.assistant.handle_utterance(Utterance::new(text)).await;
            }
            Ok(_) => tracing::trace!("empty transcript, dropped"),
            Err(e) => {
                // Treated as "no utterance produced"
                tracing::warn!(error = %e, "transcription failed, dropping segment");
            }
        }
    }
}
