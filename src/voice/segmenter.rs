//! Energy-based utterance segmentation
//!
//! Splits the continuous capture stream into finalized utterances: speech
//! starts when the RMS energy rises above the calibrated ambient threshold
//! and ends after enough trailing silence. Wake-word gating happens on the
//! transcript, not here.

/// Fallback energy threshold before calibration
const DEFAULT_THRESHOLD: f32 = 0.03;

/// Headroom multiplier over the measured ambient energy
const AMBIENT_HEADROOM: f32 = 2.5;

/// Minimum speech length for a valid utterance (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that finalizes an utterance (0.5s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Hard cap on a single utterance (10s at 16kHz)
const MAX_SEGMENT_SAMPLES: usize = 160_000;

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Accumulating a speech segment
    Speech,
}

/// Segments raw audio into utterances by energy
pub struct UtteranceSegmenter {
    threshold: f32,
    state: SegmenterState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSegmenter {
    /// Create a segmenter with the default threshold
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            state: SegmenterState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Calibrate the speech threshold from ambient-noise samples
    ///
    /// Done once at capture start, before any speech is expected.
    pub fn calibrate(&mut self, ambient: &[f32]) {
        let ambient_energy = rms_energy(ambient);
        self.threshold = (ambient_energy * AMBIENT_HEADROOM).max(DEFAULT_THRESHOLD);
        tracing::debug!(
            ambient_energy,
            threshold = self.threshold,
            "segmenter calibrated"
        );
    }

    /// Feed captured samples; returns a finalized utterance segment when
    /// speech has been followed by enough silence
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        let is_speech = rms_energy(samples) > self.threshold;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speech;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!("speech started");
                }
                None
            }
            SegmenterState::Speech => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                let long_enough = self.speech_buffer.len() > MIN_SPEECH_SAMPLES;
                let silence_done = self.silence_counter > SILENCE_SAMPLES;
                let capped = self.speech_buffer.len() >= MAX_SEGMENT_SAMPLES;

                if (silence_done && long_enough) || capped {
                    let segment = std::mem::take(&mut self.speech_buffer);
                    self.reset();
                    tracing::debug!(samples = segment.len(), "utterance segment complete");
                    return Some(segment);
                }

                // Too much silence without enough speech: a click, not a phrase
                if silence_done && !long_enough {
                    self.reset();
                }
                None
            }
        }
    }

    /// Reset to idle, discarding any partial segment
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }
}

/// RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
