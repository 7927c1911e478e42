//! Voice processing
//!
//! Microphone capture, utterance segmentation, STT/TTS clients, playback,
//! and the serialized speech output path.

mod capture;
mod feed;
mod playback;
mod segmenter;
mod speaker;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use feed::{CaptureFeed, Utterance};
pub use playback::{AudioPlayback, AudioSink, NullSink};
pub use segmenter::{SegmenterState, UtteranceSegmenter};
pub use speaker::Speaker;
pub use stt::{GroqWhisper, Transcriber};
pub use tts::{OpenAiSpeech, Synthesizer};
