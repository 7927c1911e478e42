//! Assistant orchestration
//!
//! Wake-word gating in front of the intent router. Utterances arrive here
//! from both the microphone capture feed and connected WebSocket clients;
//! gating and session state are shared across both sources.

use std::sync::Arc;

use crate::router::IntentRouter;
use crate::server::{ClientRegistry, StatusState};
use crate::session::SessionState;
use crate::voice::{Speaker, Utterance};

/// Spoken acknowledgment for a bare wake word
const WAKE_ACK: &str = "Ja?";

/// Filler characters trimmed around the wake token
const FILLER: [char; 5] = [' ', ',', '.', '!', '?'];

/// Wake-gated front end to the intent router
pub struct Assistant {
    session: SessionState,
    router: IntentRouter,
    speaker: Arc<Speaker>,
    registry: Arc<ClientRegistry>,
    wake_word: String,
}

impl Assistant {
    #[must_use]
    pub fn new(
        router: IntentRouter,
        speaker: Arc<Speaker>,
        registry: Arc<ClientRegistry>,
        wake_word: String,
    ) -> Self {
        Self {
            session: SessionState::new(),
            router,
            speaker,
            registry,
            wake_word: wake_word.to_lowercase(),
        }
    }

    /// Session handle, mostly for tests
    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Gate, route, and speak one utterance
    ///
    /// Utterances without the wake token are dropped unless the session is
    /// already awake; an armed session routes the whole utterance as-is.
    /// Only an utterance that is nothing but the wake word arms the session
    /// and acknowledges; anything routed resets the session afterwards
    /// (single-shot).
    pub async fn handle_utterance(self: &Arc<Self>, utterance: Utterance) {
        let text = utterance.text.trim();
        if text.is_empty() {
            return;
        }

        let command = if self.session.is_awake() {
            text
        } else if let Some((start, end)) = find_wake_span(text, &self.wake_word) {
            let after = text[end..].trim_matches(FILLER);
            if !after.is_empty() {
                after
            } else if text[..start].trim_matches(FILLER).is_empty() {
                "" // bare wake word
            } else {
                // Wake token trails the utterance ("mach das licht an,
                // pixel"); route everything, not the empty remainder.
                text
            }
        } else {
            tracing::debug!(text, "ignoring utterance without wake word");
            return;
        };

        if command.is_empty() {
            self.session.wake();
            self.registry
                .broadcast_status(StatusState::Listening, "Listening...")
                .await;
            tracing::info!("wake word detected, session armed");
            drop(self.speaker.speak(WAKE_ACK));
            return;
        }

        tracing::info!(command, "routing utterance");
        self.registry
            .broadcast_status(StatusState::Processing, command)
            .await;

        let response = self.router.route(command).await;
        self.session.sleep();

        drop(self.speaker.speak(response));
    }
}

/// Byte span of the first wake-word occurrence, matched case-insensitively
/// on char boundaries
fn find_wake_span(text: &str, wake_word: &str) -> Option<(usize, usize)> {
    let lower = text.to_lowercase();
    // Lowercasing can change byte lengths (ß, İ), so re-derive the offsets
    // from char counts instead of reusing the lowered index directly.
    let char_start = lower.find(wake_word).map(|b| lower[..b].chars().count())?;
    let wake_chars = wake_word.chars().count();

    let byte_at = |chars: usize| {
        text.char_indices()
            .nth(chars)
            .map_or(text.len(), |(i, _)| i)
    };
    Some((byte_at(char_start), byte_at(char_start + wake_chars)))
}
