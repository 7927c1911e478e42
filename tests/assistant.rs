//! Wake-word gating and speech serialization tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use pixel_core::Assistant;
use pixel_core::Result;
use pixel_core::router::IntentRouter;
use pixel_core::server::{ClientRegistry, StatusState, WsOutgoing};
use pixel_core::services::ChatService;
use pixel_core::skills::TimerScheduler;
use pixel_core::voice::{AudioSink, NullSink, Speaker, Synthesizer, Utterance};

struct EchoChat;

#[async_trait]
impl ChatService for EchoChat {
    async fn complete(&self, _system_prompt: &str, user_text: &str) -> Result<String> {
        Ok(format!("LLM: {user_text}"))
    }
}

/// Synthesizer mock producing a fixed tiny artifact
struct FakeTts;

#[async_trait]
impl Synthesizer for FakeTts {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        Ok(vec![0u8; 16])
    }
}

/// Sink that takes a while, exaggerating any overlap window
struct SlowSink;

impl AudioSink for SlowSink {
    fn play(&self, _mp3_data: &[u8]) -> Result<()> {
        std::thread::sleep(Duration::from_millis(100));
        Ok(())
    }
}

/// Wire an assistant whose only collaborator is the echo chat
fn assistant_fixture(registry: &Arc<ClientRegistry>) -> Arc<Assistant> {
    let speaker = Arc::new(Speaker::new(None, Arc::new(NullSink), Arc::clone(registry)));
    let timer = Arc::new(TimerScheduler::new(Arc::clone(&speaker)));

    let router = IntentRouter::new(
        timer,
        Arc::clone(registry),
        None,
        Some(Arc::new(EchoChat)),
        None,
        None,
        "Berlin".to_string(),
    );

    Arc::new(Assistant::new(
        router,
        speaker,
        Arc::clone(registry),
        "pixel".to_string(),
    ))
}

/// Drain everything currently queued for a client
async fn drain(rx: &mut mpsc::Receiver<WsOutgoing>) -> Vec<WsOutgoing> {
    // Give detached speak tasks a moment to run to completion
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn states(events: &[WsOutgoing]) -> Vec<StatusState> {
    events
        .iter()
        .filter_map(|e| match e {
            WsOutgoing::Status { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn utterance_without_wake_word_is_dropped() {
    let registry = Arc::new(ClientRegistry::new());
    let assistant = assistant_fixture(&registry);

    let (tx, mut rx) = mpsc::channel(32);
    registry.register(Uuid::new_v4(), "Windows", tx).await;

    assistant
        .handle_utterance(Utterance::new("wie spät ist es"))
        .await;

    assert!(drain(&mut rx).await.is_empty());
    assert!(!assistant.session().is_awake());
}

#[tokio::test]
async fn bare_wake_word_arms_without_dispatching() {
    let registry = Arc::new(ClientRegistry::new());
    let assistant = assistant_fixture(&registry);

    let (tx, mut rx) = mpsc::channel(32);
    registry.register(Uuid::new_v4(), "Windows", tx).await;

    assistant.handle_utterance(Utterance::new("Pixel")).await;

    assert!(assistant.session().is_awake());

    let observed = states(&drain(&mut rx).await);
    assert!(observed.contains(&StatusState::Listening), "got: {observed:?}");
    // No routing happened, so no processing event
    assert!(!observed.contains(&StatusState::Processing), "got: {observed:?}");
}

#[tokio::test]
async fn armed_session_routes_once_then_resets() {
    let registry = Arc::new(ClientRegistry::new());
    let assistant = assistant_fixture(&registry);

    let (tx, mut rx) = mpsc::channel(32);
    registry.register(Uuid::new_v4(), "Windows", tx).await;

    assistant.handle_utterance(Utterance::new("Pixel")).await;
    assert!(assistant.session().is_awake());
    drain(&mut rx).await;

    // No wake token needed while armed
    assistant
        .handle_utterance(Utterance::new("erzähl mir was"))
        .await;

    assert!(!assistant.session().is_awake());
    let observed = states(&drain(&mut rx).await);
    assert!(observed.contains(&StatusState::Processing), "got: {observed:?}");

    // Single-shot: the next bare utterance is ignored again
    assistant
        .handle_utterance(Utterance::new("und noch was"))
        .await;
    assert!(drain(&mut rx).await.is_empty());
}

#[tokio::test]
async fn wake_word_with_trailing_command_routes_immediately() {
    let registry = Arc::new(ClientRegistry::new());
    let assistant = assistant_fixture(&registry);

    let (tx, mut rx) = mpsc::channel(32);
    registry.register(Uuid::new_v4(), "Windows", tx).await;

    assistant
        .handle_utterance(Utterance::new("Pixel, erzähl mir einen Witz"))
        .await;

    // Routed in one turn, never left armed
    assert!(!assistant.session().is_awake());
    let events = drain(&mut rx).await;
    let observed = states(&events);
    assert!(observed.contains(&StatusState::Processing), "got: {observed:?}");

    // The wake token and its punctuation are stripped before routing
    let processing_text = events.iter().find_map(|e| match e {
        WsOutgoing::Status {
            state: StatusState::Processing,
            text,
        } => Some(text.clone()),
        _ => None,
    });
    assert_eq!(processing_text.as_deref(), Some("erzähl mir einen Witz"));
}

#[tokio::test]
async fn trailing_wake_word_routes_the_whole_utterance() {
    let registry = Arc::new(ClientRegistry::new());
    let assistant = assistant_fixture(&registry);

    let (tx, mut rx) = mpsc::channel(32);
    registry.register(Uuid::new_v4(), "Windows", tx).await;

    // Wake token at the end must not be mistaken for a bare wake word
    assistant
        .handle_utterance(Utterance::new("Mach das Licht an, Pixel"))
        .await;

    assert!(!assistant.session().is_awake());
    let events = drain(&mut rx).await;
    let processing_text = events.iter().find_map(|e| match e {
        WsOutgoing::Status {
            state: StatusState::Processing,
            text,
        } => Some(text.clone()),
        _ => None,
    });
    assert_eq!(processing_text.as_deref(), Some("Mach das Licht an, Pixel"));
}

#[tokio::test]
async fn armed_session_routes_text_containing_the_wake_word() {
    let registry = Arc::new(ClientRegistry::new());
    let assistant = assistant_fixture(&registry);

    let (tx, mut rx) = mpsc::channel(32);
    registry.register(Uuid::new_v4(), "Windows", tx).await;

    assistant.handle_utterance(Utterance::new("Pixel")).await;
    assert!(assistant.session().is_awake());
    drain(&mut rx).await;

    // While armed, the wake token is just text: the utterance routes as-is
    // instead of re-arming the session
    assistant
        .handle_utterance(Utterance::new("was ist pixel"))
        .await;

    assert!(!assistant.session().is_awake());
    let events = drain(&mut rx).await;
    let processing_text = events.iter().find_map(|e| match e {
        WsOutgoing::Status {
            state: StatusState::Processing,
            text,
        } => Some(text.clone()),
        _ => None,
    });
    assert_eq!(processing_text.as_deref(), Some("was ist pixel"));
}

#[tokio::test]
async fn concurrent_speech_never_interleaves() {
    let registry = Arc::new(ClientRegistry::new());
    let speaker = Arc::new(Speaker::new(
        Some(Arc::new(FakeTts)),
        Arc::new(SlowSink),
        Arc::clone(&registry),
    ));

    let (tx, mut rx) = mpsc::channel(64);
    registry.register(Uuid::new_v4(), "Windows", tx).await;

    let a = speaker.speak("A");
    let b = speaker.speak("B");
    let (ra, rb) = tokio::join!(a, b);
    ra.unwrap();
    rb.unwrap();

    let observed = states(&drain(&mut rx).await);
    assert_eq!(observed.len(), 4, "got: {observed:?}");

    // Full playback of one completes before the other begins: the state
    // sequence never shows two speaking events without an idle between
    let mut previous = None;
    for state in &observed {
        if *state == StatusState::Speaking {
            assert_ne!(previous, Some(StatusState::Speaking), "got: {observed:?}");
        }
        previous = Some(*state);
    }
    assert_eq!(
        observed.iter().filter(|s| **s == StatusState::Speaking).count(),
        2
    );
}
