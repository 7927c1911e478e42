//! Intent cascade integration tests
//!
//! Exercises the router against mock collaborators so no network, audio
//! hardware, or API keys are involved.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use pixel_core::router::IntentRouter;
use pixel_core::server::{ClientRegistry, WsOutgoing};
use pixel_core::services::{ChatService, SearchService, WeatherReport, WeatherService};
use pixel_core::skills::{CameraManager, Detection, FrameSource, ObjectDetector, TimerScheduler};
use pixel_core::voice::{AudioSink, NullSink, Speaker};
use pixel_core::{Error, Result};

/// Chat mock that echoes the prompt it was given
struct EchoChat;

#[async_trait]
impl ChatService for EchoChat {
    async fn complete(&self, _system_prompt: &str, user_text: &str) -> Result<String> {
        Ok(format!("LLM: {user_text}"))
    }
}

/// Weather mock with a fixed report, recording the queried city
struct FixedWeather {
    queried: Mutex<Vec<String>>,
}

impl FixedWeather {
    fn new() -> Self {
        Self {
            queried: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WeatherService for FixedWeather {
    async fn current(&self, city: &str) -> Result<WeatherReport> {
        self.queried.lock().await.push(city.to_string());
        Ok(WeatherReport {
            description: "leichter Regen".to_string(),
            temperature_celsius: 12,
        })
    }
}

/// Weather mock that always fails with a service error
struct BrokenWeather;

#[async_trait]
impl WeatherService for BrokenWeather {
    async fn current(&self, _city: &str) -> Result<WeatherReport> {
        Err(Error::Weather("city not found".to_string()))
    }
}

/// Search mock with canned titles, recording the residual query
struct FixedSearch {
    titles: Vec<String>,
    queried: Mutex<Vec<String>>,
}

impl FixedSearch {
    fn new(titles: Vec<&str>) -> Self {
        Self {
            titles: titles.into_iter().map(String::from).collect(),
            queried: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchService for FixedSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>> {
        self.queried.lock().await.push(query.to_string());
        Ok(self.titles.clone())
    }
}

/// Frame source producing a tiny fixed frame
struct FakeCamera;

#[async_trait]
impl FrameSource for FakeCamera {
    async fn grab(&self) -> Result<Vec<u8>> {
        Ok(vec![0xFF, 0xD8, 0xFF])
    }
}

/// Detector that always sees one person
struct FakeDetector;

#[async_trait]
impl ObjectDetector for FakeDetector {
    async fn detect(&self, _frame: &[u8]) -> Result<Vec<Detection>> {
        Ok(vec![Detection {
            label: "person".to_string(),
            confidence: 0.9,
        }])
    }
}

struct Fixture {
    router: IntentRouter,
    registry: Arc<ClientRegistry>,
    weather: Arc<FixedWeather>,
    search: Arc<FixedSearch>,
    camera: Option<Arc<CameraManager>>,
}

fn fixture_with_camera(with_camera: bool) -> Fixture {
    let registry = Arc::new(ClientRegistry::new());
    let sink: Arc<dyn AudioSink> = Arc::new(NullSink);
    let speaker = Arc::new(Speaker::new(None, sink, Arc::clone(&registry)));
    let timer = Arc::new(TimerScheduler::new(speaker));

    let weather = Arc::new(FixedWeather::new());
    let search = Arc::new(FixedSearch::new(vec!["Erstes Ergebnis", "Zweites"]));
    let camera = with_camera
        .then(|| Arc::new(CameraManager::new(Arc::new(FakeCamera), Arc::new(FakeDetector))));

    let router = IntentRouter::new(
        timer,
        Arc::clone(&registry),
        camera.clone(),
        Some(Arc::new(EchoChat)),
        Some(Arc::clone(&weather) as Arc<dyn WeatherService>),
        Some(Arc::clone(&search) as Arc<dyn SearchService>),
        "Berlin".to_string(),
    );

    Fixture {
        router,
        registry,
        weather,
        search,
        camera,
    }
}

fn fixture() -> Fixture {
    fixture_with_camera(false)
}

#[tokio::test]
async fn timer_with_duration_beats_time_query() {
    let f = fixture();

    // "uhr"-adjacent phrasing must still set a timer, never answer the clock
    for (text, expected) in [
        ("stelle einen timer für 5 minuten", "Timer für 5 minuten gestellt."),
        ("wecker für 1 minute bitte", "Timer für 1 minute gestellt."),
        ("timer 30 sekunden", "Timer für 30 sekunden gestellt."),
        ("countdown 2 stunden starten", "Timer für 2 stunden gestellt."),
        ("timer für 1 stunde", "Timer für 1 stunde gestellt."),
    ] {
        assert_eq!(f.router.route(text).await, expected, "input: {text}");
    }
}

#[tokio::test]
async fn oversized_timer_durations_are_rejected() {
    let f = fixture();

    // Digit run past u64::MAX fails to parse; a parseable amount whose
    // second count overflows is caught by the scheduler. Neither may
    // panic or schedule a zero-length timer.
    for text in [
        "timer für 18000000000000000000000 sekunden",
        "timer für 18000000000000000000 stunden",
    ] {
        assert_eq!(
            f.router.route(text).await,
            "Diese Dauer ist zu lang für einen Timer.",
            "input: {text}"
        );
    }
}

#[tokio::test]
async fn timer_keyword_without_duration_is_not_a_clock_query() {
    let f = fixture();

    // Falls through timer (no duration) and is excluded from the time rule,
    // landing at the LLM fallback
    let response = f.router.route("stelle einen timer").await;
    assert!(response.starts_with("LLM:"), "got: {response}");
}

#[tokio::test]
async fn time_query_reports_clock_weekday_and_date() {
    let f = fixture();
    let response = f.router.route("wie spät ist es").await;

    assert!(response.starts_with("Es ist "), "got: {response}");
    assert!(response.contains(" Uhr am "), "got: {response}");
    // dd.mm.YYYY date
    assert!(
        regex::Regex::new(r"\d{2}\.\d{2}\.\d{4}\.$")
            .unwrap()
            .is_match(&response),
        "got: {response}"
    );
}

#[tokio::test]
async fn stopwatch_start_then_stop() {
    let f = fixture();

    assert_eq!(f.router.route("stoppuhr start").await, "Stoppuhr gestartet.");

    let response = f.router.route("stoppuhr stopp").await;
    assert!(response.starts_with("Zeit: "), "got: {response}");
    assert!(response.contains("Sekunden"), "got: {response}");
}

#[tokio::test]
async fn stopwatch_stop_without_start() {
    let f = fixture();
    assert_eq!(
        f.router.route("stoppuhr stop").await,
        "Es läuft keine Stoppuhr."
    );
}

#[tokio::test]
async fn stopwatch_without_start_keyword_stops() {
    let f = fixture();

    // "stoppuhr" itself carries a stop keyword, so any phrasing without a
    // start keyword dispatches stop instead of cascading further
    for text in ["stoppuhr", "stoppuhr anhalten", "was ist eine stoppuhr wert"] {
        assert_eq!(
            f.router.route(text).await,
            "Es läuft keine Stoppuhr.",
            "input: {text}"
        );
    }

    assert_eq!(f.router.route("stoppuhr los").await, "Stoppuhr gestartet.");
    let response = f.router.route("stoppuhr").await;
    assert!(response.starts_with("Zeit: "), "got: {response}");
}

#[tokio::test]
async fn search_strips_trigger_and_lists_results() {
    let f = fixture();
    let response = f.router.route("suche nach der hauptstadt von frankreich").await;

    assert!(
        response.contains("'der hauptstadt von frankreich'"),
        "got: {response}"
    );
    assert!(response.contains("- Erstes Ergebnis"), "got: {response}");

    let queried = f.search.queried.lock().await;
    assert_eq!(queried.as_slice(), ["der hauptstadt von frankreich"]);
}

#[tokio::test]
async fn search_trigger_with_weather_word_routes_to_weather() {
    let f = fixture();
    let response = f.router.route("suche das wetter in Hamburg").await;

    assert!(response.starts_with("Das Wetter in Hamburg:"), "got: {response}");
    assert!(f.search.queried.lock().await.is_empty());
}

#[tokio::test]
async fn bare_search_trigger_falls_through_to_chat() {
    let f = fixture();
    let response = f.router.route("suche").await;
    assert!(response.starts_with("LLM:"), "got: {response}");
}

#[tokio::test]
async fn notification_reaches_only_the_targeted_device() {
    let f = fixture();

    let (pc_tx, mut pc_rx) = mpsc::channel::<WsOutgoing>(8);
    let (mobile_tx, mut mobile_rx) = mpsc::channel::<WsOutgoing>(8);
    f.registry.register(Uuid::new_v4(), "Windows NT", pc_tx).await;
    f.registry
        .register(Uuid::new_v4(), "Android Mobile", mobile_tx)
        .await;

    let response = f
        .router
        .route("sende eine benachrichtigung an pc: Kaffee ist fertig")
        .await;
    assert_eq!(response, "Benachrichtigung an PC gesendet.");

    match pc_rx.try_recv() {
        Ok(WsOutgoing::Notification { message }) => assert_eq!(message, "Kaffee ist fertig"),
        other => panic!("expected notification, got {other:?}"),
    }
    assert!(mobile_rx.try_recv().is_err());
}

#[tokio::test]
async fn notification_without_matching_device_reports_nobody() {
    let f = fixture();
    let response = f.router.route("benachrichtigung an pc: hallo").await;
    assert_eq!(response, "Kein PC verbunden.");
}

#[tokio::test]
async fn notification_without_message_uses_default() {
    let f = fixture();

    let (tx, mut rx) = mpsc::channel::<WsOutgoing>(8);
    f.registry.register(Uuid::new_v4(), "iPhone", tx).await;

    let response = f.router.route("sende eine benachrichtigung").await;
    assert_eq!(response, "Benachrichtigung an Mobile gesendet.");

    match rx.try_recv() {
        Ok(WsOutgoing::Notification { message }) => assert_eq!(message, "Test"),
        other => panic!("expected notification, got {other:?}"),
    }
}

#[tokio::test]
async fn weather_extracts_city_and_strips_punctuation() {
    let f = fixture();
    let response = f.router.route("Wie ist das Wetter in Hamburg?").await;

    assert_eq!(
        response,
        "Das Wetter in Hamburg: leichter Regen bei 12 Grad Celsius."
    );
    assert_eq!(f.weather.queried.lock().await.as_slice(), ["Hamburg"]);
}

#[tokio::test]
async fn weather_without_city_uses_default() {
    let f = fixture();
    let response = f.router.route("regnet es heute").await;

    assert!(response.starts_with("Das Wetter in Berlin:"), "got: {response}");
}

#[tokio::test]
async fn weather_service_error_names_the_city() {
    let registry = Arc::new(ClientRegistry::new());
    let speaker = Arc::new(Speaker::new(None, Arc::new(NullSink), Arc::clone(&registry)));
    let timer = Arc::new(TimerScheduler::new(speaker));

    let router = IntentRouter::new(
        timer,
        registry,
        None,
        None,
        Some(Arc::new(BrokenWeather)),
        None,
        "Berlin".to_string(),
    );

    assert_eq!(
        router.route("wetter in Atlantis").await,
        "Ich konnte das Wetter für Atlantis nicht abrufen."
    );
}

#[tokio::test]
async fn weather_without_credential_says_so() {
    let registry = Arc::new(ClientRegistry::new());
    let speaker = Arc::new(Speaker::new(None, Arc::new(NullSink), Arc::clone(&registry)));
    let timer = Arc::new(TimerScheduler::new(speaker));

    let router = IntentRouter::new(
        timer,
        registry,
        None,
        None,
        None,
        None,
        "Berlin".to_string(),
    );

    assert_eq!(
        router.route("wie ist das wetter").await,
        "Ich habe keinen OpenWeather API-Schlüssel gefunden."
    );
}

#[tokio::test]
async fn camera_rules_are_inert_without_a_camera() {
    let f = fixture_with_camera(false);
    let response = f.router.route("starte kamera").await;
    assert!(response.starts_with("LLM:"), "got: {response}");
}

#[tokio::test]
async fn camera_start_describe_stop_cycle() {
    let f = fixture_with_camera(true);

    let response = f.router.route("starte kamera").await;
    assert!(response.starts_with("Kamera gestartet."), "got: {response}");

    // Let the detection loop publish at least one snapshot
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    let scene = f.router.route("was siehst du").await;
    assert_eq!(scene, "Ich sehe ein Person.");

    assert_eq!(f.router.route("stoppe kamera").await, "Kamera gestoppt.");
}

#[tokio::test]
async fn camera_stop_while_inactive_is_a_distinct_response() {
    let f = fixture_with_camera(true);
    assert_eq!(f.router.route("kamera aus").await, "Es läuft keine Kamera.");
}

#[tokio::test]
async fn scene_query_while_inactive_never_shows_stale_detections() {
    let f = fixture_with_camera(true);
    let camera = f.camera.as_ref().unwrap();

    f.router.route("starte kamera").await;
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    assert_eq!(f.router.route("was siehst du").await, "Ich sehe ein Person.");

    f.router.route("stoppe kamera").await;
    assert!(!camera.is_running());

    let response = f.router.route("was siehst du").await;
    assert!(
        response.starts_with("Die Kamera ist nicht aktiv."),
        "got: {response}"
    );
}

#[tokio::test]
async fn unmatched_text_falls_back_to_chat() {
    let f = fixture();
    assert_eq!(
        f.router.route("erzähl mir einen witz").await,
        "LLM: erzähl mir einen witz"
    );
}
