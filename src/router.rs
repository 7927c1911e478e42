//! Intent routing
//!
//! Maps free text to exactly one dispatched intent via an ordered rule
//! cascade. `route` never fails: collaborator errors become user-facing
//! apology sentences.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::server::{ClientRegistry, DeviceClass, NotificationTarget};
use crate::services::{ChatService, SearchService, WeatherService};
use crate::skills::{CameraManager, OVERSIZED_TIMER_PHRASE, TimerScheduler};
use crate::Error;

/// System prompt for the generalist fallback
const SYSTEM_PROMPT: &str =
    "Du bist Pixel, ein hilfreicher KI-Assistent. Antworte kurz und prägnant auf Deutsch.";

/// Timer trigger keywords
const TIMER_TRIGGERS: [&str; 3] = ["timer", "wecker", "countdown"];

/// Keywords that route to the stopwatch rule
const STOPWATCH_KEYWORDS: [&str; 2] = ["stoppuhr", "stopwatch"];

/// Stopwatch start keywords; everything else within the rule stops
const STOPWATCH_START: [&str; 3] = ["start", "los", "go"];

/// Clock/date query keywords
const TIME_KEYWORDS: [&str; 7] = ["spät", "uhr", "zeit", "clock", "time", "datum", "welcher tag"];

/// Timer/stopwatch keywords that must not be mistaken for a clock query
const TIME_EXCLUDE: [&str; 4] = ["timer", "wecker", "countdown", "stoppuhr"];

/// Web search trigger phrases; stripped from the query longest-first
const SEARCH_TRIGGERS: [&str; 9] = [
    "suche nach",
    "suche",
    "finde",
    "googlen",
    "search for",
    "search",
    "im internet",
    "wer ist",
    "was ist",
];

/// A search trigger together with any of these means a different intent
const SEARCH_EXCLUDE: [&str; 5] = ["wetter", "uhr", "zeit", "kamera", "benachrichtigung"];

/// Notification intent keywords
const NOTIFICATION_KEYWORDS: [&str; 2] = ["benachrichtigung", "send notification"];

/// Weather-domain keywords
const WEATHER_KEYWORDS: [&str; 31] = [
    "wetter",
    "temperatur",
    "vorhersage",
    "regen",
    "sonnig",
    "bewölkt",
    "heiß",
    "kalt",
    "wind",
    "feuchtigkeit",
    "schnee",
    "sturm",
    "grad",
    "celsius",
    "warm",
    "kühl",
    "draußen",
    "regnet",
    "scheint",
    "sonne",
    "wolken",
    "gewitter",
    "nebel",
    "frost",
    "hitze",
    "luftfeuchtigkeit",
    "wetterbericht",
    "prognose",
    "heute",
    "morgen",
    "woche",
];

/// Camera control phrase sets
const CAMERA_START: [&str; 5] = [
    "starte kamera",
    "kamera starten",
    "öffne kamera",
    "camera start",
    "kamera an",
];
const CAMERA_STOP: [&str; 5] = [
    "stoppe kamera",
    "kamera stoppen",
    "schließe kamera",
    "camera stop",
    "kamera aus",
];
const CAMERA_DESCRIBE: [&str; 7] = [
    "was siehst du",
    "erkennen",
    "identifizieren",
    "was ist das",
    "siehe",
    "detect",
    "identify",
];

/// `<integer> <unit>` duration pattern, singular and plural units
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(sekunden?|minuten?|stunden?)").expect("valid duration regex")
});

/// German weekday name
const fn weekday_name(weekday: chrono::Weekday) -> &'static str {
    match weekday {
        chrono::Weekday::Mon => "Montag",
        chrono::Weekday::Tue => "Dienstag",
        chrono::Weekday::Wed => "Mittwoch",
        chrono::Weekday::Thu => "Donnerstag",
        chrono::Weekday::Fri => "Freitag",
        chrono::Weekday::Sat => "Samstag",
        chrono::Weekday::Sun => "Sonntag",
    }
}

/// Routes utterances to intent handlers
pub struct IntentRouter {
    timer: Arc<TimerScheduler>,
    registry: Arc<ClientRegistry>,
    camera: Option<Arc<CameraManager>>,
    chat: Option<Arc<dyn ChatService>>,
    weather: Option<Arc<dyn WeatherService>>,
    search: Option<Arc<dyn SearchService>>,
    default_city: String,
}

impl IntentRouter {
    /// Create a new router
    ///
    /// Absent collaborators answer with a specific sentence instead of
    /// dispatching (missing credential) or disable their rule entirely
    /// (camera).
    #[must_use]
    pub fn new(
        timer: Arc<TimerScheduler>,
        registry: Arc<ClientRegistry>,
        camera: Option<Arc<CameraManager>>,
        chat: Option<Arc<dyn ChatService>>,
        weather: Option<Arc<dyn WeatherService>>,
        search: Option<Arc<dyn SearchService>>,
        default_city: String,
    ) -> Self {
        Self {
            timer,
            registry,
            camera,
            chat,
            weather,
            search,
            default_city,
        }
    }

    /// Route an utterance to exactly one intent and return the response text
    ///
    /// First matching rule wins; all handler failures are converted to
    /// user-facing sentences.
    pub async fn route(&self, text: &str) -> String {
        let lower = text.to_lowercase();

        // 1. Timer: trigger keyword plus a duration pattern. A digit run
        // that does not fit in u64 is rejected, not scheduled as zero.
        if contains_any(&lower, &TIMER_TRIGGERS) {
            if let Some(caps) = DURATION_RE.captures(&lower) {
                return match caps[1].parse::<u64>() {
                    Ok(amount) => self.timer.set_timer(amount, &caps[2]),
                    Err(_) => OVERSIZED_TIMER_PHRASE.to_string(),
                };
            }
        }

        // 2. Stopwatch: a start keyword starts it, anything else stops it
        // ("stoppuhr" and "stopwatch" both carry a stop keyword already).
        if contains_any(&lower, &STOPWATCH_KEYWORDS) {
            if contains_any(&lower, &STOPWATCH_START) {
                return self.timer.start_stopwatch();
            }
            return self.timer.stop_stopwatch();
        }

        // 3. Time/date, unless a timer keyword makes it ambiguous
        if contains_any(&lower, &TIME_KEYWORDS) && !contains_any(&lower, &TIME_EXCLUDE) {
            return time_response();
        }

        // 4. Web search
        if contains_any(&lower, &SEARCH_TRIGGERS) && !contains_any(&lower, &SEARCH_EXCLUDE) {
            let query = strip_search_triggers(&lower);
            if !query.is_empty() {
                return self.handle_search(&query).await;
            }
            // Empty residual: keep cascading
        }

        // 5. Notification
        if contains_any(&lower, &NOTIFICATION_KEYWORDS) {
            return self.handle_notification(text, &lower).await;
        }

        // 6. Weather
        if contains_any(&lower, &WEATHER_KEYWORDS) {
            return self.handle_weather(text).await;
        }

        // 7. Camera control/query, only when a detection subsystem exists
        if let Some(camera) = &self.camera {
            if contains_any(&lower, &CAMERA_START) {
                return camera.start_camera().await;
            }
            if contains_any(&lower, &CAMERA_STOP) {
                return camera.stop_camera().await;
            }
            if contains_any(&lower, &CAMERA_DESCRIBE) {
                return camera.describe_scene().await;
            }
        }

        // 8. Default: the generalist language model
        self.handle_chat(text).await
    }

    /// Dispatch a residual query to the search collaborator
    async fn handle_search(&self, query: &str) -> String {
        let Some(search) = &self.search else {
            return "Die Suche ist nicht verfügbar.".to_string();
        };

        match search.search(query).await {
            Ok(titles) if titles.is_empty() => {
                format!("Ich habe keine direkten Ergebnisse für '{query}' gefunden.")
            }
            Ok(titles) => {
                let lines: Vec<String> =
                    titles.iter().take(3).map(|t| format!("- {t}")).collect();
                format!(
                    "Ich habe im Internet nach '{query}' gesucht. Hier sind einige Ergebnisse:\n{}",
                    lines.join("\n")
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, query, "web search failed");
                "Es gab einen Fehler bei der Websuche.".to_string()
            }
        }
    }

    /// Send a notification through the client registry
    async fn handle_notification(&self, text: &str, lower: &str) -> String {
        // Message is everything after the first colon
        let message = text
            .split_once(':')
            .map(|(_, m)| m.trim())
            .filter(|m| !m.is_empty())
            .unwrap_or("Test")
            .to_string();

        let target = if lower.contains("pc") {
            DeviceClass::Pc
        } else {
            DeviceClass::Mobile
        };

        let delivered = self
            .registry
            .broadcast_notification(NotificationTarget::Device(target), &message)
            .await;

        if delivered > 0 {
            format!("Benachrichtigung an {target} gesendet.")
        } else {
            format!("Kein {target} verbunden.")
        }
    }

    /// Look up the weather for the city mentioned in the text
    async fn handle_weather(&self, text: &str) -> String {
        let Some(weather) = &self.weather else {
            return "Ich habe keinen OpenWeather API-Schlüssel gefunden.".to_string();
        };

        let city = extract_city(text).unwrap_or_else(|| self.default_city.clone());

        match weather.current(&city).await {
            Ok(report) => format!(
                "Das Wetter in {city}: {} bei {} Grad Celsius.",
                report.description, report.temperature_celsius
            ),
            Err(Error::Weather(e)) => {
                tracing::warn!(error = %e, city, "weather lookup rejected");
                format!("Ich konnte das Wetter für {city} nicht abrufen.")
            }
            Err(e) => {
                tracing::warn!(error = %e, city, "weather lookup failed");
                "Es gab einen Fehler beim Abrufen des Wetters.".to_string()
            }
        }
    }

    /// Fall back to the language model
    async fn handle_chat(&self, text: &str) -> String {
        let Some(chat) = &self.chat else {
            return "Ich habe keinen Groq API-Schlüssel gefunden. Bitte setze GROQ_API_KEY."
                .to_string();
        };

        match chat.complete(SYSTEM_PROMPT, text).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(error = %e, "chat completion failed");
                "Es gab einen Fehler bei der Verbindung zum Sprachmodell.".to_string()
            }
        }
    }
}

/// True if the haystack contains any of the needles
fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Current local time, weekday, and date as a sentence
fn time_response() -> String {
    let now = chrono::Local::now();
    format_time_response(&now)
}

/// Render the time sentence for a given moment
fn format_time_response(now: &chrono::DateTime<chrono::Local>) -> String {
    use chrono::Datelike;

    let weekday = weekday_name(now.weekday());
    format!(
        "Es ist {} Uhr am {weekday}, den {}.",
        now.format("%H:%M"),
        now.format("%d.%m.%Y")
    )
}

/// Remove every known search trigger phrase, longest first, each at most once
fn strip_search_triggers(lower: &str) -> String {
    let mut triggers: Vec<&str> = SEARCH_TRIGGERS.to_vec();
    triggers.sort_by_key(|t| std::cmp::Reverse(t.len()));

    let mut query = lower.to_string();
    for trigger in triggers {
        query = query.replacen(trigger, "", 1);
    }
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Heuristic city extraction: the token right after the word "in",
/// with trailing punctuation stripped
fn extract_city(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let idx = words.iter().position(|w| w.eq_ignore_ascii_case("in"))?;
    let city = words
        .get(idx + 1)?
        .trim_matches(['?', '.', '!', ','])
        .to_string();

    (!city.is_empty()).then_some(city)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn city_extraction_strips_punctuation() {
        assert_eq!(
            extract_city("Wie ist das Wetter in Berlin?"),
            Some("Berlin".to_string())
        );
        assert_eq!(
            extract_city("Regnet es in Hamburg,"),
            Some("Hamburg".to_string())
        );
        assert_eq!(extract_city("Wie ist das Wetter?"), None);
        assert_eq!(extract_city("Wetter in"), None);
    }

    #[test]
    fn search_triggers_strip_longest_first() {
        // "suche nach" must go before "suche" so no stray "nach" survives
        assert_eq!(
            strip_search_triggers("suche nach der hauptstadt von frankreich"),
            "der hauptstadt von frankreich"
        );
        assert_eq!(strip_search_triggers("wer ist angela merkel"), "angela merkel");
        // Each phrase is removed at most once
        assert_eq!(strip_search_triggers("suche suche"), "suche");
    }

    #[test]
    fn stripping_all_triggers_can_leave_empty_residual() {
        assert_eq!(strip_search_triggers("suche"), "");
    }

    #[test]
    fn time_response_contains_clock_and_weekday() {
        let wednesday = chrono::Local
            .with_ymd_and_hms(2025, 1, 1, 14, 30, 0)
            .unwrap();
        let response = format_time_response(&wednesday);
        assert!(response.contains("14:30"));
        assert!(response.contains("Mittwoch"));
        assert!(response.contains("01.01.2025"));
    }

    #[test]
    fn duration_pattern_matches_all_units() {
        for phrase in [
            "5 sekunden",
            "1 sekunde",
            "10 minuten",
            "1 minute",
            "2 stunden",
            "1 stunde",
        ] {
            assert!(DURATION_RE.is_match(phrase), "no match for {phrase}");
        }
        assert!(!DURATION_RE.is_match("fünf minuten"));
    }
}
