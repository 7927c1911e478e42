//! Timer and stopwatch scheduling
//!
//! Timers are fire-and-forget tasks; the stopwatch is a single shared anchor.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::voice::Speaker;

/// Phrase spoken when a timer fires
const ALARM_PHRASE: &str = "Der Timer ist abgelaufen!";

/// Answer for durations too large to schedule
pub const OVERSIZED_TIMER_PHRASE: &str = "Diese Dauer ist zu lang für einen Timer.";

/// Schedules delayed alarms and tracks the stopwatch anchor
pub struct TimerScheduler {
    speaker: Arc<Speaker>,
    stopwatch: Mutex<Option<Instant>>,
}

impl TimerScheduler {
    /// Create a new scheduler
    #[must_use]
    pub fn new(speaker: Arc<Speaker>) -> Self {
        Self {
            speaker,
            stopwatch: Mutex::new(None),
        }
    }

    /// Set a timer; the alarm phrase is spoken after the delay
    ///
    /// Returns an immediate acknowledgment. Each timer is an independent
    /// detached task; there is no cancellation. Durations that do not fit
    /// in whole seconds of a `u64` are rejected with a spoken sentence.
    #[must_use]
    pub fn set_timer(&self, amount: u64, unit: &str) -> String {
        let Some(seconds) = amount.checked_mul(unit_multiplier(unit)) else {
            return OVERSIZED_TIMER_PHRASE.to_string();
        };

        let speaker = Arc::clone(&self.speaker);
        drop(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            tracing::info!(seconds, "timer fired");
            drop(speaker.speak(ALARM_PHRASE));
        }));

        format!("Timer für {amount} {unit} gestellt.")
    }

    /// Start the stopwatch, overwriting any running one
    #[must_use]
    pub fn start_stopwatch(&self) -> String {
        if let Ok(mut anchor) = self.stopwatch.lock() {
            *anchor = Some(Instant::now());
        }
        "Stoppuhr gestartet.".to_string()
    }

    /// Stop the stopwatch and report the elapsed time
    ///
    /// Answers with a distinct response when nothing is running.
    #[must_use]
    pub fn stop_stopwatch(&self) -> String {
        let elapsed = self
            .stopwatch
            .lock()
            .ok()
            .and_then(|mut anchor| anchor.take().map(|start| start.elapsed()));

        match elapsed {
            Some(elapsed) => format!("Zeit: {}.", format_elapsed(elapsed)),
            None => "Es läuft keine Stoppuhr.".to_string(),
        }
    }
}

/// Seconds per spoken unit (sekunde, minute, stunde — singular or plural)
fn unit_multiplier(unit: &str) -> u64 {
    if unit.contains("stunde") {
        3600
    } else if unit.contains("minute") {
        60
    } else {
        1
    }
}

/// Format an elapsed duration: whole seconds under a minute, else
/// minutes and seconds
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    if total < 60 {
        format!("{total} Sekunden")
    } else {
        format!("{} Minuten und {} Sekunden", total / 60, total % 60)
    }
}
