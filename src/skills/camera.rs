//! Camera object detection
//!
//! A background loop grabs frames and replaces a shared snapshot; intent
//! handlers only ever read complete snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::{Error, Result};

/// Detections below this confidence are dropped
const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Detection loop poll interval
const DETECT_INTERVAL: Duration = Duration::from_millis(100);

/// Frame grab / inference timeout
const CAMERA_TIMEOUT: Duration = Duration::from_secs(10);

/// German names for the common detector labels; unknown labels pass through
const LABEL_TRANSLATIONS: [(&str, &str); 10] = [
    ("person", "Person"),
    ("cell phone", "Handy"),
    ("cup", "Tasse"),
    ("bottle", "Flasche"),
    ("laptop", "Laptop"),
    ("keyboard", "Tastatur"),
    ("mouse", "Maus"),
    ("book", "Buch"),
    ("chair", "Stuhl"),
    ("tv", "Fernseher"),
];

/// A recognized object
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Detection {
    /// Detector label (e.g. "person")
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

/// Latest complete detection result
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Detections above the confidence threshold
    pub detections: Vec<Detection>,
    /// The raw JPEG frame the detections came from
    pub frame: Vec<u8>,
}

/// Capture device producing JPEG frames
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Grab one frame
    async fn grab(&self) -> Result<Vec<u8>>;
}

/// Object-detection inference
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Detect objects in a JPEG frame
    async fn detect(&self, frame: &[u8]) -> Result<Vec<Detection>>;
}

/// Snapshot-URL frame source (IP camera style)
pub struct HttpFrameSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFrameSource {
    /// Create a frame source for a snapshot URL
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: String) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(CAMERA_TIMEOUT)
                .build()
                .map_err(Error::Http)?,
            url,
        })
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn grab(&self) -> Result<Vec<u8>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Camera(format!("frame source returned {status}")));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// HTTP object-detection inference client
pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
}

#[derive(serde::Deserialize)]
struct DetectResponse {
    detections: Vec<Detection>,
}

impl HttpDetector {
    /// Create a detector for an inference endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: String) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(CAMERA_TIMEOUT)
                .build()
                .map_err(Error::Http)?,
            url,
        })
    }
}

#[async_trait]
impl ObjectDetector for HttpDetector {
    async fn detect(&self, frame: &[u8]) -> Result<Vec<Detection>> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "image/jpeg")
            .body(frame.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Camera(format!("inference returned {status}")));
        }

        let result: DetectResponse = response.json().await?;
        Ok(result.detections)
    }
}

/// Continuous detection loop and scene queries
pub struct CameraManager {
    source: Arc<dyn FrameSource>,
    detector: Arc<dyn ObjectDetector>,
    running: AtomicBool,
    snapshot: RwLock<Option<Snapshot>>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CameraManager {
    /// Create a new camera manager (loop not started)
    #[must_use]
    pub fn new(source: Arc<dyn FrameSource>, detector: Arc<dyn ObjectDetector>) -> Self {
        Self {
            source,
            detector,
            running: AtomicBool::new(false),
            snapshot: RwLock::new(None),
            task: std::sync::Mutex::new(None),
        }
    }

    /// Whether the detection loop is active
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the detection loop
    pub async fn start_camera(self: &Arc<Self>) -> String {
        if self.is_running() {
            return "Kamera läuft bereits.".to_string();
        }

        // Probe the device first so a dead camera never reaches the running state
        if let Err(e) = self.source.grab().await {
            tracing::error!(error = %e, "camera open failed");
            return "Kamera konnte nicht geöffnet werden.".to_string();
        }

        self.running.store(true, Ordering::SeqCst);

        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.detection_loop().await;
        });
        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }

        tracing::info!("detection loop started");
        "Kamera gestartet. Sage 'Pixel, was siehst du?' um Objekte zu erkennen.".to_string()
    }

    /// Stop the detection loop
    pub async fn stop_camera(&self) -> String {
        if !self.is_running() {
            return "Es läuft keine Kamera.".to_string();
        }

        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().ok().and_then(|mut t| t.take()) {
            handle.abort();
        }
        *self.snapshot.write().await = None;

        tracing::info!("detection loop stopped");
        "Kamera gestoppt.".to_string()
    }

    /// One grab-detect-publish iteration per interval while running
    async fn detection_loop(&self) {
        while self.is_running() {
            match self.capture_once().await {
                Ok(snapshot) => {
                    *self.snapshot.write().await = Some(snapshot);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "detection iteration failed");
                }
            }
            tokio::time::sleep(DETECT_INTERVAL).await;
        }
    }

    /// Grab a frame and run inference, filtering by confidence
    async fn capture_once(&self) -> Result<Snapshot> {
        let frame = self.source.grab().await?;
        let detections = self
            .detector
            .detect(&frame)
            .await?
            .into_iter()
            .filter(|d| d.confidence > CONFIDENCE_THRESHOLD)
            .collect();

        Ok(Snapshot { detections, frame })
    }

    /// Describe the current scene in natural language
    pub async fn describe_scene(&self) -> String {
        if !self.is_running() {
            return "Die Kamera ist nicht aktiv. Sage 'Pixel, starte Kamera' um zu beginnen."
                .to_string();
        }

        let snapshot = self.snapshot.read().await;
        let detections = snapshot.as_ref().map(|s| s.detections.as_slice());

        match detections {
            None | Some([]) => {
                "Ich sehe momentan nichts, was ich eindeutig erkennen kann.".to_string()
            }
            Some(detections) => describe_detections(detections),
        }
    }

    /// Latest frame as base64 JPEG for remote display
    pub async fn frame_base64(&self) -> Option<String> {
        if !self.is_running() {
            return None;
        }

        let snapshot = self.snapshot.read().await;
        snapshot
            .as_ref()
            .map(|s| base64::engine::general_purpose::STANDARD.encode(&s.frame))
    }
}

/// Render grouped detections as a German sentence
fn describe_detections(detections: &[Detection]) -> String {
    // Group by label, keeping first-seen order
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for d in detections {
        if !counts.contains_key(d.label.as_str()) {
            order.push(&d.label);
        }
        *counts.entry(&d.label).or_insert(0) += 1;
    }

    let parts: Vec<String> = order
        .iter()
        .map(|label| {
            let count = counts[label];
            let name = translate_label(label);
            if count == 1 {
                format!("ein {name}")
            } else {
                format!("{count} {name}-Objekte")
            }
        })
        .collect();

    if parts.len() == 1 {
        format!("Ich sehe {}.", parts[0])
    } else {
        let (last, rest) = parts.split_last().unwrap_or((&parts[0], &[]));
        format!("Ich sehe: {} und {last}.", rest.join(", "))
    }
}

/// Map a detector label to its German name
fn translate_label(label: &str) -> &str {
    LABEL_TRANSLATIONS
        .iter()
        .find(|(en, _)| *en == label)
        .map_or(label, |(_, de)| de)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn single_group_uses_simple_grammar() {
        let text = describe_detections(&[det("person", 0.9)]);
        assert_eq!(text, "Ich sehe ein Person.");
    }

    #[test]
    fn repeated_labels_are_counted() {
        let text = describe_detections(&[det("cup", 0.8), det("cup", 0.7)]);
        assert_eq!(text, "Ich sehe 2 Tasse-Objekte.");
    }

    #[test]
    fn multiple_groups_join_with_und() {
        let text = describe_detections(&[
            det("person", 0.9),
            det("laptop", 0.8),
            det("cup", 0.7),
            det("cup", 0.6),
        ]);
        assert_eq!(text, "Ich sehe: ein Person, ein Laptop und 2 Tasse-Objekte.");
    }

    #[test]
    fn unknown_labels_pass_through_untranslated() {
        let text = describe_detections(&[det("zebra", 0.9)]);
        assert_eq!(text, "Ich sehe ein zebra.");
    }
}
