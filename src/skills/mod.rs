//! Assistant skills
//!
//! Timer/stopwatch scheduling and the camera object-detection loop.

mod camera;
mod timer;

pub use camera::{
    CameraManager, Detection, FrameSource, HttpDetector, HttpFrameSource, ObjectDetector,
    Snapshot,
};
pub use timer::{OVERSIZED_TIMER_PHRASE, TimerScheduler, format_elapsed};
