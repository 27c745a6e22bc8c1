use std::time::{Duration, Instant};

use crate::shared::frame::Frame;

/// Source of timestamps for the processing loop.
///
/// Live capture uses wall time; recorded video derives time from the frame
/// index so replay results do not depend on how fast frames are processed.
pub trait Clock: Send {
    fn timestamp(&self, frame: &Frame) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn timestamp(&self, _frame: &Frame) -> Instant {
        Instant::now()
    }
}

/// Media-time clock: frame `n` happens `n / fps` seconds after `origin`.
pub struct FrameClock {
    origin: Instant,
    fps: f64,
}

impl FrameClock {
    pub fn new(fps: f64) -> Self {
        Self::with_origin(Instant::now(), fps)
    }

    pub fn with_origin(origin: Instant, fps: f64) -> Self {
        Self {
            origin,
            fps: if fps > 0.0 { fps } else { DEFAULT_REPLAY_FPS },
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

/// Used when a source cannot report its frame rate.
pub const DEFAULT_REPLAY_FPS: f64 = 30.0;

impl Clock for FrameClock {
    fn timestamp(&self, frame: &Frame) -> Instant {
        self.origin + Duration::from_secs_f64(frame.index() as f64 / self.fps)
    }
}
