use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::presence_config::LoopSettings;
use crate::recognition::domain::identity::Identity;
use crate::session::domain::session_event::SessionEvent;
use crate::shared::clock::{Clock, FrameClock, SystemClock};
use crate::shared::constants::DEFAULT_PROCESSING_WIDTH;
use crate::video::domain::frame_source::FrameSource;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::presence_pipeline::PresencePipeline;

/// Loop pacing.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOptions {
    /// Frames are downscaled to this width before processing.
    pub processing_width: u32,
    /// Process one frame out of every `process_every`.
    pub process_every: usize,
    /// Upper bound on processed frames per second.
    pub target_fps: Option<f64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_settings(DEFAULT_PROCESSING_WIDTH, &LoopSettings::default())
    }
}

impl RunOptions {
    pub fn from_settings(processing_width: u32, settings: &LoopSettings) -> Self {
        Self {
            processing_width,
            process_every: settings.process_every.max(1),
            target_fps: settings.target_fps,
        }
    }
}

/// A session transition and the source frame that caused it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SessionRecord {
    pub frame: usize,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Result of one run over a frame source.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub source: String,
    pub frames_read: usize,
    pub frames_processed: usize,
    pub events: Vec<SessionRecord>,
    /// Still logged in when the source ended or the run was cancelled.
    pub logged_in_at_end: Option<Identity>,
    pub cancelled: bool,
}

impl SessionReport {
    pub fn logins(&self) -> impl Iterator<Item = &SessionRecord> {
        self.events
            .iter()
            .filter(|r| matches!(r.event, SessionEvent::Login { .. }))
    }
}

/// Drives a [`PresencePipeline`] over a [`FrameSource`] until the source
/// ends or the cancellation flag is raised.
///
/// Live sources are timed with the wall clock; recorded sources with the
/// frame clock so replays give the same transitions at any speed.
pub struct RunPresenceUseCase {
    source: Box<dyn FrameSource>,
    pipeline: PresencePipeline,
    options: RunOptions,
    clock: Option<Box<dyn Clock>>,
    logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
}

impl RunPresenceUseCase {
    pub fn new(source: Box<dyn FrameSource>, pipeline: PresencePipeline, options: RunOptions) -> Self {
        Self {
            source,
            pipeline,
            options,
            clock: None,
            logger: Box::new(NullPipelineLogger),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Overrides the clock chosen from the source metadata.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Shares a flag that stops the loop between frames once set.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn pipeline(&self) -> &PresencePipeline {
        &self.pipeline
    }

    pub fn execute(&mut self) -> Result<SessionReport, Box<dyn std::error::Error>> {
        let metadata = self.source.open()?;
        let clock = self.clock.take().unwrap_or_else(|| -> Box<dyn Clock> {
            if metadata.is_live() {
                Box::new(SystemClock)
            } else {
                Box::new(FrameClock::new(metadata.fps))
            }
        });
        let min_interval = self
            .options
            .target_fps
            .filter(|fps| *fps > 0.0)
            .map(|fps| Duration::from_secs_f64(1.0 / fps));

        let mut report = SessionReport {
            source: metadata.source.clone(),
            ..SessionReport::default()
        };
        let result = self.run_loop(
            clock.as_ref(),
            min_interval,
            metadata.total_frames,
            &mut report,
        );
        self.source.close();
        self.logger.summary();
        result?;

        report.logged_in_at_end = self.pipeline.session().current_user();
        log::info!(
            "Finished {}: {} frames read, {} processed, {} transitions",
            report.source,
            report.frames_read,
            report.frames_processed,
            report.events.len()
        );
        Ok(report)
    }

    fn run_loop(
        &mut self,
        clock: &dyn Clock,
        min_interval: Option<Duration>,
        total: Option<usize>,
        report: &mut SessionReport,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let process_every = self.options.process_every.max(1);
        let width = self.options.processing_width;

        for frame in self.source.frames() {
            if self.cancelled.load(Ordering::Relaxed) {
                log::info!("Cancelled after {} frames", report.frames_read);
                report.cancelled = true;
                break;
            }
            let frame = frame?;
            report.frames_read += 1;
            self.logger.progress(report.frames_read, total);
            if frame.index() % process_every != 0 {
                continue;
            }

            let started = Instant::now();
            let now = clock.timestamp(&frame);
            let frame = frame.resize_to_width(width);
            let outcome = self
                .pipeline
                .process_frame(&frame, now, self.logger.as_mut());
            report.frames_processed += 1;
            report.events.extend(outcome.events().into_iter().map(|event| SessionRecord {
                frame: frame.index(),
                event,
            }));

            if let Some(interval) = min_interval {
                if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                    std::thread::sleep(remaining);
                }
            }
        }
        Ok(())
    }
}
