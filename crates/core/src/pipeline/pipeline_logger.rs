use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::session::domain::session_event::SessionEvent;

/// Observer for the presence loop: stage costs, per-frame counts and
/// session transitions.
///
/// Keeps the processing loop free of output concerns so the CLI, tests and
/// offline scoring can each watch it differently.
pub trait PipelineLogger: Send {
    /// Report how many frames have been read. `total` is `None` for live
    /// sources.
    fn progress(&mut self, read: usize, total: Option<usize>);

    /// Record how long a named stage took for one processed frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-frame count (regions, faces, identities).
    fn metric(&mut self, name: &str, value: f64);

    /// Record a login or logout.
    fn transition(&mut self, frame_index: usize, event: &SessionEvent);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by tests and embedders with their own
/// reporting.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _read: usize, _total: Option<usize>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn transition(&mut self, _frame_index: usize, _event: &SessionEvent) {}
}

/// Running count and sum of one named series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tally {
    pub count: usize,
    pub total: f64,
}

impl Tally {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Forwards to the `log` facade and keeps running totals for a summary.
///
/// Memory stays constant however long the loop runs: each stage and metric
/// keeps a [`Tally`], never the individual samples. Progress lines are
/// throttled to one every `throttle_frames` frames so a long-running camera
/// loop does not flood the log.
pub struct LogPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, Tally>,
    metrics: HashMap<String, Tally>,
    transitions: BTreeMap<&'static str, usize>,
    start_time: Instant,
    frames_read: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            transitions: BTreeMap::new(),
            start_time: Instant::now(),
            frames_read: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.transitions.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Presence summary ({} frames read, {elapsed_s:.1}s):",
            self.frames_read
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let tally = self.timings[stage];
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  total {:7.0}ms  ({} frames)",
                tally.mean(),
                tally.total,
                tally.count
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: avg {:.1}", self.metrics[name].mean()));
        }

        for (kind, count) in &self.transitions {
            lines.push(format!("  {kind}s: {count}"));
        }

        if self.frames_read > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames_read as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<Tally> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<Tally> {
        self.metrics.get(name).copied()
    }

    /// Number of transitions of the given kind (`"login"` or `"logout"`).
    pub fn transitions_of(&self, kind: &str) -> usize {
        self.transitions.get(kind).copied().unwrap_or(0)
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, read: usize, total: Option<usize>) {
        self.frames_read = read;
        if read % self.throttle_frames != 0 && Some(read) != total {
            return;
        }
        match total {
            Some(total) if total > 0 => {
                let pct = read as f64 / total as f64 * 100.0;
                log::info!("Processing: {read}/{total} frames ({pct:.1}%)");
            }
            _ => log::debug!("Processing: {read} frames"),
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .add(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .add(value);
    }

    fn transition(&mut self, frame_index: usize, event: &SessionEvent) {
        *self.transitions.entry(event.kind()).or_default() += 1;
        log::info!("Frame {frame_index}: {} {}", event.kind(), event.user());
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::identity::Identity;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, Some(10));
        logger.timing("detect", 5.0);
        logger.metric("regions", 3.0);
        logger.transition(4, &SessionEvent::Login { user: Identity::Known(1) });
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = LogPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("recognize", 5.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.total, 50.0);
        assert_relative_eq!(detect.mean(), 25.0);
        assert_eq!(logger.timings_for("recognize").unwrap().count, 1);
        assert!(logger.timings_for("session").is_none());
    }

    #[test]
    fn test_metric_records_values() {
        let mut logger = LogPipelineLogger::new(10);
        logger.metric("faces", 1.0);
        logger.metric("faces", 2.0);

        assert_relative_eq!(logger.metrics_for("faces").unwrap().mean(), 1.5);
    }

    #[test]
    fn test_long_run_keeps_one_tally_per_series() {
        let mut logger = LogPipelineLogger::new(1000);
        for i in 0..100_000 {
            logger.progress(i + 1, None);
            logger.timing("detect", 2.0);
            logger.timing("session", 0.5);
            logger.metric("regions", (i % 3) as f64);
            logger.metric("faces", 1.0);
        }

        assert_eq!(logger.timings.len(), 2);
        assert_eq!(logger.metrics.len(), 2);
        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 100_000);
        assert_relative_eq!(detect.mean(), 2.0);
        assert_relative_eq!(logger.metrics_for("regions").unwrap().mean(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_empty_tally_mean_is_zero() {
        assert_relative_eq!(Tally::default().mean(), 0.0);
    }

    #[test]
    fn test_transitions_are_counted_by_kind() {
        let mut logger = LogPipelineLogger::new(10);
        let user = Identity::Known(2);
        logger.transition(10, &SessionEvent::Login { user });
        logger.transition(40, &SessionEvent::Logout { user });
        logger.transition(90, &SessionEvent::Login { user });

        assert_eq!(logger.transitions_of("login"), 2);
        assert_eq!(logger.transitions_of("logout"), 1);
    }

    #[test]
    fn test_summary_lists_stages_metrics_and_transitions() {
        let mut logger = LogPipelineLogger::new(10);
        logger.progress(50, Some(50));
        logger.timing("detect", 12.0);
        logger.metric("regions", 3.0);
        logger.metric("regions", 4.0);
        logger.transition(7, &SessionEvent::Login { user: Identity::Known(1) });

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Presence summary (50 frames read"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("regions: avg 3.5"));
        assert!(summary.contains("logins: 1"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = LogPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_frames_read_for_live_sources() {
        let mut logger = LogPipelineLogger::new(10);
        for i in 1..=25 {
            logger.progress(i, None);
        }
        assert_eq!(logger.frames_read, 25);
    }

    #[test]
    fn test_throttle_is_at_least_one() {
        let logger = LogPipelineLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
        assert_eq!(LogPipelineLogger::default().throttle_frames, 100);
    }
}
