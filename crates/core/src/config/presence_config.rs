use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::infrastructure::detector_factory::DetectorKind;
use crate::motion::domain::adaptation_gate::BackgroundAdaptationGate;
use crate::motion::domain::motion_region_extractor::MotionConfig;
use crate::recognition::domain::identity::Identity;
use crate::recognition::infrastructure::recognizer_factory::RecognizerKind;
use crate::session::domain::session_state_machine::SessionPolicy;
use crate::shared::constants::{DEFAULT_PROCESSING_WIDTH, UNKNOWN_LABEL};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Motion segmentation and background learning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub pixel_threshold: u8,
    pub min_area: f64,
    pub dilate_iterations: usize,
    pub blur_kernel: usize,
    /// Frames are downscaled to this width before anything else.
    pub processing_width: u32,
    /// When false the background stays frozen at the first frame.
    pub dynamic_background: bool,
    pub adaptation_cooldown_secs: f64,
    pub adaptation_alpha: f32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        let motion = MotionConfig::default();
        let gate = BackgroundAdaptationGate::default();
        Self {
            pixel_threshold: motion.pixel_threshold,
            min_area: motion.min_area,
            dilate_iterations: motion.dilate_iterations,
            blur_kernel: motion.blur_kernel,
            processing_width: DEFAULT_PROCESSING_WIDTH,
            dynamic_background: true,
            adaptation_cooldown_secs: gate.cooldown().as_secs_f64(),
            adaptation_alpha: gate.alpha(),
        }
    }
}

impl MotionSettings {
    pub fn motion_config(&self) -> MotionConfig {
        MotionConfig {
            pixel_threshold: self.pixel_threshold,
            min_area: self.min_area,
            dilate_iterations: self.dilate_iterations,
            blur_kernel: self.blur_kernel,
        }
    }

    /// `None` when the background is configured to stay frozen.
    pub fn adaptation_gate(&self) -> Option<BackgroundAdaptationGate> {
        self.dynamic_background.then(|| {
            BackgroundAdaptationGate::new(
                Duration::from_secs_f64(self.adaptation_cooldown_secs),
                self.adaptation_alpha,
            )
        })
    }
}

/// Login/logout debounce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub vote_window: usize,
    pub logout_timeout_secs: f64,
    pub allow_strangers: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let policy = SessionPolicy::default();
        Self {
            vote_window: policy.vote_window,
            logout_timeout_secs: policy.logout_timeout.as_secs_f64(),
            allow_strangers: policy.allow_strangers,
        }
    }
}

impl SessionSettings {
    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            vote_window: self.vote_window,
            logout_timeout: Duration::from_secs_f64(self.logout_timeout_secs),
            allow_strangers: self.allow_strangers,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub kind: DetectorKind,
    pub model_path: Option<PathBuf>,
    /// Backend default when unset.
    pub confidence: Option<f64>,
    /// Only run the detector on moving regions.
    pub motion_gated: bool,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            kind: DetectorKind::default(),
            model_path: None,
            confidence: None,
            motion_gated: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSettings {
    pub kind: RecognizerKind,
    /// One sub-directory of face images per person.
    pub gallery_dir: PathBuf,
    pub faces_per_identity: usize,
    pub model_path: Option<PathBuf>,
    /// Backend default when unset.
    pub threshold: Option<f64>,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            kind: RecognizerKind::default(),
            gallery_dir: PathBuf::from("faces"),
            faces_per_identity: 1,
            model_path: None,
            threshold: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierSettings {
    pub stdout: bool,
    /// `host[:port]` or `tcp://` endpoint of a display pulling JSON events
    /// over ZeroMQ. The port defaults to 5555.
    pub push_address: Option<String>,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            stdout: true,
            push_address: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Upper bound on processed frames per second; unlimited when unset.
    pub target_fps: Option<f64>,
    /// Process one frame out of every `process_every`.
    pub process_every: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            target_fps: None,
            process_every: 2,
        }
    }
}

/// Diagnostic output toggles. Each enables per-frame debug logging.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub regions: bool,
    pub recognition: bool,
}

/// Everything read from the JSON config file. Missing fields take defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub motion: MotionSettings,
    pub session: SessionSettings,
    pub detector: DetectorSettings,
    pub recognizer: RecognizerSettings,
    pub notifiers: NotifierSettings,
    #[serde(rename = "loop")]
    pub processing_loop: LoopSettings,
    /// Display names by identity; entry `i` names identity `i + 1`.
    pub users: Vec<String>,
    pub display: DisplaySettings,
}

impl PresenceConfig {
    /// Reads and validates a config file. Relative paths inside it are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let absolutize = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        absolutize(&mut self.recognizer.gallery_dir);
        if let Some(p) = self.recognizer.model_path.as_mut() {
            absolutize(p);
        }
        if let Some(p) = self.detector.model_path.as_mut() {
            absolutize(p);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        let m = &self.motion;
        if m.processing_width == 0 {
            return invalid("motion.processing_width must be positive");
        }
        if m.blur_kernel == 0 || m.blur_kernel % 2 == 0 {
            return invalid("motion.blur_kernel must be odd");
        }
        if !(m.min_area >= 0.0) {
            return invalid("motion.min_area must not be negative");
        }
        if !(m.adaptation_alpha > 0.0 && m.adaptation_alpha <= 1.0) {
            return invalid("motion.adaptation_alpha must be in (0, 1]");
        }
        if !(m.adaptation_cooldown_secs >= 0.0 && m.adaptation_cooldown_secs.is_finite()) {
            return invalid("motion.adaptation_cooldown_secs must not be negative");
        }
        if self.session.vote_window == 0 {
            return invalid("session.vote_window must be at least 1");
        }
        if !(self.session.logout_timeout_secs > 0.0 && self.session.logout_timeout_secs.is_finite()) {
            return invalid("session.logout_timeout_secs must be positive");
        }
        if let Some(c) = self.detector.confidence {
            if !(0.0..=1.0).contains(&c) {
                return invalid("detector.confidence must be in [0, 1]");
            }
        }
        if let Some(t) = self.recognizer.threshold {
            if !(-1.0..=1.0).contains(&t) {
                return invalid("recognizer.threshold must be in [-1, 1]");
            }
        }
        if self.recognizer.faces_per_identity == 0 {
            return invalid("recognizer.faces_per_identity must be at least 1");
        }
        if !self.recognizer.gallery_dir.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "recognizer.gallery_dir {} is not a directory",
                self.recognizer.gallery_dir.display()
            )));
        }
        if self.processing_loop.process_every == 0 {
            return invalid("loop.process_every must be at least 1");
        }
        if let Some(fps) = self.processing_loop.target_fps {
            if !(fps > 0.0) {
                return invalid("loop.target_fps must be positive");
            }
        }
        Ok(())
    }

    /// Display name for an identity: configured user name, else the gallery
    /// name, else a generic label.
    pub fn display_name(&self, identity: Identity, gallery_names: &[String]) -> String {
        match identity {
            Identity::Known(n) => {
                let i = n as usize;
                i.checked_sub(1)
                    .and_then(|i| self.users.get(i).or_else(|| gallery_names.get(i)))
                    .cloned()
                    .unwrap_or_else(|| format!("user {n}"))
            }
            Identity::Unknown => UNKNOWN_LABEL.to_string(),
        }
    }
}
