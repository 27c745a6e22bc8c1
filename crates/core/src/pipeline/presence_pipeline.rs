use std::time::Instant;

use crate::config::presence_config::{DisplaySettings, PresenceConfig};
use crate::detection::domain::detection_orchestrator::{DetectionMode, DetectionOrchestrator};
use crate::detection::domain::face_detector::FaceDetector;
use crate::motion::domain::motion_region_extractor::MotionRegionExtractor;
use crate::recognition::domain::face_recognizer::FaceRecognizer;
use crate::recognition::domain::identity::Identity;
use crate::session::domain::event_notifier::EventNotifier;
use crate::session::domain::session_event::SessionEvent;
use crate::session::domain::session_state_machine::SessionStateMachine;
use crate::shared::frame::Frame;
use crate::shared::region::BoundingBox;

use super::pipeline_logger::PipelineLogger;

/// What one processed frame produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameOutcome {
    /// Face boxes in frame coordinates.
    pub faces: Vec<BoundingBox>,
    /// One identity per face, in the same order.
    pub identities: Vec<Identity>,
    pub login: Option<Identity>,
    pub logout: Option<Identity>,
}

impl FrameOutcome {
    /// Transitions caused by this frame, login first.
    pub fn events(&self) -> Vec<SessionEvent> {
        let login = self.login.map(|user| SessionEvent::Login { user });
        let logout = self.logout.map(|user| SessionEvent::Logout { user });
        login.into_iter().chain(logout).collect()
    }
}

/// One frame in, session transitions out: locate faces, recognize them,
/// vote, then check login and logout.
pub struct PresencePipeline {
    orchestrator: DetectionOrchestrator,
    recognizer: Box<dyn FaceRecognizer>,
    session: SessionStateMachine,
    display: DisplaySettings,
}

impl PresencePipeline {
    pub fn new(
        orchestrator: DetectionOrchestrator,
        recognizer: Box<dyn FaceRecognizer>,
        session: SessionStateMachine,
    ) -> Self {
        Self {
            orchestrator,
            recognizer,
            session,
            display: DisplaySettings::default(),
        }
    }

    /// Wires the pipeline from a loaded config and already-built providers.
    pub fn from_config(
        config: &PresenceConfig,
        detector: Box<dyn FaceDetector>,
        recognizer: Box<dyn FaceRecognizer>,
        notifiers: Vec<Box<dyn EventNotifier>>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mode = if config.detector.motion_gated {
            DetectionMode::MotionGated {
                extractor: MotionRegionExtractor::new(config.motion.motion_config()),
                gate: config.motion.adaptation_gate(),
            }
        } else {
            DetectionMode::Direct
        };
        let session = SessionStateMachine::new(config.session.policy(), notifiers)?;
        Ok(Self::new(DetectionOrchestrator::new(detector, mode), recognizer, session)
            .with_display(config.display.clone()))
    }

    /// Enables per-frame diagnostic logging of regions and recognitions.
    pub fn with_display(mut self, display: DisplaySettings) -> Self {
        self.display = display;
        self
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn orchestrator(&self) -> &DetectionOrchestrator {
        &self.orchestrator
    }

    pub fn identity_names(&self) -> &[String] {
        self.recognizer.identity_names()
    }

    pub fn process_frame(
        &mut self,
        frame: &Frame,
        now: Instant,
        logger: &mut dyn PipelineLogger,
    ) -> FrameOutcome {
        let started = Instant::now();
        let faces = self.orchestrator.locate_faces(frame, now);
        logger.timing("detect", elapsed_ms(started));
        logger.metric("regions", self.orchestrator.regions_last_frame() as f64);
        logger.metric("faces", faces.len() as f64);
        if self.display.regions {
            log::debug!(
                "Frame {}: {} motion regions, faces at {faces:?}",
                frame.index(),
                self.orchestrator.regions_last_frame()
            );
        }

        let identities = if faces.is_empty() {
            Vec::new()
        } else {
            let started = Instant::now();
            let identities = self.recognize(frame, &faces);
            logger.timing("recognize", elapsed_ms(started));
            identities
        };
        if self.display.recognition && !identities.is_empty() {
            let labels: Vec<String> = identities.iter().map(ToString::to_string).collect();
            log::debug!("Frame {}: recognized {}", frame.index(), labels.join(", "));
        }

        let started = Instant::now();
        self.session.record(&identities, now);
        let login = self.session.check_login();
        let logout = self.session.check_logout(now);
        logger.timing("session", elapsed_ms(started));

        let outcome = FrameOutcome {
            faces,
            identities,
            login,
            logout,
        };
        for event in outcome.events() {
            logger.transition(frame.index(), &event);
        }
        outcome
    }

    fn recognize(&mut self, frame: &Frame, faces: &[BoundingBox]) -> Vec<Identity> {
        match self.recognizer.encode_and_match(frame, faces) {
            Ok(identities) => identities,
            Err(e) => {
                log::warn!("Face recognition failed on frame {}: {e}", frame.index());
                Vec::new()
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
