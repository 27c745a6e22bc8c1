//! Motion-gated face presence detection.
//!
//! Frames flow through a background/motion model, a face detector, a face
//! recognizer and a voting session state machine that turns noisy per-frame
//! identities into `login`/`logout` events.

pub mod config {
    pub mod presence_config;
}

pub mod detection {
    pub mod domain {
        pub mod detection_orchestrator;
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod motion {
    pub mod domain {
        pub mod adaptation_gate;
        pub mod background_model;
        pub mod candidate_region;
        pub mod motion_region_extractor;
    }
    pub mod imaging;
}

pub mod pipeline {
    pub mod pipeline_logger;
    pub mod presence_pipeline;
    pub mod run_presence_use_case;
}

pub mod recognition {
    pub mod domain {
        pub mod face_recognizer;
        pub mod identity;
        pub mod identity_vote_buffer;
    }
    pub mod infrastructure;
}

pub mod session {
    pub mod domain {
        pub mod event_notifier;
        pub mod session_event;
        pub mod session_state_machine;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod clock;
    pub mod constants;
    pub mod frame;
    pub mod region;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}
