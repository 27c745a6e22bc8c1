use thiserror::Error;

use super::session_event::SessionEvent;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write event: {0}")]
    Io(#[from] std::io::Error),
    #[error("event socket error: {0}")]
    Transport(#[from] zmq::Error),
    #[error("event queue is full, dropped {0}")]
    QueueFull(String),
    #[error("event writer has shut down")]
    Disconnected,
}

/// Delivers session events to the outside world.
///
/// Fire-and-forget: implementations must not block frame processing for
/// long, and failures are reported but never retried by the caller.
pub trait EventNotifier: Send {
    fn send(&mut self, event: &SessionEvent) -> Result<(), NotifyError>;

    /// Short name used in log messages.
    fn name(&self) -> &str;
}
