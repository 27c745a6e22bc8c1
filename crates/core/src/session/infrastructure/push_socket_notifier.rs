use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::session::domain::event_notifier::{EventNotifier, NotifyError};
use crate::session::domain::session_event::SessionEvent;

/// Port the remote display's PULL socket listens on.
pub const DEFAULT_PORT: u16 = 5555;

/// Events buffered while the display is slow or unreachable.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Longest a single send may wait for a connected peer.
const SEND_TIMEOUT_MS: i32 = 1000;

/// How long unsent messages may hold up socket shutdown.
const LINGER_MS: i32 = 500;

/// Pushes JSON events to a remote display over a ZeroMQ PUSH socket, one
/// message per event.
///
/// `send` only enqueues; a background thread owns the socket. ZeroMQ
/// connects and reconnects on its own. Events that cannot be delivered
/// within the send timeout are logged and dropped, and events still queued
/// at shutdown are discarded.
pub struct PushSocketNotifier {
    endpoint: String,
    sender: Option<Sender<String>>,
    closing: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PushSocketNotifier {
    /// `address` is `host`, `host:port` or a full ZeroMQ endpoint.
    pub fn new(address: &str) -> Result<Self, NotifyError> {
        Self::with_capacity(address, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(address: &str, capacity: usize) -> Result<Self, NotifyError> {
        let endpoint = endpoint_for(address);
        let context = zmq::Context::new();
        let socket = context.socket(zmq::PUSH)?;
        socket.set_linger(LINGER_MS)?;
        socket.set_sndtimeo(SEND_TIMEOUT_MS)?;
        socket.connect(&endpoint)?;

        let (sender, receiver) = crossbeam_channel::bounded::<String>(capacity.max(1));
        let closing = Arc::new(AtomicBool::new(false));
        let worker_closing = closing.clone();
        let target = endpoint.clone();
        let worker = thread::Builder::new()
            .name("event-push".into())
            .spawn(move || {
                run_writer(&target, &socket, receiver, &worker_closing);
                drop(socket);
                drop(context);
            })?;
        log::debug!("Event push socket connecting to {endpoint}");
        Ok(Self {
            endpoint,
            sender: Some(sender),
            closing,
            worker: Some(worker),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EventNotifier for PushSocketNotifier {
    fn send(&mut self, event: &SessionEvent) -> Result<(), NotifyError> {
        let line = event.to_json()?;
        let sender = self.sender.as_ref().ok_or(NotifyError::Disconnected)?;
        match sender.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(NotifyError::QueueFull(event.kind().to_string())),
            Err(TrySendError::Disconnected(_)) => Err(NotifyError::Disconnected),
        }
    }

    fn name(&self) -> &str {
        "push"
    }
}

impl Drop for PushSocketNotifier {
    fn drop(&mut self) {
        self.closing.store(true, Ordering::Relaxed);
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Event push thread panicked");
            }
        }
    }
}

fn run_writer(
    endpoint: &str,
    socket: &zmq::Socket,
    receiver: Receiver<String>,
    closing: &AtomicBool,
) {
    for message in receiver.iter() {
        if closing.load(Ordering::Relaxed) {
            let dropped = 1 + receiver.try_iter().count();
            log::warn!("Shutting down with {dropped} undelivered events for {endpoint}");
            break;
        }
        match socket.send(message.as_bytes(), 0) {
            Ok(()) => {}
            Err(zmq::Error::EAGAIN) => {
                log::warn!("Dropping event, no receiver at {endpoint}");
            }
            Err(e) => log::warn!("Failed to push event to {endpoint}: {e}"),
        }
    }
    log::debug!("Event push thread for {endpoint} stopped");
}

/// Expands a configured address into a ZeroMQ TCP endpoint, adding the
/// default port when none is given.
pub fn endpoint_for(address: &str) -> String {
    if address.contains("://") {
        return address.to_string();
    }
    let has_port = address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if has_port {
        format!("tcp://{address}")
    } else {
        format!("tcp://{address}:{DEFAULT_PORT}")
    }
}
