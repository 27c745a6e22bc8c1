use std::io::{self, Write};

use crate::session::domain::event_notifier::{EventNotifier, NotifyError};
use crate::session::domain::session_event::SessionEvent;

/// Writes one JSON line per event to stdout and flushes immediately, so a
/// parent process reading the pipe sees events as they happen.
pub struct StdoutNotifier {
    writer: Box<dyn Write + Send>,
}

impl StdoutNotifier {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl Default for StdoutNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventNotifier for StdoutNotifier {
    fn send(&mut self, event: &SessionEvent) -> Result<(), NotifyError> {
        let line = event.to_json()?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::identity::Identity;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_one_json_line_per_event() {
        let buffer = SharedBuffer::default();
        let mut notifier = StdoutNotifier::with_writer(Box::new(buffer.clone()));

        notifier
            .send(&SessionEvent::Login {
                user: Identity::Known(1),
            })
            .unwrap();
        notifier
            .send(&SessionEvent::Logout {
                user: Identity::Known(1),
            })
            .unwrap();

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output, "{\"login\":{\"user\":1}}\n{\"logout\":{\"user\":1}}\n");
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut notifier = StdoutNotifier::with_writer(Box::new(BrokenPipe));
        let result = notifier.send(&SessionEvent::Login {
            user: Identity::Unknown,
        });
        assert!(matches!(result, Err(NotifyError::Io(_))));
    }
}
