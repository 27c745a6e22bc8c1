use std::time::{Duration, Instant};

use super::event_notifier::EventNotifier;
use super::session_event::SessionEvent;
use crate::recognition::domain::identity::Identity;
use crate::recognition::domain::identity_vote_buffer::IdentityVoteBuffer;

/// Login/logout rules.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionPolicy {
    /// Consecutive non-empty votes that must agree before a login.
    pub vote_window: usize,
    /// Idle time after the last detection before a logout.
    pub logout_timeout: Duration,
    /// Whether an unrecognized face may log in.
    pub allow_strangers: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            vote_window: 5,
            logout_timeout: Duration::from_secs(3),
            allow_strangers: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn(Identity),
}

/// Turns per-frame identity votes into login and logout events.
///
/// At most one user is logged in at a time. A different person becoming
/// consistently visible never replaces the current user; the current user
/// must time out first.
pub struct SessionStateMachine {
    policy: SessionPolicy,
    votes: IdentityVoteBuffer,
    state: SessionState,
    notifiers: Vec<Box<dyn EventNotifier>>,
}

impl SessionStateMachine {
    pub fn new(
        policy: SessionPolicy,
        notifiers: Vec<Box<dyn EventNotifier>>,
    ) -> Result<Self, &'static str> {
        let votes = IdentityVoteBuffer::new(policy.vote_window)?;
        Ok(Self {
            policy,
            votes,
            state: SessionState::LoggedOut,
            notifiers,
        })
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_user(&self) -> Option<Identity> {
        match self.state {
            SessionState::LoggedIn(user) => Some(user),
            SessionState::LoggedOut => None,
        }
    }

    pub fn votes(&self) -> &IdentityVoteBuffer {
        &self.votes
    }

    /// Records the identities recognized in one frame.
    pub fn record(&mut self, identities: &[Identity], now: Instant) -> bool {
        self.votes.record(identities, now)
    }

    /// Logs in the consensus identity when nobody is logged in.
    pub fn check_login(&mut self) -> Option<Identity> {
        if self.state != SessionState::LoggedOut {
            return None;
        }
        let winner = self.votes.is_consistent()?;
        if !winner.is_known() && !self.policy.allow_strangers {
            log::debug!("Ignoring consistent stranger, strangers are not allowed");
            return None;
        }
        self.state = SessionState::LoggedIn(winner);
        log::info!("Login: {winner}");
        self.notify(SessionEvent::Login { user: winner });
        Some(winner)
    }

    /// Logs the current user out once nobody has been seen for longer than
    /// the logout timeout. Clears the vote window.
    pub fn check_logout(&mut self, now: Instant) -> Option<Identity> {
        let SessionState::LoggedIn(user) = self.state else {
            return None;
        };
        let timed_out = match self.votes.since_last_detection(now) {
            Some(idle) => idle > self.policy.logout_timeout,
            None => true,
        };
        if !timed_out {
            return None;
        }
        self.votes.reset();
        self.state = SessionState::LoggedOut;
        log::info!("Logout: {user}");
        self.notify(SessionEvent::Logout { user });
        Some(user)
    }

    fn notify(&mut self, event: SessionEvent) {
        for notifier in &mut self.notifiers {
            if let Err(e) = notifier.send(&event) {
                log::warn!("{} notifier failed to deliver {}: {e}", notifier.name(), event.kind());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::domain::event_notifier::NotifyError;
    use std::sync::{Arc, Mutex};
    use Identity::{Known, Unknown};

    struct RecordingNotifier {
        events: Arc<Mutex<Vec<SessionEvent>>>,
    }

    impl EventNotifier for RecordingNotifier {
        fn send(&mut self, event: &SessionEvent) -> Result<(), NotifyError> {
            self.events.lock().unwrap().push(*event);
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct FailingNotifier;

    impl EventNotifier for FailingNotifier {
        fn send(&mut self, _event: &SessionEvent) -> Result<(), NotifyError> {
            Err(NotifyError::Disconnected)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn machine(window: usize, allow_strangers: bool) -> (SessionStateMachine, Arc<Mutex<Vec<SessionEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let policy = SessionPolicy {
            vote_window: window,
            logout_timeout: Duration::from_secs(3),
            allow_strangers,
        };
        let notifiers: Vec<Box<dyn EventNotifier>> = vec![
            Box::new(FailingNotifier),
            Box::new(RecordingNotifier {
                events: Arc::clone(&events),
            }),
        ];
        (SessionStateMachine::new(policy, notifiers).unwrap(), events)
    }

    fn feed(sm: &mut SessionStateMachine, identity: Identity, count: usize, now: Instant) {
        for _ in 0..count {
            sm.record(&[identity], now);
        }
    }

    #[test]
    fn test_zero_window_rejected() {
        let policy = SessionPolicy {
            vote_window: 0,
            ..SessionPolicy::default()
        };
        assert!(SessionStateMachine::new(policy, Vec::new()).is_err());
    }

    #[test]
    fn test_login_after_full_window() {
        let (mut sm, events) = machine(3, false);
        let now = Instant::now();

        feed(&mut sm, Known(1), 2, now);
        assert_eq!(sm.check_login(), None);
        feed(&mut sm, Known(1), 1, now);
        assert_eq!(sm.check_login(), Some(Known(1)));

        assert_eq!(sm.current_user(), Some(Known(1)));
        assert_eq!(*events.lock().unwrap(), vec![SessionEvent::Login { user: Known(1) }]);
    }

    #[test]
    fn test_no_double_login() {
        let (mut sm, events) = machine(3, false);
        let now = Instant::now();
        feed(&mut sm, Known(1), 3, now);
        sm.check_login();
        feed(&mut sm, Known(1), 3, now);

        assert_eq!(sm.check_login(), None);
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stranger_rejected_by_default() {
        let (mut sm, events) = machine(3, false);
        feed(&mut sm, Unknown, 3, Instant::now());

        assert_eq!(sm.check_login(), None);
        assert_eq!(sm.state(), SessionState::LoggedOut);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stranger_allowed_when_enabled() {
        let (mut sm, events) = machine(3, true);
        feed(&mut sm, Unknown, 3, Instant::now());

        assert_eq!(sm.check_login(), Some(Unknown));
        assert_eq!(*events.lock().unwrap(), vec![SessionEvent::Login { user: Unknown }]);
    }

    #[test]
    fn test_stranger_cannot_take_over_logged_in_user() {
        let (mut sm, events) = machine(3, false);
        let t0 = Instant::now();
        feed(&mut sm, Known(1), 3, t0);
        sm.check_login();

        feed(&mut sm, Unknown, 3, t0 + Duration::from_secs(1));
        assert_eq!(sm.check_login(), None);
        assert_eq!(sm.check_logout(t0 + Duration::from_secs(2)), None);
        assert_eq!(sm.current_user(), Some(Known(1)));
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_known_user_cannot_take_over_either() {
        let (mut sm, _) = machine(3, false);
        let now = Instant::now();
        feed(&mut sm, Known(1), 3, now);
        sm.check_login();
        feed(&mut sm, Known(2), 3, now);
        assert_eq!(sm.check_login(), None);
        assert_eq!(sm.current_user(), Some(Known(1)));
    }

    #[test]
    fn test_logout_only_after_timeout() {
        let (mut sm, events) = machine(3, false);
        let t0 = Instant::now();
        feed(&mut sm, Known(2), 3, t0);
        sm.check_login();

        assert_eq!(sm.check_logout(t0 + Duration::from_secs(3)), None);
        assert_eq!(sm.check_logout(t0 + Duration::from_millis(3_001)), Some(Known(2)));

        assert_eq!(sm.state(), SessionState::LoggedOut);
        assert!(sm.votes().slots().iter().all(Option::is_none));
        assert_eq!(sm.votes().cursor(), 0);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                SessionEvent::Login { user: Known(2) },
                SessionEvent::Logout { user: Known(2) }
            ]
        );
    }

    #[test]
    fn test_logout_never_fires_while_logged_out() {
        let (mut sm, events) = machine(3, false);
        let t0 = Instant::now();
        feed(&mut sm, Known(2), 2, t0);

        assert_eq!(sm.check_logout(t0 + Duration::from_secs(60)), None);
        assert_eq!(sm.votes().cursor(), 2);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recent_detection_postpones_logout() {
        let (mut sm, _) = machine(2, false);
        let t0 = Instant::now();
        feed(&mut sm, Known(1), 2, t0);
        sm.check_login();

        sm.record(&[Known(1)], t0 + Duration::from_secs(2));
        assert_eq!(sm.check_logout(t0 + Duration::from_secs(4)), None);
        sm.record(&[], t0 + Duration::from_secs(5));
        assert_eq!(sm.check_logout(t0 + Duration::from_millis(5_001)), Some(Known(1)));
    }

    #[test]
    fn test_same_user_can_log_in_again_after_logout() {
        let (mut sm, events) = machine(2, false);
        let t0 = Instant::now();
        feed(&mut sm, Known(1), 2, t0);
        sm.check_login();
        sm.check_logout(t0 + Duration::from_secs(10));

        // The window was cleared, so one vote is not enough.
        feed(&mut sm, Known(1), 1, t0 + Duration::from_secs(11));
        assert_eq!(sm.check_login(), None);
        feed(&mut sm, Known(1), 1, t0 + Duration::from_secs(11));
        assert_eq!(sm.check_login(), Some(Known(1)));
        assert_eq!(events.lock().unwrap().len(), 3);
    }
}
