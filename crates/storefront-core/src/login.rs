//! ============================================================================
//! Login Controller - Simulated sign-in form
//! ============================================================================
//! Demo rules: any username, any password of at least six characters. The
//! form validates synchronously, then "verifies" after a short delay before
//! touching the session, and finally sends the user to the redirect target.
//! ============================================================================

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::session::SessionStore;
use crate::timer::{Clock, TimerQueue};
use crate::types::NavIntent;

/// Simulated verification latency
pub const LOGIN_VERIFY_DELAY: Duration = Duration::from_millis(500);

/// Minimum password length accepted by the demo check
pub const MIN_PASSWORD_LEN: usize = 6;

/// Inline form error. The session is never modified when one is raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Please enter a username")]
    MissingUsername,

    #[error("Please enter a password")]
    MissingPassword,

    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,
}

struct PendingLogin {
    username: String,
    password: String,
}

pub struct LoginController {
    redirect: NavIntent,
    error: Option<LoginError>,
    timers: TimerQueue<PendingLogin>,
}

impl LoginController {
    /// Form that returns to `redirect` (a path such as "/cart") once signed in
    pub fn new(clock: Arc<dyn Clock>, redirect: Option<&str>) -> Self {
        Self {
            redirect: redirect.map(NavIntent::from_path).unwrap_or(NavIntent::Home),
            error: None,
            timers: TimerQueue::new(clock),
        }
    }

    /// Already signed in users skip the form
    pub fn activate(&self, session: &SessionStore) -> Option<NavIntent> {
        session.is_authenticated().then(|| self.redirect.clone())
    }

    /// Validate the form and start the simulated verification.
    /// Ignored while a verification is already pending.
    pub fn submit(&mut self, username: &str, password: &str) -> Result<(), LoginError> {
        if self.is_submitting() {
            debug!("Login already in progress");
            return Ok(());
        }
        self.error = None;

        if username.trim().is_empty() {
            return Err(self.fail(LoginError::MissingUsername));
        }
        if password.trim().is_empty() {
            return Err(self.fail(LoginError::MissingPassword));
        }

        self.timers.schedule_after(
            LOGIN_VERIFY_DELAY,
            PendingLogin {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
        Ok(())
    }

    /// Finish a verification whose delay has elapsed. Returns where to go
    /// on success.
    pub fn poll(&mut self, session: &mut SessionStore) -> Option<NavIntent> {
        let mut intent = None;
        for pending in self.timers.take_due() {
            if pending.password.chars().count() >= MIN_PASSWORD_LEN {
                session.login(&pending.username);
                info!("Login accepted for {}", pending.username);
                intent = Some(self.redirect.clone());
            } else {
                self.fail(LoginError::PasswordTooShort);
            }
        }
        intent
    }

    pub fn is_submitting(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn error(&self) -> Option<&LoginError> {
        self.error.as_ref()
    }

    pub fn redirect(&self) -> &NavIntent {
        &self.redirect
    }

    /// Time until the pending verification completes
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    fn fail(&mut self, error: LoginError) -> LoginError {
        debug!("Login rejected: {}", error);
        self.error = Some(error.clone());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::timer::ManualClock;

    fn setup(redirect: Option<&str>) -> (Arc<ManualClock>, LoginController, SessionStore) {
        let clock = Arc::new(ManualClock::new());
        let controller = LoginController::new(clock.clone(), redirect);
        let session = SessionStore::load(Arc::new(MemoryStorage::new()));
        (clock, controller, session)
    }

    #[test]
    fn test_valid_login_after_delay() {
        let (clock, mut form, mut session) = setup(None);
        form.submit("alice", "secret1").unwrap();
        assert!(form.is_submitting());

        clock.advance(Duration::from_millis(499));
        assert_eq!(form.poll(&mut session), None);
        assert!(!session.is_authenticated());

        clock.advance(Duration::from_millis(1));
        assert_eq!(form.poll(&mut session), Some(NavIntent::Home));
        assert_eq!(session.user().unwrap().username, "alice");
        assert!(!form.is_submitting());
    }

    #[test]
    fn test_redirect_target_honoured() {
        let (clock, mut form, mut session) = setup(Some("/cart"));
        form.submit("bob", "hunter22").unwrap();
        clock.advance(LOGIN_VERIFY_DELAY);
        assert_eq!(form.poll(&mut session), Some(NavIntent::Cart));
    }

    #[test]
    fn test_missing_fields() {
        let (clock, mut form, mut session) = setup(None);
        assert_eq!(form.submit("   ", "secret1"), Err(LoginError::MissingUsername));
        assert_eq!(form.error(), Some(&LoginError::MissingUsername));
        assert_eq!(form.submit("alice", ""), Err(LoginError::MissingPassword));
        assert!(!form.is_submitting());

        clock.advance(Duration::from_secs(1));
        assert_eq!(form.poll(&mut session), None);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_short_password_rejected_after_delay() {
        let (clock, mut form, mut session) = setup(None);
        form.submit("alice", "12345").unwrap();
        clock.advance(LOGIN_VERIFY_DELAY);

        assert_eq!(form.poll(&mut session), None);
        assert_eq!(form.error(), Some(&LoginError::PasswordTooShort));
        assert!(!session.is_authenticated());
        assert!(!form.is_submitting());
    }

    #[test]
    fn test_double_submit_ignored() {
        let (clock, mut form, mut session) = setup(None);
        form.submit("alice", "secret1").unwrap();
        form.submit("mallory", "secret2").unwrap();

        clock.advance(LOGIN_VERIFY_DELAY);
        form.poll(&mut session);
        assert_eq!(session.user().unwrap().username, "alice");
    }

    #[test]
    fn test_error_cleared_on_resubmit() {
        let (clock, mut form, mut session) = setup(None);
        let _ = form.submit("", "x");
        assert!(form.error().is_some());

        form.submit("alice", "secret1").unwrap();
        assert!(form.error().is_none());
        clock.advance(LOGIN_VERIFY_DELAY);
        assert!(form.poll(&mut session).is_some());
    }

    #[test]
    fn test_signed_in_user_skips_form() {
        let (_clock, form, mut session) = setup(Some("/products/4"));
        assert_eq!(form.activate(&session), None);

        session.login("carol");
        assert_eq!(form.activate(&session), Some(NavIntent::Product { id: 4 }));
    }
}
