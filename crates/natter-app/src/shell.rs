//! Application shell state machine.
//!
//! Drives the `Loading -> {Unauthenticated, Authenticated, EmailVerification}`
//! phase transitions around an [`IdentityProvider`]. The provider's
//! auth-event broadcasts are mirrored into local state, alongside the
//! user-visible error and info messages the views render.

use std::sync::Arc;

use natter_core::{AuthEvent, AuthUser, IdentityProvider};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;

use crate::launch::LaunchParams;

/// Shown when the provider rejects a verification token.
const VERIFICATION_REJECTED: &str =
    "Email verification failed. The link may be expired or invalid.";

/// Shown when the verification exchange fails before the provider could
/// judge the token (transport failure and the like).
const VERIFICATION_ERROR: &str =
    "An error occurred during email verification. Please try again.";

/// Shown after a sign-up the provider answered without a session.
const VERIFICATION_PENDING: &str =
    "Account created. Please check your inbox and verify your email before signing in.";

/// Top-level phase the shell is in.
///
/// Views render exactly one screen per phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Startup still evaluating launch parameters.
    Loading,
    /// Sign-in / sign-up form.
    Unauthenticated,
    /// Dashboard and chat views.
    Authenticated,
    /// Outcome screen for an email-verification launch.
    EmailVerification(VerificationOutcome),
}

/// Result of handling a verification launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The token exchange succeeded; the user signs in explicitly next.
    Verified,
    /// The exchange failed; the message is suitable for direct display.
    Failed(String),
}

#[derive(Debug)]
struct ShellState {
    phase: Phase,
    user: Option<AuthUser>,
    error: Option<String>,
    info: Option<String>,
    launch: LaunchParams,
}

impl ShellState {
    fn new() -> Self {
        Self {
            phase: Phase::Loading,
            user: None,
            error: None,
            info: None,
            launch: LaunchParams::none(),
        }
    }
}

/// Aborts the auth-event subscription task when released.
struct EventMirror {
    task: JoinHandle<()>,
}

impl Drop for EventMirror {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Application shell around an identity provider.
///
/// One instance drives one front-end. The shell holds at most one live
/// subscription to the provider's auth events; the subscription is a guard
/// torn down when the shell is dropped, never a process-wide singleton.
pub struct AppShell {
    identity: Arc<dyn IdentityProvider>,
    state: Arc<RwLock<ShellState>>,
    mirror: Mutex<Option<EventMirror>>,
}

impl AppShell {
    /// Creates a shell in the `Loading` phase.
    ///
    /// # Arguments
    ///
    /// * `identity` - The identity provider the shell authenticates against
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            state: Arc::new(RwLock::new(ShellState::new())),
            mirror: Mutex::new(None),
        }
    }

    /// Evaluates launch parameters and settles the initial phase.
    ///
    /// A complete verification pair is exchanged for a session; the shell
    /// signs out again right after a successful exchange so the user
    /// authenticates explicitly. The consumed pair is stripped from the
    /// retained launch state in every outcome.
    ///
    /// Any other start invalidates a possibly stale provider session and
    /// lands on the sign-in form.
    pub async fn start(&self, launch: LaunchParams) -> Phase {
        self.subscribe_auth_events().await;

        {
            let mut state = self.state.write().await;
            state.launch = launch.clone();
        }

        if let Some(token) = launch.verification_token() {
            let outcome = self.exchange_verification_token(token).await;
            let mut state = self.state.write().await;
            state.launch = LaunchParams::none();
            state.phase = Phase::EmailVerification(outcome);
            return state.phase.clone();
        }

        // Clear any stale session before showing the sign-in form.
        if let Err(err) = self.identity.sign_out().await {
            tracing::warn!("Failed to clear stale session at startup: {}", err);
        }

        let mut state = self.state.write().await;
        state.phase = Phase::Unauthenticated;
        state.phase.clone()
    }

    /// Signs in with email and password.
    ///
    /// Provider failures are never fatal: the provider's own message is
    /// retained for the views and the shell stays on the sign-in form.
    pub async fn sign_in(&self, email: &str, password: &str) -> Phase {
        match self.identity.sign_in(email, password).await {
            Ok(session) => {
                let mut state = self.state.write().await;
                state.user = Some(session.user);
                state.error = None;
                state.info = None;
                state.phase = Phase::Authenticated;
                state.phase.clone()
            }
            Err(err) => {
                tracing::warn!("Sign-in rejected: {}", err);
                let mut state = self.state.write().await;
                state.error = Some(err.to_string());
                state.info = None;
                state.phase = Phase::Unauthenticated;
                state.phase.clone()
            }
        }
    }

    /// Registers a new account.
    ///
    /// A provider that requires email verification answers without a
    /// session; the shell surfaces an informational notice instead of
    /// authenticating.
    pub async fn sign_up(&self, email: &str, password: &str) -> Phase {
        match self.identity.sign_up(email, password).await {
            Ok(Some(session)) => {
                let mut state = self.state.write().await;
                state.user = Some(session.user);
                state.error = None;
                state.info = None;
                state.phase = Phase::Authenticated;
                state.phase.clone()
            }
            Ok(None) => {
                let mut state = self.state.write().await;
                state.error = None;
                state.info = Some(VERIFICATION_PENDING.to_string());
                state.phase = Phase::Unauthenticated;
                state.phase.clone()
            }
            Err(err) => {
                tracing::warn!("Sign-up rejected: {}", err);
                let mut state = self.state.write().await;
                state.error = Some(err.to_string());
                state.info = None;
                state.phase = Phase::Unauthenticated;
                state.phase.clone()
            }
        }
    }

    /// Signs out and returns the shell to the sign-in form.
    ///
    /// Clears the user mirror, both message slots, and any retained launch
    /// parameters regardless of the prior phase.
    pub async fn sign_out(&self) -> Phase {
        if let Err(err) = self.identity.sign_out().await {
            tracing::warn!("Sign-out failed: {}", err);
        }

        let mut state = self.state.write().await;
        state.user = None;
        state.error = None;
        state.info = None;
        state.launch = LaunchParams::none();
        state.phase = Phase::Unauthenticated;
        state.phase.clone()
    }

    /// Leaves the verification outcome screen for the sign-in form.
    pub async fn acknowledge_verification(&self) -> Phase {
        let mut state = self.state.write().await;
        if matches!(state.phase, Phase::EmailVerification(_)) {
            state.phase = Phase::Unauthenticated;
        }
        state.phase.clone()
    }

    /// Current phase snapshot.
    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase.clone()
    }

    /// The authenticated user mirrored from the provider, if any.
    pub async fn user(&self) -> Option<AuthUser> {
        self.state.read().await.user.clone()
    }

    /// The last user-visible error, if any.
    pub async fn error_message(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// The last informational notice, if any.
    pub async fn info_message(&self) -> Option<String> {
        self.state.read().await.info.clone()
    }

    /// Launch parameters still retained from startup.
    pub async fn launch_params(&self) -> LaunchParams {
        self.state.read().await.launch.clone()
    }

    async fn exchange_verification_token(&self, refresh_token: &str) -> VerificationOutcome {
        match self.identity.set_session(refresh_token).await {
            Ok(_) => {
                // The verified session is discarded on purpose: the user
                // signs in explicitly after verification.
                if let Err(err) = self.identity.sign_out().await {
                    tracing::warn!("Failed to sign out after verification: {}", err);
                }
                VerificationOutcome::Verified
            }
            Err(err) if err.is_auth() => {
                tracing::warn!("Verification token rejected: {}", err);
                VerificationOutcome::Failed(VERIFICATION_REJECTED.to_string())
            }
            Err(err) => {
                tracing::error!("Verification exchange failed: {}", err);
                VerificationOutcome::Failed(VERIFICATION_ERROR.to_string())
            }
        }
    }

    /// Spawns the auth-event mirror task once per shell instance.
    async fn subscribe_auth_events(&self) {
        let mut mirror = self.mirror.lock().await;
        if mirror.is_some() {
            return;
        }

        let events = self.identity.subscribe();
        let state = Arc::clone(&self.state);
        *mirror = Some(EventMirror {
            task: tokio::spawn(mirror_auth_events(state, events)),
        });
    }
}

/// Keeps the authenticated/user mirror in sync with provider broadcasts.
///
/// Verification outcome screens are never overridden by events: the
/// sign-out performed right after a successful exchange must not bounce
/// the shell back to the sign-in form while the outcome is displayed.
async fn mirror_auth_events(
    state: Arc<RwLock<ShellState>>,
    mut events: broadcast::Receiver<AuthEvent>,
) {
    loop {
        match events.recv().await {
            Ok(AuthEvent::SignedIn { session }) => {
                let mut state = state.write().await;
                state.user = Some(session.user);
                if !matches!(state.phase, Phase::EmailVerification(_)) {
                    state.phase = Phase::Authenticated;
                }
            }
            Ok(AuthEvent::SignedOut) => {
                let mut state = state.write().await;
                state.user = None;
                if state.phase == Phase::Authenticated {
                    state.phase = Phase::Unauthenticated;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Auth event stream lagged, {} events dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use natter_core::{AuthSession, NatterError, Result};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn session_for(id: &str, email: &str) -> AuthSession {
        AuthSession {
            access_token: "access-token".to_string(),
            refresh_token: "refresh-token".to_string(),
            user: AuthUser {
                id: id.to_string(),
                email: email.to_string(),
            },
        }
    }

    /// Scriptable identity provider: each operation consumes a canned
    /// response and records the call.
    struct MockIdentityProvider {
        sign_in_response: StdMutex<Option<Result<AuthSession>>>,
        sign_up_response: StdMutex<Option<Result<Option<AuthSession>>>>,
        exchange_response: StdMutex<Option<Result<AuthSession>>>,
        session: StdMutex<Option<AuthSession>>,
        exchanged_tokens: StdMutex<Vec<String>>,
        sign_out_calls: StdMutex<usize>,
        events: broadcast::Sender<AuthEvent>,
    }

    impl MockIdentityProvider {
        fn new() -> Self {
            let (events, _) = broadcast::channel(16);
            Self {
                sign_in_response: StdMutex::new(None),
                sign_up_response: StdMutex::new(None),
                exchange_response: StdMutex::new(None),
                session: StdMutex::new(None),
                exchanged_tokens: StdMutex::new(Vec::new()),
                sign_out_calls: StdMutex::new(0),
                events,
            }
        }

        fn script_sign_in(&self, response: Result<AuthSession>) {
            *self.sign_in_response.lock().unwrap() = Some(response);
        }

        fn script_sign_up(&self, response: Result<Option<AuthSession>>) {
            *self.sign_up_response.lock().unwrap() = Some(response);
        }

        fn script_exchange(&self, response: Result<AuthSession>) {
            *self.exchange_response.lock().unwrap() = Some(response);
        }

        fn sign_out_calls(&self) -> usize {
            *self.sign_out_calls.lock().unwrap()
        }

        fn exchanged_tokens(&self) -> Vec<String> {
            self.exchanged_tokens.lock().unwrap().clone()
        }

        fn publish(&self, event: AuthEvent) {
            let _ = self.events.send(event);
        }

        fn store(&self, session: AuthSession) {
            *self.session.lock().unwrap() = Some(session.clone());
            let _ = self.events.send(AuthEvent::SignedIn { session });
        }
    }

    #[async_trait]
    impl IdentityProvider for MockIdentityProvider {
        async fn sign_in(&self, _email: &str, _password: &str) -> Result<AuthSession> {
            let response = self
                .sign_in_response
                .lock()
                .unwrap()
                .take()
                .expect("unscripted sign_in");
            if let Ok(session) = &response {
                self.store(session.clone());
            }
            response
        }

        async fn sign_up(&self, _email: &str, _password: &str) -> Result<Option<AuthSession>> {
            let response = self
                .sign_up_response
                .lock()
                .unwrap()
                .take()
                .expect("unscripted sign_up");
            if let Ok(Some(session)) = &response {
                self.store(session.clone());
            }
            response
        }

        async fn sign_out(&self) -> Result<()> {
            *self.sign_out_calls.lock().unwrap() += 1;
            if self.session.lock().unwrap().take().is_some() {
                let _ = self.events.send(AuthEvent::SignedOut);
            }
            Ok(())
        }

        async fn set_session(&self, refresh_token: &str) -> Result<AuthSession> {
            self.exchanged_tokens
                .lock()
                .unwrap()
                .push(refresh_token.to_string());
            let response = self
                .exchange_response
                .lock()
                .unwrap()
                .take()
                .expect("unscripted set_session");
            if let Ok(session) = &response {
                self.store(session.clone());
            }
            response
        }

        async fn session(&self) -> Option<AuthSession> {
            self.session.lock().unwrap().clone()
        }

        async fn access_token(&self) -> Option<String> {
            self.session
                .lock()
                .unwrap()
                .as_ref()
                .map(|s| s.access_token.clone())
        }

        fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
            self.events.subscribe()
        }
    }

    /// Lets the spawned mirror task drain pending events.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_plain_start_clears_stale_session_and_shows_sign_in() {
        let provider = Arc::new(MockIdentityProvider::new());
        let shell = AppShell::new(provider.clone());

        let phase = shell.start(LaunchParams::none()).await;

        assert_eq!(phase, Phase::Unauthenticated);
        assert_eq!(provider.sign_out_calls(), 1);
        assert_eq!(shell.user().await, None);
    }

    #[tokio::test]
    async fn test_verification_launch_exchanges_then_discards_the_session() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_exchange(Ok(session_for("user-1", "amy@example.com")));
        let shell = AppShell::new(provider.clone());

        let launch =
            LaunchParams::from_link("https://app.example.com/?refreshToken=tok-123&type=verifyEmail");
        let phase = shell.start(launch).await;

        assert_eq!(phase, Phase::EmailVerification(VerificationOutcome::Verified));
        assert_eq!(provider.exchanged_tokens(), vec!["tok-123".to_string()]);
        assert_eq!(provider.sign_out_calls(), 1);
        assert!(provider.session().await.is_none());
        assert!(shell.launch_params().await.is_empty());

        // The SignedIn/SignedOut pair from the exchange must not knock the
        // shell off the outcome screen.
        settle().await;
        assert_eq!(
            shell.phase().await,
            Phase::EmailVerification(VerificationOutcome::Verified)
        );
        assert_eq!(shell.user().await, None);
    }

    #[tokio::test]
    async fn test_rejected_verification_token_fails_with_message() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_exchange(Err(NatterError::auth(401, "invalid-refresh-token")));
        let shell = AppShell::new(provider.clone());

        let launch =
            LaunchParams::from_link("https://app.example.com/?refreshToken=expired&type=verifyEmail");
        let phase = shell.start(launch).await;

        match phase {
            Phase::EmailVerification(VerificationOutcome::Failed(message)) => {
                assert_eq!(
                    message,
                    "Email verification failed. The link may be expired or invalid."
                );
            }
            other => panic!("expected failed verification, got {:?}", other),
        }
        assert!(shell.launch_params().await.is_empty());
    }

    #[tokio::test]
    async fn test_verification_transport_failure_fails_with_generic_message() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_exchange(Err(NatterError::http("connection refused", true)));
        let shell = AppShell::new(provider.clone());

        let launch =
            LaunchParams::from_link("https://app.example.com/?refreshToken=tok-5&type=verifyEmail");
        let phase = shell.start(launch).await;

        assert_eq!(
            phase,
            Phase::EmailVerification(VerificationOutcome::Failed(
                "An error occurred during email verification. Please try again.".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_incomplete_pair_falls_through_to_sign_in() {
        let provider = Arc::new(MockIdentityProvider::new());
        let shell = AppShell::new(provider.clone());

        let launch = LaunchParams::from_link("https://app.example.com/?refreshToken=tok-123");
        let phase = shell.start(launch).await;

        assert_eq!(phase, Phase::Unauthenticated);
        assert!(provider.exchanged_tokens().is_empty());
        // The non-verification leftovers stay retained until sign-out.
        assert!(!shell.launch_params().await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_success_authenticates_and_mirrors_user() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_sign_in(Ok(session_for("user-7", "kim@example.com")));
        let shell = AppShell::new(provider.clone());
        shell.start(LaunchParams::none()).await;

        let phase = shell.sign_in("kim@example.com", "hunter2").await;

        assert_eq!(phase, Phase::Authenticated);
        let user = shell.user().await.expect("user mirrored");
        assert_eq!(user.id, "user-7");
        assert_eq!(user.email, "kim@example.com");
        assert_eq!(shell.error_message().await, None);
    }

    #[tokio::test]
    async fn test_sign_in_failure_surfaces_provider_message() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_sign_in(Err(NatterError::auth(401, "Incorrect email or password")));
        let shell = AppShell::new(provider.clone());
        shell.start(LaunchParams::none()).await;

        let phase = shell.sign_in("kim@example.com", "wrong").await;

        assert_eq!(phase, Phase::Unauthenticated);
        assert_eq!(
            shell.error_message().await,
            Some("Incorrect email or password".to_string())
        );
        assert_eq!(shell.user().await, None);
    }

    #[tokio::test]
    async fn test_sign_up_with_session_authenticates() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_sign_up(Ok(Some(session_for("user-2", "new@example.com"))));
        let shell = AppShell::new(provider.clone());
        shell.start(LaunchParams::none()).await;

        let phase = shell.sign_up("new@example.com", "hunter2").await;

        assert_eq!(phase, Phase::Authenticated);
        assert_eq!(shell.user().await.map(|u| u.email), Some("new@example.com".to_string()));
        assert_eq!(shell.info_message().await, None);
    }

    #[tokio::test]
    async fn test_sign_up_without_session_surfaces_pending_notice() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_sign_up(Ok(None));
        let shell = AppShell::new(provider.clone());
        shell.start(LaunchParams::none()).await;

        let phase = shell.sign_up("new@example.com", "hunter2").await;

        assert_eq!(phase, Phase::Unauthenticated);
        assert_eq!(shell.user().await, None);
        let info = shell.info_message().await.expect("pending notice");
        assert!(info.contains("check your inbox"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_messages_user_and_launch_params() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_sign_up(Ok(None));
        let shell = AppShell::new(provider.clone());
        shell
            .start(LaunchParams::from_link("https://app.example.com/?refreshToken=tok"))
            .await;
        shell.sign_up("new@example.com", "hunter2").await;
        assert!(shell.info_message().await.is_some());

        let phase = shell.sign_out().await;

        assert_eq!(phase, Phase::Unauthenticated);
        assert_eq!(shell.user().await, None);
        assert_eq!(shell.error_message().await, None);
        assert_eq!(shell.info_message().await, None);
        assert!(shell.launch_params().await.is_empty());
    }

    #[tokio::test]
    async fn test_provider_events_keep_the_mirror_in_sync() {
        let provider = Arc::new(MockIdentityProvider::new());
        let shell = AppShell::new(provider.clone());
        shell.start(LaunchParams::none()).await;

        provider.publish(AuthEvent::SignedIn {
            session: session_for("user-9", "eve@example.com"),
        });
        settle().await;
        assert_eq!(shell.phase().await, Phase::Authenticated);
        assert_eq!(shell.user().await.map(|u| u.id), Some("user-9".to_string()));

        provider.publish(AuthEvent::SignedOut);
        settle().await;
        assert_eq!(shell.phase().await, Phase::Unauthenticated);
        assert_eq!(shell.user().await, None);
    }

    #[tokio::test]
    async fn test_acknowledge_verification_returns_to_sign_in() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.script_exchange(Ok(session_for("user-1", "amy@example.com")));
        let shell = AppShell::new(provider.clone());
        shell
            .start(LaunchParams::from_link(
                "https://app.example.com/?refreshToken=tok-123&type=verifyEmail",
            ))
            .await;

        let phase = shell.acknowledge_verification().await;

        assert_eq!(phase, Phase::Unauthenticated);
    }

    #[tokio::test]
    async fn test_dropping_the_shell_releases_the_subscription() {
        let provider = Arc::new(MockIdentityProvider::new());
        let shell = AppShell::new(provider.clone());
        shell.start(LaunchParams::none()).await;

        drop(shell);
        settle().await;

        // The mirror task held the only receiver; once aborted the channel
        // reports no subscribers again.
        assert_eq!(provider.events.receiver_count(), 0);
    }
}
