use std::{future::Future, sync::Arc};

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{
    auth::factor::FactorSource,
    domain::{CredentialBundle, Session},
    errors::{AuthStage, Error},
    events::{EventSink, UiEvent},
    platform::{port::PlatformClient, types::SignInOutcome},
    Result,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Idle,
    AwaitingIdentifier,
    AwaitingPrimaryFactor,
    AwaitingSecondaryFactor,
    Authenticated,
    Failed,
}

/// Drives the login handshake and owns the session until it exists.
///
/// - one session per controller: once `Authenticated`, further handshakes are refused
/// - a failed handshake discards the credential bundle; retry restarts from the identifier
/// - a cancelled handshake returns to `Idle` without producing a session
pub struct AuthController {
    platform: Arc<dyn PlatformClient>,
    events: EventSink,
    state: watch::Sender<AuthState>,
    credentials: std::sync::Mutex<CredentialBundle>,
    session: std::sync::Mutex<Option<Arc<Session>>>,
    handshake: Mutex<()>,
}

impl AuthController {
    pub fn new(platform: Arc<dyn PlatformClient>, events: EventSink) -> Self {
        let (state, _) = watch::channel(AuthState::Idle);
        Self {
            platform,
            events,
            state,
            credentials: std::sync::Mutex::new(CredentialBundle::default()),
            session: std::sync::Mutex::new(None),
            handshake: Mutex::new(()),
        }
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Snapshot of the values collected by the current handshake.
    pub fn credentials(&self) -> CredentialBundle {
        lock(&self.credentials).clone()
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        lock(&self.session).clone()
    }

    pub async fn authenticate(
        &self,
        identifier: &str,
        factors: FactorSource,
        cancel: &CancellationToken,
    ) -> Result<Arc<Session>> {
        let Ok(_guard) = self.handshake.try_lock() else {
            return Err(Error::auth(
                AuthStage::Identifier,
                "handshake already in progress",
            ));
        };
        if self.session().is_some() {
            return Err(Error::auth(
                AuthStage::Identifier,
                "session already established",
            ));
        }

        *lock(&self.credentials) = CredentialBundle::default();

        match self.run_handshake(identifier, factors, cancel).await {
            Ok(session) => {
                let session = Arc::new(session);
                *lock(&self.session) = Some(session.clone());
                tracing::info!(session = %session.id.0, "authenticated as {}", session.account);
                self.transition(AuthState::Authenticated);
                Ok(session)
            }
            Err(Error::Cancelled) => {
                *lock(&self.credentials) = CredentialBundle::default();
                tracing::info!("handshake cancelled");
                self.transition(AuthState::Idle);
                Err(Error::Cancelled)
            }
            Err(e) => {
                *lock(&self.credentials) = CredentialBundle::default();
                tracing::warn!("handshake failed: {e}");
                self.transition(AuthState::Failed);
                Err(e)
            }
        }
    }

    async fn run_handshake(
        &self,
        identifier: &str,
        factors: FactorSource,
        cancel: &CancellationToken,
    ) -> Result<Session> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::auth(AuthStage::Identifier, "missing"));
        }
        lock(&self.credentials).identifier = identifier.to_string();

        self.transition(AuthState::AwaitingIdentifier);
        let ticket = cancellable(cancel, self.platform.request_login_code(identifier))
            .await
            .map_err(at_stage(AuthStage::Identifier))?;

        self.transition(AuthState::AwaitingPrimaryFactor);
        let code = factors.primary.wait(cancel).await?;
        lock(&self.credentials).primary_factor = Some(code.clone());

        let outcome = cancellable(cancel, self.platform.sign_in(&ticket, &code))
            .await
            .map_err(at_stage(AuthStage::PrimaryFactor))?;

        let challenge = match outcome {
            SignInOutcome::Authorized(session) => return Ok(session),
            SignInOutcome::PasswordRequired(challenge) => challenge,
        };

        self.transition(AuthState::AwaitingSecondaryFactor);
        self.events.emit(UiEvent::RevealSecondaryFactor {
            hint: challenge.hint.clone(),
        });
        let password = factors.secondary.wait(cancel).await?;
        lock(&self.credentials).secondary_factor = Some(password.clone());

        cancellable(cancel, self.platform.check_password(&challenge, &password))
            .await
            .map_err(at_stage(AuthStage::SecondaryFactor))
    }

    fn transition(&self, next: AuthState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::debug!("auth state {prev:?} -> {next:?}");
            self.events.emit(UiEvent::AuthState { state: next });
        }
    }
}

fn lock<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn at_stage(stage: AuthStage) -> impl FnOnce(Error) -> Error {
    move |e| match e {
        Error::Cancelled => Error::Cancelled,
        other => Error::auth(stage, other.cause()),
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        r = fut => r,
    }
}
