use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    auth::{AuthController, AuthState, FactorSource},
    directory::DirectoryLoader,
    dispatch::{DispatchController, DispatchReport},
    domain::{ConversationId, ConversationTarget, Session},
    errors::Error,
    events::{EventSink, UiEvent},
    platform::port::PlatformClient,
    Result,
};

#[derive(Debug, Default)]
struct PosterState {
    targets: Vec<ConversationTarget>,
    draft: String,
    selection: Vec<ConversationId>,
}

/// Application service behind the presentation layer.
///
/// Wires the three controllers together and keeps the operator's draft and
/// target selection between events:
/// - `login` = handshake + group listing
/// - `send` = broadcast of the current draft to the current selection
pub struct Poster {
    auth: AuthController,
    directory: DirectoryLoader,
    dispatcher: DispatchController,
    events: EventSink,
    state: Mutex<PosterState>,
}

impl Poster {
    pub fn new(platform: Arc<dyn PlatformClient>, events: EventSink) -> Self {
        Self {
            auth: AuthController::new(platform.clone(), events.clone()),
            directory: DirectoryLoader::new(platform.clone()),
            dispatcher: DispatchController::new(platform),
            events,
            state: Mutex::new(PosterState::default()),
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.auth.session()
    }

    /// Authenticate, then load the group targets.
    pub async fn login(
        &self,
        identifier: &str,
        factors: FactorSource,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConversationTarget>> {
        self.events.status("Initializing client...");

        let session = match self.auth.authenticate(identifier, factors, cancel).await {
            Ok(s) => s,
            Err(e) => {
                self.report_failure(&e, "Failed to log in");
                return Err(e);
            }
        };

        self.events.status("Logged in successfully. Fetching groups...");
        self.fetch_targets(&session, "Failed to log in").await
    }

    /// Re-list the group targets on the existing session.
    ///
    /// Recovers from a directory failure after a successful login without a
    /// new handshake.
    pub async fn load_targets(&self) -> Result<Vec<ConversationTarget>> {
        let Some(session) = self.auth.session() else {
            let err = Error::Directory("not authenticated".to_string());
            self.report_failure(&err, "Failed to load groups");
            return Err(err);
        };
        self.events.status("Fetching groups...");
        self.fetch_targets(&session, "Failed to load groups").await
    }

    async fn fetch_targets(
        &self,
        session: &Session,
        failure_prefix: &str,
    ) -> Result<Vec<ConversationTarget>> {
        let targets = match self.directory.list_group_targets(session).await {
            Ok(t) => t,
            Err(e) => {
                self.report_failure(&e, failure_prefix);
                return Err(e);
            }
        };

        {
            let mut st = self.state.lock().await;
            st.targets = targets.clone();
            st.selection.retain(|id| targets.iter().any(|t| &t.id == id));
        }
        self.events.emit(UiEvent::TargetsLoaded {
            targets: targets.clone(),
        });
        self.events.status("Ready to post");
        Ok(targets)
    }

    pub async fn targets(&self) -> Vec<ConversationTarget> {
        self.state.lock().await.targets.clone()
    }

    pub async fn set_draft(&self, body: impl Into<String>) {
        self.state.lock().await.draft = body.into();
    }

    pub async fn draft(&self) -> String {
        self.state.lock().await.draft.clone()
    }

    /// Checkbox toggle. Selection keeps the order ids were first checked in.
    ///
    /// Returns false for ids that are not among the loaded targets.
    pub async fn toggle_target(&self, id: &ConversationId, selected: bool) -> bool {
        let mut st = self.state.lock().await;
        if !st.targets.iter().any(|t| &t.id == id) {
            return false;
        }
        if selected {
            if !st.selection.contains(id) {
                st.selection.push(id.clone());
            }
        } else {
            st.selection.retain(|s| s != id);
        }
        true
    }

    pub async fn selection(&self) -> Vec<ConversationId> {
        self.state.lock().await.selection.clone()
    }

    /// Broadcast the draft to the selected targets.
    ///
    /// Full success clears draft and selection. A failed target leaves both
    /// in place so the operator can narrow the selection and send again.
    pub async fn send(&self) -> Result<DispatchReport> {
        let (body, selection) = {
            let st = self.state.lock().await;
            (st.draft.clone(), st.selection.clone())
        };
        let session = self.auth.session();

        self.events.status("Sending messages...");
        let report = match self
            .dispatcher
            .dispatch(session.as_deref(), &body, &selection)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                self.report_failure(&e, "Cannot send");
                return Err(e);
            }
        };

        self.events.emit(UiEvent::Dispatched {
            report: report.clone(),
        });

        if let Some((id, reason)) = report.first_failure() {
            self.events.status("");
            self.events.error(
                Some("dispatch".to_string()),
                format!("Error sending to group {id}: {reason}"),
            );
            return Ok(report);
        }

        {
            let mut st = self.state.lock().await;
            st.draft.clear();
            st.selection.clear();
        }
        tracing::info!("broadcast delivered to {} groups", report.delivered_count());
        self.events.status("Messages sent successfully!");
        Ok(report)
    }

    fn report_failure(&self, err: &Error, prefix: &str) {
        let stage = match err {
            Error::Auth { stage, .. } => Some(stage.to_string()),
            Error::Directory(_) => Some("directory".to_string()),
            Error::Dispatch { .. } => Some("dispatch".to_string()),
            _ => None,
        };
        self.events.status("");
        self.events.error(stage, format!("{prefix}: {}", err.cause()));
    }
}
