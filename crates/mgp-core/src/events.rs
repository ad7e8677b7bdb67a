use serde::Serialize;
use tokio::sync::mpsc;

use crate::{auth::AuthState, dispatch::DispatchReport, domain::ConversationTarget};

/// Outbound signal for the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// Free-form progress text. Empty clears the status line.
    Status { text: String },
    Error {
        stage: Option<String>,
        message: String,
    },
    AuthState { state: AuthState },
    /// The account asked for its password; show the password input.
    RevealSecondaryFactor { hint: Option<String> },
    TargetsLoaded { targets: Vec<ConversationTarget> },
    Dispatched { report: DispatchReport },
}

/// Fire-and-forget event publisher.
///
/// A detached sink (or one whose receiver is gone) drops events silently:
/// the core never blocks on the presentation layer.
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn detached() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: UiEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, text: impl Into<String>) {
        self.emit(UiEvent::Status { text: text.into() });
    }

    pub fn error(&self, stage: Option<String>, message: impl Into<String>) {
        self.emit(UiEvent::Error {
            stage,
            message: message.into(),
        });
    }
}
