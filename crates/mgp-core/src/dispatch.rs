use std::sync::Arc;

use serde::Serialize;

use crate::{
    domain::{ConversationId, Session},
    errors::Error,
    platform::port::PlatformClient,
    Result,
};

/// A validated broadcast: non-empty body, at least one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchRequest {
    body: String,
    targets: Vec<ConversationId>,
}

impl DispatchRequest {
    /// Duplicate ids collapse to their first position.
    pub fn new(body: impl Into<String>, targets: &[ConversationId]) -> Result<Self> {
        let body = body.into();
        if body.is_empty() {
            return Err(Error::precondition("message body is empty"));
        }

        let mut ordered: Vec<ConversationId> = Vec::with_capacity(targets.len());
        for id in targets {
            if !ordered.contains(id) {
                ordered.push(id.clone());
            }
        }
        if ordered.is_empty() {
            return Err(Error::precondition("no targets selected"));
        }

        Ok(Self {
            body,
            targets: ordered,
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn targets(&self) -> &[ConversationId] {
        &self.targets
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Delivered,
    Failed(String),
    NotAttempted,
}

/// Per-target outcomes, in selection order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub entries: Vec<(ConversationId, Outcome)>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, o)| matches!(o, Outcome::Delivered))
    }

    /// The target that halted the run, with its failure reason.
    pub fn first_failure(&self) -> Option<(&ConversationId, &str)> {
        self.entries.iter().find_map(|(id, o)| match o {
            Outcome::Failed(reason) => Some((id, reason.as_str())),
            _ => None,
        })
    }

    pub fn not_attempted(&self) -> Vec<&ConversationId> {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::NotAttempted))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn delivered_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Delivered))
            .count()
    }
}

/// Sequential, fail-fast broadcaster.
pub struct DispatchController {
    platform: Arc<dyn PlatformClient>,
}

impl DispatchController {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }

    /// Validate, then deliver `body` to each target in order.
    ///
    /// Precondition failures return `Err` before any platform call. A send
    /// failure is not an `Err`: it ends up in the report as `Failed`, and every
    /// later target as `NotAttempted`.
    pub async fn dispatch(
        &self,
        session: Option<&Session>,
        body: &str,
        targets: &[ConversationId],
    ) -> Result<DispatchReport> {
        let Some(session) = session else {
            return Err(Error::precondition("not authenticated"));
        };
        let request = DispatchRequest::new(body, targets)?;
        Ok(self.deliver(session, &request).await)
    }

    pub async fn deliver(&self, session: &Session, request: &DispatchRequest) -> DispatchReport {
        let mut entries = Vec::with_capacity(request.targets().len());
        let mut halted = false;

        for target in request.targets() {
            if halted {
                entries.push((target.clone(), Outcome::NotAttempted));
                continue;
            }
            match self
                .platform
                .send_message(session, target, request.body())
                .await
            {
                Ok(()) => {
                    tracing::debug!("delivered to {target}");
                    entries.push((target.clone(), Outcome::Delivered));
                }
                Err(e) => {
                    tracing::warn!("send to {target} failed, halting broadcast: {e}");
                    entries.push((target.clone(), Outcome::Failed(e.cause())));
                    halted = true;
                }
            }
        }

        DispatchReport { entries }
    }
}
