use std::sync::Arc;

use crate::{
    domain::{ConversationKind, ConversationTarget, Session},
    errors::Error,
    platform::port::PlatformClient,
    Result,
};

/// One-shot listing of the session's group conversations.
pub struct DirectoryLoader {
    platform: Arc<dyn PlatformClient>,
}

impl DirectoryLoader {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }

    /// Group conversations only, in the order the platform returned them.
    pub async fn list_group_targets(&self, session: &Session) -> Result<Vec<ConversationTarget>> {
        let conversations = self
            .platform
            .list_conversations(session)
            .await
            .map_err(|e| Error::Directory(e.cause()))?;

        let total = conversations.len();
        let targets: Vec<ConversationTarget> = conversations
            .into_iter()
            .filter(|c| c.kind == ConversationKind::Group)
            .map(|c| ConversationTarget {
                id: c.id,
                display_name: c.title,
            })
            .collect();

        tracing::info!("loaded {} group targets out of {total} conversations", targets.len());
        Ok(targets)
    }
}
