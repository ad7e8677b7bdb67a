use std::fmt;

use serde::Serialize;

/// Platform conversation id, kept as text so any platform's id scheme fits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Authenticated session id (assigned by the platform adapter).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

/// Authenticated handle. Never mutated after the handshake produces it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    /// Human-readable account name, for status lines only.
    pub account: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// One-to-one chat with a user or bot.
    Direct,
    /// Multi-member group (basic groups and supergroups).
    Group,
    /// Broadcast channel.
    Channel,
}

/// A row of the platform's conversation list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub kind: ConversationKind,
}

/// A group conversation the operator may broadcast to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversationTarget {
    pub id: ConversationId,
    pub display_name: String,
}

/// Values collected during one handshake.
///
/// `primary_factor` is the one-time login code, `secondary_factor` the
/// account password. `None` means "not supplied yet".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialBundle {
    pub identifier: String,
    pub primary_factor: Option<String>,
    pub secondary_factor: Option<String>,
}

impl CredentialBundle {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            primary_factor: None,
            secondary_factor: None,
        }
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("CredentialBundle")
            .field("identifier", &self.identifier)
            .field("primary_factor", &redact(&self.primary_factor))
            .field("secondary_factor", &redact(&self.secondary_factor))
            .finish()
    }
}
