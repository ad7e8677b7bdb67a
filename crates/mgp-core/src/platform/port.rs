use async_trait::async_trait;

use crate::{
    domain::{Conversation, ConversationId, Session},
    platform::types::{LoginTicket, PasswordChallenge, SignInOutcome},
    Result,
};

/// Port for the messaging platform the poster talks to.
///
/// Each handshake step takes the state produced by the previous one
/// (ticket, challenge) instead of reading it back through callbacks.
/// Implementations report a remote rejection as `Error::Platform` and a
/// transport failure as `Error::External`.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Ask the platform to deliver a one-time login code to `identifier`.
    async fn request_login_code(&self, identifier: &str) -> Result<LoginTicket>;

    async fn sign_in(&self, ticket: &LoginTicket, code: &str) -> Result<SignInOutcome>;

    async fn check_password(&self, challenge: &PasswordChallenge, password: &str)
        -> Result<Session>;

    /// Full conversation list in the platform's own order.
    async fn list_conversations(&self, session: &Session) -> Result<Vec<Conversation>>;

    async fn send_message(
        &self,
        session: &Session,
        target: &ConversationId,
        body: &str,
    ) -> Result<()>;
}
