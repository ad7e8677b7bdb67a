//! In-memory `PlatformClient` used by the core's unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{Conversation, ConversationId, ConversationKind, Session, SessionId},
    errors::Error,
    platform::{
        port::PlatformClient,
        types::{LoginTicket, PasswordChallenge, SignInOutcome},
    },
    Result,
};

pub(crate) struct FakePlatform {
    pub code: String,
    pub password: Option<String>,
    pub reject_identifier: bool,
    /// `request_login_code` never completes.
    pub stall_login_code: bool,
    /// Number of upcoming listings that fail.
    pub failing_listings: AtomicUsize,
    pub conversations: Vec<Conversation>,
    /// Sends to these ids fail with the paired reason.
    pub failing_sends: Vec<(ConversationId, String)>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            code: "12345".to_string(),
            password: None,
            reject_identifier: false,
            stall_login_code: false,
            failing_listings: AtomicUsize::new(0),
            conversations: Vec::new(),
            failing_sends: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakePlatform {
    pub fn with_password(password: &str) -> Self {
        Self {
            password: Some(password.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Send calls only, as the target ids that were attempted.
    pub fn sends(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("send:").map(|s| s.to_string()))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn session() -> Session {
        Session {
            id: SessionId("fake-1".to_string()),
            account: "Test Account".to_string(),
        }
    }
}

pub(crate) fn conversation(id: &str, kind: ConversationKind) -> Conversation {
    Conversation {
        id: ConversationId(id.to_string()),
        title: format!("title {id}"),
        kind,
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn request_login_code(&self, identifier: &str) -> Result<LoginTicket> {
        self.record(format!("request_login_code:{identifier}"));
        if self.stall_login_code {
            std::future::pending::<()>().await;
        }
        if self.reject_identifier {
            return Err(Error::Platform("PHONE_NUMBER_INVALID".to_string()));
        }
        Ok(LoginTicket(7))
    }

    async fn sign_in(&self, ticket: &LoginTicket, code: &str) -> Result<SignInOutcome> {
        self.record(format!("sign_in:{}", ticket.0));
        if code != self.code {
            return Err(Error::Platform("PHONE_CODE_INVALID".to_string()));
        }
        match &self.password {
            Some(_) => Ok(SignInOutcome::PasswordRequired(PasswordChallenge {
                ticket: ticket.0,
                hint: Some("pet name".to_string()),
            })),
            None => Ok(SignInOutcome::Authorized(Self::session())),
        }
    }

    async fn check_password(
        &self,
        challenge: &PasswordChallenge,
        password: &str,
    ) -> Result<Session> {
        self.record(format!("check_password:{}", challenge.ticket));
        if self.password.as_deref() != Some(password) {
            return Err(Error::Platform("PASSWORD_HASH_INVALID".to_string()));
        }
        Ok(Self::session())
    }

    async fn list_conversations(&self, _session: &Session) -> Result<Vec<Conversation>> {
        self.record("list_conversations".to_string());
        let failing = self
            .failing_listings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::External("connection reset".to_string()));
        }
        Ok(self.conversations.clone())
    }

    async fn send_message(
        &self,
        _session: &Session,
        target: &ConversationId,
        _body: &str,
    ) -> Result<()> {
        self.record(format!("send:{target}"));
        if let Some((_, reason)) = self.failing_sends.iter().find(|(id, _)| id == target) {
            return Err(Error::External(reason.clone()));
        }
        Ok(())
    }
}
