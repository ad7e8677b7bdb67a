//! Telegram adapter (MTProto user client via grammers).
//!
//! This crate implements the `mgp-core` PlatformClient port. Login state
//! (code and password tokens) lives here between handshake steps; the core
//! only sees opaque tickets.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;

use grammers_client::{
    types::{Chat, LoginToken, PasswordToken, User},
    Client, Config, InitParams, SignInError,
};
use grammers_session::{PackedChat, Session as MtSession};

use tokio::sync::Mutex;

use mgp_core::{
    domain::{Conversation, ConversationId, ConversationKind, Session, SessionId},
    errors::Error,
    platform::{
        port::PlatformClient,
        types::{LoginTicket, PasswordChallenge, SignInOutcome},
    },
    Result,
};

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub api_id: i32,
    pub api_hash: String,
    pub connection_retries: u32,
}

impl From<&mgp_core::config::Config> for TelegramConfig {
    fn from(cfg: &mgp_core::config::Config) -> Self {
        Self {
            api_id: cfg.api_id,
            api_hash: cfg.api_hash.clone(),
            connection_retries: cfg.connection_retries,
        }
    }
}

/// Tokens of the handshake in progress, keyed by ticket.
///
/// Only one handshake is live at a time: starting a new one or completing
/// the current one drops whatever is left.
struct Pending<L = LoginToken, P = PasswordToken> {
    login: HashMap<u64, L>,
    password: HashMap<u64, P>,
}

impl<L, P> Default for Pending<L, P> {
    fn default() -> Self {
        Self {
            login: HashMap::new(),
            password: HashMap::new(),
        }
    }
}

impl<L, P> Pending<L, P> {
    fn begin(&mut self, ticket: u64, token: L) {
        self.clear();
        self.login.insert(ticket, token);
    }

    fn clear(&mut self) {
        self.login.clear();
        self.password.clear();
    }
}

struct Account {
    session: SessionId,
    /// Peers seen by the last listing, keyed by conversation id.
    peers: HashMap<String, PackedChat>,
}

pub struct TelegramPlatform {
    cfg: TelegramConfig,
    client: Mutex<Option<Client>>,
    pending: Mutex<Pending>,
    account: Mutex<Option<Account>>,
    next_ticket: AtomicU64,
}

impl TelegramPlatform {
    pub fn new(cfg: TelegramConfig) -> Self {
        Self {
            cfg,
            client: Mutex::new(None),
            pending: Mutex::new(Pending::default()),
            account: Mutex::new(None),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Connect on first use. The MTProto session is in-memory only.
    async fn client(&self) -> Result<Client> {
        let mut guard = self.client.lock().await;
        if let Some(c) = guard.as_ref() {
            return Ok(c.clone());
        }

        let attempts = self.cfg.connection_retries.max(1);
        let mut last_err = String::new();
        for attempt in 1..=attempts {
            let res = Client::connect(Config {
                session: MtSession::new(),
                api_id: self.cfg.api_id,
                api_hash: self.cfg.api_hash.clone(),
                params: InitParams::default(),
            })
            .await;
            match res {
                Ok(c) => {
                    tracing::info!("connected to Telegram (attempt {attempt}/{attempts})");
                    *guard = Some(c.clone());
                    return Ok(c);
                }
                Err(e) => {
                    tracing::warn!("connect attempt {attempt}/{attempts} failed: {e}");
                    last_err = e.to_string();
                }
            }
        }
        Err(Error::External(format!("telegram connect failed: {last_err}")))
    }

    fn ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::Relaxed)
    }

    async fn authorized(&self, user: User) -> Session {
        self.pending.lock().await.clear();
        let session = Session {
            id: SessionId(user.id().to_string()),
            account: user.full_name(),
        };
        *self.account.lock().await = Some(Account {
            session: session.id.clone(),
            peers: HashMap::new(),
        });
        session
    }

    async fn ensure_session(&self, session: &Session) -> Result<()> {
        match self.account.lock().await.as_ref() {
            Some(acc) if acc.session == session.id => Ok(()),
            Some(_) => Err(Error::Platform(
                "session does not belong to this client".to_string(),
            )),
            None => Err(Error::Platform("not authenticated".to_string())),
        }
    }
}

/// RPC errors are rejections by Telegram; anything else is transport.
fn map_err(e: impl std::fmt::Display) -> Error {
    let msg = e.to_string();
    if msg.contains("rpc error") {
        Error::Platform(msg)
    } else {
        Error::External(msg)
    }
}

fn kind_of(chat: &Chat) -> ConversationKind {
    match chat {
        Chat::User(_) => ConversationKind::Direct,
        Chat::Group(_) => ConversationKind::Group,
        Chat::Channel(_) => ConversationKind::Channel,
    }
}

#[async_trait]
impl PlatformClient for TelegramPlatform {
    async fn request_login_code(&self, identifier: &str) -> Result<LoginTicket> {
        let client = self.client().await?;
        let token = client
            .request_login_code(identifier)
            .await
            .map_err(map_err)?;

        let id = self.ticket();
        self.pending.lock().await.begin(id, token);
        tracing::info!("login code requested");
        Ok(LoginTicket(id))
    }

    async fn sign_in(&self, ticket: &LoginTicket, code: &str) -> Result<SignInOutcome> {
        let client = self.client().await?;
        let token = self
            .pending
            .lock()
            .await
            .login
            .remove(&ticket.0)
            .ok_or_else(|| Error::Platform("unknown or expired login ticket".to_string()))?;

        match client.sign_in(&token, code.trim()).await {
            Ok(user) => Ok(SignInOutcome::Authorized(self.authorized(user).await)),
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().map(|h| h.to_string());
                let id = self.ticket();
                self.pending
                    .lock()
                    .await
                    .password
                    .insert(id, password_token);
                Ok(SignInOutcome::PasswordRequired(PasswordChallenge {
                    ticket: id,
                    hint,
                }))
            }
            Err(SignInError::InvalidCode) => {
                Err(Error::Platform("invalid login code".to_string()))
            }
            Err(e) => Err(map_err(e)),
        }
    }

    async fn check_password(
        &self,
        challenge: &PasswordChallenge,
        password: &str,
    ) -> Result<Session> {
        let client = self.client().await?;
        let token = self
            .pending
            .lock()
            .await
            .password
            .remove(&challenge.ticket)
            .ok_or_else(|| Error::Platform("unknown or expired password challenge".to_string()))?;

        match client.check_password(token, password).await {
            Ok(user) => Ok(self.authorized(user).await),
            Err(SignInError::InvalidPassword) => {
                Err(Error::Platform("invalid password".to_string()))
            }
            Err(e) => Err(map_err(e)),
        }
    }

    async fn list_conversations(&self, session: &Session) -> Result<Vec<Conversation>> {
        self.ensure_session(session).await?;
        let client = self.client().await?;

        let mut out = Vec::new();
        let mut peers = HashMap::new();
        let mut dialogs = client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(map_err)? {
            let chat = dialog.chat();
            let id = chat.id().to_string();
            peers.insert(id.clone(), chat.pack());
            out.push(Conversation {
                id: ConversationId(id),
                title: chat.name().to_string(),
                kind: kind_of(chat),
            });
        }

        if let Some(acc) = self.account.lock().await.as_mut() {
            acc.peers = peers;
        }
        Ok(out)
    }

    async fn send_message(
        &self,
        session: &Session,
        target: &ConversationId,
        body: &str,
    ) -> Result<()> {
        self.ensure_session(session).await?;
        let peer = self
            .account
            .lock()
            .await
            .as_ref()
            .and_then(|acc| acc.peers.get(&target.0).copied())
            .ok_or_else(|| Error::Platform(format!("unknown conversation {target}")))?;

        let client = self.client().await?;
        client
            .send_message(peer, body.to_string())
            .await
            .map_err(map_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> TelegramPlatform {
        TelegramPlatform::new(TelegramConfig {
            api_id: 1,
            api_hash: "x".to_string(),
            connection_retries: 1,
        })
    }

    fn session(id: &str) -> Session {
        Session {
            id: SessionId(id.to_string()),
            account: "someone".to_string(),
        }
    }

    #[test]
    fn rpc_errors_are_platform_rejections() {
        assert!(matches!(
            map_err("rpc error 400: PHONE_CODE_INVALID"),
            Error::Platform(_)
        ));
        assert!(matches!(map_err("read error: connection reset"), Error::External(_)));
    }

    #[tokio::test]
    async fn calls_before_login_fail_without_connecting() {
        let p = platform();
        let err = p
            .send_message(&session("42"), &ConversationId("1".to_string()), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Platform(ref m) if m == "not authenticated"));

        let err = p.list_conversations(&session("42")).await.unwrap_err();
        assert!(matches!(err, Error::Platform(_)));
        assert!(p.client.lock().await.is_none());
    }

    #[tokio::test]
    async fn foreign_session_and_unknown_peer_are_rejected() {
        let p = platform();
        *p.account.lock().await = Some(Account {
            session: SessionId("42".to_string()),
            peers: HashMap::new(),
        });

        let err = p.list_conversations(&session("7")).await.unwrap_err();
        assert!(matches!(err, Error::Platform(ref m) if m.contains("does not belong")));

        let err = p
            .send_message(&session("42"), &ConversationId("-100".to_string()), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Platform(ref m) if m == "unknown conversation -100"));
    }

    #[test]
    fn new_handshake_drops_leftover_tokens() {
        let mut pending: Pending<&str, &str> = Pending::default();
        pending.begin(1, "login-1");
        pending.password.insert(2, "password-2");

        pending.begin(3, "login-3");
        assert_eq!(pending.login.keys().copied().collect::<Vec<_>>(), vec![3]);
        assert!(pending.password.is_empty());

        pending.clear();
        assert!(pending.login.is_empty());
    }
}
