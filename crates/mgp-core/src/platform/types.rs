use crate::domain::Session;

/// Opaque reference to a login code request held by the platform adapter.
///
/// Passed back into `sign_in` so the handshake step carries its own state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginTicket(pub u64);

/// Issued when the account has a password configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordChallenge {
    pub ticket: u64,
    pub hint: Option<String>,
}

/// Result of submitting the login code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignInOutcome {
    Authorized(Session),
    PasswordRequired(PasswordChallenge),
}
