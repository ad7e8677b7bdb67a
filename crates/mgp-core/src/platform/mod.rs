//! Messaging-platform abstractions (Telegram today).

#[cfg(test)]
pub(crate) mod fake;
pub mod port;
pub mod types;
