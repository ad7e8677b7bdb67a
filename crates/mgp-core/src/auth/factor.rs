//! Single-slot handoff for operator-supplied factors.
//!
//! The presentation layer forwards every "value changed" event into
//! [`FactorInputs`]; the first non-empty value resolves the slot and wakes the
//! handshake waiting on the matching [`FactorReceiver`].

use std::sync::Mutex;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{errors::Error, Result};

/// Create the input side (presentation) and the source side (handshake).
pub fn factor_channel() -> (FactorInputs, FactorSource) {
    let (primary_tx, primary_rx) = FactorSender::pair();
    let (secondary_tx, secondary_rx) = FactorSender::pair();
    (
        FactorInputs {
            primary: primary_tx,
            secondary: secondary_tx,
        },
        FactorSource {
            primary: primary_rx,
            secondary: secondary_rx,
        },
    )
}

/// Held by the presentation layer.
#[derive(Debug)]
pub struct FactorInputs {
    primary: FactorSender,
    secondary: FactorSender,
}

impl FactorInputs {
    /// Login code changed. Returns true if this value resolved the slot.
    pub fn set_primary(&self, value: &str) -> bool {
        self.primary.supply(value)
    }

    /// Password changed. Returns true if this value resolved the slot.
    pub fn set_secondary(&self, value: &str) -> bool {
        self.secondary.supply(value)
    }

    pub fn primary_resolved(&self) -> bool {
        self.primary.is_resolved()
    }

    pub fn secondary_resolved(&self) -> bool {
        self.secondary.is_resolved()
    }
}

/// Consumed by the authentication controller.
#[derive(Debug)]
pub struct FactorSource {
    pub primary: FactorReceiver,
    pub secondary: FactorReceiver,
}

#[derive(Debug)]
pub struct FactorSender {
    slot: Mutex<Option<oneshot::Sender<String>>>,
}

impl FactorSender {
    fn pair() -> (Self, FactorReceiver) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Mutex::new(Some(tx)),
            },
            FactorReceiver { rx },
        )
    }

    fn supply(&self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match slot.take() {
            Some(tx) => tx.send(value.to_string()).is_ok(),
            None => false,
        }
    }

    fn is_resolved(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

#[derive(Debug)]
pub struct FactorReceiver {
    rx: oneshot::Receiver<String>,
}

impl FactorReceiver {
    /// Wait until the operator supplies the value.
    ///
    /// No timeout: only cancellation or dropping the input side ends the wait.
    pub async fn wait(self, cancel: &CancellationToken) -> Result<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            v = self.rx => v.map_err(|_| Error::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_values_are_ignored_and_first_value_wins() {
        let (inputs, source) = factor_channel();
        let cancel = CancellationToken::new();

        assert!(!inputs.set_primary(""));
        assert!(!inputs.primary_resolved());
        assert!(inputs.set_primary("1"));
        assert!(!inputs.set_primary("12345"));
        assert!(inputs.primary_resolved());

        assert_eq!(source.primary.wait(&cancel).await.unwrap(), "1");
    }

    #[tokio::test]
    async fn values_supplied_before_the_wait_are_buffered() {
        let (inputs, source) = factor_channel();
        let cancel = CancellationToken::new();

        // Either order: password first, then code.
        assert!(inputs.set_secondary("hunter2"));
        assert!(inputs.set_primary("12345"));

        assert_eq!(source.primary.wait(&cancel).await.unwrap(), "12345");
        assert_eq!(source.secondary.wait(&cancel).await.unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn wait_resolves_when_value_arrives_later() {
        let (inputs, source) = factor_channel();
        let cancel = CancellationToken::new();

        let waiter = tokio::spawn(async move { source.primary.wait(&cancel).await });
        tokio::task::yield_now().await;
        assert!(inputs.set_primary("777"));

        assert_eq!(waiter.await.unwrap().unwrap(), "777");
    }

    #[tokio::test]
    async fn cancellation_ends_the_wait() {
        let (_inputs, source) = factor_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = source.primary.wait(&cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn dropping_the_inputs_ends_the_wait() {
        let (inputs, source) = factor_channel();
        drop(inputs);

        let err = source
            .secondary
            .wait(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn supplying_after_the_receiver_is_gone_reports_false() {
        let (inputs, source) = factor_channel();
        drop(source);
        assert!(!inputs.set_primary("12345"));
    }
}
