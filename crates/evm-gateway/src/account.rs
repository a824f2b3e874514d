//! Observable wallet account
//!
//! One account per process. Every change bumps an epoch so that work started
//! under an earlier account can be recognised and discarded.

use std::sync::Arc;

use alloy_primitives::Address;
use serde::Serialize;
use swapdesk_core::ProtocolError;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AccountSnapshot {
    pub address: Option<Address>,
    pub epoch: u64,
}

#[derive(Clone)]
pub struct AccountState {
    tx: Arc<watch::Sender<AccountSnapshot>>,
    /// Fixed signing key; only this address (or none) may be selected
    signer: Option<Option<Address>>,
}

impl AccountState {
    pub fn new(address: Option<Address>) -> Self {
        let (tx, _) = watch::channel(AccountSnapshot { address, epoch: 0 });
        Self {
            tx: Arc::new(tx),
            signer: None,
        }
    }

    /// Account tied to a gateway that always signs with `signer`
    pub fn bound_to(signer: Option<Address>) -> Self {
        Self {
            signer: Some(signer),
            ..Self::new(signer)
        }
    }

    pub fn current(&self) -> AccountSnapshot {
        *self.tx.borrow()
    }

    pub fn address(&self) -> Option<Address> {
        self.tx.borrow().address
    }

    /// The connected address, or `NoAccount`
    pub fn require(&self) -> Result<Address, ProtocolError> {
        self.address().ok_or(ProtocolError::NoAccount)
    }

    /// Switch accounts. Setting the current address again is a no-op.
    pub fn set(&self, address: Option<Address>) -> AccountSnapshot {
        let mut changed = false;
        self.tx.send_if_modified(|snapshot| {
            if snapshot.address == address {
                return false;
            }
            snapshot.address = address;
            snapshot.epoch += 1;
            changed = true;
            true
        });
        if changed {
            match address {
                Some(a) => tracing::info!("Account changed to {}", a),
                None => tracing::info!("Account disconnected"),
            }
        }
        self.current()
    }

    /// Switch accounts on request, refusing any address the gateway cannot
    /// sign for. Disconnecting is always allowed.
    pub fn try_set(&self, address: Option<Address>) -> Result<AccountSnapshot, ProtocolError> {
        match (self.signer, address) {
            (Some(None), Some(requested)) => Err(ProtocolError::invalid_input(format!(
                "Cannot select {}: no signing key is configured",
                requested
            ))),
            (Some(Some(signer)), Some(requested)) if requested != signer => {
                Err(ProtocolError::invalid_input(format!(
                    "Cannot select {}: transactions are signed by {}",
                    requested, signer
                )))
            }
            _ => Ok(self.set(address)),
        }
    }

    /// Observe account changes until the subscription is dropped
    pub fn subscribe(&self) -> AccountSubscription {
        AccountSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AccountState {
    fn default() -> Self {
        Self::new(None)
    }
}

pub struct AccountSubscription {
    rx: watch::Receiver<AccountSnapshot>,
}

impl AccountSubscription {
    /// Wait for the next change; `None` once the account state is gone
    pub async fn changed(&mut self) -> Option<AccountSnapshot> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    pub fn current(&self) -> AccountSnapshot {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bumps_epoch_only_on_change() {
        let account = AccountState::default();
        assert_eq!(account.require(), Err(ProtocolError::NoAccount));

        let a = Address::repeat_byte(0xaa);
        assert_eq!(account.set(Some(a)).epoch, 1);
        assert_eq!(account.set(Some(a)).epoch, 1);
        assert_eq!(account.set(None).epoch, 2);
        assert_eq!(account.require(), Err(ProtocolError::NoAccount));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let account = AccountState::new(None);
        let mut sub = account.subscribe();
        assert_eq!(account.subscriber_count(), 1);

        let b = Address::repeat_byte(0xbb);
        account.set(Some(b));
        let seen = sub.changed().await.unwrap();
        assert_eq!(seen.address, Some(b));
        assert_eq!(seen.epoch, 1);

        drop(sub);
        assert_eq!(account.subscriber_count(), 0);
    }

    #[test]
    fn test_bound_account_only_accepts_signer() {
        let (signer, other) = (Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));
        let account = AccountState::bound_to(Some(signer));
        assert_eq!(account.address(), Some(signer));

        let err = account.try_set(Some(other)).unwrap_err();
        assert_eq!(err.error_code(), "invalid_input");
        assert_eq!(account.address(), Some(signer));
        assert_eq!(account.current().epoch, 0);

        assert_eq!(account.try_set(None).unwrap().address, None);
        assert_eq!(account.try_set(Some(signer)).unwrap().address, Some(signer));

        let keyless = AccountState::bound_to(None);
        assert!(keyless.try_set(Some(other)).is_err());
        assert!(AccountState::new(None).try_set(Some(other)).is_ok());
    }
}
