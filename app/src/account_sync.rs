//! Background account watcher
//!
//! Logs every account switch until the account state is dropped. The
//! simulated chain reads the selected account itself, so nothing else needs
//! to follow these changes.

use evm_gateway::{AccountSnapshot, AccountSubscription};
use tokio::task::JoinHandle;

/// Watch `subscription`; the task yields the last snapshot it saw
pub fn spawn(mut subscription: AccountSubscription) -> JoinHandle<Option<AccountSnapshot>> {
    tokio::spawn(async move {
        let mut last = None;
        while let Some(snapshot) = subscription.changed().await {
            match snapshot.address {
                Some(address) => {
                    tracing::info!("Account switched to {} (epoch {})", address, snapshot.epoch)
                }
                None => tracing::info!("Account disconnected (epoch {})", snapshot.epoch),
            }
            last = Some(snapshot);
        }
        tracing::debug!("Account watcher stopped");
        last
    })
}
