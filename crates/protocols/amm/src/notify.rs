//! User-visible notifications
//!
//! Orchestrators report every confirmed or failed operation through a
//! [`Notifier`]. [`NotificationLog`] keeps a bounded feed for the API and
//! mirrors each entry to the log.

use std::collections::VecDeque;
use std::sync::Mutex;

use alloy_primitives::TxHash;
use evm_gateway::short_hash;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            tx_hash: None,
        }
    }

    /// Attach a transaction, appending its short hash to the message
    pub fn with_tx(mut self, tx_hash: TxHash) -> Self {
        self.message = format!("{} ({})", self.message, short_hash(&tx_hash));
        self.tx_hash = Some(tx_hash);
        self
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs notifications and nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        log(&notification);
    }
}

fn log(notification: &Notification) {
    match notification.level {
        Level::Success => info!("{}", notification.message),
        Level::Error => error!("{}", notification.message),
    }
}

/// Bounded notification feed, newest last
pub struct NotificationLog {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn entries(&self) -> Vec<Notification> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        log(&notification);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
    }
}
