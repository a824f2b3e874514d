//! Single-slot handoff between screens
//!
//! Holds at most one [`PendingOperation`]. A new post replaces whatever is
//! waiting (last write wins); the consumer takes it exactly once.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::types::{Operation, PendingOperation};

#[derive(Clone, Default)]
pub struct Handoff {
    slot: Arc<Mutex<Option<PendingOperation>>>,
}

impl Handoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an operation, returning the one it displaced
    pub async fn post(&self, pending: PendingOperation) -> Option<PendingOperation> {
        let mut slot = self.slot.lock().await;
        let replaced = slot.replace(pending);
        if let Some(ref old) = replaced {
            tracing::debug!("Handoff replaced unconsumed {} operation", old.operation);
        }
        replaced
    }

    /// Consume the waiting operation if it targets `operation`.
    ///
    /// An operation for a different screen stays in the slot.
    pub async fn take_for(&self, operation: Operation) -> Option<PendingOperation> {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(p) if p.operation == operation => slot.take(),
            _ => None,
        }
    }

    /// Look at the waiting operation without consuming it
    pub async fn peek(&self) -> Option<PendingOperation> {
        self.slot.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.slot.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Token;
    use alloy_primitives::Address;

    fn pending(operation: Operation) -> PendingOperation {
        PendingOperation::new(
            operation,
            Token::new(Address::repeat_byte(1), "WETH"),
            Token::new(Address::repeat_byte(2), "TEST"),
        )
    }

    #[tokio::test]
    async fn test_take_consumes_once() {
        let handoff = Handoff::new();
        handoff.post(pending(Operation::Swap)).await;

        assert!(handoff.take_for(Operation::Swap).await.is_some());
        assert!(handoff.take_for(Operation::Swap).await.is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let handoff = Handoff::new();
        handoff.post(pending(Operation::Swap)).await;
        let replaced = handoff.post(pending(Operation::Redeem)).await;

        assert_eq!(replaced.map(|p| p.operation), Some(Operation::Swap));
        assert!(handoff.take_for(Operation::Swap).await.is_none());
        assert!(handoff.take_for(Operation::Redeem).await.is_some());
    }

    #[tokio::test]
    async fn test_other_operation_is_left_in_place() {
        let handoff = Handoff::new();
        handoff.post(pending(Operation::Deposit)).await;

        assert!(handoff.take_for(Operation::Swap).await.is_none());
        assert_eq!(
            handoff.peek().await.map(|p| p.operation),
            Some(Operation::Deposit)
        );
        handoff.clear().await;
        assert!(handoff.peek().await.is_none());
    }
}
