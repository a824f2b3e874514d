//! Stale-response guard
//!
//! Every dispatch takes a [`Ticket`]. A later dispatch, or an account change,
//! supersedes all earlier tickets; results carrying a superseded ticket must
//! not reach visible state.

use std::sync::atomic::{AtomicU64, Ordering};

use evm_gateway::AccountState;
use swapdesk_core::ProtocolError;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    epoch: u64,
}

pub struct RequestTracker {
    generation: AtomicU64,
    account: AccountState,
}

impl RequestTracker {
    pub fn new(account: AccountState) -> Self {
        Self {
            generation: AtomicU64::new(0),
            account,
        }
    }

    /// Start a request, superseding every earlier ticket
    pub fn issue(&self) -> Ticket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation,
            epoch: self.account.current().epoch,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation.load(Ordering::SeqCst)
            && ticket.epoch == self.account.current().epoch
    }

    /// `StaleResponse` when the ticket has been superseded
    pub fn check(&self, ticket: &Ticket) -> Result<(), ProtocolError> {
        if self.is_current(ticket) {
            return Ok(());
        }
        debug!(
            "Dropping stale response (generation {}, epoch {})",
            ticket.generation, ticket.epoch
        );
        Err(ProtocolError::StaleResponse)
    }

    /// Supersede all outstanding tickets without starting a new request
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
