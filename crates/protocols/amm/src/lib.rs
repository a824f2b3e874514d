//! Constant-product AMM client
//!
//! Quotes swaps and liquidity changes against Uniswap V2 style pools, tracks
//! router allowances, lists the factory's pools and drives the three user
//! operations (swap, deposit, redeem) from form input to a confirmed
//! transaction.

pub mod approval;
pub mod calculator;
pub mod constants;
pub mod context;
pub mod fetch;
pub mod freshness;
pub mod lp_deposit;
pub mod lp_redeem;
pub mod notify;
pub mod state;
pub mod swap;
pub mod weth;

#[cfg(test)]
mod testing;

// Re-exports
pub use approval::{ApprovalAmount, ApprovalStatus, ApprovalTracker, Approvals};
pub use calculator::{
    apply_slippage, expected_liquidity, get_amount_out, percentage_of, pool_share_bps,
    price_impact_bps, quote_counterpart, quote_deposit, quote_redeem_shares, share_bps,
    DepositMode,
};
pub use context::{deadline, AmmContext};
pub use fetch::{
    fetch_pool, find_pool, list_pools, load_token_registry, require_pool, select_pool,
    token_balance,
};
pub use freshness::{RequestTracker, Ticket};
pub use lp_deposit::{DepositForm, DepositOrchestrator};
pub use lp_redeem::{RedeemForm, RedeemOrchestrator};
pub use notify::{Level, Notification, NotificationLog, Notifier, TracingNotifier};
pub use state::{Action, DepositQuote, Pool, RedeemQuote, SwapQuote};
pub use swap::{SwapForm, SwapOrchestrator};
