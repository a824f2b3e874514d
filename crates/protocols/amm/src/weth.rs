//! Wrapping and unwrapping ether

use swapdesk_core::units::{parse_positive, DEFAULT_DECIMALS};
use swapdesk_core::{ProtocolError, Token};
use tracing::info;

use evm_gateway::TxReceipt;

use crate::context::AmmContext;

/// Wrap `amount` ether into WETH
pub async fn wrap(ctx: &AmmContext, amount: &str) -> Result<TxReceipt, ProtocolError> {
    let result = async {
        let value = parse_positive(amount, DEFAULT_DECIMALS)?;
        ctx.account.require()?;
        info!("Wrapping {} ETH", amount.trim());
        let submitted = ctx.gateway.weth().deposit(value).await;
        ctx.submit(&format!("Wrap of {} ETH", amount.trim()), submitted)
            .await
    }
    .await;
    if let Err(e) = &result {
        ctx.report_failure("Wrap", e);
    }
    result
}

/// Unwrap `amount` WETH back into ether
pub async fn unwrap(ctx: &AmmContext, amount: &str) -> Result<TxReceipt, ProtocolError> {
    let result = async {
        let value = parse_positive(amount, DEFAULT_DECIMALS)?;
        let owner = ctx.account.require()?;
        let weth = ctx.gateway.weth();
        ctx.ensure_balance(&Token::new(weth.address(), "WETH"), owner, value)
            .await?;
        info!("Unwrapping {} WETH", amount.trim());
        let submitted = weth.withdraw(value).await;
        ctx.submit(&format!("Unwrap of {} WETH", amount.trim()), submitted)
            .await
    }
    .await;
    if let Err(e) = &result {
        ctx.report_failure("Unwrap", e);
    }
    result
}
