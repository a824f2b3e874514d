//! AMM Constants
//!
//! Fee parameters of the deployed router and client-side defaults.

/// Fee constants
pub mod fees {
    /// 0.3% swap fee expressed as 997/1000
    pub const FEE_NUM: u64 = 997;

    pub const FEE_DENOM: u64 = 1000;
}

/// Liquidity constants
pub mod lp {
    /// LP tokens the pair locks on first mint
    pub const MINIMUM_LIQUIDITY: u64 = 1000;
}

/// Transaction parameters
pub mod tx {
    /// Deadline offset from submission time, in seconds (20 minutes)
    pub const DEADLINE_SECS: u64 = 20 * 60;
}

/// Slippage tolerance defaults, in basis points
pub mod slippage {
    /// 0.5%
    pub const DEFAULT_BPS: u32 = 50;
}

/// Pool directory parameters
pub mod directory {
    /// Pair fetches in flight at once while listing pools
    pub const FETCH_CONCURRENCY: usize = 8;
}
