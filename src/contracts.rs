//! Contract Definitions
//!
//! Solidity interfaces used by the racer, defined with alloy's `sol!` macro.
//! Only the router swap entry point is needed: it is both the call shape we
//! decode from pending transactions and the call we send to race them.

use alloy::sol;

// ── Uniswap V2 style router ──────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
    }
}
