//! Mempool — Calldata Decoder
//!
//! Purpose:
//!     Turn a pending transaction's (destination, input) into a structured
//!     `swapExactTokensForTokens` call, or report that it is not one.
//!
//! Dependencies:
//!     - alloy (sol-types ABI decoding via the `contracts` interface)
//!
//! Supported Function Selectors:
//!     V2 Router:
//!       0x38ed1739 — swapExactTokensForTokens(uint256,uint256,address[],address,uint256)
//!
//! Notes:
//!     - Destination is checked first. Most mempool traffic goes elsewhere and
//!       never reaches the ABI decoder.
//!     - A decode failure is the normal case, not an error: it maps to
//!       `NotMatched::UnknownCall` and is logged at trace level only.

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use tracing::trace;

use crate::contracts::IUniswapV2Router02::swapExactTokensForTokensCall;

use super::types::{DecodeOutcome, DecodedSwapCall, NotMatched};

/// Decoder bound to a single target router
#[derive(Debug, Clone)]
pub struct ChainDecoder {
    router: Address,
}

impl ChainDecoder {
    pub fn new(router: Address) -> Self {
        Self { router }
    }

    pub fn router(&self) -> Address {
        self.router
    }

    /// Decode a transaction's payload if it is addressed to the router.
    /// Address equality is byte equality, so hex case never matters.
    pub fn decode(&self, destination: Option<Address>, payload: &[u8]) -> DecodeOutcome {
        let to = match destination {
            Some(to) => to,
            None => return DecodeOutcome::NotMatched(NotMatched::ContractCreation),
        };

        if to != self.router {
            return DecodeOutcome::NotMatched(NotMatched::WrongDestination);
        }

        match swapExactTokensForTokensCall::abi_decode(payload) {
            Ok(call) => DecodeOutcome::Matched(DecodedSwapCall {
                amount_in: call.amountIn,
                amount_out_min: call.amountOutMin,
                path: call.path,
                recipient: call.to,
                deadline: call.deadline,
            }),
            Err(e) => {
                trace!(selector = %selector_hex(payload), error = %e, "router call not decoded");
                DecodeOutcome::NotMatched(NotMatched::UnknownCall)
            }
        }
    }
}

/// Return the 4-byte selector as a hex string for logging
pub fn selector_hex(input: &[u8]) -> String {
    if input.len() < 4 {
        return "0x????".to_string();
    }
    format!("0x{:02x}{:02x}{:02x}{:02x}", input[0], input[1], input[2], input[3])
}
