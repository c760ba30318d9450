//! Mempool — Opportunity Filter
//!
//! A decoded swap is a race target iff the configured token appears anywhere
//! in its path. Pure predicate, no state.

use alloy::primitives::Address;

use super::types::DecodedSwapCall;

#[derive(Debug, Clone)]
pub struct OpportunityFilter {
    target_token: Address,
}

impl OpportunityFilter {
    pub fn new(target_token: Address) -> Self {
        Self { target_token }
    }

    pub fn target_token(&self) -> Address {
        self.target_token
    }

    /// Parsed addresses compare by bytes, so this is case-insensitive
    pub fn matches(&self, call: &DecodedSwapCall) -> bool {
        call.path.contains(&self.target_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn call_with_path(path: Vec<Address>) -> DecodedSwapCall {
        DecodedSwapCall {
            amount_in: U256::from(1u64),
            amount_out_min: U256::ZERO,
            path,
            recipient: Address::ZERO,
            deadline: U256::ZERO,
        }
    }

    fn token() -> Address {
        "0x0e09fabb73bd3ade0a17ecc321fd13a19e81ce82".parse().unwrap()
    }

    #[test]
    fn test_matches_any_position() {
        let filter = OpportunityFilter::new(token());
        let a = Address::with_last_byte(0xa1);
        let b = Address::with_last_byte(0xb2);

        assert!(filter.matches(&call_with_path(vec![token(), a, b])));
        assert!(filter.matches(&call_with_path(vec![a, token(), b])));
        assert!(filter.matches(&call_with_path(vec![a, b, token()])));
        assert!(filter.matches(&call_with_path(vec![token()])));
    }

    #[test]
    fn test_no_match() {
        let filter = OpportunityFilter::new(token());
        let a = Address::with_last_byte(0xa1);
        let b = Address::with_last_byte(0xb2);

        assert!(!filter.matches(&call_with_path(vec![a, b])));
        assert!(!filter.matches(&call_with_path(vec![])));
    }

    #[test]
    fn test_case_insensitive() {
        let checksummed: Address = "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82".parse().unwrap();
        let upper: Address = "0x0E09FABB73BD3ADE0A17ECC321FD13A19E81CE82".parse().unwrap();
        let filter = OpportunityFilter::new(checksummed);

        assert!(filter.matches(&call_with_path(vec![Address::with_last_byte(1), token()])));
        assert!(filter.matches(&call_with_path(vec![upper])));
    }
}
