use alloy_primitives::Address;

/// Caller and block information for a single contract call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Immediate caller (an externally owned account or a contract)
    pub sender: Address,
    /// Block timestamp in seconds
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }

    /// Context for a nested call made by `contract` within the same transaction
    pub fn forwarded(&self, contract: Address) -> Self {
        Self {
            sender: contract,
            timestamp: self.timestamp,
        }
    }
}
