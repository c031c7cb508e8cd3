//! # Confidential USDT (cUSDT) Token Contract
//!
//! Confidential fungible token whose balances are ciphertext handles.
//!
//! ## Minting Flow
//! 1. Owner deploys the token and calls `set_minter()` once with the payroll ledger
//! 2. The ledger calls `mint()` when an employee claims pending salary
//! 3. The new balance handle is granted to the token and to the recipient
//! 4. The recipient decrypts the balance off-chain through the relayer
//!
//! ## Security
//! - Only the minter can mint, and the minter can only be set once
//! - Balances only grow; there is no transfer or burn in this contract

use std::collections::HashMap;

use fhevm_host::{Address, CallContext, FheExecutor, Handle, HostError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Token decimal precision, shared with off-chain amount formatting
pub const TOKEN_DECIMALS: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Confidential USDT".to_string(),
            symbol: "cUSDT".to_string(),
            decimals: TOKEN_DECIMALS,
        }
    }
}

/// Events emitted by the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum TokenEvent {
    MinterSet {
        minter: Address,
    },
    ConfidentialMint {
        to: Address,
        amount: Handle,
        balance: Handle,
    },
}

impl TokenEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TokenEvent::MinterSet { .. } => "MinterSet",
            TokenEvent::ConfidentialMint { .. } => "ConfidentialMint",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfidentialToken {
    /// Address this token is deployed at
    address: Address,
    /// Deployer; only allowed to configure the minter
    owner: Address,
    /// Sole account allowed to mint (set once)
    minter: Option<Address>,
    metadata: TokenMetadata,
    balances: HashMap<Address, Handle>,
    total_supply: Handle,
}

impl ConfidentialToken {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            minter: None,
            metadata: TokenMetadata::default(),
            balances: HashMap::new(),
            total_supply: Handle::ZERO,
        }
    }

    // ==================== ADMIN OPERATIONS ====================

    /// Configure the minter (owner only, once)
    pub fn set_minter(&mut self, ctx: &CallContext, minter: Address) -> Result<TokenEvent, HostError> {
        if ctx.sender != self.owner {
            return Err(HostError::Unauthorized {
                caller: ctx.sender,
                action: "set the minter",
            });
        }
        if let Some(existing) = self.minter {
            return Err(HostError::MinterAlreadySet(existing));
        }

        self.minter = Some(minter);
        info!(token = %self.address, %minter, "Minter set");

        Ok(TokenEvent::MinterSet { minter })
    }

    // ==================== MINTER OPERATIONS ====================

    /// Credit `amount` to `to`. Only callable by the minter.
    ///
    /// `amount` may be the zero handle, which mints an encryption of 0.
    pub fn mint<E: FheExecutor + ?Sized>(
        &mut self,
        ctx: &CallContext,
        fhe: &mut E,
        to: Address,
        amount: Handle,
    ) -> Result<TokenEvent, HostError> {
        self.assert_minter(ctx)?;

        let balance = fhe.add(self.address, self.confidential_balance_of(&to), amount)?;
        let supply = fhe.add(self.address, self.total_supply, amount)?;

        fhe.allow(self.address, balance, self.address)?;
        fhe.allow(self.address, balance, to)?;
        fhe.allow(self.address, supply, self.address)?;

        self.balances.insert(to, balance);
        self.total_supply = supply;

        info!(token = %self.address, %to, %amount, %balance, "Confidential mint");

        Ok(TokenEvent::ConfidentialMint {
            to,
            amount,
            balance,
        })
    }

    // ==================== VIEW METHODS ====================

    /// Current balance handle, or the zero handle if the account never received tokens
    pub fn confidential_balance_of(&self, account: &Address) -> Handle {
        self.balances.get(account).copied().unwrap_or(Handle::ZERO)
    }

    pub fn confidential_total_supply(&self) -> Handle {
        self.total_supply
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn minter(&self) -> Option<Address> {
        self.minter
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    // ==================== INTERNAL ====================

    fn assert_minter(&self, ctx: &CallContext) -> Result<(), HostError> {
        match self.minter {
            Some(minter) if minter == ctx.sender => Ok(()),
            _ => Err(HostError::Unauthorized {
                caller: ctx.sender,
                action: "mint",
            }),
        }
    }
}
