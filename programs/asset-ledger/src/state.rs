use anchor_lang::prelude::*;

use crate::errors::AssetLedgerError;

#[account]
pub struct LedgerConfig {
    pub authority: Pubkey,
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub max_amount: u64,
    pub initial_supply: u64,
    pub bump: u8,
}

impl LedgerConfig {
    pub const INIT_SPACE: usize = 256;

    pub fn require_authority(&self, caller: &Pubkey) -> Result<()> {
        require_keys_eq!(*caller, self.authority, AssetLedgerError::Unauthorized);
        Ok(())
    }

    /// Only initialization may leave the limit at zero.
    pub fn update_max_amount(&mut self, new_max_amount: u64) -> Result<()> {
        require!(new_max_amount > 0, AssetLedgerError::LimitMustBePositive);
        self.max_amount = new_max_amount;
        Ok(())
    }
}

/// Seeds: [b"blacklist", config.key().as_ref(), account.as_ref()]
#[account]
pub struct BlacklistEntry {
    pub config: Pubkey,
    pub account: Pubkey,
    pub is_blacklisted: bool,
    pub updated_at: i64,
    pub updated_by: Pubkey,
    pub bump: u8,
}

impl BlacklistEntry {
    pub const INIT_SPACE: usize = 32 + 32 + 1 + 8 + 32 + 1;

    pub fn is_blacklisted(&self) -> bool {
        self.is_blacklisted
    }

    /// Overwrites the flag. Re-asserting the current value is allowed.
    pub fn record(
        &mut self,
        config: Pubkey,
        account: Pubkey,
        is_blacklisted: bool,
        updated_by: Pubkey,
        updated_at: i64,
        bump: u8,
    ) -> Result<()> {
        require!(account != Pubkey::default(), AssetLedgerError::InvalidTarget);

        self.config = config;
        self.account = account;
        self.is_blacklisted = is_blacklisted;
        self.updated_at = updated_at;
        self.updated_by = updated_by;
        self.bump = bump;
        Ok(())
    }
}
