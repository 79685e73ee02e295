use anchor_lang::prelude::*;

use crate::errors::TransferGateError;

// Mirrors of the asset-ledger accounts. Field order must stay identical.

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
    /// Sender, recipient and limit are checked in that order so the first
    /// failing guard is the one reported.
    pub fn screen_transfer(
        &self,
        sender: Option<&BlacklistEntry>,
        recipient: Option<&BlacklistEntry>,
        amount: u64,
    ) -> Result<()> {
        require!(
            !sender.is_some_and(BlacklistEntry::is_blacklisted),
            TransferGateError::SenderBlacklisted
        );
        require!(
            !recipient.is_some_and(BlacklistEntry::is_blacklisted),
            TransferGateError::RecipientBlacklisted
        );
        require!(
            amount <= self.max_amount,
            TransferGateError::AmountExceedsLimit
        );
        Ok(())
    }
}

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
    pub fn is_blacklisted(&self) -> bool {
        self.is_blacklisted
    }
}
