use anchor_lang::prelude::*;

#[event]
pub struct LedgerInitialized {
    pub config: Pubkey,
    pub mint: Pubkey,
    pub authority: Pubkey,
    pub name: String,
    pub symbol: String,
    pub initial_supply: u64,
    pub max_amount: u64,
    pub timestamp: i64,
}

#[event]
pub struct BlacklistUpdated {
    pub config: Pubkey,
    pub account: Pubkey,
    pub is_blacklisted: bool,
    pub updated_by: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct MaxAmountUpdated {
    pub config: Pubkey,
    pub new_max_amount: u64,
    pub updated_by: Pubkey,
    pub timestamp: i64,
}
