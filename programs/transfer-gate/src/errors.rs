use anchor_lang::prelude::*;

#[error_code]
pub enum TransferGateError {
    #[msg("Sender is blacklisted")]
    SenderBlacklisted,

    #[msg("Recipient is blacklisted")]
    RecipientBlacklisted,

    #[msg("Transfer exceeds the max amount")]
    AmountExceedsLimit,

    #[msg("Invalid ledger program account")]
    InvalidLedgerProgram,

    #[msg("Invalid ledger config account")]
    InvalidConfig,

    #[msg("Invalid blacklist entry account")]
    InvalidBlacklistEntry,

    #[msg("Token account owner can be reassigned")]
    MutableAccountOwner,
}
