use anchor_lang::prelude::*;

#[error_code]
pub enum AssetLedgerError {
    #[msg("Caller is not the ledger administrator")]
    Unauthorized,

    #[msg("The null account cannot be blacklisted")]
    InvalidTarget,

    #[msg("Max amount must be greater than zero")]
    LimitMustBePositive,

    #[msg("Name exceeds maximum length of 32 characters")]
    NameTooLong,

    #[msg("Symbol exceeds maximum length of 10 characters")]
    SymbolTooLong,

    #[msg("Associated token account does not match the authority and mint")]
    InvalidTokenAccount,
}
