use anchor_lang::prelude::Pubkey;

pub const LEDGER_SEED: &[u8] = b"ledger";
pub const BLACKLIST_SEED: &[u8] = b"blacklist";

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;

/// Program invoked by Token-2022 on every transfer of a ledger mint.
pub const TRANSFER_GATE_PROGRAM_ID: Pubkey =
    anchor_lang::solana_program::pubkey!("9mX7RC3MZg7idHt95B3MxvzrPNghygT6miF7EstgnV5v");
