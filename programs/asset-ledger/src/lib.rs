use anchor_lang::prelude::*;

pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;

pub use instructions::*;

declare_id!("DJvtpc3aw6AsS6KDRM5Vax9hbgAtwgincdS4L826LKpN");

#[program]
pub mod asset_ledger {
    use super::*;

    pub fn initialize(ctx: Context<Initialize>, args: InitializeArgs) -> Result<()> {
        instructions::initialize::initialize_handler(ctx, args)
    }

    pub fn set_blacklisted(ctx: Context<SetBlacklisted>, args: SetBlacklistedArgs) -> Result<()> {
        instructions::blacklist::set_blacklisted_handler(ctx, args)
    }

    pub fn set_max_amount(ctx: Context<SetMaxAmount>, new_max_amount: u64) -> Result<()> {
        instructions::max_amount::set_max_amount_handler(ctx, new_max_amount)
    }
}
