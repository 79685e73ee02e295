use anchor_lang::prelude::*;

pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;

pub use instructions::*;

declare_id!("DdTB6GQP8dCQbasYxrSHNcExKgUnXY6ArEzpZZb5D3uw");

#[program]
pub mod deploy_gate {
    use super::*;

    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        instructions::initialize::initialize_handler(ctx)
    }

    pub fn ban_code_hash(ctx: Context<UpdateBan>, code_hash: [u8; 32]) -> Result<()> {
        instructions::ban::ban_handler(ctx, code_hash)
    }

    pub fn unban_code_hash(ctx: Context<UpdateBan>, code_hash: [u8; 32]) -> Result<()> {
        instructions::ban::unban_handler(ctx, code_hash)
    }

    /// Returns the deployment handle as instruction return data.
    pub fn install(ctx: Context<Install>, code: Vec<u8>) -> Result<Pubkey> {
        instructions::install::install_handler(ctx, code)
    }

    pub fn pause(ctx: Context<SetPauseState>) -> Result<()> {
        instructions::pause::pause_handler(ctx)
    }

    pub fn unpause(ctx: Context<SetPauseState>) -> Result<()> {
        instructions::pause::unpause_handler(ctx)
    }
}
