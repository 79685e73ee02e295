use anchor_lang::prelude::*;

use crate::constants::GATEKEEPER_SEED;
use crate::events::GatekeeperInitialized;
use crate::state::{Gatekeeper, PauseState};

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        init,
        payer = authority,
        space = 8 + Gatekeeper::INIT_SPACE,
        seeds = [GATEKEEPER_SEED, authority.key().as_ref()],
        bump
    )]
    pub gatekeeper: Account<'info, Gatekeeper>,

    pub system_program: Program<'info, System>,
}

pub fn initialize_handler(ctx: Context<Initialize>) -> Result<()> {
    let gatekeeper = &mut ctx.accounts.gatekeeper;
    gatekeeper.authority = ctx.accounts.authority.key();
    gatekeeper.state = PauseState::Active;
    gatekeeper.deployments = 0;
    gatekeeper.bump = ctx.bumps.gatekeeper;

    emit!(GatekeeperInitialized {
        gatekeeper: gatekeeper.key(),
        authority: gatekeeper.authority,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
