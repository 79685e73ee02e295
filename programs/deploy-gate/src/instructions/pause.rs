use anchor_lang::prelude::*;

use crate::constants::GATEKEEPER_SEED;
use crate::events::{DeploymentsPaused, DeploymentsUnpaused};
use crate::state::Gatekeeper;

#[derive(Accounts)]
pub struct SetPauseState<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [GATEKEEPER_SEED, gatekeeper.authority.as_ref()],
        bump = gatekeeper.bump
    )]
    pub gatekeeper: Account<'info, Gatekeeper>,
}

pub fn pause_handler(ctx: Context<SetPauseState>) -> Result<()> {
    let gatekeeper = &mut ctx.accounts.gatekeeper;
    gatekeeper.require_authority(ctx.accounts.authority.key)?;
    gatekeeper.pause();

    emit!(DeploymentsPaused {
        gatekeeper: gatekeeper.key(),
        paused_by: ctx.accounts.authority.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}

pub fn unpause_handler(ctx: Context<SetPauseState>) -> Result<()> {
    let gatekeeper = &mut ctx.accounts.gatekeeper;
    gatekeeper.require_authority(ctx.accounts.authority.key)?;
    gatekeeper.unpause();

    emit!(DeploymentsUnpaused {
        gatekeeper: gatekeeper.key(),
        unpaused_by: ctx.accounts.authority.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
