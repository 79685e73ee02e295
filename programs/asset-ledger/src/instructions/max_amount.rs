use anchor_lang::prelude::*;

use crate::constants::LEDGER_SEED;
use crate::events::MaxAmountUpdated;
use crate::state::LedgerConfig;

#[derive(Accounts)]
pub struct SetMaxAmount<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [LEDGER_SEED, config.mint.as_ref()],
        bump = config.bump
    )]
    pub config: Account<'info, LedgerConfig>,
}

pub fn set_max_amount_handler(ctx: Context<SetMaxAmount>, new_max_amount: u64) -> Result<()> {
    let config = &mut ctx.accounts.config;
    config.require_authority(ctx.accounts.authority.key)?;
    config.update_max_amount(new_max_amount)?;

    emit!(MaxAmountUpdated {
        config: config.key(),
        new_max_amount,
        updated_by: ctx.accounts.authority.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
