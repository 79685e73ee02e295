use anchor_lang::prelude::*;

use crate::constants::{BLACKLIST_SEED, LEDGER_SEED};
use crate::events::BlacklistUpdated;
use crate::state::{BlacklistEntry, LedgerConfig};

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct SetBlacklistedArgs {
    pub account: Pubkey,
    pub is_blacklisted: bool,
}

#[derive(Accounts)]
#[instruction(args: SetBlacklistedArgs)]
pub struct SetBlacklisted<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        seeds = [LEDGER_SEED, config.mint.as_ref()],
        bump = config.bump
    )]
    pub config: Account<'info, LedgerConfig>,

    #[account(
        init_if_needed,
        payer = authority,
        space = 8 + BlacklistEntry::INIT_SPACE,
        seeds = [BLACKLIST_SEED, config.key().as_ref(), args.account.as_ref()],
        bump
    )]
    pub blacklist_entry: Account<'info, BlacklistEntry>,

    pub system_program: Program<'info, System>,
}

pub fn set_blacklisted_handler(ctx: Context<SetBlacklisted>, args: SetBlacklistedArgs) -> Result<()> {
    let config = &ctx.accounts.config;
    config.require_authority(ctx.accounts.authority.key)?;

    let now = Clock::get()?.unix_timestamp;
    let entry = &mut ctx.accounts.blacklist_entry;
    entry.record(
        config.key(),
        args.account,
        args.is_blacklisted,
        ctx.accounts.authority.key(),
        now,
        ctx.bumps.blacklist_entry,
    )?;

    emit!(BlacklistUpdated {
        config: config.key(),
        account: args.account,
        is_blacklisted: args.is_blacklisted,
        updated_by: ctx.accounts.authority.key(),
        timestamp: now,
    });
    Ok(())
}
