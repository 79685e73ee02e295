use anchor_lang::prelude::*;

use crate::constants::{BANNED_SEED, GATEKEEPER_SEED};
use crate::events::{CodeHashBanned, CodeHashUnbanned};
use crate::state::{BannedCodeHash, Gatekeeper};

#[derive(Accounts)]
#[instruction(code_hash: [u8; 32])]
pub struct UpdateBan<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        seeds = [GATEKEEPER_SEED, gatekeeper.authority.as_ref()],
        bump = gatekeeper.bump
    )]
    pub gatekeeper: Account<'info, Gatekeeper>,

    // Unbanning a hash that was never banned must report NotBanned, so both
    // directions accept a fresh record.
    #[account(
        init_if_needed,
        payer = authority,
        space = 8 + BannedCodeHash::INIT_SPACE,
        seeds = [BANNED_SEED, gatekeeper.key().as_ref(), code_hash.as_ref()],
        bump
    )]
    pub ban_record: Account<'info, BannedCodeHash>,

    pub system_program: Program<'info, System>,
}

pub fn ban_handler(ctx: Context<UpdateBan>, code_hash: [u8; 32]) -> Result<()> {
    let gatekeeper = &ctx.accounts.gatekeeper;
    gatekeeper.require_authority(ctx.accounts.authority.key)?;

    ctx.accounts
        .ban_record
        .ban(gatekeeper.key(), code_hash, ctx.bumps.ban_record)?;

    emit!(CodeHashBanned {
        gatekeeper: gatekeeper.key(),
        code_hash,
        banned_by: ctx.accounts.authority.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}

pub fn unban_handler(ctx: Context<UpdateBan>, code_hash: [u8; 32]) -> Result<()> {
    let gatekeeper = &ctx.accounts.gatekeeper;
    gatekeeper.require_authority(ctx.accounts.authority.key)?;

    ctx.accounts.ban_record.unban()?;

    emit!(CodeHashUnbanned {
        gatekeeper: gatekeeper.key(),
        code_hash,
        unbanned_by: ctx.accounts.authority.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
