use anchor_lang::prelude::*;
use anchor_lang::system_program;

use crate::constants::{BANNED_SEED, DEPLOYMENT_SEED, GATEKEEPER_SEED};
use crate::errors::DeployGateError;
use crate::events::ContractDeployed;
use crate::state::{BannedCodeHash, DeployedCode, Gatekeeper};

#[derive(Accounts)]
pub struct Install<'info> {
    #[account(mut)]
    pub deployer: Signer<'info>,

    #[account(
        mut,
        seeds = [GATEKEEPER_SEED, gatekeeper.authority.as_ref()],
        bump = gatekeeper.bump
    )]
    pub gatekeeper: Account<'info, Gatekeeper>,

    /// CHECK: Ban record PDA for the code hash, validated in the handler; may be empty.
    pub ban_record: UncheckedAccount<'info>,

    /// CHECK: Next deployment PDA, validated and created in the handler.
    #[account(mut)]
    pub deployment: UncheckedAccount<'info>,

    pub system_program: Program<'info, System>,
}

pub fn install_handler(ctx: Context<Install>, code: Vec<u8>) -> Result<Pubkey> {
    let gatekeeper_key = ctx.accounts.gatekeeper.key();
    let ban_record = ctx.accounts.ban_record.to_account_info();

    let code_hash = ctx.accounts.gatekeeper.screen_install(&code, |hash| {
        load_ban_status(&ban_record, &gatekeeper_key, hash)
    })?;

    let index = ctx.accounts.gatekeeper.deployments;
    let index_bytes = index.to_le_bytes();
    let (expected, bump) = Pubkey::find_program_address(
        &[DEPLOYMENT_SEED, gatekeeper_key.as_ref(), &index_bytes],
        &crate::ID,
    );
    let handle = ctx.accounts.deployment.key();
    require_keys_eq!(handle, expected, DeployGateError::InvalidDeploymentAccount);

    let space = DeployedCode::space(code.len());
    let signer_seeds: &[&[u8]] = &[
        DEPLOYMENT_SEED,
        gatekeeper_key.as_ref(),
        &index_bytes,
        &[bump],
    ];
    create_deployment_account(
        &ctx.accounts.deployer,
        &ctx.accounts.deployment,
        &ctx.accounts.system_program,
        space,
        &[signer_seeds],
    )
    .map_err(|_| error!(DeployGateError::InstallationFailed))?;

    let record = DeployedCode {
        gatekeeper: gatekeeper_key,
        deployer: ctx.accounts.deployer.key(),
        code_hash,
        index,
        code,
    };
    {
        let deployment_info = ctx.accounts.deployment.to_account_info();
        let mut data = deployment_info.try_borrow_mut_data()?;
        let mut writer: &mut [u8] = &mut data;
        record
            .try_serialize(&mut writer)
            .map_err(|_| error!(DeployGateError::InstallationFailed))?;
    }

    ctx.accounts.gatekeeper.record_deployment()?;

    msg!("installed {} bytes at {}", record.code.len(), handle);

    emit!(ContractDeployed {
        gatekeeper: gatekeeper_key,
        deployer: record.deployer,
        deployment: handle,
        code_hash,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(handle)
}

/// Creates the deployment PDA. An address that already holds lamports is
/// topped up to rent exemption, then allocated and assigned.
fn create_deployment_account<'info>(
    payer: &Signer<'info>,
    deployment: &UncheckedAccount<'info>,
    system: &Program<'info, System>,
    space: usize,
    signer_seeds: &[&[&[u8]]],
) -> Result<()> {
    let required = Rent::get()?.minimum_balance(space);
    let current = deployment.lamports();

    if current == 0 {
        let create_ctx = CpiContext::new_with_signer(
            system.to_account_info(),
            system_program::CreateAccount {
                from: payer.to_account_info(),
                to: deployment.to_account_info(),
            },
            signer_seeds,
        );
        return system_program::create_account(create_ctx, required, space as u64, &crate::ID);
    }

    let top_up = required.saturating_sub(current);
    if top_up > 0 {
        let transfer_ctx = CpiContext::new(
            system.to_account_info(),
            system_program::Transfer {
                from: payer.to_account_info(),
                to: deployment.to_account_info(),
            },
        );
        system_program::transfer(transfer_ctx, top_up)?;
    }

    let allocate_ctx = CpiContext::new_with_signer(
        system.to_account_info(),
        system_program::Allocate {
            account_to_allocate: deployment.to_account_info(),
        },
        signer_seeds,
    );
    system_program::allocate(allocate_ctx, space as u64)?;

    let assign_ctx = CpiContext::new_with_signer(
        system.to_account_info(),
        system_program::Assign {
            account_to_assign: deployment.to_account_info(),
        },
        signer_seeds,
    );
    system_program::assign(assign_ctx, &crate::ID)
}

fn load_ban_status(account: &AccountInfo, gatekeeper: &Pubkey, code_hash: &[u8; 32]) -> Result<bool> {
    let (expected, _) = Pubkey::find_program_address(
        &[BANNED_SEED, gatekeeper.as_ref(), code_hash.as_ref()],
        &crate::ID,
    );
    require_keys_eq!(account.key(), expected, DeployGateError::InvalidBanRecord);
    if account.data_is_empty() {
        return Ok(false);
    }
    require_keys_eq!(*account.owner, crate::ID, DeployGateError::InvalidBanRecord);

    let data = account.try_borrow_data()?;
    let mut slice: &[u8] = &data;
    let record = BannedCodeHash::try_deserialize(&mut slice)?;
    Ok(record.is_banned())
}
