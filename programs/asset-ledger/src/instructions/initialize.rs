use anchor_lang::prelude::*;
use anchor_lang::solana_program::program::invoke;
use anchor_lang::system_program;
use anchor_spl::associated_token::{self, get_associated_token_address_with_program_id, AssociatedToken};
use anchor_spl::token_2022::spl_token_2022::{
    extension::{transfer_hook, ExtensionType},
    instruction::{self as token_2022_instruction, AuthorityType},
    state::Mint as Token2022Mint,
};
use anchor_spl::token_2022::{self, Token2022};

use crate::constants::{LEDGER_SEED, MAX_NAME_LEN, MAX_SYMBOL_LEN, TRANSFER_GATE_PROGRAM_ID};
use crate::errors::AssetLedgerError;
use crate::events::LedgerInitialized;
use crate::state::LedgerConfig;

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct InitializeArgs {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub initial_supply: u64,
    pub max_amount: u64,
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(mut)]
    pub mint: Signer<'info>,

    #[account(
        init,
        payer = authority,
        space = 8 + LedgerConfig::INIT_SPACE,
        seeds = [LEDGER_SEED, mint.key().as_ref()],
        bump
    )]
    pub config: Account<'info, LedgerConfig>,

    /// CHECK: Associated token account of the authority, created in the handler.
    #[account(mut)]
    pub authority_token_account: UncheckedAccount<'info>,

    pub token_2022_program: Program<'info, Token2022>,

    pub associated_token_program: Program<'info, AssociatedToken>,

    pub system_program: Program<'info, System>,
}

pub fn initialize_handler(ctx: Context<Initialize>, args: InitializeArgs) -> Result<()> {
    require!(
        args.name.len() <= MAX_NAME_LEN,
        AssetLedgerError::NameTooLong
    );
    require!(
        args.symbol.len() <= MAX_SYMBOL_LEN,
        AssetLedgerError::SymbolTooLong
    );

    let mint_key = ctx.accounts.mint.key();
    let authority_key = ctx.accounts.authority.key();
    let token_program_id = ctx.accounts.token_2022_program.key();
    let config_key = ctx.accounts.config.key();
    let config_bump = ctx.bumps.config;

    let expected_ata =
        get_associated_token_address_with_program_id(&authority_key, &mint_key, &token_program_id);
    require_keys_eq!(
        ctx.accounts.authority_token_account.key(),
        expected_ata,
        AssetLedgerError::InvalidTokenAccount
    );

    let mint_len =
        ExtensionType::try_calculate_account_len::<Token2022Mint>(&[ExtensionType::TransferHook])?;
    let lamports = Rent::get()?.minimum_balance(mint_len);
    let create_ctx = CpiContext::new(
        ctx.accounts.system_program.to_account_info(),
        system_program::CreateAccount {
            from: ctx.accounts.authority.to_account_info(),
            to: ctx.accounts.mint.to_account_info(),
        },
    );
    system_program::create_account(create_ctx, lamports, mint_len as u64, &token_program_id)?;

    let mint_info = ctx.accounts.mint.to_account_info();
    let token_program_info = ctx.accounts.token_2022_program.to_account_info();

    // Every transfer, direct or delegated, is routed through the gate.
    let hook_ix = transfer_hook::instruction::initialize(
        &token_program_id,
        &mint_key,
        Some(config_key),
        Some(TRANSFER_GATE_PROGRAM_ID),
    )?;
    invoke(&hook_ix, &[mint_info.clone(), token_program_info.clone()])?;

    let mint_ix = token_2022_instruction::initialize_mint2(
        &token_program_id,
        &mint_key,
        &config_key,
        None,
        args.decimals,
    )?;
    invoke(&mint_ix, &[mint_info.clone(), token_program_info.clone()])?;

    let ata_ctx = CpiContext::new(
        ctx.accounts.associated_token_program.to_account_info(),
        associated_token::Create {
            payer: ctx.accounts.authority.to_account_info(),
            associated_token: ctx.accounts.authority_token_account.to_account_info(),
            authority: ctx.accounts.authority.to_account_info(),
            mint: mint_info.clone(),
            system_program: ctx.accounts.system_program.to_account_info(),
            token_program: token_program_info.clone(),
        },
    );
    associated_token::create(ata_ctx)?;

    let signer_seeds: &[&[u8]] = &[LEDGER_SEED, mint_key.as_ref(), &[config_bump]];
    let signer_seeds_arr = [signer_seeds];
    let config_info = ctx.accounts.config.to_account_info();

    if args.initial_supply > 0 {
        let mint_to_ctx = CpiContext::new_with_signer(
            token_program_info.clone(),
            token_2022::MintTo {
                mint: mint_info.clone(),
                to: ctx.accounts.authority_token_account.to_account_info(),
                authority: config_info.clone(),
            },
            &signer_seeds_arr,
        );
        token_2022::mint_to(mint_to_ctx, args.initial_supply)?;
    }

    // Supply is fixed at issuance.
    let revoke_ctx = CpiContext::new_with_signer(
        token_program_info,
        token_2022::SetAuthority {
            current_authority: config_info,
            account_or_mint: mint_info,
        },
        &signer_seeds_arr,
    );
    token_2022::set_authority(revoke_ctx, AuthorityType::MintTokens, None)?;

    let config = &mut ctx.accounts.config;
    config.authority = authority_key;
    config.mint = mint_key;
    config.name = args.name;
    config.symbol = args.symbol;
    config.decimals = args.decimals;
    config.max_amount = args.max_amount;
    config.initial_supply = args.initial_supply;
    config.bump = config_bump;

    msg!(
        "ledger {} issued {} units to {}",
        mint_key,
        args.initial_supply,
        authority_key
    );

    emit!(LedgerInitialized {
        config: config_key,
        mint: mint_key,
        authority: authority_key,
        name: config.name.clone(),
        symbol: config.symbol.clone(),
        initial_supply: args.initial_supply,
        max_amount: args.max_amount,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
