use anchor_lang::prelude::*;
use anchor_spl::token_2022::spl_token_2022::{
    extension::{immutable_owner::ImmutableOwner, BaseStateWithExtensions, StateWithExtensions},
    state::Account as TokenAccountState,
};
use anchor_spl::token_interface::{Mint, TokenAccount};
use spl_tlv_account_resolution::{
    account::ExtraAccountMeta,
    seeds::Seed,
    state::ExtraAccountMetaList,
};
use spl_transfer_hook_interface::instruction::ExecuteInstruction;

pub mod errors;
pub mod state;

use errors::TransferGateError;
use state::{BlacklistEntry, LedgerConfig};

declare_id!("9mX7RC3MZg7idHt95B3MxvzrPNghygT6miF7EstgnV5v");

pub const ASSET_LEDGER_PROGRAM_ID: Pubkey =
    anchor_lang::solana_program::pubkey!("DJvtpc3aw6AsS6KDRM5Vax9hbgAtwgincdS4L826LKpN");

pub const EXTRA_ACCOUNT_METAS_SEED: &[u8] = b"extra-account-metas";
const LEDGER_SEED: &[u8] = b"ledger";
const BLACKLIST_SEED: &[u8] = b"blacklist";

const SOURCE_TOKEN_ACCOUNT_INDEX: u8 = 0;
const MINT_ACCOUNT_INDEX: u8 = 1;
const DESTINATION_TOKEN_ACCOUNT_INDEX: u8 = 2;
const LEDGER_PROGRAM_INDEX: u8 = 5;
const CONFIG_ACCOUNT_INDEX: u8 = 6;
const TOKEN_ACCOUNT_OWNER_OFFSET: u8 = 32;
const TOKEN_ACCOUNT_OWNER_LENGTH: u8 = 32;

#[program]
pub mod transfer_gate {
    use super::*;

    pub fn initialize_extra_account_meta_list(
        ctx: Context<InitializeExtraAccountMetaList>,
    ) -> Result<()> {
        let metas = build_extra_account_metas()?;
        let mut data = ctx.accounts.extra_account_meta_list.try_borrow_mut_data()?;
        ExtraAccountMetaList::init::<ExecuteInstruction>(&mut data, &metas)?;
        Ok(())
    }

    /// Invoked by Token-2022 on every `transfer_checked` of a ledger mint.
    #[interface(spl_transfer_hook_interface::execute)]
    pub fn execute(ctx: Context<Execute>, amount: u64) -> Result<()> {
        // Blacklist entries are keyed by owner, so the owner must be fixed.
        require_immutable_owner(&ctx.accounts.source_token.to_account_info())?;
        require_immutable_owner(&ctx.accounts.destination_token.to_account_info())?;

        let mint_key = ctx.accounts.mint.key();
        let config_key = ctx.accounts.ledger_config.key();

        let config = load_config(&ctx.accounts.ledger_config, &mint_key)?;
        let sender = load_blacklist_entry(
            &ctx.accounts.source_blacklist_entry,
            &config_key,
            &ctx.accounts.source_token.owner,
        )?;
        let recipient = load_blacklist_entry(
            &ctx.accounts.destination_blacklist_entry,
            &config_key,
            &ctx.accounts.destination_token.owner,
        )?;

        config.screen_transfer(sender.as_ref(), recipient.as_ref(), amount)
    }
}

#[derive(Accounts)]
pub struct InitializeExtraAccountMetaList<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,

    /// CHECK: TLV account, written by the handler.
    #[account(
        init,
        payer = payer,
        space = ExtraAccountMetaList::size_of(build_extra_account_metas()?.len())?,
        seeds = [EXTRA_ACCOUNT_METAS_SEED, mint.key().as_ref()],
        bump
    )]
    pub extra_account_meta_list: AccountInfo<'info>,

    pub mint: InterfaceAccount<'info, Mint>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct Execute<'info> {
    #[account(token::mint = mint)]
    pub source_token: InterfaceAccount<'info, TokenAccount>,

    pub mint: InterfaceAccount<'info, Mint>,

    #[account(token::mint = mint)]
    pub destination_token: InterfaceAccount<'info, TokenAccount>,

    /// CHECK: Source owner or delegate, authorized by the token program.
    pub owner: UncheckedAccount<'info>,

    /// CHECK: Validated by seeds.
    #[account(seeds = [EXTRA_ACCOUNT_METAS_SEED, mint.key().as_ref()], bump)]
    pub extra_account_meta_list: UncheckedAccount<'info>,

    /// CHECK: Address constrained to the asset-ledger program.
    #[account(address = ASSET_LEDGER_PROGRAM_ID @ TransferGateError::InvalidLedgerProgram)]
    pub ledger_program: UncheckedAccount<'info>,

    /// CHECK: Owner and PDA validated in `load_config`.
    pub ledger_config: UncheckedAccount<'info>,

    /// CHECK: PDA validated in `load_blacklist_entry`; may be empty.
    pub source_blacklist_entry: UncheckedAccount<'info>,

    /// CHECK: PDA validated in `load_blacklist_entry`; may be empty.
    pub destination_blacklist_entry: UncheckedAccount<'info>,
}

pub fn build_extra_account_metas() -> Result<Vec<ExtraAccountMeta>> {
    let ledger_program_meta =
        ExtraAccountMeta::new_with_pubkey(&ASSET_LEDGER_PROGRAM_ID, false, false)?;
    let config_meta = ExtraAccountMeta::new_external_pda_with_seeds(
        LEDGER_PROGRAM_INDEX,
        &[
            Seed::Literal {
                bytes: LEDGER_SEED.to_vec(),
            },
            Seed::AccountKey {
                index: MINT_ACCOUNT_INDEX,
            },
        ],
        false,
        false,
    )?;
    let source_blacklist_meta = ExtraAccountMeta::new_external_pda_with_seeds(
        LEDGER_PROGRAM_INDEX,
        &[
            Seed::Literal {
                bytes: BLACKLIST_SEED.to_vec(),
            },
            Seed::AccountKey {
                index: CONFIG_ACCOUNT_INDEX,
            },
            Seed::AccountData {
                account_index: SOURCE_TOKEN_ACCOUNT_INDEX,
                data_index: TOKEN_ACCOUNT_OWNER_OFFSET,
                length: TOKEN_ACCOUNT_OWNER_LENGTH,
            },
        ],
        false,
        false,
    )?;
    let destination_blacklist_meta = ExtraAccountMeta::new_external_pda_with_seeds(
        LEDGER_PROGRAM_INDEX,
        &[
            Seed::Literal {
                bytes: BLACKLIST_SEED.to_vec(),
            },
            Seed::AccountKey {
                index: CONFIG_ACCOUNT_INDEX,
            },
            Seed::AccountData {
                account_index: DESTINATION_TOKEN_ACCOUNT_INDEX,
                data_index: TOKEN_ACCOUNT_OWNER_OFFSET,
                length: TOKEN_ACCOUNT_OWNER_LENGTH,
            },
        ],
        false,
        false,
    )?;

    Ok(vec![
        ledger_program_meta,
        config_meta,
        source_blacklist_meta,
        destination_blacklist_meta,
    ])
}

pub fn find_ledger_config(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[LEDGER_SEED, mint.as_ref()], &ASSET_LEDGER_PROGRAM_ID).0
}

pub fn find_blacklist_entry(config: &Pubkey, account: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[BLACKLIST_SEED, config.as_ref(), account.as_ref()],
        &ASSET_LEDGER_PROGRAM_ID,
    )
    .0
}

fn require_immutable_owner(account: &AccountInfo) -> Result<()> {
    let data = account.try_borrow_data()?;
    require!(
        has_immutable_owner(&data)?,
        TransferGateError::MutableAccountOwner
    );
    Ok(())
}

pub fn has_immutable_owner(data: &[u8]) -> Result<bool> {
    let account = StateWithExtensions::<TokenAccountState>::unpack(data)?;
    Ok(account.get_extension::<ImmutableOwner>().is_ok())
}

fn load_config(account: &AccountInfo, mint: &Pubkey) -> Result<LedgerConfig> {
    require_keys_eq!(
        account.key(),
        find_ledger_config(mint),
        TransferGateError::InvalidConfig
    );
    require_keys_eq!(
        *account.owner,
        ASSET_LEDGER_PROGRAM_ID,
        TransferGateError::InvalidConfig
    );

    let data = account.try_borrow_data()?;
    let mut slice: &[u8] = &data;
    let config = LedgerConfig::try_deserialize(&mut slice)?;
    require_keys_eq!(config.mint, *mint, TransferGateError::InvalidConfig);
    Ok(config)
}

/// A missing entry means the account was never blacklisted.
fn load_blacklist_entry(
    account: &AccountInfo,
    config: &Pubkey,
    wallet: &Pubkey,
) -> Result<Option<BlacklistEntry>> {
    require_keys_eq!(
        account.key(),
        find_blacklist_entry(config, wallet),
        TransferGateError::InvalidBlacklistEntry
    );
    if account.data_is_empty() {
        return Ok(None);
    }
    require_keys_eq!(
        *account.owner,
        ASSET_LEDGER_PROGRAM_ID,
        TransferGateError::InvalidBlacklistEntry
    );

    let data = account.try_borrow_data()?;
    let mut slice: &[u8] = &data;
    let entry = BlacklistEntry::try_deserialize(&mut slice)?;
    Ok(Some(entry))
}
