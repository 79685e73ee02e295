use std::sync::Once;

use anchor_lang::{AnchorDeserialize, Event};
use asset_ledger::errors::AssetLedgerError;
use asset_ledger::events::{BlacklistUpdated, LedgerInitialized, MaxAmountUpdated};
use deploy_gate::errors::DeployGateError;
use deploy_gate::events::{
    CodeHashBanned, CodeHashUnbanned, ContractDeployed, DeploymentsPaused, DeploymentsUnpaused,
    GatekeeperInitialized,
};
use deploy_gate::state::DeployedCode;
use solana_program_test::{processor, ProgramTest, ProgramTestContext};
use solana_sdk::account_info::AccountInfo;
use solana_sdk::entrypoint::ProgramResult;
use solana_sdk::instruction::InstructionError;
use solana_sdk::program_stubs::{self, SyscallStubs};
use solana_sdk::system_instruction;
use solana_sdk::transaction::TransactionError;
use spl_token_2022::extension::ExtensionType;
use transfer_gate::errors::TransferGateError;

use super::*;

fn asset_ledger_entry(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let accounts = Box::leak(Box::new(accounts.to_vec()));
    asset_ledger::entry(program_id, accounts, data)
}

fn transfer_gate_entry(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let accounts = Box::leak(Box::new(accounts.to_vec()));
    transfer_gate::entry(program_id, accounts, data)
}

fn deploy_gate_entry(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let accounts = Box::leak(Box::new(accounts.to_vec()));
    deploy_gate::entry(program_id, accounts, data)
}

struct PlaceholderStubs;

impl SyscallStubs for PlaceholderStubs {}

/// Forwards every syscall to the test runtime and writes `sol_log_data`
/// records (anchor events) into the transaction log as hex.
struct EventLogStubs {
    inner: Box<dyn SyscallStubs>,
}

impl SyscallStubs for EventLogStubs {
    fn sol_log(&self, message: &str) {
        self.inner.sol_log(message)
    }

    fn sol_log_compute_units(&self) {
        self.inner.sol_log_compute_units()
    }

    fn sol_remaining_compute_units(&self) -> u64 {
        self.inner.sol_remaining_compute_units()
    }

    fn sol_invoke_signed(
        &self,
        instruction: &Instruction,
        account_infos: &[AccountInfo],
        signers_seeds: &[&[&[u8]]],
    ) -> ProgramResult {
        self.inner
            .sol_invoke_signed(instruction, account_infos, signers_seeds)
    }

    fn sol_get_clock_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.inner.sol_get_clock_sysvar(var_addr)
    }

    fn sol_get_epoch_schedule_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.inner.sol_get_epoch_schedule_sysvar(var_addr)
    }

    fn sol_get_fees_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.inner.sol_get_fees_sysvar(var_addr)
    }

    fn sol_get_rent_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.inner.sol_get_rent_sysvar(var_addr)
    }

    fn sol_get_epoch_rewards_sysvar(&self, var_addr: *mut u8) -> u64 {
        self.inner.sol_get_epoch_rewards_sysvar(var_addr)
    }

    fn sol_get_last_restart_slot(&self, var_addr: *mut u8) -> u64 {
        self.inner.sol_get_last_restart_slot(var_addr)
    }

    fn sol_get_return_data(&self) -> Option<(Pubkey, Vec<u8>)> {
        self.inner.sol_get_return_data()
    }

    fn sol_set_return_data(&self, data: &[u8]) {
        self.inner.sol_set_return_data(data)
    }

    fn sol_log_data(&self, fields: &[&[u8]]) {
        let encoded: Vec<String> = fields.iter().map(hex::encode).collect();
        self.inner.sol_log(&format!("data: {}", encoded.join(" ")))
    }

    fn sol_get_processed_sibling_instruction(&self, index: usize) -> Option<Instruction> {
        self.inner.sol_get_processed_sibling_instruction(index)
    }

    fn sol_get_stack_height(&self) -> u64 {
        self.inner.sol_get_stack_height()
    }
}

static EVENT_LOGS: Once = Once::new();

/// Starts the bank, then wraps the runtime's syscall stubs once so events
/// show up in transaction logs.
async fn start(program_test: ProgramTest) -> ProgramTestContext {
    let context = program_test.start_with_context().await;
    EVENT_LOGS.call_once(|| {
        let inner = program_stubs::set_syscall_stubs(Box::new(PlaceholderStubs));
        program_stubs::set_syscall_stubs(Box::new(EventLogStubs { inner }));
    });
    context
}

fn ledger_programs() -> ProgramTest {
    let mut program_test = ProgramTest::new(
        "asset_ledger",
        asset_ledger::ID,
        processor!(asset_ledger_entry),
    );
    program_test.add_program(
        "transfer_gate",
        transfer_gate::ID,
        processor!(transfer_gate_entry),
    );
    program_test
}

fn deploy_gate_program() -> ProgramTest {
    ProgramTest::new("deploy_gate", deploy_gate::ID, processor!(deploy_gate_entry))
}

struct Outcome {
    result: std::result::Result<(), TransactionError>,
    logs: Vec<String>,
    return_data: Option<Vec<u8>>,
}

async fn process(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Outcome {
    let blockhash = context.get_new_latest_blockhash().await.unwrap();
    let mut all_signers: Vec<&Keypair> = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    let transaction = Transaction::new_signed_with_payer(
        instructions,
        Some(&context.payer.pubkey()),
        &all_signers,
        blockhash,
    );

    let processed = context
        .banks_client
        .process_transaction_with_metadata(transaction)
        .await
        .unwrap();
    let metadata = processed.metadata.unwrap();
    Outcome {
        result: processed.result,
        logs: metadata.log_messages,
        return_data: metadata.return_data.map(|data| data.data),
    }
}

fn events<E: Event>(logs: &[String]) -> Vec<E> {
    logs.iter()
        .filter_map(|line| line.strip_prefix("Program log: data: "))
        .filter_map(|encoded| hex::decode(encoded).ok())
        .filter(|bytes| bytes.len() >= 8 && bytes[..8] == E::DISCRIMINATOR)
        .map(|bytes| E::try_from_slice(&bytes[8..]).unwrap())
        .collect()
}

fn custom_error(code: u32) -> TransactionError {
    TransactionError::InstructionError(0, InstructionError::Custom(code))
}

async fn fetch<T: AccountDeserialize>(context: &mut ProgramTestContext, address: Pubkey) -> Option<T> {
    let account = context.banks_client.get_account(address).await.unwrap()?;
    Some(T::try_deserialize(&mut account.data.as_slice()).unwrap())
}

async fn fund(context: &mut ProgramTestContext, address: Pubkey, lamports: u64) {
    let ix = system_instruction::transfer(&context.payer.pubkey(), &address, lamports);
    process(context, &[ix], &[]).await.result.unwrap();
}

fn ata(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, &spl_token_2022::id())
}

async fn token_balance(context: &mut ProgramTestContext, address: Pubkey) -> u64 {
    let account = context
        .banks_client
        .get_account(address)
        .await
        .unwrap()
        .unwrap();
    StateWithExtensions::<TokenAccount2022>::unpack(&account.data)
        .unwrap()
        .base
        .amount
}

/// Issues 1000 units to the payer with a limit of 100 and returns (mint, config).
async fn initialize_ledger(context: &mut ProgramTestContext) -> (Pubkey, Pubkey) {
    let admin = context.payer.pubkey();
    let mint = Keypair::new();
    let config_pda = find_ledger_config_pda(&mint.pubkey());
    let initialize_ix = build_ledger_initialize_instruction(LedgerInitializeParams {
        authority: admin,
        mint: mint.pubkey(),
        config_pda,
        authority_ata: ata(&admin, &mint.pubkey()),
        name: "Access Controlled".to_string(),
        symbol: "ACC".to_string(),
        decimals: 0,
        initial_supply: 1_000,
        max_amount: 100,
    })
    .unwrap();
    let metas_ix = build_extra_metas_instruction(admin, mint.pubkey());

    let outcome = process(context, &[initialize_ix, metas_ix], &[&mint]).await;
    outcome.result.unwrap();
    let initialized = events::<LedgerInitialized>(&outcome.logs);
    assert_eq!(initialized.len(), 1);
    assert_eq!(initialized[0].initial_supply, 1_000);
    assert_eq!(initialized[0].max_amount, 100);
    (mint.pubkey(), config_pda)
}

fn transfer_ix(mint: Pubkey, config_pda: Pubkey, sender: Pubkey, recipient: Pubkey, amount: u64) -> Instruction {
    build_gated_transfer_instruction(GatedTransferParams {
        mint,
        config_pda,
        sender,
        recipient,
        amount,
        decimals: 0,
    })
    .unwrap()
}

async fn open_token_account(context: &mut ProgramTestContext, owner: Pubkey, mint: Pubkey) {
    let ix = create_associated_token_account_idempotent(
        &context.payer.pubkey(),
        &owner,
        &mint,
        &spl_token_2022::id(),
    );
    process(context, &[ix], &[]).await.result.unwrap();
}

#[tokio::test]
async fn ledger_scenario_blocks_blacklisted_and_oversized_transfers() {
    let mut context = start(ledger_programs()).await;
    let admin = context.payer.pubkey();
    let (mint, config_pda) = initialize_ledger(&mut context).await;
    let holder = Keypair::new();
    let third_party = Pubkey::new_unique();

    open_token_account(&mut context, holder.pubkey(), mint).await;
    open_token_account(&mut context, third_party, mint).await;
    let funded = process(
        &mut context,
        &[transfer_ix(mint, config_pda, admin, holder.pubkey(), 50)],
        &[],
    )
    .await;
    funded.result.unwrap();
    assert_eq!(token_balance(&mut context, ata(&admin, &mint)).await, 950);

    let blacklisted = process(
        &mut context,
        &[build_set_blacklisted_instruction(admin, config_pda, holder.pubkey(), true).unwrap()],
        &[],
    )
    .await;
    blacklisted.result.unwrap();
    let updates = events::<BlacklistUpdated>(&blacklisted.logs);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].account, holder.pubkey());
    assert!(updates[0].is_blacklisted);

    let to_blacklisted = process(
        &mut context,
        &[transfer_ix(mint, config_pda, admin, holder.pubkey(), 50)],
        &[],
    )
    .await;
    assert_eq!(
        to_blacklisted.result.unwrap_err(),
        custom_error(TransferGateError::RecipientBlacklisted.into())
    );

    let from_blacklisted = process(
        &mut context,
        &[transfer_ix(mint, config_pda, holder.pubkey(), admin, 50)],
        &[&holder],
    )
    .await;
    assert_eq!(
        from_blacklisted.result.unwrap_err(),
        custom_error(TransferGateError::SenderBlacklisted.into())
    );

    let oversized = process(
        &mut context,
        &[transfer_ix(mint, config_pda, admin, third_party, 150)],
        &[],
    )
    .await;
    assert_eq!(
        oversized.result.unwrap_err(),
        custom_error(TransferGateError::AmountExceedsLimit.into())
    );

    assert_eq!(token_balance(&mut context, ata(&admin, &mint)).await, 950);
    assert_eq!(token_balance(&mut context, ata(&holder.pubkey(), &mint)).await, 50);
    assert_eq!(token_balance(&mut context, ata(&third_party, &mint)).await, 0);

    process(
        &mut context,
        &[transfer_ix(mint, config_pda, admin, third_party, 50)],
        &[],
    )
    .await
    .result
    .unwrap();
    assert_eq!(token_balance(&mut context, ata(&admin, &mint)).await, 900);
    assert_eq!(token_balance(&mut context, ata(&third_party, &mint)).await, 50);
}

#[tokio::test]
async fn only_the_administrator_changes_ledger_registries() {
    let mut context = start(ledger_programs()).await;
    let admin = context.payer.pubkey();
    let (_, config_pda) = initialize_ledger(&mut context).await;
    let outsider = Keypair::new();
    let target = Pubkey::new_unique();
    fund(&mut context, outsider.pubkey(), 1_000_000_000).await;

    let refused = process(
        &mut context,
        &[build_set_blacklisted_instruction(outsider.pubkey(), config_pda, target, true).unwrap()],
        &[&outsider],
    )
    .await;
    assert_eq!(
        refused.result.unwrap_err(),
        custom_error(AssetLedgerError::Unauthorized.into())
    );
    assert!(events::<BlacklistUpdated>(&refused.logs).is_empty());
    let entry: Option<BlacklistEntry> =
        fetch(&mut context, find_blacklist_pda(&config_pda, &target)).await;
    assert!(entry.is_none());

    let refused = process(
        &mut context,
        &[build_set_max_amount_instruction(outsider.pubkey(), config_pda, 500).unwrap()],
        &[&outsider],
    )
    .await;
    assert_eq!(
        refused.result.unwrap_err(),
        custom_error(AssetLedgerError::Unauthorized.into())
    );
    assert!(events::<MaxAmountUpdated>(&refused.logs).is_empty());
    let config: LedgerConfig = fetch(&mut context, config_pda).await.unwrap();
    assert_eq!(config.max_amount, 100);

    let null_target = process(
        &mut context,
        &[build_set_blacklisted_instruction(admin, config_pda, Pubkey::default(), true).unwrap()],
        &[],
    )
    .await;
    assert_eq!(
        null_target.result.unwrap_err(),
        custom_error(AssetLedgerError::InvalidTarget.into())
    );

    let zero_limit = process(
        &mut context,
        &[build_set_max_amount_instruction(admin, config_pda, 0).unwrap()],
        &[],
    )
    .await;
    assert_eq!(
        zero_limit.result.unwrap_err(),
        custom_error(AssetLedgerError::LimitMustBePositive.into())
    );

    let raised = process(
        &mut context,
        &[build_set_max_amount_instruction(admin, config_pda, 250).unwrap()],
        &[],
    )
    .await;
    raised.result.unwrap();
    let updates = events::<MaxAmountUpdated>(&raised.logs);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].new_max_amount, 250);
    let config: LedgerConfig = fetch(&mut context, config_pda).await.unwrap();
    assert_eq!(config.max_amount, 250);
}

#[tokio::test]
async fn transfers_into_reassignable_accounts_are_refused() {
    let mut context = start(ledger_programs()).await;
    let admin = context.payer.pubkey();
    let (mint, config_pda) = initialize_ledger(&mut context).await;
    let holder = Pubkey::new_unique();
    let token_account = Keypair::new();

    let space = ExtensionType::try_calculate_account_len::<TokenAccount2022>(&[
        ExtensionType::TransferHookAccount,
    ])
    .unwrap();
    let rent = context.banks_client.get_rent().await.unwrap();
    let create_ix = system_instruction::create_account(
        &admin,
        &token_account.pubkey(),
        rent.minimum_balance(space),
        space as u64,
        &spl_token_2022::id(),
    );
    let init_ix = spl_token_2022::instruction::initialize_account3(
        &spl_token_2022::id(),
        &token_account.pubkey(),
        &mint,
        &holder,
    )
    .unwrap();
    process(&mut context, &[create_ix, init_ix], &[&token_account])
        .await
        .result
        .unwrap();

    let mut ix = transfer_ix(mint, config_pda, admin, holder, 10);
    ix.accounts[2].pubkey = token_account.pubkey();
    let refused = process(&mut context, &[ix], &[]).await;
    assert_eq!(
        refused.result.unwrap_err(),
        custom_error(TransferGateError::MutableAccountOwner.into())
    );
    assert_eq!(token_balance(&mut context, ata(&admin, &mint)).await, 1_000);
}

fn install_ix(deployer: Pubkey, gatekeeper: Pubkey, index: u64, code: &[u8]) -> Instruction {
    build_install_instruction(InstallParams {
        deployer,
        gatekeeper_pda: gatekeeper,
        ban_record: find_ban_pda(&gatekeeper, &hash_code(code)),
        deployment: find_deployment_pda(&gatekeeper, index),
        code: code.to_vec(),
    })
    .unwrap()
}

fn ban_ix(authority: Pubkey, gatekeeper: Pubkey, code_hash: [u8; 32], unban: bool) -> Instruction {
    build_update_ban_instruction(UpdateBanParams {
        authority,
        gatekeeper_pda: gatekeeper,
        code_hash,
        unban,
    })
    .unwrap()
}

async fn initialize_gatekeeper(context: &mut ProgramTestContext) -> Pubkey {
    let admin = context.payer.pubkey();
    let outcome = process(context, &[build_gatekeeper_initialize_instruction(admin)], &[]).await;
    outcome.result.unwrap();
    assert_eq!(events::<GatekeeperInitialized>(&outcome.logs).len(), 1);
    find_gatekeeper_pda(&admin)
}

#[tokio::test]
async fn paused_gatekeeper_refuses_installs_until_unpaused() {
    let mut context = start(deploy_gate_program()).await;
    let admin = context.payer.pubkey();
    let gatekeeper = initialize_gatekeeper(&mut context).await;
    let code = b"deployable blob";

    let paused = process(&mut context, &[build_pause_instruction(admin, gatekeeper, false)], &[]).await;
    paused.result.unwrap();
    assert_eq!(events::<DeploymentsPaused>(&paused.logs).len(), 1);

    let refused = process(&mut context, &[install_ix(admin, gatekeeper, 0, code)], &[]).await;
    assert_eq!(
        refused.result.unwrap_err(),
        custom_error(DeployGateError::DeploymentsPaused.into())
    );
    assert!(events::<ContractDeployed>(&refused.logs).is_empty());
    let deployment: Option<DeployedCode> =
        fetch(&mut context, find_deployment_pda(&gatekeeper, 0)).await;
    assert!(deployment.is_none());

    let unpaused = process(&mut context, &[build_pause_instruction(admin, gatekeeper, true)], &[]).await;
    unpaused.result.unwrap();
    assert_eq!(events::<DeploymentsUnpaused>(&unpaused.logs).len(), 1);

    let installed = process(&mut context, &[install_ix(admin, gatekeeper, 0, code)], &[]).await;
    installed.result.unwrap();
    let mut returned = installed.return_data.unwrap();
    returned.resize(32, 0);
    let handle = Pubkey::try_from(returned.as_slice()).unwrap();
    assert_eq!(handle, find_deployment_pda(&gatekeeper, 0));

    let deployed = events::<ContractDeployed>(&installed.logs);
    assert_eq!(deployed.len(), 1);
    assert_eq!(deployed[0].deployment, handle);
    assert_eq!(deployed[0].code_hash, hash_code(code));
    assert_eq!(deployed[0].deployer, admin);

    let record: DeployedCode = fetch(&mut context, handle).await.unwrap();
    assert_eq!(record.code, code.to_vec());
    assert_eq!(record.code_hash, hash_code(code));
    let state: Gatekeeper = fetch(&mut context, gatekeeper).await.unwrap();
    assert_eq!(state.deployments, 1);
}

#[tokio::test]
async fn only_the_administrator_pauses() {
    let mut context = start(deploy_gate_program()).await;
    let gatekeeper = initialize_gatekeeper(&mut context).await;
    let outsider = Keypair::new();

    let refused = process(
        &mut context,
        &[build_pause_instruction(outsider.pubkey(), gatekeeper, false)],
        &[&outsider],
    )
    .await;
    assert_eq!(
        refused.result.unwrap_err(),
        custom_error(DeployGateError::Unauthorized.into())
    );
    assert!(events::<DeploymentsPaused>(&refused.logs).is_empty());
    let state: Gatekeeper = fetch(&mut context, gatekeeper).await.unwrap();
    assert_eq!(state.state, PauseState::Active);
}

#[tokio::test]
async fn prefunded_deployment_address_still_installs() {
    let mut context = start(deploy_gate_program()).await;
    let admin = context.payer.pubkey();
    let gatekeeper = initialize_gatekeeper(&mut context).await;
    let next = find_deployment_pda(&gatekeeper, 0);
    fund(&mut context, next, 1_000_000).await;

    let code = b"deployable blob";
    let installed = process(&mut context, &[install_ix(admin, gatekeeper, 0, code)], &[]).await;
    installed.result.unwrap();
    assert_eq!(events::<ContractDeployed>(&installed.logs).len(), 1);

    let account = context.banks_client.get_account(next).await.unwrap().unwrap();
    let rent = context.banks_client.get_rent().await.unwrap();
    assert_eq!(account.owner, deploy_gate::ID);
    assert!(rent.is_exempt(account.lamports, account.data.len()));
    let record: DeployedCode = fetch(&mut context, next).await.unwrap();
    assert_eq!(record.code, code.to_vec());

    process(&mut context, &[install_ix(admin, gatekeeper, 1, code)], &[])
        .await
        .result
        .unwrap();
    let state: Gatekeeper = fetch(&mut context, gatekeeper).await.unwrap();
    assert_eq!(state.deployments, 2);
}

#[tokio::test]
async fn ban_transitions_emit_once_and_gate_installs() {
    let mut context = start(deploy_gate_program()).await;
    let admin = context.payer.pubkey();
    let gatekeeper = initialize_gatekeeper(&mut context).await;
    let code = b"\x60\x80\x60\x40\x52";
    let hash = hash_code(code);

    let banned = process(&mut context, &[ban_ix(admin, gatekeeper, hash, false)], &[]).await;
    banned.result.unwrap();
    let bans = events::<CodeHashBanned>(&banned.logs);
    assert_eq!(bans.len(), 1);
    assert_eq!(bans[0].code_hash, hash);

    let repeated = process(&mut context, &[ban_ix(admin, gatekeeper, hash, false)], &[]).await;
    assert_eq!(
        repeated.result.unwrap_err(),
        custom_error(DeployGateError::AlreadyBanned.into())
    );
    assert!(events::<CodeHashBanned>(&repeated.logs).is_empty());

    let blocked = process(&mut context, &[install_ix(admin, gatekeeper, 0, code)], &[]).await;
    assert_eq!(
        blocked.result.unwrap_err(),
        custom_error(DeployGateError::CodeHashBanned.into())
    );

    let unbanned = process(&mut context, &[ban_ix(admin, gatekeeper, hash, true)], &[]).await;
    unbanned.result.unwrap();
    assert_eq!(events::<CodeHashUnbanned>(&unbanned.logs).len(), 1);

    let never_banned = hash_code(b"never banned");
    let stale = process(&mut context, &[ban_ix(admin, gatekeeper, never_banned, true)], &[]).await;
    assert_eq!(
        stale.result.unwrap_err(),
        custom_error(DeployGateError::NotBanned.into())
    );
    assert!(events::<CodeHashUnbanned>(&stale.logs).is_empty());
    let record: Option<BannedCodeHash> =
        fetch(&mut context, find_ban_pda(&gatekeeper, &never_banned)).await;
    assert!(record.is_none());

    process(&mut context, &[install_ix(admin, gatekeeper, 0, code)], &[])
        .await
        .result
        .unwrap();
}
