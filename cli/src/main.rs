use anchor_lang::AccountDeserialize;
use anyhow::{anyhow, Context, Result};
use asset_ledger::state::{BlacklistEntry, LedgerConfig};
use borsh::BorshSerialize;
use clap::{Args, Parser, Subcommand, ValueEnum};
use deploy_gate::state::{BannedCodeHash, Gatekeeper, PauseState};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_client::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::keccak;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use solana_sdk::system_program;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token_2022::extension::StateWithExtensions;
use spl_token_2022::state::Account as TokenAccount2022;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const LEDGER_SEED: &[u8] = b"ledger";
const BLACKLIST_SEED: &[u8] = b"blacklist";
const GATEKEEPER_SEED: &[u8] = b"gatekeeper";
const BANNED_SEED: &[u8] = b"banned";
const DEPLOYMENT_SEED: &[u8] = b"deployment";

// Leaves room for accounts and signatures inside a 1232-byte packet.
const MAX_INLINE_CODE_LEN: usize = 850;

#[derive(Parser)]
#[command(name = "gk", version, about = "Gated ledger and deployment gatekeeper CLI")]
struct Cli {
    #[arg(long)]
    cluster: Option<String>,

    #[arg(long)]
    keypair: Option<String>,

    /// Project config (TOML) with [network], [ledger] and [gatekeeper] tables.
    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Ledger(LedgerCmd),
    #[command(subcommand)]
    Deploy(DeployCmd),
}

#[derive(Subcommand)]
enum LedgerCmd {
    Init(LedgerInitArgs),
    Transfer(TransferArgs),
    #[command(subcommand)]
    Blacklist(BlacklistCmd),
    MaxAmount(MaxAmountArgs),
    Status(MintOnlyArgs),
}

#[derive(Subcommand)]
enum BlacklistCmd {
    Set(BlacklistSetArgs),
    Check(AddressArgs),
}

#[derive(Subcommand)]
enum DeployCmd {
    Init,
    Ban(CodeHashArgs),
    Unban(CodeHashArgs),
    Check(CodeHashArgs),
    Install(InstallArgs),
    Pause,
    Unpause,
    Status(GatekeeperArgs),
    Hash(HashArgs),
}

#[derive(Args)]
struct LedgerInitArgs {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    symbol: Option<String>,

    #[arg(long)]
    decimals: Option<u8>,

    #[arg(long)]
    supply: Option<String>,

    #[arg(long)]
    max_amount: Option<String>,
}

#[derive(Args)]
struct TransferArgs {
    recipient: String,
    amount: String,

    #[arg(long)]
    mint: Option<String>,
}

#[derive(Args)]
struct BlacklistSetArgs {
    address: String,

    /// Clear the flag instead of setting it.
    #[arg(long)]
    remove: bool,

    #[arg(long)]
    mint: Option<String>,
}

#[derive(Args)]
struct AddressArgs {
    address: String,

    #[arg(long)]
    mint: Option<String>,
}

#[derive(Args)]
struct MaxAmountArgs {
    amount: String,

    #[arg(long)]
    mint: Option<String>,
}

#[derive(Args)]
struct MintOnlyArgs {
    #[arg(long)]
    mint: Option<String>,
}

#[derive(Args)]
struct CodeHashArgs {
    /// Hex-encoded Keccak-256 hash.
    #[arg(required_unless_present = "file")]
    hash: Option<String>,

    /// Hash this file instead of passing a hash.
    #[arg(long, conflicts_with = "hash")]
    file: Option<String>,

    #[arg(long)]
    authority: Option<String>,
}

#[derive(Args)]
struct InstallArgs {
    file: String,

    /// Administrator of the gatekeeper to install through.
    #[arg(long)]
    authority: Option<String>,
}

#[derive(Args)]
struct GatekeeperArgs {
    #[arg(long)]
    authority: Option<String>,
}

#[derive(Args)]
struct HashArgs {
    file: String,
}

#[cfg(test)]
mod program_tests;

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let project = cli
        .config
        .as_deref()
        .map(load_project_config)
        .transpose()?
        .unwrap_or_default();

    if let Commands::Deploy(DeployCmd::Hash(args)) = &cli.command {
        return handle_hash(cli.output, args);
    }

    let solana_config = load_solana_cli_config().ok();
    let ctx = build_context(&cli, solana_config.as_ref(), project.network.as_ref())?;

    match &cli.command {
        Commands::Ledger(cmd) => match cmd {
            LedgerCmd::Init(args) => handle_ledger_init(&ctx, args, project.ledger.as_ref()),
            LedgerCmd::Transfer(args) => handle_transfer(&ctx, args),
            LedgerCmd::Blacklist(BlacklistCmd::Set(args)) => handle_blacklist_set(&ctx, args),
            LedgerCmd::Blacklist(BlacklistCmd::Check(args)) => handle_blacklist_check(&ctx, args),
            LedgerCmd::MaxAmount(args) => handle_max_amount(&ctx, args),
            LedgerCmd::Status(args) => handle_ledger_status(&ctx, args),
        },
        Commands::Deploy(cmd) => {
            let gatekeeper_config = project.gatekeeper.as_ref();
            match cmd {
                DeployCmd::Init => handle_gatekeeper_init(&ctx),
                DeployCmd::Ban(args) => handle_ban(&ctx, args, gatekeeper_config, false),
                DeployCmd::Unban(args) => handle_ban(&ctx, args, gatekeeper_config, true),
                DeployCmd::Check(args) => handle_ban_check(&ctx, args, gatekeeper_config),
                DeployCmd::Install(args) => handle_install(&ctx, args, gatekeeper_config),
                DeployCmd::Pause => handle_pause(&ctx, false),
                DeployCmd::Unpause => handle_pause(&ctx, true),
                DeployCmd::Status(args) => {
                    handle_gatekeeper_status(&ctx, args.authority.as_deref(), gatekeeper_config)
                }
                DeployCmd::Hash(args) => handle_hash(ctx.output, args),
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ClusterInfo {
    url: String,
    label: Option<String>,
}

struct AppContext {
    client: RpcClient,
    payer: Keypair,
    output: OutputFormat,
    cluster: ClusterInfo,
}

fn build_context(
    cli: &Cli,
    solana_config: Option<&SolanaCliConfig>,
    network_override: Option<&NetworkConfig>,
) -> Result<AppContext> {
    let cluster_value = if let Some(value) = cli.cluster.as_deref() {
        value.to_string()
    } else if let Some(value) = network_override.and_then(|cfg| cfg.cluster.as_deref()) {
        value.to_string()
    } else if let Some(config) = solana_config {
        config.json_rpc_url.clone()
    } else {
        "devnet".to_string()
    };

    let cluster = resolve_cluster(&cluster_value)?;

    let keypair_value = if let Some(value) = cli.keypair.as_deref() {
        value.to_string()
    } else if let Some(value) = network_override.and_then(|cfg| cfg.keypair_path.as_deref()) {
        value.to_string()
    } else if let Some(config) = solana_config {
        config.keypair_path.clone()
    } else {
        return Err(anyhow!(
            "Missing keypair path. Use --keypair or Solana CLI config."
        ));
    };

    let commitment_value = network_override
        .and_then(|cfg| cfg.commitment.clone())
        .or_else(|| solana_config.and_then(|cfg| cfg.commitment.clone()));
    let commitment = parse_commitment(commitment_value.as_deref());

    let keypair_path = expand_tilde(&keypair_value);
    let payer = read_keypair_file(&keypair_path)
        .map_err(|err| anyhow!("Failed to read keypair: {}", err))?;

    let client = RpcClient::new_with_commitment(cluster.url.clone(), commitment);

    Ok(AppContext {
        client,
        payer,
        output: cli.output,
        cluster,
    })
}

fn handle_ledger_init(
    ctx: &AppContext,
    args: &LedgerInitArgs,
    config: Option<&LedgerFileConfig>,
) -> Result<()> {
    let name = args
        .name
        .clone()
        .or_else(|| config.map(|cfg| cfg.name.clone()))
        .ok_or_else(|| anyhow!("--name is required without a [ledger] config"))?;
    let symbol = args
        .symbol
        .clone()
        .or_else(|| config.map(|cfg| cfg.symbol.clone()))
        .ok_or_else(|| anyhow!("--symbol is required without a [ledger] config"))?;
    let decimals = args
        .decimals
        .or_else(|| config.and_then(|cfg| cfg.decimals))
        .unwrap_or(6);
    let supply = args
        .supply
        .clone()
        .or_else(|| config.map(|cfg| cfg.initial_supply.clone()))
        .ok_or_else(|| anyhow!("--supply is required without a [ledger] config"))?;
    let max_amount = args
        .max_amount
        .clone()
        .or_else(|| config.map(|cfg| cfg.max_amount.clone()))
        .ok_or_else(|| anyhow!("--max-amount is required without a [ledger] config"))?;

    let initial_supply = parse_amount(&supply, decimals)?;
    let max_amount = parse_amount(&max_amount, decimals)?;

    let mint_keypair = Keypair::new();
    let mint = mint_keypair.pubkey();
    let authority = ctx.payer.pubkey();
    let config_pda = find_ledger_config_pda(&mint);
    let authority_ata =
        get_associated_token_address_with_program_id(&authority, &mint, &spl_token_2022::id());

    let initialize_ix = build_ledger_initialize_instruction(LedgerInitializeParams {
        authority,
        mint,
        config_pda,
        authority_ata,
        name: name.clone(),
        symbol: symbol.clone(),
        decimals,
        initial_supply,
        max_amount,
    })?;
    let extra_metas_ix = build_extra_metas_instruction(authority, mint);

    let signature = send_transaction(ctx, vec![initialize_ix, extra_metas_ix], vec![&mint_keypair])?;
    let explorer = explorer_url(&signature, &ctx.cluster);

    if ctx.output == OutputFormat::Json {
        print_json(&LedgerInitOutput {
            mint: mint.to_string(),
            config: config_pda.to_string(),
            initial_supply: initial_supply.to_string(),
            max_amount: max_amount.to_string(),
            signature,
            explorer,
        })
    } else {
        println!("Ledger initialized: {} ({})", name, symbol);
        println!("Mint:       {}", mint);
        println!("Config:     {}", config_pda);
        println!("Supply:     {}", format_amount(initial_supply, decimals));
        println!("Max amount: {}", format_amount(max_amount, decimals));
        println!("Tx:         {}", signature);
        if let Some(url) = explorer {
            println!("Explorer:   {}", url);
        }
        Ok(())
    }
}

fn handle_transfer(ctx: &AppContext, args: &TransferArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let config_pda = find_ledger_config_pda(&mint);
    let config = fetch_ledger_config(ctx, &config_pda)?;
    let amount = parse_amount(&args.amount, config.decimals)?;
    let sender = ctx.payer.pubkey();
    let recipient = parse_pubkey(&args.recipient)?;

    let create_ata_ix = create_associated_token_account_idempotent(
        &sender,
        &recipient,
        &mint,
        &spl_token_2022::id(),
    );
    let transfer_ix = build_gated_transfer_instruction(GatedTransferParams {
        mint,
        config_pda,
        sender,
        recipient,
        amount,
        decimals: config.decimals,
    })?;
    let signature = send_transaction(ctx, vec![create_ata_ix, transfer_ix], vec![])?;
    let explorer = explorer_url(&signature, &ctx.cluster);

    if ctx.output == OutputFormat::Json {
        print_json(&SimpleOutput { signature, explorer })
    } else {
        println!(
            "Transferred {} to {}",
            format_amount(amount, config.decimals),
            recipient
        );
        println!("Tx: {}", signature);
        if let Some(url) = explorer {
            println!("Explorer: {}", url);
        }
        Ok(())
    }
}

fn handle_blacklist_set(ctx: &AppContext, args: &BlacklistSetArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let config_pda = find_ledger_config_pda(&mint);
    let account = parse_pubkey(&args.address)?;
    if account == Pubkey::default() {
        return Err(anyhow!("The null account cannot be blacklisted"));
    }
    let is_blacklisted = !args.remove;

    let ix = build_set_blacklisted_instruction(ctx.payer.pubkey(), config_pda, account, is_blacklisted)?;
    let signature = send_transaction(ctx, vec![ix], vec![])?;
    let explorer = explorer_url(&signature, &ctx.cluster);

    if ctx.output == OutputFormat::Json {
        print_json(&SimpleOutput { signature, explorer })
    } else {
        if is_blacklisted {
            println!("Blacklisted: {}", account);
        } else {
            println!("Cleared from blacklist: {}", account);
        }
        println!("Tx: {}", signature);
        if let Some(url) = explorer {
            println!("Explorer: {}", url);
        }
        Ok(())
    }
}

fn handle_blacklist_check(ctx: &AppContext, args: &AddressArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let config_pda = find_ledger_config_pda(&mint);
    let account = parse_pubkey(&args.address)?;
    let entry_pda = find_blacklist_pda(&config_pda, &account);
    let entry = fetch_blacklist_entry(ctx, &entry_pda)?;
    let is_blacklisted = entry.as_ref().is_some_and(BlacklistEntry::is_blacklisted);

    if ctx.output == OutputFormat::Json {
        print_json(&BlacklistStatusOutput {
            account: account.to_string(),
            is_blacklisted,
            updated_by: entry.map(|entry| entry.updated_by.to_string()),
        })
    } else {
        println!("Account:     {}", account);
        println!("Blacklisted: {}", is_blacklisted);
        if let Some(entry) = entry {
            println!("Updated by:  {}", entry.updated_by);
        }
        Ok(())
    }
}

fn handle_max_amount(ctx: &AppContext, args: &MaxAmountArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let config_pda = find_ledger_config_pda(&mint);
    let config = fetch_ledger_config(ctx, &config_pda)?;
    let new_max_amount = parse_amount(&args.amount, config.decimals)?;
    if new_max_amount == 0 {
        return Err(anyhow!("Max amount must be greater than zero"));
    }

    let ix = build_set_max_amount_instruction(ctx.payer.pubkey(), config_pda, new_max_amount)?;
    let signature = send_transaction(ctx, vec![ix], vec![])?;
    let explorer = explorer_url(&signature, &ctx.cluster);

    if ctx.output == OutputFormat::Json {
        print_json(&SimpleOutput { signature, explorer })
    } else {
        println!(
            "Max amount set to {}",
            format_amount(new_max_amount, config.decimals)
        );
        println!("Tx: {}", signature);
        if let Some(url) = explorer {
            println!("Explorer: {}", url);
        }
        Ok(())
    }
}

fn handle_ledger_status(ctx: &AppContext, args: &MintOnlyArgs) -> Result<()> {
    let mint = resolve_mint(&args.mint)?;
    let config_pda = find_ledger_config_pda(&mint);
    let config = fetch_ledger_config(ctx, &config_pda)?;
    let supply = ctx.client.get_token_supply(&mint)?;
    let authority_ata =
        get_associated_token_address_with_program_id(&config.authority, &mint, &spl_token_2022::id());
    let authority_balance = fetch_token_balance(ctx, &authority_ata).unwrap_or(0);

    if ctx.output == OutputFormat::Json {
        print_json(&LedgerStatusOutput {
            mint: mint.to_string(),
            authority: config.authority.to_string(),
            name: config.name,
            symbol: config.symbol,
            decimals: config.decimals,
            supply: supply.amount,
            max_amount: config.max_amount.to_string(),
            authority_balance: authority_balance.to_string(),
        })
    } else {
        println!("Ledger:     {} ({})", config.name, config.symbol);
        println!("Mint:       {}", mint);
        println!("Authority:  {}", config.authority);
        println!("Supply:     {}", supply.ui_amount_string);
        println!(
            "Max amount: {}",
            format_amount(config.max_amount, config.decimals)
        );
        println!(
            "Authority balance: {}",
            format_amount(authority_balance, config.decimals)
        );
        Ok(())
    }
}

fn handle_gatekeeper_init(ctx: &AppContext) -> Result<()> {
    let authority = ctx.payer.pubkey();
    let gatekeeper_pda = find_gatekeeper_pda(&authority);
    let ix = build_gatekeeper_initialize_instruction(authority);
    let signature = send_transaction(ctx, vec![ix], vec![])?;
    let explorer = explorer_url(&signature, &ctx.cluster);

    if ctx.output == OutputFormat::Json {
        print_json(&GatekeeperInitOutput {
            gatekeeper: gatekeeper_pda.to_string(),
            signature,
            explorer,
        })
    } else {
        println!("Gatekeeper initialized");
        println!("Gatekeeper: {}", gatekeeper_pda);
        println!("Tx:         {}", signature);
        if let Some(url) = explorer {
            println!("Explorer:   {}", url);
        }
        Ok(())
    }
}

fn handle_ban(
    ctx: &AppContext,
    args: &CodeHashArgs,
    config: Option<&GatekeeperFileConfig>,
    unban: bool,
) -> Result<()> {
    let code_hash = resolve_code_hash(args)?;
    if !unban {
        require_bannable(&code_hash)?;
    }
    let gatekeeper_pda = resolve_gatekeeper(ctx, args.authority.as_deref(), config)?;
    let ix = build_update_ban_instruction(UpdateBanParams {
        authority: ctx.payer.pubkey(),
        gatekeeper_pda,
        code_hash,
        unban,
    })?;
    let signature = send_transaction(ctx, vec![ix], vec![])?;
    let explorer = explorer_url(&signature, &ctx.cluster);

    if ctx.output == OutputFormat::Json {
        print_json(&SimpleOutput { signature, explorer })
    } else {
        let verb = if unban { "Unbanned" } else { "Banned" };
        println!("{} code hash {}", verb, hex::encode(code_hash));
        println!("Tx: {}", signature);
        if let Some(url) = explorer {
            println!("Explorer: {}", url);
        }
        Ok(())
    }
}

fn handle_ban_check(
    ctx: &AppContext,
    args: &CodeHashArgs,
    config: Option<&GatekeeperFileConfig>,
) -> Result<()> {
    let code_hash = resolve_code_hash(args)?;
    let gatekeeper_pda = resolve_gatekeeper(ctx, args.authority.as_deref(), config)?;
    let record = fetch_ban_record(ctx, &find_ban_pda(&gatekeeper_pda, &code_hash))?;
    let is_banned = record.as_ref().is_some_and(BannedCodeHash::is_banned);

    if ctx.output == OutputFormat::Json {
        print_json(&BanStatusOutput {
            code_hash: hex::encode(code_hash),
            is_banned,
        })
    } else {
        println!("Code hash: {}", hex::encode(code_hash));
        println!("Banned:    {}", is_banned);
        Ok(())
    }
}

fn handle_install(
    ctx: &AppContext,
    args: &InstallArgs,
    config: Option<&GatekeeperFileConfig>,
) -> Result<()> {
    let code = read_code(&args.file)?;
    if code.len() > MAX_INLINE_CODE_LEN {
        return Err(anyhow!(
            "Code is {} bytes; at most {} bytes fit in one transaction",
            code.len(),
            MAX_INLINE_CODE_LEN
        ));
    }
    let code_hash = hash_code(&code);
    let gatekeeper_pda = resolve_gatekeeper(ctx, args.authority.as_deref(), config)?;
    let gatekeeper = fetch_gatekeeper(ctx, &gatekeeper_pda)?;
    if gatekeeper.state == PauseState::Paused {
        return Err(anyhow!("Deployments are paused"));
    }
    let deployment = find_deployment_pda(&gatekeeper_pda, gatekeeper.deployments);

    let ix = build_install_instruction(InstallParams {
        deployer: ctx.payer.pubkey(),
        gatekeeper_pda,
        ban_record: find_ban_pda(&gatekeeper_pda, &code_hash),
        deployment,
        code,
    })?;
    let signature = send_transaction(ctx, vec![ix], vec![])?;
    let explorer = explorer_url(&signature, &ctx.cluster);

    if ctx.output == OutputFormat::Json {
        print_json(&InstallOutput {
            deployment: deployment.to_string(),
            code_hash: hex::encode(code_hash),
            signature,
            explorer,
        })
    } else {
        println!("Code installed");
        println!("Deployment: {}", deployment);
        println!("Code hash:  {}", hex::encode(code_hash));
        println!("Tx:         {}", signature);
        if let Some(url) = explorer {
            println!("Explorer:   {}", url);
        }
        Ok(())
    }
}

fn handle_pause(ctx: &AppContext, unpause: bool) -> Result<()> {
    let authority = ctx.payer.pubkey();
    let gatekeeper_pda = find_gatekeeper_pda(&authority);
    let ix = build_pause_instruction(authority, gatekeeper_pda, unpause);
    let signature = send_transaction(ctx, vec![ix], vec![])?;
    let explorer = explorer_url(&signature, &ctx.cluster);

    if ctx.output == OutputFormat::Json {
        print_json(&SimpleOutput { signature, explorer })
    } else {
        if unpause {
            println!("Deployments unpaused");
        } else {
            println!("Deployments paused");
        }
        println!("Gatekeeper: {}", gatekeeper_pda);
        println!("Tx: {}", signature);
        if let Some(url) = explorer {
            println!("Explorer: {}", url);
        }
        Ok(())
    }
}

fn handle_gatekeeper_status(
    ctx: &AppContext,
    authority: Option<&str>,
    config: Option<&GatekeeperFileConfig>,
) -> Result<()> {
    let gatekeeper_pda = resolve_gatekeeper(ctx, authority, config)?;
    let gatekeeper = fetch_gatekeeper(ctx, &gatekeeper_pda)?;
    let state = pause_state_label(gatekeeper.state);

    if ctx.output == OutputFormat::Json {
        print_json(&GatekeeperStatusOutput {
            gatekeeper: gatekeeper_pda.to_string(),
            authority: gatekeeper.authority.to_string(),
            state: state.to_string(),
            deployments: gatekeeper.deployments,
        })
    } else {
        println!("Gatekeeper:  {}", gatekeeper_pda);
        println!("Authority:   {}", gatekeeper.authority);
        println!("State:       {}", state);
        println!("Deployments: {}", gatekeeper.deployments);
        Ok(())
    }
}

fn handle_hash(output: OutputFormat, args: &HashArgs) -> Result<()> {
    let code = read_code(&args.file)?;
    let code_hash = hex::encode(hash_code(&code));
    if output == OutputFormat::Json {
        print_json(&HashOutput {
            code_hash,
            length: code.len(),
        })
    } else {
        println!("{}", code_hash);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProjectConfig {
    network: Option<NetworkConfig>,
    ledger: Option<LedgerFileConfig>,
    gatekeeper: Option<GatekeeperFileConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct NetworkConfig {
    cluster: Option<String>,
    keypair_path: Option<String>,
    commitment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LedgerFileConfig {
    name: String,
    symbol: String,
    decimals: Option<u8>,
    initial_supply: String,
    max_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GatekeeperFileConfig {
    authority: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SolanaCliConfig {
    json_rpc_url: String,
    keypair_path: String,
    commitment: Option<String>,
}

fn load_project_config(path: &str) -> Result<ProjectConfig> {
    let contents = fs::read_to_string(expand_tilde(path))
        .with_context(|| format!("Failed to read config: {}", path))?;
    parse_project_config(&contents)
}

fn parse_project_config(contents: &str) -> Result<ProjectConfig> {
    toml::from_str(contents).context("Failed to parse config")
}

fn load_solana_cli_config() -> Result<SolanaCliConfig> {
    let path = default_solana_config_path();
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read Solana config: {}", path.display()))?;
    serde_yaml::from_str(&contents).context("Failed to parse Solana config")
}

fn default_solana_config_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("solana");
    path.push("cli");
    path.push("config.yml");
    path
}

fn resolve_cluster(input: &str) -> Result<ClusterInfo> {
    let lowered = input.to_lowercase();
    let (url, label) = match lowered.as_str() {
        "devnet" => (
            "https://api.devnet.solana.com".to_string(),
            Some("devnet".to_string()),
        ),
        "testnet" => (
            "https://api.testnet.solana.com".to_string(),
            Some("testnet".to_string()),
        ),
        "mainnet" | "mainnet-beta" => (
            "https://api.mainnet-beta.solana.com".to_string(),
            Some("mainnet-beta".to_string()),
        ),
        "localnet" => ("http://127.0.0.1:8899".to_string(), None),
        _ => {
            if input.starts_with("http://") || input.starts_with("https://") {
                let label = if lowered.contains("devnet") {
                    Some("devnet".to_string())
                } else if lowered.contains("testnet") {
                    Some("testnet".to_string())
                } else if lowered.contains("mainnet") {
                    Some("mainnet-beta".to_string())
                } else {
                    None
                };
                (input.to_string(), label)
            } else {
                return Err(anyhow!("Unknown cluster: {}", input));
            }
        }
    };
    Ok(ClusterInfo { url, label })
}

fn parse_commitment(value: Option<&str>) -> CommitmentConfig {
    match value.unwrap_or("confirmed") {
        "processed" => CommitmentConfig::processed(),
        "finalized" => CommitmentConfig::finalized(),
        _ => CommitmentConfig::confirmed(),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn parse_pubkey(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|_| anyhow!("Invalid pubkey: {}", value))
}

fn resolve_mint(mint: &Option<String>) -> Result<Pubkey> {
    let value = mint.as_deref().ok_or_else(|| anyhow!("Missing --mint"))?;
    parse_pubkey(value)
}

fn resolve_gatekeeper(
    ctx: &AppContext,
    authority: Option<&str>,
    config: Option<&GatekeeperFileConfig>,
) -> Result<Pubkey> {
    let authority = match authority.or_else(|| config.and_then(|cfg| cfg.authority.as_deref())) {
        Some(value) => parse_pubkey(value)?,
        None => ctx.payer.pubkey(),
    };
    Ok(find_gatekeeper_pda(&authority))
}

fn resolve_code_hash(args: &CodeHashArgs) -> Result<[u8; 32]> {
    match (&args.hash, &args.file) {
        (_, Some(path)) => Ok(hash_code(&read_code(path)?)),
        (Some(value), None) => parse_code_hash(value),
        (None, None) => Err(anyhow!("Provide a code hash or --file")),
    }
}

fn parse_code_hash(value: &str) -> Result<[u8; 32]> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(trimmed).with_context(|| format!("Invalid hex: {}", value))?;
    let hash: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow!("Code hash must be 32 bytes"))?;
    Ok(hash)
}

fn require_bannable(code_hash: &[u8; 32]) -> Result<()> {
    if *code_hash == [0u8; 32] {
        return Err(anyhow!("Cannot ban the empty code hash"));
    }
    Ok(())
}

fn read_code(path: &str) -> Result<Vec<u8>> {
    let code =
        fs::read(expand_tilde(path)).with_context(|| format!("Failed to read code: {}", path))?;
    if code.is_empty() {
        return Err(anyhow!("Empty code: {}", path));
    }
    Ok(code)
}

fn hash_code(code: &[u8]) -> [u8; 32] {
    keccak::hash(code).to_bytes()
}

fn pause_state_label(state: PauseState) -> &'static str {
    match state {
        PauseState::Active => "active",
        PauseState::Paused => "paused",
    }
}

fn parse_amount(value: &str, decimals: u8) -> Result<u64> {
    let sanitized = value.replace('_', "");
    if let Some((whole, fractional)) = sanitized.split_once('.') {
        let whole_value: u64 = if whole.is_empty() { 0 } else { whole.parse()? };
        let mut fraction = fractional.to_string();
        if fraction.len() > decimals as usize {
            return Err(anyhow!("Too many decimal places"));
        }
        while fraction.len() < decimals as usize {
            fraction.push('0');
        }
        let fractional_value: u64 = if fraction.is_empty() {
            0
        } else {
            fraction.parse()?
        };
        let scale = 10u64
            .checked_pow(decimals as u32)
            .ok_or_else(|| anyhow!("Decimal overflow"))?;
        whole_value
            .checked_mul(scale)
            .and_then(|value| value.checked_add(fractional_value))
            .ok_or_else(|| anyhow!("Amount overflow"))
    } else {
        let whole_value: u64 = sanitized.parse()?;
        let scale = 10u64
            .checked_pow(decimals as u32)
            .ok_or_else(|| anyhow!("Decimal overflow"))?;
        whole_value
            .checked_mul(scale)
            .ok_or_else(|| anyhow!("Amount overflow"))
    }
}

fn format_amount(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u64.pow(decimals as u32);
    let whole = amount / scale;
    let frac = amount % scale;
    format!("{}.{:0width$}", whole, frac, width = decimals as usize)
}

fn explorer_url(signature: &str, cluster: &ClusterInfo) -> Option<String> {
    cluster.label.as_ref().map(|label| {
        format!(
            "https://explorer.solana.com/tx/{}?cluster={}",
            signature, label
        )
    })
}

fn send_transaction(
    ctx: &AppContext,
    instructions: Vec<Instruction>,
    extra_signers: Vec<&Keypair>,
) -> Result<String> {
    let blockhash = ctx.client.get_latest_blockhash()?;
    let mut transaction = Transaction::new_with_payer(&instructions, Some(&ctx.payer.pubkey()));
    let mut signers: Vec<&dyn Signer> = vec![&ctx.payer];
    for signer in extra_signers {
        if signer.pubkey() != ctx.payer.pubkey() {
            signers.push(signer);
        }
    }
    transaction.sign(&signers, blockhash);
    let signature = ctx.client.send_and_confirm_transaction(&transaction)?;
    Ok(signature.to_string())
}

fn fetch_optional<T: AccountDeserialize>(ctx: &AppContext, address: &Pubkey) -> Result<Option<T>> {
    let account = match ctx.client.get_account(address) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let mut data = account.data.as_slice();
    let decoded = T::try_deserialize(&mut data)
        .map_err(|err| anyhow!("Failed to decode {}: {}", address, err))?;
    Ok(Some(decoded))
}

fn fetch_ledger_config(ctx: &AppContext, config_pda: &Pubkey) -> Result<LedgerConfig> {
    fetch_optional(ctx, config_pda)?
        .ok_or_else(|| anyhow!("Ledger config not found: {}", config_pda))
}

fn fetch_blacklist_entry(ctx: &AppContext, entry_pda: &Pubkey) -> Result<Option<BlacklistEntry>> {
    fetch_optional(ctx, entry_pda)
}

fn fetch_gatekeeper(ctx: &AppContext, gatekeeper_pda: &Pubkey) -> Result<Gatekeeper> {
    fetch_optional(ctx, gatekeeper_pda)?
        .ok_or_else(|| anyhow!("Gatekeeper not found: {}", gatekeeper_pda))
}

fn fetch_ban_record(ctx: &AppContext, ban_pda: &Pubkey) -> Result<Option<BannedCodeHash>> {
    fetch_optional(ctx, ban_pda)
}

fn fetch_token_balance(ctx: &AppContext, address: &Pubkey) -> Result<u64> {
    let account = ctx.client.get_account(address)?;
    let parsed = StateWithExtensions::<TokenAccount2022>::unpack(&account.data)
        .map_err(|err| anyhow!("Failed to decode token account: {}", err))?;
    Ok(parsed.base.amount)
}

fn find_ledger_config_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[LEDGER_SEED, mint.as_ref()], &asset_ledger::ID).0
}

fn find_blacklist_pda(config: &Pubkey, account: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[BLACKLIST_SEED, config.as_ref(), account.as_ref()],
        &asset_ledger::ID,
    )
    .0
}

fn find_extra_account_metas_pda(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[transfer_gate::EXTRA_ACCOUNT_METAS_SEED, mint.as_ref()],
        &transfer_gate::ID,
    )
    .0
}

fn find_gatekeeper_pda(authority: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[GATEKEEPER_SEED, authority.as_ref()], &deploy_gate::ID).0
}

fn find_ban_pda(gatekeeper: &Pubkey, code_hash: &[u8; 32]) -> Pubkey {
    Pubkey::find_program_address(
        &[BANNED_SEED, gatekeeper.as_ref(), code_hash.as_ref()],
        &deploy_gate::ID,
    )
    .0
}

fn find_deployment_pda(gatekeeper: &Pubkey, index: u64) -> Pubkey {
    Pubkey::find_program_address(
        &[DEPLOYMENT_SEED, gatekeeper.as_ref(), &index.to_le_bytes()],
        &deploy_gate::ID,
    )
    .0
}

fn anchor_discriminator(name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("global:{}", name));
    let hash = hasher.finalize();
    let mut output = [0u8; 8];
    output.copy_from_slice(&hash[..8]);
    output
}

fn build_instruction(
    name: &str,
    data: Vec<u8>,
    accounts: Vec<AccountMeta>,
    program_id: Pubkey,
) -> Instruction {
    let mut payload = Vec::with_capacity(8 + data.len());
    payload.extend_from_slice(&anchor_discriminator(name));
    payload.extend_from_slice(&data);
    Instruction {
        program_id,
        accounts,
        data: payload,
    }
}

#[derive(BorshSerialize)]
struct InitializeArgs {
    name: String,
    symbol: String,
    decimals: u8,
    initial_supply: u64,
    max_amount: u64,
}

#[derive(BorshSerialize)]
struct SetBlacklistedArgs {
    account: Pubkey,
    is_blacklisted: bool,
}

struct LedgerInitializeParams {
    authority: Pubkey,
    mint: Pubkey,
    config_pda: Pubkey,
    authority_ata: Pubkey,
    name: String,
    symbol: String,
    decimals: u8,
    initial_supply: u64,
    max_amount: u64,
}

fn build_ledger_initialize_instruction(params: LedgerInitializeParams) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(params.authority, true),
        AccountMeta::new(params.mint, true),
        AccountMeta::new(params.config_pda, false),
        AccountMeta::new(params.authority_ata, false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = InitializeArgs {
        name: params.name,
        symbol: params.symbol,
        decimals: params.decimals,
        initial_supply: params.initial_supply,
        max_amount: params.max_amount,
    }
    .try_to_vec()?;
    Ok(build_instruction(
        "initialize",
        data,
        accounts,
        asset_ledger::ID,
    ))
}

fn build_extra_metas_instruction(payer: Pubkey, mint: Pubkey) -> Instruction {
    let accounts = vec![
        AccountMeta::new(payer, true),
        AccountMeta::new(find_extra_account_metas_pda(&mint), false),
        AccountMeta::new_readonly(mint, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    build_instruction(
        "initialize_extra_account_meta_list",
        Vec::new(),
        accounts,
        transfer_gate::ID,
    )
}

fn build_set_blacklisted_instruction(
    authority: Pubkey,
    config_pda: Pubkey,
    account: Pubkey,
    is_blacklisted: bool,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(authority, true),
        AccountMeta::new_readonly(config_pda, false),
        AccountMeta::new(find_blacklist_pda(&config_pda, &account), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = SetBlacklistedArgs {
        account,
        is_blacklisted,
    }
    .try_to_vec()?;
    Ok(build_instruction(
        "set_blacklisted",
        data,
        accounts,
        asset_ledger::ID,
    ))
}

fn build_set_max_amount_instruction(
    authority: Pubkey,
    config_pda: Pubkey,
    new_max_amount: u64,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new_readonly(authority, true),
        AccountMeta::new(config_pda, false),
    ];
    Ok(build_instruction(
        "set_max_amount",
        new_max_amount.try_to_vec()?,
        accounts,
        asset_ledger::ID,
    ))
}

struct GatedTransferParams {
    mint: Pubkey,
    config_pda: Pubkey,
    sender: Pubkey,
    recipient: Pubkey,
    amount: u64,
    decimals: u8,
}

/// `transfer_checked` with the accounts the transfer gate resolves appended.
fn build_gated_transfer_instruction(params: GatedTransferParams) -> Result<Instruction> {
    let token_program = spl_token_2022::id();
    let source_ata =
        get_associated_token_address_with_program_id(&params.sender, &params.mint, &token_program);
    let destination_ata = get_associated_token_address_with_program_id(
        &params.recipient,
        &params.mint,
        &token_program,
    );
    let mut ix = spl_token_2022::instruction::transfer_checked(
        &token_program,
        &source_ata,
        &params.mint,
        &destination_ata,
        &params.sender,
        &[],
        params.amount,
        params.decimals,
    )?;
    ix.accounts.extend([
        AccountMeta::new_readonly(find_extra_account_metas_pda(&params.mint), false),
        AccountMeta::new_readonly(asset_ledger::ID, false),
        AccountMeta::new_readonly(params.config_pda, false),
        AccountMeta::new_readonly(find_blacklist_pda(&params.config_pda, &params.sender), false),
        AccountMeta::new_readonly(
            find_blacklist_pda(&params.config_pda, &params.recipient),
            false,
        ),
        AccountMeta::new_readonly(transfer_gate::ID, false),
    ]);
    Ok(ix)
}

fn build_gatekeeper_initialize_instruction(authority: Pubkey) -> Instruction {
    let accounts = vec![
        AccountMeta::new(authority, true),
        AccountMeta::new(find_gatekeeper_pda(&authority), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    build_instruction("initialize", Vec::new(), accounts, deploy_gate::ID)
}

fn build_pause_instruction(authority: Pubkey, gatekeeper_pda: Pubkey, unpause: bool) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(authority, true),
        AccountMeta::new(gatekeeper_pda, false),
    ];
    let name = if unpause { "unpause" } else { "pause" };
    build_instruction(name, Vec::new(), accounts, deploy_gate::ID)
}

struct UpdateBanParams {
    authority: Pubkey,
    gatekeeper_pda: Pubkey,
    code_hash: [u8; 32],
    unban: bool,
}

fn build_update_ban_instruction(params: UpdateBanParams) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(params.authority, true),
        AccountMeta::new_readonly(params.gatekeeper_pda, false),
        AccountMeta::new(find_ban_pda(&params.gatekeeper_pda, &params.code_hash), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let name = if params.unban {
        "unban_code_hash"
    } else {
        "ban_code_hash"
    };
    Ok(build_instruction(
        name,
        params.code_hash.try_to_vec()?,
        accounts,
        deploy_gate::ID,
    ))
}

struct InstallParams {
    deployer: Pubkey,
    gatekeeper_pda: Pubkey,
    ban_record: Pubkey,
    deployment: Pubkey,
    code: Vec<u8>,
}

fn build_install_instruction(params: InstallParams) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(params.deployer, true),
        AccountMeta::new(params.gatekeeper_pda, false),
        AccountMeta::new_readonly(params.ban_record, false),
        AccountMeta::new(params.deployment, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    Ok(build_instruction(
        "install",
        params.code.try_to_vec()?,
        accounts,
        deploy_gate::ID,
    ))
}

#[derive(Serialize)]
struct LedgerInitOutput {
    mint: String,
    config: String,
    initial_supply: String,
    max_amount: String,
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct SimpleOutput {
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct BlacklistStatusOutput {
    account: String,
    is_blacklisted: bool,
    updated_by: Option<String>,
}

#[derive(Serialize)]
struct LedgerStatusOutput {
    mint: String,
    authority: String,
    name: String,
    symbol: String,
    decimals: u8,
    supply: String,
    max_amount: String,
    authority_balance: String,
}

#[derive(Serialize)]
struct GatekeeperInitOutput {
    gatekeeper: String,
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct BanStatusOutput {
    code_hash: String,
    is_banned: bool,
}

#[derive(Serialize)]
struct InstallOutput {
    deployment: String,
    code_hash: String,
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct GatekeeperStatusOutput {
    gatekeeper: String,
    authority: String,
    state: String,
    deployments: u64,
}

#[derive(Serialize)]
struct HashOutput {
    code_hash: String,
    length: usize,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
