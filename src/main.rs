//! LZ Vault Client
//!
//! Command line front end for vault deposits routed through a LayerZero OApp.
//!
//! ## Usage
//!
//! ```bash
//! lz-vault-client deposit --mint <MINT> --amount 1000000 --dst-eid 40245 \
//!     --dst-token 0xA0b8...eB48 --merchant 0x742d...bEb0 --native-fee 5000000
//! lz-vault-client derive-pdas --json
//! lz-vault-client check-peer --dst-eid 40245
//! lz-vault-client lp-deposit --mint <MINT> --amount 1000000 --create-atas
//! lz-vault-client init-vault --allowed-caller <OAPP_SIGNER> --mints <USDC>,<USDT> --create-atas
//! lz-vault-client set-allowed-caller --new-allowed <OAPP_SIGNER>
//! ```
//!
//! The config path comes from `--config`, then `LZ_VAULT_CLIENT_CONFIG_PATH`,
//! then `config/lz-vault-client.toml`. The RPC endpoint comes from `--rpc`,
//! then `ANCHOR_PROVIDER_URL`, then `network.rpc_url`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lz_vault_client::{
    address::unpad_evm_address,
    config::Config,
    instruction::{
        CrossChainDepositRequest, DepositInstruction, FeeOverrides, InstructionAssembler,
    },
    keys::{load_keypair, payer_keypair_path},
    pda::{
        derive_family,
        seeds::{AccountFamily, SeedInputs},
        DerivedAccount, ProgramSet,
    },
    peer::PeerBindingVerifier,
    resolver::{ChainAccountResolver, OAppAccounts, SendLibraryAccounts, VaultAccounts},
    svm_client::{SvmClient, TransactionSubmitter},
    token::{associated_token_address, create_associated_token_account_idempotent},
};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lz-vault-client")]
#[command(about = "Resolve, verify and submit vault deposits routed through a LayerZero OApp")]
struct Cli {
    /// Path to configuration file (default: config/lz-vault-client.toml or LZ_VAULT_CLIENT_CONFIG_PATH env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// RPC endpoint, overrides ANCHOR_PROVIDER_URL and network.rpc_url
    #[arg(long, global = true)]
    rpc: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deposit tokens into the vault for settlement on a destination chain
    Deposit(DepositArgs),
    /// Print the vault (and optionally OApp/endpoint) PDAs with their bumps
    DerivePdas(DerivePdasArgs),
    /// Compare the on-chain peer record for a destination with its derived address
    CheckPeer(CheckPeerArgs),
    /// Provide liquidity to the vault
    LpDeposit(LpDepositArgs),
    /// Create the vault config and the vault token accounts for its mints
    InitVault(InitVaultArgs),
    /// Replace the caller allowed to invoke deposit_from_user (admin only)
    SetAllowedCaller(SetAllowedCallerArgs),
}

#[derive(Args, Debug)]
struct DepositArgs {
    /// Vault program id; must match the configured one when a config file is loaded
    #[arg(long)]
    program: Option<String>,
    #[arg(long)]
    mint: String,
    /// Amount in base units
    #[arg(long)]
    amount: u64,
    /// Destination LayerZero endpoint id
    #[arg(long)]
    dst_eid: u32,
    /// Destination token, 20-byte EVM address
    #[arg(long, value_name = "0x...")]
    dst_token: String,
    /// Destination merchant, 20-byte EVM address
    #[arg(long, value_name = "0x...")]
    merchant: String,
    #[arg(long)]
    native_fee: Option<u64>,
    #[arg(long)]
    lz_token_fee: Option<u64>,
    /// Key file of the depositing user (default: the payer)
    #[arg(long)]
    user: Option<String>,
    /// Payer key file, overrides ANCHOR_WALLET and keys.payer_keypair_path
    #[arg(long)]
    payer: Option<String>,
    /// Resolve and assemble only, do not submit
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct DerivePdasArgs {
    #[arg(long)]
    program: Option<String>,
    /// Participant for the LiquidityPosition PDA (requires --mint)
    #[arg(long, requires = "mint")]
    user: Option<String>,
    #[arg(long)]
    mint: Option<String>,
    /// Also print the OApp and endpoint PDAs for this destination
    #[arg(long)]
    dst_eid: Option<u32>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CheckPeerArgs {
    #[arg(long)]
    program: Option<String>,
    #[arg(long)]
    dst_eid: u32,
    /// Read the record from this account instead of the derived peer PDA
    #[arg(long)]
    address: Option<String>,
}

#[derive(Args, Debug)]
struct LpDepositArgs {
    #[arg(long)]
    program: Option<String>,
    #[arg(long)]
    mint: String,
    #[arg(long)]
    amount: u64,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    payer: Option<String>,
    /// Create the user and vault token accounts first if they are missing
    #[arg(long)]
    create_atas: bool,
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct InitVaultArgs {
    #[arg(long)]
    program: Option<String>,
    /// Signer allowed to call deposit_from_user, usually the OApp's PDA
    #[arg(long)]
    allowed_caller: String,
    /// One to three mint addresses, comma separated; duplicates are dropped
    #[arg(long, value_delimiter = ',', required = true)]
    mints: Vec<String>,
    /// Create the vault token account for each mint if it is missing
    #[arg(long, visible_alias = "send-atas")]
    create_atas: bool,
    #[arg(long)]
    payer: Option<String>,
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct SetAllowedCallerArgs {
    #[arg(long)]
    program: Option<String>,
    /// The new allowed caller
    #[arg(long)]
    new_allowed: String,
    /// Admin key file, overrides ANCHOR_WALLET and keys.payer_keypair_path
    #[arg(long)]
    payer: Option<String>,
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments first (before initializing logging)
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load_from_path(cli.config.as_deref())?;
    match &config.source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file found, using built-in defaults"),
    }
    config.apply_rpc_override(cli.rpc.as_deref());

    match cli.command {
        Command::Deposit(args) => deposit(config, args).await,
        Command::DerivePdas(args) => derive_pdas(config, args),
        Command::CheckPeer(args) => check_peer(config, args).await,
        Command::LpDeposit(args) => lp_deposit(config, args).await,
        Command::InitVault(args) => init_vault(config, args).await,
        Command::SetAllowedCaller(args) => set_allowed_caller(config, args).await,
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

async fn deposit(mut config: Config, args: DepositArgs) -> Result<()> {
    config.apply_program_override(args.program.as_deref())?;
    let programs = config.program_set()?;
    let mint = parse_pubkey("--mint", &args.mint)?;

    // Reject bad input before touching the network.
    let fees = config.fee_policy().resolve(FeeOverrides {
        native_fee: args.native_fee,
        lz_token_fee: args.lz_token_fee,
    })?;
    let request = CrossChainDepositRequest::new(
        args.amount,
        args.dst_eid,
        &args.dst_token,
        &args.merchant,
        fees,
    )?;

    let (payer, user) = load_signers(&config, args.payer.as_deref(), args.user.as_deref())?;
    let user = user.as_ref().unwrap_or(&payer);

    let resolver = build_resolver(&config, programs)?;
    let (_, ix) = resolver
        .prepare_deposit(&user.pubkey(), &mint, &request)
        .await?;

    print_deposit(&ix);
    if args.dry_run {
        println!("Dry run: transaction not submitted");
        return Ok(());
    }

    let submitter = TransactionSubmitter::new(&config.network.rpc_url, config.commitment()?);
    let signature = submitter
        .submit(&[ix.to_instruction()], &payer, &[user])
        .await
        .context("Deposit transaction failed")?;
    println!("Deposit submitted: {}", signature);
    Ok(())
}

fn derive_pdas(mut config: Config, args: DerivePdasArgs) -> Result<()> {
    config.apply_program_override(args.program.as_deref())?;
    let programs = config.program_set()?;

    let vault = VaultAccounts::derive(&programs)?;
    let mut accounts = vec![vault.config, vault.vault_authority];

    if let (Some(user), Some(mint)) = (&args.user, &args.mint) {
        let inputs = SeedInputs::new()
            .with_participant(parse_pubkey("--user", user)?)
            .with_mint(parse_pubkey("--mint", mint)?);
        accounts.push(derive_family(AccountFamily::LiquidityPosition, &programs, &inputs)?);
    }

    if let Some(dst_eid) = args.dst_eid {
        let oapp = OAppAccounts::derive(&programs, dst_eid)?;
        let send_library = SendLibraryAccounts::derive(&programs, &oapp)?;
        accounts.extend([
            oapp.store,
            oapp.peer,
            send_library.send_library_config,
            send_library.default_send_library_config,
            send_library.message_lib_info,
        ]);
    }

    if args.json {
        let entries: Vec<_> = accounts
            .iter()
            .map(|a| {
                serde_json::json!({
                    "family": a.family.name(),
                    "program": a.program.to_string(),
                    "address": a.address.to_string(),
                    "bump": a.bump,
                    "seeds": a.seeds.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_programs(&programs);
        for account in &accounts {
            print_derived(account);
        }
    }
    Ok(())
}

async fn check_peer(mut config: Config, args: CheckPeerArgs) -> Result<()> {
    config.apply_program_override(args.program.as_deref())?;
    let programs = config.program_set()?;
    let resolver = build_resolver(&config, programs)?;

    let oapp = OAppAccounts::derive(&programs, args.dst_eid)?;
    let observed = match &args.address {
        Some(address) => parse_pubkey("--address", address)?,
        None => oapp.peer.address,
    };
    let record = resolver.fetch_peer_record_at(&oapp.peer, observed).await?;

    println!("Peer for dst_eid {}", args.dst_eid);
    print_derived(&oapp.store);
    print_derived(&oapp.peer);
    if observed != oapp.peer.address {
        println!("  Record read from {}", observed);
    }
    println!("  Tag:           0x{}", hex::encode(record.tag));
    println!("  Peer address:  0x{}", hex::encode(record.peer_address));
    match unpad_evm_address(&record.peer_address) {
        Ok(evm) => println!("  As EVM:        0x{}", hex::encode(evm)),
        Err(_) => println!(
            "  As base58:     {}",
            bs58::encode(record.peer_address).into_string()
        ),
    }
    println!("  Options:       {} bytes", record.enforced_options.len());
    println!("  Stored bump:   {}", record.bump);
    println!("  Derived bump:  {}", oapp.peer.bump);

    match PeerBindingVerifier::verify(&oapp.peer, &observed, record.bump) {
        Ok(()) => {
            println!("  Status:        OK");
            Ok(())
        }
        Err(e) => {
            println!("  Status:        MISMATCH");
            Err(e.into())
        }
    }
}

async fn lp_deposit(mut config: Config, args: LpDepositArgs) -> Result<()> {
    config.apply_program_override(args.program.as_deref())?;
    let programs = config.program_set()?;
    let (payer, user) = load_signers(&config, args.payer.as_deref(), args.user.as_deref())?;
    let user = user.as_ref().unwrap_or(&payer);

    let resolver = build_resolver(&config, programs)?;
    let mint = parse_pubkey("--mint", &args.mint)?;
    let token_program = resolver.detect_token_program(&mint).await?;
    let resolved = resolver.resolve_lp(&user.pubkey(), &mint, token_program)?;

    let mut instructions = Vec::new();
    if args.create_atas {
        let owners = [
            (resolved.user, resolved.tokens.user_token),
            (
                resolved.vault.vault_authority.address,
                resolved.tokens.vault_token,
            ),
        ];
        for (owner, ata) in owners {
            if resolver.fetcher().get_account(&ata).await?.is_none() {
                info!("Token account {} for owner {} is missing, creating it", ata, owner);
                instructions.push(create_associated_token_account_idempotent(
                    &payer.pubkey(),
                    &owner,
                    &mint,
                    token_program,
                )?);
            }
        }
    }
    instructions.push(InstructionAssembler::assemble_lp_deposit(&resolved, args.amount)?);

    print_derived(&resolved.liquidity_position);
    for ix in &instructions {
        print_instruction(ix);
    }
    if args.dry_run {
        println!("Dry run: transaction not submitted");
        return Ok(());
    }

    let submitter = TransactionSubmitter::new(&config.network.rpc_url, config.commitment()?);
    let signature = submitter
        .submit(&instructions, &payer, &[user])
        .await
        .context("LP deposit transaction failed")?;
    println!("LP deposit submitted: {}", signature);
    Ok(())
}

async fn init_vault(mut config: Config, args: InitVaultArgs) -> Result<()> {
    config.apply_program_override(args.program.as_deref())?;
    let programs = config.program_set()?;
    let allowed_caller = parse_pubkey("--allowed-caller", &args.allowed_caller)?;
    let mut mints: Vec<Pubkey> = Vec::with_capacity(args.mints.len());
    for value in &args.mints {
        let mint = parse_pubkey("--mints", value.trim())?;
        if !mints.contains(&mint) {
            mints.push(mint);
        }
    }

    let (payer, _) = load_signers(&config, args.payer.as_deref(), None)?;
    let vault = VaultAccounts::derive(&programs)?;
    let initialize = InstructionAssembler::assemble_initialize(
        &programs.vault,
        &vault,
        &payer.pubkey(),
        &allowed_caller,
        &mints,
    )?;

    print_programs(&programs);
    print_derived(&vault.config);
    print_derived(&vault.vault_authority);

    let resolver = build_resolver(&config, programs)?;
    let mut instructions = Vec::new();
    if resolver.fetcher().get_account(&vault.config.address).await?.is_some() {
        info!("Vault config {} already exists, skipping initialize", vault.config.address);
    } else {
        instructions.push(initialize);
    }

    for mint in &mints {
        let token_program = resolver.detect_token_program(mint).await?;
        let vault_token =
            associated_token_address(&vault.vault_authority.address, mint, token_program)?;
        println!("  Vault token account for {}: {}", mint, vault_token);
        if !args.create_atas {
            continue;
        }
        if resolver.fetcher().get_account(&vault_token).await?.is_none() {
            info!("Vault token account {} is missing, creating it", vault_token);
            instructions.push(create_associated_token_account_idempotent(
                &payer.pubkey(),
                &vault.vault_authority.address,
                mint,
                token_program,
            )?);
        }
    }

    if instructions.is_empty() {
        println!("Nothing to do: vault is initialized");
        return Ok(());
    }
    for ix in &instructions {
        print_instruction(ix);
    }
    if args.dry_run {
        println!("Dry run: transaction not submitted");
        return Ok(());
    }

    let submitter = TransactionSubmitter::new(&config.network.rpc_url, config.commitment()?);
    let signature = submitter
        .submit(&instructions, &payer, &[])
        .await
        .context("Vault initialization transaction failed")?;
    println!("Vault initialization submitted: {}", signature);
    Ok(())
}

async fn set_allowed_caller(mut config: Config, args: SetAllowedCallerArgs) -> Result<()> {
    config.apply_program_override(args.program.as_deref())?;
    let programs = config.program_set()?;
    let new_allowed = parse_pubkey("--new-allowed", &args.new_allowed)?;
    let (admin, _) = load_signers(&config, args.payer.as_deref(), None)?;

    let vault = VaultAccounts::derive(&programs)?;
    let ix = InstructionAssembler::assemble_set_allowed_caller(
        &programs.vault,
        &vault,
        &admin.pubkey(),
        &new_allowed,
    )?;

    print_derived(&vault.config);
    print_instruction(&ix);
    if args.dry_run {
        println!("Dry run: transaction not submitted");
        return Ok(());
    }

    let submitter = TransactionSubmitter::new(&config.network.rpc_url, config.commitment()?);
    let signature = submitter
        .submit(&[ix], &admin, &[])
        .await
        .context("set_allowed_caller transaction failed")?;
    println!("Allowed caller set to {}: {}", new_allowed, signature);
    Ok(())
}

// ============================================================================
// LOCAL HELPERS
// ============================================================================

fn build_resolver(
    config: &Config,
    programs: ProgramSet,
) -> Result<ChainAccountResolver<SvmClient>> {
    let client = SvmClient::new(
        &config.network.rpc_url,
        config.request_timeout(),
        &config.network.commitment,
    )?;
    info!("Using RPC {}", client.rpc_url());
    Ok(ChainAccountResolver::new(
        programs,
        client,
        config.request_timeout(),
    ))
}

/// Loads the payer and, if given, a separate user key.
fn load_signers(
    config: &Config,
    payer_flag: Option<&str>,
    user_flag: Option<&str>,
) -> Result<(Keypair, Option<Keypair>)> {
    let payer = load_keypair(&payer_keypair_path(payer_flag, &config.keys))?;
    let user = user_flag.map(load_keypair).transpose()?;
    info!("Payer: {}", payer.pubkey());
    Ok((payer, user))
}

fn parse_pubkey(flag: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value)
        .with_context(|| format!("{} '{}' is not a valid base58 address", flag, value))
}

fn print_programs(programs: &ProgramSet) {
    println!("Programs");
    println!("  Vault:         {}", programs.vault);
    println!("  OApp:          {}", programs.messaging_app);
    println!("  Endpoint:      {}", programs.endpoint);
    println!("  Send library:  {}", programs.send_library);
}

fn print_derived(account: &DerivedAccount) {
    println!(
        "  {:<26} {} (bump {}) seeds {}",
        account.family.name(),
        account.address,
        account.bump,
        account.seeds
    );
}

fn print_metas(metas: &[AccountMeta]) {
    for (i, meta) in metas.iter().enumerate() {
        println!(
            "    [{:>2}] {} {}{}",
            i,
            meta.pubkey,
            if meta.is_writable { "w" } else { "r" },
            if meta.is_signer { "s" } else { "" }
        );
    }
}

fn print_deposit(ix: &DepositInstruction) {
    println!("deposit_from_user -> {}", ix.program_id);
    println!("  Accounts:");
    print_metas(&ix.primary.to_account_metas());
    println!("  Remaining accounts:");
    print_metas(&ix.remaining.to_account_metas());
    println!("  Data: 0x{}", hex::encode(&ix.data));
}

fn print_instruction(ix: &Instruction) {
    println!("Instruction -> {}", ix.program_id);
    print_metas(&ix.accounts);
    println!("  Data: 0x{}", hex::encode(&ix.data));
}
