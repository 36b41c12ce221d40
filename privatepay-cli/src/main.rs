//! PrivatePay CLI
//!
//! Command-line interface for PrivatePay stealth payments on Mantle.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use privatepay_api::{ApiConfig, ApiServer};
use privatepay_chain::ChainClient;
use privatepay_core::config::NetworkConfig;
use privatepay_core::traits::{AnnouncementRegistry, MetaAddressDirectory};
use privatepay_core::types::{
    format_ether, parse_ether, EthAddress, MetaAddress, PaymentAnnouncement,
    RegisteredMetaAddress, SecpSecretKey,
};
use privatepay_crypto::{address_from_secret_key, generate_keypair};
use privatepay_registry::{FileRegistry, MemoryRegistry};
use privatepay_scanner::{ScanMatch, ScanProgress, ScanSummary, Scanner, ScannerConfig};
use privatepay_stealth::{
    create_stealth_payment, parse_payment_link, validate_payment_link, ParsedPaymentLink,
    PaymentLink, PrivatePayWallet, StealthAddressEngine, WalletExport,
};

/// PrivatePay - stealth payments on Mantle
#[derive(Parser)]
#[command(name = "privatepay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Mantle RPC URL (overrides PRIVATEPAY_RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new spend/viewing key set
    Generate {
        /// Derive the keys from this seed instead of the OS RNG
        #[arg(long)]
        seed: Option<String>,
        /// Output file for keys (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Derive a stealth address for a meta-address
    Create {
        /// Recipient's meta-address (hex)
        meta: String,
        /// Recipient wallet recorded in the announcement
        #[arg(long)]
        owner: Option<String>,
        /// Meta-address index recorded in the announcement
        #[arg(long, default_value = "0")]
        index: u64,
        /// Derivation index
        #[arg(long)]
        k: Option<u32>,
        /// Amount in MNT
        #[arg(long)]
        amount: Option<String>,
    },

    /// Scan announcements for payments
    Scan {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// Announcement file; scans the chain when omitted
        #[arg(short, long)]
        registry: Option<PathBuf>,
        /// First block to scan
        #[arg(long)]
        from_block: Option<u64>,
        /// Last block to scan
        #[arg(long)]
        to_block: Option<u64>,
        /// Worker threads for file scans
        #[arg(long, default_value = "1")]
        workers: usize,
    },

    /// Recover the private key of a stealth address
    Recover {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// Ephemeral public key from the announcement (hex)
        #[arg(long)]
        ephemeral: String,
        /// Derivation index from the announcement
        #[arg(long, default_value = "0")]
        k: u32,
        /// Expected stealth address; the key is checked against it
        #[arg(long)]
        address: Option<String>,
    },

    /// Create or parse payment links
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },

    /// Query the Mantle contracts
    Chain {
        #[command(subcommand)]
        command: ChainCommands,
    },

    /// Run the API server
    Serve {
        /// Port to listen on (overrides PRIVATEPAY_API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Bind address (overrides PRIVATEPAY_API_HOST)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run benchmarks
    Bench {
        /// Number of announcements to generate
        #[arg(short, long, default_value = "10000")]
        count: usize,
    },
}

#[derive(Subcommand)]
enum LinkCommands {
    /// Create a payment link for an alias
    Create {
        /// Alias the link points at
        alias: String,
        /// Wallet that owns the alias
        #[arg(long)]
        wallet: String,
        /// Meta-address of the wallet (hex)
        #[arg(long)]
        meta: String,
        /// Requested amount in MNT
        #[arg(long)]
        amount: Option<String>,
        /// Message shown to the payer
        #[arg(long)]
        message: Option<String>,
    },

    /// Parse a payment link or an ethereum: URI
    Parse {
        /// Link or URI
        input: String,
    },
}

#[derive(Subcommand)]
enum ChainCommands {
    /// Look up a registered meta-address
    Meta {
        /// Owner wallet
        owner: String,
        /// Index; the latest registration when omitted
        #[arg(long)]
        index: Option<u64>,
    },

    /// Fetch payment announcements
    Announcements {
        /// First block
        #[arg(long)]
        from_block: Option<u64>,
        /// Last block; the chain head when omitted
        #[arg(long)]
        to_block: Option<u64>,
        /// Only announcements for this recipient
        #[arg(long)]
        recipient: Option<String>,
        /// Append the announcements to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Show the balance of an address
    Balance {
        /// Address to query
        address: String,
    },

    /// Sweep a stealth address to a wallet
    Withdraw {
        /// Stealth private key (hex)
        #[arg(long, env = "PRIVATEPAY_STEALTH_KEY", hide_env_values = true)]
        key: String,
        /// Destination wallet
        #[arg(long)]
        to: String,
        /// Amount in MNT; everything minus the fee when omitted
        #[arg(long)]
        amount: Option<String>,
        /// Plan only, do not broadcast
        #[arg(long)]
        dry_run: bool,
        /// Return after broadcast without waiting for confirmations
        #[arg(long)]
        no_wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Generate { seed, output } => cmd_generate(seed.as_deref(), output.as_deref()),
        Commands::Create {
            meta,
            owner,
            index,
            k,
            amount,
        } => cmd_create(&meta, owner.as_deref(), index, k, amount.as_deref()),
        Commands::Scan {
            keys,
            registry,
            from_block,
            to_block,
            workers,
        } => {
            cmd_scan(
                &keys,
                registry.as_deref(),
                from_block,
                to_block,
                workers,
                cli.rpc_url,
            )
            .await
        }
        Commands::Recover {
            keys,
            ephemeral,
            k,
            address,
        } => cmd_recover(&keys, &ephemeral, k, address.as_deref()),
        Commands::Link { command } => cmd_link(command),
        Commands::Chain { command } => cmd_chain(command, cli.rpc_url).await,
        Commands::Serve { port, bind } => cmd_serve(port, bind, cli.rpc_url).await,
        Commands::Bench { count } => cmd_bench(count).await,
    }
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        "privatepay=debug,info"
    } else {
        "privatepay=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn network_config(rpc_url: Option<String>) -> Result<NetworkConfig> {
    let mut config = NetworkConfig::from_env().context("Invalid network configuration")?;
    if let Some(url) = rpc_url {
        config.rpc_urls = vec![url];
    }
    Ok(config)
}

fn load_wallet(path: &Path) -> Result<PrivatePayWallet> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open keys file {}", path.display()))?;
    let export: WalletExport =
        serde_json::from_reader(file).context("Keys file is not valid JSON")?;
    PrivatePayWallet::import_keys(&export).context("Keys file does not hold a valid key set")
}

fn parse_address(value: &str) -> Result<EthAddress> {
    EthAddress::from_hex(value).with_context(|| format!("Invalid address '{}'", value))
}

fn parse_amount(value: Option<&str>) -> Result<Option<u128>> {
    value
        .map(|amount| parse_ether(amount).with_context(|| format!("Invalid amount '{}'", amount)))
        .transpose()
}

/// Generate new keys
fn cmd_generate(seed: Option<&str>, output: Option<&Path>) -> Result<()> {
    println!("{}", "🔑 Generating PrivatePay keys...".cyan().bold());

    let wallet = match seed {
        Some(seed) => PrivatePayWallet::from_seed(seed.as_bytes()),
        None => PrivatePayWallet::generate(),
    }
    .context("Key generation failed")?;

    let export = wallet.export_keys();
    let keys_json = serde_json::to_string_pretty(&export)?;

    println!("   {} {}", "Spend public key:".dimmed(), wallet.spend_public_key().to_hex());
    println!("   {} {}", "Viewing public key:".dimmed(), wallet.viewing_public_key().to_hex());
    println!("   {} {}", "Meta-address:".yellow(), export.meta_address);

    if let Some(path) = output {
        std::fs::write(path, keys_json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {}", "✅ Keys saved to:".green(), path.display());
    } else {
        println!("\n{}", "Keys (JSON):".yellow().bold());
        println!("{}", keys_json);
    }

    println!("\n{}", "⚠️  IMPORTANT: Keep your secret keys safe!".red().bold());
    println!("   spend_secret_key and viewing_secret_key must never be shared.");

    Ok(())
}

/// Create a stealth payment address
fn cmd_create(
    meta: &str,
    owner: Option<&str>,
    index: u64,
    k: Option<u32>,
    amount: Option<&str>,
) -> Result<()> {
    println!("{}", "💸 Creating stealth payment...".cyan().bold());

    let meta_address = MetaAddress::from_hex(meta).context("Invalid meta-address hex")?;
    let owner = owner.map(parse_address).transpose()?.unwrap_or_else(EthAddress::zero);
    let amount = parse_amount(amount)?.unwrap_or(0);

    let engine = StealthAddressEngine::default();
    let k = k.unwrap_or(engine.params().default_k);
    let recipient = RegisteredMetaAddress {
        owner,
        index,
        meta_address,
        created_at: 0,
    };

    let payment = create_stealth_payment(&engine, &recipient, k, amount)
        .context("Failed to create stealth payment")?;

    println!("\n{}", "✅ Stealth payment created:".green().bold());
    println!("   {} {}", "Address:".yellow(), payment.stealth_address());
    println!("   {} {}", "View hint:".dimmed(), payment.derivation.view_hint);
    println!("   {} {}", "k:".dimmed(), payment.derivation.k);
    println!(
        "   {} {}",
        "Ephemeral key:".dimmed(),
        payment.derivation.ephemeral_public_key.to_hex()
    );
    if amount > 0 {
        println!("   {} {} MNT", "Amount:".dimmed(), format_ether(amount));
    }

    println!("\n{}", "📋 Announcement (JSON):".yellow().bold());
    println!("{}", serde_json::to_string_pretty(&payment.announcement)?);

    println!("\n{}", "ℹ️  Next steps:".cyan());
    println!("   1. Send funds to the stealth address above");
    println!("   2. Publish the announcement to the registry");

    Ok(())
}

/// Scan for payments
async fn cmd_scan(
    keys_path: &Path,
    registry_path: Option<&Path>,
    from_block: Option<u64>,
    to_block: Option<u64>,
    workers: usize,
    rpc_url: Option<String>,
) -> Result<()> {
    println!("{}", "🔎 Scanning for payments...".cyan().bold());

    let wallet = load_wallet(keys_path)?;
    let scanner = Scanner::from_wallet(&wallet).context("Failed to build scanner")?;

    let mut config = ScannerConfig::new().parallelism(workers.max(1));
    if let Some(from) = from_block {
        config = config.from_block(from);
    }
    config.to_block = to_block;

    let matches = match registry_path {
        Some(path) => {
            println!("   Loading registry from: {}", path.display());
            let registry = FileRegistry::new(path)
                .await
                .context("Failed to load registry file")?;
            let count = registry.len() as u64;
            if count == 0 {
                println!("\n{}", "⚠️  Registry is empty. No announcements to scan.".yellow());
                return Ok(());
            }

            if workers > 1 {
                scanner.scan_parallel(&registry, config).await?
            } else {
                let pb = ProgressBar::new(count);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                        )?
                        .progress_chars("#>-"),
                );
                let bar = pb.clone();
                let progress = Box::new(move |p: ScanProgress| {
                    bar.set_length(p.total);
                    bar.set_position(p.scanned);
                    bar.set_message(format!("{} found", p.discoveries));
                });

                let matches = scanner.scan_with_progress(&registry, config, progress).await?;
                pb.finish_with_message("done");
                matches
            }
        }
        None => {
            let network = network_config(rpc_url)?;
            println!("   Scanning {} via {}", network.chain_name, network.rpc_url());
            let client = ChainClient::from_config(network)?;
            client.verify_chain_id().await.context("RPC endpoint is on the wrong chain")?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("fetching announcements");
            spinner.enable_steady_tick(std::time::Duration::from_millis(120));
            let matches = scanner.scan_source(&client, config).await?;
            spinner.finish_and_clear();
            matches
        }
    };

    let summary = ScanSummary::from(scanner.stats());
    debug!(?summary, "Scan finished");
    print_matches(&matches);
    println!(
        "\n   {} {} scanned, {} hint matches, {:.1}% filtered, {}ms",
        "Stats:".dimmed(),
        summary.total_scanned,
        summary.view_hint_matches,
        summary.filter_efficiency,
        summary.duration_ms
    );

    Ok(())
}

fn print_matches(matches: &[ScanMatch]) {
    if matches.is_empty() {
        println!("\n{}", "No payments found.".yellow());
        return;
    }

    println!("\n{} {} payment(s) found:", "✅".green(), matches.len());
    for found in matches {
        let announcement = found.announcement();
        println!("   {} {}", "Address:".green(), found.stealth_address());
        println!(
            "      Announcement #{} | {} MNT | k={}",
            announcement.id,
            format_ether(found.amount()),
            announcement.k
        );
        if let Some(block) = announcement.block_number {
            println!("      Block {}", block);
        }
        if let Some(key) = found.private_key() {
            println!("      {} {}", "Private key:".red(), key.to_hex());
        }
    }
}

/// Recover a stealth private key
fn cmd_recover(keys_path: &Path, ephemeral: &str, k: u32, address: Option<&str>) -> Result<()> {
    println!("{}", "🗝️  Recovering stealth key...".cyan().bold());

    let wallet = load_wallet(keys_path)?;
    let keys = wallet.keys();
    let ephemeral = hex::decode(ephemeral.trim_start_matches("0x"))
        .context("Ephemeral key is not hex")?;
    let engine = StealthAddressEngine::default();

    let key = match address {
        Some(address) => {
            let expected = parse_address(address)?;
            engine
                .recover_and_verify(
                    &keys.spend.secret,
                    &keys.viewing.secret,
                    &ephemeral,
                    k,
                    &expected,
                )
                .context("Recovered key does not control the expected address")?
        }
        None => engine
            .recover_stealth_private_key(&keys.spend.secret, &keys.viewing.secret, &ephemeral, k)
            .context("Key recovery failed")?,
    };
    let stealth_address = address_from_secret_key(&key)?;

    println!("\n{}", "✅ Key recovered:".green().bold());
    println!("   {} {}", "Address:".yellow(), stealth_address);
    println!("   {} {}", "Private key:".red(), key.to_hex());
    if address.is_some() {
        println!("   {}", "Verified against the expected address".dimmed());
    }

    Ok(())
}

fn cmd_link(command: LinkCommands) -> Result<()> {
    match command {
        LinkCommands::Create {
            alias,
            wallet,
            meta,
            amount,
            message,
        } => {
            let config = NetworkConfig::from_env().context("Invalid network configuration")?;
            let wallet = parse_address(&wallet)?;
            let meta_address = MetaAddress::from_hex(&meta).context("Invalid meta-address hex")?;
            let amount = parse_amount(amount.as_deref())?;

            let link = PaymentLink::generate(
                &alias,
                wallet,
                &meta_address,
                amount,
                message,
                &config,
            )
                .context("Failed to create payment link")?;
            validate_payment_link(&link, config.chain_id)?;

            println!("{}", "🔗 Payment link created:".green().bold());
            println!("   {} {}", "Link:".yellow(), link.url);
            println!("   {} {}", "URI:".dimmed(), link.uri);
            println!("\n{}", link.shareable_text());
        }
        LinkCommands::Parse { input } => {
            let parsed: ParsedPaymentLink =
                parse_payment_link(&input).context("Failed to parse payment link")?;
            match &parsed {
                ParsedPaymentLink::Link { alias, .. } => {
                    println!("{} {}", "🔗 Payment link for alias:".green().bold(), alias);
                }
                ParsedPaymentLink::Uri { uri } => {
                    println!("{} {}", "🔗 Transfer to:".green().bold(), uri.address);
                    if let Some(value) = uri.value {
                        println!("   {} {} MNT", "Amount:".dimmed(), format_ether(value));
                    }
                }
            }
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
    }
    Ok(())
}

async fn cmd_chain(command: ChainCommands, rpc_url: Option<String>) -> Result<()> {
    let network = network_config(rpc_url)?;
    let client = ChainClient::from_config(network)?;

    match command {
        ChainCommands::Meta { owner, index } => {
            let owner = parse_address(&owner)?;
            let registered = match index {
                Some(index) => client.get_meta_address(&owner, index).await?,
                None => match client.get_latest_meta_address(&owner).await? {
                    Some(registered) => registered,
                    None => bail!("{} has not registered a meta-address", owner),
                },
            };

            println!("{}", "✅ Meta-address:".green().bold());
            println!("   {} {}", "Owner:".dimmed(), registered.owner);
            println!("   {} {}", "Index:".dimmed(), registered.index);
            println!("   {} {}", "Hex:".yellow(), registered.meta_address.to_hex());
        }
        ChainCommands::Announcements {
            from_block,
            to_block,
            recipient,
            save,
        } => {
            let recipient = recipient.as_deref().map(parse_address).transpose()?;
            let to_block = match to_block {
                Some(block) => block,
                None => client.rpc().block_number().await?,
            };
            let announcements = client
                .get_payment_announcements(from_block.unwrap_or(0), to_block, recipient)
                .await?;

            println!(
                "{} {} announcement(s) up to block {}",
                "📡".cyan(),
                announcements.len(),
                to_block
            );
            for announcement in &announcements {
                print_announcement(announcement);
            }

            if let Some(path) = save {
                let saved = save_announcements(&path, announcements).await?;
                println!("{} {} saved to {}", "✅".green(), saved, path.display());
            }
        }
        ChainCommands::Balance { address } => {
            let address = parse_address(&address)?;
            let balance = client.get_balance(&address).await?;
            println!("{} {} MNT", address, format_ether(balance));
        }
        ChainCommands::Withdraw {
            key,
            to,
            amount,
            dry_run,
            no_wait,
        } => {
            let key = SecpSecretKey::from_hex(&key)
                .context("Invalid stealth private key")?;
            let to = parse_address(&to)?;
            let amount = parse_amount(amount.as_deref())?;

            let plan = client.plan_withdrawal(&key, &to, amount).await?;
            println!("{}", "💰 Withdrawal plan:".cyan().bold());
            println!("   {} {}", "From:".dimmed(), plan.from);
            println!("   {} {}", "To:".dimmed(), plan.to);
            println!("   {} {} MNT", "Balance:".dimmed(), format_ether(plan.balance));
            println!("   {} {} MNT", "Fee:".dimmed(), format_ether(plan.fee()));
            println!("   {} {} MNT", "Sending:".yellow(), format_ether(plan.value));

            if dry_run {
                return Ok(());
            }
            if no_wait {
                let signed = client.execute_withdrawal(&plan, &key).await?;
                println!("{} {}", "📤 Sent:".yellow().bold(), signed.hash);
                if let Some(url) = client.config().tx_url(&signed.hash) {
                    println!("   {}", url);
                }
                return Ok(());
            }

            println!(
                "{}",
                format!(
                    "⏳ Waiting for {} confirmation(s)...",
                    client.config().transaction.confirmations
                )
                .dimmed()
            );
            let done = client.execute_and_confirm(plan, &key).await?;
            println!(
                "{} {} (block {})",
                "✅ Confirmed:".green().bold(),
                done.transaction.hash,
                done.receipt.block_number
            );
            if let Some(url) = client.config().tx_url(&done.transaction.hash) {
                println!("   {}", url);
            }
        }
    }
    Ok(())
}

fn print_announcement(announcement: &PaymentAnnouncement) {
    println!(
        "   {} -> {} | hint {:>3} | k={} | {} MNT | block {}",
        announcement.recipient,
        announcement.stealth_address,
        announcement.view_hint,
        announcement.k,
        format_ether(announcement.amount),
        announcement
            .block_number
            .map_or_else(|| "-".to_string(), |b| b.to_string())
    );
}

async fn save_announcements(path: &Path, announcements: Vec<PaymentAnnouncement>) -> Result<usize> {
    let registry = FileRegistry::new(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut saved = 0;
    for announcement in announcements {
        registry.publish(announcement).await?;
        saved += 1;
    }
    registry.flush().await.context("Failed to write registry file")?;
    Ok(saved)
}

/// Run API server
async fn cmd_serve(port: Option<u16>, bind: Option<String>, rpc_url: Option<String>) -> Result<()> {
    let mut config = ApiConfig::from_env().context("Invalid server configuration")?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.host = bind;
    }
    if let Some(url) = rpc_url {
        config.network.rpc_urls = vec![url];
    }

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Cannot bind {}", config.bind_address()))?;

    println!("{}", "🚀 Starting PrivatePay API server...".cyan().bold());
    println!("   {} http://{}", "Listening on:".green(), addr);
    println!("   {} http://{}/health", "Health check:".dimmed(), addr);
    println!("   {} {}", "Network:".dimmed(), config.network.chain_name);
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::open(config).await?;
    server.run(addr).await?;

    Ok(())
}

/// Run benchmarks
async fn cmd_bench(count: usize) -> Result<()> {
    if count == 0 {
        bail!("count must be positive");
    }
    println!("{} {} announcements", "📊 Benchmarking with".cyan().bold(), count);

    println!("\n{}", "1. Generating keys...".dimmed());
    let start = Instant::now();
    let wallet = PrivatePayWallet::generate()?;
    println!("   ✓ Key generation: {:?}", start.elapsed());

    println!("\n{}", "2. Creating announcements...".dimmed());
    let engine = StealthAddressEngine::default();
    let registry = MemoryRegistry::with_capacity(count);
    let recipient = RegisteredMetaAddress {
        owner: EthAddress::from_array([0x11; 20]),
        index: 0,
        meta_address: *wallet.meta_address(),
        created_at: 0,
    };

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut expected = 0;
    for i in 0..count {
        // One in a hundred is ours
        let announcement = if i % 100 == 0 {
            expected += 1;
            create_stealth_payment(&engine, &recipient, 0, 1)?.announcement
        } else {
            let ephemeral = generate_keypair()?;
            let mut stealth = [0u8; 20];
            stealth[..8].copy_from_slice(&(i as u64 + 1).to_be_bytes());
            PaymentAnnouncement::builder()
                .recipient(EthAddress::from_array([0x22; 20]))
                .ephemeral_pub_key(ephemeral.public.as_bytes())
                .stealth_address(EthAddress::from_array(stealth))
                .view_hint((i % 256) as u8)
                .build()?
        };
        registry.publish(announcement).await?;
        pb.inc(1);
    }
    pb.finish();
    println!("   ✓ Created {} announcements: {:?}", count, start.elapsed());

    println!("\n{}", "3. Scanning...".dimmed());
    let scanner = Scanner::from_wallet(&wallet)?;
    let start = Instant::now();
    let matches = scanner.scan_all(&registry).await?;
    let scan_time = start.elapsed();
    let summary = ScanSummary::from(scanner.stats());
    info!(scanned = summary.total_scanned, found = matches.len(), "Benchmark scan done");

    println!("   ✓ Scanned {} announcements: {:?}", summary.total_scanned, scan_time);
    println!("   ✓ Found {} payments", matches.len());
    println!("\n{}", "📈 Results:".green().bold());
    println!(
        "   Scan rate: {:.0} announcements/sec",
        count as f64 / scan_time.as_secs_f64().max(f64::EPSILON)
    );
    println!(
        "   Time per announcement: {:.2}µs",
        scan_time.as_micros() as f64 / count as f64
    );
    println!("   View hint filter: {:.1}% discarded", summary.filter_efficiency);

    if matches.len() == expected {
        println!("   {} All expected payments found!", "✅".green());
    } else {
        println!("   {} Expected {}, found {}", "❌".red(), expected, matches.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_arguments() {
        let cli = Cli::try_parse_from([
            "privatepay",
            "--verbose",
            "scan",
            "--keys",
            "keys.json",
            "--registry",
            "announcements.ppay",
            "--from-block",
            "100",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Scan {
                keys,
                registry,
                from_block,
                to_block,
                workers,
            } => {
                assert_eq!(keys, PathBuf::from("keys.json"));
                assert_eq!(registry, Some(PathBuf::from("announcements.ppay")));
                assert_eq!(from_block, Some(100));
                assert_eq!(to_block, None);
                assert_eq!(workers, 1);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_link_subcommand() {
        let args = ["privatepay", "link", "parse", "https://privatepay.me/alice"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Link {
                command: LinkCommands::Parse { .. }
            }
        ));
    }

    #[test]
    fn test_parse_withdraw_waits_by_default() {
        let cli = Cli::try_parse_from([
            "privatepay",
            "chain",
            "withdraw",
            "--key",
            "0x01",
            "--to",
            "0x2222222222222222222222222222222222222222",
        ])
        .unwrap();
        match cli.command {
            Commands::Chain {
                command: ChainCommands::Withdraw { dry_run, no_wait, .. },
            } => {
                assert!(!dry_run);
                assert!(!no_wait);
            }
            _ => panic!("expected chain withdraw"),
        }
    }

    #[test]
    fn test_scan_requires_keys() {
        assert!(Cli::try_parse_from(["privatepay", "scan"]).is_err());
    }

    #[test]
    fn test_generate_with_seed_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");

        cmd_generate(Some("correct horse"), Some(&first)).unwrap();
        cmd_generate(Some("correct horse"), Some(&second)).unwrap();

        let a = load_wallet(&first).unwrap();
        let b = load_wallet(&second).unwrap();
        assert_eq!(a.meta_address(), b.meta_address());
    }

    #[test]
    fn test_load_wallet_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "{\"version\": 1}").unwrap();

        assert!(load_wallet(&path).is_err());
        assert!(load_wallet(&dir.path().join("missing.json")).is_err());
    }

    #[tokio::test]
    async fn test_saved_announcements_are_scannable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("announcements.ppay");
        let wallet = PrivatePayWallet::from_seed(b"scan me").unwrap();
        let recipient = RegisteredMetaAddress {
            owner: EthAddress::from_array([0x11; 20]),
            index: 0,
            meta_address: *wallet.meta_address(),
            created_at: 0,
        };
        let payment =
            create_stealth_payment(&StealthAddressEngine::default(), &recipient, 0, 7).unwrap();

        let saved = save_announcements(&path, vec![payment.announcement.clone()])
            .await
            .unwrap();
        assert_eq!(saved, 1);

        let registry = FileRegistry::new(&path).await.unwrap();
        let matches = Scanner::from_wallet(&wallet)
            .unwrap()
            .scan_all(&registry)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].stealth_address(), payment.stealth_address());
        assert!(matches[0].private_key().is_some());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(Some("1.5")).unwrap(), Some(1_500_000_000_000_000_000));
        assert_eq!(parse_amount(None).unwrap(), None);
        assert!(parse_amount(Some("abc")).is_err());
    }
}
