//! Opyn RFQ CLI
//!
//! Computes and signs RFQ bids, manages the settlement allowance and settles
//! matched trades. Configuration comes from `OPYN_*` environment variables or a
//! config file; the signing key from `WALLET_PRIVATE_KEY`.

use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::U256;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rfq_core::api::{
    allow_more, settle_trade, verify_allowance, Erc20Token, RelayerClient, RelayerService,
    RpcClient, SettlementContract,
};
use rfq_core::address::normalize_address;
use rfq_core::config::Config;
use rfq_core::signing::typed_data::json_u256;
use rfq_core::signing::{Eip712Message, MessageToSign, OrderData, OrderSigner, TypedData, Wallet};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "opyn-rfq")]
#[command(about = "Sign and settle Opyn RFQ bids", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file; OPYN_* environment variables are used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the EIP-712 digest of an RFQ bid
    Digest(OrderArgs),

    /// Print the digest of an arbitrary EIP-712 typed data JSON document
    HashTypedData {
        /// Path to the typed data JSON (types, primaryType, domain, message)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Sign an RFQ bid and print the signed order as JSON
    Sign(OrderArgs),

    /// Check whether the settlement contract has enough allowance for a token
    Allowance {
        /// Token address
        #[arg(short, long)]
        token: String,

        /// Owner to check; defaults to the configured wallet
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Approve the settlement contract to spend a token
    Approve {
        /// Token address
        #[arg(short, long)]
        token: String,

        /// Amount in token base units
        #[arg(short, long)]
        amount: String,
    },

    /// Show an auction's status
    Auction {
        #[arg(long)]
        auction_id: String,
    },

    /// Settle a signed bid against the counterparty order from the relayer
    Settle {
        #[arg(long)]
        auction_id: String,

        /// Path to the signed bid produced by `sign`
        #[arg(short, long)]
        order: PathBuf,
    },
}

#[derive(Args)]
struct OrderArgs {
    #[arg(long)]
    bid_id: String,

    /// Trader address; defaults to the configured wallet
    #[arg(long)]
    trader: Option<String>,

    /// Token the bid is made in
    #[arg(long)]
    token: String,

    /// Amount in token base units
    #[arg(long)]
    amount: String,

    /// Settlement contract nonce of the trader
    #[arg(long, default_value = "0")]
    nonce: String,
}

impl OrderArgs {
    fn to_message(&self, default_trader: Option<&Wallet>) -> Result<MessageToSign> {
        let trader = match (&self.trader, default_trader) {
            (Some(trader), _) => normalize_address(trader)?,
            (None, Some(wallet)) => wallet.address(),
            (None, None) => anyhow::bail!("--trader is required without WALLET_PRIVATE_KEY"),
        };

        Ok(MessageToSign::new(
            parse_u256("bid-id", &self.bid_id)?,
            trader,
            normalize_address(&self.token)?,
            parse_u256("amount", &self.amount)?,
            parse_u256("nonce", &self.nonce)?,
        ))
    }
}

fn parse_u256(name: &str, raw: &str) -> Result<U256> {
    json_u256(&serde_json::Value::String(raw.to_string()))
        .with_context(|| format!("invalid --{name}"))
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            Config::from_file(path)?
        }
        None => Config::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging on stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opyn_rfq=info,rfq_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Digest(args) => digest(&config, &args),
        Commands::HashTypedData { file } => hash_typed_data(&file),
        Commands::Sign(args) => sign(&config, &args),
        Commands::Allowance { token, owner } => allowance(&config, &token, owner.as_deref()).await,
        Commands::Approve { token, amount } => approve(&config, &token, &amount).await,
        Commands::Auction { auction_id } => auction(&config, &auction_id).await,
        Commands::Settle { auction_id, order } => settle(&config, &auction_id, &order).await,
    }
}

fn digest(config: &Config, args: &OrderArgs) -> Result<()> {
    let wallet = Wallet::from_env().ok();
    let message = args.to_message(wallet.as_ref())?;
    let domain = config.signing_domain()?;

    println!("{}", message.signing_hash(&domain)?);
    Ok(())
}

fn hash_typed_data(file: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let typed_data = TypedData::from_json(&raw).context("Invalid typed data JSON")?;

    println!("{}", typed_data.digest()?);
    Ok(())
}

fn sign(config: &Config, args: &OrderArgs) -> Result<()> {
    let wallet = Wallet::from_env().context("Failed to load wallet")?;
    let message = args.to_message(Some(&wallet))?;
    let signer = OrderSigner::new(wallet, config.signing_domain()?)?;

    let signed = signer.sign_order(&message)?;
    println!("{}", serde_json::to_string_pretty(&signed)?);
    Ok(())
}

async fn allowance(config: &Config, token: &str, owner: Option<&str>) -> Result<()> {
    let owner = match owner {
        Some(owner) => normalize_address(owner)?,
        None => Wallet::from_env().context("Failed to load wallet")?.address(),
    };
    let rpc = Arc::new(RpcClient::new(config.rpc_url()?, config.chain.chain_id)?);
    let token = Erc20Token::new(rpc, normalize_address(token)?);

    let sufficient = verify_allowance(&token, owner, config.settlement_address()?).await?;
    println!("{sufficient}");
    Ok(())
}

async fn approve(config: &Config, token: &str, amount: &str) -> Result<()> {
    let wallet = Wallet::from_env().context("Failed to load wallet")?;
    let rpc = Arc::new(RpcClient::new(config.rpc_url()?, config.chain.chain_id)?);
    let token = Erc20Token::new(rpc, normalize_address(token)?);

    let tx_hash = allow_more(
        &token,
        &wallet,
        config.settlement_address()?,
        parse_u256("amount", amount)?,
    )
    .await?;
    println!("{tx_hash}");
    Ok(())
}

async fn auction(config: &Config, auction_id: &str) -> Result<()> {
    let relayer = RelayerClient::new(config.relayer_url()?, config.relayer.api_key.clone())?;
    let status = relayer.get_auction_status(auction_id).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn settle(config: &Config, auction_id: &str, order: &PathBuf) -> Result<()> {
    let wallet = Wallet::from_env().context("Failed to load wallet")?;
    let raw = std::fs::read_to_string(order)
        .with_context(|| format!("Failed to read {}", order.display()))?;
    let bid_order = OrderData::from_json(&raw).context("Invalid signed order")?;

    let relayer = RelayerClient::new(config.relayer_url()?, config.relayer.api_key.clone())?;
    let rpc = Arc::new(RpcClient::new(config.rpc_url()?, config.chain.chain_id)?);
    let settlement = SettlementContract::new(rpc, config.settlement_address()?);

    info!(auction_id = auction_id, bid_id = %bid_order.bid_id, "Settling RFQ trade");
    let tx_hash = settle_trade(&relayer, &settlement, &wallet, auction_id, &bid_order).await?;
    println!("{tx_hash}");
    Ok(())
}
