//! tonwallet: headless wallet front end
//!
//! Opens a [`WalletSession`](tonwallet_session::WalletSession) against the
//! configured ledger and bookkeeping service, runs one command and exits.
//!
//! # Usage
//!
//! ```bash
//! TONWALLET_PASSWORD=... tonwallet --config tonwallet.toml create
//! TONWALLET_PASSWORD=... tonwallet send UQ... 1.5 --comment "rent"
//! tonwallet --validate
//! ```

mod commands;
mod config;

use anyhow::{Context, Result};
use commands::Command;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "tonwallet.toml";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut validate_only = false;
    let mut command_args = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--validate" => {
                validate_only = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("tonwallet {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            _ => {
                // everything from the command name on belongs to the command
                command_args.extend_from_slice(&args[i..]);
                break;
            }
        }
        i += 1;
    }

    // An explicit --config must exist; the default file is optional
    let mut wallet_config = match config_path {
        Some(path) => config::WalletConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            config::WalletConfig::from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG))?
        }
        None => config::WalletConfig::default(),
    };

    wallet_config.apply_env_overrides();

    wallet_config
        .validate()
        .context("Configuration validation failed")?;

    std::env::set_var("RUST_LOG", &wallet_config.wallet.log_level);
    env_logger::init();

    if validate_only {
        println!("✅ Configuration is valid.");
        println!("  Network:      {}", wallet_config.wallet.network);
        println!("  Workchain:    {}", wallet_config.wallet.workchain);
        println!("  Version:      {}", wallet_config.wallet.version);
        println!("  Data dir:     {}", wallet_config.wallet.data_dir.display());
        println!("  Ledger:       {}", wallet_config.ledger_endpoint()?);
        println!("  Bookkeeping:  {}", wallet_config.bookkeeping.url);
        return Ok(());
    }

    let command = Command::parse(&command_args)?;

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    if let Err(e) = rt.block_on(commands::run(command, &wallet_config)) {
        log::debug!("Command failed: {:?}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"tonwallet: non-custodial TON wallet

USAGE:
    tonwallet [OPTIONS] <COMMAND>

COMMANDS:
    create                              Generate a new wallet and show its phrase
    restore                             Restore from TONWALLET_PHRASE or a phrase on stdin
    address                             Show the wallet address
    refresh                             Show balance and transaction history
    send <DEST> <AMOUNT> [--comment T]  Send AMOUNT TON to DEST

OPTIONS:
    -c, --config <PATH>   Config file path (default: ./tonwallet.toml if present)
    --validate            Validate configuration and exit
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    TONWALLET_PASSWORD         Password for the encrypted phrase (required)
    TONWALLET_PHRASE           Phrase for `restore`
    TONWALLET_DATA_DIR         Data directory path
    TONWALLET_LOG_LEVEL        Log level (error/warn/info/debug/trace)
    TONWALLET_NETWORK          mainnet or testnet
    TONWALLET_WORKCHAIN        0 or -1
    TONWALLET_LEDGER_URL       toncenter-compatible API endpoint
    TONWALLET_API_KEY          Ledger API key
    TONWALLET_BOOKKEEPING_URL  Bookkeeping service URL

EXAMPLES:
    # New wallet on testnet
    TONWALLET_NETWORK=testnet tonwallet create

    # Send with a comment
    tonwallet send UQDnuKfcBFbPfcUm63GjmeMRmT9b7JcVhjwVik-YHCrmMQsb 0.5 --comment "thanks"
"#
    );
}
