//! Wallet commands run by the binary

use crate::config::WalletConfig;
use anyhow::{Context, Result};
use std::io::BufRead;
use tonwallet_history::{HttpBookkeeping, TransactionHistory};
use tonwallet_ledger::TonCenterClient;
use tonwallet_session::{
    EncryptedFileStore, OpenMode, RefreshOutcome, SyncWarning, WalletSession,
};
use zeroize::Zeroizing;

type Session = WalletSession<TonCenterClient, HttpBookkeeping, EncryptedFileStore>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate a new phrase and store it
    Create,
    /// Store an existing phrase
    Restore,
    Address,
    Refresh,
    Send {
        destination: String,
        amount: String,
        comment: Option<String>,
    },
}

impl Command {
    /// Parse the positional part of the command line
    pub fn parse(args: &[String]) -> Result<Self> {
        let (name, rest) = args
            .split_first()
            .context("Missing command (create, restore, address, refresh, send)")?;

        let command = match name.as_str() {
            "create" => Command::Create,
            "restore" => Command::Restore,
            "address" => Command::Address,
            "refresh" | "balance" => Command::Refresh,
            "send" => return parse_send(rest),
            other => anyhow::bail!("Unknown command: {}", other),
        };
        anyhow::ensure!(rest.is_empty(), "Unexpected argument: {}", rest[0]);
        Ok(command)
    }
}

fn parse_send(args: &[String]) -> Result<Command> {
    let mut positional = Vec::new();
    let mut comment = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--comment" | "-m" => {
                i += 1;
                match args.get(i) {
                    Some(text) => comment = Some(text.clone()),
                    None => anyhow::bail!("--comment requires a text argument"),
                }
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    match <[String; 2]>::try_from(positional) {
        Ok([destination, amount]) => Ok(Command::Send {
            destination,
            amount,
            comment,
        }),
        Err(_) => anyhow::bail!("Usage: send <destination> <amount> [--comment TEXT]"),
    }
}

pub async fn run(command: Command, config: &WalletConfig) -> Result<()> {
    let session = build_session(config)?;

    match command {
        Command::Create => {
            ensure_no_wallet(&session)?;
            let opened = session.open(OpenMode::GenerateNew)?;
            println!("Address: {}", opened.address);
            if let Some(phrase) = opened.phrase {
                println!();
                println!("Write down these 24 words. They are the only way to recover the wallet:");
                println!();
                for (i, word) in phrase.words().enumerate() {
                    println!("  {:>2}. {}", i + 1, word);
                }
            }
        }
        Command::Restore => {
            ensure_no_wallet(&session)?;
            let phrase = read_phrase()?;
            let opened = session.open(OpenMode::RestoreFromPhrase(phrase))?;
            println!("Restored wallet {}", opened.address);
        }
        Command::Address => {
            let opened = session.open(OpenMode::Resume)?;
            println!("{}", opened.address);
        }
        Command::Refresh => {
            session.open(OpenMode::Resume)?;
            let outcome = session.refresh().await?;
            print_refresh(&outcome);
        }
        Command::Send {
            destination,
            amount,
            comment,
        } => {
            session.open(OpenMode::Resume)?;
            let sent = session
                .send(&destination, &amount, comment.as_deref())
                .await?;
            println!("Sent {} to {}", sent.record.amount, sent.record.counterparty);
            println!("  Message:  {}", sent.message_hash);
            println!("  Seqno:    {}", sent.sequence_number);
            println!("  Record:   {}", sent.record.id);
            print_warnings(&sent.warnings);
            if let Some(refresh) = &sent.refresh {
                println!();
                print_refresh(refresh);
            }
        }
    }

    Ok(())
}

fn build_session(config: &WalletConfig) -> Result<Session> {
    let password = std::env::var("TONWALLET_PASSWORD")
        .map(Zeroizing::new)
        .context("TONWALLET_PASSWORD must be set to unlock the wallet")?;
    anyhow::ensure!(!password.is_empty(), "TONWALLET_PASSWORD must not be empty");

    let endpoint = config.ledger_endpoint()?;
    let ledger = TonCenterClient::new(
        endpoint.as_str(),
        config.ledger.api_key.clone(),
        config.ledger.timeout_secs,
    )
    .with_context(|| format!("Failed to create ledger client for {}", endpoint))?;
    let bookkeeping =
        HttpBookkeeping::new(config.bookkeeping.url.as_str(), config.bookkeeping.timeout_secs)
            .context("Failed to create bookkeeping client")?;
    let store = EncryptedFileStore::in_dir(&config.wallet.data_dir, &password);

    let session = WalletSession::new(ledger, bookkeeping, store, config.session_config()?)
        .context("Failed to load wallet state")?;
    Ok(session)
}

fn ensure_no_wallet(session: &Session) -> Result<()> {
    let path = session.store().path();
    anyhow::ensure!(
        !path.exists(),
        "A wallet already exists at {}; remove it first to replace it",
        path.display()
    );
    Ok(())
}

/// `TONWALLET_PHRASE`, or one line from stdin
fn read_phrase() -> Result<Zeroizing<String>> {
    if let Ok(phrase) = std::env::var("TONWALLET_PHRASE") {
        return Ok(Zeroizing::new(phrase));
    }

    eprintln!("Enter your 24-word phrase:");
    let mut line = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read phrase from stdin")?;
    Ok(line)
}

fn print_refresh(outcome: &RefreshOutcome) {
    println!("Balance: {} TON", outcome.balance);
    print_history(&outcome.history);
    print_warnings(&outcome.warnings);
}

fn print_history(history: &TransactionHistory) {
    if history.is_empty() {
        println!("No transactions.");
        return;
    }
    println!("Transactions:");
    for record in history.iter() {
        println!(
            "  {}  {:<8} {:>16}  {:<9}  {}  [{}]",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.direction.to_string(),
            record.amount.to_string(),
            record.status.to_string(),
            record.counterparty,
            record.id
        );
    }
}

fn print_warnings(warnings: &[SyncWarning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse(&args(&["create"])).unwrap(), Command::Create);
        assert_eq!(Command::parse(&args(&["restore"])).unwrap(), Command::Restore);
        assert_eq!(Command::parse(&args(&["address"])).unwrap(), Command::Address);
        assert_eq!(Command::parse(&args(&["refresh"])).unwrap(), Command::Refresh);
        assert_eq!(Command::parse(&args(&["balance"])).unwrap(), Command::Refresh);
    }

    #[test]
    fn test_parse_send() {
        let cmd = Command::parse(&args(&["send", "UQabc", "1.5"])).unwrap();
        assert_eq!(
            cmd,
            Command::Send {
                destination: "UQabc".into(),
                amount: "1.5".into(),
                comment: None,
            }
        );

        let cmd =
            Command::parse(&args(&["send", "--comment", "rent", "UQabc", "0.25"])).unwrap();
        assert_eq!(
            cmd,
            Command::Send {
                destination: "UQabc".into(),
                amount: "0.25".into(),
                comment: Some("rent".into()),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse(&[]).is_err());
        assert!(Command::parse(&args(&["mint"])).is_err());
        assert!(Command::parse(&args(&["address", "extra"])).is_err());
        assert!(Command::parse(&args(&["send", "UQabc"])).is_err());
        assert!(Command::parse(&args(&["send", "UQabc", "1", "2"])).is_err());
        assert!(Command::parse(&args(&["send", "UQabc", "1", "--comment"])).is_err());
    }
}
