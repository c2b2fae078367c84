// Pocketbook CLI Client
// Command-line wallet for named keys, an address book and token transfers

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use env_logger::Env;
use pocketbook_cli::commands::{self, Session, TerminalPrompter};
use pocketbook_cli::config::Config;
use pocketbook_cli::disclaimer;
use pocketbook_wallet::TransferRequest;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pocketbook", version)]
#[command(about = "Command line wallet for keys, addresses and token transfers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Network to talk to (defaults to the configured default network)
    #[arg(short, long, global = true)]
    network: Option<String>,

    /// Key store directory (defaults to ~/.pocketbook)
    #[arg(long, global = true, env = "POCKETBOOK_ROOT")]
    root: Option<PathBuf>,

    /// Output format: table or json
    #[arg(short, long, global = true)]
    format: Option<String>,

    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List keys and addresses with their balances
    List {
        /// Only show names matching these shell-style patterns
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,

        /// Also show addresses
        #[arg(short, long)]
        verbose: bool,
    },

    /// Create a new key
    Create,

    /// Import an existing private key
    Import,

    /// Display the address and public key of a key
    Display {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Add an address to the address book
    Add {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(value_name = "ADDRESS")]
        address: String,
    },

    /// Rename a key or an address
    Rename {
        #[arg(value_name = "OLD")]
        old: String,

        #[arg(value_name = "NEW")]
        new: String,
    },

    /// Delete a key or an address
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Transfer tokens to a name or an address
    Transfer {
        /// Address book name, key name or address
        #[arg(value_name = "DESTINATION")]
        destination: String,

        /// Amount in tokens, e.g. 1.5 or 1e-3
        #[arg(value_name = "AMOUNT")]
        amount: String,

        /// Keys signing the transfer
        #[arg(short = 's', long = "signer", value_name = "SIGNER", num_args = 1..)]
        signers: Vec<String>,

        /// Paying account, required with more than one signer
        #[arg(long = "from", value_name = "NAME")]
        from: Option<String>,

        /// Charge rate in canonical units per operation
        #[arg(long, default_value_t = 1)]
        charge_rate: u64,
    },

    /// Show or edit the configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("warn")
    };
    env_logger::init_from_env(env);

    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let format = match &cli.format {
        Some(format) => format.parse()?,
        None => config.output_format,
    };

    if let Commands::Config(command) = &cli.command {
        return match command {
            ConfigCommands::Show => commands::config::show(&config, format),
            ConfigCommands::Set { key, value } => {
                commands::config::set(&Config::config_path()?, key, value).map(|_| ())
            }
        };
    }

    let root = match cli.root {
        Some(root) => root,
        None => config.store_root()?,
    };
    let network = cli
        .network
        .unwrap_or_else(|| config.default_network.clone());

    let mut prompter = TerminalPrompter;
    disclaimer::display_disclaimer(&root, &mut prompter)?;

    let session = Session {
        config,
        root,
        network,
        format,
    };
    log::debug!(
        "Using key store {} on network {}",
        session.root.display(),
        session.network
    );

    match cli.command {
        Commands::List { patterns, verbose } => commands::list::run(&session, &patterns, verbose).await,
        Commands::Create => commands::create::run(&session, &mut prompter),
        Commands::Import => commands::import::run(&session, &mut prompter),
        Commands::Display { name } => commands::display::run(&session, &mut prompter, &name),
        Commands::Add { name, address } => commands::add::run(&session, &name, &address),
        Commands::Rename { old, new } => commands::rename::run(&session, &old, &new),
        Commands::Delete { name } => commands::delete::run(&session, &mut prompter, &name),
        Commands::Transfer {
            destination,
            amount,
            signers,
            from,
            charge_rate,
        } => {
            let request = TransferRequest {
                destination,
                amount: commands::transfer::parse_canonical_amount(&amount)?,
                charge_rate,
                signers,
                from,
            };
            commands::transfer::run(&session, &mut prompter, request).await
        }
        Commands::Config(_) => Ok(()),
    }
}
