//! Rotorbank CLI - encrypted account ledgers in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{account, config, doctor, history, logs, money};

/// Rotorbank - encrypted account ledgers in your terminal
#[derive(Parser)]
#[command(name = "rb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new account
    Register {
        /// Account identity (letters, digits, '.', '_' and '-')
        identity: String,
        /// Opening balance
        #[arg(long, default_value = "0")]
        initial: String,
        /// Account password
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the current balance, with interest applied
    Balance {
        /// Account identity
        identity: String,
        /// Account password
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deposit money
    Deposit {
        /// Account identity
        identity: String,
        /// Amount, e.g. 12.50 or $12.50
        amount: String,
        /// Note kept in the account history
        #[arg(long)]
        note: Option<String>,
        /// Account password
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Withdraw money
    Withdraw {
        /// Account identity
        identity: String,
        /// Amount, e.g. 12.50 or $12.50
        amount: String,
        /// Note kept in the account history
        #[arg(long)]
        note: Option<String>,
        /// Account password
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move money to another account
    Transfer {
        /// Paying account identity
        identity: String,
        /// Receiving account identity
        target: String,
        /// Amount, e.g. 12.50 or $12.50
        amount: String,
        /// Note kept in both account histories
        #[arg(long)]
        note: Option<String>,
        /// Account password
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the account history
    History {
        /// Account identity
        identity: String,
        /// Show only the last N entries
        #[arg(short, long)]
        limit: Option<usize>,
        /// Account password
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change the account password
    Passwd {
        /// Account identity
        identity: String,
        /// Current password
        #[arg(short, long)]
        password: Option<String>,
        /// New password
        #[arg(long)]
        new_password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger health checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Show or change ledger settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { identity, initial, password, json } => {
            account::register(&identity, &initial, password, json)
        }
        Commands::Balance { identity, password, json } => money::balance(&identity, password, json),
        Commands::Deposit { identity, amount, note, password, json } => {
            money::deposit(&identity, &amount, note.as_deref(), password, json)
        }
        Commands::Withdraw { identity, amount, note, password, json } => {
            money::withdraw(&identity, &amount, note.as_deref(), password, json)
        }
        Commands::Transfer { identity, target, amount, note, password, json } => {
            money::transfer(&identity, &target, &amount, note.as_deref(), password, json)
        }
        Commands::History { identity, limit, password, json } => {
            history::run(&identity, limit, password, json)
        }
        Commands::Passwd { identity, password, new_password, json } => {
            account::passwd(&identity, password, new_password, json)
        }
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Logs { command } => logs::run(command),
        Commands::Config { command } => config::run(command),
    }
}
