//! Config command - show and change ledger settings

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;

use rotorbank_core::config::Config;
use rotorbank_core::AlphabetKind;

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the settings in effect, environment overrides included
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change settings in settings.json
    Set {
        /// Daily interest rate, e.g. 0.0225
        #[arg(long)]
        daily_rate: Option<String>,
        /// Ledger file name template containing {identity}
        #[arg(long)]
        filename_template: Option<String>,
        /// Alphabet for new keys (standard or printable)
        #[arg(long)]
        alphabet: Option<String>,
        /// Random plugboard pairs for new keys (0 keeps the classic pairs)
        #[arg(long)]
        plugboard_pairs: Option<usize>,
    },
}

/// Changes requested on the command line
#[derive(Default)]
struct SettingsUpdate {
    daily_rate: Option<String>,
    filename_template: Option<String>,
    alphabet: Option<String>,
    plugboard_pairs: Option<usize>,
}

impl SettingsUpdate {
    fn is_empty(&self) -> bool {
        self.daily_rate.is_none()
            && self.filename_template.is_none()
            && self.alphabet.is_none()
            && self.plugboard_pairs.is_none()
    }

    fn apply(self, config: &mut Config) -> Result<()> {
        if let Some(rate) = self.daily_rate {
            config.daily_interest_rate = Decimal::from_str(rate.trim())
                .with_context(|| format!("Invalid daily interest rate: {:?}", rate))?;
        }
        if let Some(template) = self.filename_template {
            config.filename_template = template;
        }
        if let Some(name) = self.alphabet {
            config.alphabet = AlphabetKind::from_str(&name)?;
        }
        if let Some(pairs) = self.plugboard_pairs {
            config.plugboard_pairs = if pairs == 0 { None } else { Some(pairs) };
        }
        config.validate()
    }
}

fn print_config(config: &Config, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "dailyInterestRate": config.daily_interest_rate.to_string(),
                "filenameTemplate": config.filename_template,
                "alphabet": config.alphabet.to_string(),
                "plugboardPairs": config.plugboard_pairs,
            })
        );
        return;
    }

    println!("{}", "Ledger Settings".bold());
    println!("  Daily interest rate: {}", config.daily_interest_rate);
    println!("  Filename template: {}", config.filename_template);
    println!("  Alphabet: {}", config.alphabet);
    match config.plugboard_pairs {
        Some(pairs) => println!("  Plugboard: {} random pairs", pairs),
        None => println!("  Plugboard: classic pairs"),
    }
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    let mut config = Config::load(&data_dir)?;

    match command {
        ConfigCommands::Show { json } => print_config(&config, json),
        ConfigCommands::Set {
            daily_rate,
            filename_template,
            alphabet,
            plugboard_pairs,
        } => {
            let update = SettingsUpdate {
                daily_rate,
                filename_template,
                alphabet,
                plugboard_pairs,
            };
            if update.is_empty() {
                output::info("Nothing to change.");
                return Ok(());
            }

            update.apply(&mut config)?;
            config
                .save(&data_dir)
                .with_context(|| format!("Failed to save settings in {}", data_dir.display()))?;
            output::success("Settings saved");
            print_config(&config, false);
        }
    }

    Ok(())
}
