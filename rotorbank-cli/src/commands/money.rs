//! Money commands - balance, deposit, withdraw and transfer

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use rotorbank_core::{parse_amount, TransferState};
use rust_decimal::Decimal;

use super::{finish, login, open_context};
use crate::output;

#[derive(Serialize)]
struct BalanceView {
    identity: String,
    balance: Decimal,
}

pub fn balance(identity: &str, password: Option<String>, json: bool) -> Result<()> {
    let mut ctx = open_context()?;
    let result = login(&mut ctx, identity, password)?.and_then(|handle| {
        ctx.bank.get_balance(&handle).map(|balance| BalanceView {
            identity: handle.identity().to_string(),
            balance,
        })
    });

    finish(result, json, |view| {
        println!("{}: {}", view.identity.bold(), output::format_money(view.balance));
    })
}

pub fn deposit(
    identity: &str,
    amount: &str,
    note: Option<&str>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let mut ctx = open_context()?;
    let result = login(&mut ctx, identity, password)?.and_then(|handle| {
        let amount = parse_amount(amount)?;
        ctx.bank.deposit(&handle, amount, note).map(|balance| BalanceView {
            identity: handle.identity().to_string(),
            balance,
        })
    });

    finish(result, json, |view| {
        output::success(&format!("Deposited {}", amount.trim()));
        println!("New balance: {}", output::format_money(view.balance));
    })
}

pub fn withdraw(
    identity: &str,
    amount: &str,
    note: Option<&str>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let mut ctx = open_context()?;
    let result = login(&mut ctx, identity, password)?.and_then(|handle| {
        let amount = parse_amount(amount)?;
        ctx.bank.withdraw(&handle, amount, note).map(|balance| BalanceView {
            identity: handle.identity().to_string(),
            balance,
        })
    });

    finish(result, json, |view| {
        output::success(&format!("Withdrew {}", amount.trim()));
        println!("New balance: {}", output::format_money(view.balance));
    })
}

pub fn transfer(
    identity: &str,
    target: &str,
    amount: &str,
    note: Option<&str>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let mut ctx = open_context()?;
    let result = login(&mut ctx, identity, password)?.and_then(|handle| {
        let amount = parse_amount(amount)?;
        ctx.bank.transfer(&handle, target, amount, note)
    });

    finish(result, json, |receipt| {
        output::success(&format!(
            "Transferred {} from {} to {}",
            output::format_money(receipt.amount),
            receipt.source,
            receipt.target
        ));
        let trail: Vec<&str> = receipt.trail.iter().map(TransferState::as_str).collect();
        println!("Transfer {} ({})", receipt.id.to_string().dimmed(), trail.join(" -> "));
    })
}
