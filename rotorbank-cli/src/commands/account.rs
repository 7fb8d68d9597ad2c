//! Account commands - register and change password

use anyhow::Result;
use rust_decimal::Decimal;

use rotorbank_core::domain::result::Result as CoreResult;
use rotorbank_core::Error;

use super::{finish, login, open_context, resolve_new_password};
use crate::output;

/// Opening balances may be zero, unlike amounts moved by an operation
fn parse_opening_balance(input: &str) -> CoreResult<Decimal> {
    let trimmed = input.trim();
    let cleaned = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    cleaned
        .parse()
        .map_err(|_| Error::invalid_amount(format!("not a number: {:?}", input)))
}

pub fn register(identity: &str, initial: &str, password: Option<String>, json: bool) -> Result<()> {
    let mut ctx = open_context()?;
    let password = resolve_new_password(
        password.or_else(|| std::env::var(super::ENV_PASSWORD).ok()),
        &format!("Password for {}", identity),
    )?;

    let result = parse_opening_balance(initial)
        .and_then(|balance| ctx.bank.register(identity, &password, balance));

    finish(result, json, |handle| {
        output::success(&format!("Registered account {}", handle.identity()));
        output::info(&format!(
            "Ledger: {}",
            ctx.bank.store().layout().ledger_name(handle.identity())
        ));
    })
}

pub fn passwd(
    identity: &str,
    password: Option<String>,
    new_password: Option<String>,
    json: bool,
) -> Result<()> {
    let mut ctx = open_context()?;
    let result = match login(&mut ctx, identity, password)? {
        Ok(handle) => {
            let new_password = resolve_new_password(new_password, "New password")?;
            ctx.bank
                .change_credential(&handle, &new_password)
                .map(|()| handle)
        }
        Err(e) => Err(e),
    };

    finish(result, json, |handle| {
        output::success(&format!("Password changed for {}", handle.identity()));
    })
}
