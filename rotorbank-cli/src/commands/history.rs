//! History command - list account history entries

use anyhow::Result;
use comfy_table::Cell;

use super::{finish, login, open_context};
use crate::output;

/// Keep only the last `limit` entries
fn tail(mut entries: Vec<String>, limit: Option<usize>) -> Vec<String> {
    if let Some(limit) = limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }
    entries
}

pub fn run(identity: &str, limit: Option<usize>, password: Option<String>, json: bool) -> Result<()> {
    let mut ctx = open_context()?;
    let result = login(&mut ctx, identity, password)?
        .and_then(|handle| ctx.bank.get_history(&handle))
        .map(|entries| tail(entries, limit));

    finish(result, json, |entries| {
        if entries.is_empty() {
            println!("No history entries.");
            return;
        }

        let mut table = output::create_table();
        table.set_header(vec!["#", "Entry"]);
        for (i, entry) in entries.iter().enumerate() {
            table.add_row(vec![Cell::new(i + 1), Cell::new(entry)]);
        }
        println!("{}", table);
    })
}
