use crate::commands::Session;
use crate::config::OutputFormat;
use crate::rpc::{create_api, LedgerApi};
use anyhow::{Context, Result};
use pocketbook_wallet::{format_canonical, Address, AddressBook, KeyStore, NameRegistry};
use prettytable::{Cell, Row, Table};
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRow {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub address: Address,
    /// Canonical units
    pub balance: u64,
    /// Canonical units
    pub stake: u64,
}

/// Translate a shell-style pattern (`*`, `?`, `[abc]`, `[!abc]`) into an
/// anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    if c == '\\' || c == '[' || c == '^' {
                        class.push('\\');
                    }
                    class.push(c);
                }
                if closed && !class.is_empty() && class != "^" {
                    out.push('[');
                    out.push_str(&class);
                    out.push(']');
                } else {
                    // unterminated or empty class matches literally
                    out.push_str(&regex::escape("["));
                    out.push_str(&regex::escape(class.trim_start_matches('^')));
                    if closed {
                        out.push_str(&regex::escape("]"));
                    }
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');

    Regex::new(&out).with_context(|| format!("Invalid name pattern '{}'", pattern))
}

/// Keys then address book entries whose name matches any pattern, with
/// their balance and stake
pub async fn collect_rows(
    keys: &KeyStore,
    book: &AddressBook,
    api: &dyn LedgerApi,
    patterns: &[String],
) -> Result<Vec<ListRow>> {
    let matchers = if patterns.is_empty() {
        vec![glob_to_regex("*")?]
    } else {
        patterns
            .iter()
            .map(|p| glob_to_regex(p))
            .collect::<Result<Vec<_>>>()?
    };

    let entries = NameRegistry::new(keys, book).entries()?;

    let mut rows = Vec::new();
    for entry in entries {
        if !matchers.iter().any(|m| m.is_match(&entry.name)) {
            continue;
        }

        let balance = api
            .balance(&entry.address)
            .await
            .with_context(|| format!("Failed to query balance of {}", entry.name))?;
        let stake = api
            .stake(&entry.address)
            .await
            .with_context(|| format!("Failed to query stake of {}", entry.name))?;

        rows.push(ListRow {
            name: entry.name,
            kind: entry.kind.to_string(),
            address: entry.address,
            balance,
            stake,
        });
    }

    Ok(rows)
}

pub fn print_rows(rows: &[ListRow], verbose: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows)?);
        }
        OutputFormat::Table => {
            let mut header = vec![
                Cell::new("Name").style_spec("bFg"),
                Cell::new("Type").style_spec("bFg"),
                Cell::new("Balance").style_spec("bFg"),
                Cell::new("Stake").style_spec("bFg"),
            ];
            if verbose {
                header.push(Cell::new("Address").style_spec("bFg"));
            }

            let mut table = Table::new();
            table.add_row(Row::new(header));
            for row in rows {
                let mut cells = vec![
                    Cell::new(&row.name),
                    Cell::new(&row.kind),
                    Cell::new(&format_canonical(row.balance)),
                    Cell::new(&format_canonical(row.stake)),
                ];
                if verbose {
                    cells.push(Cell::new(&row.address.to_string()));
                }
                table.add_row(Row::new(cells));
            }
            table.printstd();
        }
    }
    Ok(())
}

pub async fn run(session: &Session, patterns: &[String], verbose: bool) -> Result<()> {
    let (keys, book) = session.open_stores()?;

    if keys.list_keys().is_empty() {
        println!("No keys present");
        return Ok(());
    }

    // a corrupted store is reported even when the node is unreachable
    NameRegistry::new(&keys, &book).ensure_consistent()?;

    let api = create_api(&session.network, &session.config).await?;
    let rows = collect_rows(&keys, &book, api.as_ref(), patterns).await?;
    print_rows(&rows, verbose, session.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, name: &str) -> bool {
        glob_to_regex(pattern).unwrap().is_match(name)
    }

    #[test]
    fn test_glob_patterns() {
        assert!(matches("*", "anything"));
        assert!(matches("*", ""));
        assert!(matches("main*", "main-savings"));
        assert!(!matches("main*", "my-main"));
        assert!(matches("key?", "key1"));
        assert!(!matches("key?", "key10"));
        assert!(matches("[ab]*", "bob"));
        assert!(!matches("[!ab]*", "bob"));
        assert!(matches("[!ab]*", "carol"));
    }

    #[test]
    fn test_regex_characters_are_literal() {
        assert!(matches("a.b", "a.b"));
        assert!(!matches("a.b", "axb"));
        assert!(matches("(x)+", "(x)+"));
        assert!(matches("[oops", "[oops"));
    }
}
