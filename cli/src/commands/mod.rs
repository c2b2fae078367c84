pub mod add;
pub mod config;
pub mod create;
pub mod delete;
pub mod display;
pub mod import;
pub mod list;
pub mod rename;
pub mod transfer;

use crate::config::{Config, OutputFormat};
use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, Password};
use pocketbook_wallet::{AddressBook, KeyStore};
use std::path::PathBuf;

/// Settings shared by every command once config and flags are merged
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub root: PathBuf,
    pub network: String,
    pub format: OutputFormat,
}

impl Session {
    pub fn open_stores(&self) -> Result<(KeyStore, AddressBook)> {
        let keys = KeyStore::open(&self.root)
            .with_context(|| format!("Failed to open key store at {}", self.root.display()))?;
        let book = AddressBook::open(&self.root)
            .with_context(|| format!("Failed to open address book at {}", self.root.display()))?;
        Ok((keys, book))
    }
}

/// Source of interactive answers. Commands take this instead of talking to
/// the terminal directly.
pub trait Prompter {
    fn input(&mut self, prompt: &str) -> Result<String>;
    fn password(&mut self, prompt: &str) -> Result<String>;
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str) -> Result<String> {
        Ok(Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?)
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        Ok(Password::new().with_prompt(prompt).interact()?)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message.blue());
}
