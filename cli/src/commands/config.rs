use crate::commands::print_success;
use crate::config::{Config, OutputFormat};
use anyhow::Result;
use colored::*;
use prettytable::{Cell, Row, Table};
use std::path::Path;

pub fn show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Table => {
            println!("\n{}", "Current Configuration".bold().green());
            println!("{}", "=".repeat(50));

            let mut table = Table::new();
            table.add_row(Row::new(vec![
                Cell::new("Setting").style_spec("bFg"),
                Cell::new("Value").style_spec("bFg"),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Default Network"),
                Cell::new(&config.default_network).style_spec("Fy"),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Key Store"),
                Cell::new(&config.store_root()?.display().to_string()),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Timeout"),
                Cell::new(&format!("{} seconds", config.timeout)),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Confirmation Timeout"),
                Cell::new(&format!("{} seconds", config.confirmation_timeout)),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Output Format"),
                Cell::new(&format!("{:?}", config.output_format)),
            ]));
            for (name, network) in &config.networks {
                table.add_row(Row::new(vec![
                    Cell::new(&format!("Network {}", name)),
                    Cell::new(&network.rpc_url),
                ]));
            }
            table.printstd();

            println!("\nConfig file: {}", Config::config_path()?.display().to_string().cyan());
        }
    }

    Ok(())
}

/// Update one setting in the configuration file at `path`
pub fn set(path: &Path, key: &str, value: &str) -> Result<Config> {
    let mut config = Config::load_from(path)?;
    config.set(key, value)?;
    config.save_to(path)?;

    print_success(&format!("Set {} to: {}", key, value));
    Ok(config)
}
