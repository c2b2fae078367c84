use crate::commands::{Prompter, Session};
use crate::config::OutputFormat;
use anyhow::{Context, Result};
use pocketbook_wallet::{Entity, KeyStore, SecretEntity};

/// Unseal a stored key with a prompted password
pub fn unseal_key(prompter: &mut dyn Prompter, keys: &KeyStore, name: &str) -> Result<Entity> {
    let password = prompter.password(&format!("Enter password for key {}", name))?;
    keys.load_key(name, &password)
        .with_context(|| format!("Failed to unseal key '{}'", name))
}

pub fn run(session: &Session, prompter: &mut dyn Prompter, name: &str) -> Result<()> {
    let (keys, _) = session.open_stores()?;
    let entity = unseal_key(prompter, &keys, name)?;

    match session.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "name": name,
                    "address": entity.address(),
                    "public_key": entity.public_key_base64(),
                    "public_key_hex": entity.public_key_hex(),
                }))?
            );
        }
        OutputFormat::Table => {
            println!("Address....: {}", entity.address());
            println!("Public Key.: {}", entity.public_key_base64());
        }
    }

    Ok(())
}
