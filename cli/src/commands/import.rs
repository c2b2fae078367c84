use crate::commands::create::{prompt_new_name, prompt_new_password};
use crate::commands::{print_error, print_success, Prompter, Session};
use anyhow::{Context, Result};
use pocketbook_wallet::{Address, AddressBook, Entity, KeyStore, SecretEntity};

/// Ask for a private key (hex or base64) until one parses and the user
/// confirms the address it derives
pub fn prompt_private_key(prompter: &mut dyn Prompter) -> Result<Entity> {
    loop {
        let encoded = prompter.password("Enter private key (hex or base64 encoded)...")?;
        let entity = match Entity::from_encoded(&encoded) {
            Ok(entity) => entity,
            Err(_) => {
                print_error(
                    "Given key is not an ecdsa secp256k1 private key encoded as either hex or base64!",
                );
                continue;
            }
        };

        println!();
        println!("Associated address: {}", entity.address());
        println!("Associated public key [hex]: {}", entity.public_key_hex());
        println!("Associated public key [b64]: {}", entity.public_key_base64());

        if prompter.confirm("Is above correct?")? {
            return Ok(entity);
        }
        println!("\n=====================================\n");
    }
}

pub fn import_key(
    prompter: &mut dyn Prompter,
    keys: &mut KeyStore,
    book: &AddressBook,
) -> Result<(String, Address)> {
    let name = prompt_new_name(prompter, keys, book)?;
    let entity = prompt_private_key(prompter)?;
    let password = prompt_new_password(prompter)?;

    keys.add_key(&name, &password, &entity)
        .with_context(|| format!("Failed to store key '{}'", name))?;

    Ok((name, entity.address()))
}

pub fn run(session: &Session, prompter: &mut dyn Prompter) -> Result<()> {
    let (mut keys, book) = session.open_stores()?;
    let (name, address) = import_key(prompter, &mut keys, &book)?;
    print_success(&format!("Imported key '{}' with address {}", name, address));
    Ok(())
}
