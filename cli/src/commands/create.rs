use crate::commands::{print_error, print_success, print_warning, Prompter, Session};
use anyhow::{Context, Result};
use pocketbook_wallet::{
    Address, AddressBook, Entity, KeyStore, NameRegistry, PasswordStrengthChecker, SecretEntity,
};

/// Ask for a key name until one is given that neither store uses
pub fn prompt_new_name(
    prompter: &mut dyn Prompter,
    keys: &KeyStore,
    book: &AddressBook,
) -> Result<String> {
    let registry = NameRegistry::new(keys, book);
    loop {
        let name = prompter.input("Enter name for key")?;
        let name = name.trim();
        if name.is_empty() {
            print_error("Key name must not be empty");
            continue;
        }
        if !KeyStore::is_valid_name(name) {
            print_error("Key name must not start with '.' or contain path separators or control characters");
            continue;
        }
        if registry.contains(name)? {
            print_error("Key name already exists");
            continue;
        }
        return Ok(name.to_string());
    }
}

/// Ask for a strong password, twice, until both entries match
pub fn prompt_new_password(prompter: &mut dyn Prompter) -> Result<String> {
    let checker = PasswordStrengthChecker::new();
    loop {
        let password = prompter.password("Enter password for key...")?;
        if !Entity::is_strong_password(&password) {
            print_error("Password too simple, try again");
            for suggestion in checker.check_strength(&password).suggestions {
                print_warning(&suggestion);
            }
            continue;
        }

        let confirm = prompter.password("Confirm password for key.")?;
        if password != confirm {
            print_error("Passwords did not match, try again");
            continue;
        }

        return Ok(password);
    }
}

/// Generate a new key and store it under a prompted name and password
pub fn create_key(
    prompter: &mut dyn Prompter,
    keys: &mut KeyStore,
    book: &AddressBook,
) -> Result<(String, Address)> {
    let name = prompt_new_name(prompter, keys, book)?;
    let password = prompt_new_password(prompter)?;

    let entity = Entity::generate();
    keys.add_key(&name, &password, &entity)
        .with_context(|| format!("Failed to store key '{}'", name))?;

    Ok((name, entity.address()))
}

pub fn run(session: &Session, prompter: &mut dyn Prompter) -> Result<()> {
    let (mut keys, book) = session.open_stores()?;
    let (name, address) = create_key(prompter, &mut keys, &book)?;
    print_success(&format!("Created key '{}' with address {}", name, address));
    Ok(())
}
