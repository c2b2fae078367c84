use crate::commands::{print_success, print_warning, Prompter, Session};
use anyhow::{bail, Context, Result};
use pocketbook_wallet::{AddressBook, KeyStore, NameKind, NameRegistry};

const KEY_WARNING: &str = "\
You are about to delete the key {name} from the database. This is a PERMANENT change and
can not be reverted. This might mean that you lose access to funds forever.

If you want to continue please confirm by entering the address of the key you want to
remove below.";

/// Delete a key or an address book entry. Keys are only removed after the
/// user types the key's address back.
pub fn delete_entry(
    prompter: &mut dyn Prompter,
    keys: &mut KeyStore,
    book: &mut AddressBook,
    name: &str,
) -> Result<NameKind> {
    let kind = match NameRegistry::new(keys, book).classify(name)? {
        Some(kind) => kind,
        None => bail!("Unknown key or address: {}. Please check and try again", name),
    };

    let removed = match kind {
        NameKind::Key => {
            let address = keys
                .lookup_address(name)
                .with_context(|| format!("Unable to find key in store: {}", name))?;

            println!();
            print_warning("WARNING");
            println!("{}\n", KEY_WARNING.replace("{name}", name));
            let typed = prompter.input("Address (Base58)")?;
            if typed.trim() != address.to_string() {
                bail!(
                    "The input address for key {} does not match. Please double check and try again",
                    name
                );
            }

            keys.remove_key(name)?
        }
        NameKind::Address => book.remove(name)?,
    };

    if !removed {
        bail!("Failed to remove the specified key or address");
    }
    Ok(kind)
}

pub fn run(session: &Session, prompter: &mut dyn Prompter, name: &str) -> Result<()> {
    let (mut keys, mut book) = session.open_stores()?;
    delete_entry(prompter, &mut keys, &mut book, name)?;
    print_success(&format!("Deleted '{}'", name));
    Ok(())
}
