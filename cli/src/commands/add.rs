use crate::commands::{print_success, Session};
use anyhow::{bail, Result};
use pocketbook_wallet::{checked_address, Address, AddressBook, KeyStore, NameRegistry};

/// Add an address book entry. The name must be unused by keys and entries.
pub fn add_address(
    keys: &KeyStore,
    book: &mut AddressBook,
    name: &str,
    address: &str,
) -> Result<Address> {
    let address = checked_address(address)?;

    if NameRegistry::new(keys, book).contains(name)? {
        bail!("{} is already present, please choose a different name", name);
    }

    book.add(name, address)?;
    Ok(address)
}

pub fn run(session: &Session, name: &str, address: &str) -> Result<()> {
    let (keys, mut book) = session.open_stores()?;
    let address = add_address(&keys, &mut book, name, address)?;
    print_success(&format!("Added '{}' ({}) to the address book", name, address));
    Ok(())
}
