use crate::commands::{print_success, Session};
use anyhow::{bail, Result};
use pocketbook_wallet::{AddressBook, KeyStore, NameKind, NameRegistry};

/// Rename a key or an address book entry, whichever holds `old`
pub fn rename_entry(
    keys: &mut KeyStore,
    book: &mut AddressBook,
    old: &str,
    new: &str,
) -> Result<NameKind> {
    let registry = NameRegistry::new(keys, book);
    if registry.contains(new)? {
        bail!(
            "{} is already present, please choose a different destination name",
            new
        );
    }

    let kind = match registry.classify(old)? {
        Some(kind) => kind,
        None => bail!(
            "{} doesn't appear to be a valid key or address name, please check and try again",
            old
        ),
    };

    let renamed = match kind {
        NameKind::Key => keys.rename_key(old, new)?,
        NameKind::Address => book.rename(old, new)?,
    };
    if !renamed {
        bail!("Failed to rename {} to {}", old, new);
    }

    Ok(kind)
}

pub fn run(session: &Session, old: &str, new: &str) -> Result<()> {
    let (mut keys, mut book) = session.open_stores()?;
    let kind = rename_entry(&mut keys, &mut book, old, new)?;
    let what = match kind {
        NameKind::Key => "key",
        NameKind::Address => "address",
    };
    print_success(&format!("Renamed {} '{}' to '{}'", what, old, new));
    Ok(())
}
