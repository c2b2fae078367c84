// Name registry
// Read-only view across the key store and the address book. A name may live
// in at most one of them; finding it in both means the stores are corrupted.

use std::fmt;
use thiserror::Error;

use crate::address::Address;
use crate::address_book::AddressBook;
use crate::key_store::KeyStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Corrupted key store: '{0}' is both a key and an address book entry")]
    NameCollision(String),
}

impl RegistryError {
    pub fn is_corruption(&self) -> bool {
        true
    }
}

/// Which store a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Key,
    Address,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Key => f.write_str("key"),
            NameKind::Address => f.write_str("addr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    pub name: String,
    pub kind: NameKind,
    pub address: Address,
}

pub struct NameRegistry<'a> {
    keys: &'a KeyStore,
    book: &'a AddressBook,
}

impl<'a> NameRegistry<'a> {
    pub fn new(keys: &'a KeyStore, book: &'a AddressBook) -> Self {
        Self { keys, book }
    }

    /// Store holding `name`, `None` if neither does
    pub fn classify(&self, name: &str) -> Result<Option<NameKind>, RegistryError> {
        match (self.keys.contains(name), self.book.contains(name)) {
            (true, true) => {
                log::warn!("Name '{}' is present in both the key store and the address book", name);
                Err(RegistryError::NameCollision(name.to_string()))
            }
            (true, false) => Ok(Some(NameKind::Key)),
            (false, true) => Ok(Some(NameKind::Address)),
            (false, false) => Ok(None),
        }
    }

    pub fn contains(&self, name: &str) -> Result<bool, RegistryError> {
        Ok(self.classify(name)?.is_some())
    }

    /// Fail on the first name present in both stores
    pub fn ensure_consistent(&self) -> Result<(), RegistryError> {
        for record in self.keys.records() {
            self.classify(&record.name)?;
        }
        Ok(())
    }

    /// Keys in index order followed by address book entries in file order
    pub fn entries(&self) -> Result<Vec<NamedEntry>, RegistryError> {
        self.ensure_consistent()?;

        let keys = self.keys.records().iter().map(|r| NamedEntry {
            name: r.name.clone(),
            kind: NameKind::Key,
            address: r.address,
        });
        let addresses = self.book.records().iter().map(|r| NamedEntry {
            name: r.name.clone(),
            kind: NameKind::Address,
            address: r.address,
        });

        Ok(keys.chain(addresses).collect())
    }
}
