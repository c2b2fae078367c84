// Address Book
// Named third-party addresses, stored as a flat `name = "address"` table in
// <root>/addresses.toml. Entries keep file order.

use log::{debug, warn};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::address::Address;

/// File name of the address book inside the store root
pub const ADDRESS_BOOK_FILE_NAME: &str = "addresses.toml";

#[derive(Error, Debug)]
pub enum AddressBookError {
    #[error("Address already exists: {0}")]
    DuplicateName(String),

    #[error("Unable to lookup requested address: {0}")]
    NotFound(String),

    #[error("Invalid address book name '{0}'")]
    InvalidName(String),

    #[error("Address book {path} is corrupted: {reason}")]
    CorruptBook { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AddressBookError {
    pub fn is_corruption(&self) -> bool {
        matches!(self, AddressBookError::CorruptBook { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub name: String,
    pub address: Address,
}

#[derive(Debug)]
pub struct AddressBook {
    path: PathBuf,
    entries: Vec<AddressRecord>,
}

impl AddressBook {
    /// Load the address book under `root`. A missing file is an empty book;
    /// nothing is written until the first mutation.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, AddressBookError> {
        let path = root.as_ref().join(ADDRESS_BOOK_FILE_NAME);
        let entries = if path.exists() {
            Self::read(&path)?
        } else {
            Vec::new()
        };

        debug!(
            "Opened address book {} ({} entries)",
            path.display(),
            entries.len()
        );
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry names in file order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn records(&self) -> &[AddressRecord] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Address stored under `name`. Unlike the key store, an unknown name is
    /// an error: callers only look up names they already know exist.
    pub fn lookup_address(&self, name: &str) -> Result<Address, AddressBookError> {
        self.entry(name)
            .map(|e| e.address)
            .ok_or_else(|| AddressBookError::NotFound(name.to_string()))
    }

    pub fn add(&mut self, name: &str, address: Address) -> Result<(), AddressBookError> {
        if name.is_empty() || name.trim() != name {
            return Err(AddressBookError::InvalidName(name.to_string()));
        }
        if self.contains(name) {
            return Err(AddressBookError::DuplicateName(name.to_string()));
        }

        let mut staged = self.entries.clone();
        staged.push(AddressRecord {
            name: name.to_string(),
            address,
        });
        self.commit(staged)?;

        debug!("Added address book entry '{}'", name);
        Ok(())
    }

    /// Returns `false` when `old` is unknown or `new` is already taken
    pub fn rename(&mut self, old: &str, new: &str) -> Result<bool, AddressBookError> {
        if !self.contains(old) || self.contains(new) {
            return Ok(false);
        }
        if new.is_empty() || new.trim() != new {
            return Err(AddressBookError::InvalidName(new.to_string()));
        }

        let mut staged = self.entries.clone();
        for entry in staged.iter_mut().filter(|e| e.name == old) {
            entry.name = new.to_string();
        }
        self.commit(staged)?;

        debug!("Renamed address book entry '{}' to '{}'", old, new);
        Ok(true)
    }

    /// Returns `false` when `name` is unknown
    pub fn remove(&mut self, name: &str) -> Result<bool, AddressBookError> {
        if !self.contains(name) {
            return Ok(false);
        }

        let mut staged = self.entries.clone();
        staged.retain(|e| e.name != name);
        self.commit(staged)?;

        debug!("Removed address book entry '{}'", name);
        Ok(true)
    }

    fn entry(&self, name: &str) -> Option<&AddressRecord> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn commit(&mut self, staged: Vec<AddressRecord>) -> Result<(), AddressBookError> {
        self.write(&staged)?;
        self.entries = staged;
        Ok(())
    }

    fn read(path: &Path) -> Result<Vec<AddressRecord>, AddressBookError> {
        let corrupt = |reason: String| {
            warn!("Address book {} is corrupted: {}", path.display(), reason);
            AddressBookError::CorruptBook {
                path: path.to_path_buf(),
                reason,
            }
        };

        let contents = fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&contents).map_err(|e| corrupt(e.to_string()))?;

        table
            .into_iter()
            .map(|(name, value)| match value {
                toml::Value::String(encoded) => Address::parse(&encoded)
                    .map(|address| AddressRecord {
                        name: name.clone(),
                        address,
                    })
                    .map_err(|e| corrupt(format!("entry '{}': {}", name, e))),
                other => Err(corrupt(format!(
                    "entry '{}' is a {}, expected an address string",
                    name,
                    other.type_str()
                ))),
            })
            .collect()
    }

    fn write(&self, entries: &[AddressRecord]) -> Result<(), AddressBookError> {
        let table: toml::Table = entries
            .iter()
            .map(|e| (e.name.clone(), toml::Value::String(e.address.to_string())))
            .collect();
        let contents = toml::to_string(&table).map_err(|e| AddressBookError::CorruptBook {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("toml.tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!(
            "Flushed address book ({} entries) to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn address(seed: u8) -> Address {
        Address::from_public_key(&[seed; 33])
    }

    #[test]
    fn test_no_writing_on_empty_folder() {
        let temp_dir = TempDir::new().unwrap();
        let book = AddressBook::open(temp_dir.path()).unwrap();

        assert!(book.names().is_empty());
        assert!(!temp_dir.path().join(ADDRESS_BOOK_FILE_NAME).exists());
    }

    #[test]
    fn test_add_and_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = AddressBook::open(temp_dir.path()).unwrap();

        book.add("sample", address(1)).unwrap();
        assert_eq!(book.lookup_address("sample").unwrap(), address(1));
        assert!(matches!(
            book.add("sample", address(2)),
            Err(AddressBookError::DuplicateName(_))
        ));
        assert_eq!(book.lookup_address("sample").unwrap(), address(1));
    }

    #[test]
    fn test_unknown_lookup_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let book = AddressBook::open(temp_dir.path()).unwrap();

        let err = book.lookup_address("nobody").unwrap_err();
        assert_eq!(err.to_string(), "Unable to lookup requested address: nobody");
    }

    #[test]
    fn test_file_order_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = AddressBook::open(temp_dir.path()).unwrap();
        for (i, name) in ["zulu", "alpha", "mike"].iter().enumerate() {
            book.add(name, address(i as u8)).unwrap();
        }

        let reloaded = AddressBook::open(temp_dir.path()).unwrap();
        assert_eq!(reloaded.names(), vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_flat_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = AddressBook::open(temp_dir.path()).unwrap();
        book.add("sample", address(9)).unwrap();

        let contents = fs::read_to_string(temp_dir.path().join(ADDRESS_BOOK_FILE_NAME)).unwrap();
        let table: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(
            table["sample"].as_str(),
            Some(address(9).to_string().as_str())
        );
    }

    #[test]
    fn test_rename_and_remove_missing_return_false() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = AddressBook::open(temp_dir.path()).unwrap();
        book.add("a", address(1)).unwrap();
        book.add("b", address(2)).unwrap();

        assert!(!book.rename("missing", "c").unwrap());
        assert!(!book.rename("a", "b").unwrap());
        assert!(!book.remove("missing").unwrap());

        assert!(book.rename("a", "c").unwrap());
        assert_eq!(book.names(), vec!["c", "b"]);
        assert!(book.remove("b").unwrap());
        assert_eq!(book.names(), vec!["c"]);
    }

    #[test]
    fn test_rename_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = AddressBook::open(temp_dir.path()).unwrap();
        for (i, name) in ["a.b", "with \"quote\"", "1", "ünï", "x y"].iter().enumerate() {
            book.add(name, address(i as u8)).unwrap();
        }

        assert!(book.rename("a.b", "c.d").unwrap());

        let reloaded = AddressBook::open(temp_dir.path()).unwrap();
        assert_eq!(reloaded.lookup_address("c.d").unwrap(), address(0));
        assert!(matches!(
            reloaded.lookup_address("a.b"),
            Err(AddressBookError::NotFound(_))
        ));
        assert_eq!(
            reloaded.names(),
            vec!["c.d", "with \"quote\"", "1", "ünï", "x y"]
        );
    }

    #[test]
    fn test_remove_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = AddressBook::open(temp_dir.path()).unwrap();
        for (i, name) in ["zulu", "alpha", "mike"].iter().enumerate() {
            book.add(name, address(i as u8)).unwrap();
        }

        assert!(book.remove("alpha").unwrap());

        let reloaded = AddressBook::open(temp_dir.path()).unwrap();
        assert!(matches!(
            reloaded.lookup_address("alpha"),
            Err(AddressBookError::NotFound(_))
        ));
        assert_eq!(reloaded.lookup_address("mike").unwrap(), address(2));
        assert_eq!(reloaded.names(), vec!["zulu", "mike"]);
    }

    #[test]
    fn test_bad_entry_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(ADDRESS_BOOK_FILE_NAME),
            "sample = \"not-an-address\"\n",
        )
        .unwrap();

        let err = AddressBook::open(temp_dir.path()).unwrap_err();
        assert!(err.is_corruption());

        fs::write(temp_dir.path().join(ADDRESS_BOOK_FILE_NAME), "sample = 42\n").unwrap();
        assert!(AddressBook::open(temp_dir.path()).unwrap_err().is_corruption());
    }
}
