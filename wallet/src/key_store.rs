// Key Store
// Named, password-encrypted private keys kept under a store root:
//
//   <root>/index.toml   ordered [[key]] records of { name, address }
//   <root>/<name>.key   encrypted secret for each record
//
// Every mutation stages the new index in memory and replaces index.toml in a
// single write.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::address::Address;
use crate::entity::{EntityError, SecretEntity};

/// File name of the key index inside the store root
pub const INDEX_FILE_NAME: &str = "index.toml";

/// Extension of the per-key encrypted files
pub const KEY_FILE_EXTENSION: &str = "key";

#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("Duplicate key name found: {0}")]
    DuplicateKeyName(String),

    #[error("Unable to find key in store: {0}")]
    KeyNotFound(String),

    #[error("Unable to decode key '{0}' from key store (wrong password or corrupted key file)")]
    UnableToDecodeKey(String),

    #[error("Key store corrupted: key '{name}' is indexed but {path} is missing")]
    MissingKeyFile { name: String, path: PathBuf },

    #[error("Key file {0} already exists but is not in the index, refusing to overwrite it")]
    OrphanKeyFile(PathBuf),

    #[error("Invalid key name '{0}': names must be non-empty and usable as a file name")]
    InvalidKeyName(String),

    #[error("Key store index {path} is corrupted: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Unable to store key: {0}")]
    Entity(#[from] EntityError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyStoreError {
    /// Errors that indicate on-disk state no longer matches the index and
    /// need manual inspection rather than a retry.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            KeyStoreError::UnableToDecodeKey(_)
                | KeyStoreError::MissingKeyFile { .. }
                | KeyStoreError::OrphanKeyFile(_)
                | KeyStoreError::CorruptIndex { .. }
        )
    }
}

/// Index entry for a stored key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub name: String,
    pub address: Address,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KeyIndex {
    #[serde(default)]
    key: Vec<KeyRecord>,
}

/// On-disk store of named, encrypted keys
#[derive(Debug)]
pub struct KeyStore {
    root: PathBuf,
    index_path: PathBuf,
    index: KeyIndex,
}

impl KeyStore {
    /// Open the store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, KeyStoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let index_path = root.join(INDEX_FILE_NAME);
        let index = if index_path.exists() {
            Self::read_index(&index_path)?
        } else {
            KeyIndex::default()
        };

        debug!(
            "Opened key store at {} ({} keys)",
            root.display(),
            index.key.len()
        );

        Ok(Self {
            root,
            index_path,
            index,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key names in index order
    pub fn list_keys(&self) -> Vec<String> {
        self.index.key.iter().map(|r| r.name.clone()).collect()
    }

    /// Index records in index order
    pub fn records(&self) -> &[KeyRecord] {
        &self.index.key
    }

    pub fn contains(&self, name: &str) -> bool {
        self.record(name).is_some()
    }

    /// Address of a stored key, `None` if no key has this name
    pub fn lookup_address(&self, name: &str) -> Option<Address> {
        self.record(name).map(|r| r.address)
    }

    /// Decrypt a stored key. The decrypted key must re-derive the indexed
    /// address, otherwise the password or the key file is wrong.
    pub fn load_key<E: SecretEntity>(&self, name: &str, password: &str) -> Result<E, KeyStoreError> {
        let record = self
            .record(name)
            .ok_or_else(|| KeyStoreError::KeyNotFound(name.to_string()))?;

        let path = self.key_path(name);
        if !path.is_file() {
            warn!("Key '{}' is indexed but {} is missing", name, path.display());
            return Err(KeyStoreError::MissingKeyFile {
                name: name.to_string(),
                path,
            });
        }

        let reader = BufReader::new(File::open(&path)?);
        let entity = E::load(reader, password).map_err(|e| match e {
            EntityError::Io(io) => KeyStoreError::Io(io),
            other => {
                debug!("Failed to unseal key '{}': {}", name, other);
                KeyStoreError::UnableToDecodeKey(name.to_string())
            }
        })?;

        let derived = entity.address();
        if !bool::from(derived.as_bytes()[..].ct_eq(&record.address.as_bytes()[..])) {
            warn!("Key '{}' decrypted to an address that does not match the index", name);
            return Err(KeyStoreError::UnableToDecodeKey(name.to_string()));
        }

        Ok(entity)
    }

    /// Encrypt and store a new key. The key file is written before the index
    /// so an interrupted add leaves at worst an unindexed key file.
    pub fn add_key<E: SecretEntity>(
        &mut self,
        name: &str,
        password: &str,
        entity: &E,
    ) -> Result<(), KeyStoreError> {
        validate_name(name)?;
        if self.contains(name) {
            return Err(KeyStoreError::DuplicateKeyName(name.to_string()));
        }

        let path = self.key_path(name);
        if path.exists() {
            return Err(KeyStoreError::OrphanKeyFile(path));
        }

        if let Err(e) = write_key_file(&path, password, entity) {
            // nothing references the partial file yet
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        let mut staged = self.index.clone();
        staged.key.push(KeyRecord {
            name: name.to_string(),
            address: entity.address(),
        });
        self.commit(staged)?;

        debug!("Added key '{}'", name);
        Ok(())
    }

    /// Rename a key, keeping its address and index position. Returns `false`
    /// when `old` does not exist or `new` is already taken.
    pub fn rename_key(&mut self, old: &str, new: &str) -> Result<bool, KeyStoreError> {
        if !self.contains(old) || self.contains(new) {
            return Ok(false);
        }
        validate_name(new)?;

        let old_path = self.key_path(old);
        let new_path = self.key_path(new);
        if !old_path.is_file() {
            warn!("Key '{}' is indexed but {} is missing", old, old_path.display());
            return Err(KeyStoreError::MissingKeyFile {
                name: old.to_string(),
                path: old_path,
            });
        }
        if new_path.exists() {
            return Err(KeyStoreError::OrphanKeyFile(new_path));
        }

        let mut staged = self.index.clone();
        for record in staged.key.iter_mut().filter(|r| r.name == old) {
            record.name = new.to_string();
        }

        fs::rename(&old_path, &new_path)?;
        if let Err(e) = self.commit(staged) {
            // put the key file back so the on-disk index still matches
            if let Err(revert) = fs::rename(&new_path, &old_path) {
                warn!(
                    "Unable to restore {} after failed index write: {}",
                    old_path.display(),
                    revert
                );
            }
            return Err(e);
        }

        debug!("Renamed key '{}' to '{}'", old, new);
        Ok(true)
    }

    /// Delete a key and its key file. Returns `false` when no key has this
    /// name; an indexed key without a key file is reported as corruption.
    pub fn remove_key(&mut self, name: &str) -> Result<bool, KeyStoreError> {
        if !self.contains(name) {
            return Ok(false);
        }

        let path = self.key_path(name);
        if !path.is_file() {
            warn!("Key '{}' is indexed but {} is missing", name, path.display());
            return Err(KeyStoreError::MissingKeyFile {
                name: name.to_string(),
                path,
            });
        }

        let mut staged = self.index.clone();
        staged.key.retain(|r| r.name != name);

        // index first: a failure after this point leaves an unindexed file,
        // never an index entry without a key
        self.commit(staged)?;
        fs::remove_file(&path)?;

        debug!("Removed key '{}'", name);
        Ok(true)
    }

    /// Whether `name` can be used for a new key. Names map to file names in
    /// the store root, so path separators and leading dots are refused.
    pub fn is_valid_name(name: &str) -> bool {
        validate_name(name).is_ok()
    }

    /// Path of the encrypted key file for `name`
    pub fn key_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, KEY_FILE_EXTENSION))
    }

    fn record(&self, name: &str) -> Option<&KeyRecord> {
        self.index.key.iter().find(|r| r.name == name)
    }

    fn commit(&mut self, staged: KeyIndex) -> Result<(), KeyStoreError> {
        write_index(&self.index_path, &staged)?;
        self.index = staged;
        Ok(())
    }

    fn read_index(path: &Path) -> Result<KeyIndex, KeyStoreError> {
        let corrupt = |reason: String| {
            warn!("Key store index {} is corrupted: {}", path.display(), reason);
            KeyStoreError::CorruptIndex {
                path: path.to_path_buf(),
                reason,
            }
        };

        let contents = fs::read_to_string(path)?;
        let index: KeyIndex = toml::from_str(&contents).map_err(|e| corrupt(e.to_string()))?;

        for (i, record) in index.key.iter().enumerate() {
            if index.key[..i].iter().any(|r| r.name == record.name) {
                return Err(corrupt(format!("key '{}' is listed twice", record.name)));
            }
        }

        Ok(index)
    }
}

fn validate_name(name: &str) -> Result<(), KeyStoreError> {
    let invalid = name.is_empty()
        || name.trim() != name
        || name.starts_with('.')
        || name.chars().any(|c| c == '/' || c == '\\' || c.is_control());

    if invalid {
        Err(KeyStoreError::InvalidKeyName(name.to_string()))
    } else {
        Ok(())
    }
}

fn write_key_file<E: SecretEntity>(
    path: &Path,
    password: &str,
    entity: &E,
) -> Result<(), KeyStoreError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut writer = BufWriter::new(options.open(path)?);
    entity.dump(&mut writer, password)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Replace the index file: write a temporary file then rename it into place
fn write_index(path: &Path, index: &KeyIndex) -> Result<(), KeyStoreError> {
    let contents = toml::to_string(index).map_err(|e| KeyStoreError::CorruptIndex {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let temp_path = path.with_extension("toml.tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;

    debug!("Flushed key index ({} keys) to {}", index.key.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use tempfile::TempDir;

    const PASSWORD: &str = "Fetch!Ai-ToTh3M00n!";

    #[test]
    fn test_open_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("store");

        let store = KeyStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(store.list_keys().is_empty());
        // nothing is written until the first mutation
        assert!(!root.join(INDEX_FILE_NAME).exists());
    }

    #[test]
    fn test_open_existing_root() {
        let temp_dir = TempDir::new().unwrap();
        KeyStore::open(temp_dir.path()).unwrap();
        KeyStore::open(temp_dir.path()).unwrap();
    }

    #[test]
    fn test_index_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = KeyStore::open(temp_dir.path()).unwrap();
        let entity = Entity::generate();
        store.add_key("sample", PASSWORD, &entity).unwrap();

        let contents = fs::read_to_string(temp_dir.path().join(INDEX_FILE_NAME)).unwrap();
        let value: toml::Value = toml::from_str(&contents).unwrap();
        let keys = value["key"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0]["name"].as_str(), Some("sample"));
        assert_eq!(
            keys[0]["address"].as_str(),
            Some(entity.address().to_string().as_str())
        );
    }

    #[test]
    fn test_invalid_names_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = KeyStore::open(temp_dir.path()).unwrap();
        let entity = Entity::generate();

        for name in ["", "../escape", "a/b", ".hidden", " padded "] {
            assert!(matches!(
                store.add_key(name, PASSWORD, &entity),
                Err(KeyStoreError::InvalidKeyName(_))
            ));
        }
        assert!(store.list_keys().is_empty());
        assert!(!KeyStore::is_valid_name("tab\tname"));
        assert!(KeyStore::is_valid_name("savings-2"));
    }

    #[test]
    fn test_duplicate_index_entries_are_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let address = Entity::generate().address();
        let contents = format!(
            "[[key]]\nname = \"dup\"\naddress = \"{0}\"\n\n[[key]]\nname = \"dup\"\naddress = \"{0}\"\n",
            address
        );
        fs::write(temp_dir.path().join(INDEX_FILE_NAME), contents).unwrap();

        let err = KeyStore::open(temp_dir.path()).unwrap_err();
        assert!(matches!(err, KeyStoreError::CorruptIndex { .. }));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_unparseable_index_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(INDEX_FILE_NAME), "[[key]\nname = ").unwrap();

        assert!(matches!(
            KeyStore::open(temp_dir.path()),
            Err(KeyStoreError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn test_add_refuses_orphan_key_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = KeyStore::open(temp_dir.path()).unwrap();
        fs::write(store.key_path("orphan"), b"left behind").unwrap();

        let err = store
            .add_key("orphan", PASSWORD, &Entity::generate())
            .unwrap_err();
        assert!(matches!(err, KeyStoreError::OrphanKeyFile(_)));
        assert_eq!(fs::read(store.key_path("orphan")).unwrap(), b"left behind");
        assert!(!store.contains("orphan"));
    }

    #[test]
    fn test_rename_keeps_index_position() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = KeyStore::open(temp_dir.path()).unwrap();
        for name in ["first", "second", "third"] {
            store.add_key(name, PASSWORD, &Entity::generate()).unwrap();
        }

        assert!(store.rename_key("second", "middle").unwrap());
        assert_eq!(store.list_keys(), vec!["first", "middle", "third"]);
    }

    #[test]
    fn test_rename_refuses_existing_target_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = KeyStore::open(temp_dir.path()).unwrap();
        store.add_key("key", PASSWORD, &Entity::generate()).unwrap();
        fs::write(store.key_path("taken"), b"stray").unwrap();

        assert!(matches!(
            store.rename_key("key", "taken"),
            Err(KeyStoreError::OrphanKeyFile(_))
        ));
        assert!(store.contains("key"));
        assert!(store.key_path("key").is_file());
    }
}
