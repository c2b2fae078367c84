// Pocketbook Wallet Library
//
// Local key store, address book and transfer resolution for the pocketbook
// command line wallet.

// Enforce panic-free code in production
#![cfg_attr(not(test), warn(clippy::unwrap_used))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), warn(clippy::panic))]
// Test-specific allows
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod address;
pub mod address_book;
pub mod amount;
pub mod entity;
pub mod key_store;
pub mod password_strength;
pub mod registry;
pub mod transaction;
pub mod transfer;

// Re-exports
pub use address::{checked_address, Address, AddressError};
pub use address_book::{AddressBook, AddressBookError, AddressRecord};
pub use amount::{
    format_amount, format_canonical, from_canonical, parse_amount, to_canonical, ConversionError,
};
pub use entity::{Entity, EntityError, SecretEntity};
pub use key_store::{KeyRecord, KeyStore, KeyStoreError};
pub use password_strength::{PasswordScore, PasswordStrength, PasswordStrengthChecker};
pub use registry::{NameKind, NameRegistry, NamedEntry, RegistryError};
pub use transaction::{TransactionError, TransferTx, TxSignature};
pub use transfer::{TransferError, TransferIntent, TransferRequest, TransferResolver};

/// Name of the per-user directory holding the key store and address book.
pub const DEFAULT_ROOT_DIR_NAME: &str = ".pocketbook";
