//! Transfer resolution
//!
//! Turns a transfer request expressed in names (destination, signers and an
//! optional paying account) into a [`TransferIntent`] with concrete addresses
//! and a fee-accounted total. Resolution only reads the key store and the
//! address book; unsealing keys, signing and submission happen elsewhere.

use log::debug;
use std::collections::HashSet;
use thiserror::Error;

use crate::address::{checked_address, Address, AddressError};
use crate::address_book::{AddressBook, AddressBookError};
use crate::key_store::KeyStore;
use crate::registry::{NameKind, NameRegistry, RegistryError};

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("{0}")]
    InvalidDestination(#[from] AddressError),

    #[error("Transfer amount must be at least one canonical unit")]
    InvalidAmount,

    #[error("Charge rate must be at least 1")]
    InvalidChargeRate,

    #[error("Unknown key: {0}")]
    UnknownSigner(String),

    #[error("Signer listed more than once: {0}")]
    DuplicateSigner(String),

    #[error("Unknown from address: {0}")]
    UnknownFrom(String),

    #[error("Unable to determine from account: no signers given")]
    NoSigners,

    #[error("Unable to determine from account: {0} signers require an explicit from account")]
    AmbiguousFrom(usize),

    #[error("Fee or total for this transfer exceeds the maximum representable amount")]
    Overflow,

    #[error(transparent)]
    Collision(#[from] RegistryError),

    #[error(transparent)]
    AddressBook(#[from] AddressBookError),
}

impl TransferError {
    pub fn is_corruption(&self) -> bool {
        match self {
            TransferError::Collision(e) => e.is_corruption(),
            TransferError::AddressBook(e) => e.is_corruption(),
            _ => false,
        }
    }
}

/// A transfer as requested by the user, amounts in canonical units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Address book name, key name or raw address
    pub destination: String,
    pub amount: u64,
    pub charge_rate: u64,
    pub signers: Vec<String>,
    pub from: Option<String>,
}

/// Fully resolved transfer, ready to be shown for confirmation and signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub destination_address: Address,
    /// Set when the destination was given by name
    pub destination_display_name: Option<String>,
    pub amount: u64,
    pub charge_rate: u64,
    pub signer_names: Vec<String>,
    /// Paying account
    pub from_name: String,
    pub from_address: Address,
    pub required_signatures: u64,
    pub fee: u64,
    /// amount + fee
    pub total: u64,
}

impl TransferIntent {
    /// Destination as shown in the transfer summary, `name: address` when a
    /// name was used
    pub fn destination_label(&self) -> String {
        match &self.destination_display_name {
            Some(name) => format!("{}: {}", name, self.destination_address),
            None => self.destination_address.to_string(),
        }
    }
}

pub struct TransferResolver<'a> {
    keys: &'a KeyStore,
    book: &'a AddressBook,
}

impl<'a> TransferResolver<'a> {
    pub fn new(keys: &'a KeyStore, book: &'a AddressBook) -> Self {
        Self { keys, book }
    }

    pub fn resolve(&self, request: &TransferRequest) -> Result<TransferIntent, TransferError> {
        if request.amount == 0 {
            return Err(TransferError::InvalidAmount);
        }
        if request.charge_rate == 0 {
            return Err(TransferError::InvalidChargeRate);
        }

        let (destination_address, destination_display_name) =
            match self.lookup(&request.destination)? {
                Some((_, address)) => (address, Some(request.destination.clone())),
                None => (checked_address(&request.destination)?, None),
            };

        let mut seen = HashSet::new();
        for signer in &request.signers {
            if !matches!(self.lookup(signer)?, Some((NameKind::Key, _))) {
                return Err(TransferError::UnknownSigner(signer.clone()));
            }
            if !seen.insert(signer.as_str()) {
                return Err(TransferError::DuplicateSigner(signer.clone()));
            }
        }

        let from_name = match (request.signers.as_slice(), &request.from) {
            ([], _) => return Err(TransferError::NoSigners),
            ([only], None) => only.clone(),
            (_, Some(from)) => from.clone(),
            (signers, None) => return Err(TransferError::AmbiguousFrom(signers.len())),
        };
        let from_address = match self.lookup(&from_name)? {
            Some((_, address)) => address,
            None => return Err(TransferError::UnknownFrom(from_name)),
        };

        let required_signatures = request.signers.len() as u64;
        let fee = required_signatures
            .checked_mul(request.charge_rate)
            .ok_or(TransferError::Overflow)?;
        let total = request
            .amount
            .checked_add(fee)
            .ok_or(TransferError::Overflow)?;

        debug!(
            "Resolved transfer from '{}' with {} signer(s): amount {} fee {} total {}",
            from_name, required_signatures, request.amount, fee, total
        );

        Ok(TransferIntent {
            destination_address,
            destination_display_name,
            amount: request.amount,
            charge_rate: request.charge_rate,
            signer_names: request.signers.clone(),
            from_name,
            from_address,
            required_signatures,
            fee,
            total,
        })
    }

    fn lookup(&self, name: &str) -> Result<Option<(NameKind, Address)>, TransferError> {
        let registry = NameRegistry::new(self.keys, self.book);
        Ok(match registry.classify(name)? {
            Some(NameKind::Key) => self.keys.lookup_address(name).map(|a| (NameKind::Key, a)),
            Some(NameKind::Address) => Some((NameKind::Address, self.book.lookup_address(name)?)),
            None => None,
        })
    }
}
