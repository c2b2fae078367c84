// Signing entities and their password-encrypted on-disk form
// secp256k1 private keys, sealed with Argon2id + AES-256-GCM

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use thiserror::Error;
use zeroize::Zeroize;

use crate::address::Address;
use crate::password_strength::PasswordStrengthChecker;

/// Current encrypted key file format version
pub const KEY_FILE_VERSION: u32 = 1;

const KDF_NAME: &str = "argon2id";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum EntityError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Invalid key encoding: {0}")]
    InvalidEncoding(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption failed (wrong password or corrupted key file)")]
    Decryption,

    #[error("Malformed key file: {0}")]
    Format(String),

    #[error("Unsupported key file version {0}")]
    UnsupportedVersion(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identity whose secret can be sealed to and unsealed from a stream.
///
/// The key store is generic over this so it never depends on a concrete
/// signature scheme.
pub trait SecretEntity: Sized {
    /// Address derived from the entity's public key
    fn address(&self) -> Address;

    /// Encrypt the secret with `password` and write it to `writer`
    fn dump<W: Write>(&self, writer: W, password: &str) -> Result<(), EntityError>;

    /// Read and decrypt a secret previously written by [`SecretEntity::dump`]
    fn load<R: Read>(reader: R, password: &str) -> Result<Self, EntityError>;

    /// Password policy applied before a secret is sealed
    fn is_strong_password(password: &str) -> bool;
}

/// secp256k1 signing identity
#[derive(Clone)]
pub struct Entity {
    secret: SecretKey,
    public: PublicKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncryptedKeyFile {
    version: u32,
    kdf: String,
    salt: String,
    nonce: String,
    ciphertext: String,
}

impl Entity {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut secp256k1::rand::thread_rng());
        Self { secret, public }
    }

    /// Build from raw 32-byte secret key material
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, EntityError> {
        let secret =
            SecretKey::from_slice(bytes).map_err(|e| EntityError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(Self { secret, public })
    }

    pub fn from_hex(encoded: &str) -> Result<Self, EntityError> {
        let mut bytes = hex::decode(encoded.trim())
            .map_err(|e| EntityError::InvalidEncoding(e.to_string()))?;
        let entity = Self::from_secret_bytes(&bytes);
        bytes.zeroize();
        entity
    }

    pub fn from_base64(encoded: &str) -> Result<Self, EntityError> {
        let mut bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| EntityError::InvalidEncoding(e.to_string()))?;
        let entity = Self::from_secret_bytes(&bytes);
        bytes.zeroize();
        entity
    }

    /// Import a private key given either as hex or as base64
    pub fn from_encoded(encoded: &str) -> Result<Self, EntityError> {
        Self::from_hex(encoded).or_else(|_| Self::from_base64(encoded))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Compressed public key, hex encoded
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.serialize())
    }

    /// Compressed public key, base64 encoded
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.public.serialize())
    }

    /// ECDSA signature (compact form) over a 32 byte digest
    pub fn sign_digest(&self, digest: &[u8; 32]) -> [u8; 64] {
        let message = Message::from_digest(*digest);
        Secp256k1::signing_only()
            .sign_ecdsa(&message, &self.secret)
            .serialize_compact()
    }

    /// Verify a compact signature produced by [`Entity::sign_digest`]
    pub fn verify_digest(public_key: &PublicKey, digest: &[u8; 32], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_compact(signature) else {
            return false;
        };
        let message = Message::from_digest(*digest);
        Secp256k1::verification_only()
            .verify_ecdsa(&message, &signature, public_key)
            .is_ok()
    }

    fn derive_cipher(password: &str, salt: &[u8]) -> Result<Aes256Gcm, EntityError> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| EntityError::KeyDerivation(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| EntityError::Encryption(e.to_string()));
        key.zeroize();
        cipher
    }
}

impl SecretEntity for Entity {
    fn address(&self) -> Address {
        Address::from_public_key(&self.public.serialize())
    }

    fn dump<W: Write>(&self, mut writer: W, password: &str) -> Result<(), EntityError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let cipher = Self::derive_cipher(password, &salt)?;

        let mut plaintext = self.secret.secret_bytes();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), &plaintext[..])
            .map_err(|e| EntityError::Encryption(e.to_string()));
        plaintext.zeroize();

        let file = EncryptedKeyFile {
            version: KEY_FILE_VERSION,
            kdf: KDF_NAME.to_string(),
            salt: hex::encode(salt),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext?),
        };

        serde_json::to_writer_pretty(&mut writer, &file)
            .map_err(|e| EntityError::Format(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }

    fn load<R: Read>(reader: R, password: &str) -> Result<Self, EntityError> {
        let file: EncryptedKeyFile =
            serde_json::from_reader(reader).map_err(|e| EntityError::Format(e.to_string()))?;

        if file.version != KEY_FILE_VERSION {
            return Err(EntityError::UnsupportedVersion(file.version));
        }
        if file.kdf != KDF_NAME {
            return Err(EntityError::Format(format!("unknown kdf '{}'", file.kdf)));
        }

        let decode = |field: &str, value: &str| {
            hex::decode(value).map_err(|e| EntityError::Format(format!("{}: {}", field, e)))
        };
        let salt = decode("salt", &file.salt)?;
        let nonce = decode("nonce", &file.nonce)?;
        let ciphertext = decode("ciphertext", &file.ciphertext)?;

        if nonce.len() != NONCE_LEN {
            return Err(EntityError::Format(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }

        let cipher = Self::derive_cipher(password, &salt)?;
        let mut plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), &ciphertext[..])
            .map_err(|_| EntityError::Decryption)?;

        let entity = Self::from_secret_bytes(&plaintext);
        plaintext.zeroize();
        entity
    }

    fn is_strong_password(password: &str) -> bool {
        PasswordStrengthChecker::new().is_strong(password)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.secret == other.secret
    }
}

impl Eq for Entity {}

// Never print key material
impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "Fetch!Ai-ToTh3M00n!";

    #[test]
    fn test_dump_load_round_trip() {
        let entity = Entity::generate();

        let mut blob = Vec::new();
        entity.dump(&mut blob, PASSWORD).unwrap();

        let recovered = Entity::load(blob.as_slice(), PASSWORD).unwrap();
        assert_eq!(recovered, entity);
        assert_eq!(recovered.address(), entity.address());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let entity = Entity::generate();

        let mut blob = Vec::new();
        entity.dump(&mut blob, PASSWORD).unwrap();

        let result = Entity::load(blob.as_slice(), "Wr0ng!Password-Here");
        assert!(matches!(result, Err(EntityError::Decryption)));
    }

    #[test]
    fn test_blob_does_not_contain_plaintext_secret() {
        let entity = Entity::generate();
        let secret_hex = hex::encode(entity.secret.secret_bytes());

        let mut blob = Vec::new();
        entity.dump(&mut blob, PASSWORD).unwrap();
        let contents = String::from_utf8(blob).unwrap();

        assert!(!contents.contains(&secret_hex));
        assert!(contents.contains("ciphertext"));
        assert!(contents.contains(KDF_NAME));
    }

    #[test]
    fn test_tampered_blob_rejected() {
        let entity = Entity::generate();

        let mut blob = Vec::new();
        entity.dump(&mut blob, PASSWORD).unwrap();

        let mut file: EncryptedKeyFile = serde_json::from_slice(&blob).unwrap();
        let mut ciphertext = hex::decode(&file.ciphertext).unwrap();
        ciphertext[0] ^= 0x01;
        file.ciphertext = hex::encode(ciphertext);
        let tampered = serde_json::to_vec(&file).unwrap();

        assert!(matches!(
            Entity::load(tampered.as_slice(), PASSWORD),
            Err(EntityError::Decryption)
        ));
    }

    #[test]
    fn test_garbage_blob_is_format_error() {
        assert!(matches!(
            Entity::load(&b"not json"[..], PASSWORD),
            Err(EntityError::Format(_))
        ));
    }

    #[test]
    fn test_import_hex_and_base64() {
        let entity = Entity::generate();
        let bytes = entity.secret.secret_bytes();

        let from_hex = Entity::from_encoded(&hex::encode(bytes)).unwrap();
        let from_b64 = Entity::from_encoded(&BASE64.encode(bytes)).unwrap();

        assert_eq!(from_hex, entity);
        assert_eq!(from_b64, entity);
        assert!(Entity::from_encoded("definitely not a key").is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let entity = Entity::generate();
        let digest = [42u8; 32];

        let signature = entity.sign_digest(&digest);
        assert!(Entity::verify_digest(entity.public_key(), &digest, &signature));
        assert!(!Entity::verify_digest(entity.public_key(), &[0u8; 32], &signature));

        let other = Entity::generate();
        assert!(!Entity::verify_digest(other.public_key(), &digest, &signature));
    }

    #[test]
    fn test_debug_hides_secret() {
        let entity = Entity::generate();
        let secret_hex = hex::encode(entity.secret.secret_bytes());
        assert!(!format!("{:?}", entity).contains(&secret_hex));
    }
}
