use std::path::Path;

use crate::error::{CryptoError, KeyStateError};
use crate::keys::{self, Algorithm, KeyHandle, KeyType, PrivateExportError};
use crate::storage;

/// Reversible encryption of opaque payloads
pub trait Encryption {
    fn encrypt_from_bytes(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn decrypt_to_bytes(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn encrypt_from_string(&self, text: &str) -> Result<Vec<u8>, CryptoError> {
        self.encrypt_from_bytes(text.as_bytes())
    }

    fn decrypt_to_string(&self, data: &[u8]) -> Result<String, CryptoError> {
        let data = self.decrypt_to_bytes(data)?;
        Ok(String::from_utf8(data)?)
    }
}

/// Detached signatures; verification failure is a normal `false`
pub trait Signing {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;

    fn sign_string(&self, message: &str) -> Result<Vec<u8>, CryptoError> {
        self.sign(message.as_bytes())
    }

    fn verify_string(&self, message: &str, signature: &[u8]) -> bool {
        self.verify(message.as_bytes(), signature)
    }
}

/// Import, export and persistence of an asymmetric key handle
pub trait KeyManagement {
    const ALGORITHM: Algorithm;

    fn handle(&self) -> &KeyHandle;

    fn handle_mut(&mut self) -> &mut KeyHandle;

    fn key_type(&self) -> KeyType {
        KeyType::determine(self.handle())
    }

    fn export_key(&self, key_type: KeyType) -> Result<String, CryptoError> {
        keys::export_key(self.handle(), key_type)
    }

    /// Replaces the held key; blank input leaves it untouched
    fn import_key(&mut self, serialised: &str, passphrase: Option<&[u8]>) -> Result<(), CryptoError> {
        if let Some(handle) = keys::import_key(serialised, passphrase)? {
            handle.expect_algorithm(Self::ALGORITHM)?;
            *self.handle_mut() = handle;
        }
        Ok(())
    }

    fn public_key_pem(&self) -> Result<String, CryptoError> {
        let pem = self.handle().public_key_pem()?;
        Ok(String::from_utf8(pem)?)
    }

    fn private_key_pem(&self, passphrase: Option<&[u8]>) -> Result<String, CryptoError> {
        let pem = self.handle().private_key_pem(passphrase)
            .map_err(|e| match e {
                PrivateExportError::Provider(e) => CryptoError::Cryptographic(e),
                _ => CryptoError::KeyState(KeyStateError::PrivateKeyRequired),
            })?;
        Ok(String::from_utf8(pem)?)
    }

    fn save_key<T>(&self, path: T, key_type: KeyType) -> Result<(), CryptoError> where T: AsRef<Path> {
        let serialised = self.export_key(key_type)?;
        match key_type {
            KeyType::PrivateKey => storage::save_secret_text(path, &serialised)?,
            _ => storage::save_text(path, &serialised)?,
        }
        Ok(())
    }

    fn save_pem<T>(&self, path: T, key_type: KeyType, passphrase: Option<&[u8]>) -> Result<(), CryptoError> where T: AsRef<Path> {
        match key_type {
            KeyType::PublicKey => storage::save_text(path, &self.public_key_pem()?)?,
            KeyType::PrivateKey => storage::save_secret_text(path, &self.private_key_pem(passphrase)?)?,
            _ => return Err(KeyStateError::InvalidKeyType.into()),
        }
        Ok(())
    }
}
