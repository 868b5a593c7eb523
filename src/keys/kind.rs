use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

use crate::keys::handle::{KeyHandle, PrivateExportError};

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum KeyType {
    NotSet,
    SymmetricKey,
    PublicKey,
    PrivateKey,
}

impl KeyType {
    /// Classifies a handle by attempting to export its private key.
    /// Provider failures and algorithms without a parameter form are absorbed into `NotSet`
    /// and never reach the caller.
    pub fn determine(handle: &KeyHandle) -> KeyType {
        if handle.algorithm().is_none() {
            return KeyType::NotSet;
        }
        match handle.private_key_pem(None) {
            Ok(_) => KeyType::PrivateKey,
            Err(PrivateExportError::PublicOnly) => KeyType::PublicKey,
            Err(PrivateExportError::Unset) => KeyType::NotSet,
            Err(PrivateExportError::Provider(e)) => {
                trace!("Key classification failed: {}", e);
                KeyType::NotSet
            },
        }
    }
}

impl Default for KeyType {
    fn default() -> Self {
        KeyType::NotSet
    }
}

impl Display for KeyType {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        match self {
            KeyType::NotSet => write!(f, "not set"),
            KeyType::SymmetricKey => write!(f, "symmetric key"),
            KeyType::PublicKey => write!(f, "public key"),
            KeyType::PrivateKey => write!(f, "private key"),
        }
    }
}
