use std::fmt::{Display, Formatter, Result as FormatResult};

use crate::error::{CryptoError, KeyStateError};

mod handle;
mod kind;
mod parameters;
mod pem;

pub use handle::{KeyHandle, PrivateExportError};
pub use kind::KeyType;
pub use parameters::KeyParameters;
pub use pem::import_key;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Algorithm {
    Rsa,
    Dsa,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        match self {
            Algorithm::Rsa => write!(f, "RSA"),
            Algorithm::Dsa => write!(f, "DSA"),
        }
    }
}

/// Serialises the parameters of `handle` selected by `key_type`.
/// `NotSet` exports nothing; `SymmetricKey` never describes an asymmetric handle.
pub fn export_key(handle: &KeyHandle, key_type: KeyType) -> Result<String, CryptoError> {
    let parameters = match key_type {
        KeyType::NotSet => return Ok(String::new()),
        KeyType::PublicKey => KeyParameters::public(handle)?,
        KeyType::PrivateKey => KeyParameters::private(handle)?,
        KeyType::SymmetricKey => return Err(KeyStateError::InvalidKeyType.into()),
    };
    debug!("Exporting {:?}", parameters);
    Ok(serde_json::to_string(&parameters)?)
}
