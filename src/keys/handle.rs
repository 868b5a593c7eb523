use std::fmt::{Debug, Formatter, Result as FormatResult};

use openssl::dsa::Dsa;
use openssl::error::ErrorStack;
use openssl::pkey::{Id, PKey, Private, Public};
use openssl::rsa::Rsa;
use openssl::symm::Cipher;

use crate::error::KeyStateError;
use crate::keys::Algorithm;

/// Asymmetric key material held by the provider
pub enum KeyHandle {
    Unset,
    Public(PKey<Public>),
    Private(PKey<Private>),
}

/// Why private key material could not be exported from a handle
#[derive(Debug)]
pub enum PrivateExportError {
    Unset,
    PublicOnly,
    Provider(ErrorStack),
}

impl KeyHandle {
    pub fn generate(algorithm: Algorithm, bits: u32) -> Result<KeyHandle, ErrorStack> {
        let pkey = match algorithm {
            Algorithm::Rsa => PKey::from_rsa(Rsa::generate(bits)?)?,
            Algorithm::Dsa => PKey::from_dsa(Dsa::generate(bits)?)?,
        };
        debug!("Generated {}-bit {} key", bits, algorithm);
        Ok(KeyHandle::Private(pkey))
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        let id = match self {
            KeyHandle::Unset => return None,
            KeyHandle::Public(pkey) => pkey.id(),
            KeyHandle::Private(pkey) => pkey.id(),
        };
        match id {
            Id::RSA => Some(Algorithm::Rsa),
            Id::DSA => Some(Algorithm::Dsa),
            _ => None,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            KeyHandle::Unset => 0,
            KeyHandle::Public(pkey) => pkey.bits(),
            KeyHandle::Private(pkey) => pkey.bits(),
        }
    }

    #[inline]
    pub fn is_unset(&self) -> bool {
        match self {
            KeyHandle::Unset => true,
            _ => false,
        }
    }

    /// Fails unless the handle holds a key of `algorithm`
    pub fn expect_algorithm(&self, algorithm: Algorithm) -> Result<(), KeyStateError> {
        match self.algorithm() {
            Some(found) if found == algorithm => Ok(()),
            Some(_) => Err(KeyStateError::WrongAlgorithm),
            None if self.is_unset() => Ok(()),
            None => Err(KeyStateError::UnsupportedAlgorithm),
        }
    }

    /// Public-only view of the same key
    pub fn to_public(&self) -> Result<KeyHandle, ErrorStack> {
        match self {
            KeyHandle::Unset => Ok(KeyHandle::Unset),
            KeyHandle::Public(pkey) => Ok(KeyHandle::Public(PKey::public_key_from_der(&pkey.public_key_to_der()?)?)),
            KeyHandle::Private(pkey) => Ok(KeyHandle::Public(PKey::public_key_from_der(&pkey.public_key_to_der()?)?)),
        }
    }

    /// PKCS#8 PEM of the private key; only succeeds when private material is present
    pub fn private_key_pem(&self, passphrase: Option<&[u8]>) -> Result<Vec<u8>, PrivateExportError> {
        match self {
            KeyHandle::Unset => Err(PrivateExportError::Unset),
            KeyHandle::Public(_) => Err(PrivateExportError::PublicOnly),
            KeyHandle::Private(pkey) => {
                let pem = match passphrase {
                    Some(passphrase) => pkey.private_key_to_pem_pkcs8_passphrase(Cipher::aes_256_cbc(), passphrase),
                    None => pkey.private_key_to_pem_pkcs8(),
                };
                pem.map_err(PrivateExportError::Provider)
            },
        }
    }

    pub fn public_key_pem(&self) -> Result<Vec<u8>, KeyStateError> {
        let pem = match self {
            KeyHandle::Unset => return Err(KeyStateError::PublicKeyRequired),
            KeyHandle::Public(pkey) => pkey.public_key_to_pem(),
            KeyHandle::Private(pkey) => pkey.public_key_to_pem(),
        };
        pem.or(Err(KeyStateError::PublicKeyRequired))
    }
}

impl Default for KeyHandle {
    fn default() -> Self {
        KeyHandle::Unset
    }
}

impl From<PKey<Private>> for KeyHandle {
    fn from(pkey: PKey<Private>) -> KeyHandle {
        KeyHandle::Private(pkey)
    }
}

impl From<PKey<Public>> for KeyHandle {
    fn from(pkey: PKey<Public>) -> KeyHandle {
        KeyHandle::Public(pkey)
    }
}

impl Debug for KeyHandle {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        let algorithm = self.algorithm()
            .map(|algorithm| algorithm.to_string())
            .unwrap_or_else(|| String::from("unknown"));
        match self {
            KeyHandle::Unset => write!(f, "KeyHandle(unset)"),
            KeyHandle::Public(_) => write!(f, "KeyHandle({} {} public)", algorithm, self.bits()),
            KeyHandle::Private(_) => write!(f, "KeyHandle({} {} private)", algorithm, self.bits()),
        }
    }
}
