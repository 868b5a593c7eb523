use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::path::Path;

use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{HasPublic, PKeyRef};
use openssl::sign::{Signer, Verifier};

use crate::capability::{KeyManagement, Signing};
use crate::error::{CryptoError, KeyStateError};
use crate::keys::{Algorithm, KeyHandle};
use crate::storage;

fn verify_with<T>(pkey: &PKeyRef<T>, message: &[u8], signature: &[u8]) -> Result<bool, ErrorStack> where T: HasPublic {
    let mut verifier = Verifier::new(MessageDigest::sha256(), pkey)?;
    verifier.update(message)?;
    verifier.verify(signature)
}

/// DSA signatures over SHA-256 digests
pub struct DsaSigner {
    handle: KeyHandle,
}

impl DsaSigner {
    pub fn generate(bits: u32) -> Result<DsaSigner, CryptoError> {
        Ok(DsaSigner { handle: KeyHandle::generate(Algorithm::Dsa, bits)? })
    }

    pub fn from_handle(handle: KeyHandle) -> Result<DsaSigner, CryptoError> {
        handle.expect_algorithm(Algorithm::Dsa)?;
        Ok(DsaSigner { handle })
    }

    pub fn from_serialised(serialised: &str, passphrase: Option<&[u8]>) -> Result<DsaSigner, CryptoError> {
        let mut signer = DsaSigner { handle: KeyHandle::Unset };
        signer.import_key(serialised, passphrase)?;
        Ok(signer)
    }

    pub fn load_from<T>(path: T, passphrase: Option<&[u8]>) -> Result<DsaSigner, CryptoError> where T: AsRef<Path> {
        DsaSigner::from_serialised(&storage::load_text(path)?, passphrase)
    }
}

impl Signing for DsaSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if message.is_empty() {
            return Err(CryptoError::InvalidArgument("message is empty"));
        }
        let pkey = match &self.handle {
            KeyHandle::Private(pkey) => pkey,
            _ => return Err(KeyStateError::PrivateKeyRequired.into()),
        };
        let mut signer = Signer::new(MessageDigest::sha256(), pkey)?;
        signer.update(message)?;
        Ok(signer.sign_to_vec()?)
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        // NB: malformed signatures surface as provider errors, they are still just a mismatch
        let verified = match &self.handle {
            KeyHandle::Unset => return false,
            KeyHandle::Public(pkey) => verify_with(pkey, message, signature),
            KeyHandle::Private(pkey) => verify_with(pkey, message, signature),
        };
        verified.unwrap_or(false)
    }
}

impl KeyManagement for DsaSigner {
    const ALGORITHM: Algorithm = Algorithm::Dsa;

    #[inline]
    fn handle(&self) -> &KeyHandle {
        &self.handle
    }

    #[inline]
    fn handle_mut(&mut self) -> &mut KeyHandle {
        &mut self.handle
    }
}

impl Debug for DsaSigner {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "DsaSigner({:?})", &self.handle)
    }
}
