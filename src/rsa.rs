use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::path::Path;

use openssl::encrypt::{Decrypter, Encrypter};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{HasPrivate, HasPublic, PKeyRef};
use openssl::rsa::Padding;

use crate::aes::AesCipher;
use crate::capability::{Encryption, KeyManagement};
use crate::envelope::{Envelope, LengthPrefix};
use crate::error::{CryptoError, KeyStateError, UnwrapEnvelopeError};
use crate::keys::{Algorithm, KeyHandle};
use crate::storage;

/// Digest used by RSA-OAEP for both the label hash and MGF1
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OaepDigest {
    Sha1,
    Sha256,
}

impl OaepDigest {
    fn message_digest(self) -> MessageDigest {
        match self {
            OaepDigest::Sha1 => MessageDigest::sha1(),
            OaepDigest::Sha256 => MessageDigest::sha256(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EnvelopeOptions {
    pub oaep: OaepDigest,
    pub length_prefix: LengthPrefix,
}

impl EnvelopeOptions {
    /// Reads and writes envelopes produced by the older SHA-1 scheme
    pub fn legacy() -> EnvelopeOptions {
        EnvelopeOptions {
            oaep: OaepDigest::Sha1,
            length_prefix: LengthPrefix::Legacy,
        }
    }
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        EnvelopeOptions {
            oaep: OaepDigest::Sha256,
            length_prefix: LengthPrefix::Full,
        }
    }
}

fn oaep_encrypt<T>(pkey: &PKeyRef<T>, oaep: OaepDigest, data: &[u8]) -> Result<Vec<u8>, ErrorStack> where T: HasPublic {
    let digest = oaep.message_digest();
    let mut encrypter = Encrypter::new(pkey)?;
    encrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
    encrypter.set_rsa_oaep_md(digest)?;
    encrypter.set_rsa_mgf1_md(digest)?;
    let mut cipher_text = vec![0u8; encrypter.encrypt_len(data)?];
    let len = encrypter.encrypt(data, &mut cipher_text)?;
    cipher_text.truncate(len);
    Ok(cipher_text)
}

fn oaep_decrypt<T>(pkey: &PKeyRef<T>, oaep: OaepDigest, data: &[u8]) -> Result<Vec<u8>, ErrorStack> where T: HasPrivate {
    let digest = oaep.message_digest();
    let mut decrypter = Decrypter::new(pkey)?;
    decrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
    decrypter.set_rsa_oaep_md(digest)?;
    decrypter.set_rsa_mgf1_md(digest)?;
    let mut plain_text = vec![0u8; decrypter.decrypt_len(data)?];
    let len = decrypter.decrypt(data, &mut plain_text)?;
    plain_text.truncate(len);
    Ok(plain_text)
}

/// Hybrid cipher: payloads are sealed with a fresh AES key that is itself wrapped with RSA-OAEP
pub struct RsaCipher {
    handle: KeyHandle,
    options: EnvelopeOptions,
}

impl RsaCipher {
    pub fn generate(bits: u32) -> Result<RsaCipher, CryptoError> {
        let handle = KeyHandle::generate(Algorithm::Rsa, bits)?;
        Ok(RsaCipher { handle, options: EnvelopeOptions::default() })
    }

    pub fn from_handle(handle: KeyHandle) -> Result<RsaCipher, CryptoError> {
        handle.expect_algorithm(Algorithm::Rsa)?;
        Ok(RsaCipher { handle, options: EnvelopeOptions::default() })
    }

    pub fn from_serialised(serialised: &str, passphrase: Option<&[u8]>) -> Result<RsaCipher, CryptoError> {
        let mut cipher = RsaCipher::from_handle(KeyHandle::Unset)?;
        cipher.import_key(serialised, passphrase)?;
        Ok(cipher)
    }

    pub fn load_from<T>(path: T, passphrase: Option<&[u8]>) -> Result<RsaCipher, CryptoError> where T: AsRef<Path> {
        RsaCipher::from_serialised(&storage::load_text(path)?, passphrase)
    }

    pub fn with_options(mut self, options: EnvelopeOptions) -> RsaCipher {
        self.options = options;
        self
    }

    #[inline]
    pub fn options(&self) -> &EnvelopeOptions {
        &self.options
    }

    fn wrap_key(&self, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match &self.handle {
            KeyHandle::Unset => Err(KeyStateError::PublicKeyRequired.into()),
            KeyHandle::Public(pkey) => Ok(oaep_encrypt(pkey, self.options.oaep, key)?),
            KeyHandle::Private(pkey) => Ok(oaep_encrypt(pkey, self.options.oaep, key)?),
        }
    }

    fn unwrap_key(&self, encrypted_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match &self.handle {
            KeyHandle::Private(pkey) => Ok(oaep_decrypt(pkey, self.options.oaep, encrypted_key)?),
            _ => Err(KeyStateError::PrivateKeyRequired.into()),
        }
    }
}

impl Encryption for RsaCipher {
    fn encrypt_from_bytes(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.is_empty() {
            return Err(CryptoError::InvalidArgument("plain text is empty"));
        }
        let aes = AesCipher::generate()?;
        let cipher_text = aes.encrypt_from_bytes(data)?;
        let encrypted_key = self.wrap_key(aes.key_value().key())?;
        let envelope = Envelope::new(&encrypted_key, aes.key_value().iv(), &cipher_text);
        Ok(envelope.wrap()?)
    }

    fn decrypt_to_bytes(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.is_empty() {
            return Err(CryptoError::InvalidArgument("cipher text is empty"));
        }
        let envelope = Envelope::unwrap(data, self.options.length_prefix)?;
        if envelope.cipher_text.is_empty() {
            return Err(UnwrapEnvelopeError::EmptyCipherText.into());
        }
        let key = self.unwrap_key(envelope.encrypted_key)?;
        let aes = AesCipher::from_raw(key, envelope.iv)
            .or(Err(UnwrapEnvelopeError::FieldLength))?;
        aes.decrypt_to_bytes(envelope.cipher_text)
    }
}

impl KeyManagement for RsaCipher {
    const ALGORITHM: Algorithm = Algorithm::Rsa;

    #[inline]
    fn handle(&self) -> &KeyHandle {
        &self.handle
    }

    #[inline]
    fn handle_mut(&mut self) -> &mut KeyHandle {
        &mut self.handle
    }
}

impl Debug for RsaCipher {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "RsaCipher({:?}, {:?})", &self.handle, &self.options.oaep)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::keys::KeyType;
    use crate::keys::test_keys::*;

    fn private_cipher() -> RsaCipher {
        RsaCipher::from_handle(rsa_private_handle()).unwrap()
    }

    fn public_cipher() -> RsaCipher {
        RsaCipher::from_handle(rsa_private_handle().to_public().unwrap()).unwrap()
    }

    #[test]
    fn round_trip() {
        let public = public_cipher();
        let private = private_cipher();
        let result = public.encrypt_from_string("Some Secret Data");
        assert!(result.is_ok(), "{:?}", result);
        let encrypted = result.unwrap();
        let result = private.decrypt_to_string(&encrypted);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(result.unwrap(), "Some Secret Data");

        // private key encrypts too
        let data: Vec<u8> = (0..5000).map(|i| (i % 251) as u8).collect();
        let encrypted = private.encrypt_from_bytes(&data).unwrap();
        assert_eq!(private.decrypt_to_bytes(&encrypted).unwrap(), data);
    }

    #[test]
    fn envelope_layout() {
        let encrypted = public_cipher().encrypt_from_string("Some Secret Data").unwrap();
        assert_eq!(&encrypted[..8], b"\x00\x01\x00\x00\x10\x00\x00\x00");
        assert_eq!(encrypted.len(), 8 + 256 + 16 + 32);
        let envelope = Envelope::unwrap(&encrypted, LengthPrefix::Full).unwrap();
        assert_eq!(envelope.encrypted_key.len(), 256);
        assert_eq!(envelope.iv.len(), 16);
        assert_eq!(envelope.cipher_text.len(), 32);
    }

    #[test]
    fn non_deterministic() {
        let public = public_cipher();
        let first = public.encrypt_from_string("Some Secret Data").unwrap();
        let second = public.encrypt_from_string("Some Secret Data").unwrap();
        assert_ne!(first, second);
        assert_ne!(&first[8 + 256..8 + 256 + 16], &second[8 + 256..8 + 256 + 16]);
        assert_ne!(&first[8 + 256 + 16..], &second[8 + 256 + 16..]);
    }

    #[test]
    fn wrong_key() {
        let encrypted = public_cipher().encrypt_from_string("Some Secret Data").unwrap();
        let other = RsaCipher::from_handle(rsa_other_private_handle()).unwrap();
        match other.decrypt_to_bytes(&encrypted) {
            Err(CryptoError::Cryptographic(_)) => (),
            result => panic!("unexpected {:?}", result),
        }
        match public_cipher().decrypt_to_bytes(&encrypted) {
            Err(CryptoError::KeyState(KeyStateError::PrivateKeyRequired)) => (),
            result => panic!("unexpected {:?}", result),
        }
        match RsaCipher::from_handle(KeyHandle::Unset).unwrap().encrypt_from_bytes(b"data") {
            Err(CryptoError::KeyState(KeyStateError::PublicKeyRequired)) => (),
            result => panic!("unexpected {:?}", result),
        }
    }

    #[test]
    fn oaep_options() {
        let legacy = private_cipher().with_options(EnvelopeOptions::legacy());
        assert_eq!(legacy.options().oaep, OaepDigest::Sha1);
        let encrypted = legacy.encrypt_from_string("Some Secret Data").unwrap();
        assert_eq!(legacy.decrypt_to_string(&encrypted).unwrap(), "Some Secret Data");
        // digest mismatch cannot unwrap the key
        assert!(private_cipher().decrypt_to_bytes(&encrypted).unwrap_err().is_cryptographic());

        let full_sha1 = private_cipher().with_options(EnvelopeOptions { oaep: OaepDigest::Sha1, length_prefix: LengthPrefix::Full });
        assert_eq!(full_sha1.decrypt_to_string(&encrypted).unwrap(), "Some Secret Data");
    }

    #[test]
    fn malformed_input() {
        let private = private_cipher();
        assert!(private.encrypt_from_bytes(b"").unwrap_err().is_invalid_argument());
        assert!(private.encrypt_from_string("").unwrap_err().is_invalid_argument());
        assert!(private.decrypt_to_bytes(b"").unwrap_err().is_invalid_argument());
        match private.decrypt_to_bytes(b"\x01\x00") {
            Err(CryptoError::Envelope(_)) => (),
            result => panic!("unexpected {:?}", result),
        }
        let mut encrypted = private.encrypt_from_string("Some Secret Data").unwrap();
        let len = encrypted.len();
        encrypted.truncate(len - 40);
        match private.decrypt_to_bytes(&encrypted) {
            Err(CryptoError::Envelope(_)) => (),
            result => panic!("unexpected {:?}", result),
        }
    }

    #[test]
    fn tampered_fields() {
        let private = private_cipher();
        let encrypted = private.encrypt_from_string("Some Secret Data").unwrap();
        let envelope = Envelope::unwrap(&encrypted, LengthPrefix::Full).unwrap();

        // IV length shortened, the rest of the IV runs into the cipher text
        let tampered = Envelope::new(envelope.encrypted_key, &envelope.iv[..8], envelope.cipher_text).wrap().unwrap();
        match private.decrypt_to_bytes(&tampered) {
            Err(CryptoError::Envelope(UnwrapEnvelopeError::FieldLength)) => (),
            result => panic!("unexpected {:?}", result),
        }

        // wrapped key of the wrong size
        let pkey = match &private.handle {
            KeyHandle::Private(pkey) => pkey,
            _ => unreachable!(),
        };
        let short_key = oaep_encrypt(pkey, OaepDigest::Sha256, &[1u8; 16]).unwrap();
        let tampered = Envelope::new(&short_key, envelope.iv, envelope.cipher_text).wrap().unwrap();
        match private.decrypt_to_bytes(&tampered) {
            Err(CryptoError::Envelope(UnwrapEnvelopeError::FieldLength)) => (),
            result => panic!("unexpected {:?}", result),
        }

        let tampered = Envelope::new(envelope.encrypted_key, envelope.iv, b"").wrap().unwrap();
        match private.decrypt_to_bytes(&tampered) {
            Err(CryptoError::Envelope(UnwrapEnvelopeError::EmptyCipherText)) => (),
            result => panic!("unexpected {:?}", result),
        }
    }

    #[test]
    fn key_management() {
        let private = private_cipher();
        assert_eq!(private.key_type(), KeyType::PrivateKey);
        assert_eq!(public_cipher().key_type(), KeyType::PublicKey);
        assert_eq!(RsaCipher::from_handle(KeyHandle::Unset).unwrap().key_type(), KeyType::NotSet);

        let public_key = private.export_key(KeyType::PublicKey).unwrap();
        let mut imported = RsaCipher::from_serialised(&public_key, None).unwrap();
        assert_eq!(imported.key_type(), KeyType::PublicKey);
        let encrypted = imported.encrypt_from_string("Some Secret Data").unwrap();
        assert_eq!(private.decrypt_to_string(&encrypted).unwrap(), "Some Secret Data");

        // blank import keeps the current key
        assert!(imported.import_key("  ", None).is_ok());
        assert_eq!(imported.key_type(), KeyType::PublicKey);
        let private_pem = private.private_key_pem(None).unwrap();
        assert!(imported.import_key(&private_pem, None).is_ok());
        assert_eq!(imported.key_type(), KeyType::PrivateKey);
        assert_eq!(imported.decrypt_to_string(&encrypted).unwrap(), "Some Secret Data");

        let dsa_pem = String::from_utf8(dsa_private_handle().private_key_pem(None).unwrap()).unwrap();
        match imported.import_key(&dsa_pem, None) {
            Err(CryptoError::KeyState(KeyStateError::WrongAlgorithm)) => (),
            result => panic!("unexpected {:?}", result),
        }
        assert_eq!(imported.key_type(), KeyType::PrivateKey);
        assert!(RsaCipher::from_handle(dsa_private_handle()).is_err());
        assert!(public_cipher().private_key_pem(None).is_err());
    }

    #[test]
    fn persistence() {
        let tmp_dir = tempdir::TempDir::new("rusty-envelope").expect("cannot make temp dir");
        let key_files = storage::KeyFiles::new(tmp_dir.path());
        let private = private_cipher();
        assert!(private.save_key(key_files.public_key(), KeyType::PublicKey).is_ok());
        assert!(private.save_pem(key_files.private_key(), KeyType::PrivateKey, Some(b"secret")).is_ok());
        assert!(private.save_key(key_files.private_key(), KeyType::SymmetricKey).is_err());

        let public = RsaCipher::load_from(key_files.public_key(), None).unwrap();
        assert_eq!(public.key_type(), KeyType::PublicKey);
        let encrypted = public.encrypt_from_string("Some Secret Data").unwrap();
        assert!(RsaCipher::load_from(key_files.private_key(), None).is_err());
        let loaded = RsaCipher::load_from(key_files.private_key(), Some(b"secret")).unwrap();
        assert_eq!(loaded.decrypt_to_string(&encrypted).unwrap(), "Some Secret Data");
    }
}
