use openssl::error::ErrorStack;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::X509;
use regex::Regex;

use crate::error::{CryptoError, KeyStateError};
use crate::keys::handle::KeyHandle;
use crate::keys::parameters::KeyParameters;
use crate::misc::is_blank;

lazy_static! {
    static ref RE_PEM_LABEL: Regex = Regex::new(r"-----BEGIN ([A-Z0-9 ]+)-----").expect("cannot compile regex");
}

fn private_key_from_pem(pem: &[u8], passphrase: Option<&[u8]>) -> Result<PKey<Private>, ErrorStack> {
    match passphrase {
        Some(passphrase) => PKey::private_key_from_pem_passphrase(pem, passphrase),
        // NB: the provider's default callback would prompt on the terminal
        None => PKey::private_key_from_pem_callback(pem, |_| Err(ErrorStack::get())),
    }
}

/// Loads a serialised key: parameter JSON, a PEM key or an X.509 certificate.
/// Blank input yields `None` so callers can leave their handle untouched.
pub fn import_key(serialised: &str, passphrase: Option<&[u8]>) -> Result<Option<KeyHandle>, CryptoError> {
    if is_blank(serialised) {
        return Ok(None);
    }
    let serialised = serialised.trim();
    let label = match RE_PEM_LABEL.captures(serialised) {
        Some(captures) => captures[1].to_owned(),
        None => {
            let parameters: KeyParameters = serde_json::from_str(serialised)?;
            debug!("Importing {:?}", parameters);
            return Ok(Some(parameters.into_handle()?));
        },
    };
    debug!("Importing PEM {}", label);
    let pem = serialised.as_bytes();
    let handle = match label.as_str() {
        "PUBLIC KEY" => KeyHandle::Public(PKey::public_key_from_pem(pem)?),
        "RSA PUBLIC KEY" => KeyHandle::Public(PKey::from_rsa(Rsa::public_key_from_pem_pkcs1(pem)?)?),
        "PRIVATE KEY" | "RSA PRIVATE KEY" | "DSA PRIVATE KEY" | "ENCRYPTED PRIVATE KEY" => {
            // PKCS#8 encryption shows in the label, traditional PEM encryption in a header
            let encrypted = label == "ENCRYPTED PRIVATE KEY" || serialised.contains("Proc-Type: 4,ENCRYPTED");
            if encrypted && passphrase.is_none() {
                return Err(CryptoError::InvalidArgument("passphrase required for encrypted private key"));
            }
            KeyHandle::Private(private_key_from_pem(pem, passphrase)?)
        },
        "CERTIFICATE" => KeyHandle::Public(X509::from_pem(pem)?.public_key()?),
        _ => return Err(KeyStateError::UnsupportedAlgorithm.into()),
    };
    if handle.algorithm().is_none() {
        return Err(KeyStateError::UnsupportedAlgorithm.into());
    }
    Ok(Some(handle))
}
