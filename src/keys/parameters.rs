use std::fmt::{Debug, Formatter, Result as FormatResult};

use openssl::bn::{BigNum, BigNumRef};
use openssl::dsa::{Dsa, DsaRef};
use openssl::error::ErrorStack;
use openssl::pkey::{HasPublic, Id, PKey, PKeyRef, Private};
use openssl::rsa::{Rsa, RsaRef};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, KeyStateError};
use crate::keys::Algorithm;
use crate::keys::handle::KeyHandle;
use crate::misc::b64;

/// Structured key parameters, big-endian integers stored as base64
#[derive(Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "algorithm")]
pub enum KeyParameters {
    #[serde(rename = "RSA")]
    Rsa(RsaParameters),
    #[serde(rename = "DSA")]
    Dsa(DsaParameters),
}

#[derive(Deserialize, Serialize, PartialEq, Eq)]
pub struct RsaParameters {
    #[serde(with = "b64")]
    modulus: Vec<u8>,
    #[serde(with = "b64")]
    exponent: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private: Option<RsaPrivateParameters>,
}

#[derive(Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct RsaPrivateParameters {
    #[serde(with = "b64")]
    d: Vec<u8>,
    #[serde(with = "b64")]
    p: Vec<u8>,
    #[serde(with = "b64")]
    q: Vec<u8>,
    #[serde(with = "b64")]
    dp: Vec<u8>,
    #[serde(with = "b64")]
    dq: Vec<u8>,
    #[serde(with = "b64")]
    inverse_q: Vec<u8>,
}

#[derive(Deserialize, Serialize, PartialEq, Eq)]
pub struct DsaParameters {
    #[serde(with = "b64")]
    p: Vec<u8>,
    #[serde(with = "b64")]
    q: Vec<u8>,
    #[serde(with = "b64")]
    g: Vec<u8>,
    #[serde(with = "b64")]
    y: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private: Option<DsaPrivateParameters>,
}

#[derive(Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct DsaPrivateParameters {
    #[serde(with = "b64")]
    x: Vec<u8>,
}

fn bn(bytes: &[u8]) -> Result<BigNum, ErrorStack> {
    BigNum::from_slice(bytes)
}

fn bytes(bn: Option<&BigNumRef>) -> Result<Vec<u8>, KeyStateError> {
    // NB: keys imported without CRT values cannot be exported as a full set
    bn.map(BigNumRef::to_vec)
        .ok_or(KeyStateError::PrivateKeyRequired)
}

impl RsaParameters {
    fn public<T>(rsa: &RsaRef<T>) -> RsaParameters where T: HasPublic {
        RsaParameters {
            modulus: rsa.n().to_vec(),
            exponent: rsa.e().to_vec(),
            private: None,
        }
    }

    fn private(rsa: &RsaRef<Private>) -> Result<RsaParameters, KeyStateError> {
        let mut parameters = RsaParameters::public(rsa);
        parameters.private = Some(RsaPrivateParameters {
            d: rsa.d().to_vec(),
            p: bytes(rsa.p())?,
            q: bytes(rsa.q())?,
            dp: bytes(rsa.dmp1())?,
            dq: bytes(rsa.dmq1())?,
            inverse_q: bytes(rsa.iqmp())?,
        });
        Ok(parameters)
    }

    fn into_handle(self) -> Result<KeyHandle, ErrorStack> {
        let n = bn(&self.modulus)?;
        let e = bn(&self.exponent)?;
        match self.private {
            Some(private) => {
                let rsa = Rsa::from_private_components(
                    n, e,
                    bn(&private.d)?, bn(&private.p)?, bn(&private.q)?,
                    bn(&private.dp)?, bn(&private.dq)?, bn(&private.inverse_q)?,
                )?;
                Ok(KeyHandle::Private(PKey::from_rsa(rsa)?))
            },
            None => Ok(KeyHandle::Public(PKey::from_rsa(Rsa::from_public_components(n, e)?)?)),
        }
    }
}

impl DsaParameters {
    fn public<T>(dsa: &DsaRef<T>) -> DsaParameters where T: HasPublic {
        DsaParameters {
            p: dsa.p().to_vec(),
            q: dsa.q().to_vec(),
            g: dsa.g().to_vec(),
            y: dsa.pub_key().to_vec(),
            private: None,
        }
    }

    fn private(dsa: &DsaRef<Private>) -> DsaParameters {
        let mut parameters = DsaParameters::public(dsa);
        parameters.private = Some(DsaPrivateParameters { x: dsa.priv_key().to_vec() });
        parameters
    }

    fn into_handle(self) -> Result<KeyHandle, ErrorStack> {
        let (p, q, g, y) = (bn(&self.p)?, bn(&self.q)?, bn(&self.g)?, bn(&self.y)?);
        match self.private {
            Some(private) => {
                let dsa = Dsa::from_private_components(p, q, g, bn(&private.x)?, y)?;
                Ok(KeyHandle::Private(PKey::from_dsa(dsa)?))
            },
            None => Ok(KeyHandle::Public(PKey::from_dsa(Dsa::from_public_components(p, q, g, y)?)?)),
        }
    }
}

fn public_parameters<T>(pkey: &PKeyRef<T>) -> Result<KeyParameters, CryptoError> where T: HasPublic {
    match pkey.id() {
        Id::RSA => {
            let rsa = pkey.rsa()?;
            Ok(KeyParameters::Rsa(RsaParameters::public(&rsa)))
        },
        Id::DSA => {
            let dsa = pkey.dsa()?;
            Ok(KeyParameters::Dsa(DsaParameters::public(&dsa)))
        },
        _ => Err(KeyStateError::UnsupportedAlgorithm.into()),
    }
}

impl KeyParameters {
    pub fn public(handle: &KeyHandle) -> Result<KeyParameters, CryptoError> {
        match handle {
            KeyHandle::Unset => Err(KeyStateError::PublicKeyRequired.into()),
            KeyHandle::Public(pkey) => public_parameters(pkey),
            KeyHandle::Private(pkey) => public_parameters(pkey),
        }
    }

    pub fn private(handle: &KeyHandle) -> Result<KeyParameters, CryptoError> {
        let pkey = match handle {
            KeyHandle::Private(pkey) => pkey,
            _ => return Err(KeyStateError::PrivateKeyRequired.into()),
        };
        match handle.algorithm() {
            Some(Algorithm::Rsa) => {
                let rsa = pkey.rsa()?;
                Ok(KeyParameters::Rsa(RsaParameters::private(&rsa)?))
            },
            Some(Algorithm::Dsa) => {
                let dsa = pkey.dsa()?;
                Ok(KeyParameters::Dsa(DsaParameters::private(&dsa)))
            },
            None => Err(KeyStateError::UnsupportedAlgorithm.into()),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            KeyParameters::Rsa(_) => Algorithm::Rsa,
            KeyParameters::Dsa(_) => Algorithm::Dsa,
        }
    }

    pub fn has_private(&self) -> bool {
        match self {
            KeyParameters::Rsa(parameters) => parameters.private.is_some(),
            KeyParameters::Dsa(parameters) => parameters.private.is_some(),
        }
    }

    pub fn into_handle(self) -> Result<KeyHandle, ErrorStack> {
        match self {
            KeyParameters::Rsa(parameters) => parameters.into_handle(),
            KeyParameters::Dsa(parameters) => parameters.into_handle(),
        }
    }
}

impl Debug for KeyParameters {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        let kind = if self.has_private() { "private" } else { "public" };
        write!(f, "KeyParameters({} {})", self.algorithm(), kind)
    }
}
