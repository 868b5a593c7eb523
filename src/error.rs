use std::error::Error;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::Error as IoError;
use std::string::FromUtf8Error;

use base64::DecodeError;
use openssl::error::ErrorStack;
use serde_json::Error as JsonError;

define_error!(KeyStateError; InvalidKeyType="key type cannot be exported from this key", PrivateKeyRequired="private key required", PublicKeyRequired="public key required", WrongAlgorithm="key algorithm does not match", UnsupportedAlgorithm="unsupported key algorithm");

define_error!(UnwrapEnvelopeError; Header="envelope header too short", NegativeLength="negative field length", Truncated="envelope shorter than its field lengths", FieldLength="envelope key or IV has the wrong length", EmptyCipherText="envelope carries no cipher text");
define_error!(WrapEnvelopeError; Length="field too long for envelope");

#[derive(Debug)]
pub enum CryptoError {
    InvalidArgument(&'static str),
    Cryptographic(ErrorStack),
    KeyState(KeyStateError),
    Envelope(UnwrapEnvelopeError),
    Serialisation(JsonError),
    Encoding(DecodeError),
    Utf8(FromUtf8Error),
    Io(IoError),
}

impl CryptoError {
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            CryptoError::InvalidArgument(_) => true,
            _ => false,
        }
    }

    pub fn is_cryptographic(&self) -> bool {
        match self {
            CryptoError::Cryptographic(_) => true,
            _ => false,
        }
    }
}

impl Error for CryptoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CryptoError::InvalidArgument(_) => None,
            CryptoError::Cryptographic(err) => Some(err),
            CryptoError::KeyState(err) => Some(err),
            CryptoError::Envelope(err) => Some(err),
            CryptoError::Serialisation(err) => Some(err),
            CryptoError::Encoding(err) => Some(err),
            CryptoError::Utf8(err) => Some(err),
            CryptoError::Io(err) => Some(err),
        }
    }
}

impl Display for CryptoError {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        match self {
            CryptoError::InvalidArgument(argument) => write!(f, "Invalid argument: {}", argument),
            CryptoError::Cryptographic(err) => write!(f, "Cryptographic error {}", err),
            CryptoError::KeyState(err) => write!(f, "Key state error: {}", err),
            CryptoError::Envelope(err) => write!(f, "Envelope error: {}", err),
            CryptoError::Serialisation(err) => write!(f, "Serialisation error {}", err),
            CryptoError::Encoding(err) => write!(f, "Base64 error {}", err),
            CryptoError::Utf8(err) => write!(f, "UTF-8 error {}", err),
            CryptoError::Io(err) => write!(f, "IO error {}", err),
        }
    }
}

impl From<ErrorStack> for CryptoError {
    fn from(err: ErrorStack) -> CryptoError {
        CryptoError::Cryptographic(err)
    }
}

impl From<KeyStateError> for CryptoError {
    fn from(err: KeyStateError) -> CryptoError {
        CryptoError::KeyState(err)
    }
}

impl From<UnwrapEnvelopeError> for CryptoError {
    fn from(err: UnwrapEnvelopeError) -> CryptoError {
        CryptoError::Envelope(err)
    }
}

impl From<WrapEnvelopeError> for CryptoError {
    fn from(_: WrapEnvelopeError) -> CryptoError {
        CryptoError::InvalidArgument("payload too large for envelope")
    }
}

impl From<JsonError> for CryptoError {
    fn from(err: JsonError) -> CryptoError {
        CryptoError::Serialisation(err)
    }
}

impl From<DecodeError> for CryptoError {
    fn from(err: DecodeError) -> CryptoError {
        CryptoError::Encoding(err)
    }
}

impl From<FromUtf8Error> for CryptoError {
    fn from(err: FromUtf8Error) -> CryptoError {
        CryptoError::Utf8(err)
    }
}

impl From<IoError> for CryptoError {
    fn from(err: IoError) -> CryptoError {
        CryptoError::Io(err)
    }
}
