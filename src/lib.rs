#![deny(unused_must_use)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

#[macro_export]
macro_rules! define_error {
    ( $Error:ident; $( $Option:ident = $description:expr ),+ ) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum $Error {
            $(
            $Option,
            )*
        }

        impl std::error::Error for $Error {}

        impl std::fmt::Display for $Error {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self {
                    $(
                        $Error::$Option => f.write_str($description),
                    )*
                }
            }
        }
    };
}

pub mod error;
pub mod misc;
pub mod storage;
pub mod envelope;
pub mod keys;
pub mod capability;
pub mod aes;
pub mod rsa;
pub mod dsa;

pub use error::CryptoError;
pub use capability::{Encryption, Signing, KeyManagement};
pub use keys::{KeyHandle, KeyType, Algorithm};
pub use aes::{AesCipher, AesKeyValue};
pub use rsa::{RsaCipher, EnvelopeOptions, OaepDigest};
pub use dsa::DsaSigner;
pub use envelope::{Envelope, LengthPrefix};
pub use storage::KeyFiles;
