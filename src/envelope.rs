use std::convert::TryFrom;
use std::fmt::{Debug, Formatter, Result as FormatResult};

use crate::error::{UnwrapEnvelopeError, WrapEnvelopeError};

/*
envelope shape:
[ encrypted key length: i32 LE | iv length: i32 LE | encrypted key: [u8;?] | iv: [u8;?] | cipher text: [u8;?] ]
[             header: 8 bytes                      <|> fields, cipher text runs to the end of the buffer         ]
*/
const LENGTH_LEN: usize = 4;
const HEADER_LEN: usize = 2 * LENGTH_LEN;

/// How the two length fields of an envelope header are read
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LengthPrefix {
    /// all four bytes of each little-endian length
    Full,
    /// only the low three bytes of each length; older stored envelopes were framed by a reader that ignored the high byte
    Legacy,
}

impl Default for LengthPrefix {
    fn default() -> Self {
        LengthPrefix::Full
    }
}

impl LengthPrefix {
    fn read(self, bytes: &[u8]) -> i32 {
        let mut length = [0u8; LENGTH_LEN];
        match self {
            LengthPrefix::Full => length.copy_from_slice(&bytes[..LENGTH_LEN]),
            LengthPrefix::Legacy => length[..3].copy_from_slice(&bytes[..3]),
        }
        i32::from_le_bytes(length)
    }
}

pub struct Envelope<'a> {
    pub encrypted_key: &'a [u8],
    pub iv: &'a [u8],
    pub cipher_text: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub fn new(encrypted_key: &'a [u8], iv: &'a [u8], cipher_text: &'a [u8]) -> Envelope<'a> {
        Envelope {
            encrypted_key,
            iv,
            cipher_text,
        }
    }

    pub fn unwrap(data: &[u8], length_prefix: LengthPrefix) -> Result<Envelope, UnwrapEnvelopeError> {
        if data.len() < HEADER_LEN {
            return Err(UnwrapEnvelopeError::Header);
        }
        let key_len = length_prefix.read(&data[..LENGTH_LEN]);
        let iv_len = length_prefix.read(&data[LENGTH_LEN..HEADER_LEN]);
        let key_len = usize::try_from(key_len)
            .or(Err(UnwrapEnvelopeError::NegativeLength))?;
        let iv_len = usize::try_from(iv_len)
            .or(Err(UnwrapEnvelopeError::NegativeLength))?;
        let data = &data[HEADER_LEN..];
        // NB: both lengths fit in i32 so the sum cannot overflow usize
        if data.len() < key_len + iv_len {
            return Err(UnwrapEnvelopeError::Truncated);
        }
        let (encrypted_key, data) = data.split_at(key_len);
        let (iv, cipher_text) = data.split_at(iv_len);
        Ok(Envelope {
            encrypted_key,
            iv,
            cipher_text,
        })
    }

    pub fn wrap(&self) -> Result<Vec<u8>, WrapEnvelopeError> {
        let key_len = i32::try_from(self.encrypted_key.len())
            .or(Err(WrapEnvelopeError::Length))?;
        let iv_len = i32::try_from(self.iv.len())
            .or(Err(WrapEnvelopeError::Length))?;
        let len = HEADER_LEN + self.encrypted_key.len() + self.iv.len() + self.cipher_text.len();
        let mut data = Vec::with_capacity(len);
        data.extend_from_slice(&key_len.to_le_bytes());
        data.extend_from_slice(&iv_len.to_le_bytes());
        data.extend_from_slice(self.encrypted_key);
        data.extend_from_slice(self.iv);
        data.extend_from_slice(self.cipher_text);
        Ok(data)
    }
}

impl<'a> Debug for Envelope<'a> {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "Envelope(key: {}, iv: {}, cipher text: {})", self.encrypted_key.len(), self.iv.len(), self.cipher_text.len())
    }
}
