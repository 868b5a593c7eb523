use openssl::error::ErrorStack;
use openssl::memcmp;
use openssl::rand::rand_bytes;
use openssl::sha::sha256;

pub fn random_bytes(len: usize) -> Result<Vec<u8>, ErrorStack> {
    let mut bytes = vec![0u8; len];
    rand_bytes(&mut bytes)?;
    Ok(bytes)
}

/// Compares two payloads by their SHA-256 digests in constant time
pub fn content_matches<A, B>(a: A, b: B) -> bool where A: AsRef<[u8]>, B: AsRef<[u8]> {
    let a = sha256(a.as_ref());
    let b = sha256(b.as_ref());
    memcmp::eq(&a, &b)
}

#[inline]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Serde helpers for byte fields stored as base64 strings
pub mod b64 {
    use std::fmt::{Formatter, Result as FormatResult};

    use base64::{decode as b64decode, encode as b64encode};
    use serde::{Deserializer, Serializer};
    use serde::de;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        serializer.serialize_str(&b64encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error> where D: Deserializer<'de> {
        struct V;

        impl<'de> de::Visitor<'de> for V {
            type Value = Vec<u8>;

            fn expecting(&self, formatter: &mut Formatter) -> FormatResult {
                formatter.write_str("base64 string expected")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> where E: de::Error {
                b64decode(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(V)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Serialize, Debug, PartialEq)]
    struct Sample {
        #[serde(with = "b64")]
        data: Vec<u8>,
    }

    #[test]
    fn random() {
        let a = random_bytes(32).unwrap();
        let b = random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(random_bytes(0).unwrap().is_empty());
    }

    #[test]
    fn content() {
        assert!(content_matches(b"Some Secret Data", "Some Secret Data"));
        assert!(!content_matches(b"Some Secret Data", b"Some Secret Date"));
        assert!(content_matches(b"", b""));
    }

    #[test]
    fn blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \n\t"));
        assert!(!is_blank(" key "));
    }

    #[test]
    fn base64_fields() {
        let sample = Sample { data: b"\x00\x01binary\xff".to_vec() };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"data":"AAFiaW5hcnn/"}"#);
        let parsed: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample);
        assert!(serde_json::from_str::<Sample>(r#"{"data":"not base64!"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"data":12}"#).is_err());
    }
}
