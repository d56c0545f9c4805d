//! Content-hash identifiers for instructions and blocks.
//!
//! Both are 32-byte Blake2b-256 digests. `InstructionId` is a pure function
//! of the instruction's content, so re-submission of the same instruction is
//! always detectable. Hashes order lexicographically, which is what the fork
//! tie-break relies on.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! hash32 {
    ($name:ident, $label:literal) => {
        /// A 32-byte Blake2b-256 digest.
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// Full lowercase hex rendering.
            pub fn to_hex(&self) -> String {
                self.0.iter().map(|b| format!("{:02x}", b)).collect()
            }

            /// Parse from a 64-character hex string.
            pub fn from_hex(s: &str) -> Option<Self> {
                if s.len() != 64 {
                    return None;
                }
                let mut out = [0u8; 32];
                for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
                    let hi = hex_val(chunk[0])?;
                    let lo = hex_val(chunk[1])?;
                    out[i] = (hi << 4) | lo;
                }
                Some(Self(out))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let prefix: String =
                    self.0[..4].iter().map(|b| format!("{:02x}", b)).collect();
                write!(f, concat!($label, "({})"), prefix)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }
    };
}

hash32!(InstructionId, "InstructionId");
hash32!(BlockHash, "BlockHash");

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_is_zero() {
        assert!(InstructionId::ZERO.is_zero());
        assert!(!InstructionId::new([1u8; 32]).is_zero());
    }

    #[test]
    fn hex_roundtrip() {
        let id = BlockHash::new([0xC4; 32]);
        let parsed = BlockHash::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(BlockHash::from_hex("zz").is_none());
        assert!(BlockHash::from_hex(&"g".repeat(64)).is_none());
    }

    #[test]
    fn ordering_is_lexicographic_on_bytes() {
        let lo = BlockHash::new([0u8; 32]);
        let mut hi_bytes = [0u8; 32];
        hi_bytes[0] = 1;
        let hi = BlockHash::new(hi_bytes);
        assert!(lo < hi);
    }
}
