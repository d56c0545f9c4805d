//! Account address derivation from public keys.
//!
//! Address format: `lat_` + base32(public_key, 52 chars) + base32(checksum, 8 chars)
//!
//! Checksum: first 5 bytes of Blake2b-256(public_key).
//! Base32 alphabet: `13456789abcdefghijkmnopqrstuwxyz` (avoids ambiguous
//! characters). Total address length: 4 (prefix) + 52 + 8 = 64 characters.

use lattice_types::{AccountAddress, PublicKey};

const BASE32_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const BASE32_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < 32 {
        table[BASE32_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Number of base32 characters for the public key (256 bits → ceil(256/5)).
const PUBKEY_CHARS: usize = 52;
/// Number of base32 characters for the checksum (40 bits → 40/5).
const CHECKSUM_CHARS: usize = 8;
const ENCODED_LEN: usize = PUBKEY_CHARS + CHECKSUM_CHARS;

fn encode_base32(bytes: &[u8]) -> String {
    let num_chars = (bytes.len() * 8).div_ceil(5);
    let mut out = String::with_capacity(num_chars);

    let mut buffer: u64 = 0;
    let mut bits = 0;
    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize] as char);
    }
    out
}

fn decode_base32_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut buffer: u64 = 0;
    let mut bits = 0;
    let mut out = [0u8; N];
    let mut pos = 0;

    for c in s.bytes() {
        if c >= 128 {
            return None;
        }
        let val = BASE32_DECODE[c as usize];
        if val == 0xFF {
            return None;
        }
        buffer = (buffer << 5) | val as u64;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            if pos < N {
                out[pos] = (buffer >> bits) as u8;
                pos += 1;
            }
        }
    }

    (pos == N).then_some(out)
}

/// Derive a `lat_`-prefixed account address from a public key.
pub fn derive_address(public_key: &PublicKey) -> AccountAddress {
    let body = encode_base32(public_key.as_bytes());
    let checksum = crate::blake2b_256(public_key.as_bytes());
    let tail = encode_base32(&checksum[..5]);
    AccountAddress::new(format!("{}{body}{tail}", AccountAddress::PREFIX))
}

/// Extract the public key bytes from a valid lattice address.
///
/// Returns `None` if the address is malformed or the checksum does not
/// match.
pub fn decode_address(address: &str) -> Option<PublicKey> {
    let encoded = address.strip_prefix(AccountAddress::PREFIX)?;
    if encoded.len() != ENCODED_LEN {
        return None;
    }

    let pubkey_bytes: [u8; 32] = decode_base32_fixed(&encoded[..PUBKEY_CHARS])?;
    let checksum_bytes: [u8; 5] = decode_base32_fixed(&encoded[PUBKEY_CHARS..])?;

    let expected = &crate::blake2b_256(&pubkey_bytes)[..5];
    if checksum_bytes != *expected {
        return None;
    }
    Some(PublicKey(pubkey_bytes))
}

/// Whether an address string is well-formed with a valid checksum.
pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn derive_and_validate() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public);
        assert!(addr.as_str().starts_with("lat_"));
        assert_eq!(addr.as_str().len(), 64);
        assert!(validate_address(addr.as_str()));
    }

    #[test]
    fn decode_recovers_public_key() {
        let kp = keypair_from_seed(&[3u8; 32]);
        let addr = derive_address(&kp.public);
        assert_eq!(decode_address(addr.as_str()).unwrap(), kp.public);
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let kp = generate_keypair();
        let mut s = derive_address(&kp.public).as_str().to_string();
        let last = s.pop().unwrap();
        s.push(if last == '1' { '3' } else { '1' });
        assert!(!validate_address(&s));
    }

    #[test]
    fn wrong_prefix_and_length_rejected() {
        assert!(!validate_address("acct_whatever"));
        assert!(!validate_address("lat_short"));
        assert!(!validate_address("lat_"));
    }

    #[test]
    fn base32_roundtrip() {
        let data = [0x13, 0x37, 0xC0, 0xDE, 0x99];
        let decoded: [u8; 5] = decode_base32_fixed(&encode_base32(&data)).unwrap();
        assert_eq!(decoded, data);
    }
}
