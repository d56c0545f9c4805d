//! Account address type with `lat_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A lattice account address, always prefixed with `lat_`.
///
/// Derived from the account's public key via Blake2b hashing + base32
/// encoding (see `lattice_crypto::derive_address`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountAddress(String);

impl AccountAddress {
    /// The standard prefix for all lattice account addresses.
    pub const PREFIX: &'static str = "lat_";

    /// Create an address from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `lat_`.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(s.starts_with(Self::PREFIX), "address must start with lat_");
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Structural well-formedness (prefix + non-empty body). Checksum
    /// verification lives in `lattice_crypto::validate_address`.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() > Self::PREFIX.len() && self.0.starts_with(Self::PREFIX)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
