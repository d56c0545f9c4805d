//! Snapshot storage trait.

use crate::StoreError;

/// Trait for point-in-time ledger snapshot storage.
///
/// Snapshots are stored as opaque serialized bytes keyed by block height;
/// the typed snapshot lives in `lattice-ledger` and round-trips through
/// bincode. Snapshots are immutable once written.
pub trait SnapshotStore {
    fn put_snapshot(&self, height: u64, bytes: &[u8]) -> Result<(), StoreError>;
    fn get_snapshot(&self, height: u64) -> Result<Vec<u8>, StoreError>;
    fn has_snapshot(&self, height: u64) -> Result<bool, StoreError>;
    /// Height of the most recent snapshot, if any exist.
    fn latest_snapshot_height(&self) -> Result<Option<u64>, StoreError>;
}
