use lattice_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("snapshot decode failure: {0}")]
    SnapshotDecode(String),

    #[error("snapshot hash mismatch at height {height}")]
    SnapshotCorrupt { height: u64 },
}
