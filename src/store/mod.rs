pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{DonorRecord, NewDonorRecord};

pub use memory::MemoryDonorStore;
pub use postgres::PgDonorStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("donor id {0} already exists")]
    DuplicateDonorId(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append-only record store keyed by donor id.
#[async_trait]
pub trait DonorStore: Send + Sync {
    async fn exists(&self, donor_id: &str) -> Result<bool, StoreError>;

    /// Store a new record. Must fail with [`StoreError::DuplicateDonorId`] when
    /// the donor id is already taken.
    async fn insert(&self, record: NewDonorRecord) -> Result<DonorRecord, StoreError>;

    async fn find(&self, donor_id: &str) -> Result<Option<DonorRecord>, StoreError>;
}
