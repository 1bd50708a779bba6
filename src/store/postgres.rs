use async_trait::async_trait;
use sqlx::PgPool;

use crate::db;
use crate::models::{DonorRecord, NewDonorRecord};

use super::{DonorStore, StoreError};

pub struct PgDonorStore {
    pool: PgPool,
}

impl PgDonorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DonorStore for PgDonorStore {
    async fn exists(&self, donor_id: &str) -> Result<bool, StoreError> {
        Ok(db::donors::exists_by_donor_id(&self.pool, donor_id).await?)
    }

    async fn insert(&self, record: NewDonorRecord) -> Result<DonorRecord, StoreError> {
        match db::donors::create(&self.pool, &record).await {
            Ok(stored) => Ok(stored),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StoreError::DuplicateDonorId(record.donor_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find(&self, donor_id: &str) -> Result<Option<DonorRecord>, StoreError> {
        Ok(db::donors::find_by_donor_id(&self.pool, donor_id).await?)
    }
}
