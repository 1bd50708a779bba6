use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::models::{DonorRecord, NewDonorRecord};

use super::{DonorStore, StoreError};

/// Process-local store, used for tests and database-free runs.
#[derive(Default)]
pub struct MemoryDonorStore {
    records: DashMap<String, DonorRecord>,
}

impl MemoryDonorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DonorStore for MemoryDonorStore {
    async fn exists(&self, donor_id: &str) -> Result<bool, StoreError> {
        Ok(self.records.contains_key(donor_id))
    }

    async fn insert(&self, record: NewDonorRecord) -> Result<DonorRecord, StoreError> {
        match self.records.entry(record.donor_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateDonorId(record.donor_id)),
            Entry::Vacant(slot) => {
                let stored = DonorRecord {
                    id: Uuid::now_v7(),
                    address: record.address(),
                    donor_id: record.donor_id,
                    latitude: record.latitude,
                    longitude: record.longitude,
                    accuracy: record.accuracy,
                    user_name: record.user_name,
                    roll_number: record.roll_number,
                    mobile_number: record.mobile_number,
                    request_id: record.request_id,
                    token: record.token,
                    created_at: record.created_at,
                };
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn find(&self, donor_id: &str) -> Result<Option<DonorRecord>, StoreError> {
        Ok(self.records.get(donor_id).map(|r| r.value().clone()))
    }
}
