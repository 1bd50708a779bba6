use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DonorRecord {
    pub id: Uuid,
    pub donor_id: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub user_name: String,
    pub roll_number: String,
    pub mobile_number: String,
    pub request_id: Option<String>,
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated submission ready to be stored. The store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewDonorRecord {
    pub donor_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub user_name: String,
    pub roll_number: String,
    pub mobile_number: String,
    pub request_id: Option<String>,
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewDonorRecord {
    /// Human readable summary line kept alongside the coordinates.
    pub fn address(&self) -> String {
        format!(
            "{} ({}) - Current Location: {}, {}",
            self.user_name, self.roll_number, self.latitude, self.longitude
        )
    }
}
