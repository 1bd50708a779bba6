use sqlx::PgPool;

use crate::models::{DonorRecord, NewDonorRecord};

pub async fn create(pool: &PgPool, record: &NewDonorRecord) -> Result<DonorRecord, sqlx::Error> {
    sqlx::query_as::<_, DonorRecord>(
        "INSERT INTO donor_locations
            (donor_id, address, latitude, longitude, accuracy, user_name, roll_number,
             mobile_number, request_id, token, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(&record.donor_id)
    .bind(record.address())
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(record.accuracy)
    .bind(&record.user_name)
    .bind(&record.roll_number)
    .bind(&record.mobile_number)
    .bind(&record.request_id)
    .bind(&record.token)
    .bind(record.created_at)
    .fetch_one(pool)
    .await
}

pub async fn exists_by_donor_id(pool: &PgPool, donor_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM donor_locations WHERE donor_id = $1)",
    )
    .bind(donor_id)
    .fetch_one(pool)
    .await
}

pub async fn find_by_donor_id(
    pool: &PgPool,
    donor_id: &str,
) -> Result<Option<DonorRecord>, sqlx::Error> {
    sqlx::query_as::<_, DonorRecord>("SELECT * FROM donor_locations WHERE donor_id = $1")
        .bind(donor_id)
        .fetch_optional(pool)
        .await
}
